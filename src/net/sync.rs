//! World replication between peers
//!
//! The host owns the ball, power-ups and score and broadcasts them with every
//! car pose it simulates. A client sends only its own cars to the host and
//! mirrors everything else. Bad frames are logged and dropped; they never
//! reach the simulation.

use std::collections::{BTreeMap, HashMap};

use glam::{Vec2, Vec3};

use super::transport::{PeerId, Transport, TransportEvent};
use super::wire::{MessageType, NetworkMessage, SPEED_SCALE};
use crate::error::ProtocolError;
use crate::sim::{Car, Controller, GameEvent, PowerUp, PowerUpKind, Team, World};
use crate::wrap_degrees;

/// Events drained per poll unless configured otherwise
pub const DEFAULT_MAX_EVENTS_PER_POLL: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Client,
}

/// Lifecycle of the session's link to its peers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Waiting for the host, or for the first client
    Connecting,
    Connected,
    Closing,
}

/// A player owned by some peer and mirrored here as a remote car
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterEntry {
    pub player_id: u32,
    pub peer: PeerId,
    pub car_id: u32,
    pub team: Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LocalPlayer {
    player_id: u32,
    car_id: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    /// Older than an update already applied for the same stream
    pub stale_dropped: u64,
    /// Undecodable or carrying bad payloads
    pub rejected: u64,
}

/// Sender, message type, entity
type StreamKey = (PeerId, MessageType, u32);

pub struct NetworkSync<T: Transport> {
    role: Role,
    state: ConnectionState,
    transport: T,
    local_players: Vec<LocalPlayer>,
    roster: BTreeMap<u32, RosterEntry>,
    last_seq: HashMap<StreamKey, u32>,
    next_seq: u32,
    max_events_per_poll: usize,
    stats: SyncStats,
}

impl<T: Transport> NetworkSync<T> {
    pub fn host(transport: T) -> Self {
        Self::new(Role::Host, transport)
    }

    pub fn client(transport: T) -> Self {
        Self::new(Role::Client, transport)
    }

    fn new(role: Role, transport: T) -> Self {
        log::info!("Starting network session as {:?}", role);
        Self {
            role,
            state: ConnectionState::Connecting,
            transport,
            local_players: Vec::new(),
            roster: BTreeMap::new(),
            last_seq: HashMap::new(),
            next_seq: 0,
            max_events_per_poll: DEFAULT_MAX_EVENTS_PER_POLL,
            stats: SyncStats::default(),
        }
    }

    pub fn with_max_events_per_poll(mut self, max: usize) -> Self {
        self.max_events_per_poll = max.max(1);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn roster(&self) -> impl Iterator<Item = &RosterEntry> {
        self.roster.values()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Add a car driven on this client and announce it to the host.
    ///
    /// The host announces every car it simulates, so it needs no explicit
    /// local players.
    pub fn add_local_player(
        &mut self,
        world: &mut World,
        player_id: u32,
        team: Team,
        controller: Controller,
    ) -> u32 {
        let car_id = world.add_car(team, controller);
        self.local_players.push(LocalPlayer { player_id, car_id });
        if self.state == ConnectionState::Connected {
            self.broadcast(join_message(player_id, team), None);
        }
        car_id
    }

    /// Send local state and the given events. Call after each advance of the world.
    pub fn publish(&mut self, world: &World, events: &[GameEvent]) {
        if self.state != ConnectionState::Connected {
            return;
        }
        let poses: Vec<_> = self
            .local_cars(world)
            .into_iter()
            .map(|(player_id, car)| position_message(player_id, car))
            .collect();
        for msg in poses {
            self.broadcast(msg, None);
        }

        if self.role == Role::Client {
            return;
        }
        let ball = world.ball.pos;
        self.broadcast(
            NetworkMessage::new(MessageType::BallPosition, world.ball.id)
                .with_position(ball.x, ball.y, ball.z),
            None,
        );
        let outgoing: Vec<_> = events
            .iter()
            .filter_map(|event| self.event_message(world, event))
            .collect();
        for msg in outgoing {
            self.broadcast(msg, None);
        }
    }

    /// Drain pending transport events into the world. Never blocks; handles
    /// at most the configured number of events. Returns how many were handled.
    pub fn poll(&mut self, world: &mut World) -> usize {
        let mut handled = 0;
        while handled < self.max_events_per_poll && self.state != ConnectionState::Disconnected {
            let Some(event) = self.transport.poll() else {
                break;
            };
            handled += 1;
            match event {
                TransportEvent::Connected(peer) => self.on_connected(world, peer),
                TransportEvent::Disconnected(peer) => self.on_disconnected(world, peer),
                TransportEvent::Frame(peer, bytes) => {
                    self.stats.frames_received += 1;
                    match NetworkMessage::decode(&bytes) {
                        Ok(msg) => self.on_message(world, peer, msg),
                        Err(e) => {
                            self.stats.rejected += 1;
                            log::warn!("Discarding frame from peer {}: {}", peer, e);
                        }
                    }
                }
            }
        }
        handled
    }

    /// Announce departure, drop every link and every mirrored car
    pub fn shutdown(&mut self, world: &mut World) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.set_state(ConnectionState::Closing);
        let leaves: Vec<_> = self
            .local_cars(world)
            .into_iter()
            .map(|(player_id, _)| NetworkMessage::new(MessageType::PlayerLeave, player_id))
            .collect();
        for msg in leaves {
            self.broadcast(msg, None);
        }
        self.transport.close();

        let players: Vec<u32> = self.roster.keys().copied().collect();
        for player_id in players {
            self.drop_player(world, player_id);
        }
        self.last_seq.clear();
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            log::info!("Connection {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn bump_seq(&mut self) -> u32 {
        self.next_seq = self.next_seq.wrapping_add(1);
        self.next_seq
    }

    fn send_to(&mut self, peer: PeerId, mut msg: NetworkMessage) {
        msg.seq = self.bump_seq();
        self.send_frame(peer, &msg);
    }

    /// Send to every peer but `except`. A client's only peer is its host.
    fn broadcast(&mut self, mut msg: NetworkMessage, except: Option<PeerId>) {
        msg.seq = self.bump_seq();
        for peer in self.transport.peers() {
            if Some(peer) != except {
                self.send_frame(peer, &msg);
            }
        }
    }

    fn send_frame(&mut self, peer: PeerId, msg: &NetworkMessage) {
        match self.transport.send(peer, &msg.encode()) {
            Ok(()) => self.stats.frames_sent += 1,
            Err(e) => log::warn!("Sending {:?} to peer {} failed: {}", msg.kind, peer, e),
        }
    }

    /// Cars this side is the source of truth for, with their player ids
    fn local_cars<'w>(&self, world: &'w World) -> Vec<(u32, &'w Car)> {
        match self.role {
            Role::Host => world
                .cars
                .iter()
                .filter(|car| !matches!(car.controller, Controller::Remote { .. }))
                .map(|car| (car.id, car))
                .collect(),
            Role::Client => self
                .local_players
                .iter()
                .filter_map(|p| world.car(p.car_id).map(|car| (p.player_id, car)))
                .collect(),
        }
    }

    fn is_local_player(&self, world: &World, player_id: u32) -> bool {
        match self.role {
            Role::Host => world
                .car(player_id)
                .is_some_and(|car| !matches!(car.controller, Controller::Remote { .. })),
            Role::Client => self.local_players.iter().any(|p| p.player_id == player_id),
        }
    }

    fn player_id_of(&self, world: &World, car_id: u32) -> Option<u32> {
        let car = world.car(car_id)?;
        match car.controller {
            Controller::Remote { player_id } => Some(player_id),
            _ => self
                .local_cars(world)
                .into_iter()
                .find(|(_, local)| local.id == car_id)
                .map(|(player_id, _)| player_id),
        }
    }

    fn event_message(&self, world: &World, event: &GameEvent) -> Option<NetworkMessage> {
        match *event {
            GameEvent::PowerUpSpawned { id, kind, pos }
            | GameEvent::PowerUpRespawned { id, kind, pos } => Some(spawn_message(id, kind, pos)),
            GameEvent::PowerUpCollected { id, car_id, .. } => {
                let collector = self.player_id_of(world, car_id)?;
                Some(NetworkMessage::new(MessageType::PowerupCollected, id).with_data(collector as i32))
            }
            GameEvent::GoalScored { team, .. } => Some(goal_message(team, world.score.get(team))),
            GameEvent::AiStateChanged { .. } => None,
        }
    }

    fn on_connected(&mut self, world: &World, peer: PeerId) {
        log::info!("Peer {} connected", peer);
        self.set_state(ConnectionState::Connected);

        let mut hello: Vec<_> = self
            .local_cars(world)
            .into_iter()
            .map(|(player_id, car)| join_message(player_id, car.team))
            .collect();
        if self.role == Role::Host {
            // Bring a late joiner up to date
            hello.extend(
                self.roster
                    .values()
                    .map(|entry| join_message(entry.player_id, entry.team)),
            );
            hello.extend(
                world
                    .powerups
                    .active()
                    .map(|item| spawn_message(item.id, item.kind, item.pos)),
            );
            hello.extend(Team::ALL.map(|team| goal_message(team, world.score.get(team))));
        }
        for msg in hello {
            self.send_to(peer, msg);
        }
    }

    fn on_disconnected(&mut self, world: &mut World, peer: PeerId) {
        log::info!("Peer {} disconnected", peer);
        self.last_seq.retain(|(sender, _, _), _| *sender != peer);

        let gone: Vec<u32> = self
            .roster
            .values()
            .filter(|entry| entry.peer == peer)
            .map(|entry| entry.player_id)
            .collect();
        for player_id in gone {
            self.drop_player(world, player_id);
            if self.role == Role::Host {
                self.broadcast(
                    NetworkMessage::new(MessageType::PlayerLeave, player_id),
                    Some(peer),
                );
            }
        }

        match self.role {
            Role::Client => self.set_state(ConnectionState::Disconnected),
            Role::Host if self.transport.peers().is_empty() => {
                self.set_state(ConnectionState::Connecting)
            }
            Role::Host => {}
        }
    }

    fn on_message(&mut self, world: &mut World, peer: PeerId, msg: NetworkMessage) {
        let key = (peer, msg.kind, msg.player_id);
        if self.last_seq.get(&key).is_some_and(|&last| msg.seq <= last) {
            self.stats.stale_dropped += 1;
            log::trace!("Stale {:?} for {} from peer {}", msg.kind, msg.player_id, peer);
            return;
        }
        self.last_seq.insert(key, msg.seq);

        let result = match msg.kind {
            MessageType::PlayerJoin => self.on_join(world, peer, &msg),
            MessageType::PlayerLeave => {
                self.on_leave(world, peer, &msg);
                Ok(())
            }
            MessageType::PlayerPosition => {
                self.on_position(world, peer, &msg);
                Ok(())
            }
            kind if self.role == Role::Host => {
                log::warn!("Ignoring {:?} from client peer {}", kind, peer);
                Ok(())
            }
            MessageType::BallPosition => {
                world.ball.pos = Vec3::new(msg.x, msg.y, msg.z);
                Ok(())
            }
            MessageType::PowerupSpawn => apply_powerup_spawn(world, &msg),
            MessageType::PowerupCollected => {
                self.on_powerup_collected(world, &msg);
                Ok(())
            }
            MessageType::GoalScored => self.on_goal(world, &msg),
        };
        if let Err(e) = result {
            self.stats.rejected += 1;
            log::warn!("Discarding {:?} from peer {}: {}", msg.kind, peer, e);
        }
    }

    fn on_join(
        &mut self,
        world: &mut World,
        peer: PeerId,
        msg: &NetworkMessage,
    ) -> Result<(), ProtocolError> {
        let team = team_from_code(msg.data)?;
        let player_id = msg.player_id;
        if self.roster.contains_key(&player_id) {
            return Ok(());
        }
        if self.is_local_player(world, player_id) {
            log::warn!("Peer {} announced player {} which is already in use", peer, player_id);
            return Ok(());
        }

        let car_id = world.add_car(team, Controller::Remote { player_id });
        self.roster.insert(
            player_id,
            RosterEntry {
                player_id,
                peer,
                car_id,
                team,
            },
        );
        log::info!("Player {} joined {:?} as car {}", player_id, team, car_id);

        if self.role == Role::Host {
            self.broadcast(join_message(player_id, team), Some(peer));
        }
        Ok(())
    }

    fn on_leave(&mut self, world: &mut World, peer: PeerId, msg: &NetworkMessage) {
        let Some(entry) = self.roster.get(&msg.player_id) else {
            return;
        };
        if self.role == Role::Host && entry.peer != peer {
            log::warn!("Peer {} tried to remove player {}", peer, msg.player_id);
            return;
        }
        self.drop_player(world, msg.player_id);
        if self.role == Role::Host {
            self.broadcast(*msg, Some(peer));
        }
    }

    fn on_position(&mut self, world: &mut World, peer: PeerId, msg: &NetworkMessage) {
        let Some(entry) = self.roster.get(&msg.player_id) else {
            log::debug!("Position for unknown player {} from peer {}", msg.player_id, peer);
            return;
        };
        if self.role == Role::Host && entry.peer != peer {
            log::warn!("Peer {} sent a pose for player {}", peer, msg.player_id);
            return;
        }
        if let Some(car) = world.car_mut(entry.car_id) {
            car.pos = Vec2::new(msg.x, msg.z);
            car.heading = wrap_degrees(msg.rotation);
            car.speed = msg.data as f32 / SPEED_SCALE;
        }
        if self.role == Role::Host {
            self.broadcast(*msg, Some(peer));
        }
    }

    fn on_powerup_collected(&mut self, world: &mut World, msg: &NetworkMessage) {
        let Some(kind) = world.powerups.mark_collected(msg.player_id, &world.config) else {
            log::debug!("Collection of unknown power-up {}", msg.player_id);
            return;
        };
        let Ok(collector) = u32::try_from(msg.data) else {
            return;
        };
        let secs = world.config.powerups.effect_secs;
        let local_car = self
            .local_players
            .iter()
            .find(|p| p.player_id == collector)
            .map(|p| p.car_id);
        if let Some(car) = local_car.and_then(|id| world.car_mut(id)) {
            log::debug!("Car {} collected {:?}", car.id, kind);
            car.effects.grant(kind, secs);
        }
    }

    fn on_goal(&mut self, world: &mut World, msg: &NetworkMessage) -> Result<(), ProtocolError> {
        let team = team_from_code(msg.data)?;
        let before = world.score.get(team);
        world.score.sync(team, msg.x.max(0.0) as u32);
        let after = world.score.get(team);
        if after > before {
            log::info!("Goal for {:?}, score {:?}", team, world.score.table());
            world.events.push(GameEvent::GoalScored {
                team,
                points: after - before,
            });
            if world.config.reset_cars_on_goal {
                for player in &self.local_players {
                    if let Some(car) = world.car_mut(player.car_id) {
                        car.reset_to_home();
                    }
                }
            }
        }
        Ok(())
    }

    fn drop_player(&mut self, world: &mut World, player_id: u32) -> Option<RosterEntry> {
        let entry = self.roster.remove(&player_id)?;
        world.remove_car(entry.car_id);
        log::info!("Player {} left", player_id);
        Some(entry)
    }
}

fn position_message(player_id: u32, car: &Car) -> NetworkMessage {
    NetworkMessage::new(MessageType::PlayerPosition, player_id)
        .with_position(car.pos.x, 0.0, car.pos.y)
        .with_rotation(car.heading)
        .with_data((car.speed * SPEED_SCALE).round() as i32)
}

fn join_message(player_id: u32, team: Team) -> NetworkMessage {
    NetworkMessage::new(MessageType::PlayerJoin, player_id).with_data(i32::from(team.code()))
}

fn spawn_message(id: u32, kind: PowerUpKind, pos: Vec2) -> NetworkMessage {
    NetworkMessage::new(MessageType::PowerupSpawn, id)
        .with_position(pos.x, 0.0, pos.y)
        .with_data(i32::from(kind.code()))
}

fn goal_message(team: Team, total: u32) -> NetworkMessage {
    NetworkMessage::new(MessageType::GoalScored, 0)
        .with_position(total as f32, 0.0, 0.0)
        .with_data(i32::from(team.code()))
}

fn team_from_code(code: i32) -> Result<Team, ProtocolError> {
    u8::try_from(code)
        .ok()
        .and_then(Team::from_code)
        .ok_or(ProtocolError::BadPayload { field: "team", code })
}

fn apply_powerup_spawn(world: &mut World, msg: &NetworkMessage) -> Result<(), ProtocolError> {
    let kind = u8::try_from(msg.data)
        .ok()
        .and_then(PowerUpKind::from_code)
        .ok_or(ProtocolError::BadPayload {
            field: "power-up kind",
            code: msg.data,
        })?;
    world.powerups.insert(PowerUp {
        id: msg.player_id,
        kind,
        pos: Vec2::new(msg.x, msg.z),
        active: true,
        respawn_ticks: 0,
    });
    world.powerups.normalize_order();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::net::transport::{ChannelTransport, link};
    use crate::sim::{TickInput, tick};

    type Sync = NetworkSync<ChannelTransport>;

    fn config() -> SimConfig {
        let mut config = SimConfig::default();
        config.powerups.spawn_interval_ticks = 0;
        config
    }

    fn replica() -> World {
        let mut world = World::new(config());
        world.authoritative = false;
        world
    }

    /// Host running the classic layout plus one client with player 1000
    fn session() -> (Sync, World, Sync, World) {
        let mut host_link = ChannelTransport::new(0);
        let mut client_link = ChannelTransport::new(1);
        link(&mut host_link, &mut client_link);

        let mut host_world = World::classic(config());
        let mut client_world = replica();
        let mut host = NetworkSync::host(host_link);
        let mut client = NetworkSync::client(client_link);
        client.add_local_player(&mut client_world, 1000, Team::Blue, Controller::Human);

        client.poll(&mut client_world);
        host.poll(&mut host_world);
        client.poll(&mut client_world);
        (host, host_world, client, client_world)
    }

    fn local_car_id(world: &World) -> u32 {
        world
            .cars
            .iter()
            .find(|c| c.controller == Controller::Human)
            .unwrap()
            .id
    }

    #[test]
    fn test_handshake_builds_rosters() {
        let (host, mut host_world, client, mut client_world) = session();

        assert_eq!(host.state(), ConnectionState::Connected);
        assert_eq!(client.state(), ConnectionState::Connected);

        assert_eq!(host_world.cars.len(), 3);
        let remote = host_world.remote_car_mut(1000).unwrap();
        assert_eq!(remote.team, Team::Blue);
        assert_eq!(host.roster().count(), 1);

        assert_eq!(client_world.cars.len(), 3);
        assert!(client_world.remote_car_mut(2).is_some());
        assert!(client_world.remote_car_mut(3).is_some());
        assert_eq!(client.roster().count(), 2);
    }

    #[test]
    fn test_poses_flow_both_ways() {
        let (mut host, mut host_world, mut client, mut client_world) = session();

        {
            let car = host_world.car_mut(2).unwrap();
            car.pos = Vec2::new(1.0, -1.0);
            car.heading = 45.0;
            car.speed = 0.2;
        }
        host_world.ball.pos = Vec3::new(0.5, 1.0, 0.5);
        host.publish(&host_world, &[]);
        client.poll(&mut client_world);

        let mirrored = client_world.remote_car_mut(2).unwrap();
        assert_eq!(mirrored.pos, Vec2::new(1.0, -1.0));
        assert_eq!(mirrored.heading, 45.0);
        assert!((mirrored.speed - 0.2).abs() < 1e-4);
        assert_eq!(client_world.ball.pos, Vec3::new(0.5, 1.0, 0.5));

        let local = local_car_id(&client_world);
        client_world.car_mut(local).unwrap().pos = Vec2::new(2.0, 2.0);
        client.publish(&client_world, &[]);
        host.poll(&mut host_world);
        assert_eq!(host_world.remote_car_mut(1000).unwrap().pos, Vec2::new(2.0, 2.0));
    }

    #[test]
    fn test_stale_pose_is_dropped() {
        let (mut host, mut host_world, mut client, mut client_world) = session();
        let local = local_car_id(&client_world);
        client_world.car_mut(local).unwrap().pos = Vec2::new(2.0, 2.0);
        client.publish(&client_world, &[]);
        host.poll(&mut host_world);

        let mut stale = NetworkMessage::new(MessageType::PlayerPosition, 1000)
            .with_position(-3.0, 0.0, -3.0);
        stale.seq = 1;
        client.transport_mut().send(0, &stale.encode()).unwrap();
        host.poll(&mut host_world);

        assert_eq!(host.stats().stale_dropped, 1);
        assert_eq!(host_world.remote_car_mut(1000).unwrap().pos, Vec2::new(2.0, 2.0));
    }

    #[test]
    fn test_malformed_frames_are_discarded() {
        let (mut host, mut host_world, mut client, _) = session();
        let cars_before = host_world.cars.clone();

        client.transport_mut().send(0, &[1, 2, 3]).unwrap();
        let mut unknown = NetworkMessage::new(MessageType::PlayerJoin, 5).encode();
        unknown[1] = 99;
        client.transport_mut().send(0, &unknown).unwrap();
        let mut bad_team = NetworkMessage::new(MessageType::PlayerJoin, 5).with_data(7);
        bad_team.seq = 500;
        client.transport_mut().send(0, &bad_team.encode()).unwrap();
        let mut nan_pose = NetworkMessage::new(MessageType::PlayerPosition, 1000)
            .with_position(f32::NAN, 0.0, 0.0)
            .with_rotation(90.0);
        nan_pose.seq = 10_000;
        client.transport_mut().send(0, &nan_pose.encode()).unwrap();

        assert_eq!(host.poll(&mut host_world), 4);
        assert_eq!(host.stats().rejected, 4);
        assert_eq!(host_world.cars, cars_before);

        tick(&mut host_world, &TickInput::default());
        assert!(host_world.cars.iter().all(|car| car.pos.is_finite()));
        assert!(host_world.ball.pos.is_finite());
        assert_eq!(host.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_powerups_and_score_replicate() {
        let (mut host, mut host_world, mut client, mut client_world) = session();
        let pos = Vec2::new(3.0, 0.0);
        host_world.powerups.insert(PowerUp {
            id: 77,
            kind: PowerUpKind::Shield,
            pos,
            active: true,
            respawn_ticks: 0,
        });
        host.publish(
            &host_world,
            &[GameEvent::PowerUpSpawned {
                id: 77,
                kind: PowerUpKind::Shield,
                pos,
            }],
        );
        client.poll(&mut client_world);
        let item = client_world.powerups.get(77).unwrap();
        assert!(item.active);
        assert_eq!(item.kind, PowerUpKind::Shield);
        assert_eq!(item.pos, pos);

        // The client's car picks it up on the host
        let collector = host_world.remote_car_mut(1000).unwrap().id;
        host.publish(
            &host_world,
            &[GameEvent::PowerUpCollected {
                id: 77,
                kind: PowerUpKind::Shield,
                car_id: collector,
            }],
        );
        client.poll(&mut client_world);
        assert!(!client_world.powerups.get(77).unwrap().active);
        let local = local_car_id(&client_world);
        assert!(client_world.car(local).unwrap().is_shielded());

        host_world.score.award(Team::Red, 1);
        host.publish(
            &host_world,
            &[GameEvent::GoalScored {
                team: Team::Red,
                points: 1,
            }],
        );
        client.poll(&mut client_world);
        assert_eq!(client_world.score.get(Team::Red), 1);
        assert!(client_world.drain_events().contains(&GameEvent::GoalScored {
            team: Team::Red,
            points: 1
        }));
    }

    #[test]
    fn test_shutdown_clears_rosters() {
        let (mut host, mut host_world, mut client, mut client_world) = session();

        client.shutdown(&mut client_world);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client_world.cars.len(), 1);
        assert_eq!(client.roster().count(), 0);

        host.poll(&mut host_world);
        assert_eq!(host_world.cars.len(), 2);
        assert!(host_world.remote_car_mut(1000).is_none());
        assert_eq!(host.roster().count(), 0);
        assert_eq!(host.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_host_relays_between_clients() {
        let mut host_link = ChannelTransport::new(0);
        let mut a_link = ChannelTransport::new(1);
        let mut b_link = ChannelTransport::new(2);
        link(&mut host_link, &mut a_link);
        link(&mut host_link, &mut b_link);

        let mut host_world = World::classic(config());
        let mut a_world = replica();
        let mut b_world = replica();
        let mut host = NetworkSync::host(host_link);
        let mut a = NetworkSync::client(a_link);
        let mut b = NetworkSync::client(b_link);
        let a_car = a.add_local_player(&mut a_world, 1000, Team::Red, Controller::Ai);
        b.add_local_player(&mut b_world, 2000, Team::Blue, Controller::Human);

        a.poll(&mut a_world);
        b.poll(&mut b_world);
        host.poll(&mut host_world);
        a.poll(&mut a_world);
        b.poll(&mut b_world);

        assert_eq!(host_world.cars.len(), 4);
        assert_eq!(a_world.cars.len(), 4);
        assert_eq!(b_world.cars.len(), 4);

        a_world.car_mut(a_car).unwrap().pos = Vec2::new(-1.0, 0.5);
        a.publish(&a_world, &[]);
        host.poll(&mut host_world);
        b.poll(&mut b_world);
        assert_eq!(b_world.remote_car_mut(1000).unwrap().pos, Vec2::new(-1.0, 0.5));
    }

    #[test]
    fn test_poll_is_bounded() {
        let mut host_link = ChannelTransport::new(0);
        let mut client_link = ChannelTransport::new(1);
        link(&mut host_link, &mut client_link);
        let mut client_world = replica();
        let mut client = NetworkSync::client(client_link);
        client.add_local_player(&mut client_world, 1000, Team::Red, Controller::Human);
        client.poll(&mut client_world);

        let mut host_world = World::classic(config());
        let mut host = NetworkSync::host(host_link).with_max_events_per_poll(1);
        assert_eq!(host.poll(&mut host_world), 1);
        assert!(host_world.remote_car_mut(1000).is_none());
        assert_eq!(host.poll(&mut host_world), 1);
        assert!(host_world.remote_car_mut(1000).is_some());
        assert_eq!(host.poll(&mut host_world), 0);
    }
}
