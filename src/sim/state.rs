//! World state and core simulation types
//!
//! The [`World`] aggregate owns every entity. Subsystems borrow only the
//! pieces they need for the duration of one tick phase.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::ai::AiController;
use super::powerup::PowerUpManager;
use super::score::ScoreKeeper;
use crate::config::SimConfig;
use crate::heading_vector;

/// The two sides of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub const ALL: [Team; 2] = [Team::Red, Team::Blue];

    /// Sign of the x axis on which this team's own goal sits
    #[inline]
    pub fn goal_side(self) -> f32 {
        match self {
            Team::Red => -1.0,
            Team::Blue => 1.0,
        }
    }

    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Team::Red => 0,
            Team::Blue => 1,
        }
    }

    pub fn code(self) -> u8 {
        self.index() as u8
    }

    pub fn from_code(code: u8) -> Option<Team> {
        match code {
            0 => Some(Team::Red),
            1 => Some(Team::Blue),
            _ => None,
        }
    }
}

/// Entity kinds, as seen by the renderer and the network layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Car,
    Ball,
    PowerUp,
}

/// Who drives a car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    /// Local player input
    Human,
    /// Driven by an [`AiController`]
    Ai,
    /// Pose replicated from a network peer
    Remote { player_id: u32 },
}

/// Desired control input for a car. Consumed by physics, never produced by it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarIntent {
    pub accelerate: bool,
    pub brake: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    /// One-shot heading change (degrees) applied by the next physics step
    pub turn_impulse: f32,
}

impl CarIntent {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    SpeedBoost,
    Shield,
    BallMagnet,
    GoalMultiplier,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::SpeedBoost,
        PowerUpKind::Shield,
        PowerUpKind::BallMagnet,
        PowerUpKind::GoalMultiplier,
    ];

    pub fn code(self) -> u8 {
        match self {
            PowerUpKind::SpeedBoost => 0,
            PowerUpKind::Shield => 1,
            PowerUpKind::BallMagnet => 2,
            PowerUpKind::GoalMultiplier => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// A pickup placed on the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    /// Inactive power-ups are neither collidable nor rendered
    pub active: bool,
    /// Ticks until an inactive power-up comes back
    pub respawn_ticks: u32,
}

/// Remaining seconds of each power-up effect held by a car
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarEffects {
    pub speed_boost: f32,
    pub shield: f32,
    pub ball_magnet: f32,
    pub goal_multiplier: f32,
}

impl CarEffects {
    /// Start (or refresh) an effect
    pub fn grant(&mut self, kind: PowerUpKind, secs: f32) {
        let slot = self.slot_mut(kind);
        *slot = slot.max(secs);
    }

    pub fn has(&self, kind: PowerUpKind) -> bool {
        self.remaining(kind) > 0.0
    }

    pub fn remaining(&self, kind: PowerUpKind) -> f32 {
        match kind {
            PowerUpKind::SpeedBoost => self.speed_boost,
            PowerUpKind::Shield => self.shield,
            PowerUpKind::BallMagnet => self.ball_magnet,
            PowerUpKind::GoalMultiplier => self.goal_multiplier,
        }
    }

    /// Count every effect down by one tick
    pub fn tick(&mut self, dt: f32) {
        for kind in PowerUpKind::ALL {
            let slot = self.slot_mut(kind);
            *slot = (*slot - dt).max(0.0);
        }
    }

    fn slot_mut(&mut self, kind: PowerUpKind) -> &mut f32 {
        match kind {
            PowerUpKind::SpeedBoost => &mut self.speed_boost,
            PowerUpKind::Shield => &mut self.shield,
            PowerUpKind::BallMagnet => &mut self.ball_magnet,
            PowerUpKind::GoalMultiplier => &mut self.goal_multiplier,
        }
    }
}

/// A car confined to the x/z plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: u32,
    pub team: Team,
    pub controller: Controller,
    /// Position on the plane (x, z)
    pub pos: Vec2,
    /// Heading in degrees, wrapped to [0, 360)
    pub heading: f32,
    /// Signed forward speed (units per tick)
    pub speed: f32,
    pub intent: CarIntent,
    pub effects: CarEffects,
    /// Kickoff spot
    pub home: Vec2,
    pub home_heading: f32,
}

impl Car {
    pub fn new(id: u32, team: Team, controller: Controller, home: Vec2) -> Self {
        // Face the opponent goal
        let home_heading = if team.goal_side() < 0.0 { 0.0 } else { 180.0 };
        Self {
            id,
            team,
            controller,
            pos: home,
            heading: home_heading,
            speed: 0.0,
            intent: CarIntent::default(),
            effects: CarEffects::default(),
            home,
            home_heading,
        }
    }

    /// Forward direction on the plane
    #[inline]
    pub fn forward(&self) -> Vec2 {
        heading_vector(self.heading)
    }

    /// Displacement per tick
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.forward() * self.speed
    }

    /// Forward speed cap, including any speed boost
    pub fn max_speed(&self, config: &SimConfig) -> f32 {
        if self.effects.has(PowerUpKind::SpeedBoost) {
            config.car.max_speed * config.powerups.speed_boost_multiplier
        } else {
            config.car.max_speed
        }
    }

    pub fn is_shielded(&self) -> bool {
        self.effects.has(PowerUpKind::Shield)
    }

    /// Back to the kickoff spot, at rest
    pub fn reset_to_home(&mut self) {
        self.pos = self.home;
        self.heading = self.home_heading;
        self.speed = 0.0;
        self.intent.clear();
    }
}

/// The ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    /// y is height above the ground
    pub pos: Vec3,
    /// Units per second
    pub vel: Vec3,
    pub radius: f32,
}

impl Ball {
    pub fn new(id: u32, radius: f32) -> Self {
        Self {
            id,
            pos: Vec3::new(0.0, radius, 0.0),
            vel: Vec3::ZERO,
            radius,
        }
    }

    /// Center spot, at rest
    pub fn reset(&mut self) {
        self.pos = Vec3::new(0.0, self.radius, 0.0);
        self.vel = Vec3::ZERO;
    }

    /// Position projected on the plane (x, z)
    #[inline]
    pub fn ground_pos(&self) -> Vec2 {
        Vec2::new(self.pos.x, self.pos.z)
    }

    /// Horizontal velocity (x, z)
    #[inline]
    pub fn ground_vel(&self) -> Vec2 {
        Vec2::new(self.vel.x, self.vel.z)
    }

    #[inline]
    pub fn set_ground_vel(&mut self, vel: Vec2) {
        self.vel.x = vel.x;
        self.vel.z = vel.y;
    }
}

/// Things that happened during a tick, drained by the owner of the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    GoalScored {
        team: Team,
        points: u32,
    },
    PowerUpSpawned {
        id: u32,
        kind: PowerUpKind,
        pos: Vec2,
    },
    PowerUpCollected {
        id: u32,
        kind: PowerUpKind,
        car_id: u32,
    },
    PowerUpRespawned {
        id: u32,
        kind: PowerUpKind,
        pos: Vec2,
    },
    AiStateChanged {
        car_id: u32,
        from: super::ai::AiState,
        to: super::ai::AiState,
    },
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct World {
    pub config: SimConfig,
    /// Simulation tick counter
    pub tick: u64,
    /// Cars (sorted by id for determinism)
    pub cars: Vec<Car>,
    pub ball: Ball,
    pub powerups: PowerUpManager,
    pub score: ScoreKeeper,
    /// One controller per AI-owned car
    pub bots: Vec<AiController>,
    /// Events produced since the last drain
    pub events: Vec<GameEvent>,
    /// Owns ball, power-up and score outcomes. Replicas mirror a host instead.
    pub authoritative: bool,
    /// Next entity ID
    next_id: u32,
}

impl World {
    /// Create an empty field with only the ball
    pub fn new(config: SimConfig) -> Self {
        let ball = Ball::new(1, config.ball.radius);
        let powerups = PowerUpManager::new(config.seed);
        let score = ScoreKeeper::new(&config);
        Self {
            config,
            tick: 0,
            cars: Vec::new(),
            ball,
            powerups,
            score,
            bots: Vec::new(),
            events: Vec::new(),
            authoritative: true,
            next_id: 2,
        }
    }

    /// One local human (red) against one bot (blue)
    pub fn classic(config: SimConfig) -> Self {
        let mut world = Self::new(config);
        world.add_car(Team::Red, Controller::Human);
        world.add_car(Team::Blue, Controller::Ai);
        world
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a car at its team's next kickoff spot, returning its id
    pub fn add_car(&mut self, team: Team, controller: Controller) -> u32 {
        let id = self.next_entity_id();
        let home = self.kickoff_spot(team);
        self.cars.push(Car::new(id, team, controller, home));
        if controller == Controller::Ai {
            self.bots.push(AiController::new(id));
        }
        self.cars.sort_by_key(|c| c.id);
        id
    }

    /// Remove a car and its bot, if any
    pub fn remove_car(&mut self, id: u32) -> Option<Car> {
        let idx = self.cars.iter().position(|c| c.id == id)?;
        self.bots.retain(|b| b.car_id() != id);
        Some(self.cars.remove(idx))
    }

    pub fn car(&self, id: u32) -> Option<&Car> {
        self.cars.iter().find(|c| c.id == id)
    }

    pub fn car_mut(&mut self, id: u32) -> Option<&mut Car> {
        self.cars.iter_mut().find(|c| c.id == id)
    }

    pub fn bot(&self, car_id: u32) -> Option<&AiController> {
        self.bots.iter().find(|b| b.car_id() == car_id)
    }

    /// Find the car replicated for a remote player
    pub fn remote_car_mut(&mut self, player_id: u32) -> Option<&mut Car> {
        self.cars
            .iter_mut()
            .find(|c| c.controller == Controller::Remote { player_id })
    }

    /// Take all events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Kickoff spot for the next car of `team`: half way to the own goal,
    /// spread along z for additional teammates
    fn kickoff_spot(&self, team: Team) -> Vec2 {
        let teammates = self.cars.iter().filter(|c| c.team == team).count();
        let spacing = self.config.car.radius * 2.5;
        let rank = teammates.div_ceil(2) as f32;
        let z = if teammates % 2 == 1 { rank * spacing } else { -rank * spacing };
        let spot = Vec2::new(team.goal_side() * self.config.field.radius / 2.0, z);
        let limit = self.config.car_limit();
        if spot.length() > limit {
            spot.normalize_or_zero() * limit
        } else {
            spot
        }
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.cars.sort_by_key(|c| c.id);
        self.bots.sort_by_key(|b| b.car_id());
        self.powerups.normalize_order();
    }
}
