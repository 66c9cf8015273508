//! Power-up spawn, respawn and collection
//!
//! Placement uses a seeded PCG stream so two worlds with the same seed lay
//! out the same pickups.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::can_collect;
use super::state::{Car, GameEvent, PowerUp, PowerUpKind};
use crate::config::SimConfig;

#[derive(Debug, Clone)]
pub struct PowerUpManager {
    /// All power-ups, active or waiting to respawn (sorted by id)
    pub items: Vec<PowerUp>,
    rng: Pcg32,
    ticks_until_spawn: u32,
}

impl PowerUpManager {
    pub fn new(seed: u64) -> Self {
        Self {
            items: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            ticks_until_spawn: 0,
        }
    }

    pub fn get(&self, id: u32) -> Option<&PowerUp> {
        self.items.iter().find(|p| p.id == id)
    }

    pub fn active(&self) -> impl Iterator<Item = &PowerUp> {
        self.items.iter().filter(|p| p.active)
    }

    /// Uniform angle, radius within the configured annulus of the spawn limit.
    /// Always inside the playable field by construction.
    pub fn random_position(&mut self, config: &SimConfig) -> Vec2 {
        let pu = &config.powerups;
        let limit = config.powerup_limit();
        let fraction = if pu.spawn_min_fraction < pu.spawn_max_fraction {
            self.rng.random_range(pu.spawn_min_fraction..=pu.spawn_max_fraction)
        } else {
            pu.spawn_max_fraction
        };
        let theta = self.rng.random_range(0.0..TAU);
        Vec2::new(theta.cos(), theta.sin()) * (limit * fraction).min(limit)
    }

    pub fn random_kind(&mut self) -> PowerUpKind {
        PowerUpKind::ALL[self.rng.random_range(0..PowerUpKind::ALL.len())]
    }

    /// Place a new power-up with a random kind and position
    pub fn spawn(&mut self, id: u32, config: &SimConfig) -> &PowerUp {
        let kind = self.random_kind();
        let pos = self.random_position(config);
        self.insert(PowerUp {
            id,
            kind,
            pos,
            active: true,
            respawn_ticks: 0,
        })
    }

    /// Add or replace a power-up by id
    pub fn insert(&mut self, powerup: PowerUp) -> &PowerUp {
        let idx = match self.items.iter().position(|p| p.id == powerup.id) {
            Some(idx) => {
                self.items[idx] = powerup;
                idx
            }
            None => {
                self.items.push(powerup);
                self.items.len() - 1
            }
        };
        &self.items[idx]
    }

    /// Count down respawns and the ambient spawn timer.
    ///
    /// Returns true when an ambient spawn is due; the caller allocates the id
    /// and calls [`PowerUpManager::spawn`].
    pub fn update(&mut self, config: &SimConfig, events: &mut Vec<GameEvent>) -> bool {
        let mut respawned = Vec::new();
        for idx in 0..self.items.len() {
            let item = &mut self.items[idx];
            if item.active {
                continue;
            }
            item.respawn_ticks = item.respawn_ticks.saturating_sub(1);
            if item.respawn_ticks == 0 {
                respawned.push(idx);
            }
        }
        for idx in respawned {
            let pos = self.random_position(config);
            let item = &mut self.items[idx];
            item.pos = pos;
            item.active = true;
            log::debug!("Power-up {} ({:?}) respawned at {:?}", item.id, item.kind, pos);
            events.push(GameEvent::PowerUpRespawned {
                id: item.id,
                kind: item.kind,
                pos,
            });
        }

        let interval = config.powerups.spawn_interval_ticks;
        if interval == 0 {
            return false;
        }
        if self.ticks_until_spawn == 0 {
            self.ticks_until_spawn = interval;
        }
        self.ticks_until_spawn -= 1;
        self.ticks_until_spawn == 0 && self.items.len() < config.powerups.cap
    }

    /// Hand each active power-up within reach of a car to the first such car
    /// (in id order), apply its effect and start the respawn countdown.
    pub fn collect(&mut self, cars: &mut [Car], config: &SimConfig, events: &mut Vec<GameEvent>) {
        let respawn_ticks = respawn_ticks(config);
        for item in self.items.iter_mut().filter(|p| p.active) {
            let Some(car) = cars
                .iter_mut()
                .find(|car| can_collect(car, item, config.powerups.pickup_radius))
            else {
                continue;
            };
            car.effects.grant(item.kind, config.powerups.effect_secs);
            item.active = false;
            item.respawn_ticks = respawn_ticks;
            log::debug!("Car {} collected {:?} (power-up {})", car.id, item.kind, item.id);
            events.push(GameEvent::PowerUpCollected {
                id: item.id,
                kind: item.kind,
                car_id: car.id,
            });
        }
    }

    /// Deactivate a power-up by id, as told by an authoritative peer
    pub fn mark_collected(&mut self, id: u32, config: &SimConfig) -> Option<PowerUpKind> {
        let item = self.items.iter_mut().find(|p| p.id == id)?;
        item.active = false;
        item.respawn_ticks = respawn_ticks(config);
        Some(item.kind)
    }

    pub fn normalize_order(&mut self) {
        self.items.sort_by_key(|p| p.id);
    }
}

/// Respawn delay in whole ticks
pub fn respawn_ticks(config: &SimConfig) -> u32 {
    (config.powerups.respawn_secs * config.tick_rate).round().max(1.0) as u32
}
