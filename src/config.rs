//! Simulation configuration
//!
//! Every tuning constant lives here so a host can load them from a JSON file.
//! Missing fields fall back to the defaults in [`crate::consts`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Field and goal geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub radius: f32,
    /// Clearance kept between a car center and the field edge
    pub car_margin: f32,
    /// Clearance kept between a power-up and the field edge
    pub powerup_margin: f32,
    pub goal_width: f32,
    pub goal_height: f32,
    pub goal_depth: f32,
    pub goal_offset: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            radius: FIELD_RADIUS,
            car_margin: CAR_MARGIN,
            powerup_margin: POWERUP_MARGIN,
            goal_width: GOAL_WIDTH,
            goal_height: GOAL_HEIGHT,
            goal_depth: GOAL_DEPTH,
            goal_offset: GOAL_OFFSET,
        }
    }
}

/// Ball physics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallConfig {
    pub radius: f32,
    pub gravity: f32,
    pub bounce: f32,
    pub ground_friction: f32,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            radius: BALL_RADIUS,
            gravity: GRAVITY,
            bounce: BOUNCE_FACTOR,
            ground_friction: GROUND_FRICTION,
        }
    }
}

/// Car handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarConfig {
    pub max_speed: f32,
    /// Reverse cap as a fraction of `max_speed`
    pub reverse_ratio: f32,
    pub acceleration: f32,
    pub brake_force: f32,
    pub rolling_friction: f32,
    pub turn_speed: f32,
    pub radius: f32,
    pub kick_strength: f32,
    pub min_kick_speed: f32,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            max_speed: CAR_MAX_SPEED,
            reverse_ratio: CAR_REVERSE_RATIO,
            acceleration: CAR_ACCELERATION,
            brake_force: CAR_BRAKE_FORCE,
            rolling_friction: CAR_ROLLING_FRICTION,
            turn_speed: CAR_TURN_SPEED,
            radius: CAR_RADIUS,
            kick_strength: KICK_STRENGTH,
            min_kick_speed: MIN_KICK_SPEED,
        }
    }
}

/// Bot behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub decision_interval: f32,
    pub lead_time: f32,
    /// Beyond this ball distance a chasing bot falls back to its home spot
    pub give_up_distance: f32,
    /// Below this ball distance a defender re-engages
    pub engage_distance: f32,
    pub dead_band: f32,
    pub steering_cone: f32,
    pub stop_radius: f32,
    pub turn_step: f32,
    /// Ball x (toward own goal) past which the team is in danger
    pub defensive_threshold: f32,
    pub support_distance: f32,
    pub avoid_radius: f32,
    pub avoid_distance: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            decision_interval: AI_DECISION_INTERVAL,
            lead_time: AI_LEAD_TIME,
            give_up_distance: AI_GIVE_UP_DISTANCE,
            engage_distance: AI_ENGAGE_DISTANCE,
            dead_band: AI_DEAD_BAND,
            steering_cone: AI_STEERING_CONE,
            stop_radius: AI_STOP_RADIUS,
            turn_step: AI_TURN_STEP,
            defensive_threshold: AI_DEFENSIVE_THRESHOLD,
            support_distance: AI_SUPPORT_DISTANCE,
            avoid_radius: AI_AVOID_RADIUS,
            avoid_distance: AI_AVOID_DISTANCE,
        }
    }
}

/// Power-up lifecycle and effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpConfig {
    pub cap: usize,
    /// Ticks between ambient spawns (0 disables ambient spawning)
    pub spawn_interval_ticks: u32,
    pub respawn_secs: f32,
    pub pickup_radius: f32,
    pub spawn_min_fraction: f32,
    pub spawn_max_fraction: f32,
    pub effect_secs: f32,
    pub speed_boost_multiplier: f32,
    pub magnet_range: f32,
    pub magnet_accel: f32,
    pub goal_multiplier: u32,
}

impl Default for PowerUpConfig {
    fn default() -> Self {
        Self {
            cap: POWERUP_CAP,
            spawn_interval_ticks: POWERUP_SPAWN_INTERVAL_TICKS,
            respawn_secs: POWERUP_RESPAWN_SECS,
            pickup_radius: PICKUP_RADIUS,
            spawn_min_fraction: POWERUP_SPAWN_MIN_FRACTION,
            spawn_max_fraction: POWERUP_SPAWN_MAX_FRACTION,
            effect_secs: EFFECT_DURATION_SECS,
            speed_boost_multiplier: SPEED_BOOST_MULTIPLIER,
            magnet_range: MAGNET_RANGE,
            magnet_accel: MAGNET_ACCEL,
            goal_multiplier: GOAL_MULTIPLIER,
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_rate: f32,
    pub max_substeps: u32,
    /// Seed for power-up placement
    pub seed: u64,
    /// Reset cars to their home spots after a goal
    pub reset_cars_on_goal: bool,
    pub field: FieldConfig,
    pub ball: BallConfig,
    pub car: CarConfig,
    pub ai: AiConfig,
    pub powerups: PowerUpConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            max_substeps: MAX_SUBSTEPS,
            seed: 0x5EED,
            reset_cars_on_goal: true,
            field: FieldConfig::default(),
            ball: BallConfig::default(),
            car: CarConfig::default(),
            ai: AiConfig::default(),
            powerups: PowerUpConfig::default(),
        }
    }
}

impl SimConfig {
    /// Fixed tick length in seconds
    #[inline]
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Largest distance from the origin a car center may reach
    #[inline]
    pub fn car_limit(&self) -> f32 {
        self.field.radius - self.field.car_margin
    }

    /// Largest distance from the origin the ball center may reach
    #[inline]
    pub fn ball_limit(&self) -> f32 {
        self.field.radius - self.ball.radius
    }

    /// Largest distance from the origin a power-up may spawn at
    #[inline]
    pub fn powerup_limit(&self) -> f32 {
        self.field.radius - self.field.powerup_margin
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_rate > 0.0) {
            return Err(ConfigError::invalid("tick_rate", "must be positive"));
        }
        if !(self.field.radius > 0.0) {
            return Err(ConfigError::invalid("field.radius", "must be positive"));
        }
        if self.car_limit() <= 0.0 {
            return Err(ConfigError::invalid(
                "field.car_margin",
                "must be smaller than the field radius",
            ));
        }
        if self.ball_limit() <= 0.0 {
            return Err(ConfigError::invalid(
                "ball.radius",
                "must be smaller than the field radius",
            ));
        }
        if self.powerup_limit() <= 0.0 {
            return Err(ConfigError::invalid(
                "field.powerup_margin",
                "must be smaller than the field radius",
            ));
        }
        if !(self.car.max_speed > 0.0) {
            return Err(ConfigError::invalid("car.max_speed", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.car.reverse_ratio) {
            return Err(ConfigError::invalid("car.reverse_ratio", "must be within 0..=1"));
        }
        if !(0.0..=1.0).contains(&self.ball.bounce) {
            return Err(ConfigError::invalid("ball.bounce", "must be within 0..=1"));
        }
        if !(self.ai.decision_interval > 0.0) {
            return Err(ConfigError::invalid("ai.decision_interval", "must be positive"));
        }
        let pu = &self.powerups;
        if !(0.0 < pu.spawn_min_fraction
            && pu.spawn_min_fraction <= pu.spawn_max_fraction
            && pu.spawn_max_fraction <= 1.0)
        {
            return Err(ConfigError::invalid(
                "powerups.spawn_min_fraction",
                "spawn annulus must satisfy 0 < min <= max <= 1",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from a JSON file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Using default config ({e})");
                Self::default()
            }
        }
    }

    /// Save as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Config saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.dt() - 1.0 / 60.0).abs() < 1e-7);
        assert_eq!(config.car_limit(), 4.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json(r#"{ "field": { "radius": 10.0 }, "seed": 7 }"#)
            .expect("valid partial config");
        assert_eq!(config.field.radius, 10.0);
        assert_eq!(config.field.goal_width, GOAL_WIDTH);
        assert_eq!(config.seed, 7);
        assert_eq!(config.car, CarConfig::default());
    }

    #[test]
    fn test_rejects_margin_larger_than_field() {
        let err = SimConfig::from_json(r#"{ "field": { "radius": 1.0 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "field.car_margin",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(
            SimConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("kickoff-config-{}.json", std::process::id()));
        let mut config = SimConfig::default();
        config.ai.decision_interval = 0.25;
        config.save(&path).expect("save");
        let loaded = SimConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = SimConfig::load_or_default("/definitely/not/here.json");
        assert_eq!(config, SimConfig::default());
    }
}
