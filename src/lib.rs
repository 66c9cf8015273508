//! Kickoff - a car football mini-game on a circular field
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, collisions, AI, power-ups, scoring)
//! - `net`: Peer replication over a fixed-size message protocol
//! - `snapshot`: Read-only state handed to a renderer
//! - `config`: Externally tunable constants

pub mod config;
pub mod error;
pub mod net;
pub mod sim;
pub mod snapshot;

pub use config::SimConfig;
pub use error::{ConfigError, ProtocolError, TransportError};
pub use sim::{Stepper, TickInput, World};
pub use snapshot::RenderSnapshot;

use glam::Vec2;

/// Default tuning constants. Everything here is overridable through [`SimConfig`].
pub mod consts {
    /// Fixed simulation rate (60 Hz)
    pub const TICK_RATE: f32 = 60.0;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / TICK_RATE;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Field dimensions
    pub const FIELD_RADIUS: f32 = 6.0;
    pub const CAR_MARGIN: f32 = 2.0;
    pub const POWERUP_MARGIN: f32 = 1.5;

    /// Goal mouths sit at both ends of the x axis
    pub const GOAL_WIDTH: f32 = 1.5;
    pub const GOAL_HEIGHT: f32 = 1.0;
    pub const GOAL_DEPTH: f32 = 0.1;
    pub const GOAL_OFFSET: f32 = 0.5;

    /// Ball defaults (units, units/s²)
    pub const BALL_RADIUS: f32 = 0.25;
    pub const GRAVITY: f32 = -9.81;
    pub const BOUNCE_FACTOR: f32 = 0.7;
    /// Horizontal velocity retained on each ground contact
    pub const GROUND_FRICTION: f32 = 0.98;

    /// Car defaults (units/tick, degrees/tick)
    pub const CAR_MAX_SPEED: f32 = 0.3;
    pub const CAR_REVERSE_RATIO: f32 = 0.5;
    pub const CAR_ACCELERATION: f32 = 0.01;
    pub const CAR_BRAKE_FORCE: f32 = 0.01;
    pub const CAR_ROLLING_FRICTION: f32 = 0.002;
    pub const CAR_TURN_SPEED: f32 = 3.0;
    /// Collision proxy radius of a car body
    pub const CAR_RADIUS: f32 = 0.6;
    /// Ball speed (units/s) imparted per unit of car speed (units/tick)
    pub const KICK_STRENGTH: f32 = 25.0;
    /// Minimum ball speed after any car contact
    pub const MIN_KICK_SPEED: f32 = 1.5;

    /// AI defaults
    pub const AI_DECISION_INTERVAL: f32 = 0.5;
    pub const AI_LEAD_TIME: f32 = 0.5;
    pub const AI_GIVE_UP_DISTANCE: f32 = 15.0;
    pub const AI_ENGAGE_DISTANCE: f32 = 10.0;
    pub const AI_DEAD_BAND: f32 = 5.0;
    pub const AI_STEERING_CONE: f32 = 45.0;
    pub const AI_STOP_RADIUS: f32 = 0.5;
    pub const AI_TURN_STEP: f32 = 2.0;
    pub const AI_DEFENSIVE_THRESHOLD: f32 = 0.0;
    pub const AI_SUPPORT_DISTANCE: f32 = 1.5;
    pub const AI_AVOID_RADIUS: f32 = 1.5;
    pub const AI_AVOID_DISTANCE: f32 = 1.5;

    /// Power-up defaults
    pub const POWERUP_CAP: usize = 4;
    pub const POWERUP_SPAWN_INTERVAL_TICKS: u32 = 600;
    pub const POWERUP_RESPAWN_SECS: f32 = 5.0;
    pub const PICKUP_RADIUS: f32 = 1.5;
    pub const POWERUP_SPAWN_MIN_FRACTION: f32 = 0.7;
    pub const POWERUP_SPAWN_MAX_FRACTION: f32 = 1.0;

    /// Power-up effects
    pub const EFFECT_DURATION_SECS: f32 = 5.0;
    pub const SPEED_BOOST_MULTIPLIER: f32 = 1.5;
    pub const MAGNET_RANGE: f32 = 3.0;
    pub const MAGNET_ACCEL: f32 = 4.0;
    pub const GOAL_MULTIPLIER: u32 = 2;
}

/// Distances below this are treated as coincident points
pub const EPSILON: f32 = 1e-5;

/// Wrap a heading to [0, 360)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Signed angular difference normalized to (-180, 180]
#[inline]
pub fn normalize_degrees(mut angle: f32) -> f32 {
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

/// Unit direction on the x/z plane for a heading in degrees
#[inline]
pub fn heading_vector(heading: f32) -> Vec2 {
    let radians = heading.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

/// Bearing in degrees from `from` to `to`, or `None` when the points coincide
#[inline]
pub fn bearing_degrees(from: Vec2, to: Vec2) -> Option<f32> {
    let delta = to - from;
    if delta.length_squared() < EPSILON * EPSILON {
        return None;
    }
    Some(delta.y.atan2(delta.x).to_degrees())
}
