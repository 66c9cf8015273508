//! Circular field boundary
//!
//! Entities that drift past their clearance limit are projected back onto the
//! limit circle and lose half their speed. Velocity direction is kept, so a
//! car pressed against the wall slides along it instead of bouncing back.

use glam::Vec2;

use super::state::{Ball, Car};
use crate::EPSILON;
use crate::config::SimConfig;

/// Fraction of speed kept after a wall contact
pub const WALL_SPEED_RETAINED: f32 = 0.5;

/// Slack before a position counts as outside. Keeps the clamp idempotent
/// against rounding in the rescale.
const LIMIT_TOLERANCE: f32 = 1e-4;

/// Project `pos` onto the circle of radius `limit` if it lies outside.
/// Returns whether a correction happened.
pub fn clamp_to_circle(pos: &mut Vec2, limit: f32) -> bool {
    let dist = pos.length();
    // Nothing to rescale at the origin
    if dist <= limit + LIMIT_TOLERANCE || dist < EPSILON {
        return false;
    }
    *pos *= limit / dist;
    true
}

/// Keep a car inside the field
pub fn resolve_car(car: &mut Car, config: &SimConfig) -> bool {
    let hit = clamp_to_circle(&mut car.pos, config.car_limit());
    if hit {
        car.speed *= WALL_SPEED_RETAINED;
    }
    hit
}

/// Keep the ball inside the field
pub fn resolve_ball(ball: &mut Ball, config: &SimConfig) -> bool {
    let mut ground = ball.ground_pos();
    let hit = clamp_to_circle(&mut ground, config.ball_limit());
    if hit {
        ball.pos.x = ground.x;
        ball.pos.z = ground.y;
        ball.vel.x *= WALL_SPEED_RETAINED;
        ball.vel.z *= WALL_SPEED_RETAINED;
    }
    hit
}
