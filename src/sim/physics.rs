//! Rigid body integration for the ball and cars
//!
//! Each function mutates only the entity it is handed. Car speed is in units
//! per tick, ball velocity in units per second.

use super::state::{Ball, Car, PowerUpKind};
use crate::config::{BallConfig, SimConfig};
use crate::wrap_degrees;

/// Advance the ball by one tick: gravity, integration, ground bounce.
///
/// Ground friction is applied only on the tick the ball touches the floor,
/// not as continuous drag.
pub fn integrate_ball(ball: &mut Ball, config: &BallConfig, dt: f32) {
    ball.vel.y += config.gravity * dt;
    ball.pos += ball.vel * dt;

    if ball.pos.y < ball.radius {
        ball.pos.y = ball.radius;
        ball.vel.y = -ball.vel.y * config.bounce;
        ball.vel.x *= config.ground_friction;
        ball.vel.z *= config.ground_friction;
    }
}

/// Advance a car by one tick from its current intent.
pub fn integrate_car(car: &mut Car, config: &SimConfig) {
    let handling = &config.car;
    let max_speed = car.max_speed(config);
    let intent = car.intent;

    // One-shot rotation from an impulse adapter or a bot
    if intent.turn_impulse != 0.0 {
        car.heading = wrap_degrees(car.heading + intent.turn_impulse);
        car.intent.turn_impulse = 0.0;
    }

    let acceleration = if intent.accelerate {
        handling.acceleration
    } else if intent.brake {
        -handling.brake_force
    } else {
        0.0
    };
    car.speed += acceleration;

    // Constant rolling friction, snapping to rest instead of crawling
    if car.speed.abs() < handling.rolling_friction {
        car.speed = 0.0;
    } else {
        car.speed -= handling.rolling_friction * car.speed.signum();
    }

    car.speed = car
        .speed
        .clamp(-max_speed * handling.reverse_ratio, max_speed);

    // Turn authority scales with |speed|; reversing does not flip the wheel
    let turn_sign = match (intent.turn_left, intent.turn_right) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    };
    if turn_sign != 0.0 && car.speed != 0.0 {
        let authority = car.speed.abs() / max_speed;
        car.heading = wrap_degrees(car.heading + handling.turn_speed * authority * turn_sign);
    }

    car.pos += car.velocity();
}

/// Pull the ball toward every car holding a ball magnet within range.
pub fn apply_ball_magnet(ball: &mut Ball, cars: &[Car], config: &SimConfig, dt: f32) {
    let range = config.powerups.magnet_range;
    for car in cars.iter().filter(|c| c.effects.has(PowerUpKind::BallMagnet)) {
        let to_car = car.pos - ball.ground_pos();
        let dist = to_car.length();
        if dist > crate::EPSILON && dist < range {
            let pull = to_car / dist * config.powerups.magnet_accel * dt;
            ball.vel.x += pull.x;
            ball.vel.z += pull.y;
        }
    }
}
