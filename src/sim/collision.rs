//! Pairwise contact resolution
//!
//! Distance-threshold contacts on the x/z plane: car vs ball, car vs car,
//! car vs power-up. No rotational dynamics.

use glam::Vec2;

use super::state::{Ball, Car, PowerUp};
use crate::EPSILON;
use crate::config::SimConfig;

/// Result of a contact check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from the first body toward the second
    pub normal: Vec2,
    /// Overlap depth
    pub penetration: f32,
}

/// Overlap test between two discs on the plane.
///
/// Coincident centers resolve along `fallback` so the response stays
/// deterministic.
pub fn disc_contact(a: Vec2, b: Vec2, min_dist: f32, fallback: Vec2) -> Option<Contact> {
    let offset = b - a;
    let dist = offset.length();
    if dist >= min_dist {
        return None;
    }
    let normal = if dist > EPSILON {
        offset / dist
    } else {
        fallback.try_normalize().unwrap_or(Vec2::X)
    };
    Some(Contact {
        normal,
        penetration: min_dist - dist,
    })
}

/// Car hits ball: push the ball out of the car and kick it along the
/// contact normal. Returns whether a contact happened.
pub fn resolve_car_ball(car: &Car, ball: &mut Ball, config: &SimConfig) -> bool {
    let min_dist = config.car.radius + ball.radius;
    let Some(contact) = disc_contact(car.pos, ball.ground_pos(), min_dist, car.forward()) else {
        return false;
    };

    let surface = car.pos + contact.normal * min_dist;
    ball.pos.x = surface.x;
    ball.pos.z = surface.y;

    // Outward speed is at least the kick; tangential motion is kept
    let kick = (car.speed.abs() * config.car.kick_strength).max(config.car.min_kick_speed);
    let vel = ball.ground_vel();
    let outward = vel.dot(contact.normal);
    let tangential = vel - contact.normal * outward;
    ball.set_ground_vel(tangential + contact.normal * outward.max(kick));
    true
}

/// Push overlapping cars apart. Unshielded cars lose half their speed.
/// Returns the number of contacts.
pub fn resolve_car_car(cars: &mut [Car], config: &SimConfig) -> usize {
    let min_dist = config.car.radius * 2.0;
    let mut contacts = 0;
    for i in 0..cars.len() {
        for j in (i + 1)..cars.len() {
            let (left, right) = cars.split_at_mut(j);
            let a = &mut left[i];
            let b = &mut right[0];
            let Some(contact) = disc_contact(a.pos, b.pos, min_dist, Vec2::X) else {
                continue;
            };
            let push = contact.normal * (contact.penetration * 0.5);
            a.pos -= push;
            b.pos += push;
            for car in [a, b] {
                if !car.is_shielded() {
                    car.speed *= 0.5;
                }
            }
            contacts += 1;
        }
    }
    contacts
}

/// Whether a car is close enough to pick up a power-up
#[inline]
pub fn can_collect(car: &Car, powerup: &PowerUp, pickup_radius: f32) -> bool {
    powerup.active && car.pos.distance(powerup.pos) < pickup_radius
}
