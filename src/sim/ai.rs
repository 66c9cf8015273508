//! Bot controller
//!
//! Slow think, fast react: strategy and target are re-evaluated on a fixed
//! decision gate, while steering toward the stored target runs every tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{Ball, Car, CarIntent, GameEvent};
use crate::config::SimConfig;
use crate::{bearing_degrees, normalize_degrees};

/// Slack on the decision gate against float accumulation
const GATE_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiState {
    ChaseBall,
    Defend,
    SupportAttack,
    ReturnToPosition,
    AvoidObstacle,
}

/// Per-car bot. Owned by the world, one per AI-driven car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiController {
    car_id: u32,
    pub state: AiState,
    /// Steering target, picked on the decision gate
    pub target: Vec2,
    /// Set once the first target has been picked
    has_target: bool,
    decision_timer: f32,
    /// Number of decision gates passed
    pub decisions: u64,
}

impl AiController {
    pub fn new(car_id: u32) -> Self {
        Self {
            car_id,
            state: AiState::ChaseBall,
            target: Vec2::ZERO,
            has_target: false,
            decision_timer: 0.0,
            decisions: 0,
        }
    }

    pub fn car_id(&self) -> u32 {
        self.car_id
    }

    /// Run one tick for `car`: maybe re-decide, then steer. Returns the new
    /// intent; the caller writes it back to the car.
    ///
    /// The very first update picks a target without waiting for the gate.
    pub fn update(
        &mut self,
        car: &Car,
        cars: &[Car],
        ball: &Ball,
        config: &SimConfig,
        events: &mut Vec<GameEvent>,
    ) -> CarIntent {
        self.decision_timer += config.dt();
        let interval = config.ai.decision_interval;
        let gate = self.decision_timer + GATE_TOLERANCE >= interval;
        if gate {
            self.decision_timer -= interval;
            self.decisions += 1;
            let from = self.state;
            let to = self.choose_strategy(car, cars, ball, config);
            if to != from {
                log::debug!("Bot for car {}: {:?} -> {:?}", self.car_id, from, to);
                self.state = to;
                events.push(GameEvent::AiStateChanged {
                    car_id: self.car_id,
                    from,
                    to,
                });
            }
        }

        if gate || !self.has_target {
            self.target = self.target_for(car, cars, ball, config);
            self.has_target = true;
        }
        steer(car, self.target, config)
    }

    /// Transition table, evaluated on the decision gate only
    pub fn choose_strategy(
        &self,
        car: &Car,
        cars: &[Car],
        ball: &Ball,
        config: &SimConfig,
    ) -> AiState {
        let ai = &config.ai;
        let ball_pos = ball.ground_pos();
        let dist = car.pos.distance(ball_pos);
        let danger = in_danger(car, ball, config);

        match self.state {
            AiState::ChaseBall => {
                if danger {
                    AiState::Defend
                } else if dist > ai.give_up_distance {
                    AiState::ReturnToPosition
                } else if obstacle_ahead(car, cars, config).is_some() {
                    AiState::AvoidObstacle
                } else if teammate_closer(car, cars, ball_pos) {
                    AiState::SupportAttack
                } else {
                    AiState::ChaseBall
                }
            }
            AiState::Defend => {
                if danger {
                    AiState::Defend
                } else if dist < ai.engage_distance {
                    AiState::ChaseBall
                } else {
                    AiState::ReturnToPosition
                }
            }
            AiState::ReturnToPosition => {
                if danger {
                    AiState::Defend
                } else if dist < ai.engage_distance {
                    AiState::ChaseBall
                } else {
                    AiState::ReturnToPosition
                }
            }
            AiState::SupportAttack => {
                if danger {
                    AiState::Defend
                } else if teammate_closer(car, cars, ball_pos) {
                    AiState::SupportAttack
                } else {
                    AiState::ChaseBall
                }
            }
            AiState::AvoidObstacle => {
                if danger {
                    AiState::Defend
                } else if obstacle_ahead(car, cars, config).is_some() {
                    AiState::AvoidObstacle
                } else {
                    AiState::ChaseBall
                }
            }
        }
    }

    /// Where the current state wants the car to go
    pub fn target_for(&self, car: &Car, cars: &[Car], ball: &Ball, config: &SimConfig) -> Vec2 {
        let side = car.team.goal_side();
        let ball_pos = ball.ground_pos();
        match self.state {
            AiState::ChaseBall => ball_pos + ball.ground_vel() * config.ai.lead_time,
            AiState::Defend => {
                let half_width = config.field.goal_width / 2.0;
                Vec2::new(
                    side * config.car_limit(),
                    ball_pos.y.clamp(-half_width, half_width),
                )
            }
            AiState::SupportAttack => ball_pos + Vec2::new(side * config.ai.support_distance, 0.0),
            AiState::ReturnToPosition => car.home,
            AiState::AvoidObstacle => {
                let Some(obstacle) = obstacle_ahead(car, cars, config) else {
                    return ball_pos;
                };
                // Sidestep away from the obstacle, preferring the ball side
                let mut perp = car.forward().perp();
                let toward_ball = ball_pos - car.pos;
                let away = car.pos - obstacle;
                let preference = if toward_ball.length_squared() > crate::EPSILON {
                    toward_ball
                } else {
                    away
                };
                if perp.dot(preference) < 0.0 {
                    perp = -perp;
                }
                let target = car.pos + perp * config.ai.avoid_distance;
                let limit = config.car_limit();
                if target.length() > limit {
                    target.normalize_or_zero() * limit
                } else {
                    target
                }
            }
        }
    }
}

/// Turn-then-drive steering toward `target`.
///
/// Rotation is a fixed step outside the dead-band; the car accelerates only
/// when far enough away and roughly facing the target, otherwise it brakes.
pub fn steer(car: &Car, target: Vec2, config: &SimConfig) -> CarIntent {
    let ai = &config.ai;
    let mut intent = CarIntent::default();
    let Some(bearing) = bearing_degrees(car.pos, target) else {
        return intent;
    };

    let error = normalize_degrees(bearing - car.heading);
    if error.abs() > ai.dead_band {
        // Error of exactly 180 is positive after normalization
        intent.turn_impulse = ai.turn_step.copysign(error);
    }

    let distance = car.pos.distance(target);
    if distance > ai.stop_radius && error.abs() < ai.steering_cone {
        intent.accelerate = true;
    } else {
        intent.brake = true;
    }
    intent
}

/// Ball is past the defensive threshold on this car's own half
fn in_danger(car: &Car, ball: &Ball, config: &SimConfig) -> bool {
    ball.pos.x * car.team.goal_side() > config.ai.defensive_threshold
}

/// Nearest opposing car within avoid range inside the forward cone
fn obstacle_ahead(car: &Car, cars: &[Car], config: &SimConfig) -> Option<Vec2> {
    let forward = car.forward();
    let cone = config.ai.steering_cone.to_radians().cos();
    cars.iter()
        .filter(|other| other.id != car.id && other.team != car.team)
        .filter_map(|other| {
            let offset = other.pos - car.pos;
            let dist = offset.length();
            if dist < crate::EPSILON || dist >= config.ai.avoid_radius {
                return None;
            }
            (forward.dot(offset / dist) >= cone).then_some((dist, other.pos))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, pos)| pos)
}

/// A teammate is strictly closer to the ball
fn teammate_closer(car: &Car, cars: &[Car], ball_pos: Vec2) -> bool {
    let own = car.pos.distance(ball_pos);
    cars.iter()
        .filter(|other| other.id != car.id && other.team == car.team)
        .any(|other| other.pos.distance(ball_pos) < own)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Controller, Team};
    use crate::wrap_degrees;
    use glam::Vec3;

    fn blue_car(pos: Vec2) -> Car {
        Car::new(3, Team::Blue, Controller::Ai, pos)
    }

    fn ball_at(x: f32, z: f32) -> Ball {
        let mut ball = Ball::new(1, 0.25);
        ball.pos = Vec3::new(x, 0.25, z);
        ball
    }

    #[test]
    fn test_target_behind_turns_one_way() {
        let config = SimConfig::default();
        let mut car = blue_car(Vec2::ZERO);
        car.heading = 0.0;
        let target = Vec2::new(-3.0, 0.0);

        let bearing = bearing_degrees(car.pos, target).unwrap();
        assert!((normalize_degrees(bearing - car.heading).abs() - 180.0).abs() < 1e-3);

        let first = steer(&car, target, &config).turn_impulse;
        assert!(first != 0.0);
        let mut turned = 0;
        for _ in 0..200 {
            let intent = steer(&car, target, &config);
            if intent.turn_impulse == 0.0 {
                break;
            }
            assert_eq!(intent.turn_impulse, first, "direction flipped");
            car.heading = wrap_degrees(car.heading + intent.turn_impulse);
            turned += 1;
        }
        assert!(turned > 80);
        let error = normalize_degrees(bearing - car.heading);
        assert!(error.abs() <= config.ai.dead_band);
    }

    #[test]
    fn test_steer_coincident_target_is_neutral() {
        let config = SimConfig::default();
        let car = blue_car(Vec2::new(1.0, 1.0));
        let intent = steer(&car, car.pos, &config);
        assert_eq!(intent, CarIntent::default());
    }

    #[test]
    fn test_steer_drives_when_facing() {
        let config = SimConfig::default();
        let mut car = blue_car(Vec2::ZERO);
        car.heading = 90.0;
        let intent = steer(&car, Vec2::new(0.1, 3.0), &config);
        assert!(intent.accelerate);
        assert!(!intent.brake);
        assert_eq!(intent.turn_impulse, 0.0);

        // Inside the stop radius the bot brakes
        let intent = steer(&car, Vec2::new(0.0, 0.3), &config);
        assert!(intent.brake);
    }

    #[test]
    fn test_chase_to_defend_and_back() {
        let config = SimConfig::default();
        let car = blue_car(Vec2::new(3.0, 0.0));
        let cars = vec![car.clone()];
        let mut bot = AiController::new(car.id);

        // Blue defends +x; a ball on the blue half is danger
        let ball = ball_at(2.0, 0.0);
        assert_eq!(bot.choose_strategy(&car, &cars, &ball, &config), AiState::Defend);
        bot.state = AiState::Defend;
        assert_eq!(bot.choose_strategy(&car, &cars, &ball, &config), AiState::Defend);

        let ball = ball_at(-1.0, 0.0);
        assert_eq!(bot.choose_strategy(&car, &cars, &ball, &config), AiState::ChaseBall);
    }

    #[test]
    fn test_give_up_and_return() {
        let mut config = SimConfig::default();
        config.ai.give_up_distance = 3.0;
        config.ai.engage_distance = 2.0;
        let car = blue_car(Vec2::new(3.0, 0.0));
        let cars = vec![car.clone()];
        let mut bot = AiController::new(car.id);

        let far = ball_at(-3.0, 0.0);
        assert_eq!(
            bot.choose_strategy(&car, &cars, &far, &config),
            AiState::ReturnToPosition
        );
        bot.state = AiState::ReturnToPosition;
        assert_eq!(bot.target_for(&car, &cars, &far, &config), car.home);

        let near = ball_at(1.5, -0.5);
        // Still on the blue half, so defend first
        assert_eq!(bot.choose_strategy(&car, &cars, &near, &config), AiState::Defend);
        let near = ball_at(-0.5, 0.0);
        assert_eq!(bot.choose_strategy(&car, &cars, &near, &config), AiState::ReturnToPosition);
        config.ai.engage_distance = 4.0;
        assert_eq!(bot.choose_strategy(&car, &cars, &near, &config), AiState::ChaseBall);
    }

    #[test]
    fn test_support_when_teammate_closer() {
        let config = SimConfig::default();
        let car = blue_car(Vec2::new(3.0, 1.0));
        let mut mate = Car::new(4, Team::Blue, Controller::Ai, Vec2::new(-1.5, 0.0));
        mate.heading = 0.0;
        let cars = vec![car.clone(), mate];
        let mut bot = AiController::new(car.id);
        let ball = ball_at(-2.0, 0.0);

        assert_eq!(
            bot.choose_strategy(&car, &cars, &ball, &config),
            AiState::SupportAttack
        );
        bot.state = AiState::SupportAttack;
        let target = bot.target_for(&car, &cars, &ball, &config);
        assert_eq!(target, Vec2::new(-0.5, 0.0));

        // Alone again: back to chasing
        let alone = vec![car.clone()];
        assert_eq!(bot.choose_strategy(&car, &alone, &ball, &config), AiState::ChaseBall);
    }

    #[test]
    fn test_avoid_opponent_ahead() {
        let config = SimConfig::default();
        let car = blue_car(Vec2::new(1.0, 0.0));
        // Blue starts facing 180, toward -x
        let opponent = Car::new(2, Team::Red, Controller::Human, Vec2::new(0.0, 0.0));
        let cars = vec![opponent, car.clone()];
        let mut bot = AiController::new(car.id);
        let ball = ball_at(-2.0, 1.0);

        assert_eq!(
            bot.choose_strategy(&car, &cars, &ball, &config),
            AiState::AvoidObstacle
        );
        bot.state = AiState::AvoidObstacle;
        let target = bot.target_for(&car, &cars, &ball, &config);
        // Sidestep toward the ball side (+z)
        assert!(target.y > 0.5);
        assert!((target.x - 1.0).abs() < 1e-4);

        let clear = vec![car.clone()];
        assert_eq!(bot.choose_strategy(&car, &clear, &ball, &config), AiState::ChaseBall);
    }

    #[test]
    fn test_defend_target_clamped_to_goal_mouth() {
        let config = SimConfig::default();
        let car = blue_car(Vec2::new(3.0, 0.0));
        let cars = vec![car.clone()];
        let mut bot = AiController::new(car.id);
        bot.state = AiState::Defend;
        let target = bot.target_for(&car, &cars, &ball_at(2.0, 3.0), &config);
        assert_eq!(target, Vec2::new(config.car_limit(), 0.75));
    }

    #[test]
    fn test_chase_target_leads_ball() {
        let config = SimConfig::default();
        let car = blue_car(Vec2::new(3.0, 0.0));
        let cars = vec![car.clone()];
        let bot = AiController::new(car.id);
        let mut ball = ball_at(-1.0, 0.0);
        ball.vel = Vec3::new(2.0, 0.0, -1.0);
        let target = bot.target_for(&car, &cars, &ball, &config);
        assert_eq!(target, Vec2::new(0.0, -0.5));
    }

    #[test]
    fn test_decision_gate_cadence() {
        let config = SimConfig::default();
        let car = blue_car(Vec2::new(3.0, 0.0));
        let cars = vec![car.clone()];
        let ball = ball_at(-1.0, 0.0);
        let mut bot = AiController::new(car.id);
        let mut events = Vec::new();

        let mut fired = Vec::new();
        for tick in 1..=180 {
            let before = bot.decisions;
            bot.update(&car, &cars, &ball, &config, &mut events);
            if bot.decisions != before {
                fired.push(tick);
            }
        }
        assert_eq!(fired, vec![30, 60, 90, 120, 150, 180]);
    }

    #[test]
    fn test_target_held_between_gates() {
        let config = SimConfig::default();
        let car = blue_car(Vec2::new(3.0, 0.0));
        let cars = vec![car.clone()];
        let mut bot = AiController::new(car.id);
        let mut events = Vec::new();

        bot.update(&car, &cars, &ball_at(-1.0, 0.0), &config, &mut events);
        assert_eq!(bot.target, Vec2::new(-1.0, 0.0));

        let moved = ball_at(-2.0, 2.0);
        for _ in 2..30 {
            bot.update(&car, &cars, &moved, &config, &mut events);
            assert_eq!(bot.target, Vec2::new(-1.0, 0.0));
        }
        assert_eq!(bot.decisions, 0);

        // Tick 30 passes the gate and re-targets
        bot.update(&car, &cars, &moved, &config, &mut events);
        assert_eq!(bot.decisions, 1);
        assert_eq!(bot.state, AiState::ChaseBall);
        assert_eq!(bot.target, Vec2::new(-2.0, 2.0));
    }

    #[test]
    fn test_transition_emits_event() {
        let config = SimConfig::default();
        let car = blue_car(Vec2::new(3.0, 0.0));
        let cars = vec![car.clone()];
        let ball = ball_at(2.0, 0.0);
        let mut bot = AiController::new(car.id);
        let mut events = Vec::new();
        for _ in 0..30 {
            bot.update(&car, &cars, &ball, &config, &mut events);
        }
        assert_eq!(bot.state, AiState::Defend);
        assert_eq!(
            events,
            vec![GameEvent::AiStateChanged {
                car_id: 3,
                from: AiState::ChaseBall,
                to: AiState::Defend,
            }]
        );
    }
}
