//! Fixed timestep simulation tick
//!
//! Core game loop that advances the world deterministically, plus the
//! accumulator that decouples it from the presentation frame rate.

use super::state::{Controller, GameEvent, PowerUpKind, Team, World};
use super::{boundary, collision, physics};
use super::input::TickInput;

/// Advance the world by one fixed timestep
pub fn tick(world: &mut World, input: &TickInput) {
    input.apply(world);
    world.tick += 1;
    let dt = world.config.dt();

    for car in &mut world.cars {
        car.effects.tick(dt);
    }

    // Physics
    if world.authoritative {
        physics::apply_ball_magnet(&mut world.ball, &world.cars, &world.config, dt);
        physics::integrate_ball(&mut world.ball, &world.config.ball, dt);
    }
    for car in &mut world.cars {
        if !matches!(car.controller, Controller::Remote { .. }) {
            physics::integrate_car(car, &world.config);
        }
    }
    resolve_boundaries(world);

    // Power-up lifecycle
    if world.authoritative && world.powerups.update(&world.config, &mut world.events) {
        let id = world.next_entity_id();
        let item = world.powerups.spawn(id, &world.config);
        log::debug!("Power-up {} ({:?}) spawned at {:?}", item.id, item.kind, item.pos);
        world.events.push(GameEvent::PowerUpSpawned {
            id: item.id,
            kind: item.kind,
            pos: item.pos,
        });
    }

    // Pairwise contacts
    collision::resolve_car_car(&mut world.cars, &world.config);
    if world.authoritative {
        for car in &world.cars {
            collision::resolve_car_ball(car, &mut world.ball, &world.config);
        }
        world
            .powerups
            .collect(&mut world.cars, &world.config, &mut world.events);
    }
    // Contacts can push bodies back past the wall
    resolve_boundaries(world);

    if world.authoritative {
        check_goal(world);
    }

    update_bots(world);
    world.normalize_order();
}

fn resolve_boundaries(world: &mut World) {
    for car in &mut world.cars {
        boundary::resolve_car(car, &world.config);
    }
    boundary::resolve_ball(&mut world.ball, &world.config);
}

/// Score, then kick off again
fn check_goal(world: &mut World) {
    let Some(team) = world.score.check(&world.ball) else {
        return;
    };
    let points = goal_points(world, team);
    world.score.award(team, points);
    log::info!(
        "Goal for {:?} (+{}), score {:?}",
        team,
        points,
        world.score.table()
    );
    world.events.push(GameEvent::GoalScored { team, points });

    world.ball.reset();
    if world.config.reset_cars_on_goal {
        for car in &mut world.cars {
            car.reset_to_home();
        }
    }
}

/// Goals count double while any car of the scoring team holds a multiplier
fn goal_points(world: &World, team: Team) -> u32 {
    let boosted = world
        .cars
        .iter()
        .any(|c| c.team == team && c.effects.has(PowerUpKind::GoalMultiplier));
    if boosted {
        world.config.powerups.goal_multiplier
    } else {
        1
    }
}

/// Every bot steers every tick; the decision gate lives inside the bot
fn update_bots(world: &mut World) {
    let World {
        cars,
        ball,
        bots,
        config,
        events,
        ..
    } = world;
    for bot in bots.iter_mut() {
        let Some(idx) = cars.iter().position(|c| c.id == bot.car_id()) else {
            continue;
        };
        if cars[idx].controller != Controller::Ai {
            continue;
        }
        let intent = bot.update(&cars[idx], cars.as_slice(), ball, config, events);
        cars[idx].intent = intent;
    }
}

/// Fixed-step accumulator. Frame time goes in, whole ticks come out.
#[derive(Debug, Clone)]
pub struct Stepper {
    accumulator: f32,
    dt: f32,
    max_substeps: u32,
}

impl Stepper {
    /// Longest frame accepted before the excess is dropped
    pub const MAX_FRAME_SECS: f32 = 0.1;

    pub fn new(config: &crate::config::SimConfig) -> Self {
        Self {
            accumulator: 0.0,
            dt: config.dt(),
            max_substeps: config.max_substeps,
        }
    }

    /// Run as many ticks as `frame_dt` covers, capped to prevent a spiral of
    /// death. `input` is applied on the first tick only. Returns ticks run.
    pub fn advance(&mut self, world: &mut World, frame_dt: f32, input: &TickInput) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, Self::MAX_FRAME_SECS);

        let empty = TickInput::default();
        let mut substeps = 0;
        while self.accumulator >= self.dt && substeps < self.max_substeps {
            tick(world, if substeps == 0 { input } else { &empty });
            self.accumulator -= self.dt;
            substeps += 1;
        }
        if substeps == self.max_substeps && self.accumulator >= self.dt {
            log::debug!("Dropping {:.3}s of simulation backlog", self.accumulator);
            self.accumulator = 0.0;
        }
        substeps
    }

    /// Fraction of a tick left in the accumulator, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
