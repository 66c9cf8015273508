//! Read-only view of a committed tick for presentation
//!
//! A renderer receives a [`RenderSnapshot`] by reference and never touches the
//! world itself.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sim::{EntityKind, PowerUpKind, Team, World};

/// Pose of a car or the ball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPose {
    pub id: u32,
    pub kind: EntityKind,
    /// `None` for the ball
    pub team: Option<Team>,
    /// World space, y up
    pub position: Vec3,
    /// Degrees; always 0 for the ball
    pub heading: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUpView {
    pub id: u32,
    pub kind: PowerUpKind,
    pub position: Vec3,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub tick: u64,
    /// Cars in id order, then the ball
    pub bodies: Vec<BodyPose>,
    pub powerups: Vec<PowerUpView>,
    pub score: [(Team, u32); 2],
}

impl RenderSnapshot {
    pub fn capture(world: &World) -> Self {
        let mut bodies = Vec::with_capacity(world.cars.len() + 1);
        bodies.extend(world.cars.iter().map(|car| BodyPose {
            id: car.id,
            kind: EntityKind::Car,
            team: Some(car.team),
            position: Vec3::new(car.pos.x, 0.0, car.pos.y),
            heading: car.heading,
        }));
        bodies.push(BodyPose {
            id: world.ball.id,
            kind: EntityKind::Ball,
            team: None,
            position: world.ball.pos,
            heading: 0.0,
        });

        let powerups = world
            .powerups
            .items
            .iter()
            .map(|p| PowerUpView {
                id: p.id,
                kind: p.kind,
                position: Vec3::new(p.pos.x, 0.0, p.pos.y),
                active: p.active,
            })
            .collect();

        Self {
            tick: world.tick,
            bodies,
            powerups,
            score: world.score.table(),
        }
    }

    /// Power-ups a renderer should draw
    pub fn visible_powerups(&self) -> impl Iterator<Item = &PowerUpView> {
        self.powerups.iter().filter(|p| p.active)
    }

    pub fn ball(&self) -> Option<&BodyPose> {
        self.bodies.iter().find(|b| b.kind == EntityKind::Ball)
    }
}

/// Presentation collaborator
pub trait Renderer {
    fn render(&mut self, snapshot: &RenderSnapshot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::sim::PowerUp;
    use glam::Vec2;

    #[test]
    fn test_capture_classic() {
        let mut world = World::classic(SimConfig::default());
        world.powerups.insert(PowerUp {
            id: 20,
            kind: PowerUpKind::BallMagnet,
            pos: Vec2::new(1.0, 2.0),
            active: false,
            respawn_ticks: 10,
        });
        let snapshot = RenderSnapshot::capture(&world);

        assert_eq!(snapshot.bodies.len(), 3);
        let red = &snapshot.bodies[0];
        assert_eq!(red.kind, EntityKind::Car);
        assert_eq!(red.team, Some(Team::Red));
        assert_eq!(red.position, Vec3::new(-3.0, 0.0, 0.0));

        let ball = snapshot.ball().unwrap();
        assert_eq!(ball.team, None);
        assert_eq!(ball.position, Vec3::new(0.0, 0.25, 0.0));

        assert_eq!(snapshot.powerups[0].position, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(snapshot.visible_powerups().count(), 0);
        assert_eq!(snapshot.score, [(Team::Red, 0), (Team::Blue, 0)]);
    }

    #[test]
    fn test_renderer_sees_committed_ticks() {
        struct Recorder(Vec<u64>);
        impl Renderer for Recorder {
            fn render(&mut self, snapshot: &RenderSnapshot) {
                self.0.push(snapshot.tick);
            }
        }

        let mut world = World::classic(SimConfig::default());
        let mut recorder = Recorder(Vec::new());
        for _ in 0..3 {
            crate::sim::tick(&mut world, &Default::default());
            recorder.render(&RenderSnapshot::capture(&world));
        }
        assert_eq!(recorder.0, vec![1, 2, 3]);
    }
}
