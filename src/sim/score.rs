//! Goal detection and the score table
//!
//! A goal counts once per entry of the ball into a goal volume. The goal
//! re-arms only after the ball has left the volume again.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{Ball, Team};
use crate::config::SimConfig;

/// Axis-aligned box behind one goal line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalVolume {
    /// Team whose goal this is
    pub defended_by: Team,
    pub min: Vec3,
    pub max: Vec3,
}

impl GoalVolume {
    /// The mouth spans `goal_width` along z and `goal_height` up from the
    /// ground. Its goal line sits `goal_offset + goal_depth` inside the field
    /// edge, and the volume extends out to the edge.
    pub fn for_team(team: Team, config: &SimConfig) -> Self {
        let field = &config.field;
        let line = field.radius - field.goal_offset - field.goal_depth;
        let half_width = field.goal_width / 2.0;
        let (x_min, x_max) = if team.goal_side() > 0.0 {
            (line, field.radius)
        } else {
            (-field.radius, -line)
        };
        Self {
            defended_by: team,
            min: Vec3::new(x_min, 0.0, -half_width),
            max: Vec3::new(x_max, field.goal_height, half_width),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Per-team goal tally plus crossing detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreKeeper {
    goals: [GoalVolume; 2],
    armed: [bool; 2],
    table: [u32; 2],
}

impl ScoreKeeper {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            goals: Team::ALL.map(|team| GoalVolume::for_team(team, config)),
            armed: [true; 2],
            table: [0; 2],
        }
    }

    /// Goals for `team`
    pub fn get(&self, team: Team) -> u32 {
        self.table[team.index()]
    }

    /// (team, goals) pairs in team order
    pub fn table(&self) -> [(Team, u32); 2] {
        Team::ALL.map(|team| (team, self.get(team)))
    }

    pub fn goal(&self, team: Team) -> &GoalVolume {
        &self.goals[team.index()]
    }

    /// Check the ball against both goals. Returns the scoring team on the tick
    /// the ball enters an armed goal.
    pub fn check(&mut self, ball: &Ball) -> Option<Team> {
        let mut scorer = None;
        for (goal, armed) in self.goals.iter().zip(self.armed.iter_mut()) {
            let inside = goal.contains(ball.pos);
            if inside && *armed {
                *armed = false;
                scorer = Some(goal.defended_by.opponent());
            } else if !inside {
                *armed = true;
            }
        }
        scorer
    }

    /// Add points to a team
    pub fn award(&mut self, team: Team, points: u32) -> u32 {
        let slot = &mut self.table[team.index()];
        *slot = slot.saturating_add(points);
        *slot
    }

    /// Overwrite a team's tally from an authoritative source. Never lowers it.
    pub fn sync(&mut self, team: Team, total: u32) {
        let slot = &mut self.table[team.index()];
        *slot = (*slot).max(total);
    }

    /// Zero the table and re-arm both goals
    pub fn reset(&mut self) {
        self.table = [0; 2];
        self.armed = [true; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ball_at(x: f32, y: f32, z: f32) -> Ball {
        let mut ball = Ball::new(1, 0.25);
        ball.pos = Vec3::new(x, y, z);
        ball
    }

    #[test]
    fn test_goal_volume_geometry() {
        let config = SimConfig::default();
        let blue_goal = GoalVolume::for_team(Team::Blue, &config);
        assert!((blue_goal.min.x - 5.4).abs() < 1e-5);
        assert_eq!(blue_goal.max.x, 6.0);
        assert_eq!(blue_goal.min.z, -0.75);
        assert_eq!(blue_goal.max.y, 1.0);

        assert!(blue_goal.contains(Vec3::new(5.5, 0.25, 0.0)));
        assert!(!blue_goal.contains(Vec3::new(5.5, 0.25, 1.0)));
        assert!(!blue_goal.contains(Vec3::new(5.5, 1.5, 0.0)));
        assert!(!blue_goal.contains(Vec3::new(-5.5, 0.25, 0.0)));

        let red_goal = GoalVolume::for_team(Team::Red, &config);
        assert!(red_goal.contains(Vec3::new(-5.5, 0.25, 0.0)));
    }

    #[test]
    fn test_ball_in_blue_goal_scores_for_red() {
        let mut keeper = ScoreKeeper::new(&SimConfig::default());
        assert_eq!(keeper.check(&ball_at(5.6, 0.25, 0.0)), Some(Team::Red));
        keeper.award(Team::Red, 1);
        assert_eq!(keeper.get(Team::Red), 1);
        assert_eq!(keeper.get(Team::Blue), 0);
    }

    #[test]
    fn test_single_occupancy_counts_once() {
        let mut keeper = ScoreKeeper::new(&SimConfig::default());
        let ball = ball_at(-5.6, 0.25, 0.2);

        let mut goals = 0;
        for _ in 0..120 {
            if let Some(team) = keeper.check(&ball) {
                keeper.award(team, 1);
                goals += 1;
            }
        }
        assert_eq!(goals, 1);
        assert_eq!(keeper.get(Team::Blue), 1);
    }

    #[test]
    fn test_rearms_after_leaving() {
        let mut keeper = ScoreKeeper::new(&SimConfig::default());
        let inside = ball_at(5.6, 0.25, 0.0);
        let outside = ball_at(0.0, 0.25, 0.0);

        assert!(keeper.check(&inside).is_some());
        assert!(keeper.check(&inside).is_none());
        assert!(keeper.check(&outside).is_none());
        assert!(keeper.check(&inside).is_some());
    }

    #[test]
    fn test_sync_never_lowers() {
        let mut keeper = ScoreKeeper::new(&SimConfig::default());
        keeper.award(Team::Blue, 3);
        keeper.sync(Team::Blue, 2);
        assert_eq!(keeper.get(Team::Blue), 3);
        keeper.sync(Team::Blue, 5);
        assert_eq!(keeper.get(Team::Blue), 5);
        keeper.reset();
        assert_eq!(keeper.table(), [(Team::Red, 0), (Team::Blue, 0)]);
    }

    proptest! {
        #[test]
        fn prop_scores_never_decrease(
            path in proptest::collection::vec((-6.0f32..6.0, 0.0f32..1.5, -1.0f32..1.0), 1..200),
        ) {
            let mut keeper = ScoreKeeper::new(&SimConfig::default());
            let mut previous = keeper.table();
            for (x, y, z) in path {
                if let Some(team) = keeper.check(&ball_at(x, y, z)) {
                    keeper.award(team, 1);
                }
                let current = keeper.table();
                for ((_, before), (_, after)) in previous.iter().zip(current.iter()) {
                    prop_assert!(after >= before);
                }
                previous = current;
            }
        }
    }
}
