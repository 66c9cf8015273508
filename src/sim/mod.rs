//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, network or platform dependencies

pub mod ai;
pub mod boundary;
pub mod collision;
pub mod input;
pub mod physics;
pub mod powerup;
pub mod score;
pub mod state;
pub mod tick;

pub use ai::{AiController, AiState};
pub use input::{ControlInput, HeldControls, ImpulseInput, TickInput};
pub use powerup::PowerUpManager;
pub use score::{GoalVolume, ScoreKeeper};
pub use state::{
    Ball, Car, CarEffects, CarIntent, Controller, EntityKind, GameEvent, PowerUp, PowerUpKind,
    Team, World,
};
pub use tick::{Stepper, tick};
