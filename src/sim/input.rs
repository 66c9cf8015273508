//! Control input adapters
//!
//! Two control models feed the same [`CarIntent`]: flags held until cleared,
//! or one-shot acceleration/rotation deltas.

use serde::{Deserialize, Serialize};

use super::state::{CarIntent, Controller, World};

/// Discrete flags, held until the next update clears them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldControls {
    pub accelerate: bool,
    pub brake: bool,
    pub turn_left: bool,
    pub turn_right: bool,
}

/// One-shot deltas: signed acceleration and a heading change in degrees.
///
/// `acceleration` is `None` when only the heading changes; the car keeps
/// whatever throttle it had.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpulseInput {
    pub acceleration: Option<f32>,
    pub rotation: f32,
}

impl ImpulseInput {
    /// Rotation per key press in the keyboard mapping
    pub const KEY_ROTATION: f32 = 2.0;

    pub fn forward() -> Self {
        Self {
            acceleration: Some(1.0),
            rotation: 0.0,
        }
    }

    pub fn reverse() -> Self {
        Self {
            acceleration: Some(-1.0),
            rotation: 0.0,
        }
    }

    pub fn rotate(degrees: f32) -> Self {
        Self {
            acceleration: None,
            rotation: degrees,
        }
    }

    /// Zero acceleration
    pub fn coast() -> Self {
        Self {
            acceleration: Some(0.0),
            rotation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlInput {
    Held(HeldControls),
    Impulse(ImpulseInput),
}

impl ControlInput {
    /// Write this input into a car's intent
    pub fn apply(&self, intent: &mut CarIntent) {
        match *self {
            ControlInput::Held(held) => {
                intent.accelerate = held.accelerate;
                intent.brake = held.brake;
                intent.turn_left = held.turn_left;
                intent.turn_right = held.turn_right;
            }
            ControlInput::Impulse(impulse) => {
                if let Some(acceleration) = impulse.acceleration {
                    intent.accelerate = acceleration > 0.0;
                    intent.brake = acceleration < 0.0;
                }
                intent.turn_impulse += impulse.rotation;
            }
        }
    }
}

impl From<HeldControls> for ControlInput {
    fn from(held: HeldControls) -> Self {
        ControlInput::Held(held)
    }
}

impl From<ImpulseInput> for ControlInput {
    fn from(impulse: ImpulseInput) -> Self {
        ControlInput::Impulse(impulse)
    }
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Per car id, applied in order
    pub controls: Vec<(u32, ControlInput)>,
}

impl TickInput {
    pub fn with(mut self, car_id: u32, input: impl Into<ControlInput>) -> Self {
        self.controls.push((car_id, input.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Apply to human-driven cars only; everything else is ignored
    pub fn apply(&self, world: &mut World) {
        for (car_id, input) in &self.controls {
            match world.car_mut(*car_id) {
                Some(car) if car.controller == Controller::Human => input.apply(&mut car.intent),
                Some(car) => {
                    log::trace!("Ignoring input for {:?} car {}", car.controller, car_id);
                }
                None => {}
            }
        }
    }
}
