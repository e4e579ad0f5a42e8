//! Canonical actions

use serde::Serialize;

use crate::core::types::Position;
use crate::emulator::Button;

/// One validated, executable action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "function", content = "arguments", rename_all = "snake_case")]
pub enum Action {
    /// Buttons in order, pressed one at a time
    PressKeys(Vec<Button>),
    ComputePath { target: Position },
    Wait { frames: u32 },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::PressKeys(_) => "press_keys",
            Action::ComputePath { .. } => "compute_path",
            Action::Wait { .. } => "wait",
        }
    }

    /// True if a successful execution should change the player position
    pub fn expects_movement(&self) -> bool {
        match self {
            Action::PressKeys(keys) => keys.iter().any(|k| k.direction().is_some()),
            Action::ComputePath { .. } => true,
            Action::Wait { .. } => false,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::PressKeys(keys) => {
                let names: Vec<&str> = keys.iter().map(Button::as_str).collect();
                write!(f, "press_keys [{}]", names.join(", "))
            }
            Action::ComputePath { target } => write!(f, "compute_path to {target}"),
            Action::Wait { frames } => write!(f, "wait {frames} frames"),
        }
    }
}
