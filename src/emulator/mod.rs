//! Emulated console boundary
//!
//! The session is one explicitly owned handle. The world builder only reads
//! from it (through a snapshot); the command executor is the only code that
//! presses buttons or advances time.

pub mod bridge;
pub mod sim;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::Direction;

/// Console buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
}

impl Button {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Button::Up),
            "down" => Some(Button::Down),
            "left" => Some(Button::Left),
            "right" => Some(Button::Right),
            "a" => Some(Button::A),
            "b" => Some(Button::B),
            "start" => Some(Button::Start),
            "select" => Some(Button::Select),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Button::Up => "up",
            Button::Down => "down",
            Button::Left => "left",
            Button::Right => "right",
            Button::A => "a",
            Button::B => "b",
            Button::Start => "start",
            Button::Select => "select",
        }
    }

    /// The step this button takes on the overworld, if it is a d-pad button
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Button::Up => Some(Direction::Up),
            Button::Down => Some(Direction::Down),
            Button::Left => Some(Direction::Left),
            Button::Right => Some(Direction::Right),
            _ => None,
        }
    }
}

impl From<Direction> for Button {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::Up => Button::Up,
            Direction::Down => Button::Down,
            Direction::Left => Button::Left,
            Direction::Right => Button::Right,
        }
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive operations offered by the emulator collaborator.
///
/// The console accepts one input event at a time; implementations must not
/// batch presses.
pub trait Emulator {
    /// Read `len` bytes starting at `start`
    fn read_range(&mut self, start: u16, len: u16) -> Result<Vec<u8>>;

    fn press(&mut self, button: Button) -> Result<()>;

    fn release(&mut self, button: Button) -> Result<()>;

    /// Run the console for `frames` frames
    fn advance(&mut self, frames: u32) -> Result<()>;
}
