//! Turn loop: one capture, one decision, at most one action

pub mod controller;
pub mod history;
pub mod progress;

pub use controller::{TurnController, TurnReport};
pub use history::ActionHistory;
pub use progress::{Discovery, ExplorationStats, ExplorationTracker, Milestone};
