//! Tile Pilot - LLM autopilot for tile-based console RPGs
//!
//! Each turn reads emulator RAM, rebuilds a confidence-tagged map of the
//! player's surroundings, asks a decision maker for exactly one action and
//! executes it with per-step verification.

pub mod command;
pub mod core;
pub mod emulator;
pub mod llm;
pub mod memory;
pub mod navigation;
pub mod turn;
pub mod world;
