//! Path planning on the local map

pub mod pathfinding;

pub use pathfinding::{find_path, find_path_with, PlanOutcome, PlannedPath, Unreachable};
