//! Emulator RAM access: snapshots, address layout, and field resolution

pub mod layout;
pub mod resolver;
pub mod snapshot;

pub use layout::MemoryLayout;
pub use resolver::{resolve, CandidateHit, Resolution};
pub use snapshot::{MemorySnapshot, MemoryView, SparseSnapshot};
