//! Per-turn reconstruction of the world around the player

pub mod builder;
pub mod game_status;
pub mod local_map;
pub mod tileset;
pub mod warps;

pub use builder::WorldBuilder;
pub use game_status::{Badges, DexCounts, GameStatus, ItemSlot, PlayTime};
pub use local_map::{
    Bounds, Confidence, Exit, ExitSource, LocalMap, StatusFlags, TerrainSignal, TileClass,
    WorldState,
};
pub use tileset::{TilesetMapping, TilesetRegistry};
pub use warps::{WarpCache, WarpRegistry, WarpTable};
