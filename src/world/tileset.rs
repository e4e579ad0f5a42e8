//! Block-id → passability mappings, per tileset
//!
//! A block id only says something about passability once someone has
//! established the mapping for the active tileset. Ids missing from both lists
//! stay unknown.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// Config form of one tileset mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesetMapping {
    pub id: u8,
    #[serde(default)]
    pub walkable: Vec<u8>,
    #[serde(default)]
    pub blocked: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
struct BlockSets {
    walkable: AHashSet<u8>,
    blocked: AHashSet<u8>,
}

/// Established passability per tileset id
#[derive(Debug, Clone, Default)]
pub struct TilesetRegistry {
    tilesets: AHashMap<u8, BlockSets>,
}

impl TilesetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from config mappings. An id listed as both walkable and blocked
    /// is dropped from both.
    pub fn from_mappings(mappings: &[TilesetMapping]) -> Self {
        let mut tilesets = AHashMap::new();
        for m in mappings {
            let sets: &mut BlockSets = tilesets.entry(m.id).or_default();
            sets.walkable.extend(m.walkable.iter().copied());
            sets.blocked.extend(m.blocked.iter().copied());
        }
        for (id, sets) in tilesets.iter_mut() {
            let conflicting: Vec<u8> = sets.walkable.intersection(&sets.blocked).copied().collect();
            if !conflicting.is_empty() {
                tracing::warn!(tileset = id, ?conflicting, "Conflicting block ids dropped");
            }
            for block in conflicting {
                sets.walkable.remove(&block);
                sets.blocked.remove(&block);
            }
        }
        Self { tilesets }
    }

    pub fn has_mapping(&self, tileset: u8) -> bool {
        self.tilesets.contains_key(&tileset)
    }

    /// `Some(true)` walkable, `Some(false)` blocked, `None` not established
    pub fn passable(&self, tileset: u8, block: u8) -> Option<bool> {
        let sets = self.tilesets.get(&tileset)?;
        if sets.walkable.contains(&block) {
            Some(true)
        } else if sets.blocked.contains(&block) {
            Some(false)
        } else {
            None
        }
    }
}
