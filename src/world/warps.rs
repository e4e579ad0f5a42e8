//! Static fallback warp registry
//!
//! Loaded once per session from TOML:
//!
//! ```toml
//! [[maps]]
//! group = 24
//! number = 7
//! name = "Player's House 2F"
//! exits = [[7, 0]]
//! ```

use std::fs;
use std::path::Path;

use ahash::AHashMap;
use serde::Deserialize;

use crate::core::error::{PilotError, Result};
use crate::core::types::{MapId, Position};

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    maps: Vec<MapEntry>,
}

#[derive(Debug, Deserialize)]
struct MapEntry {
    group: u8,
    number: u8,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exits: Vec<[i32; 2]>,
}

#[derive(Debug, Clone, Default)]
struct MapRecord {
    name: Option<String>,
    exits: Vec<Position>,
}

/// Read-only map id → (name, ordered exit list)
#[derive(Debug, Clone, Default)]
pub struct WarpRegistry {
    maps: AHashMap<MapId, MapRecord>,
}

impl WarpRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| PilotError::Registry(format!("Failed to read {}: {}", path.display(), e)))?;
        let registry = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), maps = registry.len(), "Loaded warp registry");
        Ok(registry)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(content)?;
        let mut maps = AHashMap::new();
        for entry in file.maps {
            let id = MapId::new(entry.group, entry.number);
            let record = MapRecord {
                name: entry.name,
                exits: entry
                    .exits
                    .iter()
                    .map(|[x, y]| Position::new(*x, *y))
                    .collect(),
            };
            if maps.insert(id, record).is_some() {
                return Err(PilotError::Registry(format!("map {id} listed twice")));
            }
        }
        Ok(Self { maps })
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Known exits for `map`, `None` if the map has no entry
    pub fn exits(&self, map: MapId) -> Option<&[Position]> {
        self.maps.get(&map).map(|r| r.exits.as_slice())
    }

    pub fn name(&self, map: MapId) -> Option<&str> {
        self.maps.get(&map).and_then(|r| r.name.as_deref())
    }
}

/// Registry view for one map identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarpTable {
    pub map: MapId,
    /// `None` when the registry has no entry for the map
    pub exits: Option<Vec<Position>>,
}

/// Keeps the current map's `WarpTable` until the map identifier changes
#[derive(Debug, Default)]
pub struct WarpCache {
    current: Option<WarpTable>,
    loads: u32,
}

impl WarpCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&mut self, registry: &WarpRegistry, map: MapId) -> &WarpTable {
        if self.current.as_ref().map_or(true, |t| t.map != map) {
            self.loads += 1;
            tracing::debug!(map = %map, "Loading warp table");
            self.current = None;
        }
        self.current.get_or_insert_with(|| WarpTable {
            map,
            exits: registry.exits(map).map(<[Position]>::to_vec),
        })
    }

    /// Number of times a table was (re)loaded
    pub fn loads(&self) -> u32 {
        self.loads
    }
}
