//! Confidence-tagged reconstruction of the grid around the player

use ahash::AHashMap;
use serde::Serialize;

use crate::core::types::{Direction, Facing, MapId, Position};
use crate::world::game_status::GameStatus;

/// Where a classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Confidence {
    /// Direct per-direction collision signal for an adjacent tile
    Measured,
    /// Secondary signal (terrain id with an established mapping, NPC occupancy)
    Derived,
}

/// Classification of one window cell.
///
/// Walkable always carries the signal that backs it; there is no way to
/// construct a walkable tile from an assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TileClass {
    Walkable(Confidence),
    Blocked(Confidence),
    Unknown,
    OutOfBounds,
}

impl TileClass {
    pub fn is_walkable(&self) -> bool {
        matches!(self, TileClass::Walkable(_))
    }

    pub fn confidence(&self) -> Option<Confidence> {
        match self {
            TileClass::Walkable(c) | TileClass::Blocked(c) => Some(*c),
            TileClass::Unknown | TileClass::OutOfBounds => None,
        }
    }
}

/// Map extent in player steps, after cross-checking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Bounds {
    Known { width: i32, height: i32 },
    /// Dimension fields unresolved or contradicted by measured tiles
    Unresolved { reason: String },
}

impl Bounds {
    pub fn contains(&self, pos: Position) -> Option<bool> {
        match self {
            Bounds::Known { width, height } => {
                Some(pos.x >= 0 && pos.y >= 0 && pos.x < *width && pos.y < *height)
            }
            Bounds::Unresolved { .. } => None,
        }
    }
}

/// Which signal produced an exit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitSource {
    /// Read from RAM; `candidate` is the warp source's priority index
    Detected { candidate: usize },
    /// Static fallback registry
    Registry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Exit {
    pub pos: Position,
    pub source: ExitSource,
}

/// What happened to the derived terrain signal this turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TerrainSignal {
    /// Mapping established and consistent with every measured adjacent tile
    Applied { tileset: u8 },
    /// No passability mapping for the active tileset
    NoMapping { tileset: u8 },
    /// Mapping disagreed with a measured adjacent tile; not trusted this turn
    Contradicted { tileset: u8, at: Position },
    /// Tileset id or bounds unresolved
    Unavailable,
}

/// Status flags surfaced to the decision maker. `None` means unresolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusFlags {
    pub dialogue_open: Option<bool>,
    pub in_battle: Option<bool>,
}

/// One turn's view of the world around the player
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMap {
    pub map_id: Option<MapId>,
    pub player: Position,
    /// `None` when the facing field itself could not be read
    pub facing: Option<Facing>,
    pub radius: i32,
    pub bounds: Bounds,
    pub tiles: AHashMap<Position, TileClass>,
    pub exits: Vec<Exit>,
    pub npcs: Vec<Position>,
    pub terrain: TerrainSignal,
    pub status: StatusFlags,
    pub game: GameStatus,
    /// Names of fields that did not resolve this turn
    pub unresolved: Vec<&'static str>,
}

impl LocalMap {
    /// True if `pos` lies inside the square window around the player
    pub fn in_window(&self, pos: Position) -> bool {
        pos.x.abs_diff(self.player.x) <= self.radius as u32
            && pos.y.abs_diff(self.player.y) <= self.radius as u32
    }

    /// Classification used by the planner. Cells outside the window are unknown.
    pub fn classify(&self, pos: Position) -> TileClass {
        if pos == self.player {
            // The player stands on the tile; it is walkable by measurement
            return TileClass::Walkable(Confidence::Measured);
        }
        self.tiles.get(&pos).copied().unwrap_or(TileClass::Unknown)
    }

    pub fn is_walkable(&self, pos: Position) -> bool {
        self.classify(pos).is_walkable()
    }

    /// Adjacent classifications in `Direction::ALL` order
    pub fn movement_legality(&self) -> [(Direction, TileClass); 4] {
        Direction::ALL.map(|d| (d, self.classify(self.player.step(d))))
    }

    /// Window rows, top to bottom, each left to right
    pub fn rows(&self) -> impl Iterator<Item = Vec<Position>> + '_ {
        let r = self.radius;
        let p = self.player;
        (-r..=r).map(move |dy| (-r..=r).map(|dx| Position::new(p.x + dx, p.y + dy)).collect())
    }

    pub fn is_exit(&self, pos: Position) -> bool {
        self.exits.iter().any(|e| e.pos == pos)
    }

    pub fn count(&self, pred: impl Fn(&TileClass) -> bool) -> usize {
        self.tiles.values().filter(|c| pred(c)).count()
    }
}

/// Result of one world build
#[derive(Debug, Clone, PartialEq)]
pub enum WorldState {
    Mapped(LocalMap),
    /// Player position could not be resolved; nothing spatial is reported
    PositionUnresolved {
        map_id: Option<MapId>,
        facing: Option<Facing>,
        game: GameStatus,
        unresolved: Vec<&'static str>,
    },
}

impl WorldState {
    pub fn local_map(&self) -> Option<&LocalMap> {
        match self {
            WorldState::Mapped(m) => Some(m),
            WorldState::PositionUnresolved { .. } => None,
        }
    }

    pub fn map_id(&self) -> Option<MapId> {
        match self {
            WorldState::Mapped(m) => m.map_id,
            WorldState::PositionUnresolved { map_id, .. } => *map_id,
        }
    }

    pub fn player(&self) -> Option<Position> {
        self.local_map().map(|m| m.player)
    }

    /// Progress fields; read even when the position is not
    pub fn game(&self) -> &GameStatus {
        match self {
            WorldState::Mapped(m) => &m.game,
            WorldState::PositionUnresolved { game, .. } => game,
        }
    }
}
