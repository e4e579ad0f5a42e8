//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one pilot session, stamped on every turn log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Turn counter
pub type TurnNumber = u64;

/// Grid coordinate relative to the current map.
///
/// Signed so that window cells hanging off the map edge can still be named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(&self, other: &Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn step(&self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Orthogonal neighbours in `Direction::ALL` order
    pub fn neighbors(&self) -> [(Direction, Position); 4] {
        Direction::ALL.map(|d| (d, self.step(d)))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One cardinal step. Y grows downwards, as on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Compass word used when describing where something lies
    pub fn compass(&self) -> &'static str {
        match self {
            Direction::Up => "north",
            Direction::Down => "south",
            Direction::Left => "west",
            Direction::Right => "east",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the player sprite is looking.
///
/// An undecodable byte is kept verbatim instead of being guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Known(Direction),
    Unknown { raw: u8 },
}

impl Facing {
    /// Decode the facing byte. Low two bits carry the walk-animation phase.
    pub fn from_byte(raw: u8) -> Self {
        match raw {
            0x00 | 0x01 => Facing::Known(Direction::Down),
            0x04 | 0x05 => Facing::Known(Direction::Up),
            0x08 | 0x09 => Facing::Known(Direction::Left),
            0x0C | 0x0D => Facing::Known(Direction::Right),
            _ => Facing::Unknown { raw },
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Facing::Known(d) => Some(*d),
            Facing::Unknown { .. } => None,
        }
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Known(d) => write!(f, "{}", d.as_str().to_uppercase()),
            Facing::Unknown { raw } => write!(f, "UNKNOWN(0x{raw:02X})"),
        }
    }
}

/// Map identifier: (map group, map number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId {
    pub group: u8,
    pub number: u8,
}

impl MapId {
    pub fn new(group: u8, number: u8) -> Self {
        Self { group, number }
    }
}

impl std::fmt::Display for MapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan() {
        let a = Position::new(6, 1);
        let b = Position::new(7, 0);
        assert_eq!(a.manhattan(&b), 2);
        assert_eq!(b.manhattan(&a), 2);
    }

    #[test]
    fn test_step_is_orthogonal() {
        let p = Position::new(3, 3);
        for (dir, n) in p.neighbors() {
            assert_eq!(p.manhattan(&n), 1, "{dir} should move exactly one tile");
        }
        assert_eq!(p.step(Direction::Up), Position::new(3, 2));
        assert_eq!(p.step(Direction::Right), Position::new(4, 3));
    }

    #[test]
    fn test_facing_decodes_walk_phases() {
        assert_eq!(Facing::from_byte(0x00), Facing::Known(Direction::Down));
        assert_eq!(Facing::from_byte(0x05), Facing::Known(Direction::Up));
        assert_eq!(Facing::from_byte(0x09), Facing::Known(Direction::Left));
        assert_eq!(Facing::from_byte(0x0C), Facing::Known(Direction::Right));
    }

    #[test]
    fn test_facing_unknown_keeps_raw_byte() {
        let facing = Facing::from_byte(0x1F);
        assert_eq!(facing, Facing::Unknown { raw: 0x1F });
        assert_eq!(facing.direction(), None);
        assert_eq!(facing.to_string(), "UNKNOWN(0x1F)");
    }
}
