//! RAM addresses the world builder reads, with prioritized candidates
//!
//! Defaults follow the community WRAM documentation for the Game Boy Color
//! title this pilot was first tuned on. Every list can be overridden from the
//! `[memory]` table of the pilot config.

use serde::{Deserialize, Serialize};

use crate::core::types::Direction;

/// Addresses of every field the world builder resolves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLayout {
    /// First captured address (start of work RAM)
    pub capture_start: u16,
    /// Number of bytes captured per snapshot
    pub capture_len: u16,

    pub player_x: Vec<u16>,
    pub player_y: Vec<u16>,
    pub facing: Vec<u16>,
    pub map_group: Vec<u16>,
    pub map_number: Vec<u16>,

    /// Map width in blocks
    pub map_width: Vec<u16>,
    /// Map height in blocks
    pub map_height: Vec<u16>,
    /// Player steps per map block along each axis
    pub steps_per_block: u8,

    pub collision: CollisionAddrs,
    /// Warp sources in priority order
    pub warp_sources: Vec<WarpSource>,
    pub objects: ObjectTable,
    pub terrain: TerrainSource,

    /// Text-box flags; bit 0 set while a dialogue box is open
    pub dialogue_flags: Vec<u16>,
    /// Non-zero while a battle is running
    pub battle_mode: Vec<u16>,

    pub game: GameStatusAddrs,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            capture_start: 0xC000,
            capture_len: 0x2000,

            player_x: vec![0xDCB8],
            player_y: vec![0xDCB7],
            facing: vec![0xDCBB],
            map_group: vec![0xDCB5],
            map_number: vec![0xDCB6],

            map_width: vec![0xD4B1],
            map_height: vec![0xD4B2],
            steps_per_block: 2,

            collision: CollisionAddrs::default(),
            warp_sources: vec![
                WarpSource {
                    count: 0xD4B6,
                    entries: 0xD4B7,
                    stride: 5,
                    y_offset: 0,
                    x_offset: 1,
                },
                // Shifted by one byte: observed on saves where the primary count reads 0
                WarpSource {
                    count: 0xD4B7,
                    entries: 0xD4B8,
                    stride: 5,
                    y_offset: 0,
                    x_offset: 1,
                },
            ],
            objects: ObjectTable::default(),
            terrain: TerrainSource::default(),

            dialogue_flags: vec![0xCFA7],
            battle_mode: vec![0xD057],

            game: GameStatusAddrs::default(),
        }
    }
}

/// Party, money, badges, play time, bag, Pokédex and menu fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameStatusAddrs {
    pub party_count: Vec<u16>,
    /// Species list right after the count, one byte per member
    pub party_species: u16,
    /// Three packed-BCD bytes, most significant first
    pub money: u16,
    pub johto_badges: Vec<u16>,
    pub kanto_badges: Vec<u16>,
    /// Hours, minutes, seconds in consecutive bytes
    pub playtime: u16,
    pub item_count: Vec<u16>,
    /// (id, quantity) pairs
    pub item_entries: u16,
    pub dex_seen: Vec<u16>,
    pub dex_owned: Vec<u16>,
    pub menu_cursor: Vec<u16>,
}

impl Default for GameStatusAddrs {
    fn default() -> Self {
        Self {
            party_count: vec![0xDCD7],
            party_species: 0xDCD8,
            money: 0xD84E,
            johto_badges: vec![0xD857],
            kanto_badges: vec![0xD858],
            playtime: 0xD4C3,
            item_count: vec![0xD892],
            item_entries: 0xD893,
            dex_seen: vec![0xDE99],
            dex_owned: vec![0xDE9A],
            menu_cursor: vec![0xD0A0],
        }
    }
}

impl GameStatusAddrs {
    pub fn item_id(&self, i: u16) -> u16 {
        self.item_entries.wrapping_add(i.wrapping_mul(2))
    }

    pub fn item_quantity(&self, i: u16) -> u16 {
        self.item_id(i).wrapping_add(1)
    }
}

/// Per-direction collision bytes for the four tiles next to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionAddrs {
    pub up: u16,
    pub down: u16,
    pub left: u16,
    pub right: u16,
    /// Collision value that means "can step here"
    pub walkable_value: u8,
}

impl Default for CollisionAddrs {
    fn default() -> Self {
        Self {
            down: 0xC2FA,
            up: 0xC2FB,
            left: 0xC2FC,
            right: 0xC2FD,
            walkable_value: 0x00,
        }
    }
}

impl CollisionAddrs {
    pub fn address(&self, dir: Direction) -> u16 {
        match dir {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    pub fn field_name(dir: Direction) -> &'static str {
        match dir {
            Direction::Up => "collision_up",
            Direction::Down => "collision_down",
            Direction::Left => "collision_left",
            Direction::Right => "collision_right",
        }
    }
}

/// One place the current map's warp list may live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarpSource {
    pub count: u16,
    pub entries: u16,
    pub stride: u16,
    pub y_offset: u16,
    pub x_offset: u16,
}

impl WarpSource {
    pub fn entry_x(&self, i: u16) -> u16 {
        self.entries
            .wrapping_add(i.wrapping_mul(self.stride))
            .wrapping_add(self.x_offset)
    }

    pub fn entry_y(&self, i: u16) -> u16 {
        self.entries
            .wrapping_add(i.wrapping_mul(self.stride))
            .wrapping_add(self.y_offset)
    }
}

/// Map object (NPC) slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectTable {
    pub count: u16,
    pub entries: u16,
    pub stride: u16,
    /// Sprite id 0 marks an empty slot
    pub sprite_offset: u16,
    pub y_offset: u16,
    pub x_offset: u16,
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self {
            count: 0xD4CE,
            entries: 0xD4CF,
            stride: 16,
            sprite_offset: 0,
            y_offset: 1,
            x_offset: 2,
        }
    }
}

impl ObjectTable {
    pub fn slot(&self, i: u16, offset: u16) -> u16 {
        self.entries
            .wrapping_add(i.wrapping_mul(self.stride))
            .wrapping_add(offset)
    }
}

/// Block-id grid used as the secondary (derived) terrain signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSource {
    /// Active tileset id candidates
    pub tileset: Vec<u16>,
    /// First byte of the block grid, border included
    pub blocks_base: u16,
    /// Padding blocks on each side of the map in the block grid
    pub border_blocks: u8,
}

impl Default for TerrainSource {
    fn default() -> Self {
        Self {
            tileset: vec![0xD199],
            blocks_base: 0xC800,
            border_blocks: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_has_two_warp_sources() {
        let layout = MemoryLayout::default();
        assert_eq!(layout.warp_sources.len(), 2);
        assert_eq!(layout.warp_sources[0].count, 0xD4B6);
    }

    #[test]
    fn test_warp_entry_addresses() {
        let src = MemoryLayout::default().warp_sources[0];
        assert_eq!(src.entry_y(0), 0xD4B7);
        assert_eq!(src.entry_x(0), 0xD4B8);
        assert_eq!(src.entry_y(2), 0xD4B7 + 10);
    }

    #[test]
    fn test_item_slot_addresses() {
        let game = GameStatusAddrs::default();
        assert_eq!(game.item_id(0), 0xD893);
        assert_eq!(game.item_quantity(0), 0xD894);
        assert_eq!(game.item_id(2), 0xD897);
        assert_eq!(game.item_quantity(2), 0xD898);
    }

    #[test]
    fn test_game_table_override_keeps_other_defaults() {
        let layout: MemoryLayout = toml::from_str("[game]\nmoney = 0xD84F").unwrap();
        assert_eq!(layout.game.money, 0xD84F);
        assert_eq!(layout.game.party_count, vec![0xDCD7]);
        assert_eq!(layout.player_x, vec![0xDCB8]);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let layout: MemoryLayout = toml::from_str("player_x = [0xDCB9, 0xDCB8]").unwrap();
        assert_eq!(layout.player_x, vec![0xDCB9, 0xDCB8]);
        assert_eq!(layout.player_y, vec![0xDCB7]);
        assert_eq!(layout.steps_per_block, 2);
    }
}
