//! Save-file progress the player carries between maps
//!
//! Party, money, badges, play time, bag, Pokédex and menu state. Each part is
//! `None` when any byte backing it failed validation that turn.

use serde::Serialize;

/// Party members the engine allows
pub const PARTY_LIMIT: u8 = 6;
/// Slots in the items pocket
pub const ITEM_POCKET_LIMIT: u8 = 20;
/// Species in the regional Pokédex
pub const DEX_SIZE: u8 = 251;

/// Badge bitmasks, one bit per gym
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Badges {
    pub johto: u8,
    pub kanto: u8,
}

impl Badges {
    pub fn total(&self) -> u32 {
        self.johto.count_ones() + self.kanto.count_ones()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl std::fmt::Display for PlayTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemSlot {
    pub id: u8,
    pub quantity: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DexCounts {
    pub seen: u8,
    pub owned: u8,
}

/// Progress fields read alongside the local map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameStatus {
    /// Species ids in party order
    pub party: Option<Vec<u8>>,
    pub money: Option<u32>,
    pub badges: Option<Badges>,
    pub playtime: Option<PlayTime>,
    pub items: Option<Vec<ItemSlot>>,
    pub dex: Option<DexCounts>,
    /// Start-menu cursor is non-zero while a menu is open
    pub in_menu: Option<bool>,
}

impl GameStatus {
    pub fn party_size(&self) -> Option<usize> {
        self.party.as_ref().map(Vec::len)
    }
}

/// Decode packed BCD, most significant byte first.
///
/// Returns `None` if any nibble is above 9.
pub fn decode_bcd(bytes: &[u8]) -> Option<u32> {
    bytes.iter().try_fold(0u32, |acc, &b| {
        let (hi, lo) = (b >> 4, b & 0x0F);
        if hi > 9 || lo > 9 {
            return None;
        }
        Some(acc * 100 + u32::from(hi) * 10 + u32::from(lo))
    })
}
