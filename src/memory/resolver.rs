//! Memory address resolution
//!
//! The RAM layout is only partly documented and some fields have moved between
//! observed builds, so every logical field is read through an ordered list of
//! candidate addresses and a validity predicate. The first candidate whose byte
//! passes wins; if none pass the field is UNRESOLVED and no value is invented.

use serde::Serialize;

use crate::memory::snapshot::MemoryView;
use crate::world::game_status::{DEX_SIZE, ITEM_POCKET_LIMIT, PARTY_LIMIT};

/// Largest coordinate byte considered a real position
pub const MAX_COORDINATE: u8 = 254;
/// Map dimensions are stored in blocks
pub const DIMENSION_RANGE: std::ops::RangeInclusive<u8> = 1..=32;
/// Hardware/engine limit on warps per map
pub const MAX_WARPS: u8 = 16;
/// Engine limit on object slots per map
pub const MAX_OBJECTS: u8 = 16;

/// Validity predicate for a single field byte
pub type Validator = fn(u8) -> bool;

pub fn is_coordinate(v: u8) -> bool {
    v <= MAX_COORDINATE
}

pub fn is_dimension(v: u8) -> bool {
    DIMENSION_RANGE.contains(&v)
}

pub fn is_warp_count(v: u8) -> bool {
    v <= MAX_WARPS
}

pub fn is_object_count(v: u8) -> bool {
    v <= MAX_OBJECTS
}

pub fn is_map_component(v: u8) -> bool {
    v != 0xFF
}

pub fn is_party_count(v: u8) -> bool {
    v <= PARTY_LIMIT
}

/// Species id; 0 and 0xFF are list padding and terminator
pub fn is_species(v: u8) -> bool {
    v != 0 && v != 0xFF
}

/// Packed BCD byte: both nibbles 0-9
pub fn is_bcd(v: u8) -> bool {
    v >> 4 <= 9 && v & 0x0F <= 9
}

/// Minutes or seconds of the play clock
pub fn is_clock_component(v: u8) -> bool {
    v < 60
}

pub fn is_item_count(v: u8) -> bool {
    v <= ITEM_POCKET_LIMIT
}

pub fn is_item_id(v: u8) -> bool {
    v != 0 && v != 0xFF
}

pub fn is_item_quantity(v: u8) -> bool {
    (1..=99).contains(&v)
}

pub fn is_dex_count(v: u8) -> bool {
    v <= DEX_SIZE
}

/// Flags and raw signals where every byte is meaningful
pub fn any_byte(_v: u8) -> bool {
    true
}

/// A candidate address that produced the accepted value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandidateHit {
    /// Position in the priority list (0 = primary)
    pub index: usize,
    pub address: u16,
}

/// A candidate that was tried and rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub address: u16,
    /// `None` when the address was outside the captured memory
    pub observed: Option<u8>,
}

/// Outcome of resolving one logical field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub field: &'static str,
    pub value: Option<u8>,
    pub source: Option<CandidateHit>,
    pub rejected: Vec<Rejection>,
}

impl Resolution {
    pub fn value(&self) -> Option<u8> {
        self.value
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }

    pub fn source(&self) -> Option<CandidateHit> {
        self.source
    }
}

/// Resolve one field from its prioritized candidates
pub fn resolve<M: MemoryView + ?Sized>(
    field: &'static str,
    candidates: &[u16],
    valid: Validator,
    mem: &M,
) -> Resolution {
    let mut rejected = Vec::new();

    for (index, &address) in candidates.iter().enumerate() {
        match mem.byte(address) {
            Some(v) if valid(v) => {
                if index > 0 {
                    tracing::debug!(
                        field,
                        address = %format!("0x{address:04X}"),
                        index,
                        "Resolved from fallback candidate"
                    );
                }
                return Resolution {
                    field,
                    value: Some(v),
                    source: Some(CandidateHit { index, address }),
                    rejected,
                };
            }
            observed => rejected.push(Rejection { address, observed }),
        }
    }

    tracing::debug!(field, tried = candidates.len(), "Field unresolved");
    Resolution {
        field,
        value: None,
        source: None,
        rejected,
    }
}
