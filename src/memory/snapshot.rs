//! Point-in-time copies of emulator RAM

use ahash::AHashMap;

use crate::core::error::Result;
use crate::emulator::Emulator;

/// Read-only byte access by absolute address.
///
/// `None` means the address was not captured, which resolvers treat the same
/// as a value that failed validation.
pub trait MemoryView {
    fn byte(&self, addr: u16) -> Option<u8>;
}

/// Contiguous copy of an address range, taken in one read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySnapshot {
    base: u16,
    bytes: Vec<u8>,
}

impl MemorySnapshot {
    pub fn new(base: u16, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    /// Capture `len` bytes starting at `base`
    pub fn capture<E: Emulator + ?Sized>(emu: &mut E, base: u16, len: u16) -> Result<Self> {
        let bytes = emu.read_range(base, len)?;
        Ok(Self { base, bytes })
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl MemoryView for MemorySnapshot {
    fn byte(&self, addr: u16) -> Option<u8> {
        let offset = addr.checked_sub(self.base)?;
        self.bytes.get(offset as usize).copied()
    }
}

/// A handful of individually read bytes.
///
/// Used between steps, where only the position and one collision byte are
/// needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseSnapshot {
    bytes: AHashMap<u16, u8>,
}

impl SparseSnapshot {
    pub fn capture<E: Emulator + ?Sized>(emu: &mut E, addrs: &[u16]) -> Result<Self> {
        let mut bytes = AHashMap::with_capacity(addrs.len());
        for &addr in addrs {
            if let Some(&b) = emu.read_range(addr, 1)?.first() {
                bytes.insert(addr, b);
            }
        }
        Ok(Self { bytes })
    }
}

impl MemoryView for SparseSnapshot {
    fn byte(&self, addr: u16) -> Option<u8> {
        self.bytes.get(&addr).copied()
    }
}
