use std::ops::RangeInclusive;

use crate::error::BusFault;

/// Abstraction over the address space seen by the CPU.
///
/// The core is agnostic to what backs an address (ROM, RAM, memory-mapped
/// IO); implementations decide routing and side effects and may reject an
/// access with a [`BusFault`].
pub trait Bus {
    fn read8(&mut self, addr: u16) -> Result<u8, BusFault>;
    fn write8(&mut self, addr: u16, value: u8) -> Result<(), BusFault>;

    /// Little-endian 16-bit read; the high byte address wraps at 0xFFFF.
    fn read16(&mut self, addr: u16) -> Result<u16, BusFault> {
        let lo = self.read8(addr)?;
        let hi = self.read8(addr.wrapping_add(1))?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Little-endian 16-bit write, low byte first.
    fn write16(&mut self, addr: u16, value: u16) -> Result<(), BusFault> {
        let [lo, hi] = value.to_le_bytes();
        self.write8(addr, lo)?;
        self.write8(addr.wrapping_add(1), hi)
    }
}

impl<B: Bus + ?Sized> Bus for &mut B {
    #[inline]
    fn read8(&mut self, addr: u16) -> Result<u8, BusFault> {
        (**self).read8(addr)
    }

    #[inline]
    fn write8(&mut self, addr: u16, value: u8) -> Result<(), BusFault> {
        (**self).write8(addr, value)
    }
}

/// Flat 64 KiB address space.
///
/// Every address is backed by RAM. An optional read-only window models a
/// ROM region: writes into it fail with [`BusFault::ReadOnly`] instead of
/// being dropped.
#[derive(Clone)]
pub struct FlatBus {
    pub memory: Box<[u8; 0x10000]>,
    read_only: Option<RangeInclusive<u16>>,
}

impl Default for FlatBus {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatBus {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            read_only: None,
        }
    }

    /// Build a bus whose `range` rejects writes.
    pub fn with_read_only(range: RangeInclusive<u16>) -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            read_only: Some(range),
        }
    }

    /// Copy `bytes` into memory starting at `addr`, bypassing the read-only
    /// window. Bytes that would run past 0xFFFF are dropped; the number of
    /// bytes actually copied is returned.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) -> usize {
        let start = addr as usize;
        let len = bytes.len().min(self.memory.len() - start);
        self.memory[start..start + len].copy_from_slice(&bytes[..len]);
        if len < bytes.len() {
            log::warn!(
                "image truncated: {} of {} bytes fit at 0x{:04X}",
                len,
                bytes.len(),
                addr
            );
        }
        len
    }

    pub fn is_read_only(&self, addr: u16) -> bool {
        self.read_only
            .as_ref()
            .is_some_and(|range| range.contains(&addr))
    }
}

impl Bus for FlatBus {
    #[inline]
    fn read8(&mut self, addr: u16) -> Result<u8, BusFault> {
        Ok(self.memory[addr as usize])
    }

    #[inline]
    fn write8(&mut self, addr: u16, value: u8) -> Result<(), BusFault> {
        if self.is_read_only(addr) {
            return Err(BusFault::ReadOnly { addr, value });
        }
        self.memory[addr as usize] = value;
        Ok(())
    }
}
