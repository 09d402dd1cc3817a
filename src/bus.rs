//! The capability interface through which the core reaches memory.

/// Byte-addressed access to the machine's memory map.
///
/// The core performs every memory access, including instruction fetch,
/// through this trait. It has no notion of the memory map's layout: which
/// address ranges are RAM, which are device registers, and what unmapped
/// addresses return is entirely the implementor's decision. A permissive
/// implementation that returns `0` for unmapped reads and discards unmapped
/// writes is valid.
///
/// The machine is little-endian end to end. The halfword and word accessors
/// have default implementations composed from the byte accessors in
/// little-endian order; implementors may override them, for example to
/// service a word-wide device register that has no meaningful byte view, but
/// any override must preserve the little-endian byte order for ordinary
/// memory so mixed-width access to the same address stays coherent.
///
/// Reads take `&mut self` since reading a device register may have side
/// effects.
///
/// Accesses never fail and addresses need not be aligned; the composed
/// accessors wrap around at the top of the 32-bit address space.
pub trait Bus {
    /// Read the byte at `address`.
    fn read8(&mut self, address: u32) -> u8;

    /// Write a byte to `address`.
    fn write8(&mut self, address: u32, value: u8);

    /// Read the halfword at `address`, composed little-endian from two byte
    /// reads.
    fn read16(&mut self, address: u32) -> u16 {
        u16::from(self.read8(address)) | u16::from(self.read8(address.wrapping_add(1))) << 8
    }

    /// Read the word at `address`, composed little-endian from two halfword
    /// reads.
    fn read32(&mut self, address: u32) -> u32 {
        u32::from(self.read16(address)) | u32::from(self.read16(address.wrapping_add(2))) << 16
    }

    /// Write a halfword to `address`, decomposed into two byte writes,
    /// least-significant byte first.
    fn write16(&mut self, address: u32, value: u16) {
        self.write8(address, value as u8);
        self.write8(address.wrapping_add(1), (value >> 8) as u8);
    }

    /// Write a word to `address`, decomposed into two halfword writes,
    /// less-significant halfword first.
    fn write32(&mut self, address: u32, value: u32) {
        self.write16(address, value as u16);
        self.write16(address.wrapping_add(2), (value >> 16) as u16);
    }
}

// Allows a host to lend its bus to the core rather than moving it in.
impl<B: Bus + ?Sized> Bus for &mut B {
    fn read8(&mut self, address: u32) -> u8 {
        (**self).read8(address)
    }

    fn write8(&mut self, address: u32, value: u8) {
        (**self).write8(address, value)
    }

    fn read16(&mut self, address: u32) -> u16 {
        (**self).read16(address)
    }

    fn read32(&mut self, address: u32) -> u32 {
        (**self).read32(address)
    }

    fn write16(&mut self, address: u32, value: u16) {
        (**self).write16(address, value)
    }

    fn write32(&mut self, address: u32, value: u32) {
        (**self).write32(address, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ram(Vec<u8>);

    impl Bus for Ram {
        fn read8(&mut self, address: u32) -> u8 {
            self.0.get(address as usize).copied().unwrap_or(0)
        }

        fn write8(&mut self, address: u32, value: u8) {
            if let Some(byte) = self.0.get_mut(address as usize) {
                *byte = value;
            }
        }
    }

    #[test]
    fn test_little_endian_composition() {
        let mut ram = Ram(vec![0x78, 0x56, 0x34, 0x12]);
        assert_eq!(0x5678, ram.read16(0));
        assert_eq!(0x3456, ram.read16(1));
        assert_eq!(0x1234_5678, ram.read32(0));
    }

    #[test]
    fn test_little_endian_decomposition() {
        let mut ram = Ram(vec![0; 8]);
        ram.write32(0, 0x1234_5678);
        assert_eq!(vec![0x78, 0x56, 0x34, 0x12, 0, 0, 0, 0], ram.0);
        ram.write16(4, 0xBEEF);
        assert_eq!(0xEF, ram.read8(4));
        assert_eq!(0xBE, ram.read8(5));
    }

    #[test]
    fn test_unmapped_reads_are_permissive() {
        let mut ram = Ram(vec![]);
        assert_eq!(0, ram.read32(0xFFFF_FFFC));
    }
}
