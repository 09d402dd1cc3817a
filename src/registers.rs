//! The hart's general purpose register file.

use core::fmt;
use std::fmt::Formatter;

/// The number of `x` registers (indices start at `0` for `x0`).
pub const LEN: u8 = 32;

/// A hart's general purpose register state: the 32 word-size `x` registers
/// plus the program counter.
///
/// Register `x0` (aka `zero`) is hardwired to zero. This is enforced at the
/// write: storing to `x0` is a no-op rather than a store that gets zeroed
/// afterwards, so read-modify-write sequences that happen to target `x0`
/// behave like the hardware. For the same reason no mutable reference to an
/// `x` register is ever handed out.
#[derive(Debug, Clone)]
pub struct Registers {
    x_registers: [u32; LEN as usize],
    pc: u32,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Registers {
    /// Returns an all-zero register file with `pc` set to `reset_vector`.
    pub fn new(reset_vector: u32) -> Self {
        Self {
            x_registers: [0; LEN as usize],
            pc: reset_vector,
        }
    }

    /// Returns the value of an `x` register.
    pub fn x(&self, specifier: Specifier) -> u32 {
        self.x_registers[usize::from(specifier)]
    }

    /// Sets the value of an `x` register.
    ///
    /// Writes to register `x0` are ignored.
    pub fn set_x(&mut self, specifier: Specifier, value: u32) {
        self.replace_x(specifier, value);
    }

    /// Replaces the value of an `x` register, returning its old value.
    ///
    /// Writes to register `x0` are ignored.
    pub fn replace_x(&mut self, specifier: Specifier, value: u32) -> u32 {
        if specifier.0 == 0 {
            0
        } else {
            std::mem::replace(&mut self.x_registers[specifier.0 as usize], value)
        }
    }

    /// Returns the value of the `pc` register.
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Returns a mutable reference to the `pc` register value.
    pub fn pc_mut(&mut self) -> &mut u32 {
        &mut self.pc
    }
}

/// An `x` register specifier. Can take values in the range `0..LEN`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct Specifier(u8);

/// The eight registers reachable from a compressed 3-bit register field, in
/// encoding order.
///
/// > These registers correspond to registers x8 to x15, which are the
/// > registers most commonly used by the compiler.
const COMPRESSED_REGISTERS: [Specifier; 8] = [
    Specifier(8),
    Specifier(9),
    Specifier(10),
    Specifier(11),
    Specifier(12),
    Specifier(13),
    Specifier(14),
    Specifier(15),
];

impl Specifier {
    /// Register `x0`, a.k.a. register `zero`: reads as `0`, ignores writes.
    pub const X0: Self = Specifier(0);

    /// Register `x1`, the return address (link) register in the standard ABI.
    /// The compressed jump-and-link forms link here implicitly.
    pub const RA: Self = Specifier(1);

    /// Register `x2`, the stack pointer in the standard ABI. The compressed
    /// stack-relative load/store forms address relative to this register.
    pub const SP: Self = Specifier(2);

    /// Create a register specifier from its index, returning `None` if
    /// `index > 31`.
    pub fn new<U: TryInto<u8>>(index: U) -> Option<Self> {
        let index = index.try_into().ok()?;
        (index < LEN).then_some(Self(index))
    }

    /// Convert a 5-bit value into a register specifier.
    /// Panics if the value doesn't fit in 5 bits (`0..=31`).
    pub fn from_u5(value_u5: u8) -> Self {
        const_assert_eq!(LEN, 32);
        if value_u5 > 31 {
            panic!("out of range u5 used");
        }
        Self(value_u5)
    }

    /// Convert a compressed 3-bit register field into the full register
    /// specifier it denotes (`x8..=x15`).
    /// Panics if the value doesn't fit in 3 bits (`0..=7`).
    pub fn from_c3(value_u3: u8) -> Self {
        if value_u3 > 7 {
            panic!("out of range u3 used");
        }
        COMPRESSED_REGISTERS[value_u3 as usize]
    }

    /// Return an iterator over all register specifiers, from x0 up to x31.
    pub fn iter_all() -> impl Iterator<Item = Self> {
        (0..LEN).map(Self)
    }
}

impl From<Specifier> for u8 {
    fn from(value: Specifier) -> Self {
        value.0
    }
}

impl From<Specifier> for u32 {
    fn from(value: Specifier) -> Self {
        value.0 as u32
    }
}

impl From<Specifier> for usize {
    fn from(value: Specifier) -> Self {
        value.0 as usize
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_to_zero() {
        let mut registers = Registers::default();
        assert_eq!(0, registers.x(Specifier::X0));
        registers.set_x(Specifier::X0, 0xDEADBEEF);
        assert_eq!(0, registers.x(Specifier::X0));
        assert_eq!(0, registers.replace_x(Specifier::X0, 0xDEADBEEF));
        assert_eq!(0, registers.x(Specifier::X0));
    }

    #[test]
    fn test_reset_vector() {
        let registers = Registers::new(0x8000_0000);
        assert_eq!(0x8000_0000, registers.pc());
        for specifier in Specifier::iter_all() {
            assert_eq!(0, registers.x(specifier));
        }
    }

    #[test]
    fn test_write_to_pc() {
        let mut registers = Registers::default();
        assert_eq!(0, registers.pc());
        *registers.pc_mut() = 0xDEADBEEF;
        assert_eq!(0xDEADBEEF, registers.pc());
        assert_eq!(0, registers.x(Specifier::X0));
    }

    #[test]
    fn test_set_x() {
        let mut registers = Registers::default();
        registers.set_x(Specifier::X0, 1);
        for i in 1..LEN {
            registers.set_x(Specifier::from_u5(i), i as u32 + 1);
        }
        assert_eq!(0, registers.x(Specifier::X0));
        for i in 1..LEN {
            assert_eq!(i as u32 + 1, registers.x(Specifier::from_u5(i)));
        }
    }

    #[test]
    fn test_replace_x() {
        let mut registers = Registers::default();
        assert_eq!(0, registers.replace_x(Specifier::from_u5(7), 11));
        assert_eq!(11, registers.replace_x(Specifier::from_u5(7), 13));
        assert_eq!(13, registers.x(Specifier::from_u5(7)));
    }

    #[test]
    fn test_compressed_mapping() {
        for encoding in 0..8 {
            assert_eq!(
                Specifier::from_u5(encoding + 8),
                Specifier::from_c3(encoding)
            );
        }
    }

    #[test]
    #[should_panic(expected = "out of range u3 used")]
    fn test_compressed_mapping_out_of_range() {
        Specifier::from_c3(8);
    }

    #[test]
    fn test_abi_names() {
        assert_eq!(Specifier::from_u5(0), Specifier::X0);
        assert_eq!(Specifier::from_u5(1), Specifier::RA);
        assert_eq!(Specifier::from_u5(2), Specifier::SP);
    }
}
