use std::fmt;

use bitflags::bitflags;

/// Registers for the SM83 core (the LR35902 inside the Game Boy).
///
/// The 8-bit cells are the only storage; the 16-bit pairs are views over
/// them, composed big-endian (the first letter is the high byte).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

/// Identifier of a single 8-bit register cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register8 {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
}

/// Identifier of a 16-bit register: either a pair of 8-bit cells or one of
/// the dedicated SP/PC cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register16 {
    AF,
    BC,
    DE,
    HL,
    SP,
    PC,
}

impl Register8 {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "A" => Self::A,
            "F" => Self::F,
            "B" => Self::B,
            "C" => Self::C,
            "D" => Self::D,
            "E" => Self::E,
            "H" => Self::H,
            "L" => Self::L,
            _ => return None,
        })
    }
}

impl Register16 {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "AF" => Self::AF,
            "BC" => Self::BC,
            "DE" => Self::DE,
            "HL" => Self::HL,
            "SP" => Self::SP,
            "PC" => Self::PC,
            _ => return None,
        })
    }
}

impl fmt::Display for Register8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for Register16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Registers {
    #[inline]
    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f & 0xF0])
    }

    #[inline]
    pub fn set_af(&mut self, value: u16) {
        let [a, f] = value.to_be_bytes();
        self.a = a;
        // Lower 4 bits of F are always zero.
        self.f = f & 0xF0;
    }

    #[inline]
    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    #[inline]
    pub fn set_bc(&mut self, value: u16) {
        let [b, c] = value.to_be_bytes();
        self.b = b;
        self.c = c;
    }

    #[inline]
    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    #[inline]
    pub fn set_de(&mut self, value: u16) {
        let [d, e] = value.to_be_bytes();
        self.d = d;
        self.e = e;
    }

    #[inline]
    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    #[inline]
    pub fn set_hl(&mut self, value: u16) {
        let [h, l] = value.to_be_bytes();
        self.h = h;
        self.l = l;
    }

    pub fn get8(&self, reg: Register8) -> u8 {
        match reg {
            Register8::A => self.a,
            Register8::F => self.f & 0xF0,
            Register8::B => self.b,
            Register8::C => self.c,
            Register8::D => self.d,
            Register8::E => self.e,
            Register8::H => self.h,
            Register8::L => self.l,
        }
    }

    pub fn set8(&mut self, reg: Register8, value: u8) {
        match reg {
            Register8::A => self.a = value,
            Register8::F => self.f = value & 0xF0,
            Register8::B => self.b = value,
            Register8::C => self.c = value,
            Register8::D => self.d = value,
            Register8::E => self.e = value,
            Register8::H => self.h = value,
            Register8::L => self.l = value,
        }
    }

    pub fn get16(&self, reg: Register16) -> u16 {
        match reg {
            Register16::AF => self.af(),
            Register16::BC => self.bc(),
            Register16::DE => self.de(),
            Register16::HL => self.hl(),
            Register16::SP => self.sp,
            Register16::PC => self.pc,
        }
    }

    pub fn set16(&mut self, reg: Register16, value: u16) {
        match reg {
            Register16::AF => self.set_af(value),
            Register16::BC => self.set_bc(value),
            Register16::DE => self.set_de(value),
            Register16::HL => self.set_hl(value),
            Register16::SP => self.sp = value,
            Register16::PC => self.pc = value,
        }
    }

    #[inline]
    pub fn flags(&self) -> Flags {
        Flags::from_bits_truncate(self.f)
    }

    #[inline]
    pub fn set_flags(&mut self, flags: Flags) {
        self.f = flags.bits();
    }
}

/// Flag bits in the F register.
///
/// Layout (bit index in the byte, from MSB to LSB):
/// - bit 7: Z (zero)
/// - bit 6: N (subtract)
/// - bit 5: H (half carry)
/// - bit 4: C (carry)
/// - bits 0–3 are always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flag {
    Z = 7,
    N = 6,
    H = 5,
    C = 4,
}

impl Flag {
    pub const ALL: [Flag; 4] = [Flag::Z, Flag::N, Flag::H, Flag::C];

    #[inline]
    pub fn mask(self) -> Flags {
        Flags::from_bits_truncate(1 << self as u8)
    }
}

bitflags! {
    /// Mask view over the meaningful upper nibble of F.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        const Z = 0x80;
        const N = 0x40;
        const H = 0x20;
        const C = 0x10;
    }
}

/// A branch condition: a flag reference, optionally negated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Condition {
    pub flag: Flag,
    pub negated: bool,
}

impl Condition {
    /// Parse `Z`, `N`, `H`, `C` or their negated forms `NZ`, `NN`, `NH`, `NC`.
    pub fn from_name(name: &str) -> Option<Self> {
        let (negated, letter) = match name.len() {
            1 => (false, name),
            2 if name.starts_with('N') => (true, &name[1..]),
            _ => return None,
        };
        let flag = match letter {
            "Z" => Flag::Z,
            "N" => Flag::N,
            "H" => Flag::H,
            "C" => Flag::C,
            _ => return None,
        };
        Some(Self { flag, negated })
    }

    #[inline]
    pub fn holds(self, flags: Flags) -> bool {
        flags.contains(self.flag.mask()) != self.negated
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "N")?;
        }
        write!(f, "{:?}", self.flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_write_updates_both_halves() {
        let mut regs = Registers::default();
        regs.set16(Register16::BC, 0x1234);
        assert_eq!(regs.b, 0x12);
        assert_eq!(regs.c, 0x34);
        assert_eq!(regs.get16(Register16::BC), 0x1234);

        regs.set8(Register8::H, 0xC0);
        regs.set8(Register8::L, 0x01);
        assert_eq!(regs.get16(Register16::HL), 0xC001);
    }

    #[test]
    fn af_masks_low_nibble_of_f() {
        let mut regs = Registers::default();
        regs.set16(Register16::AF, 0xABCD);
        assert_eq!(regs.a, 0xAB);
        assert_eq!(regs.f, 0xC0);
        assert_eq!(regs.af(), 0xABC0);

        regs.set8(Register8::F, 0xFF);
        assert_eq!(regs.get8(Register8::F), 0xF0);
    }

    #[test]
    fn conditions_parse_and_evaluate() {
        let nz = Condition::from_name("NZ").unwrap();
        assert_eq!(nz.flag, Flag::Z);
        assert!(nz.negated);
        assert!(nz.holds(Flags::C));
        assert!(!nz.holds(Flags::Z | Flags::C));

        let c = Condition::from_name("C").unwrap();
        assert!(c.holds(Flags::C));
        assert!(!c.holds(Flags::empty()));

        assert!(Condition::from_name("NX").is_none());
        assert!(Condition::from_name("ZZ").is_none());
        assert_eq!(nz.to_string(), "NZ");
    }
}
