//! Single binary digit.
//!
//! A bit holds `0` or `1`. Keeping it as an enum rather than a `bool`
//! makes the `0`/`1` invariant of a bit pattern part of the type and gives
//! the adder a natural home.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A single binary digit.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Bit {
    /// Zero (`0`)
    #[default]
    Zero = 0,
    /// One (`1`)
    One = 1,
}

impl Bit {
    /// Both bit values in order.
    pub const ALL: [Bit; 2] = [Bit::Zero, Bit::One];

    /// Parse a bit from its character form.
    ///
    /// Returns `None` for anything other than `'0'` or `'1'`.
    #[inline]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Bit::Zero),
            '1' => Some(Bit::One),
            _ => None,
        }
    }

    /// Character form: `'0'` or `'1'`.
    #[inline]
    pub const fn to_char(self) -> char {
        match self {
            Bit::Zero => '0',
            Bit::One => '1',
        }
    }

    /// Build from the lowest bit of `value`.
    #[inline]
    pub const fn from_lsb(value: u64) -> Self {
        if value & 1 == 1 { Bit::One } else { Bit::Zero }
    }

    /// Numeric value, 0 or 1.
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_set(self) -> bool {
        matches!(self, Bit::One)
    }

    /// Logical NOT.
    #[inline]
    pub const fn not(self) -> Self {
        match self {
            Bit::Zero => Bit::One,
            Bit::One => Bit::Zero,
        }
    }

    /// Logical AND.
    #[inline]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Bit::One, Bit::One) => Bit::One,
            _ => Bit::Zero,
        }
    }

    /// Logical XOR.
    #[inline]
    pub const fn xor(self, other: Self) -> Self {
        match (self, other) {
            (Bit::Zero, Bit::One) | (Bit::One, Bit::Zero) => Bit::One,
            _ => Bit::Zero,
        }
    }

    /// Full adder: adds `self`, `other` and `carry_in`, returns (sum, carry_out).
    #[inline]
    pub const fn full_add(self, other: Self, carry_in: Self) -> (Self, Self) {
        let sum = self.xor(other).xor(carry_in);
        let total = self.to_u8() + other.to_u8() + carry_in.to_u8();
        let carry = if total >= 2 { Bit::One } else { Bit::Zero };
        (sum, carry)
    }
}

impl fmt::Debug for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl std::ops::Not for Bit {
    type Output = Self;

    fn not(self) -> Self::Output {
        Bit::not(self)
    }
}

impl From<bool> for Bit {
    fn from(value: bool) -> Self {
        if value { Bit::One } else { Bit::Zero }
    }
}

impl From<Bit> for bool {
    fn from(bit: Bit) -> Self {
        bit.is_set()
    }
}
