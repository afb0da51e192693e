//! Fixed-width bit vectors.
//!
//! [`BitVector`] is the one storage type of the machine: 16-bit words,
//! 3-bit register fields, 9-bit offsets and the 3-bit condition code are
//! all bit vectors of different widths. The width is fixed when a vector is
//! built and never changes afterwards.
//!
//! Bits are addressed MSB-first: offset 0 is the most significant bit. The
//! instruction layouts are written against that convention, so it lives
//! here in [`BitVector::substring`] and nowhere else.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use crate::bits::Bit;

/// Widest vector supported. Every field of the 16-bit machine fits.
pub const MAX_WIDTH: usize = 32;

/// Width of a machine word.
pub const WORD_WIDTH: usize = 16;

/// A fixed-width sequence of bits.
///
/// Cloning gives an independent copy; nothing is shared between a vector
/// and its clones.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitVector {
    /// Bits stored from most significant (index 0) to least significant.
    bits: Vec<Bit>,
}

impl BitVector {
    /// Create a vector of `width` zero bits.
    pub fn zero(width: usize) -> Result<Self, BitError> {
        check_width(width)?;
        Ok(Self { bits: vec![Bit::Zero; width] })
    }

    /// A zeroed 16-bit machine word.
    pub fn word() -> Self {
        Self { bits: vec![Bit::Zero; WORD_WIDTH] }
    }

    /// Parse a literal bit pattern such as `"0001001001100101"`.
    ///
    /// The width of the result is the length of the pattern.
    pub fn from_bits(pattern: &str) -> Result<Self, BitError> {
        let bits = pattern
            .chars()
            .map(|c| Bit::from_char(c).ok_or(BitError::InvalidBit(c)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_bit_slice(&bits)
    }

    /// Build from bits given MSB first.
    pub fn from_bit_slice(bits: &[Bit]) -> Result<Self, BitError> {
        check_width(bits.len())?;
        Ok(Self { bits: bits.to_vec() })
    }

    /// Create a vector of `width` bits holding `value` (low-order bits kept).
    pub fn with_unsigned(width: usize, value: u32) -> Result<Self, BitError> {
        let mut v = Self::zero(width)?;
        v.set_unsigned_value(value);
        Ok(v)
    }

    /// Create a vector of `width` bits holding `value` in two's complement.
    pub fn with_twos_complement(width: usize, value: i32) -> Result<Self, BitError> {
        let mut v = Self::zero(width)?;
        v.set_twos_complement_value(value);
        Ok(v)
    }

    /// Number of bits.
    #[inline]
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// The bits, MSB first.
    #[inline]
    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    /// The most significant (sign) bit.
    #[inline]
    pub fn msb(&self) -> Bit {
        self.bits[0]
    }

    pub fn is_zero(&self) -> bool {
        self.bits.iter().all(|b| !b.is_set())
    }

    /// Write an unsigned value.
    ///
    /// Values wider than the vector are truncated to their low-order
    /// `width` bits, i.e. stored modulo 2^width.
    pub fn set_unsigned_value(&mut self, value: u32) {
        self.store(u64::from(value));
    }

    /// Read the unsigned magnitude.
    pub fn unsigned_value(&self) -> u32 {
        // width <= 32, so the raw value always fits
        self.raw() as u32
    }

    /// Write a signed value in two's complement.
    ///
    /// Values outside `[min_signed, max_signed]` wrap modulo 2^width, which
    /// is exactly what a fixed-width adder does on overflow.
    pub fn set_twos_complement_value(&mut self, value: i32) {
        self.store(i64::from(value) as u64);
    }

    /// Read the value treating the MSB as the sign bit.
    pub fn twos_complement_value(&self) -> i32 {
        let raw = self.raw() as i64;
        if self.msb().is_set() {
            (raw - (1i64 << self.width())) as i32
        } else {
            raw as i32
        }
    }

    /// Smallest signed value this width can hold.
    pub fn min_signed(&self) -> i32 {
        (-(1i64 << (self.width() - 1))) as i32
    }

    /// Largest signed value this width can hold.
    pub fn max_signed(&self) -> i32 {
        ((1i64 << (self.width() - 1)) - 1) as i32
    }

    /// Extract `len` bits starting `start` bits from the MSB.
    ///
    /// `substring(0, 4)` of an instruction word is its opcode.
    pub fn substring(&self, start: usize, len: usize) -> Result<BitVector, BitError> {
        let end = start.checked_add(len);
        match end {
            Some(end) if len > 0 && end <= self.width() => Ok(Self {
                bits: self.bits[start..end].to_vec(),
            }),
            _ => Err(BitError::OutOfRange { start, len, width: self.width() }),
        }
    }

    /// Widen to `width` bits, copying the sign bit into every new position.
    pub fn sign_extend(&self, width: usize) -> Result<BitVector, BitError> {
        check_width(width)?;
        if width < self.width() {
            return Err(BitError::Narrowing { from: self.width(), to: width });
        }
        let mut bits = vec![self.msb(); width - self.width()];
        bits.extend_from_slice(&self.bits);
        Ok(Self { bits })
    }

    /// Flip every bit in place.
    pub fn invert(&mut self) {
        for bit in &mut self.bits {
            *bit = bit.not();
        }
    }

    /// Add one to the unsigned value in place, wrapping at 2^width.
    pub fn increment_unsigned(&mut self) {
        for bit in self.bits.iter_mut().rev() {
            *bit = bit.not();
            if bit.is_set() {
                // no carry out of this position
                return;
            }
        }
    }

    /// Raw unsigned value, LSB-aligned.
    fn raw(&self) -> u64 {
        self.bits
            .iter()
            .fold(0u64, |acc, bit| (acc << 1) | u64::from(bit.to_u8()))
    }

    /// Overwrite every bit from the low `width` bits of `raw`.
    fn store(&mut self, raw: u64) {
        let width = self.width();
        for (i, bit) in self.bits.iter_mut().enumerate() {
            *bit = Bit::from_lsb(raw >> (width - 1 - i));
        }
    }
}

fn check_width(width: usize) -> Result<(), BitError> {
    if width == 0 {
        return Err(BitError::Empty);
    }
    if width > MAX_WIDTH {
        return Err(BitError::TooWide(width));
    }
    Ok(())
}

impl Default for BitVector {
    fn default() -> Self {
        Self::word()
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector(0b{} = {})", self, self.twos_complement_value())
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.bits {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

impl FromStr for BitVector {
    type Err = BitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bits(s)
    }
}

impl Serialize for BitVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BitVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        Self::from_bits(&pattern).map_err(serde::de::Error::custom)
    }
}

/// Errors from building or slicing bit vectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitError {
    #[error("bit range {start}..{} outside a {width}-bit vector", .start + .len)]
    OutOfRange { start: usize, len: usize, width: usize },

    #[error("invalid bit character: '{0}' (expected 0 or 1)")]
    InvalidBit(char),

    #[error("bit vector must have at least one bit")]
    Empty,

    #[error("width {0} exceeds the 32-bit maximum")]
    TooWide(usize),

    #[error("width mismatch: {left} bits vs {right} bits")]
    WidthMismatch { left: usize, right: usize },

    #[error("cannot sign-extend {from} bits down to {to} bits")]
    Narrowing { from: usize, to: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bv(pattern: &str) -> BitVector {
        BitVector::from_bits(pattern).unwrap()
    }

    #[test]
    fn test_from_bits() {
        let v = bv("0101");
        assert_eq!(v.width(), 4);
        assert_eq!(v.unsigned_value(), 5);
        assert_eq!(v.to_string(), "0101");
    }

    #[test]
    fn test_from_bits_rejects_garbage() {
        assert_eq!(BitVector::from_bits("01a1"), Err(BitError::InvalidBit('a')));
        assert_eq!(BitVector::from_bits(""), Err(BitError::Empty));
        let too_long = "0".repeat(33);
        assert_eq!(BitVector::from_bits(&too_long), Err(BitError::TooWide(33)));
    }

    #[test]
    fn test_unsigned_truncates_to_low_bits() {
        let mut v = BitVector::zero(4).unwrap();
        v.set_unsigned_value(0b1_0110);
        assert_eq!(v.unsigned_value(), 0b0110);

        let mut w = BitVector::word();
        w.set_unsigned_value(65_536 + 7);
        assert_eq!(w.unsigned_value(), 7);
    }

    #[test]
    fn test_twos_complement() {
        let mut w = BitVector::word();
        w.set_twos_complement_value(-6);
        assert_eq!(w.to_string(), "1111111111111010");
        assert_eq!(w.twos_complement_value(), -6);
        assert_eq!(w.unsigned_value(), 65_530);

        assert_eq!(bv("11111").twos_complement_value(), -1);
        assert_eq!(bv("01111").twos_complement_value(), 15);
        assert_eq!(bv("10000").twos_complement_value(), -16);
    }

    #[test]
    fn test_twos_complement_wraps() {
        let mut w = BitVector::word();
        w.set_twos_complement_value(32_768);
        assert_eq!(w.twos_complement_value(), -32_768);
        w.set_twos_complement_value(-32_769);
        assert_eq!(w.twos_complement_value(), 32_767);
    }

    #[test]
    fn test_signed_range() {
        let w = BitVector::word();
        assert_eq!(w.min_signed(), -32_768);
        assert_eq!(w.max_signed(), 32_767);
        let wide = BitVector::zero(32).unwrap();
        assert_eq!(wide.min_signed(), i32::MIN);
        assert_eq!(wide.max_signed(), i32::MAX);
    }

    #[test]
    fn test_substring_is_msb_first() {
        let ir = bv("0001001001100101");
        assert_eq!(ir.substring(0, 4).unwrap().to_string(), "0001");
        assert_eq!(ir.substring(4, 3).unwrap().to_string(), "001");
        assert_eq!(ir.substring(10, 1).unwrap().to_string(), "1");
        assert_eq!(ir.substring(11, 5).unwrap().to_string(), "00101");
    }

    #[test]
    fn test_substring_out_of_range() {
        let ir = BitVector::word();
        assert_eq!(
            ir.substring(12, 5),
            Err(BitError::OutOfRange { start: 12, len: 5, width: 16 })
        );
        assert!(ir.substring(0, 0).is_err());
        assert!(ir.substring(16, 1).is_err());
        assert!(ir.substring(usize::MAX, 2).is_err());
        assert!(ir.substring(15, 1).is_ok());
    }

    #[test]
    fn test_sign_extend() {
        let neg = bv("11101").sign_extend(16).unwrap();
        assert_eq!(neg.width(), 16);
        assert_eq!(neg.twos_complement_value(), -3);

        let pos = bv("00101").sign_extend(16).unwrap();
        assert_eq!(pos.to_string(), "0000000000000101");

        assert!(bv("0101").sign_extend(2).is_err());
        assert_eq!(bv("0101").sign_extend(4).unwrap(), bv("0101"));
    }

    #[test]
    fn test_invert() {
        let mut v = BitVector::with_unsigned(16, 5).unwrap();
        v.invert();
        assert_eq!(v.twos_complement_value(), -6);
        assert_eq!(v.width(), 16);
    }

    #[test]
    fn test_increment_wraps() {
        let mut v = bv("0111");
        v.increment_unsigned();
        assert_eq!(v.to_string(), "1000");

        let mut full = bv("1111");
        full.increment_unsigned();
        assert_eq!(full.to_string(), "0000");
    }

    #[test]
    fn test_clone_is_independent() {
        let original = BitVector::with_unsigned(16, 3).unwrap();
        let mut copy = original.clone();
        copy.invert();
        copy.increment_unsigned();
        assert_eq!(original.unsigned_value(), 3);
        assert_eq!(copy.twos_complement_value(), -3);
    }

    #[test]
    fn test_serde_as_pattern() {
        let v = bv("1010");
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1010\"");
        let back: BitVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert!(serde_json::from_str::<BitVector>("\"10x0\"").is_err());
    }
}
