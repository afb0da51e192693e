//! Multi-bit arithmetic and logic.
//!
//! Addition is a ripple-carry adder built from [`Bit::full_add`], so it
//! behaves like fixed-width hardware: the result has the operands' width
//! and overflow wraps.

use crate::bits::{Bit, BitError, BitVector};

fn check_same_width(a: &BitVector, b: &BitVector) -> Result<(), BitError> {
    if a.width() != b.width() {
        return Err(BitError::WidthMismatch { left: a.width(), right: b.width() });
    }
    Ok(())
}

/// Add two vectors of equal width, returning (result, carry_out).
///
/// The same adder serves unsigned and two's-complement operands.
pub fn add(a: &BitVector, b: &BitVector) -> Result<(BitVector, Bit), BitError> {
    check_same_width(a, b)?;

    let mut sum = vec![Bit::Zero; a.width()];
    let mut carry = Bit::Zero;

    for i in (0..a.width()).rev() {
        let (s, c) = a.bits()[i].full_add(b.bits()[i], carry);
        sum[i] = s;
        carry = c;
    }

    Ok((BitVector::from_bit_slice(&sum)?, carry))
}

/// Bitwise AND of two vectors of equal width.
pub fn and(a: &BitVector, b: &BitVector) -> Result<BitVector, BitError> {
    check_same_width(a, b)?;
    let bits: Vec<Bit> = a
        .bits()
        .iter()
        .zip(b.bits())
        .map(|(x, y)| x.and(*y))
        .collect();
    BitVector::from_bit_slice(&bits)
}

/// Bitwise NOT, leaving the operand untouched.
pub fn not(a: &BitVector) -> BitVector {
    let mut result = a.clone();
    result.invert();
    result
}

/// Check whether a signed addition overflows.
///
/// Overflow happens when both operands share a sign and the sum does not.
pub fn would_overflow(a: &BitVector, b: &BitVector) -> Result<bool, BitError> {
    let (sum, _) = add(a, b)?;
    Ok(a.msb() == b.msb() && sum.msb() != a.msb())
}
