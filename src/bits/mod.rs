//! Binary number primitives.
//!
//! This module provides the core types for working with fixed-width bits:
//! - [`Bit`] - A single binary digit
//! - [`BitVector`] - A fixed-width, MSB-first sequence of bits with
//!   unsigned and two's-complement views

mod bit;
mod vector;
pub mod arith;

pub use bit::Bit;
pub use vector::{BitVector, BitError, MAX_WIDTH, WORD_WIDTH};
pub use arith::{add, and, not};
