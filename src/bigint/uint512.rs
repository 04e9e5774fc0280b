// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::limbs::{self, Limbs};
use super::parse::{digit_char, digit_value, prefix_for_base, strip_introducer, Introducer};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, BitAnd, BitOr, BitXor, Mul, MulAssign, Not, Sub, SubAssign};

/// Unsigned 512-bit integer, stored as eight little-endian 64-bit limbs.
///
/// Used for primary keys, row identifiers, and wide numeric columns. All
/// arithmetic wraps silently on overflow, matching the source library's
/// fixed-width semantics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct U512(pub(crate) Limbs);

impl U512 {
    /// The additive identity.
    pub const ZERO: Self = Self(limbs::ZERO);

    /// The multiplicative identity.
    pub const ONE: Self = Self([1, 0, 0, 0, 0, 0, 0, 0]);

    /// The largest representable value.
    pub const MAX: Self = Self([u64::MAX; 8]);

    /// Builds a value from a `u64`.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(limbs::from_u64(value))
    }

    /// Builds a value from eight little-endian limbs (limb 0 = least significant).
    #[must_use]
    pub fn from_limbs(limbs: [u64; 8]) -> Self {
        Self(limbs)
    }

    /// Returns the limbs, little-endian.
    #[must_use]
    pub fn to_limbs(self) -> [u64; 8] {
        self.0
    }

    /// `true` if the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        limbs::is_zero(&self.0)
    }

    /// Number of bits needed to represent the value: `0` for zero, else
    /// `1 + position of the highest set bit`.
    #[must_use]
    pub fn bit_size(&self) -> u32 {
        limbs::bit_size(&self.0)
    }

    /// Total-order comparison (unsigned, high limb to low limb).
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        limbs::cmp(&self.0, &other.0)
    }

    /// Wrapping addition.
    #[must_use]
    pub fn wrapping_add(&self, other: &Self) -> Self {
        Self(limbs::add(&self.0, &other.0))
    }

    /// Wrapping subtraction.
    #[must_use]
    pub fn wrapping_sub(&self, other: &Self) -> Self {
        Self(limbs::sub(&self.0, &other.0))
    }

    /// Shift-and-add multiplication, `O(bits)`.
    #[must_use]
    pub fn wrapping_mul(&self, other: &Self) -> Self {
        Self(limbs::mul(&self.0, &other.0))
    }

    /// Logical shift left. `count < 0` is rejected; `count >= 512` yields zero.
    pub fn shl(&self, count: i32) -> Result<Self> {
        if count < 0 {
            return Err(Error::OutOfRange(format!("shl count {count} is negative")));
        }
        Ok(Self(limbs::shl(&self.0, count as u32)))
    }

    /// Logical shift right. `count < 0` is rejected; `count >= 512` yields zero.
    pub fn shr(&self, count: i32) -> Result<Self> {
        if count < 0 {
            return Err(Error::OutOfRange(format!("shr count {count} is negative")));
        }
        Ok(Self(limbs::lsr(&self.0, count as u32)))
    }

    /// Divides `self` by `rhs`, returning `(quotient, remainder)`.
    ///
    /// Fails with [`Error::LogicError`] if `rhs` is zero.
    pub fn div_mod(&self, rhs: &Self) -> Result<(Self, Self)> {
        limbs::divmod(&self.0, &rhs.0)
            .map(|(q, r)| (Self(q), Self(r)))
            .ok_or_else(|| Error::LogicError("division by zero".into()))
    }

    /// `self / rhs`, rounded toward zero, rounded *up* instead of down.
    ///
    /// `divisor == 0` fails explicitly rather than being undefined behavior
    /// (see `SPEC_FULL.md`'s resolution of the corresponding open question).
    pub fn divide_rounded_up(&self, divisor: &Self) -> Result<Self> {
        if divisor.is_zero() {
            return Err(Error::LogicError("divide_rounded_up by zero".into()));
        }
        let (q, r) = self.div_mod(divisor)?;
        if r.is_zero() {
            Ok(q)
        } else {
            Ok(q.wrapping_add(&Self::ONE))
        }
    }

    /// Formats the value in `base` (2..=36), optionally with a `0b`/`0`/`0x`
    /// introducer and in the requested letter case.
    #[must_use]
    pub fn to_string_radix(&self, base: u32, introducer: bool, uppercase: bool) -> String {
        assert!((2..=36).contains(&base), "base must be within 2..=36");

        if self.is_zero() {
            let mut s = String::new();
            if introducer {
                s.push_str(prefix_for_base(base));
            }
            s.push('0');
            return s;
        }

        let mut work = self.0;
        let mut digits = Vec::new();
        while !limbs::is_zero(&work) {
            let rem = limbs::divmod_small(&mut work, u64::from(base));
            digits.push(digit_char(rem as u32, uppercase));
        }
        digits.reverse();

        let mut s = String::new();
        if introducer {
            s.push_str(prefix_for_base(base));
        }
        s.extend(digits);
        s
    }

    /// Parses a value formatted per [`Self::to_string_radix`], or using one
    /// of the quoted introducer forms (`B'...'`, `O'...'`, `X'...'`,
    /// `E'...'`). `default_base` is used when no introducer is present.
    pub fn from_str_radix(input: &str, default_base: u32) -> Result<Self> {
        let (introducer, rest) = strip_introducer(input);

        let (base, digits_owned): (u32, std::borrow::Cow<str>) = match introducer {
            Introducer::Escaped => {
                let decoded = super::parse::decode_c_escapes(rest)?;
                let s = String::from_utf8(decoded)
                    .map_err(|_| Error::InvalidNumber("escaped literal is not UTF-8".into()))?;
                (default_base, std::borrow::Cow::Owned(s))
            }
            Introducer::None => (default_base, std::borrow::Cow::Borrowed(rest)),
            other => (
                other.base().unwrap_or(default_base),
                std::borrow::Cow::Borrowed(rest),
            ),
        };

        if !(2..=36).contains(&base) {
            return Err(Error::OutOfRange(format!("base {base} out of range")));
        }
        if digits_owned.is_empty() {
            return Err(Error::InvalidNumber("empty digit string".into()));
        }

        let mut value = limbs::ZERO;
        for c in digits_owned.bytes() {
            let d = digit_value(c, base)
                .ok_or_else(|| Error::InvalidNumber(format!("invalid digit '{}'", c as char)))?;
            limbs::mul_small_add(&mut value, u64::from(base), u64::from(d));
        }

        Ok(Self(value))
    }
}

impl fmt::Debug for U512 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U512({})", self.to_string_radix(10, false, false))
    }
}

impl fmt::Display for U512 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_radix(10, false, false))
    }
}

impl Ord for U512 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for U512 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for U512 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(&rhs)
    }
}

impl AddAssign for U512 {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.wrapping_add(&rhs);
    }
}

impl Sub for U512 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.wrapping_sub(&rhs)
    }
}

impl SubAssign for U512 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.wrapping_sub(&rhs);
    }
}

impl Mul for U512 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.wrapping_mul(&rhs)
    }
}

impl MulAssign for U512 {
    fn mul_assign(&mut self, rhs: Self) {
        *self = self.wrapping_mul(&rhs);
    }
}

impl Not for U512 {
    type Output = Self;
    fn not(self) -> Self {
        Self(limbs::not(&self.0))
    }
}

impl BitAnd for U512 {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(limbs::and(&self.0, &rhs.0))
    }
}

impl BitOr for U512 {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(limbs::or(&self.0, &rhs.0))
    }
}

impl BitXor for U512 {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self {
        Self(limbs::xor(&self.0, &rhs.0))
    }
}

impl From<u64> for U512 {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub_roundtrip() {
        let a = U512::from_u64(12345);
        let b = U512::from_u64(9876);
        assert_eq!(a.wrapping_add(&b).wrapping_sub(&b), a);
    }

    #[test]
    fn overflow_wraps() {
        let max = U512::MAX;
        assert_eq!(max.wrapping_add(&U512::ONE), U512::ZERO);
    }

    #[test]
    fn div_mod_identity() {
        let a = U512::from_u64(1_000_003);
        let b = U512::from_u64(17);
        let (q, r) = a.div_mod(&b).unwrap();
        assert_eq!(q.wrapping_mul(&b).wrapping_add(&r), a);
        assert!(r.compare(&b) == Ordering::Less);
    }

    #[test]
    fn div_by_zero_fails() {
        let a = U512::from_u64(5);
        assert!(matches!(a.div_mod(&U512::ZERO), Err(Error::LogicError(_))));
    }

    #[test]
    fn divide_rounded_up_by_zero_fails_explicitly() {
        let a = U512::from_u64(5);
        assert!(a.divide_rounded_up(&U512::ZERO).is_err());
    }

    #[test]
    fn shift_by_512_zeroes() {
        let a = U512::from_u64(1);
        assert!(a.shl(512).unwrap().is_zero());
        assert!(a.shl(600).unwrap().is_zero());
    }

    #[test]
    fn negative_shift_count_errors() {
        let a = U512::from_u64(1);
        assert!(matches!(a.shl(-1), Err(Error::OutOfRange(_))));
        assert!(matches!(a.shr(-1), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn base_conversion_roundtrip() {
        for base in [2, 8, 10, 16] {
            let n = U512::from_u64(123_456_789);
            let s = n.to_string_radix(base, false, false);
            let back = U512::from_str_radix(&s, base).unwrap();
            assert_eq!(n, back);
        }
    }

    #[test]
    fn parses_prefixed_literals() {
        assert_eq!(
            U512::from_str_radix("0x2A", 10).unwrap(),
            U512::from_u64(42)
        );
        assert_eq!(
            U512::from_str_radix("0b101010", 10).unwrap(),
            U512::from_u64(42)
        );
        assert_eq!(U512::from_str_radix("052", 10).unwrap(), U512::from_u64(42));
    }

    #[test]
    fn parses_quoted_literals() {
        assert_eq!(
            U512::from_str_radix("X'2A'", 10).unwrap(),
            U512::from_u64(42)
        );
        assert_eq!(
            U512::from_str_radix("B'101010'", 10).unwrap(),
            U512::from_u64(42)
        );
        assert_eq!(
            U512::from_str_radix("E'42'", 10).unwrap(),
            U512::from_u64(42)
        );
    }

    #[test]
    fn bit_size_edge_cases() {
        assert_eq!(U512::ZERO.bit_size(), 0);
        assert_eq!(U512::ONE.bit_size(), 1);
        assert_eq!(U512::MAX.bit_size(), 512);
    }

    #[test]
    fn xor_is_real_xor_not_or() {
        let a = U512::from_u64(0b1100);
        let b = U512::from_u64(0b1010);
        assert_eq!(a ^ b, U512::from_u64(0b0110));
    }
}
