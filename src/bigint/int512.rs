// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::limbs::{self, Limbs};
use super::uint512::U512;
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, BitAnd, BitOr, BitXor, Mul, MulAssign, Neg, Not, Sub, SubAssign};

const SIGN_BIT: u32 = limbs::BITS - 1;

/// Signed 512-bit integer in two's-complement representation (high limb's
/// top bit is the sign bit).
///
/// Used for signed accumulators in the query evaluator and for signed
/// numeric columns.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct I512(pub(crate) Limbs);

impl I512 {
    /// The additive identity.
    pub const ZERO: Self = Self(limbs::ZERO);

    /// The multiplicative identity.
    pub const ONE: Self = Self([1, 0, 0, 0, 0, 0, 0, 0]);

    /// The most negative representable value (`-2^511`). `-MIN` is not
    /// representable, which is why division/negation special-case it.
    pub const MIN: Self = Self([0, 0, 0, 0, 0, 0, 0, 1 << 63]);

    /// The largest representable value (`2^511 - 1`).
    pub const MAX: Self = Self([
        u64::MAX,
        u64::MAX,
        u64::MAX,
        u64::MAX,
        u64::MAX,
        u64::MAX,
        u64::MAX,
        u64::MAX >> 1,
    ]);

    /// Builds a value from an `i64`, sign-extended.
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        let mut limbs = if value < 0 {
            [u64::MAX; 8]
        } else {
            limbs::ZERO
        };
        limbs[0] = value as u64;
        Self(limbs)
    }

    /// `true` if the sign bit is clear (zero counts as positive, matching
    /// the source library).
    #[must_use]
    pub fn is_positive(&self) -> bool {
        !self.is_negative()
    }

    /// `true` if the sign bit is set.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        limbs::test_bit(&self.0, SIGN_BIT)
    }

    /// `true` if the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        limbs::is_zero(&self.0)
    }

    /// Two's-complement negation. Wraps (silently) for [`Self::MIN`], since
    /// `-MIN` is not representable; callers that need the failure contract
    /// should check [`Self::checked_neg`] instead.
    #[must_use]
    pub fn wrapping_neg(&self) -> Self {
        Self(limbs::two_complement_neg(&self.0))
    }

    /// Negation that fails for [`Self::MIN`] rather than silently wrapping.
    pub fn checked_neg(&self) -> Result<Self> {
        if *self == Self::MIN {
            return Err(Error::InvalidNumber("-MIN is not representable".into()));
        }
        Ok(self.wrapping_neg())
    }

    /// Absolute value as an unsigned magnitude.
    ///
    /// Fails with [`Error::InvalidNumber`] for [`Self::MIN`], whose
    /// magnitude (`2^511`) does not fit back into a signed value, matching
    /// division's own `MIN` restriction.
    pub fn abs_unsigned(&self) -> Result<U512> {
        if *self == Self::MIN {
            return Err(Error::InvalidNumber("abs(MIN) is not representable".into()));
        }
        if self.is_negative() {
            Ok(U512::from_limbs(limbs::two_complement_neg(&self.0)))
        } else {
            Ok(U512::from_limbs(self.0))
        }
    }

    /// Number of bits needed to represent the value's magnitude: `0` for
    /// zero, `512` for [`Self::MIN`] (whose magnitude doesn't fit in 511
    /// bits), otherwise the bit size of `abs(self)`.
    #[must_use]
    pub fn bit_size(&self) -> u32 {
        if *self == Self::MIN {
            return limbs::BITS;
        }
        let magnitude = if self.is_negative() {
            limbs::two_complement_neg(&self.0)
        } else {
            self.0
        };
        limbs::bit_size(&magnitude)
    }

    /// Signed total-order comparison.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => limbs::cmp(&self.0, &other.0),
        }
    }

    /// Wrapping addition (two's-complement add is bit-identical to unsigned add).
    #[must_use]
    pub fn wrapping_add(&self, other: &Self) -> Self {
        Self(limbs::add(&self.0, &other.0))
    }

    /// Wrapping subtraction.
    #[must_use]
    pub fn wrapping_sub(&self, other: &Self) -> Self {
        Self(limbs::sub(&self.0, &other.0))
    }

    /// Wrapping multiplication.
    #[must_use]
    pub fn wrapping_mul(&self, other: &Self) -> Self {
        Self(limbs::mul(&self.0, &other.0))
    }

    /// Logical shift left, same as the unsigned variant.
    pub fn shl(&self, count: i32) -> Result<Self> {
        if count < 0 {
            return Err(Error::OutOfRange(format!("shl count {count} is negative")));
        }
        Ok(Self(limbs::shl(&self.0, count as u32)))
    }

    /// Arithmetic shift right: sign-extends for negative operands. `count`
    /// beyond 511 saturates to `0` or `-1` depending on sign (equivalent to
    /// shifting `511` times).
    pub fn asr(&self, count: i32) -> Result<Self> {
        if count < 0 {
            return Err(Error::OutOfRange(format!("asr count {count} is negative")));
        }
        let count = count as u32;
        if !self.is_negative() {
            return Ok(Self(limbs::lsr(&self.0, count)));
        }
        let effective = count.min(limbs::BITS - 1);
        let shifted = limbs::lsr(&self.0, effective);
        let fill_bits = effective;
        let mut result = shifted;
        // Sign-extend: OR in `fill_bits` worth of leading 1s.
        if fill_bits > 0 {
            let mask_low = limbs::not(&limbs::ZERO);
            let ones_shifted_into_place = limbs::shl(&mask_low, limbs::BITS - fill_bits);
            result = limbs::or(&result, &ones_shifted_into_place);
        }
        if count >= limbs::BITS {
            result = limbs::not(&limbs::ZERO); // -1
        }
        Ok(Self(result))
    }

    /// Divides `self` by `rhs`, returning `(quotient, remainder)` with the
    /// remainder's sign matching `self` (truncating division).
    ///
    /// Fails with [`Error::LogicError`] if `rhs` is zero, and with
    /// [`Error::InvalidNumber`] if either operand is [`Self::MIN`] (because
    /// `-MIN` is not representable as an intermediate).
    pub fn div_mod(&self, rhs: &Self) -> Result<(Self, Self)> {
        if *self == Self::MIN || *rhs == Self::MIN {
            return Err(Error::InvalidNumber(
                "division involving MIN is not representable".into(),
            ));
        }
        if rhs.is_zero() {
            return Err(Error::LogicError("division by zero".into()));
        }

        let lhs_neg = self.is_negative();
        let rhs_neg = rhs.is_negative();

        let lhs_mag = self.abs_unsigned()?;
        let rhs_mag = rhs.abs_unsigned()?;

        let (q_mag, r_mag) = lhs_mag.div_mod(&rhs_mag)?;

        let mut quotient = Self(q_mag.to_limbs());
        if lhs_neg != rhs_neg {
            quotient = quotient.wrapping_neg();
        }

        let mut remainder = Self(r_mag.to_limbs());
        if lhs_neg {
            remainder = remainder.wrapping_neg();
        }

        Ok((quotient, remainder))
    }

    /// Formats the value in `base` (2, 8, 10, or 16), optionally with a
    /// `0b`/`0`/`0x` introducer, in the requested letter case. Negative
    /// values are printed with a leading `-` before the introducer.
    #[must_use]
    pub fn to_string_radix(&self, base: u32, introducer: bool, uppercase: bool) -> String {
        if self.is_negative() {
            let magnitude = self
                .abs_unsigned()
                .unwrap_or_else(|_| U512::from_limbs(self.0));
            format!(
                "-{}",
                magnitude.to_string_radix(base, introducer, uppercase)
            )
        } else {
            U512::from_limbs(self.0).to_string_radix(base, introducer, uppercase)
        }
    }

    /// Parses a value formatted per [`Self::to_string_radix`], including an
    /// optional leading `-` before any introducer.
    pub fn from_str_radix(input: &str, default_base: u32) -> Result<Self> {
        let (negative, rest) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let magnitude = U512::from_str_radix(rest, default_base)?;
        let value = Self(magnitude.to_limbs());
        if negative {
            value.checked_neg().or_else(|_| {
                if value == Self::MIN {
                    Ok(Self::MIN)
                } else {
                    Err(Error::InvalidNumber("negation overflow".into()))
                }
            })
        } else {
            Ok(value)
        }
    }
}

impl fmt::Debug for I512 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I512({})", self.to_string_radix(10, false, false))
    }
}

impl fmt::Display for I512 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_radix(10, false, false))
    }
}

impl Ord for I512 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for I512 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for I512 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(&rhs)
    }
}

impl AddAssign for I512 {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.wrapping_add(&rhs);
    }
}

impl Sub for I512 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.wrapping_sub(&rhs)
    }
}

impl SubAssign for I512 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.wrapping_sub(&rhs);
    }
}

impl Mul for I512 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.wrapping_mul(&rhs)
    }
}

impl MulAssign for I512 {
    fn mul_assign(&mut self, rhs: Self) {
        *self = self.wrapping_mul(&rhs);
    }
}

impl Neg for I512 {
    type Output = Self;
    fn neg(self) -> Self {
        self.wrapping_neg()
    }
}

impl Not for I512 {
    type Output = Self;
    fn not(self) -> Self {
        Self(limbs::not(&self.0))
    }
}

impl BitAnd for I512 {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(limbs::and(&self.0, &rhs.0))
    }
}

impl BitOr for I512 {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(limbs::or(&self.0, &rhs.0))
    }
}

/// `^` is real XOR.
///
/// The C++ source's `operator^` delegated to `|=` (an OR), which the
/// original spec calls out as a bug; this rewrite implements the operator
/// the way its name suggests. Any caller ported from the C++ behavior that
/// actually wanted OR should call `|` instead.
impl BitXor for I512 {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self {
        Self(limbs::xor(&self.0, &rhs.0))
    }
}

impl From<i64> for I512 {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}
