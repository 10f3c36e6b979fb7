//! Exact rational constants.
//!
//! Symbolic coefficients and exponents are kept exact so that two expressions
//! built along different paths canonicalize to the same tree.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// A normalized rational number.
///
/// Invariant: `den > 0` and `gcd(|num|, den) == 1`, so structural equality is
/// value equality.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    pub const ONE: Rational = Rational { num: 1, den: 1 };
    pub const MINUS_ONE: Rational = Rational { num: -1, den: 1 };
    pub const HALF: Rational = Rational { num: 1, den: 2 };

    /// Create a rational from numerator and denominator.
    ///
    /// Returns `None` when `den` is zero.
    pub fn new(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        Some(Self::normalized(num, den))
    }

    /// Create an integer-valued rational.
    #[inline]
    pub const fn integer(value: i128) -> Self {
        Rational { num: value, den: 1 }
    }

    fn normalized(num: i128, den: i128) -> Self {
        let sign = if den < 0 { -1 } else { 1 };
        let g = gcd(num.abs(), den.abs()).max(1);
        Rational {
            num: sign * num / g,
            den: sign * den / g,
        }
    }

    #[inline]
    pub const fn numer(self) -> i128 {
        self.num
    }

    #[inline]
    pub const fn denom(self) -> i128 {
        self.den
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.num == 0
    }

    #[inline]
    pub const fn is_one(self) -> bool {
        self.num == 1 && self.den == 1
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        self.den == 1
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.num < 0
    }

    /// Integer value, if this rational is an integer.
    pub fn as_integer(self) -> Option<i128> {
        self.is_integer().then_some(self.num)
    }

    /// Multiplicative inverse, `None` for zero.
    pub fn recip(self) -> Option<Self> {
        Self::new(self.den, self.num)
    }

    /// Raise to an integer power. `None` for `0^negative` or exponents too
    /// large to be worth folding.
    pub fn pow(self, exp: i128) -> Option<Self> {
        const MAX_FOLDED_EXPONENT: i128 = 64;
        if exp.abs() > MAX_FOLDED_EXPONENT {
            return None;
        }
        let base = if exp < 0 { self.recip()? } else { self };
        let mut acc = Rational::ONE;
        for _ in 0..exp.abs() {
            acc = Rational::normalized(acc.num.checked_mul(base.num)?, acc.den.checked_mul(base.den)?);
        }
        Some(acc)
    }

    /// Lossy conversion for numeric evaluation.
    #[expect(
        clippy::cast_precision_loss,
        reason = "numeric evaluation is approximate by nature"
    )]
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Rational::integer(i128::from(value))
    }
}

impl Add for Rational {
    type Output = Rational;

    fn add(self, rhs: Rational) -> Rational {
        Rational::normalized(self.num * rhs.den + rhs.num * self.den, self.den * rhs.den)
    }
}

impl Sub for Rational {
    type Output = Rational;

    fn sub(self, rhs: Rational) -> Rational {
        self + (-rhs)
    }
}

impl Mul for Rational {
    type Output = Rational;

    fn mul(self, rhs: Rational) -> Rational {
        Rational::normalized(self.num * rhs.num, self.den * rhs.den)
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational {
            num: -self.num,
            den: self.den,
        }
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num * other.den).cmp(&(other.num * self.den))
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_sign_and_gcd() {
        let r = Rational::new(4, -6).unwrap_or(Rational::ZERO);
        assert_eq!(r.numer(), -2);
        assert_eq!(r.denom(), 3);
        assert_eq!(r, Rational::new(-2, 3).unwrap_or(Rational::ZERO));
    }

    #[test]
    fn zero_denominator_rejected() {
        assert_eq!(Rational::new(1, 0), None);
        assert_eq!(Rational::ZERO.recip(), None);
    }

    #[test]
    fn arithmetic() {
        let third = Rational::new(1, 3).unwrap_or(Rational::ZERO);
        assert_eq!(third + third + third, Rational::ONE);
        assert_eq!(Rational::HALF * Rational::integer(4), Rational::integer(2));
        assert_eq!(Rational::HALF - Rational::ONE, -Rational::HALF);
    }

    #[test]
    fn integer_powers() {
        assert_eq!(Rational::integer(2).pow(10), Some(Rational::integer(1024)));
        assert_eq!(Rational::integer(2).pow(-1), Some(Rational::HALF));
        assert_eq!(Rational::ZERO.pow(-1), None);
    }

    #[test]
    fn ordering_is_by_value() {
        assert!(Rational::HALF < Rational::ONE);
        assert!(Rational::MINUS_ONE < Rational::ZERO);
        assert_eq!(format!("{}", Rational::HALF), "1/2");
        assert_eq!(format!("{}", Rational::integer(-3)), "-3");
    }
}
