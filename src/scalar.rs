use crate::error::ScalarError;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Float, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::LazyLock;

/// Number of decimal places kept by every [`Scalar`].
pub const PRECISION_STORE: u32 = 20;
/// Number of decimal places two values must agree on to compare equal.
pub const PRECISION_COMPARISON: u32 = 5;
/// Number of decimal places printed by `Display`.
const PRECISION_DISPLAY: u32 = 5;

static SCALE: LazyLock<BigInt> = LazyLock::new(|| ten_pow(PRECISION_STORE));
static MARGIN: LazyLock<BigInt> = LazyLock::new(|| ten_pow(PRECISION_STORE - PRECISION_COMPARISON));
static DISPLAY_UNIT: LazyLock<BigInt> = LazyLock::new(|| ten_pow(PRECISION_STORE - PRECISION_DISPLAY));

fn ten_pow(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u32), exp as usize)
}

/// A decimal value stored with a fixed number of decimal places and compared with a margin.
///
/// The value is kept as an integer mantissa over `10^20`. Every operation re-quantizes its
/// result, rounding towards negative infinity. Two scalars are equal when they differ by less
/// than `1e-5`, and `PartialOrd` reports `Equal` in exactly the same cases.
///
/// Tolerance equality is not transitive: `a == b` and `b == c` do not imply `a == c`.
/// Use [`Scalar::total_cmp`] when a total order is needed, e.g. for sorting.
#[derive(Clone, Default)]
pub struct Scalar {
    raw: BigInt,
}

impl Scalar {
    fn from_raw(raw: BigInt) -> Self {
        Scalar { raw }
    }

    pub fn zero() -> Self {
        Scalar::default()
    }

    pub fn one() -> Self {
        Scalar::from(1)
    }

    pub fn two() -> Self {
        Scalar::from(2)
    }

    /// Converts a float using its exact binary expansion, then quantizes it.
    pub fn from_f64(value: f64) -> Result<Self, ScalarError> {
        if !value.is_finite() {
            return Err(ScalarError::NonFinite(value.to_string()));
        }
        let (mantissa, exponent, sign) = value.integer_decode();
        let numerator = BigInt::from(mantissa) * BigInt::from(sign) * &*SCALE;
        let raw = if exponent >= 0 {
            numerator << (exponent as usize)
        } else {
            let denominator = BigInt::from(1u8) << (exponent.unsigned_abs() as usize);
            numerator.div_floor(&denominator)
        };
        Ok(Scalar::from_raw(raw))
    }

    /// Lossy conversion used by renderers.
    pub fn to_f64(&self) -> f64 {
        let (int_part, frac_part) = self.raw.div_mod_floor(&SCALE);
        let int = int_part.to_f64().unwrap_or(f64::NAN);
        let frac = frac_part.to_f64().unwrap_or(0.0) / 1e20;
        int + frac
    }

    /// Quotient of `self / divisor`, failing if the divisor is within the margin of zero.
    pub fn checked_div(&self, divisor: &Scalar) -> Result<Scalar, ScalarError> {
        if divisor.is_zero() {
            return Err(ScalarError::DivisionByZero {
                dividend: self.to_string(),
                divisor: divisor.to_string(),
            });
        }
        Ok(Scalar::from_raw((&self.raw * &*SCALE).div_floor(&divisor.raw)))
    }

    /// `self` raised to an integer power. Negative exponents divide.
    pub fn pow(&self, n: i32) -> Result<Scalar, ScalarError> {
        let mut result = Scalar::one();
        for _ in 0..n.unsigned_abs() {
            result = &result * self;
        }
        if n < 0 {
            Scalar::one().checked_div(&result)
        } else {
            Ok(result)
        }
    }

    pub fn abs(&self) -> Scalar {
        Scalar::from_raw(self.raw.abs())
    }

    pub fn sqrt(&self) -> Result<Scalar, ScalarError> {
        if self.raw.is_negative() {
            return Err(ScalarError::NegativeSqrt(self.to_string()));
        }
        Ok(Scalar::from_raw((&self.raw * &*SCALE).sqrt()))
    }

    /// Equal to zero within the comparison margin.
    pub fn is_zero(&self) -> bool {
        self.raw.abs() < *MARGIN
    }

    /// Three-way comparison that honours the margin.
    pub fn cmp_margin(&self, other: &Scalar) -> Ordering {
        if self == other {
            Ordering::Equal
        } else {
            self.raw.cmp(&other.raw)
        }
    }

    /// Exact total order on the stored values, ignoring the margin.
    pub fn total_cmp(&self, other: &Scalar) -> Ordering {
        self.raw.cmp(&other.raw)
    }

    /// Smaller of two values under the exact order.
    pub fn min<'a>(&'a self, other: &'a Scalar) -> &'a Scalar {
        if self.total_cmp(other) == Ordering::Greater { other } else { self }
    }

    /// Larger of two values under the exact order.
    pub fn max<'a>(&'a self, other: &'a Scalar) -> &'a Scalar {
        if self.total_cmp(other) == Ordering::Less { other } else { self }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Scalar) -> bool {
        (&self.raw - &other.raw).abs() < *MARGIN
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Scalar) -> Option<Ordering> {
        Some(self.cmp_margin(other))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::from_raw(BigInt::from(value) * &*SCALE)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::from(i64::from(value))
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::from(i64::from(value))
    }
}

impl TryFrom<f64> for Scalar {
    type Error = ScalarError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Scalar::from_f64(value)
    }
}

impl<'a> Add<&'a Scalar> for &Scalar {
    type Output = Scalar;
    fn add(self, rhs: &'a Scalar) -> Scalar {
        Scalar::from_raw(&self.raw + &rhs.raw)
    }
}

impl<'a> Sub<&'a Scalar> for &Scalar {
    type Output = Scalar;
    fn sub(self, rhs: &'a Scalar) -> Scalar {
        Scalar::from_raw(&self.raw - &rhs.raw)
    }
}

impl<'a> Mul<&'a Scalar> for &Scalar {
    type Output = Scalar;
    fn mul(self, rhs: &'a Scalar) -> Scalar {
        Scalar::from_raw((&self.raw * &rhs.raw).div_floor(&SCALE))
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<Scalar> for Scalar {
            type Output = Scalar;
            fn $method(self, rhs: Scalar) -> Scalar {
                (&self).$method(&rhs)
            }
        }

        impl<'a> $imp<&'a Scalar> for Scalar {
            type Output = Scalar;
            fn $method(self, rhs: &'a Scalar) -> Scalar {
                (&self).$method(rhs)
            }
        }

        impl $imp<Scalar> for &Scalar {
            type Output = Scalar;
            fn $method(self, rhs: Scalar) -> Scalar {
                self.$method(&rhs)
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);

impl Neg for &Scalar {
    type Output = Scalar;
    fn neg(self) -> Scalar {
        Scalar::from_raw(-&self.raw)
    }
}

impl Neg for Scalar {
    type Output = Scalar;
    fn neg(self) -> Scalar {
        Scalar::from_raw(-self.raw)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Round half away from zero to the display precision.
        let (mut units, rest) = self.raw.abs().div_rem(&DISPLAY_UNIT);
        if rest * 2u32 >= *DISPLAY_UNIT {
            units += 1u32;
        }
        let divisor = ten_pow(PRECISION_DISPLAY);
        let (int_part, frac_part) = units.div_rem(&divisor);
        let sign = if self.raw.is_negative() && !units.is_zero() { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0>width$}",
            sign,
            int_part,
            frac_part.to_string(),
            width = PRECISION_DISPLAY as usize
        )
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
