//! Exact decimal values.
//!
//! A [`Decimal`] wraps a [`BigDecimal`] whose power-of-ten exponent is
//! bounded by [`MAX_EXPONENT`]. Rendering to SQL literal text works on the
//! integer digits and the exponent directly, so no value ever passes
//! through binary floating point.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use bigdecimal::{num_bigint::BigInt, BigDecimal};

use crate::error::{Result, SqlError};

/// Largest accepted magnitude of a decimal's power-of-ten exponent.
///
/// Plain rendering writes one character per power of ten, so `1E16384`
/// renders as 16385 digits and `1E200000000` is rejected with
/// [`SqlError::InvalidDecimal`].
pub const MAX_EXPONENT: i64 = 16_384;

/// An arbitrary-precision decimal number.
///
/// Equality and hashing follow the stored representation: `1.50` and `1.5`
/// render differently and are different values. Use
/// [`Decimal::numeric_eq`] to compare numbers.
#[derive(Debug, Clone)]
pub struct Decimal(BigDecimal);

impl Decimal {
    /// Builds `(-1)^negative * digits * 10^exponent`.
    ///
    /// `digits` must be a non-empty ASCII digit string.
    pub fn from_parts(negative: bool, digits: &str, exponent: i32) -> Result<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SqlError::InvalidDecimal(digits.to_string()));
        }
        let magnitude: BigInt = digits
            .parse()
            .map_err(|_| SqlError::InvalidDecimal(digits.to_string()))?;
        let int = if negative { -magnitude } else { magnitude };
        Self::bounded(BigDecimal::new(int, -i64::from(exponent)), digits)
    }

    fn bounded(value: BigDecimal, source: &str) -> Result<Self> {
        let (_, scale) = value.as_bigint_and_exponent();
        if scale.unsigned_abs() > MAX_EXPONENT.unsigned_abs() {
            return Err(SqlError::InvalidDecimal(format!(
                "{source}: exponent outside of ±{MAX_EXPONENT}"
            )));
        }
        Ok(Self(value))
    }

    /// Returns the wrapped value.
    #[must_use]
    pub const fn as_big_decimal(&self) -> &BigDecimal {
        &self.0
    }

    /// Returns `true` for values below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.as_bigint_and_exponent().0 < BigInt::from(0)
    }

    /// Returns `true` if both values denote the same number.
    #[must_use]
    pub fn numeric_eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }

    /// Renders the value in positional notation, without an exponent.
    ///
    /// `1.5E-7` becomes `0.00000015`, `-12E+3` becomes `-12000`.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        let (int, scale) = self.0.as_bigint_and_exponent();
        let text = int.to_string();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(digits) => (true, digits),
            None => (false, text.as_str()),
        };

        let mut out = String::with_capacity(digits.len() + 2);
        if negative {
            out.push('-');
        }
        if scale <= 0 {
            out.push_str(digits);
            if digits != "0" {
                out.push_str(&"0".repeat(usize::try_from(-scale).unwrap_or(0)));
            }
            return out;
        }

        let scale = usize::try_from(scale).unwrap_or(0);
        let len = digits.len();
        if len > scale {
            out.push_str(&digits[..len - scale]);
            out.push('.');
            out.push_str(&digits[len - scale..]);
        } else {
            out.push_str("0.");
            out.push_str(&"0".repeat(scale - len));
            out.push_str(digits);
        }
        out
    }

    /// Converts to the nearest `f64`. Precision may be lost.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.to_plain_string().parse().unwrap_or(f64::NAN)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bigint_and_exponent() == other.0.as_bigint_and_exponent()
    }
}

impl Eq for Decimal {}

impl Hash for Decimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_bigint_and_exponent().hash(state);
    }
}

impl FromStr for Decimal {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self> {
        let value: BigDecimal = s
            .trim()
            .parse()
            .map_err(|_| SqlError::InvalidDecimal(s.to_string()))?;
        Self::bounded(value, s)
    }
}

impl TryFrom<BigDecimal> for Decimal {
    type Error = SqlError;

    fn try_from(value: BigDecimal) -> Result<Self> {
        let source = value.to_string();
        Self::bounded(value, &source)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self(BigDecimal::from(value))
    }
}
