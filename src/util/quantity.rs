//! Kubernetes resource quantities
//!
//! `k8s-openapi` carries quantities as opaque strings. The reconciler needs
//! two things from them: validating a user supplied claim size and comparing
//! two storage requests numerically. Both follow the apimachinery quantity
//! grammar: a signed decimal number followed by an optional binary suffix
//! (`Ki`..`Ei`), decimal SI suffix (`n`..`E`) or decimal exponent (`e3`).

use crate::error::{Error, Result};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Maximum significant digits accepted in the numeric part
const MAX_DIGITS: usize = 30;

/// Parsed scale of a quantity suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scale {
    /// Power of two multiplier (binary suffixes)
    pow2: u32,
    /// Power of ten multiplier (SI suffixes and exponents)
    pow10: i32,
}

fn parse_suffix(suffix: &str) -> Option<Scale> {
    let binary = |pow2| Some(Scale { pow2, pow10: 0 });
    let decimal = |pow10| Some(Scale { pow2: 0, pow10 });

    match suffix {
        "" => decimal(0),
        "Ki" => binary(10),
        "Mi" => binary(20),
        "Gi" => binary(30),
        "Ti" => binary(40),
        "Pi" => binary(50),
        "Ei" => binary(60),
        "n" => decimal(-9),
        "u" => decimal(-6),
        "m" => decimal(-3),
        "k" => decimal(3),
        "M" => decimal(6),
        "G" => decimal(9),
        "T" => decimal(12),
        "P" => decimal(15),
        "E" => decimal(18),
        _ => {
            // Decimal exponent form: e3, E-2, e+6
            let rest = suffix.strip_prefix(&['e', 'E'][..])?;
            let digits = rest.strip_prefix(&['+', '-'][..]).unwrap_or(rest);
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            rest.parse::<i32>().ok().and_then(decimal)
        }
    }
}

/// Split a quantity into (negative, integer digits, fraction digits, suffix)
fn split(raw: &str) -> Option<(bool, &str, &str, &str)> {
    let (negative, unsigned) = match raw.as_bytes().first()? {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };

    let number_end = unsigned
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_end);

    let (integer, fraction) = match number.split_once('.') {
        Some((integer, fraction)) => {
            if fraction.contains('.') {
                return None;
            }
            (integer, fraction)
        }
        None => (number, ""),
    };

    if integer.is_empty() && fraction.is_empty() {
        return None;
    }

    Some((negative, integer, fraction, suffix))
}

/// Parse a quantity string into its integer value, rounded away from zero
pub fn parse_value(raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    let invalid = || Error::QuantityParse(format!("invalid quantity {:?}", raw));

    let (negative, integer, fraction, suffix) = split(trimmed).ok_or_else(invalid)?;
    let scale = parse_suffix(suffix).ok_or_else(invalid)?;

    let digits = format!("{}{}", integer, fraction);
    let digits = digits.trim_start_matches('0');
    if digits.len() > MAX_DIGITS {
        return Err(Error::QuantityParse(format!(
            "quantity {:?} has too many significant digits",
            raw
        )));
    }

    let mantissa: i128 = if digits.is_empty() {
        0
    } else {
        digits.parse().map_err(|_| invalid())?
    };

    let out_of_range =
        || Error::QuantityParse(format!("quantity {:?} is out of range", raw));

    let mut value = mantissa
        .checked_mul(1i128 << scale.pow2)
        .ok_or_else(out_of_range)?;

    let pow10 = scale.pow10 - fraction.len() as i32;
    if pow10 >= 0 {
        let factor = 10i128
            .checked_pow(pow10 as u32)
            .ok_or_else(out_of_range)?;
        value = value.checked_mul(factor).ok_or_else(out_of_range)?;
    } else {
        value = match 10i128.checked_pow(pow10.unsigned_abs()) {
            Some(divisor) => value / divisor + i128::from(value % divisor != 0),
            // Anything this small rounds up to a single unit
            None => i128::from(value > 0),
        };
    }

    if negative {
        value = -value;
    }

    i64::try_from(value).map_err(|_| out_of_range())
}

/// Validate a quantity string and wrap it for use in an object spec
pub fn parse_quantity(raw: &str) -> Result<Quantity> {
    parse_value(raw)?;
    Ok(Quantity(raw.trim().to_string()))
}

/// Integer value of a quantity, `0` if it does not parse
///
/// Quantities read back from the API server have already been validated, so
/// an unparseable value only shows up in hand-built objects.
pub fn quantity_value(quantity: Option<&Quantity>) -> i64 {
    quantity
        .and_then(|q| parse_value(&q.0).ok())
        .unwrap_or_default()
}
