//! Scalar conversion primitives: integer, floating point, decimal, bool and
//! their string forms. Every failure is an evaluation error.

use std::str::FromStr;

use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    analyzer::{AnalyzerError, truncate_literal},
    types::{TypeKind, Value},
};

/// Fractional digits kept by NUMERIC.
pub const NUMERIC_SCALE: u32 = 9;

fn kind_label(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Bool => "bool",
        TypeKind::Int32 => "int32",
        TypeKind::Int64 => "int64",
        TypeKind::Uint32 => "uint32",
        TypeKind::Uint64 => "uint64",
        TypeKind::Float => "float",
        TypeKind::Double => "double",
        TypeKind::Numeric => "numeric",
        TypeKind::BigNumeric => "bignumeric",
        _ => "value",
    }
}

fn out_of_range(kind: TypeKind, shown: impl std::fmt::Display) -> AnalyzerError {
    AnalyzerError::eval(format!("{} out of range: {}", kind_label(kind), shown))
}

fn unsupported_target(from: TypeKind, to: TypeKind) -> AnalyzerError {
    AnalyzerError::unimplemented(format!("Unimplemented cast from {from} to {to}"))
}

/// Integer (or bool, as 0/1) payload widened to `i128`.
pub fn integer_to(v: i128, from: TypeKind, to: TypeKind) -> Result<Value, AnalyzerError> {
    match to {
        TypeKind::Bool => Ok(Value::bool(v != 0)),
        TypeKind::Int32 => i32::try_from(v).map(Value::int32).map_err(|_| out_of_range(to, v)),
        TypeKind::Int64 => i64::try_from(v).map(Value::int64).map_err(|_| out_of_range(to, v)),
        TypeKind::Uint32 => u32::try_from(v).map(Value::uint32).map_err(|_| out_of_range(to, v)),
        TypeKind::Uint64 => u64::try_from(v).map(Value::uint64).map_err(|_| out_of_range(to, v)),
        TypeKind::Float => Ok(Value::float(v as f32)),
        TypeKind::Double => Ok(Value::double(v as f64)),
        TypeKind::Numeric | TypeKind::BigNumeric => {
            let d = Decimal::from_i128(v).ok_or_else(|| out_of_range(to, v))?;
            decimal_to(d, TypeKind::BigNumeric, to)
        }
        TypeKind::String if from == TypeKind::Bool => Ok(Value::string(if v != 0 { "true" } else { "false" })),
        TypeKind::String => Ok(Value::string(v.to_string())),
        _ => Err(unsupported_target(from, to)),
    }
}

/// Rounds half away from zero, the rule for every float -> integer cast.
fn round_to_integer(v: f64, to: TypeKind) -> Result<i128, AnalyzerError> {
    if !v.is_finite() {
        return Err(AnalyzerError::eval(format!(
            "Illegal conversion of non-finite floating point number to an integer: {}",
            render_double(v)
        )));
    }
    let r = v.round();
    // i128 comfortably covers every integer target
    if r.abs() >= 1e30 {
        return Err(out_of_range(to, render_double(v)));
    }
    Ok(r as i128)
}

/// `from` is `Float` or `Double`; `v` holds the value widened to `f64`.
pub fn float_to(v: f64, from: TypeKind, to: TypeKind) -> Result<Value, AnalyzerError> {
    match to {
        TypeKind::Int32 | TypeKind::Int64 | TypeKind::Uint32 | TypeKind::Uint64 => {
            let i = round_to_integer(v, to)?;
            integer_to(i, from, to).map_err(|_| out_of_range(to, render_double(v)))
        }
        TypeKind::Float => {
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                return Err(out_of_range(TypeKind::Float, render_double(v)));
            }
            Ok(Value::float(v as f32))
        }
        TypeKind::Double => Ok(Value::double(v)),
        TypeKind::Numeric | TypeKind::BigNumeric => {
            if !v.is_finite() {
                return Err(AnalyzerError::eval(format!(
                    "Illegal conversion of non-finite floating point number to {}: {}",
                    kind_label(to),
                    render_double(v)
                )));
            }
            let d = Decimal::from_f64(v).ok_or_else(|| out_of_range(to, render_double(v)))?;
            decimal_to(d, TypeKind::BigNumeric, to)
        }
        TypeKind::String if from == TypeKind::Float => Ok(Value::string(render_float(v as f32))),
        TypeKind::String => Ok(Value::string(render_double(v))),
        _ => Err(unsupported_target(from, to)),
    }
}

pub fn decimal_to(d: Decimal, from: TypeKind, to: TypeKind) -> Result<Value, AnalyzerError> {
    match to {
        TypeKind::Int32 | TypeKind::Int64 | TypeKind::Uint32 | TypeKind::Uint64 => {
            let rounded = d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            let i = rounded.to_i128().ok_or_else(|| out_of_range(to, d.normalize()))?;
            integer_to(i, from, to).map_err(|_| out_of_range(to, d.normalize()))
        }
        TypeKind::Float => d.to_f32().map(Value::float).ok_or_else(|| out_of_range(to, d.normalize())),
        TypeKind::Double => d.to_f64().map(Value::double).ok_or_else(|| out_of_range(to, d.normalize())),
        TypeKind::Numeric => Ok(Value::numeric(
            d.round_dp_with_strategy(NUMERIC_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )),
        TypeKind::BigNumeric => Ok(Value::bignumeric(d)),
        TypeKind::String => Ok(Value::string(d.normalize().to_string())),
        _ => Err(unsupported_target(from, to)),
    }
}

/// Locale-independent rendering: `inf`, `-inf`, `nan`, otherwise the
/// shortest text that reads back to the same value.
pub fn render_double(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        v.to_string()
    }
}

pub fn render_float(v: f32) -> String {
    if v.is_finite() { v.to_string() } else { render_double(f64::from(v)) }
}

fn bad_value(kind: TypeKind, text: &str) -> AnalyzerError {
    AnalyzerError::eval(format!("Bad {} value: {}", kind_label(kind), truncate_literal(text)))
}

fn parse_integer(text: &str) -> Option<i128> {
    let t = text.trim();
    let (negative, digits) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    if digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i128>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// STRING -> simple numeric or bool kind.
pub fn string_to(text: &str, to: TypeKind) -> Result<Value, AnalyzerError> {
    match to {
        TypeKind::Bool => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::bool(true)),
            "false" => Ok(Value::bool(false)),
            _ => Err(bad_value(to, text)),
        },
        TypeKind::Int32 | TypeKind::Int64 | TypeKind::Uint32 | TypeKind::Uint64 => {
            let v = parse_integer(text).ok_or_else(|| bad_value(to, text))?;
            integer_to(v, TypeKind::String, to).map_err(|_| bad_value(to, text))
        }
        TypeKind::Float | TypeKind::Double => {
            let v = f64::from_str(text.trim()).map_err(|_| bad_value(to, text))?;
            if to == TypeKind::Float {
                if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                    return Err(bad_value(to, text));
                }
                return Ok(Value::float(v as f32));
            }
            Ok(Value::double(v))
        }
        TypeKind::Numeric | TypeKind::BigNumeric => {
            let t = text.trim();
            let parsed = if t.contains(['e', 'E']) { Decimal::from_scientific(t) } else { Decimal::from_str(t) };
            let d = parsed.map_err(|_| {
                AnalyzerError::eval(format!("Invalid {} value: {}", to, truncate_literal(text)))
            })?;
            decimal_to(d, TypeKind::String, to)
        }
        _ => Err(unsupported_target(TypeKind::String, to)),
    }
}

/// BYTES -> STRING requires well-formed UTF-8.
pub fn bytes_to_string(bytes: &[u8]) -> Result<Value, AnalyzerError> {
    std::str::from_utf8(bytes)
        .map(Value::string)
        .map_err(|_| AnalyzerError::eval("Invalid cast of bytes to UTF8 string"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::ErrorClass;

    #[test]
    fn narrowing_reports_the_value() {
        let err = integer_to(3_000_000_000, TypeKind::Int64, TypeKind::Int32).unwrap_err();
        assert_eq!(err.to_string(), "int32 out of range: 3000000000");
        assert_eq!(err.class(), ErrorClass::Dynamic);
        assert_eq!(integer_to(-1, TypeKind::Int64, TypeKind::Uint64).unwrap_err().to_string(), "uint64 out of range: -1");
    }

    #[test]
    fn float_to_integer_rounds_half_away_from_zero() {
        assert_eq!(float_to(2.5, TypeKind::Double, TypeKind::Int64).unwrap(), Value::int64(3));
        assert_eq!(float_to(-2.5, TypeKind::Double, TypeKind::Int64).unwrap(), Value::int64(-3));
        let err = float_to(f64::NAN, TypeKind::Double, TypeKind::Int32).unwrap_err();
        assert!(err.to_string().starts_with("Illegal conversion of non-finite"));
        assert!(float_to(1e300, TypeKind::Double, TypeKind::Float).is_err());
        assert_eq!(float_to(f64::INFINITY, TypeKind::Double, TypeKind::Float).unwrap(), Value::float(f32::INFINITY));
    }

    #[test]
    fn string_parsing_accepts_hex_and_whitespace() {
        assert_eq!(string_to(" 123 ", TypeKind::Int64).unwrap(), Value::int64(123));
        assert_eq!(string_to("0x1F", TypeKind::Int32).unwrap(), Value::int32(31));
        assert_eq!(string_to("-0x10", TypeKind::Int64).unwrap(), Value::int64(-16));
        assert_eq!(string_to("TRUE", TypeKind::Bool).unwrap(), Value::bool(true));
        assert_eq!(string_to("abc", TypeKind::Int64).unwrap_err().to_string(), "Bad int64 value: abc");
        assert!(string_to("--1", TypeKind::Int64).is_err());
        assert!(string_to("3000000000", TypeKind::Int32).is_err());
    }

    #[test]
    fn bad_literals_are_truncated_in_messages() {
        let long = "9".repeat(200) + "x";
        let msg = string_to(&long, TypeKind::Int64).unwrap_err().to_string();
        assert!(msg.len() < 100);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn decimals_round_and_render() {
        let v = string_to("1.1234567895", TypeKind::Numeric).unwrap();
        assert_eq!(v, Value::numeric(Decimal::from_str("1.123456790").unwrap()));
        let s = decimal_to(Decimal::from_str("2.500").unwrap(), TypeKind::Numeric, TypeKind::String).unwrap();
        assert_eq!(s, Value::string("2.5"));
        assert_eq!(decimal_to(Decimal::from_str("2.5").unwrap(), TypeKind::Numeric, TypeKind::Int64).unwrap(), Value::int64(3));
    }

    #[test]
    fn floats_render_locale_independently() {
        assert_eq!(render_double(f64::NEG_INFINITY), "-inf");
        assert_eq!(render_double(1.5), "1.5");
        assert_eq!(render_float(0.1), "0.1");
        assert_eq!(float_to(1.0, TypeKind::Double, TypeKind::String).unwrap(), Value::string("1"));
    }

    #[test]
    fn invalid_utf8_bytes_fail() {
        assert_eq!(bytes_to_string(b"abc").unwrap(), Value::string("abc"));
        assert_eq!(bytes_to_string(&[0xff, 0xfe]).unwrap_err().to_string(), "Invalid cast of bytes to UTF8 string");
    }
}
