//! SCPI value formatting and reply parsing.
//!
//! The instrument-facing side of the attribute engine: turning typed values
//! into the exact textual form the firmware accepts, and turning reply text
//! back into typed values. The formatting rules are rigid: floats always
//! carry twelve fractional digits and booleans are always `ON`/`OFF`,
//! regardless of input magnitude or reply shape.

use crate::attribute::Quoting;
use crate::error::{DriverError, DriverResult};

/// Fractional digits emitted for every float value on the wire.
pub const REAL_DIGITS: usize = 12;

/// Format a float with the fixed wire precision, e.g. `1.0` →
/// `"1.000000000000"`.
pub fn format_real(value: f64) -> String {
    format!("{:.*}", REAL_DIGITS, value)
}

/// Format a signed integer as plain decimal.
pub fn format_int(value: i64) -> String {
    value.to_string()
}

/// Format a boolean as the `ON`/`OFF` token pair.
pub fn format_bool(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

/// Format an integer as an IEEE-488.2 hexadecimal numeric, e.g. `#H3A`.
pub fn format_block_hex(value: i64) -> String {
    format!("#H{value:X}")
}

/// Format an integer as an IEEE-488.2 binary numeric, e.g. `#B1010`.
pub fn format_block_binary(value: i64) -> String {
    format!("#B{value:b}")
}

/// Apply the attribute's quoting convention to a string value.
pub fn quote(text: &str, quoting: Quoting) -> String {
    match quoting {
        Quoting::None => text.to_string(),
        Quoting::Single => format!("'{text}'"),
        Quoting::Double => format!("\"{text}\""),
    }
}

/// Parse an integer reply. Falls back through float syntax because some
/// firmware revisions answer integer queries as `"100000.0"`.
pub fn parse_int(raw: &str) -> DriverResult<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }
    trimmed
        .parse::<f64>()
        .map(|v| v.round() as i64)
        .map_err(|_| DriverError::ResponseParse {
            response: trimmed.to_string(),
            detail: "expected an integer".to_string(),
        })
}

/// Parse a float reply (plain or scientific notation).
pub fn parse_real(raw: &str) -> DriverResult<f64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| DriverError::ResponseParse {
            response: trimmed.to_string(),
            detail: "expected a number".to_string(),
        })
}

/// Parse a float reply that may carry a trailing unit, e.g. `"10.0 MHZ"`.
pub fn parse_real_with_unit(raw: &str) -> DriverResult<f64> {
    let trimmed = raw.trim();
    let numeric_end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(trimmed.len());
    parse_real(&trimmed[..numeric_end])
}

/// Parse a boolean reply: `ON`/`OFF` tokens, with bare `0`/`1` (or any
/// integer) as the numeric fallback.
pub fn parse_bool(raw: &str) -> DriverResult<bool> {
    let trimmed = raw.trim();
    match trimmed.to_ascii_uppercase().as_str() {
        "ON" => Ok(true),
        "OFF" => Ok(false),
        other => match other.parse::<i64>() {
            Ok(value) => Ok(value != 0),
            Err(_) => Err(DriverError::ResponseParse {
                response: trimmed.to_string(),
                detail: "expected ON/OFF or 0/1".to_string(),
            }),
        },
    }
}

/// Strip one layer of single or double quotes from a string reply.
pub fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

/// Parse a comma-separated list of floats, as returned by trace-data and
/// result-array queries in ASCII form.
pub fn parse_csv_reals(raw: &str) -> DriverResult<Vec<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed.split(',').map(parse_real).collect()
}

/// Parse an IEEE-488.2 definite-length block of little-endian `REAL,32`
/// samples, e.g. `#42000<2000 payload bytes>`.
pub fn parse_block_f32(raw: &[u8]) -> DriverResult<Vec<f64>> {
    let bad = |detail: &str| DriverError::ResponseParse {
        response: String::from_utf8_lossy(&raw[..raw.len().min(32)]).into_owned(),
        detail: detail.to_string(),
    };

    let start = raw
        .iter()
        .position(|&b| b == b'#')
        .ok_or_else(|| bad("missing '#' block header"))?;
    let digits = *raw.get(start + 1).ok_or_else(|| bad("truncated block header"))?;
    if !digits.is_ascii_digit() || digits == b'0' {
        return Err(bad("invalid block header length digit"));
    }
    let ndigits = (digits - b'0') as usize;
    let len_end = start + 2 + ndigits;
    let len_str = raw
        .get(start + 2..len_end)
        .ok_or_else(|| bad("truncated block length field"))?;
    let payload_len: usize = std::str::from_utf8(len_str)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| bad("non-numeric block length field"))?;
    let payload = raw
        .get(len_end..len_end + payload_len)
        .ok_or_else(|| bad("block payload shorter than declared"))?;
    if payload.len() % 4 != 0 {
        return Err(bad("block payload is not a whole number of f32 samples"));
    }

    Ok(payload
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_formatting_is_magnitude_invariant() {
        assert_eq!(format_real(1.0), "1.000000000000");
        assert_eq!(format_real(-0.5), "-0.500000000000");
        assert_eq!(format_real(13_250_000_000.0), "13250000000.000000000000");
    }

    #[test]
    fn bool_formatting_uses_on_off_tokens() {
        assert_eq!(format_bool(true), "ON");
        assert_eq!(format_bool(false), "OFF");
    }

    #[test]
    fn block_numerics() {
        assert_eq!(format_block_hex(0x3A), "#H3A");
        assert_eq!(format_block_binary(0b1010), "#B1010");
    }

    #[test]
    fn quoting_modes() {
        assert_eq!(quote("Ch1", Quoting::None), "Ch1");
        assert_eq!(quote("Ch1", Quoting::Single), "'Ch1'");
        assert_eq!(quote("Ch1", Quoting::Double), "\"Ch1\"");
    }

    #[test]
    fn bool_parsing_accepts_tokens_and_numerics() {
        assert!(parse_bool("ON").unwrap());
        assert!(parse_bool(" on\n").unwrap());
        assert!(!parse_bool("OFF").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("garbage").is_err());
    }

    #[test]
    fn int_parsing_accepts_float_syntax() {
        assert_eq!(parse_int("42").unwrap(), 42);
        assert_eq!(parse_int(" 100000.0 ").unwrap(), 100_000);
        assert!(parse_int("forty-two").is_err());
    }

    #[test]
    fn real_parsing_accepts_scientific_notation() {
        assert!((parse_real("1.325e10").unwrap() - 1.325e10).abs() < 1.0);
        assert!((parse_real_with_unit("10.5 MHZ").unwrap() - 10.5).abs() < 1e-12);
    }

    #[test]
    fn quote_stripping() {
        assert_eq!(strip_quotes("\"Rohde\""), "Rohde");
        assert_eq!(strip_quotes("'Rohde'"), "Rohde");
        assert_eq!(strip_quotes("Rohde"), "Rohde");
        assert_eq!(strip_quotes("\""), "\"");
    }

    #[test]
    fn csv_parsing() {
        let values = parse_csv_reals("-10.5,0.25,3.0e1").unwrap();
        assert_eq!(values.len(), 3);
        assert!((values[2] - 30.0).abs() < 1e-12);
        assert!(parse_csv_reals("").unwrap().is_empty());
        assert!(parse_csv_reals("1.0,x").is_err());
    }

    #[test]
    fn definite_block_parsing() {
        let mut raw = b"#18".to_vec();
        raw.extend_from_slice(&1.5f32.to_le_bytes());
        raw.extend_from_slice(&(-2.0f32).to_le_bytes());
        let values = parse_block_f32(&raw).unwrap();
        assert_eq!(values, vec![1.5, -2.0]);
    }

    #[test]
    fn definite_block_rejects_short_payload() {
        let raw = b"#18ABCD".to_vec();
        assert!(parse_block_f32(&raw).is_err());
    }
}
