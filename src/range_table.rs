//! Range tables: the translation layer between driver-level numeric
//! enumerations and the instrument's accepted token/value domain.
//!
//! The public API exposes small integers and floats for language ergonomics;
//! the firmware expects symbolic tokens (`"POS"`, `"BW10_00"`) for many of
//! the same settings. A [`RangeTable`] records that mapping per attribute.
//! Different instrument families support different token vocabularies for
//! logically equivalent settings, so an attribute carries a [`RangeSpec`]
//! that can pick a table variant from the `*IDN?` model string.

use crate::command::format_real;
use crate::error::{DriverError, DriverResult};

/// Floor applied to float comparison precision so a table never requires
/// bit-exact equality.
pub const PRECISION_FLOOR: f64 = 1e-9;

/// Sentinel accepted by continuous ranges in place of a numeric value.
pub const MIN_TOKEN: &str = "MIN";
/// Sentinel accepted by continuous ranges in place of a numeric value.
pub const MAX_TOKEN: &str = "MAX";

/// One legal value of a discrete range table and its wire token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeEntry {
    /// Driver-level numeric value.
    pub value: f64,
    /// Token the instrument expects and returns for this value.
    pub command: &'static str,
}

/// Shorthand constructor used by the static attribute tables.
pub const fn entry(value: f64, command: &'static str) -> RangeEntry {
    RangeEntry { value, command }
}

/// Legal-value domain of one attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeTable {
    /// Enumerated domain: each legal value maps to a command token.
    Discrete(&'static [RangeEntry]),
    /// Continuous domain validated against inclusive bounds.
    Continuous {
        /// Smallest accepted value.
        min: f64,
        /// Largest accepted value.
        max: f64,
    },
}

impl RangeTable {
    /// Write-direction mapping: turn a target value into the outgoing
    /// command text.
    ///
    /// Discrete tables scan entries in order and take the first whose value
    /// matches within `precision` (floored at [`PRECISION_FLOOR`]).
    /// Continuous tables validate the bounds and format numerically;
    /// infinities select the `MIN`/`MAX` sentinels.
    pub fn write_token(
        &self,
        attribute: &'static str,
        target: f64,
        precision: f64,
    ) -> DriverResult<String> {
        let tolerance = precision.max(PRECISION_FLOOR);
        match self {
            RangeTable::Discrete(entries) => entries
                .iter()
                .find(|e| (e.value - target).abs() <= tolerance)
                .map(|e| e.command.to_string())
                .ok_or_else(|| DriverError::InvalidValue {
                    attribute,
                    detail: format!("{target} is not a legal enumeration value"),
                }),
            RangeTable::Continuous { min, max } => {
                if target == f64::NEG_INFINITY {
                    return Ok(MIN_TOKEN.to_string());
                }
                if target == f64::INFINITY {
                    return Ok(MAX_TOKEN.to_string());
                }
                if target < *min || target > *max {
                    return Err(DriverError::InvalidValue {
                        attribute,
                        detail: format!("{target} outside [{min}, {max}]"),
                    });
                }
                Ok(format_real(target))
            }
        }
    }

    /// Read-direction mapping: turn a reply token back into the numeric
    /// value.
    ///
    /// `prefix_match` enables the compatibility mode for firmware that
    /// truncates long tokens in responses: a reply that is a non-empty
    /// prefix of a stored token also matches.
    pub fn read_value(
        &self,
        attribute: &'static str,
        token: &str,
        prefix_match: bool,
    ) -> DriverResult<f64> {
        let token = token.trim();
        match self {
            RangeTable::Discrete(entries) => {
                if let Some(e) = entries.iter().find(|e| e.command == token) {
                    return Ok(e.value);
                }
                if prefix_match && !token.is_empty() {
                    if let Some(e) = entries.iter().find(|e| e.command.starts_with(token)) {
                        return Ok(e.value);
                    }
                }
                Err(DriverError::InvalidValue {
                    attribute,
                    detail: format!("response token '{token}' not in range table"),
                })
            }
            RangeTable::Continuous { .. } => crate::command::parse_real(token),
        }
    }
}

/// How an attribute selects its range table, if any.
#[derive(Debug, Clone, Copy)]
pub enum RangeSpec {
    /// No range table: values are formatted directly.
    None,
    /// One table for every instrument model.
    Fixed(&'static RangeTable),
    /// Model-dependent table selection keyed by `*IDN?` model substrings.
    PerModel {
        /// `(model substring, table)` pairs scanned in order.
        variants: &'static [(&'static str, &'static RangeTable)],
        /// Table used when no variant substring matches.
        default: &'static RangeTable,
    },
}

impl RangeSpec {
    /// Pick the table that applies to the given model string. Pure function
    /// of the identity string.
    pub fn select(&self, model: &str) -> Option<&'static RangeTable> {
        match self {
            RangeSpec::None => None,
            RangeSpec::Fixed(table) => Some(table),
            RangeSpec::PerModel { variants, default } => Some(
                variants
                    .iter()
                    .find(|(substring, _)| model.contains(substring))
                    .map(|(_, table)| *table)
                    .unwrap_or(default),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLOPES: &[RangeEntry] = &[entry(0.0, "POS"), entry(1.0, "NEG")];
    const SLOPE_TABLE: RangeTable = RangeTable::Discrete(SLOPES);

    #[test]
    fn discrete_write_maps_value_to_token() {
        assert_eq!(SLOPE_TABLE.write_token("slope", 0.0, 0.0).unwrap(), "POS");
        assert_eq!(SLOPE_TABLE.write_token("slope", 1.0, 0.0).unwrap(), "NEG");
    }

    #[test]
    fn discrete_write_rejects_unknown_value() {
        let err = SLOPE_TABLE.write_token("slope", 2.0, 0.0).unwrap_err();
        assert!(matches!(err, DriverError::InvalidValue { .. }));
    }

    #[test]
    fn discrete_read_inverts_write() {
        for entry in SLOPES {
            let token = SLOPE_TABLE.write_token("slope", entry.value, 0.0).unwrap();
            let value = SLOPE_TABLE.read_value("slope", &token, false).unwrap();
            assert!((value - entry.value).abs() < PRECISION_FLOOR);
        }
    }

    #[test]
    fn float_tolerance_has_a_floor() {
        // Precision 0.0 still matches values within the floor.
        static ENTRIES: [RangeEntry; 1] = [entry(0.1, "DEC")];
        let table = RangeTable::Discrete(&ENTRIES);
        assert_eq!(
            table.write_token("x", 0.1 + 1e-12, 0.0).unwrap(),
            "DEC"
        );
    }

    #[test]
    fn explicit_precision_widens_the_match() {
        static ENTRIES: [RangeEntry; 1] = [entry(10.0, "TEN")];
        let table = RangeTable::Discrete(&ENTRIES);
        assert!(table.write_token("x", 10.4, 0.0).is_err());
        assert_eq!(table.write_token("x", 10.4, 0.5).unwrap(), "TEN");
    }

    #[test]
    fn prefix_match_accepts_truncated_reply() {
        static ENTRIES: [RangeEntry; 1] = [entry(3.0, "BW10_00")];
        let table = RangeTable::Discrete(&ENTRIES);
        assert!(table.read_value("bw", "BW10", false).is_err());
        let value = table.read_value("bw", "BW10", true).unwrap();
        assert!((value - 3.0).abs() < PRECISION_FLOOR);
    }

    #[test]
    fn continuous_validates_bounds_and_sentinels() {
        let table = RangeTable::Continuous { min: 0.0, max: 79.0 };
        assert_eq!(table.write_token("att", 10.0, 0.0).unwrap(), "10.000000000000");
        assert_eq!(
            table.write_token("att", f64::NEG_INFINITY, 0.0).unwrap(),
            "MIN"
        );
        assert_eq!(table.write_token("att", f64::INFINITY, 0.0).unwrap(), "MAX");
        assert!(table.write_token("att", 80.0, 0.0).is_err());
        assert!(table.write_token("att", -0.5, 0.0).is_err());
    }

    #[test]
    fn per_model_selection_is_a_pure_function_of_identity() {
        static BASE: RangeTable = RangeTable::Discrete(&[entry(0.0, "IMM")]);
        static FSV: RangeTable = RangeTable::Discrete(&[entry(0.0, "IMM2")]);
        static VARIANTS: [(&str, &RangeTable); 1] = [("FSV", &FSV)];
        let spec = RangeSpec::PerModel {
            variants: &VARIANTS,
            default: &BASE,
        };

        let cases = [
            ("FSV-30", "IMM2"),
            ("FSVA-13", "IMM2"),
            ("FSW-26", "IMM"),
            ("FPL1003", "IMM"),
            ("", "IMM"),
        ];
        for (model, expected) in cases {
            let table = spec.select(model).unwrap();
            assert_eq!(
                table.write_token("t", 0.0, 0.0).unwrap(),
                expected,
                "model {model}"
            );
        }
    }

    #[test]
    fn range_spec_none_selects_nothing() {
        assert!(RangeSpec::None.select("FSW-26").is_none());
    }
}
