//! Driver error types.
//!
//! This module defines the primary error type, `DriverError`, for the whole
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to report the different ways a driver call can fail, from
//! caller usage errors caught before any I/O to errors the instrument itself
//! reports through its SCPI error queue.
//!
//! ## Error classes
//!
//! - **Caller usage**: `InvalidParameter` carries the 1-based position and
//!   name of the offending argument; it is always raised before a command is
//!   put on the wire.
//! - **Attribute engine**: `UnknownAttribute`, `InvalidType`,
//!   `InvalidValue`, `InvalidRepeatedCapability`, and the access-mode
//!   violations `AttributeNotReadable`/`AttributeNotWritable`.
//! - **Instrument capability**: `OptionNotInstalled` and `ModelNotSupported`
//!   are raised from the identity/option guards before the guarded command
//!   is issued.
//! - **Transport**: `Io` and `Transport` propagate I/O-layer failures
//!   verbatim; there is no retry policy in this crate.
//! - **Instrument-reported**: `Instrument` surfaces an entry drained from
//!   the instrument's `SYST:ERR?` queue after a command that can fail
//!   asynchronously in firmware.

use thiserror::Error;

use crate::attribute::{AttrId, DataType};

/// Convenience alias for results using the driver error type.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Unified error type for every fallible driver operation.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A caller-supplied argument is out of its documented range. Reported
    /// with the argument's 1-based position and name, before any I/O.
    #[error("invalid value for parameter {position} ({name})")]
    InvalidParameter {
        /// 1-based position of the offending parameter.
        position: u8,
        /// Name of the offending parameter.
        name: &'static str,
    },

    /// A value has no entry in the attribute's range table, or falls outside
    /// a continuous range, in either the write or the read direction.
    #[error("value not accepted for attribute {attribute}: {detail}")]
    InvalidValue {
        /// Diagnostic name of the attribute.
        attribute: &'static str,
        /// What was rejected and why.
        detail: String,
    },

    /// A command template requires instance qualifiers that were missing,
    /// blank, or too few for its placeholders.
    #[error("invalid repeated capability: {0}")]
    InvalidRepeatedCapability(String),

    /// An attribute was invoked with a data type it does not declare.
    #[error("attribute {attribute} is typed {expected}, not {requested}")]
    InvalidType {
        /// Diagnostic name of the attribute.
        attribute: &'static str,
        /// The data type the attribute declares.
        expected: DataType,
        /// The data type the caller supplied or requested.
        requested: DataType,
    },

    /// The attribute ID is not present in the registry.
    #[error("unknown attribute id {0}")]
    UnknownAttribute(AttrId),

    /// The attribute has no query form (write-only or event attribute).
    #[error("attribute {attribute} cannot be read")]
    AttributeNotReadable {
        /// Diagnostic name of the attribute.
        attribute: &'static str,
    },

    /// The attribute has no command form (read-only attribute).
    #[error("attribute {attribute} cannot be written")]
    AttributeNotWritable {
        /// Diagnostic name of the attribute.
        attribute: &'static str,
    },

    /// The instrument does not list a required firmware option in `*OPT?`.
    #[error("instrument option {required} is not installed")]
    OptionNotInstalled {
        /// The option designator(s) the operation needs, e.g. "K91".
        required: &'static str,
    },

    /// The connected instrument model is outside the supported family.
    #[error("instrument model {model} is not supported here (requires {required})")]
    ModelNotSupported {
        /// Model string reported by `*IDN?`.
        model: String,
        /// Human-readable description of the supported family.
        required: &'static str,
    },

    /// Plain I/O failure from the transport layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-specific failure (VISA status, mock misconfiguration, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// An error drained from the instrument's SCPI error queue.
    #[error("instrument reported error {code}: {message}")]
    Instrument {
        /// SCPI error code (negative for standard errors).
        code: i32,
        /// Error message text from the queue entry.
        message: String,
    },

    /// A reply did not parse as the declared data type.
    #[error("failed to parse instrument response '{response}': {detail}")]
    ResponseParse {
        /// The raw reply, trimmed.
        response: String,
        /// What the parser expected.
        detail: String,
    },

    /// Configuration file or environment loading failed.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Operation on a session whose transport has been closed.
    #[error("session is not connected")]
    NotConnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_names_position() {
        let err = DriverError::InvalidParameter {
            position: 3,
            name: "limit",
        };
        assert_eq!(err.to_string(), "invalid value for parameter 3 (limit)");
    }

    #[test]
    fn instrument_error_display() {
        let err = DriverError::Instrument {
            code: -222,
            message: "Data out of range".to_string(),
        };
        assert!(err.to_string().contains("-222"));
        assert!(err.to_string().contains("Data out of range"));
    }
}
