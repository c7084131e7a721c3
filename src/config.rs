//! Session configuration.
//!
//! Configuration is deliberately small: the VISA resource to open, two
//! timeouts, the command line terminator and the status-check toggle. It can
//! be built in code, or loaded from a TOML file layered with
//! `RSSPECAN_`-prefixed environment variables via the `config` crate.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::DriverResult;

/// Driver session settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// VISA resource string, e.g. "TCPIP0::192.168.1.100::INSTR".
    pub resource: String,

    /// I/O timeout for ordinary commands, in milliseconds.
    pub timeout_ms: u64,

    /// Timeout for OPC-synchronized long operations, in milliseconds.
    pub opc_timeout_ms: u64,

    /// Line terminator appended by terminator-aware transports.
    pub line_terminator: String,

    /// Poll `SYST:ERR?` after configure operations and surface queue
    /// entries as errors.
    pub check_instrument_status: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resource: String::new(),
            timeout_ms: 5000,
            opc_timeout_ms: 30_000,
            line_terminator: "\n".to_string(),
            check_instrument_status: true,
        }
    }
}

impl SessionConfig {
    /// I/O timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// OPC timeout as a `Duration`.
    pub fn opc_timeout(&self) -> Duration {
        Duration::from_millis(self.opc_timeout_ms)
    }

    /// Load settings from a TOML file, with `RSSPECAN_`-prefixed
    /// environment variables taking precedence over file values.
    pub fn load(path: &Path) -> DriverResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("RSSPECAN"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.opc_timeout(), Duration::from_secs(30));
        assert!(config.check_instrument_status);
        assert_eq!(config.line_terminator, "\n");
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "resource = \"GPIB0::20::INSTR\"\ntimeout_ms = 2000\ncheck_instrument_status = false"
        )
        .unwrap();

        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.resource, "GPIB0::20::INSTR");
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert!(!config.check_instrument_status);
        // Unset keys keep their defaults.
        assert_eq!(config.opc_timeout_ms, 30_000);
    }
}
