//! Instrument session: identity, serialization, status checking.
//!
//! A [`Session`] owns one [`Transport`] behind a `tokio::sync::Mutex`.
//! Every driver operation locks it for the duration of one complete write
//! or write+read, which is exactly the "one attribute operation in flight
//! per session" discipline the instruments require; the guard is released on
//! every exit path by scope.
//!
//! Opening a session performs the identification handshake (`*IDN?`,
//! `*OPT?`) so model- and option-gated functionality can be checked locally,
//! before a guarded command ever reaches the wire.

use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};
use prse::try_parse;

use crate::config::SessionConfig;
use crate::error::{DriverError, DriverResult};
use crate::transport::Transport;

/// Parsed `*IDN?` identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Manufacturer field, e.g. "Rohde&Schwarz".
    pub manufacturer: String,
    /// Model field, e.g. "FSW-26".
    pub model: String,
    /// Serial number field.
    pub serial: String,
    /// Firmware version field.
    pub firmware: String,
}

impl Identity {
    /// Parse the conventional four-field `*IDN?` reply.
    pub fn parse(raw: &str) -> DriverResult<Self> {
        let trimmed = raw.trim();
        let (manufacturer, model, serial, firmware): (String, String, String, String) =
            try_parse!(trimmed, "{},{},{},{}").map_err(|e| DriverError::ResponseParse {
                response: trimmed.to_string(),
                detail: format!("expected a 4-field *IDN? reply: {e}"),
            })?;
        Ok(Self {
            manufacturer: manufacturer.trim().to_string(),
            model: model.trim().to_string(),
            serial: serial.trim().to_string(),
            firmware: firmware.trim().to_string(),
        })
    }
}

/// Parse one `SYST:ERR?` queue entry, `code,"message"` (quotes optional on
/// some firmware).
fn parse_error_entry(raw: &str) -> DriverResult<(i32, String)> {
    let trimmed = raw.trim();
    if let Ok((code, message)) = try_parse!(trimmed, "{},\"{}\"") {
        return Ok((code, message));
    }
    try_parse!(trimmed, "{},{}").map_err(|e| DriverError::ResponseParse {
        response: trimmed.to_string(),
        detail: format!("expected an error-queue entry: {e}"),
    })
}

/// Upper bound on entries drained per status check, so a firmware that keeps
/// refilling its queue cannot wedge the driver.
const ERROR_QUEUE_DRAIN_LIMIT: usize = 64;

/// One locked instrument connection.
pub struct Session {
    transport: tokio::sync::Mutex<Box<dyn Transport>>,
    identity: Identity,
    options: Vec<String>,
    timeout: Duration,
    opc_timeout: std::sync::Mutex<Duration>,
    check_instrument_status: bool,
}

impl Session {
    /// Open a session over the given transport: set the I/O timeout, query
    /// identity and installed options, and log both.
    pub async fn open(
        mut transport: Box<dyn Transport>,
        config: &SessionConfig,
    ) -> DriverResult<Self> {
        transport.set_timeout(config.timeout()).await?;

        let idn = transport.query("*IDN?").await?;
        let identity = Identity::parse(&idn)?;

        let opt = transport.query("*OPT?").await?;
        let options: Vec<String> = opt
            .trim()
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty() && *o != "0")
            .map(str::to_string)
            .collect();

        info!(
            "connected to {} {} (serial {}, firmware {}), options [{}]",
            identity.manufacturer,
            identity.model,
            identity.serial,
            identity.firmware,
            options.join(",")
        );

        Ok(Self {
            transport: tokio::sync::Mutex::new(transport),
            identity,
            options,
            timeout: config.timeout(),
            opc_timeout: std::sync::Mutex::new(config.opc_timeout()),
            check_instrument_status: config.check_instrument_status,
        })
    }

    /// Identification reported by the instrument at open time.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Model string from `*IDN?` (drives model-dependent range tables).
    pub fn model(&self) -> &str {
        &self.identity.model
    }

    /// Installed firmware options from `*OPT?`.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Whether a firmware option is installed.
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Fail with `OptionNotInstalled` unless the option is present.
    pub fn require_option(&self, required: &'static str) -> DriverResult<()> {
        if self.has_option(required) {
            Ok(())
        } else {
            Err(DriverError::OptionNotInstalled { required })
        }
    }

    /// Fail unless at least one of `accepted` is installed. `required` is
    /// the designator shown in the error, e.g. "K100/K104".
    pub fn require_any_option(
        &self,
        required: &'static str,
        accepted: &[&str],
    ) -> DriverResult<()> {
        if accepted.iter().any(|o| self.has_option(o)) {
            Ok(())
        } else {
            Err(DriverError::OptionNotInstalled { required })
        }
    }

    /// Fail with `ModelNotSupported` unless the model string contains one of
    /// the family substrings.
    pub fn require_model(&self, required: &'static str, families: &[&str]) -> DriverResult<()> {
        if families.iter().any(|f| self.identity.model.contains(f)) {
            Ok(())
        } else {
            Err(DriverError::ModelNotSupported {
                model: self.identity.model.clone(),
                required,
            })
        }
    }

    /// Send a command. Holds the transport lock for the single exchange.
    pub async fn write(&self, cmd: &str) -> DriverResult<()> {
        let mut transport = self.transport.lock().await;
        debug!("-> {cmd}");
        transport.write(cmd).await
    }

    /// Send a query and return the reply. One lock, one exchange.
    pub async fn query(&self, cmd: &str) -> DriverResult<String> {
        let mut transport = self.transport.lock().await;
        debug!("-> {cmd}");
        let reply = transport.query(cmd).await?;
        debug!("<- {}", reply.trim_end());
        Ok(reply)
    }

    /// Send a query and return the raw reply bytes (binary block transfers).
    pub async fn query_binary(&self, cmd: &str) -> DriverResult<Vec<u8>> {
        let mut transport = self.transport.lock().await;
        debug!("-> {cmd}");
        let reply = transport.query_binary(cmd).await?;
        debug!("<- {} bytes", reply.len());
        Ok(reply)
    }

    /// Reset the instrument (`*RST`) and wait for completion.
    pub async fn reset(&self) -> DriverResult<()> {
        self.write("*RST").await?;
        self.wait_for_opc().await
    }

    /// Block until the instrument reports all pending operations complete
    /// (`*OPC?`), under the OPC timeout rather than the I/O timeout.
    pub async fn wait_for_opc(&self) -> DriverResult<()> {
        let opc = self.opc_timeout();
        let mut transport = self.transport.lock().await;
        transport.set_timeout(opc).await?;
        debug!("-> *OPC?");
        let result = transport.query("*OPC?").await;
        let restore = transport.set_timeout(self.timeout).await;
        let reply = result?;
        restore?;
        if reply.trim() == "1" {
            Ok(())
        } else {
            Err(DriverError::ResponseParse {
                response: reply.trim().to_string(),
                detail: "expected '1' from *OPC?".to_string(),
            })
        }
    }

    /// Current OPC timeout for long-running operations.
    pub fn opc_timeout(&self) -> Duration {
        match self.opc_timeout.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Set the OPC timeout, returning the previous value so callers can
    /// restore it after a long-running operation.
    pub fn set_opc_timeout(&self, timeout: Duration) -> Duration {
        match self.opc_timeout.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, timeout),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), timeout),
        }
    }

    /// Run an operation under a temporarily raised OPC timeout; the previous
    /// timeout is restored whether or not the operation succeeds.
    pub async fn with_opc_timeout<T>(
        &self,
        timeout: Duration,
        op: impl Future<Output = DriverResult<T>>,
    ) -> DriverResult<T> {
        let previous = self.set_opc_timeout(timeout);
        let result = op.await;
        self.set_opc_timeout(previous);
        result
    }

    /// Post-command status check: drain the instrument's SCPI error queue
    /// and surface the first entry, if any. A no-op when disabled in the
    /// session configuration.
    pub async fn check_status(&self) -> DriverResult<()> {
        if !self.check_instrument_status {
            return Ok(());
        }
        self.drain_error_queue().await
    }

    /// Unconditionally drain `SYST:ERR?` until the queue reports empty.
    /// Returns the first drained entry as `DriverError::Instrument`.
    pub async fn drain_error_queue(&self) -> DriverResult<()> {
        let mut first: Option<(i32, String)> = None;
        for _ in 0..ERROR_QUEUE_DRAIN_LIMIT {
            let raw = self.query("SYST:ERR?").await?;
            let (code, message) = parse_error_entry(&raw)?;
            if code == 0 {
                break;
            }
            warn!("instrument error {code}: {message}");
            if first.is_none() {
                first = Some((code, message));
            }
        }
        match first {
            Some((code, message)) => Err(DriverError::Instrument { code, message }),
            None => Ok(()),
        }
    }

    /// Close the underlying transport. Further operations fail.
    pub async fn close(&self) -> DriverResult<()> {
        self.transport.lock().await.close().await
    }
}
