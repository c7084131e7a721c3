//! Instrument transport abstraction.
//!
//! The driver is transport-agnostic: everything above this module speaks
//! plain SCPI strings and lets a [`Transport`] implementation move them to
//! and from the instrument. Two implementations ship with the crate:
//!
//! - [`MockTransport`]: always compiled; records every command it receives
//!   and serves scripted replies. Used by the crate's own tests and usable
//!   by downstream test suites.
//! - `VisaTransport`: real hardware over the VISA runtime (GPIB, USB-TMC,
//!   LXI/TCPIP), compiled behind the `instrument_visa` feature. VISA I/O is
//!   synchronous, so every call hops onto a blocking thread.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DriverError, DriverResult};

/// Byte-in, byte-out instrument connection.
///
/// Implementations must deliver each `write`/`query` as one atomic exchange;
/// serialization across calls is the session's job, not the transport's.
#[async_trait]
pub trait Transport: Send {
    /// Send a command, no reply expected.
    async fn write(&mut self, cmd: &str) -> DriverResult<()>;

    /// Send a query and read one reply line.
    async fn query(&mut self, cmd: &str) -> DriverResult<String>;

    /// Send a query and read a raw (possibly binary block) reply.
    async fn query_binary(&mut self, cmd: &str) -> DriverResult<Vec<u8>>;

    /// Set the I/O timeout applied to subsequent calls.
    async fn set_timeout(&mut self, timeout: Duration) -> DriverResult<()>;

    /// Close the connection. Further calls fail with `NotConnected`.
    async fn close(&mut self) -> DriverResult<()>;
}

// =============================================================================
// Mock transport
// =============================================================================

/// Shared handle to the list of commands a [`MockTransport`] has received.
///
/// Clone it out of the mock before the transport is moved into a session.
#[derive(Clone, Debug, Default)]
pub struct CommandLog(Arc<Mutex<Vec<String>>>);

impl CommandLog {
    /// All commands received so far, in order.
    pub fn snapshot(&self) -> Vec<String> {
        match self.0.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drain the log, returning the commands received since the last take.
    pub fn take(&self) -> Vec<String> {
        match self.0.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    fn push(&self, cmd: &str) {
        match self.0.lock() {
            Ok(mut guard) => guard.push(cmd.to_string()),
            Err(poisoned) => poisoned.into_inner().push(cmd.to_string()),
        }
    }
}

/// Scripted in-memory transport for tests.
///
/// Replies are resolved in this order: an exact match in the canned-reply
/// map, then the FIFO queue of pushed replies, then a generic `"0"`. The
/// defaults answer the session-open handshake (`*IDN?`, `*OPT?`) and the
/// status poll (`SYST:ERR?`) so a mock-backed session opens cleanly.
pub struct MockTransport {
    log: CommandLog,
    canned: HashMap<String, String>,
    queued: Arc<Mutex<VecDeque<String>>>,
    timeout: Duration,
    closed: bool,
}

/// Identity the default mock reports for `*IDN?`.
pub const MOCK_IDENTITY: &str = "Rohde&Schwarz,FSW-26,1331.5003K26/101489,3.20";

/// Options the default mock reports for `*OPT?`.
pub const MOCK_OPTIONS: &str = "B25,K6,K82,K84,K91,K100,K104";

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock with the default FSW-26 identity and option set.
    pub fn new() -> Self {
        let mut canned = HashMap::new();
        canned.insert("*IDN?".to_string(), MOCK_IDENTITY.to_string());
        canned.insert("*OPT?".to_string(), MOCK_OPTIONS.to_string());
        canned.insert("*OPC?".to_string(), "1".to_string());
        canned.insert("SYST:ERR?".to_string(), "0,\"No error\"".to_string());
        Self {
            log: CommandLog::default(),
            canned,
            queued: Arc::new(Mutex::new(VecDeque::new())),
            timeout: Duration::from_secs(5),
            closed: false,
        }
    }

    /// Override the `*IDN?` reply, e.g. to simulate another model family.
    pub fn with_identity(self, identity: &str) -> Self {
        self.with_reply("*IDN?", identity)
    }

    /// Override the `*OPT?` reply.
    pub fn with_options(self, options: &str) -> Self {
        self.with_reply("*OPT?", options)
    }

    /// Set the canned reply for an exact query string.
    pub fn with_reply(mut self, query: &str, reply: &str) -> Self {
        self.canned.insert(query.to_string(), reply.to_string());
        self
    }

    /// Queue a reply served (FIFO) to the next query without a canned match.
    pub fn with_queued_reply(self, reply: &str) -> Self {
        self.reply_queue().push(reply);
        self
    }

    /// Handle for recording the commands this mock receives.
    pub fn command_log(&self) -> CommandLog {
        self.log.clone()
    }

    /// The I/O timeout most recently applied via `set_timeout`.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Handle for queueing replies after the mock has been moved into a
    /// session.
    pub fn reply_queue(&self) -> ReplyQueue {
        ReplyQueue(self.queued.clone())
    }

    fn reply_for(&self, cmd: &str) -> String {
        if let Some(reply) = self.canned.get(cmd) {
            return reply.clone();
        }
        let queued = match self.queued.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        queued.unwrap_or_else(|| "0".to_string())
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed {
            Err(DriverError::NotConnected)
        } else {
            Ok(())
        }
    }
}

/// Shared handle to a [`MockTransport`]'s FIFO reply queue.
#[derive(Clone)]
pub struct ReplyQueue(Arc<Mutex<VecDeque<String>>>);

impl ReplyQueue {
    /// Append a reply to the back of the queue.
    pub fn push(&self, reply: &str) {
        match self.0.lock() {
            Ok(mut guard) => guard.push_back(reply.to_string()),
            Err(poisoned) => poisoned.into_inner().push_back(reply.to_string()),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&mut self, cmd: &str) -> DriverResult<()> {
        self.ensure_open()?;
        self.log.push(cmd);
        Ok(())
    }

    async fn query(&mut self, cmd: &str) -> DriverResult<String> {
        self.ensure_open()?;
        self.log.push(cmd);
        Ok(self.reply_for(cmd))
    }

    async fn query_binary(&mut self, cmd: &str) -> DriverResult<Vec<u8>> {
        self.ensure_open()?;
        self.log.push(cmd);
        Ok(self.reply_for(cmd).into_bytes())
    }

    async fn set_timeout(&mut self, timeout: Duration) -> DriverResult<()> {
        self.ensure_open()?;
        self.timeout = timeout;
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        Ok(())
    }
}

// =============================================================================
// VISA transport (feature-gated)
// =============================================================================

#[cfg(feature = "instrument_visa")]
pub use visa::VisaTransport;

#[cfg(feature = "instrument_visa")]
mod visa {
    use super::*;

    use anyhow::Context;
    use log::debug;
    use visa_rs::{DefaultRM, Instrument, VISA};

    /// Hardware transport over the VISA runtime.
    ///
    /// VISA calls are synchronous, so each operation is executed on a
    /// dedicated blocking thread via `tokio::task::spawn_blocking`.
    ///
    /// Supports resource strings like:
    /// - "GPIB0::20::INSTR" (GPIB interface)
    /// - "USB0::0x0AAD::0x00CB::SERIAL::INSTR" (USB-TMC)
    /// - "TCPIP0::192.168.1.100::INSTR" (Ethernet/LXI)
    pub struct VisaTransport {
        resource_string: String,
        line_terminator: String,
        timeout: Duration,
        instrument: Option<Arc<tokio::sync::Mutex<Box<dyn Instrument>>>>,
    }

    impl VisaTransport {
        /// Open the given VISA resource.
        pub async fn open(resource_string: &str, timeout: Duration) -> DriverResult<Self> {
            let resource = resource_string.to_string();
            let timeout_ms = timeout.as_millis() as u32;

            let instrument = tokio::task::spawn_blocking(move || {
                let rm = DefaultRM::new().context("failed to create VISA resource manager")?;
                let instr = rm
                    .open(&resource, timeout_ms, 0)
                    .with_context(|| format!("failed to open VISA resource: {resource}"))?;
                Ok::<Box<dyn Instrument>, anyhow::Error>(instr)
            })
            .await
            .map_err(|e| DriverError::Transport(format!("VISA open task panicked: {e}")))?
            .map_err(|e| DriverError::Transport(format!("{e:#}")))?;

            debug!(
                "VISA resource '{}' opened with {}ms timeout",
                resource_string,
                timeout.as_millis()
            );

            Ok(Self {
                resource_string: resource_string.to_string(),
                line_terminator: "\n".to_string(),
                timeout,
                instrument: Some(Arc::new(tokio::sync::Mutex::new(instrument))),
            })
        }

        /// Set the line terminator appended to every outgoing command.
        pub fn with_line_terminator(mut self, terminator: &str) -> Self {
            self.line_terminator = terminator.to_string();
            self
        }

        fn handle(&self) -> DriverResult<Arc<tokio::sync::Mutex<Box<dyn Instrument>>>> {
            self.instrument.clone().ok_or(DriverError::NotConnected)
        }

        async fn exchange(&self, cmd: &str, expect_reply: bool) -> DriverResult<String> {
            let instrument = self.handle()?;
            let command_str = format!("{}{}", cmd, self.line_terminator);
            let command_for_log = cmd.to_string();
            let timeout_ms = self.timeout.as_millis() as u32;

            tokio::task::spawn_blocking(move || {
                let mut instr = instrument.blocking_lock();
                instr
                    .set_timeout(timeout_ms)
                    .context("failed to set VISA timeout")?;
                if expect_reply {
                    let response = instr
                        .query(&command_str)
                        .with_context(|| format!("VISA query failed for: {command_for_log}"))?;
                    let response = response.trim_end().to_string();
                    debug!("VISA query '{}' -> '{}'", command_for_log, response);
                    Ok(response)
                } else {
                    instr
                        .write(&command_str)
                        .with_context(|| format!("VISA write failed for: {command_for_log}"))?;
                    debug!("VISA command sent: {}", command_for_log);
                    Ok(String::new())
                }
            })
            .await
            .map_err(|e| DriverError::Transport(format!("VISA I/O task panicked: {e}")))?
            .map_err(|e: anyhow::Error| DriverError::Transport(format!("{e:#}")))
        }
    }

    #[async_trait]
    impl Transport for VisaTransport {
        async fn write(&mut self, cmd: &str) -> DriverResult<()> {
            self.exchange(cmd, false).await.map(|_| ())
        }

        async fn query(&mut self, cmd: &str) -> DriverResult<String> {
            self.exchange(cmd, true).await
        }

        async fn query_binary(&mut self, cmd: &str) -> DriverResult<Vec<u8>> {
            // Definite-length blocks fit the formatted read path; the reply
            // is returned untrimmed so the block header stays intact.
            self.exchange(cmd, true).await.map(String::into_bytes)
        }

        async fn set_timeout(&mut self, timeout: Duration) -> DriverResult<()> {
            self.timeout = timeout;
            Ok(())
        }

        async fn close(&mut self) -> DriverResult<()> {
            self.instrument = None;
            debug!("VISA resource '{}' closed", self.resource_string);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_commands_in_order() {
        let mut mock = MockTransport::new();
        let log = mock.command_log();

        mock.write("*RST").await.unwrap();
        mock.write("FREQ:CENT 1.0").await.unwrap();

        assert_eq!(log.snapshot(), vec!["*RST", "FREQ:CENT 1.0"]);
    }

    #[tokio::test]
    async fn mock_serves_canned_then_queued_replies() {
        let mut mock = MockTransport::new().with_queued_reply("-25.5");

        assert_eq!(mock.query("*IDN?").await.unwrap(), MOCK_IDENTITY);
        assert_eq!(mock.query("CALC1:MARK1:Y?").await.unwrap(), "-25.5");
        // Queue exhausted: generic reply.
        assert_eq!(mock.query("CALC1:MARK1:Y?").await.unwrap(), "0");
    }

    #[tokio::test]
    async fn mock_rejects_io_after_close() {
        let mut mock = MockTransport::new();
        mock.close().await.unwrap();
        assert!(matches!(
            mock.write("*RST").await,
            Err(DriverError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn set_timeout_is_recorded() {
        let mut mock = MockTransport::new();
        mock.set_timeout(Duration::from_millis(1500)).await.unwrap();
        assert_eq!(mock.timeout(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn reply_queue_handle_feeds_later_queries() {
        let mut mock = MockTransport::new();
        let queue = mock.reply_queue();

        queue.push("1.25");
        assert_eq!(mock.query("SWE:TIME?").await.unwrap(), "1.25");
    }
}
