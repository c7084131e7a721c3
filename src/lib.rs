//! SCPI instrument driver for Rohde & Schwarz spectrum and signal analyzers.
//!
//! Each public driver operation translates a typed call into one or more
//! SCPI command strings, sends them over a [`transport::Transport`], and
//! parses the textual or binary reply back into typed values. The layer
//! doing that translation is deliberately generic: attribute metadata
//! (command templates, data types, range tables) lives in static tables,
//! capability placeholders (`{window}`, `{marker}`) are substituted at call
//! time, and a small closed set of formatting strategies covers the
//! instrument's quirks (unit suffixes, special literal tokens, IEEE-488.2
//! numerics).
//!
//! Measurement math (EVM, ACLR, spectrum emission masks) runs inside the
//! instrument firmware; this crate only marshals parameters to it and
//! results from it.
//!
//! ## Quick start
//!
//! ```
//! use rsspecan::instrument::base::TraceMode;
//! use rsspecan::transport::MockTransport;
//! use rsspecan::{SessionConfig, SpectrumAnalyzer};
//!
//! # async fn demo() -> rsspecan::DriverResult<()> {
//! let transport = Box::new(MockTransport::new());
//! let analyzer = SpectrumAnalyzer::open(transport, &SessionConfig::default()).await?;
//!
//! analyzer.configure_frequency_center(13.25e9).await?;
//! analyzer.configure_trace_mode(1, 1, TraceMode::MaxHold).await?;
//! analyzer.initiate_and_wait().await?;
//! let trace = analyzer.query_trace_data(1, 1).await?;
//! # let _ = trace;
//! # Ok(())
//! # }
//! ```
//!
//! Swap [`transport::MockTransport`] for the feature-gated VISA transport to
//! talk to real hardware.

pub mod attribute;
pub mod capability;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod instrument;
pub mod range_table;
pub mod session;
pub mod transport;

pub use capability::CapabilityContext;
pub use config::SessionConfig;
pub use error::{DriverError, DriverResult};
pub use instrument::SpectrumAnalyzer;
pub use session::{Identity, Session};
