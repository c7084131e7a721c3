//! Instrument personalities: the typed per-measurement-domain driver layer.
//!
//! [`SpectrumAnalyzer`] carries the base analyzer surface (frequency, level,
//! sweep, markers, traces, limits); the firmware-option personalities hang
//! off it as borrowed sub-drivers:
//!
//! - [`wlan`]: WLAN 802.11 modulation analysis (option K91)
//! - [`lte`]: LTE uplink/downlink analysis (options K100/K102/K104)
//! - [`pulse`]: pulse measurements (option K6)
//! - [`c2k`]: CDMA2000 / 1xEV-DO code-domain analysis (options K82-K85)
//!
//! Every operation follows the same shape: validate caller arguments
//! locally (no I/O on failure), issue the attribute-engine or direct SCPI
//! commands, and finish configure paths with the instrument status check.

pub mod base;
pub mod c2k;
pub mod lte;
pub mod pulse;
pub mod wlan;

use crate::attribute::AttributeDescriptor;
use crate::config::SessionConfig;
use crate::error::DriverResult;
use crate::session::Session;
use crate::transport::Transport;

/// Every personality's attribute table, collected for the global registry.
pub(crate) const ATTRIBUTE_TABLES: &[&[AttributeDescriptor]] = &[
    base::ATTRIBUTES,
    wlan::ATTRIBUTES,
    lte::ATTRIBUTES,
    pulse::ATTRIBUTES,
    c2k::ATTRIBUTES,
];

/// Top-level driver handle for one analyzer.
pub struct SpectrumAnalyzer {
    session: Session,
}

impl SpectrumAnalyzer {
    /// Open a driver session over the given transport.
    pub async fn open(
        transport: Box<dyn Transport>,
        config: &SessionConfig,
    ) -> DriverResult<Self> {
        Ok(Self {
            session: Session::open(transport, config).await?,
        })
    }

    /// The underlying session, for direct SCPI access and status control.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// WLAN modulation-analysis personality (option K91).
    pub fn wlan(&self) -> wlan::Wlan<'_> {
        wlan::Wlan::new(&self.session)
    }

    /// LTE analysis personality (options K100/K102/K104).
    pub fn lte(&self) -> lte::Lte<'_> {
        lte::Lte::new(&self.session)
    }

    /// Pulse measurement personality (option K6).
    pub fn pulse(&self) -> pulse::Pulse<'_> {
        pulse::Pulse::new(&self.session)
    }

    /// CDMA2000 / 1xEV-DO code-domain personality (options K82-K85).
    pub fn c2k(&self) -> c2k::C2k<'_> {
        c2k::C2k::new(&self.session)
    }

    /// Reset the instrument and wait for completion.
    pub async fn reset(&self) -> DriverResult<()> {
        self.session.reset().await
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> DriverResult<()> {
        self.session.close().await
    }
}
