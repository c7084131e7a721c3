//! LTE uplink/downlink analysis personality (options K100/K102/K104).
//!
//! Wraps the `INST:SEL LTE` application: link direction, duplexing, channel
//! bandwidth, cyclic prefix, subframe selection, the uplink trigger path,
//! and the result-summary queries. Channel-bandwidth tokens are long enough
//! that some firmware truncates them in query replies, so the bandwidth
//! attributes run the prefix-match compatibility mode on reads.

use crate::attribute::{Access, AttrId, AttributeDescriptor, DataType, ReadStyle, WriteStyle};
use crate::capability::CapabilityContext;
use crate::command::{parse_csv_reals, parse_real};
use crate::engine;
use crate::error::{DriverError, DriverResult};
use crate::range_table::{entry, RangeSpec, RangeTable};
use crate::session::Session;

use super::base::{ATTR_TRIGGER_LEVEL_EXTERNAL, ATTR_TRIGGER_SOURCE};
use super::base::TriggerSource;

// =============================================================================
// Attribute IDs
// =============================================================================

/// Link direction (`CONF:LTE:LDIR`).
pub const ATTR_LTE_LINK_DIRECTION: AttrId = AttrId(3001);
/// Duplexing mode (`CONF:LTE:DUPL`).
pub const ATTR_LTE_DUPLEXING: AttrId = AttrId(3002);
/// Downlink channel bandwidth (`CONF:LTE:DL:BW`).
pub const ATTR_LTE_DL_BANDWIDTH: AttrId = AttrId(3003);
/// Uplink channel bandwidth (`CONF:LTE:UL:BW`).
pub const ATTR_LTE_UL_BANDWIDTH: AttrId = AttrId(3004);
/// Downlink cyclic prefix (`CONF:LTE:DL:CYCP`).
pub const ATTR_LTE_DL_CYCLIC_PREFIX: AttrId = AttrId(3005);
/// Uplink cyclic prefix (`CONF:LTE:UL:CYCP`).
pub const ATTR_LTE_UL_CYCLIC_PREFIX: AttrId = AttrId(3006);
/// Subframe to analyze; `-1` selects all subframes.
pub const ATTR_LTE_SUBFRAME: AttrId = AttrId(3007);

// =============================================================================
// Range tables
// =============================================================================

const LINK_DIRECTIONS: RangeTable =
    RangeTable::Discrete(&[entry(0.0, "DL"), entry(1.0, "UL")]);

const DUPLEXING_MODES: RangeTable =
    RangeTable::Discrete(&[entry(0.0, "FDD"), entry(1.0, "TDD")]);

const CHANNEL_BANDWIDTHS: RangeTable = RangeTable::Discrete(&[
    entry(0.0, "BW1_40"),
    entry(1.0, "BW3_00"),
    entry(2.0, "BW5_00"),
    entry(3.0, "BW10_00"),
    entry(4.0, "BW15_00"),
    entry(5.0, "BW20_00"),
]);

const CYCLIC_PREFIXES: RangeTable = RangeTable::Discrete(&[
    entry(0.0, "NORM"),
    entry(1.0, "EXT"),
    entry(2.0, "AUTO"),
]);

const SUBFRAME_RANGE: RangeTable = RangeTable::Continuous { min: -1.0, max: 9.0 };

pub(crate) const ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::new(
        ATTR_LTE_LINK_DIRECTION,
        "LTE_LINK_DIRECTION",
        "CONF:LTE:LDIR",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&LINK_DIRECTIONS)),
    AttributeDescriptor::new(
        ATTR_LTE_DUPLEXING,
        "LTE_DUPLEXING",
        "CONF:LTE:DUPL",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&DUPLEXING_MODES)),
    AttributeDescriptor::new(
        ATTR_LTE_DL_BANDWIDTH,
        "LTE_DL_BANDWIDTH",
        "CONF:LTE:DL:BW",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&CHANNEL_BANDWIDTHS))
    .with_read_style(ReadStyle::PrefixMatch),
    AttributeDescriptor::new(
        ATTR_LTE_UL_BANDWIDTH,
        "LTE_UL_BANDWIDTH",
        "CONF:LTE:UL:BW",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&CHANNEL_BANDWIDTHS))
    .with_read_style(ReadStyle::PrefixMatch),
    AttributeDescriptor::new(
        ATTR_LTE_DL_CYCLIC_PREFIX,
        "LTE_DL_CYCLIC_PREFIX",
        "CONF:LTE:DL:CYCP",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&CYCLIC_PREFIXES)),
    AttributeDescriptor::new(
        ATTR_LTE_UL_CYCLIC_PREFIX,
        "LTE_UL_CYCLIC_PREFIX",
        "CONF:LTE:UL:CYCP",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&CYCLIC_PREFIXES)),
    AttributeDescriptor::new(
        ATTR_LTE_SUBFRAME,
        "LTE_SUBFRAME",
        "SENS:LTE:FRAM:SSUB",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&SUBFRAME_RANGE))
    .with_write_style(WriteStyle::SpecialToken {
        value: -1,
        token: "ALL",
    }),
];

// =============================================================================
// Public enumerations and result types
// =============================================================================

/// LTE link direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    /// Base-station transmit path.
    Downlink = 0,
    /// Terminal transmit path.
    Uplink = 1,
}

/// Duplexing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplexing {
    /// Frequency-division duplex.
    Fdd = 0,
    /// Time-division duplex.
    Tdd = 1,
}

/// LTE channel bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelBandwidth {
    /// 1.4 MHz.
    Bw1M4 = 0,
    /// 3 MHz.
    Bw3 = 1,
    /// 5 MHz.
    Bw5 = 2,
    /// 10 MHz.
    Bw10 = 3,
    /// 15 MHz.
    Bw15 = 4,
    /// 20 MHz.
    Bw20 = 5,
}

/// Cyclic-prefix handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclicPrefix {
    /// Normal cyclic prefix.
    Normal = 0,
    /// Extended cyclic prefix.
    Extended = 1,
    /// Automatic detection.
    Auto = 2,
}

/// Aggregated frame results (`FETC:SUMM:ALL?`).
#[derive(Debug, Clone, PartialEq)]
pub struct LteResultSummary {
    /// EVM over the whole frame, percent.
    pub evm_pct: f64,
    /// Center frequency error, Hz.
    pub frequency_error_hz: f64,
    /// Sampling clock error, ppm.
    pub sampling_error_ppm: f64,
    /// IQ offset, dB.
    pub iq_offset_db: f64,
    /// IQ gain imbalance, dB.
    pub iq_gain_imbalance_db: f64,
    /// IQ quadrature error, degrees.
    pub iq_quadrature_error_deg: f64,
    /// Total frame power, dBm.
    pub frame_power_dbm: f64,
    /// Crest factor, dB.
    pub crest_factor_db: f64,
}

/// Borrowed sub-driver for the LTE personality.
pub struct Lte<'a> {
    session: &'a Session,
}

impl<'a> Lte<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Activate the LTE application. Requires one of K100/K102/K104.
    pub async fn select(&self) -> DriverResult<()> {
        self.session
            .require_any_option("K100/K102/K104", &["K100", "K102", "K104"])?;
        self.session.write("INST:SEL LTE").await?;
        self.session.check_status().await
    }

    /// Select the link direction.
    pub async fn configure_link_direction(&self, direction: LinkDirection) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_LTE_LINK_DIRECTION, direction as i64).await?;
        self.session.check_status().await
    }

    /// Select the duplexing scheme.
    pub async fn configure_duplexing(&self, duplexing: Duplexing) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_LTE_DUPLEXING, duplexing as i64).await?;
        self.session.check_status().await
    }

    /// Describe the downlink signal: bandwidth and cyclic prefix.
    pub async fn configure_downlink_signal(
        &self,
        bandwidth: ChannelBandwidth,
        cyclic_prefix: CyclicPrefix,
    ) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_LTE_LINK_DIRECTION, LinkDirection::Downlink as i64)
            .await?;
        engine::set_int(self.session, &ctx, ATTR_LTE_DL_BANDWIDTH, bandwidth as i64).await?;
        engine::set_int(self.session, &ctx, ATTR_LTE_DL_CYCLIC_PREFIX, cyclic_prefix as i64)
            .await?;
        self.session.check_status().await
    }

    /// Describe the uplink signal: bandwidth and cyclic prefix.
    pub async fn configure_uplink_signal(
        &self,
        bandwidth: ChannelBandwidth,
        cyclic_prefix: CyclicPrefix,
    ) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_LTE_LINK_DIRECTION, LinkDirection::Uplink as i64)
            .await?;
        engine::set_int(self.session, &ctx, ATTR_LTE_UL_BANDWIDTH, bandwidth as i64).await?;
        engine::set_int(self.session, &ctx, ATTR_LTE_UL_CYCLIC_PREFIX, cyclic_prefix as i64)
            .await?;
        self.session.check_status().await
    }

    /// Select the subframe to analyze; `-1` analyzes all subframes.
    pub async fn configure_subframe(&self, subframe: i32) -> DriverResult<()> {
        if !(-1..=9).contains(&subframe) {
            return Err(DriverError::InvalidParameter {
                position: 1,
                name: "subframe",
            });
        }
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_LTE_SUBFRAME, i64::from(subframe)).await?;
        self.session.check_status().await
    }

    /// Configure the trigger for uplink measurements: source plus external
    /// trigger level in volts.
    pub async fn configure_uplink_trigger(
        &self,
        source: TriggerSource,
        external_level: f64,
    ) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_TRIGGER_SOURCE, source as i64).await?;
        engine::set_real(self.session, &ctx, ATTR_TRIGGER_LEVEL_EXTERNAL, external_level)
            .await?;
        self.session.check_status().await
    }

    /// Fetch the frame-average EVM in percent.
    pub async fn query_evm_average(&self) -> DriverResult<f64> {
        let raw = self.session.query("FETC:SUMM:EVM?").await?;
        parse_real(&raw)
    }

    /// Fetch the aggregated frame result summary.
    pub async fn query_result_summary(&self) -> DriverResult<LteResultSummary> {
        let raw = self.session.query("FETC:SUMM:ALL?").await?;
        let values = parse_csv_reals(&raw)?;
        if values.len() < 8 {
            return Err(DriverError::ResponseParse {
                response: raw.trim().to_string(),
                detail: format!("expected 8 summary fields, got {}", values.len()),
            });
        }
        Ok(LteResultSummary {
            evm_pct: values[0],
            frequency_error_hz: values[1],
            sampling_error_ppm: values[2],
            iq_offset_db: values[3],
            iq_gain_imbalance_db: values[4],
            iq_quadrature_error_deg: values[5],
            frame_power_dbm: values[6],
            crest_factor_db: values[7],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::transport::{CommandLog, MockTransport};

    async fn lte_session(mock: MockTransport) -> (Session, CommandLog) {
        let log = mock.command_log();
        let config = SessionConfig {
            check_instrument_status: false,
            ..SessionConfig::default()
        };
        let session = Session::open(Box::new(mock), &config).await.unwrap();
        log.take();
        (session, log)
    }

    #[tokio::test]
    async fn select_requires_an_lte_option() {
        let mock = MockTransport::new().with_options("K6,K91");
        let (session, log) = lte_session(mock).await;
        let lte = Lte::new(&session);

        let err = lte.select().await.unwrap_err();
        assert!(matches!(err, DriverError::OptionNotInstalled { .. }));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn downlink_signal_maps_bandwidth_tokens() {
        let (session, log) = lte_session(MockTransport::new()).await;
        let lte = Lte::new(&session);

        lte.configure_downlink_signal(ChannelBandwidth::Bw10, CyclicPrefix::Normal)
            .await
            .unwrap();
        assert_eq!(
            log.take(),
            vec![
                "CONF:LTE:LDIR DL",
                "CONF:LTE:DL:BW BW10_00",
                "CONF:LTE:DL:CYCP NORM"
            ]
        );
    }

    #[tokio::test]
    async fn truncated_bandwidth_reply_still_reads() {
        let mock = MockTransport::new().with_reply("CONF:LTE:DL:BW?", "BW10");
        let (session, _log) = lte_session(mock).await;

        let value = engine::get_int(&session, &CapabilityContext::none(), ATTR_LTE_DL_BANDWIDTH)
            .await
            .unwrap();
        assert_eq!(value, ChannelBandwidth::Bw10 as i64);
    }

    #[tokio::test]
    async fn subframe_all_uses_special_token() {
        let (session, log) = lte_session(MockTransport::new()).await;
        let lte = Lte::new(&session);

        lte.configure_subframe(-1).await.unwrap();
        lte.configure_subframe(4).await.unwrap();
        assert_eq!(
            log.take(),
            vec!["SENS:LTE:FRAM:SSUB ALL", "SENS:LTE:FRAM:SSUB 4"]
        );
    }

    #[tokio::test]
    async fn subframe_bounds_are_validated_locally() {
        let (session, log) = lte_session(MockTransport::new()).await;
        let lte = Lte::new(&session);

        let err = lte.configure_subframe(10).await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidParameter { position: 1, name: "subframe" }
        ));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn uplink_trigger_sets_source_and_level() {
        let (session, log) = lte_session(MockTransport::new()).await;
        let lte = Lte::new(&session);

        lte.configure_uplink_trigger(TriggerSource::External, 1.4)
            .await
            .unwrap();
        assert_eq!(
            log.take(),
            vec!["TRIG:SOUR EXT", "TRIG:LEV 1.400000000000"]
        );
    }

    #[tokio::test]
    async fn result_summary_parses_eight_fields() {
        let mock = MockTransport::new().with_reply(
            "FETC:SUMM:ALL?",
            "1.25,-12.5,0.02,-48.0,0.05,0.1,-10.2,11.4",
        );
        let (session, _log) = lte_session(mock).await;
        let lte = Lte::new(&session);

        let summary = lte.query_result_summary().await.unwrap();
        assert!((summary.evm_pct - 1.25).abs() < 1e-9);
        assert!((summary.frame_power_dbm + 10.2).abs() < 1e-9);
    }
}
