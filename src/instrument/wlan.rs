//! WLAN 802.11 modulation analysis personality (option K91).
//!
//! Wraps the `INST:SEL WLAN` application: signal description, expected
//! power, PPDU evaluation range, and the EVM/ACP/spectrum-mask result
//! queries. All measurement math runs in firmware; these calls only
//! configure it and fetch its results.

use crate::attribute::{Access, AttrId, AttributeDescriptor, DataType, WriteStyle};
use crate::capability::CapabilityContext;
use crate::command::{parse_bool, parse_csv_reals, parse_int, parse_real};
use crate::engine;
use crate::error::{DriverError, DriverResult};
use crate::range_table::{entry, RangeSpec, RangeTable};
use crate::session::Session;

use super::base::ATTR_CENTER_FREQUENCY;

// =============================================================================
// Attribute IDs
// =============================================================================

/// Selected 802.11 standard (`CONF:STAN`).
pub const ATTR_WLAN_STANDARD: AttrId = AttrId(2001);
/// Expected RF input power in dBm (`CONF:POW:EXP:RF`).
pub const ATTR_WLAN_POWER_EXPECTED: AttrId = AttrId(2002);
/// Automatic input-power detection (`CONF:POW:AUTO`).
pub const ATTR_WLAN_POWER_AUTO: AttrId = AttrId(2003);
/// Smallest payload length entering the analysis, in symbols.
pub const ATTR_WLAN_EVAL_SYMBOLS_MIN: AttrId = AttrId(2004);
/// Largest payload length entering the analysis, in symbols.
pub const ATTR_WLAN_EVAL_SYMBOLS_MAX: AttrId = AttrId(2005);
/// WLAN channel number (`CONF:CHAN`).
pub const ATTR_WLAN_CHANNEL: AttrId = AttrId(2006);

// =============================================================================
// Range tables
// =============================================================================

// The firmware takes the standard as a plain index; the table still guards
// the legal set per the installed application.
const WLAN_STANDARDS: RangeTable = RangeTable::Discrete(&[
    entry(0.0, "0"),
    entry(1.0, "1"),
    entry(2.0, "2"),
    entry(3.0, "3"),
    entry(4.0, "4"),
    entry(5.0, "5"),
]);

const EXPECTED_POWER_RANGE: RangeTable = RangeTable::Continuous {
    min: -200.0,
    max: 30.0,
};
const EVAL_SYMBOLS_RANGE: RangeTable = RangeTable::Continuous {
    min: 1.0,
    max: 10_000.0,
};
const CHANNEL_RANGE: RangeTable = RangeTable::Continuous { min: 1.0, max: 200.0 };

pub(crate) const ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::new(
        ATTR_WLAN_STANDARD,
        "WLAN_STANDARD",
        "CONF:STAN",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&WLAN_STANDARDS)),
    AttributeDescriptor::new(
        ATTR_WLAN_POWER_EXPECTED,
        "WLAN_POWER_EXPECTED",
        "CONF:POW:EXP:RF",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&EXPECTED_POWER_RANGE)),
    AttributeDescriptor::new(
        ATTR_WLAN_POWER_AUTO,
        "WLAN_POWER_AUTO",
        "CONF:POW:AUTO",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(
        ATTR_WLAN_EVAL_SYMBOLS_MIN,
        "WLAN_EVAL_SYMBOLS_MIN",
        "DEM:FORM:SYMB:MIN",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&EVAL_SYMBOLS_RANGE))
    .with_write_style(WriteStyle::UnitSuffix("SYM")),
    AttributeDescriptor::new(
        ATTR_WLAN_EVAL_SYMBOLS_MAX,
        "WLAN_EVAL_SYMBOLS_MAX",
        "DEM:FORM:SYMB:MAX",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&EVAL_SYMBOLS_RANGE))
    .with_write_style(WriteStyle::UnitSuffix("SYM")),
    AttributeDescriptor::new(
        ATTR_WLAN_CHANNEL,
        "WLAN_CHANNEL",
        "CONF:CHAN",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&CHANNEL_RANGE)),
];

// =============================================================================
// Public enumerations and result types
// =============================================================================

/// 802.11 standard selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WlanStandard {
    /// 802.11a (OFDM, 5 GHz).
    Dot11A = 0,
    /// 802.11b (DSSS).
    Dot11B = 1,
    /// 802.11g.
    Dot11G = 2,
    /// 802.11n (HT).
    Dot11N = 3,
    /// 802.11ac (VHT).
    Dot11Ac = 4,
    /// 802.11ax (HE).
    Dot11Ax = 5,
}

/// Statistic selector for aggregated burst results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatistic {
    /// Average over all analyzed PPDUs.
    Average,
    /// Minimum over all analyzed PPDUs.
    Minimum,
    /// Maximum over all analyzed PPDUs.
    Maximum,
}

impl ResultStatistic {
    fn mnemonic(self) -> &'static str {
        match self {
            ResultStatistic::Average => "AVER",
            ResultStatistic::Minimum => "MIN",
            ResultStatistic::Maximum => "MAX",
        }
    }
}

/// Aggregated PPDU analysis results (`FETC:BURS:ALL?`).
#[derive(Debug, Clone, PartialEq)]
pub struct WlanResultSummary {
    /// EVM over all carriers, dB.
    pub evm_all_db: f64,
    /// EVM over data carriers, dB.
    pub evm_data_db: f64,
    /// EVM over pilot carriers, dB.
    pub evm_pilot_db: f64,
    /// IQ offset, dB.
    pub iq_offset_db: f64,
    /// Gain imbalance, dB.
    pub gain_imbalance_db: f64,
    /// Quadrature error, degrees.
    pub quadrature_error_deg: f64,
    /// Center frequency error, Hz.
    pub frequency_error_hz: f64,
    /// Symbol clock error, ppm.
    pub symbol_clock_error_ppm: f64,
    /// Mean burst power, dBm.
    pub burst_power_dbm: f64,
    /// Crest factor, dB.
    pub crest_factor_db: f64,
}

/// Borrowed sub-driver for the WLAN personality.
pub struct Wlan<'a> {
    session: &'a Session,
}

impl<'a> Wlan<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Activate the WLAN application. Requires option K91.
    pub async fn select(&self) -> DriverResult<()> {
        self.session.require_option("K91")?;
        self.session.write("INST:SEL WLAN").await?;
        self.session.check_status().await
    }

    /// Describe the measured signal: standard and center frequency.
    pub async fn configure_signal(
        &self,
        standard: WlanStandard,
        center_frequency: f64,
    ) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_WLAN_STANDARD, standard as i64).await?;
        engine::set_real(self.session, &ctx, ATTR_CENTER_FREQUENCY, center_frequency).await?;
        self.session.check_status().await
    }

    /// Configure the expected input power, or its automatic detection.
    pub async fn configure_expected_power(&self, auto: bool, power: f64) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session, &ctx, ATTR_WLAN_POWER_AUTO, auto).await?;
        if !auto {
            engine::set_real(self.session, &ctx, ATTR_WLAN_POWER_EXPECTED, power).await?;
        }
        self.session.check_status().await
    }

    /// Restrict the analysis to PPDUs whose payload length lies in
    /// `[min_symbols, max_symbols]`.
    pub async fn configure_evaluation_range(
        &self,
        min_symbols: u32,
        max_symbols: u32,
    ) -> DriverResult<()> {
        if max_symbols < min_symbols {
            return Err(DriverError::InvalidParameter {
                position: 2,
                name: "max_symbols",
            });
        }
        let ctx = CapabilityContext::none();
        engine::set_int(
            self.session,
            &ctx,
            ATTR_WLAN_EVAL_SYMBOLS_MIN,
            i64::from(min_symbols),
        )
        .await?;
        engine::set_int(
            self.session,
            &ctx,
            ATTR_WLAN_EVAL_SYMBOLS_MAX,
            i64::from(max_symbols),
        )
        .await?;
        self.session.check_status().await
    }

    /// Tune by WLAN channel number instead of frequency.
    pub async fn configure_channel(&self, channel: u32) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_WLAN_CHANNEL, i64::from(channel)).await?;
        self.session.check_status().await
    }

    /// Fetch the all-carrier EVM statistic in dB.
    pub async fn query_evm_all(&self, statistic: ResultStatistic) -> DriverResult<f64> {
        let raw = self
            .session
            .query(&format!("FETC:BURS:EVM:ALL:{}?", statistic.mnemonic()))
            .await?;
        parse_real(&raw)
    }

    /// Fetch the aggregated PPDU result summary.
    pub async fn query_result_summary(&self) -> DriverResult<WlanResultSummary> {
        let raw = self.session.query("FETC:BURS:ALL?").await?;
        let values = parse_csv_reals(&raw)?;
        if values.len() < 10 {
            return Err(DriverError::ResponseParse {
                response: raw.trim().to_string(),
                detail: format!("expected 10 summary fields, got {}", values.len()),
            });
        }
        Ok(WlanResultSummary {
            evm_all_db: values[0],
            evm_data_db: values[1],
            evm_pilot_db: values[2],
            iq_offset_db: values[3],
            gain_imbalance_db: values[4],
            quadrature_error_deg: values[5],
            frequency_error_hz: values[6],
            symbol_clock_error_ppm: values[7],
            burst_power_dbm: values[8],
            crest_factor_db: values[9],
        })
    }

    /// Number of PPDUs that entered the last analysis.
    pub async fn query_ppdu_count(&self) -> DriverResult<i64> {
        let raw = self.session.query("FETC:BURS:COUN?").await?;
        parse_int(&raw)
    }

    /// Fetch the adjacent-channel power results (reference channel plus
    /// lower/upper alternates), in dBm/dB as configured in firmware.
    pub async fn query_adjacent_channel_power(&self) -> DriverResult<Vec<f64>> {
        let raw = self
            .session
            .query("CALC:MARK:FUNC:POW:RES? ACP")
            .await?;
        parse_csv_reals(&raw)
    }

    /// Query one spectrum-mask limit check; `true` means the limit FAILED.
    /// `limit` is the limit-line index 1..=8.
    pub async fn query_spectrum_mask_check(&self, limit: u32) -> DriverResult<bool> {
        super::base::check_limit(limit, 1)?;
        let raw = self
            .session
            .query(&format!("CALC:LIM{limit}:FAIL?"))
            .await?;
        parse_bool(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::transport::{CommandLog, MockTransport};

    async fn wlan_session(mock: MockTransport) -> (Session, CommandLog) {
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
    async fn select_requires_option_k91() {
        let mock = MockTransport::new().with_options("B25,K6");
        let (session, log) = wlan_session(mock).await;
        let wlan = Wlan::new(&session);

        let err = wlan.select().await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::OptionNotInstalled { required: "K91" }
        ));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn configure_signal_sets_standard_then_frequency() {
        let (session, log) = wlan_session(MockTransport::new()).await;
        let wlan = Wlan::new(&session);

        wlan.configure_signal(WlanStandard::Dot11Ac, 5.18e9).await.unwrap();
        assert_eq!(
            log.take(),
            vec!["CONF:STAN 4", "FREQ:CENT 5180000000.000000000000"]
        );
    }

    #[tokio::test]
    async fn evaluation_range_appends_symbol_unit() {
        let (session, log) = wlan_session(MockTransport::new()).await;
        let wlan = Wlan::new(&session);

        wlan.configure_evaluation_range(20, 80).await.unwrap();
        assert_eq!(
            log.take(),
            vec!["DEM:FORM:SYMB:MIN 20SYM", "DEM:FORM:SYMB:MAX 80SYM"]
        );
    }

    #[tokio::test]
    async fn evaluation_range_validates_ordering() {
        let (session, log) = wlan_session(MockTransport::new()).await;
        let wlan = Wlan::new(&session);

        let err = wlan.configure_evaluation_range(80, 20).await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidParameter { position: 2, name: "max_symbols" }
        ));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn spectrum_mask_limit_index_is_validated() {
        let (session, log) = wlan_session(MockTransport::new()).await;
        let wlan = Wlan::new(&session);

        for bad in [0u32, 9] {
            let err = wlan.query_spectrum_mask_check(bad).await.unwrap_err();
            assert!(matches!(
                err,
                DriverError::InvalidParameter { position: 1, name: "limit" }
            ));
        }
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn result_summary_parses_ten_fields() {
        let mock = MockTransport::new().with_reply(
            "FETC:BURS:ALL?",
            "-38.2,-38.9,-36.1,-55.0,0.02,0.15,125.0,-0.8,-12.4,9.8",
        );
        let (session, _log) = wlan_session(mock).await;
        let wlan = Wlan::new(&session);

        let summary = wlan.query_result_summary().await.unwrap();
        assert!((summary.evm_all_db + 38.2).abs() < 1e-9);
        assert!((summary.crest_factor_db - 9.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn short_result_summary_is_a_parse_error() {
        let mock = MockTransport::new().with_reply("FETC:BURS:ALL?", "-38.2,-38.9");
        let (session, _log) = wlan_session(mock).await;
        let wlan = Wlan::new(&session);

        assert!(matches!(
            wlan.query_result_summary().await,
            Err(DriverError::ResponseParse { .. })
        ));
    }

    #[tokio::test]
    async fn evm_statistic_query_uses_mnemonic() {
        let mock = MockTransport::new().with_reply("FETC:BURS:EVM:ALL:MAX?", "-35.5");
        let (session, log) = wlan_session(mock).await;
        let wlan = Wlan::new(&session);

        let evm = wlan.query_evm_all(ResultStatistic::Maximum).await.unwrap();
        assert!((evm + 35.5).abs() < 1e-9);
        assert_eq!(log.take(), vec!["FETC:BURS:EVM:ALL:MAX?"]);
    }
}
