//! CDMA2000 / 1xEV-DO code-domain analysis personality (options K82-K85).
//!
//! One sub-driver covers the four firmware applications (base-station and
//! mobile, CDMA2000 and 1xEV-DO); the personality chosen at `select` time
//! decides which option must be installed. Code-domain configuration and
//! the analyzer result summary are shared across all four.

use crate::attribute::{Access, AttrId, AttributeDescriptor, DataType, WriteStyle};
use crate::capability::CapabilityContext;
use crate::command::{parse_csv_reals, parse_real};
use crate::engine;
use crate::error::{DriverError, DriverResult};
use crate::range_table::{entry, RangeSpec, RangeTable};
use crate::session::Session;

use super::base::check_window;

// =============================================================================
// Attribute IDs
// =============================================================================

/// Base spreading factor of the code-domain analyzer (`SENS:CDP:SFAC`).
pub const ATTR_C2K_BASE_SPREADING_FACTOR: AttrId = AttrId(5001);
/// Code number to analyze (`SENS:CDP:CODE`).
pub const ATTR_C2K_CODE_NUMBER: AttrId = AttrId(5002);
/// Antenna selection (`SENS:CDP:ANT`).
pub const ATTR_C2K_ANTENNA: AttrId = AttrId(5003);
/// Power control group to analyze (`SENS:CDP:PCG`).
pub const ATTR_C2K_PCG: AttrId = AttrId(5004);
/// Number of 1xEV-DO sets to capture (`SENS:CDP:SET:COUN`).
pub const ATTR_C2K_SET_COUNT: AttrId = AttrId(5005);
/// 1xEV-DO set to analyze (`SENS:CDP:SET`).
pub const ATTR_C2K_SET_TO_ANALYZE: AttrId = AttrId(5006);
/// Invert the Q component (`SENS:CDP:QINV`).
pub const ATTR_C2K_INVERT_Q: AttrId = AttrId(5007);
/// Long code mask, sent as an IEEE-488.2 hex numeric (`SENS:CDP:LCOD:MASK`).
pub const ATTR_C2K_LONG_CODE_MASK: AttrId = AttrId(5008);

// =============================================================================
// Range tables
// =============================================================================

const SPREADING_FACTORS: RangeTable =
    RangeTable::Discrete(&[entry(64.0, "64"), entry(128.0, "128")]);

const ANTENNAS: RangeTable = RangeTable::Discrete(&[
    entry(0.0, "OFF"),
    entry(1.0, "1"),
    entry(2.0, "2"),
]);

const CODE_NUMBER_RANGE: RangeTable = RangeTable::Continuous { min: 0.0, max: 127.0 };
const PCG_RANGE: RangeTable = RangeTable::Continuous { min: 0.0, max: 15.0 };
const SET_COUNT_RANGE: RangeTable = RangeTable::Continuous { min: 1.0, max: 30.0 };
const SET_INDEX_RANGE: RangeTable = RangeTable::Continuous { min: 0.0, max: 29.0 };

pub(crate) const ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::new(
        ATTR_C2K_BASE_SPREADING_FACTOR,
        "C2K_BASE_SPREADING_FACTOR",
        "SENS:CDP:SFAC",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&SPREADING_FACTORS)),
    AttributeDescriptor::new(
        ATTR_C2K_CODE_NUMBER,
        "C2K_CODE_NUMBER",
        "SENS:CDP:CODE",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&CODE_NUMBER_RANGE)),
    AttributeDescriptor::new(
        ATTR_C2K_ANTENNA,
        "C2K_ANTENNA",
        "SENS:CDP:ANT",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&ANTENNAS)),
    AttributeDescriptor::new(
        ATTR_C2K_PCG,
        "C2K_PCG",
        "SENS:CDP:PCG",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&PCG_RANGE)),
    AttributeDescriptor::new(
        ATTR_C2K_SET_COUNT,
        "C2K_SET_COUNT",
        "SENS:CDP:SET:COUN",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&SET_COUNT_RANGE)),
    AttributeDescriptor::new(
        ATTR_C2K_SET_TO_ANALYZE,
        "C2K_SET_TO_ANALYZE",
        "SENS:CDP:SET",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&SET_INDEX_RANGE)),
    AttributeDescriptor::new(
        ATTR_C2K_INVERT_Q,
        "C2K_INVERT_Q",
        "SENS:CDP:QINV",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(
        ATTR_C2K_LONG_CODE_MASK,
        "C2K_LONG_CODE_MASK",
        "SENS:CDP:LCOD:MASK",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_write_style(WriteStyle::BlockHex),
];

// =============================================================================
// Public enumerations and result types
// =============================================================================

/// The four code-domain firmware applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C2kPersonality {
    /// CDMA2000 base station (option K82).
    Bc2k,
    /// CDMA2000 mobile station (option K83).
    Mc2k,
    /// 1xEV-DO base station (option K84).
    Bdo,
    /// 1xEV-DO mobile station (option K85).
    Mdo,
}

impl C2kPersonality {
    fn mnemonic(self) -> &'static str {
        match self {
            C2kPersonality::Bc2k => "BC2K",
            C2kPersonality::Mc2k => "MC2K",
            C2kPersonality::Bdo => "BDO",
            C2kPersonality::Mdo => "MDO",
        }
    }

    fn required_option(self) -> &'static str {
        match self {
            C2kPersonality::Bc2k => "K82",
            C2kPersonality::Mc2k => "K83",
            C2kPersonality::Bdo => "K84",
            C2kPersonality::Mdo => "K85",
        }
    }
}

/// Antenna selection for code-domain analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antenna {
    /// Antenna diversity off.
    Off = 0,
    /// Antenna 1.
    One = 1,
    /// Antenna 2.
    Two = 2,
}

/// Code-domain analyzer result summary (`CALC<n>:MARK:FUNC:CDP:RES? ALL`).
#[derive(Debug, Clone, PartialEq)]
pub struct C2kResultSummary {
    /// Total signal power, dBm.
    pub total_power_dbm: f64,
    /// Pilot channel power, dBm.
    pub pilot_power_dbm: f64,
    /// Waveform quality rho.
    pub rho: f64,
    /// Carrier frequency error, Hz.
    pub frequency_error_hz: f64,
    /// Carrier frequency error, ppm.
    pub frequency_error_ppm: f64,
    /// Carrier feedthrough, dB.
    pub carrier_feedthrough_db: f64,
    /// IQ imbalance, percent.
    pub iq_imbalance_pct: f64,
    /// Timing error relative to the pilot, seconds.
    pub timing_error_s: f64,
}

/// Borrowed sub-driver for the CDMA2000 / 1xEV-DO personalities.
pub struct C2k<'a> {
    session: &'a Session,
}

impl<'a> C2k<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Activate one of the code-domain applications. Requires that
    /// personality's firmware option.
    pub async fn select(&self, personality: C2kPersonality) -> DriverResult<()> {
        self.session.require_option(personality.required_option())?;
        self.session
            .write(&format!("INST:SEL {}", personality.mnemonic()))
            .await?;
        self.session.check_status().await
    }

    /// Configure the code-domain analyzer: base spreading factor (64 or
    /// 128), code number and antenna.
    pub async fn configure_code_domain(
        &self,
        spreading_factor: u32,
        code_number: u32,
        antenna: Antenna,
    ) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(
            self.session,
            &ctx,
            ATTR_C2K_BASE_SPREADING_FACTOR,
            i64::from(spreading_factor),
        )
        .await?;
        engine::set_int(self.session, &ctx, ATTR_C2K_CODE_NUMBER, i64::from(code_number))
            .await?;
        engine::set_int(self.session, &ctx, ATTR_C2K_ANTENNA, antenna as i64).await?;
        self.session.check_status().await
    }

    /// Select the power control group to analyze.
    pub async fn configure_power_control_group(&self, pcg: u32) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_C2K_PCG, i64::from(pcg)).await?;
        self.session.check_status().await
    }

    /// Configure 1xEV-DO set capture: how many sets to capture and which
    /// one to analyze.
    pub async fn configure_sets(&self, count: u32, analyze: u32) -> DriverResult<()> {
        if analyze >= count {
            return Err(DriverError::InvalidParameter {
                position: 2,
                name: "analyze",
            });
        }
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_C2K_SET_COUNT, i64::from(count)).await?;
        engine::set_int(self.session, &ctx, ATTR_C2K_SET_TO_ANALYZE, i64::from(analyze))
            .await?;
        self.session.check_status().await
    }

    /// Invert the Q component of the baseband signal.
    pub async fn configure_invert_q(&self, invert: bool) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session, &ctx, ATTR_C2K_INVERT_Q, invert).await?;
        self.session.check_status().await
    }

    /// Set the long code mask used to descramble the signal. The mask is a
    /// 42-bit value and goes out as a hex numeric.
    pub async fn configure_long_code_mask(&self, mask: i64) -> DriverResult<()> {
        if !(0..=(1i64 << 42) - 1).contains(&mask) {
            return Err(DriverError::InvalidParameter {
                position: 1,
                name: "mask",
            });
        }
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_C2K_LONG_CODE_MASK, mask).await?;
        self.session.check_status().await
    }

    /// Fetch the code-domain analyzer result summary for one window.
    pub async fn query_result_summary(&self, window: u32) -> DriverResult<C2kResultSummary> {
        check_window(window, 1)?;
        let raw = self
            .session
            .query(&format!("CALC{window}:MARK:FUNC:CDP:RES? ALL"))
            .await?;
        let values = parse_csv_reals(&raw)?;
        if values.len() < 8 {
            return Err(DriverError::ResponseParse {
                response: raw.trim().to_string(),
                detail: format!("expected 8 summary fields, got {}", values.len()),
            });
        }
        Ok(C2kResultSummary {
            total_power_dbm: values[0],
            pilot_power_dbm: values[1],
            rho: values[2],
            frequency_error_hz: values[3],
            frequency_error_ppm: values[4],
            carrier_feedthrough_db: values[5],
            iq_imbalance_pct: values[6],
            timing_error_s: values[7],
        })
    }

    /// Fetch the channel power of the active personality, dBm.
    pub async fn query_channel_power(&self) -> DriverResult<f64> {
        let raw = self
            .session
            .query("CALC:MARK:FUNC:POW:RES? CPOW")
            .await?;
        parse_real(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::transport::{CommandLog, MockTransport};

    async fn c2k_session(mock: MockTransport) -> (Session, CommandLog) {
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
    async fn select_checks_the_personality_option() {
        // Default mock installs K82/K84 but not the mobile options.
        let (session, log) = c2k_session(MockTransport::new()).await;
        let c2k = C2k::new(&session);

        c2k.select(C2kPersonality::Bdo).await.unwrap();
        assert_eq!(log.take(), vec!["INST:SEL BDO"]);

        let err = c2k.select(C2kPersonality::Mdo).await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::OptionNotInstalled { required: "K85" }
        ));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn code_domain_maps_spreading_factor_token() {
        let (session, log) = c2k_session(MockTransport::new()).await;
        let c2k = C2k::new(&session);

        c2k.configure_code_domain(128, 40, Antenna::One).await.unwrap();
        assert_eq!(
            log.take(),
            vec!["SENS:CDP:SFAC 128", "SENS:CDP:CODE 40", "SENS:CDP:ANT 1"]
        );
    }

    #[tokio::test]
    async fn unsupported_spreading_factor_is_rejected() {
        let (session, log) = c2k_session(MockTransport::new()).await;
        let c2k = C2k::new(&session);

        let err = c2k
            .configure_code_domain(256, 0, Antenna::Off)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidValue { .. }));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn set_selection_is_validated_against_count() {
        let (session, log) = c2k_session(MockTransport::new()).await;
        let c2k = C2k::new(&session);

        let err = c2k.configure_sets(4, 4).await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidParameter { position: 2, name: "analyze" }
        ));
        assert!(log.take().is_empty());

        c2k.configure_sets(4, 3).await.unwrap();
        assert_eq!(log.take(), vec!["SENS:CDP:SET:COUN 4", "SENS:CDP:SET 3"]);
    }

    #[tokio::test]
    async fn long_code_mask_is_sent_as_hex_numeric() {
        let (session, log) = c2k_session(MockTransport::new()).await;
        let c2k = C2k::new(&session);

        c2k.configure_long_code_mask(0x3FF).await.unwrap();
        assert_eq!(log.take(), vec!["SENS:CDP:LCOD:MASK #H3FF"]);

        let err = c2k.configure_long_code_mask(1i64 << 42).await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidParameter { position: 1, name: "mask" }
        ));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn result_summary_parses_eight_fields() {
        let mock = MockTransport::new().with_reply(
            "CALC2:MARK:FUNC:CDP:RES? ALL",
            "-10.2,-17.5,0.9987,12.5,0.006,-52.0,0.4,1.2e-8",
        );
        let (session, _log) = c2k_session(mock).await;
        let c2k = C2k::new(&session);

        let summary = c2k.query_result_summary(2).await.unwrap();
        assert!((summary.rho - 0.9987).abs() < 1e-12);
        assert!((summary.timing_error_s - 1.2e-8).abs() < 1e-20);
    }
}
