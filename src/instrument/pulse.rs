//! Pulse measurement personality (option K6).
//!
//! Wraps the `INST:SEL PULS` application: pulse detection, timing reference,
//! result-range selection and the timing/power result arrays. The result
//! range is addressed by number, with `0` standing for the most recent
//! range; the firmware spells that one `LAST` instead of a digit.

use crate::attribute::{Access, AttrId, AttributeDescriptor, DataType, ReadStyle, WriteStyle};
use crate::capability::CapabilityContext;
use crate::command::{parse_csv_reals, parse_int};
use crate::engine;
use crate::error::{DriverError, DriverResult};
use crate::range_table::{entry, RangeSpec, RangeTable};
use crate::session::Session;

// =============================================================================
// Attribute IDs
// =============================================================================

/// Periodic-signal hint for the pulse detector (`SENS:PULS:PER`).
pub const ATTR_PULSE_PERIODIC: AttrId = AttrId(4001);
/// Timing reference point (`SENS:PULS:TIM:REF`).
pub const ATTR_PULSE_REFERENCE_POINT: AttrId = AttrId(4002);
/// Measurement offset from the reference point, seconds.
pub const ATTR_PULSE_MEASUREMENT_OFFSET: AttrId = AttrId(4003);
/// Phase offset applied to phase results, degrees.
pub const ATTR_PULSE_PHASE_OFFSET: AttrId = AttrId(4004);
/// Pulse-count detection limit state (`SENS:DET:LIM`).
pub const ATTR_PULSE_DETECTION_LIMIT_STATE: AttrId = AttrId(4005);
/// Maximum number of pulses per capture (`SENS:DET:LIM:COUN`).
pub const ATTR_PULSE_DETECTION_LIMIT_COUNT: AttrId = AttrId(4006);
/// Result range number; `0` selects the most recent (`LAST`) range.
pub const ATTR_PULSE_RESULT_RANGE: AttrId = AttrId(4007);

// =============================================================================
// Range tables
// =============================================================================

const REFERENCE_POINTS: RangeTable = RangeTable::Discrete(&[
    entry(0.0, "RISE"),
    entry(1.0, "CENT"),
    entry(2.0, "FALL"),
]);

const MEASUREMENT_OFFSET_RANGE: RangeTable = RangeTable::Continuous { min: 0.0, max: 10.0 };
const PHASE_OFFSET_RANGE: RangeTable = RangeTable::Continuous {
    min: -360.0,
    max: 360.0,
};
const DETECTION_COUNT_RANGE: RangeTable = RangeTable::Continuous {
    min: 1.0,
    max: 10_000.0,
};
const RESULT_RANGE_NUMBERS: RangeTable = RangeTable::Continuous { min: 0.0, max: 10_000.0 };

pub(crate) const ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::new(
        ATTR_PULSE_PERIODIC,
        "PULSE_PERIODIC",
        "SENS:PULS:PER",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(
        ATTR_PULSE_REFERENCE_POINT,
        "PULSE_REFERENCE_POINT",
        "SENS:PULS:TIM:REF",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&REFERENCE_POINTS)),
    AttributeDescriptor::new(
        ATTR_PULSE_MEASUREMENT_OFFSET,
        "PULSE_MEASUREMENT_OFFSET",
        "SENS:PULS:TIM:OFFS",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&MEASUREMENT_OFFSET_RANGE))
    .with_write_style(WriteStyle::UnitSuffix("S"))
    .with_read_style(ReadStyle::StripUnit),
    AttributeDescriptor::new(
        ATTR_PULSE_PHASE_OFFSET,
        "PULSE_PHASE_OFFSET",
        "SENS:PULS:PHAS:OFFS",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&PHASE_OFFSET_RANGE))
    .with_write_style(WriteStyle::UnitSuffix("DEG"))
    .with_read_style(ReadStyle::StripUnit),
    AttributeDescriptor::new(
        ATTR_PULSE_DETECTION_LIMIT_STATE,
        "PULSE_DETECTION_LIMIT_STATE",
        "SENS:DET:LIM",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(
        ATTR_PULSE_DETECTION_LIMIT_COUNT,
        "PULSE_DETECTION_LIMIT_COUNT",
        "SENS:DET:LIM:COUN",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&DETECTION_COUNT_RANGE)),
    AttributeDescriptor::new(
        ATTR_PULSE_RESULT_RANGE,
        "PULSE_RESULT_RANGE",
        "CALC:RRAN",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&RESULT_RANGE_NUMBERS))
    .with_write_style(WriteStyle::SpecialToken {
        value: 0,
        token: "LAST",
    }),
];

// =============================================================================
// Public enumerations
// =============================================================================

/// Reference point for pulse timing measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePoint {
    /// Rising edge.
    Rise = 0,
    /// Pulse center.
    Center = 1,
    /// Falling edge.
    Fall = 2,
}

/// Borrowed sub-driver for the pulse personality.
pub struct Pulse<'a> {
    session: &'a Session,
}

impl<'a> Pulse<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Activate the pulse application. Requires option K6.
    pub async fn select(&self) -> DriverResult<()> {
        self.session.require_option("K6")?;
        self.session.write("INST:SEL PULS").await?;
        self.session.check_status().await
    }

    /// Tell the detector whether the signal repeats periodically.
    pub async fn configure_periodic(&self, periodic: bool) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session, &ctx, ATTR_PULSE_PERIODIC, periodic).await?;
        self.session.check_status().await
    }

    /// Set the timing reference point and the measurement offset from it.
    pub async fn configure_reference_point(
        &self,
        reference: ReferencePoint,
        offset_s: f64,
    ) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_PULSE_REFERENCE_POINT, reference as i64).await?;
        engine::set_real(self.session, &ctx, ATTR_PULSE_MEASUREMENT_OFFSET, offset_s).await?;
        self.session.check_status().await
    }

    /// Apply a phase offset (degrees) to phase results.
    pub async fn configure_phase_offset(&self, degrees: f64) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_real(self.session, &ctx, ATTR_PULSE_PHASE_OFFSET, degrees).await?;
        self.session.check_status().await
    }

    /// Cap the number of pulses detected per capture.
    pub async fn configure_detection_limit(&self, enabled: bool, count: u32) -> DriverResult<()> {
        if enabled && count == 0 {
            return Err(DriverError::InvalidParameter {
                position: 2,
                name: "count",
            });
        }
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session, &ctx, ATTR_PULSE_DETECTION_LIMIT_STATE, enabled).await?;
        if enabled {
            engine::set_int(
                self.session,
                &ctx,
                ATTR_PULSE_DETECTION_LIMIT_COUNT,
                i64::from(count),
            )
            .await?;
        }
        self.session.check_status().await
    }

    /// Select the result range by number; `0` selects the most recent one.
    pub async fn configure_result_range(&self, range: u32) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session, &ctx, ATTR_PULSE_RESULT_RANGE, i64::from(range)).await?;
        self.session.check_status().await
    }

    /// Number of pulses detected in the current capture.
    pub async fn query_pulse_count(&self) -> DriverResult<i64> {
        let raw = self.session.query("FETC:PULS:COUN?").await?;
        parse_int(&raw)
    }

    /// Pulse widths of all detected pulses, seconds.
    pub async fn query_pulse_widths(&self) -> DriverResult<Vec<f64>> {
        let raw = self.session.query("FETC:PULS:TIM:PWID? ALL").await?;
        parse_csv_reals(&raw)
    }

    /// Rise times of all detected pulses, seconds.
    pub async fn query_rise_times(&self) -> DriverResult<Vec<f64>> {
        let raw = self.session.query("FETC:PULS:TIM:RISE? ALL").await?;
        parse_csv_reals(&raw)
    }

    /// Top power of all detected pulses, dBm.
    pub async fn query_top_power(&self) -> DriverResult<Vec<f64>> {
        let raw = self.session.query("FETC:PULS:POW:TOP? ALL").await?;
        parse_csv_reals(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::transport::{CommandLog, MockTransport};

    async fn pulse_session(mock: MockTransport) -> (Session, CommandLog) {
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
    async fn reference_point_appends_second_suffix() {
        let (session, log) = pulse_session(MockTransport::new()).await;
        let pulse = Pulse::new(&session);

        pulse
            .configure_reference_point(ReferencePoint::Center, 1.5e-6)
            .await
            .unwrap();
        assert_eq!(
            log.take(),
            vec!["SENS:PULS:TIM:REF CENT", "SENS:PULS:TIM:OFFS 0.000001500000S"]
        );
    }

    #[tokio::test]
    async fn phase_offset_appends_degree_suffix() {
        let (session, log) = pulse_session(MockTransport::new()).await;
        let pulse = Pulse::new(&session);

        pulse.configure_phase_offset(-45.0).await.unwrap();
        assert_eq!(log.take(), vec!["SENS:PULS:PHAS:OFFS -45.000000000000DEG"]);
    }

    #[tokio::test]
    async fn result_range_zero_becomes_last_token() {
        let (session, log) = pulse_session(MockTransport::new()).await;
        let pulse = Pulse::new(&session);

        pulse.configure_result_range(0).await.unwrap();
        pulse.configure_result_range(3).await.unwrap();
        assert_eq!(log.take(), vec!["CALC:RRAN LAST", "CALC:RRAN 3"]);
    }

    #[tokio::test]
    async fn detection_limit_zero_count_is_rejected_locally() {
        let (session, log) = pulse_session(MockTransport::new()).await;
        let pulse = Pulse::new(&session);

        let err = pulse.configure_detection_limit(true, 0).await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidParameter { position: 2, name: "count" }
        ));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn disabled_detection_limit_skips_count_write() {
        let (session, log) = pulse_session(MockTransport::new()).await;
        let pulse = Pulse::new(&session);

        pulse.configure_detection_limit(false, 0).await.unwrap();
        assert_eq!(log.take(), vec!["SENS:DET:LIM OFF"]);
    }

    #[tokio::test]
    async fn unit_bearing_reply_is_stripped_on_read() {
        let mock = MockTransport::new().with_reply("SENS:PULS:TIM:OFFS?", "1.5E-6 S");
        let (session, _log) = pulse_session(mock).await;

        let offset = engine::get_real(
            &session,
            &CapabilityContext::none(),
            ATTR_PULSE_MEASUREMENT_OFFSET,
        )
        .await
        .unwrap();
        assert!((offset - 1.5e-6).abs() < 1e-15);
    }

    #[tokio::test]
    async fn timing_arrays_parse_csv() {
        let mock = MockTransport::new()
            .with_reply("FETC:PULS:TIM:PWID? ALL", "1.0e-6,1.1e-6,0.9e-6")
            .with_reply("FETC:PULS:COUN?", "3");
        let (session, _log) = pulse_session(mock).await;
        let pulse = Pulse::new(&session);

        assert_eq!(pulse.query_pulse_count().await.unwrap(), 3);
        let widths = pulse.query_pulse_widths().await.unwrap();
        assert_eq!(widths.len(), 3);
        assert!((widths[1] - 1.1e-6).abs() < 1e-15);
    }
}
