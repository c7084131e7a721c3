//! Base analyzer surface: frequency, level, bandwidth, sweep, trigger,
//! markers, traces and limit lines.
//!
//! These settings exist on every analyzer family the driver supports, so
//! they live directly on [`SpectrumAnalyzer`] rather than behind an option
//! gate. Window/marker/trace/limit indices are validated locally before any
//! I/O; the engine's range tables validate the values themselves.

use crate::attribute::{Access, AttrId, AttributeDescriptor, DataType};
use crate::capability::CapabilityContext;
use crate::command::{parse_block_f32, parse_csv_reals, parse_int};
use crate::engine;
use crate::error::{DriverError, DriverResult};
use crate::range_table::{entry, RangeSpec, RangeTable};

use super::SpectrumAnalyzer;

// =============================================================================
// Attribute IDs
// =============================================================================

/// Center frequency in Hz (`FREQ:CENT`).
pub const ATTR_CENTER_FREQUENCY: AttrId = AttrId(1001);
/// Frequency span in Hz (`FREQ:SPAN`).
pub const ATTR_FREQUENCY_SPAN: AttrId = AttrId(1002);
/// Start frequency in Hz (`FREQ:STAR`).
pub const ATTR_START_FREQUENCY: AttrId = AttrId(1003);
/// Stop frequency in Hz (`FREQ:STOP`).
pub const ATTR_STOP_FREQUENCY: AttrId = AttrId(1004);
/// Reference level in dBm, per window.
pub const ATTR_REFERENCE_LEVEL: AttrId = AttrId(1005);
/// Reference level offset in dB, per window.
pub const ATTR_REFERENCE_LEVEL_OFFSET: AttrId = AttrId(1006);
/// Resolution bandwidth in Hz (`BAND`).
pub const ATTR_RESOLUTION_BANDWIDTH: AttrId = AttrId(1007);
/// Resolution bandwidth auto coupling (`BAND:AUTO`).
pub const ATTR_RESOLUTION_BANDWIDTH_AUTO: AttrId = AttrId(1008);
/// Video bandwidth in Hz (`BAND:VID`).
pub const ATTR_VIDEO_BANDWIDTH: AttrId = AttrId(1009);
/// Video bandwidth auto coupling (`BAND:VID:AUTO`).
pub const ATTR_VIDEO_BANDWIDTH_AUTO: AttrId = AttrId(1010);
/// Sweep time in seconds (`SWE:TIME`).
pub const ATTR_SWEEP_TIME: AttrId = AttrId(1011);
/// Sweep time auto coupling (`SWE:TIME:AUTO`).
pub const ATTR_SWEEP_TIME_AUTO: AttrId = AttrId(1012);
/// Number of sweep points (`SWE:POIN`).
pub const ATTR_SWEEP_POINTS: AttrId = AttrId(1013);
/// Sweep/average count (`SWE:COUN`).
pub const ATTR_SWEEP_COUNT: AttrId = AttrId(1014);
/// Continuous-sweep state (`INIT:CONT`).
pub const ATTR_SWEEP_CONTINUOUS: AttrId = AttrId(1015);
/// Start a sweep (`INIT`).
pub const ATTR_INIT: AttrId = AttrId(1016);
/// Mechanical attenuation in dB (`INP:ATT`).
pub const ATTR_ATTENUATION: AttrId = AttrId(1017);
/// Attenuation auto coupling (`INP:ATT:AUTO`).
pub const ATTR_ATTENUATION_AUTO: AttrId = AttrId(1018);
/// Preamplifier state (`INP:GAIN:STAT`).
pub const ATTR_PREAMPLIFIER: AttrId = AttrId(1019);
/// Detector per trace (`DET{trace}`).
pub const ATTR_DETECTOR: AttrId = AttrId(1020);
/// Trace display mode, per window and trace.
pub const ATTR_TRACE_MODE: AttrId = AttrId(1021);
/// Trace display state, per window and trace.
pub const ATTR_TRACE_STATE: AttrId = AttrId(1022);
/// Marker state, per window and marker.
pub const ATTR_MARKER_STATE: AttrId = AttrId(1023);
/// Marker stimulus position, per window and marker.
pub const ATTR_MARKER_POSITION: AttrId = AttrId(1024);
/// Marker amplitude readout, per window and marker (query only).
pub const ATTR_MARKER_AMPLITUDE: AttrId = AttrId(1025);
/// Move a marker to the trace peak.
pub const ATTR_MARKER_TO_PEAK: AttrId = AttrId(1026);
/// Move a marker to the next-lower peak.
pub const ATTR_MARKER_NEXT_PEAK: AttrId = AttrId(1027);
/// Trigger source (`TRIG:SOUR`); the legal token set is model-dependent.
pub const ATTR_TRIGGER_SOURCE: AttrId = AttrId(1028);
/// External trigger level in volts (`TRIG:LEV`).
pub const ATTR_TRIGGER_LEVEL_EXTERNAL: AttrId = AttrId(1029);
/// Trigger slope (`TRIG:SLOP`).
pub const ATTR_TRIGGER_SLOPE: AttrId = AttrId(1030);
/// Reference oscillator source (`ROSC:SOUR`).
pub const ATTR_REFERENCE_OSCILLATOR: AttrId = AttrId(1031);
/// Limit line state, per window and limit index.
pub const ATTR_LIMIT_STATE: AttrId = AttrId(1032);
/// Limit check verdict, per window and limit index (query only).
pub const ATTR_LIMIT_CHECK_RESULT: AttrId = AttrId(1033);
/// Display update during remote control (`SYST:DISP:UPD`).
pub const ATTR_DISPLAY_UPDATE: AttrId = AttrId(1034);
/// Display window state (`DISP:WIND<n>:STAT`).
pub const ATTR_WINDOW_STATE: AttrId = AttrId(1035);
/// Delta marker state, per window and marker.
pub const ATTR_DELTA_MARKER_STATE: AttrId = AttrId(1036);
/// Delta marker position relative to marker 1, per window and marker.
pub const ATTR_DELTA_MARKER_POSITION: AttrId = AttrId(1037);
/// Delta marker amplitude readout, per window and marker (query only).
pub const ATTR_DELTA_MARKER_AMPLITUDE: AttrId = AttrId(1038);
/// Limit line name, per window and limit index.
pub const ATTR_LIMIT_NAME: AttrId = AttrId(1039);

// =============================================================================
// Range tables
// =============================================================================

const FREQUENCY_RANGE: RangeTable = RangeTable::Continuous {
    min: 0.0,
    max: 110e9,
};
const LEVEL_RANGE: RangeTable = RangeTable::Continuous {
    min: -130.0,
    max: 30.0,
};
const LEVEL_OFFSET_RANGE: RangeTable = RangeTable::Continuous {
    min: -200.0,
    max: 200.0,
};
const BANDWIDTH_RANGE: RangeTable = RangeTable::Continuous {
    min: 1.0,
    max: 10e6,
};
const SWEEP_TIME_RANGE: RangeTable = RangeTable::Continuous {
    min: 1e-6,
    max: 16_000.0,
};
const SWEEP_POINTS_RANGE: RangeTable = RangeTable::Continuous {
    min: 101.0,
    max: 100_001.0,
};
const SWEEP_COUNT_RANGE: RangeTable = RangeTable::Continuous {
    min: 0.0,
    max: 32_767.0,
};
const ATTENUATION_RANGE: RangeTable = RangeTable::Continuous { min: 0.0, max: 79.0 };
const DELTA_POSITION_RANGE: RangeTable = RangeTable::Continuous {
    min: -110e9,
    max: 110e9,
};
const TRIGGER_LEVEL_RANGE: RangeTable = RangeTable::Continuous { min: 0.5, max: 3.5 };

const DETECTORS: RangeTable = RangeTable::Discrete(&[
    entry(0.0, "APE"),
    entry(1.0, "POS"),
    entry(2.0, "NEG"),
    entry(3.0, "SAMP"),
    entry(4.0, "RMS"),
    entry(5.0, "AVER"),
    entry(6.0, "QPE"),
]);

const TRACE_MODES: RangeTable = RangeTable::Discrete(&[
    entry(0.0, "WRIT"),
    entry(1.0, "VIEW"),
    entry(2.0, "AVER"),
    entry(3.0, "MAXH"),
    entry(4.0, "MINH"),
    entry(5.0, "BLAN"),
]);

// FSV-class front ends have a single external trigger input; the newer
// families add the trigger 2/3 ports.
const TRIGGER_SOURCES_DEFAULT: RangeTable = RangeTable::Discrete(&[
    entry(0.0, "IMM"),
    entry(1.0, "EXT"),
    entry(2.0, "VID"),
    entry(3.0, "IFP"),
    entry(4.0, "TIME"),
    entry(5.0, "EXT2"),
    entry(6.0, "EXT3"),
]);
const TRIGGER_SOURCES_FSV: RangeTable = RangeTable::Discrete(&[
    entry(0.0, "IMM"),
    entry(1.0, "EXT"),
    entry(2.0, "VID"),
    entry(3.0, "IFP"),
    entry(4.0, "TIME"),
]);
const TRIGGER_SOURCE_VARIANTS: &[(&str, &RangeTable)] = &[("FSV", &TRIGGER_SOURCES_FSV)];

const TRIGGER_SLOPES: RangeTable =
    RangeTable::Discrete(&[entry(0.0, "POS"), entry(1.0, "NEG")]);

const REFERENCE_OSCILLATORS: RangeTable = RangeTable::Discrete(&[
    entry(0.0, "INT"),
    entry(1.0, "EXT"),
    entry(2.0, "EAUT"),
]);

// =============================================================================
// Attribute table
// =============================================================================

pub(crate) const ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::new(
        ATTR_CENTER_FREQUENCY,
        "CENTER_FREQUENCY",
        "FREQ:CENT",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&FREQUENCY_RANGE)),
    AttributeDescriptor::new(
        ATTR_FREQUENCY_SPAN,
        "FREQUENCY_SPAN",
        "FREQ:SPAN",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&FREQUENCY_RANGE)),
    AttributeDescriptor::new(
        ATTR_START_FREQUENCY,
        "START_FREQUENCY",
        "FREQ:STAR",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&FREQUENCY_RANGE)),
    AttributeDescriptor::new(
        ATTR_STOP_FREQUENCY,
        "STOP_FREQUENCY",
        "FREQ:STOP",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&FREQUENCY_RANGE)),
    AttributeDescriptor::new(
        ATTR_REFERENCE_LEVEL,
        "REFERENCE_LEVEL",
        "DISP:WIND{window}:TRAC:Y:SCAL:RLEV",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_capabilities()
    .with_range(RangeSpec::Fixed(&LEVEL_RANGE)),
    AttributeDescriptor::new(
        ATTR_REFERENCE_LEVEL_OFFSET,
        "REFERENCE_LEVEL_OFFSET",
        "DISP:WIND{window}:TRAC:Y:SCAL:RLEV:OFFS",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_capabilities()
    .with_range(RangeSpec::Fixed(&LEVEL_OFFSET_RANGE)),
    AttributeDescriptor::new(
        ATTR_RESOLUTION_BANDWIDTH,
        "RESOLUTION_BANDWIDTH",
        "BAND",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&BANDWIDTH_RANGE)),
    AttributeDescriptor::new(
        ATTR_RESOLUTION_BANDWIDTH_AUTO,
        "RESOLUTION_BANDWIDTH_AUTO",
        "BAND:AUTO",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(
        ATTR_VIDEO_BANDWIDTH,
        "VIDEO_BANDWIDTH",
        "BAND:VID",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&BANDWIDTH_RANGE)),
    AttributeDescriptor::new(
        ATTR_VIDEO_BANDWIDTH_AUTO,
        "VIDEO_BANDWIDTH_AUTO",
        "BAND:VID:AUTO",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(
        ATTR_SWEEP_TIME,
        "SWEEP_TIME",
        "SWE:TIME",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&SWEEP_TIME_RANGE)),
    AttributeDescriptor::new(
        ATTR_SWEEP_TIME_AUTO,
        "SWEEP_TIME_AUTO",
        "SWE:TIME:AUTO",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(
        ATTR_SWEEP_POINTS,
        "SWEEP_POINTS",
        "SWE:POIN",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&SWEEP_POINTS_RANGE)),
    AttributeDescriptor::new(
        ATTR_SWEEP_COUNT,
        "SWEEP_COUNT",
        "SWE:COUN",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&SWEEP_COUNT_RANGE)),
    AttributeDescriptor::new(
        ATTR_SWEEP_CONTINUOUS,
        "SWEEP_CONTINUOUS",
        "INIT:CONT",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(ATTR_INIT, "INIT", "INIT", DataType::Event, Access::WriteOnly),
    AttributeDescriptor::new(
        ATTR_ATTENUATION,
        "ATTENUATION",
        "INP:ATT",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&ATTENUATION_RANGE)),
    AttributeDescriptor::new(
        ATTR_ATTENUATION_AUTO,
        "ATTENUATION_AUTO",
        "INP:ATT:AUTO",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(
        ATTR_PREAMPLIFIER,
        "PREAMPLIFIER",
        "INP:GAIN:STAT",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(
        ATTR_DETECTOR,
        "DETECTOR",
        "DET{trace}",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_capabilities()
    .with_range(RangeSpec::Fixed(&DETECTORS)),
    AttributeDescriptor::new(
        ATTR_TRACE_MODE,
        "TRACE_MODE",
        "DISP:WIND{window}:TRAC{trace}:MODE",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_capabilities()
    .with_range(RangeSpec::Fixed(&TRACE_MODES)),
    AttributeDescriptor::new(
        ATTR_TRACE_STATE,
        "TRACE_STATE",
        "DISP:WIND{window}:TRAC{trace}",
        DataType::Bool,
        Access::ReadWrite,
    )
    .with_capabilities(),
    AttributeDescriptor::new(
        ATTR_MARKER_STATE,
        "MARKER_STATE",
        "CALC{window}:MARK{marker}",
        DataType::Bool,
        Access::ReadWrite,
    )
    .with_capabilities(),
    AttributeDescriptor::new(
        ATTR_MARKER_POSITION,
        "MARKER_POSITION",
        "CALC{window}:MARK{marker}:X",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_capabilities()
    .with_range(RangeSpec::Fixed(&FREQUENCY_RANGE)),
    AttributeDescriptor::new(
        ATTR_MARKER_AMPLITUDE,
        "MARKER_AMPLITUDE",
        "CALC{window}:MARK{marker}:Y",
        DataType::Real,
        Access::ReadOnly,
    )
    .with_capabilities(),
    AttributeDescriptor::new(
        ATTR_MARKER_TO_PEAK,
        "MARKER_TO_PEAK",
        "CALC{window}:MARK{marker}:MAX",
        DataType::Event,
        Access::WriteOnly,
    )
    .with_capabilities(),
    AttributeDescriptor::new(
        ATTR_MARKER_NEXT_PEAK,
        "MARKER_NEXT_PEAK",
        "CALC{window}:MARK{marker}:MAX:NEXT",
        DataType::Event,
        Access::WriteOnly,
    )
    .with_capabilities(),
    AttributeDescriptor::new(
        ATTR_TRIGGER_SOURCE,
        "TRIGGER_SOURCE",
        "TRIG:SOUR",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::PerModel {
        variants: TRIGGER_SOURCE_VARIANTS,
        default: &TRIGGER_SOURCES_DEFAULT,
    }),
    AttributeDescriptor::new(
        ATTR_TRIGGER_LEVEL_EXTERNAL,
        "TRIGGER_LEVEL_EXTERNAL",
        "TRIG:LEV",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&TRIGGER_LEVEL_RANGE)),
    AttributeDescriptor::new(
        ATTR_TRIGGER_SLOPE,
        "TRIGGER_SLOPE",
        "TRIG:SLOP",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&TRIGGER_SLOPES)),
    AttributeDescriptor::new(
        ATTR_REFERENCE_OSCILLATOR,
        "REFERENCE_OSCILLATOR",
        "ROSC:SOUR",
        DataType::Int,
        Access::ReadWrite,
    )
    .with_range(RangeSpec::Fixed(&REFERENCE_OSCILLATORS)),
    AttributeDescriptor::new(
        ATTR_LIMIT_STATE,
        "LIMIT_STATE",
        "CALC{window}:LIM{limit}:STAT",
        DataType::Bool,
        Access::ReadWrite,
    )
    .with_capabilities(),
    AttributeDescriptor::new(
        ATTR_LIMIT_CHECK_RESULT,
        "LIMIT_CHECK_RESULT",
        "CALC{window}:LIM{limit}:FAIL",
        DataType::Bool,
        Access::ReadOnly,
    )
    .with_capabilities(),
    AttributeDescriptor::new(
        ATTR_DISPLAY_UPDATE,
        "DISPLAY_UPDATE",
        "SYST:DISP:UPD",
        DataType::Bool,
        Access::ReadWrite,
    ),
    AttributeDescriptor::new(
        ATTR_WINDOW_STATE,
        "WINDOW_STATE",
        "DISP:WIND{window}:STAT",
        DataType::Bool,
        Access::ReadWrite,
    )
    .with_capabilities(),
    AttributeDescriptor::new(
        ATTR_DELTA_MARKER_STATE,
        "DELTA_MARKER_STATE",
        "CALC{window}:DELT{marker}",
        DataType::Bool,
        Access::ReadWrite,
    )
    .with_capabilities(),
    AttributeDescriptor::new(
        ATTR_DELTA_MARKER_POSITION,
        "DELTA_MARKER_POSITION",
        "CALC{window}:DELT{marker}:X",
        DataType::Real,
        Access::ReadWrite,
    )
    .with_capabilities()
    .with_range(RangeSpec::Fixed(&DELTA_POSITION_RANGE)),
    AttributeDescriptor::new(
        ATTR_DELTA_MARKER_AMPLITUDE,
        "DELTA_MARKER_AMPLITUDE",
        "CALC{window}:DELT{marker}:Y",
        DataType::Real,
        Access::ReadOnly,
    )
    .with_capabilities(),
    AttributeDescriptor::new(
        ATTR_LIMIT_NAME,
        "LIMIT_NAME",
        "CALC{window}:LIM{limit}:NAME",
        DataType::Text,
        Access::ReadWrite,
    )
    .with_capabilities(),
];

// =============================================================================
// Public enumerations
// =============================================================================

/// Trace detector selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detector {
    /// Auto-peak (positive and negative).
    AutoPeak = 0,
    /// Positive peak.
    PositivePeak = 1,
    /// Negative peak.
    NegativePeak = 2,
    /// Sample.
    Sample = 3,
    /// RMS.
    Rms = 4,
    /// Average.
    Average = 5,
    /// Quasi-peak (EMI).
    QuasiPeak = 6,
}

/// Trace display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    /// Clear/write.
    Write = 0,
    /// Frozen view.
    View = 1,
    /// Averaging.
    Average = 2,
    /// Max hold.
    MaxHold = 3,
    /// Min hold.
    MinHold = 4,
    /// Blanked.
    Blank = 5,
}

/// Trigger source. `ExternalPort2`/`ExternalPort3` exist only on families
/// with the extra trigger ports; elsewhere the range table rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// Free run.
    Immediate = 0,
    /// External trigger input 1.
    External = 1,
    /// Video trigger.
    Video = 2,
    /// IF power trigger.
    IfPower = 3,
    /// Time trigger.
    Time = 4,
    /// External trigger input 2.
    ExternalPort2 = 5,
    /// External trigger input 3.
    ExternalPort3 = 6,
}

/// Trigger slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSlope {
    /// Rising edge.
    Positive = 0,
    /// Falling edge.
    Negative = 1,
}

/// Reference oscillator source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceOscillator {
    /// Internal OCXO.
    Internal = 0,
    /// External reference input.
    External = 1,
    /// External with automatic fallback.
    ExternalAuto = 2,
}

// =============================================================================
// Index guards
// =============================================================================

pub(crate) fn check_window(window: u32, position: u8) -> DriverResult<()> {
    if (1..=16).contains(&window) {
        Ok(())
    } else {
        Err(DriverError::InvalidParameter {
            position,
            name: "window",
        })
    }
}

pub(crate) fn check_trace(trace: u32, position: u8) -> DriverResult<()> {
    if (1..=6).contains(&trace) {
        Ok(())
    } else {
        Err(DriverError::InvalidParameter {
            position,
            name: "trace",
        })
    }
}

pub(crate) fn check_marker(marker: u32, position: u8) -> DriverResult<()> {
    if (1..=16).contains(&marker) {
        Ok(())
    } else {
        Err(DriverError::InvalidParameter {
            position,
            name: "marker",
        })
    }
}

pub(crate) fn check_limit(limit: u32, position: u8) -> DriverResult<()> {
    if (1..=8).contains(&limit) {
        Ok(())
    } else {
        Err(DriverError::InvalidParameter {
            position,
            name: "limit",
        })
    }
}

// =============================================================================
// Base operations
// =============================================================================

impl SpectrumAnalyzer {
    /// Set the center frequency in Hz.
    pub async fn configure_frequency_center(&self, frequency: f64) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_real(self.session(), &ctx, ATTR_CENTER_FREQUENCY, frequency).await?;
        self.session().check_status().await
    }

    /// Set the frequency span in Hz. A span of `0.0` selects zero-span mode.
    pub async fn configure_frequency_span(&self, span: f64) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_real(self.session(), &ctx, ATTR_FREQUENCY_SPAN, span).await?;
        self.session().check_status().await
    }

    /// Set center frequency and span in one call.
    pub async fn configure_frequency_center_span(
        &self,
        center: f64,
        span: f64,
    ) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_real(self.session(), &ctx, ATTR_CENTER_FREQUENCY, center).await?;
        engine::set_real(self.session(), &ctx, ATTR_FREQUENCY_SPAN, span).await?;
        self.session().check_status().await
    }

    /// Set the sweep range by start and stop frequency.
    pub async fn configure_frequency_start_stop(
        &self,
        start: f64,
        stop: f64,
    ) -> DriverResult<()> {
        if stop <= start {
            return Err(DriverError::InvalidParameter {
                position: 2,
                name: "stop",
            });
        }
        let ctx = CapabilityContext::none();
        engine::set_real(self.session(), &ctx, ATTR_START_FREQUENCY, start).await?;
        engine::set_real(self.session(), &ctx, ATTR_STOP_FREQUENCY, stop).await?;
        self.session().check_status().await
    }

    /// Set the reference level (dBm) of one display window.
    pub async fn configure_reference_level(&self, window: u32, level: f64) -> DriverResult<()> {
        check_window(window, 1)?;
        let ctx = CapabilityContext::new().with_index(window);
        engine::set_real(self.session(), &ctx, ATTR_REFERENCE_LEVEL, level).await?;
        self.session().check_status().await
    }

    /// Set the reference level offset (dB) of one display window.
    pub async fn configure_reference_level_offset(
        &self,
        window: u32,
        offset: f64,
    ) -> DriverResult<()> {
        check_window(window, 1)?;
        let ctx = CapabilityContext::new().with_index(window);
        engine::set_real(self.session(), &ctx, ATTR_REFERENCE_LEVEL_OFFSET, offset).await?;
        self.session().check_status().await
    }

    /// Set the resolution bandwidth in Hz (disables auto coupling first).
    pub async fn configure_resolution_bandwidth(&self, bandwidth: f64) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session(), &ctx, ATTR_RESOLUTION_BANDWIDTH_AUTO, false).await?;
        engine::set_real(self.session(), &ctx, ATTR_RESOLUTION_BANDWIDTH, bandwidth).await?;
        self.session().check_status().await
    }

    /// Re-enable resolution bandwidth auto coupling.
    pub async fn configure_resolution_bandwidth_auto(&self) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session(), &ctx, ATTR_RESOLUTION_BANDWIDTH_AUTO, true).await?;
        self.session().check_status().await
    }

    /// Set the video bandwidth in Hz (disables auto coupling first).
    pub async fn configure_video_bandwidth(&self, bandwidth: f64) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session(), &ctx, ATTR_VIDEO_BANDWIDTH_AUTO, false).await?;
        engine::set_real(self.session(), &ctx, ATTR_VIDEO_BANDWIDTH, bandwidth).await?;
        self.session().check_status().await
    }

    /// Set the sweep time in seconds (disables auto coupling first).
    pub async fn configure_sweep_time(&self, time: f64) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session(), &ctx, ATTR_SWEEP_TIME_AUTO, false).await?;
        engine::set_real(self.session(), &ctx, ATTR_SWEEP_TIME, time).await?;
        self.session().check_status().await
    }

    /// Set the number of sweep points.
    pub async fn configure_sweep_points(&self, points: u32) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session(), &ctx, ATTR_SWEEP_POINTS, i64::from(points)).await?;
        self.session().check_status().await
    }

    /// Set the sweep count used by averaging and min/max hold.
    pub async fn configure_sweep_count(&self, count: u32) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session(), &ctx, ATTR_SWEEP_COUNT, i64::from(count)).await?;
        self.session().check_status().await
    }

    /// Select continuous or single-sweep mode.
    pub async fn configure_continuous_sweep(&self, continuous: bool) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session(), &ctx, ATTR_SWEEP_CONTINUOUS, continuous).await?;
        self.session().check_status().await
    }

    /// Start a sweep without waiting for it.
    pub async fn initiate(&self) -> DriverResult<()> {
        engine::send_event(self.session(), &CapabilityContext::none(), ATTR_INIT).await
    }

    /// Start a sweep and block until the instrument reports completion,
    /// under the session's OPC timeout.
    pub async fn initiate_and_wait(&self) -> DriverResult<()> {
        self.initiate().await?;
        self.session().wait_for_opc().await
    }

    /// Abort a running sweep.
    pub async fn abort_measurement(&self) -> DriverResult<()> {
        self.session().write("ABOR").await
    }

    /// Set the mechanical attenuation in dB (disables auto coupling first).
    pub async fn configure_attenuation(&self, attenuation: f64) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session(), &ctx, ATTR_ATTENUATION_AUTO, false).await?;
        engine::set_real(self.session(), &ctx, ATTR_ATTENUATION, attenuation).await?;
        self.session().check_status().await
    }

    /// Switch the preamplifier on or off.
    pub async fn configure_preamplifier(&self, enabled: bool) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session(), &ctx, ATTR_PREAMPLIFIER, enabled).await?;
        self.session().check_status().await
    }

    /// Select the detector for one trace.
    pub async fn configure_detector(&self, trace: u32, detector: Detector) -> DriverResult<()> {
        check_trace(trace, 1)?;
        let ctx = CapabilityContext::new().with_index(trace);
        engine::set_int(self.session(), &ctx, ATTR_DETECTOR, detector as i64).await?;
        self.session().check_status().await
    }

    /// Set the display mode of one trace.
    pub async fn configure_trace_mode(
        &self,
        window: u32,
        trace: u32,
        mode: TraceMode,
    ) -> DriverResult<()> {
        check_window(window, 1)?;
        check_trace(trace, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(trace);
        engine::set_int(self.session(), &ctx, ATTR_TRACE_MODE, mode as i64).await?;
        self.session().check_status().await
    }

    /// Show or hide one trace.
    pub async fn configure_trace_state(
        &self,
        window: u32,
        trace: u32,
        visible: bool,
    ) -> DriverResult<()> {
        check_window(window, 1)?;
        check_trace(trace, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(trace);
        engine::set_bool(self.session(), &ctx, ATTR_TRACE_STATE, visible).await?;
        self.session().check_status().await
    }

    /// Enable or disable one marker.
    pub async fn configure_marker_state(
        &self,
        window: u32,
        marker: u32,
        enabled: bool,
    ) -> DriverResult<()> {
        check_window(window, 1)?;
        check_marker(marker, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(marker);
        engine::set_bool(self.session(), &ctx, ATTR_MARKER_STATE, enabled).await?;
        self.session().check_status().await
    }

    /// Place a marker at a stimulus position (Hz, or seconds in zero span).
    pub async fn configure_marker_position(
        &self,
        window: u32,
        marker: u32,
        position: f64,
    ) -> DriverResult<()> {
        check_window(window, 1)?;
        check_marker(marker, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(marker);
        engine::set_real(self.session(), &ctx, ATTR_MARKER_POSITION, position).await?;
        self.session().check_status().await
    }

    /// Read a marker's amplitude (dBm).
    pub async fn query_marker_amplitude(&self, window: u32, marker: u32) -> DriverResult<f64> {
        check_window(window, 1)?;
        check_marker(marker, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(marker);
        engine::get_real(self.session(), &ctx, ATTR_MARKER_AMPLITUDE).await
    }

    /// Move a marker to the highest trace peak.
    pub async fn marker_search_peak(&self, window: u32, marker: u32) -> DriverResult<()> {
        check_window(window, 1)?;
        check_marker(marker, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(marker);
        engine::send_event(self.session(), &ctx, ATTR_MARKER_TO_PEAK).await
    }

    /// Move a marker to the next-lower peak.
    pub async fn marker_search_next_peak(&self, window: u32, marker: u32) -> DriverResult<()> {
        check_window(window, 1)?;
        check_marker(marker, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(marker);
        engine::send_event(self.session(), &ctx, ATTR_MARKER_NEXT_PEAK).await
    }

    /// Configure the trigger source and slope.
    pub async fn configure_trigger(
        &self,
        source: TriggerSource,
        slope: TriggerSlope,
    ) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session(), &ctx, ATTR_TRIGGER_SOURCE, source as i64).await?;
        engine::set_int(self.session(), &ctx, ATTR_TRIGGER_SLOPE, slope as i64).await?;
        self.session().check_status().await
    }

    /// Set the external trigger level in volts.
    pub async fn configure_external_trigger_level(&self, level: f64) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_real(self.session(), &ctx, ATTR_TRIGGER_LEVEL_EXTERNAL, level).await?;
        self.session().check_status().await
    }

    /// Select the frequency reference source.
    pub async fn configure_reference_oscillator(
        &self,
        source: ReferenceOscillator,
    ) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_int(self.session(), &ctx, ATTR_REFERENCE_OSCILLATOR, source as i64).await?;
        self.session().check_status().await
    }

    /// Enable or disable one limit line.
    pub async fn configure_limit_state(
        &self,
        window: u32,
        limit: u32,
        enabled: bool,
    ) -> DriverResult<()> {
        check_window(window, 1)?;
        check_limit(limit, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(limit);
        engine::set_bool(self.session(), &ctx, ATTR_LIMIT_STATE, enabled).await?;
        self.session().check_status().await
    }

    /// Name one limit line (quoted on the wire per R&S convention).
    pub async fn configure_limit_name(
        &self,
        window: u32,
        limit: u32,
        name: &str,
    ) -> DriverResult<()> {
        check_window(window, 1)?;
        check_limit(limit, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(limit);
        engine::set_text(self.session(), &ctx, ATTR_LIMIT_NAME, name).await?;
        self.session().check_status().await
    }

    /// Query one limit check: `true` means the limit FAILED.
    pub async fn query_limit_check(&self, window: u32, limit: u32) -> DriverResult<bool> {
        check_window(window, 1)?;
        check_limit(limit, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(limit);
        engine::get_bool(self.session(), &ctx, ATTR_LIMIT_CHECK_RESULT).await
    }

    /// Enable or disable display updates during remote control.
    pub async fn configure_display_update(&self, enabled: bool) -> DriverResult<()> {
        let ctx = CapabilityContext::none();
        engine::set_bool(self.session(), &ctx, ATTR_DISPLAY_UPDATE, enabled).await?;
        self.session().check_status().await
    }

    /// Show or hide one display window.
    pub async fn configure_window_state(&self, window: u32, visible: bool) -> DriverResult<()> {
        check_window(window, 1)?;
        let ctx = CapabilityContext::new().with_index(window);
        engine::set_bool(self.session(), &ctx, ATTR_WINDOW_STATE, visible).await?;
        self.session().check_status().await
    }

    /// Enable or disable one delta marker.
    pub async fn configure_delta_marker_state(
        &self,
        window: u32,
        marker: u32,
        enabled: bool,
    ) -> DriverResult<()> {
        check_window(window, 1)?;
        check_marker(marker, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(marker);
        engine::set_bool(self.session(), &ctx, ATTR_DELTA_MARKER_STATE, enabled).await?;
        self.session().check_status().await
    }

    /// Place a delta marker relative to the reference marker.
    pub async fn configure_delta_marker_position(
        &self,
        window: u32,
        marker: u32,
        offset: f64,
    ) -> DriverResult<()> {
        check_window(window, 1)?;
        check_marker(marker, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(marker);
        engine::set_real(self.session(), &ctx, ATTR_DELTA_MARKER_POSITION, offset).await?;
        self.session().check_status().await
    }

    /// Read a delta marker's amplitude difference (dB).
    pub async fn query_delta_marker_amplitude(
        &self,
        window: u32,
        marker: u32,
    ) -> DriverResult<f64> {
        check_window(window, 1)?;
        check_marker(marker, 2)?;
        let ctx = CapabilityContext::new().with_index(window).with_index(marker);
        engine::get_real(self.session(), &ctx, ATTR_DELTA_MARKER_AMPLITUDE).await
    }

    /// Fetch one trace as ASCII CSV data.
    pub async fn query_trace_data(&self, window: u32, trace: u32) -> DriverResult<Vec<f64>> {
        check_window(window, 1)?;
        check_trace(trace, 2)?;
        self.session().write("FORM ASC").await?;
        let raw = self
            .session()
            .query(&format!("TRAC{window}:DATA? TRACE{trace}"))
            .await?;
        parse_csv_reals(&raw)
    }

    /// Fetch one trace as an IEEE-488.2 `REAL,32` definite-length block.
    pub async fn query_trace_data_binary(
        &self,
        window: u32,
        trace: u32,
    ) -> DriverResult<Vec<f64>> {
        check_window(window, 1)?;
        check_trace(trace, 2)?;
        self.session().write("FORM REAL,32").await?;
        let raw = self
            .session()
            .query_binary(&format!("TRAC{window}:DATA? TRACE{trace}"))
            .await?;
        parse_block_f32(&raw)
    }

    /// Run the instrument self test; `0` means pass.
    pub async fn self_test(&self) -> DriverResult<i64> {
        let raw = self.session().query("*TST?").await?;
        parse_int(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::Session;
    use crate::transport::{CommandLog, MockTransport};

    async fn analyzer_with_log() -> (SpectrumAnalyzer, CommandLog) {
        let mock = MockTransport::new();
        let log = mock.command_log();
        let config = SessionConfig {
            check_instrument_status: false,
            ..SessionConfig::default()
        };
        let analyzer = SpectrumAnalyzer::open(Box::new(mock), &config).await.unwrap();
        log.take();
        (analyzer, log)
    }

    #[tokio::test]
    async fn start_stop_orders_are_validated_locally() {
        let (analyzer, log) = analyzer_with_log().await;

        let err = analyzer
            .configure_frequency_start_stop(2e9, 1e9)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidParameter { position: 2, name: "stop" }
        ));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn bandwidth_configure_disables_auto_first() {
        let (analyzer, log) = analyzer_with_log().await;

        analyzer.configure_resolution_bandwidth(30e3).await.unwrap();
        assert_eq!(
            log.take(),
            vec!["BAND:AUTO OFF", "BAND 30000.000000000000"]
        );
    }

    #[tokio::test]
    async fn marker_index_is_validated_before_io() {
        let (analyzer, log) = analyzer_with_log().await;

        let err = analyzer.configure_marker_state(1, 17, true).await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidParameter { position: 2, name: "marker" }
        ));
        assert!(log.take().is_empty());
    }

    #[tokio::test]
    async fn trigger_source_table_depends_on_model() {
        // Default FSW mock: port-3 trigger is legal.
        let (analyzer, log) = analyzer_with_log().await;
        analyzer
            .configure_trigger(TriggerSource::ExternalPort3, TriggerSlope::Negative)
            .await
            .unwrap();
        assert_eq!(log.take(), vec!["TRIG:SOUR EXT3", "TRIG:SLOP NEG"]);

        // FSV: the same selection is rejected by the model variant table.
        let mock =
            MockTransport::new().with_identity("Rohde&Schwarz,FSV-30,101234/567,2.30");
        let fsv_log = mock.command_log();
        let config = SessionConfig {
            check_instrument_status: false,
            ..SessionConfig::default()
        };
        let fsv = SpectrumAnalyzer::open(Box::new(mock), &config).await.unwrap();
        fsv_log.take();

        let err = fsv
            .configure_trigger(TriggerSource::ExternalPort3, TriggerSlope::Negative)
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidValue { .. }));
        assert!(fsv_log.take().is_empty());
    }

    #[tokio::test]
    async fn trace_fetch_parses_csv() {
        let mock = MockTransport::new().with_reply("TRAC1:DATA? TRACE1", "-80.5,-79.25,-75.0");
        let config = SessionConfig {
            check_instrument_status: false,
            ..SessionConfig::default()
        };
        let analyzer = SpectrumAnalyzer::open(Box::new(mock), &config).await.unwrap();

        let trace = analyzer.query_trace_data(1, 1).await.unwrap();
        assert_eq!(trace, vec![-80.5, -79.25, -75.0]);
    }

    #[tokio::test]
    async fn binary_trace_fetch_parses_block() {
        // Mock replies travel as strings, so use a payload whose four bytes
        // per sample are printable ASCII.
        let sample = f64::from(f32::from_le_bytes(*b"@@@@"));
        let mock = MockTransport::new().with_reply("TRAC1:DATA? TRACE1", "#18@@@@@@@@");
        let config = SessionConfig {
            check_instrument_status: false,
            ..SessionConfig::default()
        };
        let analyzer = SpectrumAnalyzer::open(Box::new(mock), &config).await.unwrap();

        let trace = analyzer.query_trace_data_binary(1, 1).await.unwrap();
        assert_eq!(trace, vec![sample, sample]);
    }
}
