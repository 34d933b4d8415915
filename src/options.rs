//! Generation-wide tolerances and switches.

/// Knobs that apply across the whole generation run rather than to any
/// single channel or element.
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    /// Two instants closer than this (seconds) are treated as equal when
    /// merging pulses and comparing layout boundaries.
    pub time_tolerance: f64,
    /// Pulses whose merged amplitude magnitude falls below this are dropped.
    pub amp_tolerance: f64,
    /// When `false`, an `Absolute` child (or grid cell) that extends past
    /// its allotted span is an [`crate::error::Error::Oversize`] instead of
    /// being silently truncated.
    pub allow_oversize: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            time_tolerance: 1e-12,
            amp_tolerance: 0.1 / 65536.0,
            allow_oversize: false,
        }
    }
}
