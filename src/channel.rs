//! Output channel configuration.

use crate::error::Error;

/// An output channel: its own sample rate, carrier frequency, length, and
/// optional analog-correction filters and IQ calibration.
///
/// Constructed through [`Channel::new`] and the `with_*` builders rather
/// than public fields, so that the real/complex invariants below are
/// enforced once, at construction, instead of being re-checked on every
/// call into [`crate::generate_waveforms`].
#[derive(Debug, Clone)]
pub struct Channel {
    pub base_freq: f64,
    pub sample_rate: f64,
    pub length: u32,
    pub delay: f64,
    pub align_level: i32,
    pub(crate) iq_matrix: Option<[[f64; 2]; 2]>,
    pub(crate) offset: Option<Vec<f64>>,
    pub(crate) iir: Vec<[f64; 6]>,
    pub(crate) fir: Vec<f64>,
    pub filter_offset: bool,
    pub is_real: bool,
}

impl Channel {
    /// Construct a channel with default delay (0), align level (-10), no
    /// filters, no calibration, and `is_real = false`.
    pub fn new(base_freq: f64, sample_rate: f64, length: u32) -> Result<Self, Error> {
        if !base_freq.is_finite() || !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(Error::InvalidInput(
                "channel base_freq and sample_rate must be finite, sample_rate > 0".into(),
            ));
        }
        Ok(Self {
            base_freq,
            sample_rate,
            length,
            delay: 0.0,
            align_level: -10,
            iq_matrix: None,
            offset: None,
            iir: Vec::new(),
            fir: Vec::new(),
            filter_offset: false,
            is_real: false,
        })
    }

    /// Mark this channel as real-valued output. A real channel cannot carry
    /// an IQ calibration matrix, and its offset (if any) must have exactly
    /// one component.
    pub fn with_real(mut self, is_real: bool) -> Result<Self, Error> {
        self.is_real = is_real;
        self.validate_real_invariant()?;
        Ok(self)
    }

    pub fn with_delay(mut self, delay: f64) -> Result<Self, Error> {
        if !delay.is_finite() {
            return Err(Error::InvalidInput("channel delay must be finite".into()));
        }
        self.delay = delay;
        Ok(self)
    }

    pub fn with_align_level(mut self, align_level: i32) -> Self {
        self.align_level = align_level;
        self
    }

    pub fn with_iq_matrix(mut self, matrix: [[f64; 2]; 2]) -> Result<Self, Error> {
        if self.is_real {
            return Err(Error::InvalidInput(
                "a real channel cannot carry an IQ calibration matrix".into(),
            ));
        }
        self.iq_matrix = Some(matrix);
        Ok(self)
    }

    pub fn with_offset(mut self, offset: Vec<f64>) -> Result<Self, Error> {
        self.offset = Some(offset);
        self.validate_real_invariant()?;
        Ok(self)
    }

    pub fn with_iir(mut self, sections: Vec<[f64; 6]>) -> Self {
        self.iir = sections;
        self
    }

    pub fn with_fir(mut self, taps: Vec<f64>) -> Self {
        self.fir = taps;
        self
    }

    pub fn with_filter_offset(mut self, filter_offset: bool) -> Self {
        self.filter_offset = filter_offset;
        self
    }

    pub fn iq_matrix(&self) -> Option<&[[f64; 2]; 2]> {
        self.iq_matrix.as_ref()
    }

    pub fn offset(&self) -> Option<&[f64]> {
        self.offset.as_deref()
    }

    pub fn iir(&self) -> &[[f64; 6]] {
        &self.iir
    }

    pub fn fir(&self) -> &[f64] {
        &self.fir
    }

    fn validate_real_invariant(&self) -> Result<(), Error> {
        if self.is_real {
            if self.iq_matrix.is_some() {
                return Err(Error::InvalidInput(
                    "a real channel cannot carry an IQ calibration matrix".into(),
                ));
            }
            if let Some(offset) = &self.offset {
                if offset.len() != 1 {
                    return Err(Error::InvalidInput(format!(
                        "a real channel's offset must have 1 component, got {}",
                        offset.len()
                    )));
                }
            }
        } else if let Some(offset) = &self.offset {
            if offset.len() != 2 {
                return Err(Error::InvalidInput(format!(
                    "a complex channel's offset must have 2 components, got {}",
                    offset.len()
                )));
            }
        }
        Ok(())
    }
}
