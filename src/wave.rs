//! Multichannel waveform output.

use std::collections::BTreeMap;

use num_complex::Complex64;

use crate::channel::Channel;
use crate::error::{Error, Result};

/// The generated output: one row of samples per channel, keyed by channel
/// name in deterministic (`BTreeMap`) order.
///
/// Complex channels keep both quadratures; real channels carry the in-phase
/// component only (checked against each [`Channel::is_real`] at
/// construction, not re-derived on every access).
#[derive(Debug, Clone)]
pub struct Waveform {
    rows: BTreeMap<String, Vec<Complex64>>,
    is_real: BTreeMap<String, bool>,
}

impl Waveform {
    pub(crate) fn new(
        channels: &BTreeMap<String, Channel>,
        samples: BTreeMap<String, Vec<Complex64>>,
    ) -> Result<Self> {
        let mut is_real = BTreeMap::new();
        for (name, channel) in channels {
            let row = samples
                .get(name)
                .ok_or_else(|| Error::Internal(format!("missing samples for channel {name:?}")))?;
            if row.len() != channel.length as usize {
                return Err(Error::Internal(format!(
                    "channel {name:?} produced {} samples, expected {}",
                    row.len(),
                    channel.length
                )));
            }
            is_real.insert(name.clone(), channel.is_real);
        }
        Ok(Self {
            rows: samples,
            is_real,
        })
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn is_real(&self, name: &str) -> Option<bool> {
        self.is_real.get(name).copied()
    }

    /// The raw complex row for `name`, regardless of whether the channel is
    /// real-valued (a real channel's imaginary component is always zero).
    pub fn row(&self, name: &str) -> Option<&[Complex64]> {
        self.rows.get(name).map(Vec::as_slice)
    }

    /// Every `(name, row)` pair, in channel-name order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Complex64])> {
        self.rows.iter().map(|(name, row)| (name.as_str(), row.as_slice()))
    }

    /// The real-projected row for a real-valued channel, or `None` if the
    /// channel is complex or unknown.
    pub fn real_row(&self, name: &str) -> Option<Vec<f64>> {
        if self.is_real(name) != Some(true) {
            return None;
        }
        self.rows.get(name).map(|row| row.iter().map(|s| s.re).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_channel_projects_to_its_in_phase_component() {
        let mut channels = BTreeMap::new();
        channels.insert(
            "rf".to_string(),
            Channel::new(0.0, 1e9, 2).unwrap().with_real(true).unwrap(),
        );
        let mut samples = BTreeMap::new();
        samples.insert("rf".to_string(), vec![Complex64::new(1.0, 9.0), Complex64::new(2.0, -9.0)]);
        let waveform = Waveform::new(&channels, samples).unwrap();
        assert_eq!(waveform.real_row("rf"), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn complex_channel_has_no_real_projection() {
        let mut channels = BTreeMap::new();
        channels.insert("xy".to_string(), Channel::new(0.0, 1e9, 1).unwrap());
        let mut samples = BTreeMap::new();
        samples.insert("xy".to_string(), vec![Complex64::new(1.0, 2.0)]);
        let waveform = Waveform::new(&channels, samples).unwrap();
        assert_eq!(waveform.real_row("xy"), None);
    }
}
