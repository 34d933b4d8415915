//! Post-processing DSP chain: crosstalk, offset, IIR/FIR filtering, and IQ
//! calibration.
//!
//! Every step except crosstalk is a pure per-channel map and runs data
//! parallel across channels with `rayon`; crosstalk reads every channel's
//! buffer to produce every other channel's, so it is the one synchronized,
//! sequential join in the chain.

use std::collections::BTreeMap;

use num_complex::Complex64;
use rayon::prelude::*;

use crate::channel::Channel;
use crate::error::{Error, Result};

/// A square cross-channel coupling matrix: `out[i] = sum_j matrix[i][j] *
/// in[j]`, elementwise across time.
#[derive(Debug, Clone)]
pub struct Crosstalk {
    channels: Vec<String>,
    matrix: Vec<Vec<f64>>,
}

impl Crosstalk {
    pub fn new(channels: Vec<String>, matrix: Vec<Vec<f64>>) -> Result<Self> {
        let n = channels.len();
        if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
            return Err(Error::InvalidInput(format!(
                "crosstalk matrix must be {n}x{n} for {n} channels"
            )));
        }
        Ok(Self { channels, matrix })
    }

    fn apply(&self, samples: &BTreeMap<String, Vec<Complex64>>) -> Result<BTreeMap<String, Vec<Complex64>>> {
        let buffers: Vec<&Vec<Complex64>> = self
            .channels
            .iter()
            .map(|name| {
                samples
                    .get(name)
                    .ok_or_else(|| Error::InvalidInput(format!("crosstalk references unknown channel {name:?}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let length = buffers.first().map(|b| b.len()).unwrap_or(0);
        if buffers.iter().any(|b| b.len() != length) {
            return Err(Error::Internal("crosstalk channels have mismatched lengths".into()));
        }

        let mixed: Vec<Vec<Complex64>> = (0..self.channels.len())
            .into_par_iter()
            .map(|i| {
                let mut out = vec![Complex64::new(0.0, 0.0); length];
                for (j, weight) in self.matrix[i].iter().enumerate() {
                    if *weight == 0.0 {
                        continue;
                    }
                    for (o, s) in out.iter_mut().zip(buffers[j].iter()) {
                        *o += *weight * s;
                    }
                }
                out
            })
            .collect();

        let mut result = samples.clone();
        for (name, buffer) in self.channels.iter().zip(mixed.into_iter()) {
            result.insert(name.clone(), buffer);
        }
        Ok(result)
    }
}

/// Run the whole post-processing chain in place.
pub fn run(
    channels: &BTreeMap<String, Channel>,
    samples: &mut BTreeMap<String, Vec<Complex64>>,
    crosstalk: Option<&Crosstalk>,
) -> Result<()> {
    if let Some(crosstalk) = crosstalk {
        *samples = crosstalk.apply(samples)?;
    }

    let names: Vec<String> = channels.keys().cloned().collect();
    let processed: Vec<(String, Vec<Complex64>)> = names
        .into_par_iter()
        .map(|name| {
            let channel = &channels[&name];
            let mut buffer = samples.get(&name).cloned().unwrap_or_default();
            if channel.filter_offset {
                apply_offset(channel, &mut buffer);
                apply_iir_cascade(channel, &mut buffer);
                apply_fir(channel, &mut buffer);
            } else {
                apply_iir_cascade(channel, &mut buffer);
                apply_fir(channel, &mut buffer);
                apply_offset(channel, &mut buffer);
            }
            apply_iq_calibration(channel, &mut buffer);
            (name, buffer)
        })
        .collect();

    for (name, buffer) in processed {
        samples.insert(name, buffer);
    }
    Ok(())
}

fn apply_offset(channel: &Channel, buffer: &mut [Complex64]) {
    let Some(offset) = channel.offset() else {
        return;
    };
    let bias = if channel.is_real {
        Complex64::new(offset[0], 0.0)
    } else {
        Complex64::new(offset[0], offset[1])
    };
    for sample in buffer.iter_mut() {
        *sample += bias;
    }
}

fn apply_iir_cascade(channel: &Channel, buffer: &mut [Complex64]) {
    for section in channel.iir() {
        direct_form_2_transposed(section, buffer);
    }
}

/// One biquad section, direct form II transposed, `[b0, b1, b2, a0, a1, a2]`
/// (the SOS convention): `a0` need not be 1, every coefficient is divided
/// by it before filtering.
fn direct_form_2_transposed(section: &[f64; 6], buffer: &mut [Complex64]) {
    let [b0, b1, b2, a0, a1, a2] = *section;
    if a0 == 0.0 {
        return;
    }
    let (b0, b1, b2, a1, a2) = (b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0);
    let mut s1 = Complex64::new(0.0, 0.0);
    let mut s2 = Complex64::new(0.0, 0.0);
    for sample in buffer.iter_mut() {
        let x0 = *sample;
        let y0 = b0 * x0 + s1;
        s1 = s2 + b1 * x0 - a1 * y0;
        s2 = b2 * x0 - a2 * y0;
        *sample = y0;
    }
}

fn apply_fir(channel: &Channel, buffer: &mut [Complex64]) {
    let taps = channel.fir();
    if taps.is_empty() {
        return;
    }
    let input = buffer.to_vec();
    for (i, sample) in buffer.iter_mut().enumerate() {
        let mut acc = Complex64::new(0.0, 0.0);
        for (k, tap) in taps.iter().enumerate() {
            if k > i {
                break;
            }
            acc += *tap * input[i - k];
        }
        *sample = acc;
    }
}

fn apply_iq_calibration(channel: &Channel, buffer: &mut [Complex64]) {
    let Some(matrix) = channel.iq_matrix() else {
        return;
    };
    for sample in buffer.iter_mut() {
        let (i, q) = (sample.re, sample.im);
        sample.re = matrix[0][0] * i + matrix[0][1] * q;
        sample.im = matrix[1][0] * i + matrix[1][1] * q;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_map(names: &[&str]) -> BTreeMap<String, Channel> {
        names
            .iter()
            .map(|n| (n.to_string(), Channel::new(0.0, 1e9, 8).unwrap()))
            .collect()
    }

    #[test]
    fn identity_crosstalk_matrix_is_a_no_op() {
        let channels = channel_map(&["a", "b"]);
        let mut samples = BTreeMap::new();
        samples.insert("a".to_string(), vec![Complex64::new(1.0, 0.0); 8]);
        samples.insert("b".to_string(), vec![Complex64::new(0.0, 2.0); 8]);
        let before = samples.clone();
        let crosstalk = Crosstalk::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();
        run(&channels, &mut samples, Some(&crosstalk)).unwrap();
        assert_eq!(samples["a"], before["a"]);
        assert_eq!(samples["b"], before["b"]);
    }

    #[test]
    fn iq_identity_matrix_preserves_samples() {
        let mut channels = channel_map(&["a"]);
        let channel = channels.remove("a").unwrap().with_iq_matrix([[1.0, 0.0], [0.0, 1.0]]).unwrap();
        channels.insert("a".to_string(), channel);
        let mut samples = BTreeMap::new();
        samples.insert("a".to_string(), vec![Complex64::new(0.3, -0.4); 8]);
        let before = samples["a"].clone();
        run(&channels, &mut samples, None).unwrap();
        assert_eq!(samples["a"], before);
    }

    #[test]
    fn fir_identity_tap_is_a_no_op() {
        let mut channels = channel_map(&["a"]);
        let channel = channels.remove("a").unwrap().with_fir(vec![1.0]);
        channels.insert("a".to_string(), channel);
        let mut samples = BTreeMap::new();
        let original = vec![Complex64::new(1.0, 1.0); 8];
        samples.insert("a".to_string(), original.clone());
        run(&channels, &mut samples, None).unwrap();
        assert_eq!(samples["a"], original);
    }
}
