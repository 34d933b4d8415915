//! Rasterization: turning a channel's pulse list into complex baseband
//! samples.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use num_complex::Complex64;
use rayon::prelude::*;

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::math::snap;
use crate::options::GenerateOptions;
use crate::pulse::{Pulse, PulseList};
use crate::shape::Shape;

/// Rasterize every channel's pulse list in parallel (sampling one channel
/// has no data dependency on any other, so this is a plain data-parallel
/// fan-out rather than anything requiring synchronization).
pub fn sample_all(
    channels: &BTreeMap<String, Channel>,
    pulses: &BTreeMap<String, PulseList>,
    shapes: &BTreeMap<String, Shape>,
    options: &GenerateOptions,
) -> Result<BTreeMap<String, Vec<Complex64>>> {
    let names: Vec<&String> = channels.keys().collect();
    let sampled: Vec<(String, Vec<Complex64>)> = names
        .into_par_iter()
        .map(|name| -> Result<(String, Vec<Complex64>)> {
            let channel = &channels[name];
            let empty = PulseList::new();
            let list = pulses.get(name).unwrap_or(&empty);
            let samples = sample_channel(channel, list, shapes, options)?;
            Ok((name.clone(), samples))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(sampled.into_iter().collect())
}

/// Rasterize a single channel's pulses into a sample buffer of length
/// `channel.length` at `channel.sample_rate`.
pub fn sample_channel(
    channel: &Channel,
    pulses: &PulseList,
    shapes: &BTreeMap<String, Shape>,
    options: &GenerateOptions,
) -> Result<Vec<Complex64>> {
    let mut buffer = vec![Complex64::new(0.0, 0.0); channel.length as usize];
    let dt = 1.0 / channel.sample_rate;

    for pulse in pulses.iter() {
        let shape = match &pulse.shape {
            Some(name) => Some(
                shapes
                    .get(name)
                    .ok_or_else(|| Error::InvalidShape(format!("unknown shape {name:?}")))?,
            ),
            None => None,
        };

        let start = snap(pulse.start + channel.delay, channel.sample_rate, channel.align_level);
        let total_duration = pulse.width + pulse.plateau;
        if total_duration <= 0.0 {
            continue;
        }

        let first_index = ((start / dt).floor().max(0.0)) as i64;
        let last_index = (((start + total_duration) / dt).ceil()) as i64;
        let last_index = last_index.min(channel.length as i64);

        for index in first_index.max(0)..last_index.max(0) {
            let t_abs = index as f64 * dt;
            let rel = t_abs - start;
            if rel < -options.time_tolerance || rel > total_duration + options.time_tolerance {
                continue;
            }
            let (env, denv) = envelope_pair(shape, rel, pulse.width, pulse.plateau);
            let complex_env = Complex64::new(env, pulse.drag * denv);
            let phase_cycles = pulse.phase + pulse.freq * (t_abs - pulse.start);
            let carrier = Complex64::from_polar(1.0, TAU * phase_cycles);
            buffer[index as usize] += pulse.amplitude * complex_env * carrier;
        }
    }
    Ok(buffer)
}

/// Evaluate a pulse's envelope and its time-derivative (for DRAG quadrature)
/// at `rel` seconds past the pulse's (snapped) start.
///
/// A pulse is a rising edge, an optional flat plateau, and a falling edge,
/// each edge being half of `width` wide; `shape == None` is the rectangular
/// (unshaped) pulse.
fn envelope_pair(shape: Option<&Shape>, rel: f64, width: f64, plateau: f64) -> (f64, f64) {
    let Some(shape) = shape else {
        let total = width + plateau;
        return if (0.0..=total).contains(&rel) {
            (1.0, 0.0)
        } else {
            (0.0, 0.0)
        };
    };
    if width <= 0.0 {
        return if (0.0..=plateau).contains(&rel) {
            (shape.sample(0.0), 0.0)
        } else {
            (0.0, 0.0)
        };
    }
    let half = width / 2.0;
    if rel < half {
        let x = (rel - half) / width;
        (shape.sample(x), shape.derivative(x) / width)
    } else if rel <= half + plateau {
        (shape.sample(0.0), 0.0)
    } else if rel <= width + plateau {
        let x = (rel - half - plateau) / width;
        (shape.sample(x), shape.derivative(x) / width)
    } else {
        (0.0, 0.0)
    }
}

/// Build a pulse on the fly for tests without going through the scheduler.
#[cfg(test)]
fn test_pulse(width: f64, plateau: f64) -> Pulse {
    Pulse {
        shape: Some("hann".into()),
        start: 100e-9,
        width,
        plateau,
        amplitude: 1.0,
        drag: 0.0,
        freq: 0.0,
        phase: 0.0,
    }
}
