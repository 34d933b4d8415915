//! Per-channel instruction execution.
//!
//! The arrange pass produces a tree of absolute start times; this module
//! flattens that tree into a single time-ordered instruction stream (the
//! way a sequencer linearizes a tree of scheduled events into one timeline)
//! and replays it against each channel's [`OscState`], accumulating a
//! [`PulseList`] per channel.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::channel::Channel;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::layout::Arranged;
use crate::options::GenerateOptions;
use crate::osc::OscState;
use crate::pulse::{Pulse, PulseList};

#[derive(Debug, Clone)]
enum Instruction {
    Play {
        channel: String,
        shape: Option<String>,
        amplitude: f64,
        width: f64,
        plateau: f64,
        drag: f64,
        frequency: f64,
        phase: f64,
    },
    ShiftPhase {
        channel: String,
        phase: f64,
    },
    SetPhase {
        channel: String,
        phase: f64,
    },
    ShiftFreq {
        channel: String,
        frequency: f64,
    },
    SetFreq {
        channel: String,
        frequency: f64,
    },
    SwapPhase {
        channel_a: String,
        channel_b: String,
    },
    Barrier,
}

#[derive(Debug, Clone)]
struct TimedInstruction {
    time: f64,
    sequence: usize,
    instruction: Instruction,
}

/// Walk `root`, building a flat stream of `(time, instruction)` pairs, then
/// replay it in nondecreasing time order to produce each channel's pulses.
///
/// Ties are broken by traversal order (depth-first, children in the order
/// [`Arranged`] lists them), which matches source order for every variant
/// except `Stack` with `ArrangeDirection::Backwards`, whose children the
/// arrange pass already reordered into schedule order.
pub fn execute(
    root: &Arranged,
    channels: &BTreeMap<String, Channel>,
    initial: Option<&BTreeMap<String, OscState>>,
    options: &GenerateOptions,
) -> Result<(BTreeMap<String, PulseList>, BTreeMap<String, OscState>)> {
    let mut stream = Vec::new();
    flatten(root, &mut stream);
    stream.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.sequence.cmp(&b.sequence))
    });

    let mut osc: BTreeMap<String, OscState> = channels
        .iter()
        .map(|(name, channel)| {
            let state = initial
                .and_then(|states| states.get(name))
                .copied()
                .unwrap_or_else(|| OscState::new(channel.base_freq));
            (name.clone(), state)
        })
        .collect();
    let mut pulses: BTreeMap<String, PulseList> =
        channels.keys().map(|name| (name.clone(), PulseList::new())).collect();

    for item in &stream {
        let t = item.time;
        match &item.instruction {
            Instruction::Play {
                channel,
                shape,
                amplitude,
                width,
                plateau,
                drag,
                frequency,
                phase,
            } => {
                let state = lookup(&osc, channel)?;
                let total_freq = state.total_freq() + frequency;
                let total_phase = state.phase_at(t) + phase;
                let list = pulses.get_mut(channel).ok_or_else(|| unknown_channel(channel))?;
                list.push(
                    Pulse {
                        shape: shape.clone(),
                        start: t,
                        width: *width,
                        plateau: *plateau,
                        amplitude: *amplitude,
                        drag: *drag,
                        freq: total_freq,
                        phase: total_phase,
                    },
                    options.time_tolerance,
                );
            }
            Instruction::ShiftPhase { channel, phase } => {
                let state = lookup(&osc, channel)?;
                osc.insert(channel.clone(), state.shift_phase(*phase));
            }
            Instruction::SetPhase { channel, phase } => {
                let state = lookup(&osc, channel)?;
                osc.insert(channel.clone(), state.set_phase(t, *phase));
            }
            Instruction::ShiftFreq { channel, frequency } => {
                let state = lookup(&osc, channel)?;
                osc.insert(channel.clone(), state.shift_freq(t, *frequency));
            }
            Instruction::SetFreq { channel, frequency } => {
                let state = lookup(&osc, channel)?;
                osc.insert(channel.clone(), state.set_freq(t, *frequency));
            }
            Instruction::SwapPhase { channel_a, channel_b } => {
                let a = lookup(&osc, channel_a)?;
                let b = lookup(&osc, channel_b)?;
                let (new_a, new_b) = a.swap_phase(&b, t);
                osc.insert(channel_a.clone(), new_a);
                osc.insert(channel_b.clone(), new_b);
            }
            Instruction::Barrier => {}
        }
    }

    for list in pulses.values_mut() {
        list.prune(options.amp_tolerance);
    }
    Ok((pulses, osc))
}

fn lookup(osc: &BTreeMap<String, OscState>, channel: &str) -> Result<OscState> {
    osc.get(channel).copied().ok_or_else(|| unknown_channel(channel))
}

fn unknown_channel(channel: &str) -> Error {
    Error::InvalidInput(format!("unknown channel {channel:?}"))
}

fn flatten(node: &Arranged, out: &mut Vec<TimedInstruction>) {
    let sequence = out.len();
    let time = node.start;
    let instruction = match node.element.as_ref() {
        Element::Play(p) => {
            // A flexible play keeps its fixed width and fills the rest of
            // whatever duration arrange gave it (stretched, typically) with
            // plateau.
            let plateau = if p.flexible {
                (node.duration - p.width).max(0.0)
            } else {
                p.plateau
            };
            Some(Instruction::Play {
                channel: p.channel.clone(),
                shape: p.shape.clone(),
                amplitude: p.amplitude,
                width: p.width,
                plateau,
                drag: p.drag,
                frequency: p.frequency,
                phase: p.phase,
            })
        }
        Element::ShiftPhase(e) => Some(Instruction::ShiftPhase {
            channel: e.channel.clone(),
            phase: e.phase,
        }),
        Element::SetPhase(e) => Some(Instruction::SetPhase {
            channel: e.channel.clone(),
            phase: e.phase,
        }),
        Element::ShiftFreq(e) => Some(Instruction::ShiftFreq {
            channel: e.channel.clone(),
            frequency: e.frequency,
        }),
        Element::SetFreq(e) => Some(Instruction::SetFreq {
            channel: e.channel.clone(),
            frequency: e.frequency,
        }),
        Element::SwapPhase(e) => Some(Instruction::SwapPhase {
            channel_a: e.channel_a.clone(),
            channel_b: e.channel_b.clone(),
        }),
        Element::Barrier(_) => Some(Instruction::Barrier),
        Element::Repeat(_) | Element::Stack(_) | Element::Absolute(_) | Element::Grid(_) => None,
    };
    if let Some(instruction) = instruction {
        out.push(TimedInstruction {
            time,
            sequence,
            instruction,
        });
    }
    for child in &node.children {
        flatten(child, out);
    }
}

/// Convenience for callers that already have a root `Element` rather than
/// an arranged one (mostly tests): measure, arrange with an unbounded
/// outer duration, then execute.
pub fn run(
    root: &Rc<Element>,
    channels: &BTreeMap<String, Channel>,
    options: &GenerateOptions,
) -> Result<BTreeMap<String, PulseList>> {
    let duration = crate::layout::measure(root)?;
    let arranged = crate::layout::arrange(root, 0.0, duration, options)?;
    let (pulses, _) = execute(&arranged, channels, None, options)?;
    Ok(pulses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    fn channel_map() -> BTreeMap<String, Channel> {
        let mut map = BTreeMap::new();
        map.insert("xy".to_string(), Channel::new(30e6, 2e9, 1000).unwrap());
        map
    }

    #[test]
    fn shift_freq_affects_later_plays_but_not_earlier_ones() {
        let root = Rc::new(Element::stack(vec![
            Element::play("xy", 0.5, 100e-9).with_shape("hann"),
            Element::shift_freq("xy", 5e6),
            Element::play("xy", 0.5, 100e-9).with_shape("hann"),
        ]));
        let options = GenerateOptions::default();
        let pulses = run(&root, &channel_map(), &options).unwrap();
        let list = pulses.get("xy").unwrap();
        let entries: Vec<_> = list.iter().collect();
        assert_eq!(entries.len(), 2);
        assert!((entries[0].freq - 30e6).abs() < 1.0);
        assert!((entries[1].freq - 35e6).abs() < 1.0);
    }

    #[test]
    fn initial_osc_state_carries_forward_from_a_prior_run() {
        let root = Rc::new(Element::play("xy", 0.5, 100e-9).with_shape("hann"));
        let options = GenerateOptions::default();
        let mut initial = BTreeMap::new();
        initial.insert("xy".to_string(), OscState::new(30e6).shift_phase(0.25));

        let duration = crate::layout::measure(&root).unwrap();
        let arranged = crate::layout::arrange(&root, 0.0, duration, &options).unwrap();
        let (pulses, final_states) =
            execute(&arranged, &channel_map(), Some(&initial), &options).unwrap();

        let pulse = pulses.get("xy").unwrap().iter().next().unwrap();
        assert!((pulse.phase - 0.25).abs() < 1e-9);
        assert!((final_states["xy"].phase - 0.25).abs() < 1e-9);
    }

    #[test]
    fn unknown_channel_is_an_error() {
        let root = Rc::new(Element::play("not-xy", 0.5, 100e-9));
        let options = GenerateOptions::default();
        assert!(run(&root, &channel_map(), &options).is_err());
    }

    /// spec.md §8 "Grid layout": `Grid(columns=[40e-9, "auto", 40e-9])` with
    /// a flexible child spanning all three columns and a 60e-9 middle child
    /// must produce a 60e-9 middle column and the flexible child's plateau
    /// equal to 140e-9.
    #[test]
    fn grid_flexible_child_plateau_fills_the_full_grid_width() {
        use crate::element::{Alignment, GridLength};

        let flexible = Element::play("xy", 0.4, 0.0)
            .with_flexible(true)
            .with_alignment(Alignment::Stretch);
        let root = Rc::new(Element::grid(
            vec![(0, 3, flexible), (1, 1, Element::play("xy", 0.2, 60e-9))],
            vec![GridLength::Absolute(40e-9), GridLength::Auto, GridLength::Absolute(40e-9)],
        ));
        let options = GenerateOptions::default();
        let pulses = run(&root, &channel_map(), &options).unwrap();
        let list = pulses.get("xy").unwrap();
        let mut entries: Vec<_> = list.iter().collect();
        entries.sort_by(|a, b| a.width.partial_cmp(&b.width).unwrap());

        assert!((entries[0].width - 0.0).abs() < 1e-12);
        assert!((entries[0].plateau - 140e-9).abs() < 1e-12);
        assert!((entries[1].width - 60e-9).abs() < 1e-12);
    }
}
