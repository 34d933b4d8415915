//! Compiles hierarchical pulse schedules into per-channel complex baseband
//! waveforms.
//!
//! A schedule is a tree of [`Element`]s (play a pulse, shift a phase, stack
//! sibling elements, grid them, ...). [`generate_waveforms`] measures and
//! arranges that tree into absolute timing, executes each channel's
//! instruction stream against its oscillator state, rasterizes the
//! resulting pulses, and runs the configured post-processing chain.

pub mod channel;
pub mod element;
pub mod error;
pub mod exec;
pub mod layout;
pub mod math;
pub mod options;
pub mod orchestrator;
pub mod osc;
pub mod plot;
pub mod postprocess;
pub mod pulse;
pub mod sampler;
pub mod shape;
pub mod wave;

pub use channel::Channel;
pub use element::{
    AbsoluteEntry, Alignment, ArrangeDirection, Element, GridEntry, GridLength,
};
pub use error::{Error, Result};
pub use options::GenerateOptions;
pub use orchestrator::generate_waveforms;
pub use osc::OscState;
pub use postprocess::Crosstalk;
pub use pulse::{Pulse, PulseList};
pub use shape::{Interp, Shape};
pub use wave::Waveform;
