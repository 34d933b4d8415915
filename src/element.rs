//! The schedule element tree.
//!
//! Elements are immutable values; children are held behind `Rc` so that
//! identical subtrees can be shared without duplicating them (the
//! specification's "DAG of owned children" requirement) while keeping the
//! tree itself a plain, safe Rust value rather than an index-based arena —
//! `Rc` already gives us the sharing property spec.md section 9 asks for
//! when the host language allows it.

use std::rc::Rc;

/// Where an element sits within the space its parent allotted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Start,
    Center,
    End,
    Stretch,
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment::End
    }
}

/// Attributes shared by every element variant.
#[derive(Debug, Clone)]
pub struct Common {
    pub margin: (f64, f64),
    pub alignment: Alignment,
    pub visibility: bool,
    pub duration: Option<f64>,
    pub max_duration: f64,
    pub min_duration: f64,
}

impl Default for Common {
    fn default() -> Self {
        Self {
            margin: (0.0, 0.0),
            alignment: Alignment::default(),
            visibility: true,
            duration: None,
            max_duration: f64::INFINITY,
            min_duration: 0.0,
        }
    }
}

/// Direction `Stack` arranges its children in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrangeDirection {
    Backwards,
    Forwards,
}

impl Default for ArrangeDirection {
    fn default() -> Self {
        ArrangeDirection::Backwards
    }
}

/// An `Absolute` child: a fixed `time` offset plus the element placed there.
#[derive(Debug, Clone)]
pub struct AbsoluteEntry {
    pub time: f64,
    pub element: Rc<Element>,
}

/// The length of a `Grid` column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridLength {
    Absolute(f64),
    Auto,
    Star(f64),
}

/// A `Grid` child: which column it starts in, how many columns it spans.
#[derive(Debug, Clone)]
pub struct GridEntry {
    pub column: usize,
    pub span: usize,
    pub element: Rc<Element>,
}

#[derive(Debug, Clone)]
pub struct Play {
    pub common: Common,
    pub channel: String,
    pub shape: Option<String>,
    pub amplitude: f64,
    pub width: f64,
    pub plateau: f64,
    pub drag: f64,
    pub frequency: f64,
    pub phase: f64,
    pub flexible: bool,
}

#[derive(Debug, Clone)]
pub struct ShiftPhase {
    pub common: Common,
    pub channel: String,
    pub phase: f64,
}

#[derive(Debug, Clone)]
pub struct SetPhase {
    pub common: Common,
    pub channel: String,
    pub phase: f64,
}

#[derive(Debug, Clone)]
pub struct ShiftFreq {
    pub common: Common,
    pub channel: String,
    pub frequency: f64,
}

#[derive(Debug, Clone)]
pub struct SetFreq {
    pub common: Common,
    pub channel: String,
    pub frequency: f64,
}

#[derive(Debug, Clone)]
pub struct SwapPhase {
    pub common: Common,
    pub channel_a: String,
    pub channel_b: String,
}

#[derive(Debug, Clone)]
pub struct Barrier {
    pub common: Common,
    pub channels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Repeat {
    pub common: Common,
    pub child: Rc<Element>,
    pub count: u32,
    pub spacing: f64,
}

#[derive(Debug, Clone)]
pub struct Stack {
    pub common: Common,
    pub children: Vec<Rc<Element>>,
    pub direction: ArrangeDirection,
}

#[derive(Debug, Clone)]
pub struct Absolute {
    pub common: Common,
    pub children: Vec<AbsoluteEntry>,
}

#[derive(Debug, Clone)]
pub struct Grid {
    pub common: Common,
    pub children: Vec<GridEntry>,
    pub columns: Vec<GridLength>,
}

/// A schedule element. See the module documentation for the sharing model.
#[derive(Debug, Clone)]
pub enum Element {
    Play(Play),
    ShiftPhase(ShiftPhase),
    SetPhase(SetPhase),
    ShiftFreq(ShiftFreq),
    SetFreq(SetFreq),
    SwapPhase(SwapPhase),
    Barrier(Barrier),
    Repeat(Repeat),
    Stack(Stack),
    Absolute(Absolute),
    Grid(Grid),
}

impl Element {
    pub fn common(&self) -> &Common {
        match self {
            Element::Play(e) => &e.common,
            Element::ShiftPhase(e) => &e.common,
            Element::SetPhase(e) => &e.common,
            Element::ShiftFreq(e) => &e.common,
            Element::SetFreq(e) => &e.common,
            Element::SwapPhase(e) => &e.common,
            Element::Barrier(e) => &e.common,
            Element::Repeat(e) => &e.common,
            Element::Stack(e) => &e.common,
            Element::Absolute(e) => &e.common,
            Element::Grid(e) => &e.common,
        }
    }

    fn common_mut(&mut self) -> &mut Common {
        match self {
            Element::Play(e) => &mut e.common,
            Element::ShiftPhase(e) => &mut e.common,
            Element::SetPhase(e) => &mut e.common,
            Element::ShiftFreq(e) => &mut e.common,
            Element::SetFreq(e) => &mut e.common,
            Element::SwapPhase(e) => &mut e.common,
            Element::Barrier(e) => &mut e.common,
            Element::Repeat(e) => &mut e.common,
            Element::Stack(e) => &mut e.common,
            Element::Absolute(e) => &mut e.common,
            Element::Grid(e) => &mut e.common,
        }
    }

    pub fn with_margin(mut self, left: f64, right: f64) -> Self {
        self.common_mut().margin = (left, right);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.common_mut().alignment = alignment;
        self
    }

    pub fn with_visibility(mut self, visibility: bool) -> Self {
        self.common_mut().visibility = visibility;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.common_mut().duration = Some(duration);
        self
    }

    pub fn with_min_duration(mut self, min_duration: f64) -> Self {
        self.common_mut().min_duration = min_duration;
        self
    }

    pub fn with_max_duration(mut self, max_duration: f64) -> Self {
        self.common_mut().max_duration = max_duration;
        self
    }

    pub fn play(channel: impl Into<String>, amplitude: f64, width: f64) -> Self {
        Element::Play(Play {
            common: Common::default(),
            channel: channel.into(),
            shape: None,
            amplitude,
            width,
            plateau: 0.0,
            drag: 0.0,
            frequency: 0.0,
            phase: 0.0,
            flexible: false,
        })
    }

    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        if let Element::Play(p) = &mut self {
            p.shape = Some(shape.into());
        }
        self
    }

    pub fn with_plateau(mut self, plateau: f64) -> Self {
        if let Element::Play(p) = &mut self {
            p.plateau = plateau;
        }
        self
    }

    pub fn with_drag(mut self, drag: f64) -> Self {
        if let Element::Play(p) = &mut self {
            p.drag = drag;
        }
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        if let Element::Play(p) = &mut self {
            p.frequency = frequency;
        }
        self
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        if let Element::Play(p) = &mut self {
            p.phase = phase;
        }
        self
    }

    pub fn with_flexible(mut self, flexible: bool) -> Self {
        if let Element::Play(p) = &mut self {
            p.flexible = flexible;
        }
        self
    }

    pub fn shift_phase(channel: impl Into<String>, phase: f64) -> Self {
        Element::ShiftPhase(ShiftPhase {
            common: Common::default(),
            channel: channel.into(),
            phase,
        })
    }

    pub fn set_phase(channel: impl Into<String>, phase: f64) -> Self {
        Element::SetPhase(SetPhase {
            common: Common::default(),
            channel: channel.into(),
            phase,
        })
    }

    pub fn shift_freq(channel: impl Into<String>, frequency: f64) -> Self {
        Element::ShiftFreq(ShiftFreq {
            common: Common::default(),
            channel: channel.into(),
            frequency,
        })
    }

    pub fn set_freq(channel: impl Into<String>, frequency: f64) -> Self {
        Element::SetFreq(SetFreq {
            common: Common::default(),
            channel: channel.into(),
            frequency,
        })
    }

    pub fn swap_phase(channel_a: impl Into<String>, channel_b: impl Into<String>) -> Self {
        Element::SwapPhase(SwapPhase {
            common: Common::default(),
            channel_a: channel_a.into(),
            channel_b: channel_b.into(),
        })
    }

    pub fn barrier(channels: Vec<String>) -> Self {
        Element::Barrier(Barrier {
            common: Common::default(),
            channels,
        })
    }

    pub fn barrier_all() -> Self {
        Element::barrier(Vec::new())
    }

    pub fn repeat(child: Element, count: u32) -> Self {
        Element::Repeat(Repeat {
            common: Common::default(),
            child: Rc::new(child),
            count,
            spacing: 0.0,
        })
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        if let Element::Repeat(r) = &mut self {
            r.spacing = spacing;
        }
        self
    }

    pub fn stack(children: Vec<Element>) -> Self {
        Element::Stack(Stack {
            common: Common::default(),
            children: children.into_iter().map(Rc::new).collect(),
            direction: ArrangeDirection::default(),
        })
    }

    pub fn with_direction(mut self, direction: ArrangeDirection) -> Self {
        if let Element::Stack(s) = &mut self {
            s.direction = direction;
        }
        self
    }

    pub fn absolute(children: Vec<(f64, Element)>) -> Self {
        Element::Absolute(Absolute {
            common: Common::default(),
            children: children
                .into_iter()
                .map(|(time, element)| AbsoluteEntry {
                    time,
                    element: Rc::new(element),
                })
                .collect(),
        })
    }

    pub fn grid(children: Vec<(usize, usize, Element)>, columns: Vec<GridLength>) -> Self {
        Element::Grid(Grid {
            common: Common::default(),
            children: children
                .into_iter()
                .map(|(column, span, element)| GridEntry {
                    column,
                    span,
                    element: Rc::new(element),
                })
                .collect(),
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let el = Element::play("xy", 0.3, 100e-9)
            .with_shape("hann")
            .with_plateau(200e-9)
            .with_margin(1e-9, 2e-9);
        assert_eq!(el.common().margin, (1e-9, 2e-9));
        match el {
            Element::Play(p) => {
                assert_eq!(p.shape.as_deref(), Some("hann"));
                assert_eq!(p.plateau, 200e-9);
            }
            _ => panic!("expected Play"),
        }
    }
}
