//! Post-order desired-size computation.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::element::{Element, Grid, GridLength};
use crate::error::{Error, Result};

/// Compute the desired duration of `element`, recursing into its children
/// first (post-order) the way a WPF-style layout engine's measure pass does.
///
/// An explicit `duration` wins outright; otherwise the element's intrinsic
/// duration is clamped to `[min_duration, max_duration]`.
pub fn measure(element: &Element) -> Result<f64> {
    let common = element.common();
    if common.min_duration < 0.0 {
        return Err(Error::InvalidInput("min_duration must be >= 0".into()));
    }
    if common.min_duration > common.max_duration {
        return Err(Error::InvalidInput(format!(
            "min_duration {} exceeds max_duration {}",
            common.min_duration, common.max_duration
        )));
    }

    let inner = match element {
        Element::Play(p) => {
            if p.width < 0.0 || p.plateau < 0.0 {
                return Err(Error::InvalidInput(
                    "play width and plateau must be >= 0".into(),
                ));
            }
            // A flexible play's plateau is recomputed during arrange to fill
            // whatever duration it is allotted, so it measures as just its
            // fixed width here.
            if p.flexible {
                p.width
            } else {
                p.width + p.plateau
            }
        }
        Element::ShiftPhase(_)
        | Element::SetPhase(_)
        | Element::ShiftFreq(_)
        | Element::SetFreq(_)
        | Element::SwapPhase(_)
        | Element::Barrier(_) => 0.0,
        Element::Repeat(r) => {
            let child = measure(&r.child)?;
            if r.count == 0 {
                0.0
            } else {
                child * r.count as f64 + r.spacing * (r.count as f64 - 1.0)
            }
        }
        Element::Stack(s) => measure_stack(&s.children)?,
        Element::Absolute(a) => {
            let mut end = 0.0_f64;
            for entry in &a.children {
                let d = measure(&entry.element)?;
                let (_, right) = entry.element.common().margin;
                end = end.max(entry.time + d + right);
            }
            end
        }
        Element::Grid(g) => measure_grid(g)?,
    };

    let resolved = match common.duration {
        Some(explicit) => explicit,
        None => inner.clamp(common.min_duration, common.max_duration),
    };
    Ok(resolved.max(0.0))
}

/// A grid's intrinsic duration is the sum of its `Absolute` and `Auto`
/// column widths; `Star` columns contribute nothing here since they only
/// receive a width once the grid itself has a resolved outer duration (the
/// arrange pass, not measure, assigns it).
fn measure_grid(g: &Grid) -> Result<f64> {
    let mut auto_width = vec![0.0_f64; g.columns.len()];
    for entry in &g.children {
        let d = measure(&entry.element)?;
        if entry.span == 1 && entry.column < g.columns.len() {
            if let GridLength::Auto = g.columns[entry.column] {
                let (left, right) = entry.element.common().margin;
                let width = d + left + right;
                if width > auto_width[entry.column] {
                    auto_width[entry.column] = width;
                }
            }
        }
    }
    let mut total = 0.0;
    for (i, column) in g.columns.iter().enumerate() {
        total += match column {
            GridLength::Absolute(w) => *w,
            GridLength::Auto => auto_width[i],
            GridLength::Star(_) => 0.0,
        };
    }
    Ok(total)
}

/// Per-channel desired-size computation for `Stack`: each child occupies
/// every channel its subtree touches, advancing only those channels'
/// cursors, so the stack's desired duration is the longest lane rather than
/// the sum of every child regardless of channel. A child touching no
/// channel (a bare container, or a `Barrier` with no explicit channel list)
/// synchronizes every lane via a shared cursor instead of occupying one of
/// its own.
fn measure_stack(children: &[Rc<Element>]) -> Result<f64> {
    let mut lanes: BTreeMap<String, f64> = BTreeMap::new();
    let mut global = 0.0_f64;
    for child in children {
        let touched = super::touched_channels(child);
        let (left, right) = child.common().margin;
        let span = measure(child)? + left + right;
        if touched.is_empty() {
            let end = lanes.values().cloned().fold(global, f64::max) + span;
            for lane in lanes.values_mut() {
                *lane = end;
            }
            global = end;
        } else {
            let start = touched
                .iter()
                .map(|c| lanes.get(c).copied().unwrap_or(global))
                .fold(global, f64::max);
            let end = start + span;
            for c in &touched {
                lanes.insert(c.clone(), end);
            }
        }
    }
    Ok(lanes.values().cloned().fold(global, f64::max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    #[test]
    fn play_measures_to_width_plus_plateau() {
        let el = Element::play("xy", 0.5, 100e-9).with_plateau(50e-9);
        assert!((measure(&el).unwrap() - 150e-9).abs() < 1e-15);
    }

    #[test]
    fn stack_measures_to_sum_of_children_plus_margins() {
        let el = Element::stack(vec![
            Element::play("xy", 0.5, 100e-9),
            Element::play("xy", 0.5, 200e-9).with_margin(10e-9, 10e-9),
        ]);
        assert!((measure(&el).unwrap() - 320e-9).abs() < 1e-15);
    }

    #[test]
    fn explicit_duration_overrides_intrinsic_size() {
        let el = Element::play("xy", 0.5, 100e-9).with_duration(500e-9);
        assert!((measure(&el).unwrap() - 500e-9).abs() < 1e-15);
    }

    #[test]
    fn min_greater_than_max_is_rejected() {
        let el = Element::barrier_all()
            .with_min_duration(10.0)
            .with_max_duration(1.0);
        assert!(measure(&el).is_err());
    }
}
