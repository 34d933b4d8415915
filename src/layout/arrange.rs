//! Top-down placement: the arrange pass.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::element::{Alignment, ArrangeDirection, Element, Grid, GridLength};
use crate::error::{Error, Result};
use crate::options::GenerateOptions;

use super::measure::measure;

/// An element placed into absolute root-timeline coordinates, with its
/// arranged children in schedule order (not necessarily source order, since
/// `Stack` with `ArrangeDirection::Backwards` packs from the end).
#[derive(Debug, Clone)]
pub struct Arranged {
    pub element: Rc<Element>,
    pub start: f64,
    pub duration: f64,
    pub children: Vec<Arranged>,
}

/// Arrange `element` at `start`, within the `available` span its parent
/// allotted it.
pub fn arrange(
    element: &Rc<Element>,
    start: f64,
    available: f64,
    options: &GenerateOptions,
) -> Result<Arranged> {
    let common = element.common();
    let (left, right) = common.margin;
    let inner_available = (available - left - right).max(0.0);
    let measured = measure(element)?;
    let (offset, duration) = place(inner_available, measured, common.alignment);
    let own_start = start + left + offset;

    if !options.allow_oversize && duration - inner_available > options.time_tolerance {
        return Err(Error::Oversize(format!(
            "element of duration {duration} does not fit in {inner_available} available"
        )));
    }

    let children = match element.as_ref() {
        Element::Play(_)
        | Element::ShiftPhase(_)
        | Element::SetPhase(_)
        | Element::ShiftFreq(_)
        | Element::SetFreq(_)
        | Element::SwapPhase(_)
        | Element::Barrier(_) => Vec::new(),
        Element::Repeat(r) => {
            let child_duration = measure(&r.child)?;
            let mut out = Vec::with_capacity(r.count as usize);
            for i in 0..r.count {
                let child_start = own_start + i as f64 * (child_duration + r.spacing);
                out.push(arrange(&r.child, child_start, child_duration, options)?);
            }
            out
        }
        Element::Stack(s) => arrange_stack(&s.children, s.direction, own_start, duration, options)?,
        Element::Absolute(a) => {
            let mut out = Vec::with_capacity(a.children.len());
            for entry in &a.children {
                let child_available = (duration - entry.time).max(0.0);
                out.push(arrange(
                    &entry.element,
                    own_start + entry.time,
                    child_available,
                    options,
                )?);
            }
            out
        }
        Element::Grid(g) => arrange_grid(g, own_start, duration, options)?,
    };

    Ok(Arranged {
        element: element.clone(),
        start: own_start,
        duration,
        children,
    })
}

/// Resolve how a measured child occupies the space it was allotted.
fn place(available: f64, measured: f64, alignment: Alignment) -> (f64, f64) {
    match alignment {
        Alignment::Stretch => (0.0, available.max(measured)),
        Alignment::Start => (0.0, measured),
        Alignment::End => ((available - measured).max(0.0), measured),
        Alignment::Center => (((available - measured) / 2.0).max(0.0), measured),
    }
}

/// Arrange a `Stack`'s children against per-channel cursors: each child's
/// start is the max of its touched channels' cursors (and a shared "virtual
/// all-channels" cursor for elements that touch none), and only its touched
/// channels' cursors advance past it. This mirrors [`measure::measure_stack`]
/// so the relative layout is identical; `direction` only decides where the
/// whole block is anchored — `Forwards` starts it at `own_start`,
/// `Backwards` (the default) shifts it so the longest lane ends exactly at
/// `own_start + own_duration`, leaving any slack at the front.
fn arrange_stack(
    children: &[Rc<Element>],
    direction: ArrangeDirection,
    own_start: f64,
    own_duration: f64,
    options: &GenerateOptions,
) -> Result<Vec<Arranged>> {
    let mut lanes: BTreeMap<String, f64> = BTreeMap::new();
    let mut global = 0.0_f64;
    let mut placed = Vec::with_capacity(children.len());

    for child in children {
        let touched = super::touched_channels(child);
        let (left, right) = child.common().margin;
        let span = measure(child)? + left + right;
        let start = if touched.is_empty() {
            lanes.values().cloned().fold(global, f64::max)
        } else {
            touched
                .iter()
                .map(|c| lanes.get(c).copied().unwrap_or(global))
                .fold(global, f64::max)
        };
        let end = start + span;
        if touched.is_empty() {
            for lane in lanes.values_mut() {
                *lane = end;
            }
            global = end;
        } else {
            for c in &touched {
                lanes.insert(c.clone(), end);
            }
        }
        placed.push((child, start, span));
    }

    let total = lanes.values().cloned().fold(global, f64::max);
    let offset = match direction {
        ArrangeDirection::Forwards => 0.0,
        ArrangeDirection::Backwards => own_duration - total,
    };

    let mut out = Vec::with_capacity(placed.len());
    for (child, start, span) in placed {
        out.push(arrange(child, own_start + offset + start, span, options)?);
    }
    Ok(out)
}

fn arrange_grid(
    g: &Grid,
    own_start: f64,
    own_duration: f64,
    options: &GenerateOptions,
) -> Result<Vec<Arranged>> {
    let widths = resolve_columns(g, own_duration)?;
    let mut offsets = vec![0.0_f64; g.columns.len() + 1];
    for i in 0..g.columns.len() {
        offsets[i + 1] = offsets[i] + widths[i];
    }

    let mut out = Vec::with_capacity(g.children.len());
    for entry in &g.children {
        let col_start = *offsets
            .get(entry.column)
            .ok_or_else(|| Error::InvalidInput(format!("grid column {} out of range", entry.column)))?;
        let col_end = *offsets
            .get(entry.column + entry.span)
            .ok_or_else(|| Error::InvalidInput(format!(
                "grid span {} from column {} out of range",
                entry.span, entry.column
            )))?;
        out.push(arrange(
            &entry.element,
            own_start + col_start,
            col_end - col_start,
            options,
        )?);
    }
    Ok(out)
}

/// Resolve every column's width: `Absolute` is fixed, `Auto` sizes to its
/// largest single-span occupant, and the remaining space (never negative)
/// is split among `Star` columns proportionally to their weight.
fn resolve_columns(g: &Grid, own_duration: f64) -> Result<Vec<f64>> {
    let mut widths = vec![0.0_f64; g.columns.len()];
    let mut star_total = 0.0_f64;
    for (i, column) in g.columns.iter().enumerate() {
        match column {
            GridLength::Absolute(w) => widths[i] = *w,
            GridLength::Auto => {
                for entry in &g.children {
                    if entry.column == i && entry.span == 1 {
                        let (left, right) = entry.element.common().margin;
                        let d = measure(&entry.element)? + left + right;
                        if d > widths[i] {
                            widths[i] = d;
                        }
                    }
                }
            }
            GridLength::Star(weight) => star_total += weight.max(0.0),
        }
    }
    let fixed: f64 = widths.iter().sum();
    let remaining = own_duration - fixed;
    if star_total > 0.0 {
        if !remaining.is_finite() {
            return Err(Error::UnresolvedGrid);
        }
        let remaining = remaining.max(0.0);
        for (i, column) in g.columns.iter().enumerate() {
            if let GridLength::Star(weight) = column {
                widths[i] = remaining * (weight.max(0.0) / star_total);
            }
        }
    }
    Ok(widths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    #[test]
    fn stack_backwards_packs_from_the_end() {
        let root = Rc::new(Element::stack(vec![
            Element::play("xy", 0.5, 100e-9),
            Element::play("xy", 0.5, 200e-9),
        ]));
        let options = GenerateOptions::default();
        let arranged = arrange(&root, 0.0, 300e-9, &options).unwrap();
        assert_eq!(arranged.children.len(), 2);
        assert!((arranged.children[0].start - 0.0).abs() < 1e-15);
        assert!((arranged.children[1].start - 100e-9).abs() < 1e-15);
    }

    #[test]
    fn absolute_child_keeps_its_requested_time() {
        let root = Rc::new(Element::absolute(vec![(250e-9, Element::play("xy", 0.5, 50e-9))]));
        let options = GenerateOptions::default();
        let arranged = arrange(&root, 0.0, 400e-9, &options).unwrap();
        assert!((arranged.children[0].start - 250e-9).abs() < 1e-15);
    }

    #[test]
    fn absolute_child_past_available_is_oversize_by_default() {
        let root = Rc::new(Element::absolute(vec![(350e-9, Element::play("xy", 0.5, 100e-9))]));
        let options = GenerateOptions::default();
        assert!(arrange(&root, 0.0, 400e-9, &options).is_err());
    }

    #[test]
    fn grid_star_columns_share_remaining_space_by_weight() {
        let root = Rc::new(Element::grid(
            vec![
                (0, 1, Element::play("xy", 0.5, 10e-9)),
                (1, 1, Element::play("xy", 0.5, 10e-9)),
            ],
            vec![GridLength::Star(1.0), GridLength::Star(3.0)],
        ));
        let options = GenerateOptions::default();
        let arranged = arrange(&root, 0.0, 400e-9, &options).unwrap();
        assert!((arranged.children[0].start - 0.0).abs() < 1e-15);
        assert!((arranged.children[1].start - 100e-9).abs() < 1e-9);
    }

    #[test]
    fn grid_all_star_with_infinite_outer_duration_is_unresolved() {
        let root = Rc::new(Element::grid(
            vec![(0, 1, Element::play("xy", 0.5, 10e-9))],
            vec![GridLength::Star(1.0)],
        ));
        let options = GenerateOptions::default();
        let err = arrange(&root, 0.0, f64::INFINITY, &options).unwrap_err();
        assert!(matches!(err, Error::UnresolvedGrid));
    }
}
