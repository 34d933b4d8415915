//! Diagnostic flattening of an arranged schedule, for visualization.
//!
//! Not on the path from [`crate::generate_waveforms`]; this exists purely
//! so callers can render a timeline of what got scheduled where.

use crate::element::Element;
use crate::layout::Arranged;

/// One leaf placed on the timeline: its kind, channel (if any), absolute
/// start, and duration.
#[derive(Debug, Clone)]
pub struct PlotItem {
    pub kind: &'static str,
    pub channel: Option<String>,
    pub start: f64,
    pub duration: f64,
}

/// Flatten an arranged tree into its leaf placements, in traversal order.
pub fn plot(arranged: &Arranged) -> impl Iterator<Item = PlotItem> {
    let mut items = Vec::new();
    collect(arranged, &mut items);
    items.into_iter()
}

fn collect(node: &Arranged, out: &mut Vec<PlotItem>) {
    let leaf = match node.element.as_ref() {
        Element::Play(p) => Some((
            "play",
            Some(p.channel.clone()),
        )),
        Element::ShiftPhase(e) => Some(("shift_phase", Some(e.channel.clone()))),
        Element::SetPhase(e) => Some(("set_phase", Some(e.channel.clone()))),
        Element::ShiftFreq(e) => Some(("shift_freq", Some(e.channel.clone()))),
        Element::SetFreq(e) => Some(("set_freq", Some(e.channel.clone()))),
        Element::SwapPhase(e) => Some(("swap_phase", Some(format!("{},{}", e.channel_a, e.channel_b)))),
        Element::Barrier(_) => Some(("barrier", None)),
        Element::Repeat(_) | Element::Stack(_) | Element::Absolute(_) | Element::Grid(_) => None,
    };
    if let Some((kind, channel)) = leaf {
        out.push(PlotItem {
            kind,
            channel,
            start: node.start,
            duration: node.duration,
        });
    }
    for child in &node.children {
        collect(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::layout::arrange;
    use crate::options::GenerateOptions;
    use std::rc::Rc;

    #[test]
    fn plot_lists_leaves_in_schedule_order() {
        let root = Rc::new(Element::stack(vec![
            Element::play("xy", 0.5, 100e-9),
            Element::shift_freq("xy", 1e6),
        ]));
        let options = GenerateOptions::default();
        let arranged = arrange(&root, 0.0, 200e-9, &options).unwrap();
        let items: Vec<_> = plot(&arranged).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, "play");
        assert_eq!(items[1].kind, "shift_freq");
    }
}
