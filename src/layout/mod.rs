//! Schedule layout: the measure and arrange passes.

use std::collections::BTreeSet;

use crate::element::Element;

pub mod arrange;
pub mod measure;

pub use arrange::{arrange, Arranged};
pub use measure::measure;

/// The channels an element's subtree touches, for `Stack`'s per-channel
/// cursor bookkeeping: "a child occupies every channel it touches." An
/// empty set is the "virtual all-channels lane" — a bare container with no
/// channel-bearing leaf, or a `Barrier` with no explicit channel list,
/// synchronizes with every lane instead of occupying just one.
fn touched_channels(element: &Element) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_touched(element, &mut out);
    out
}

fn collect_touched(element: &Element, out: &mut BTreeSet<String>) {
    match element {
        Element::Play(p) => {
            out.insert(p.channel.clone());
        }
        Element::ShiftPhase(e) => {
            out.insert(e.channel.clone());
        }
        Element::SetPhase(e) => {
            out.insert(e.channel.clone());
        }
        Element::ShiftFreq(e) => {
            out.insert(e.channel.clone());
        }
        Element::SetFreq(e) => {
            out.insert(e.channel.clone());
        }
        Element::SwapPhase(e) => {
            out.insert(e.channel_a.clone());
            out.insert(e.channel_b.clone());
        }
        Element::Barrier(b) => out.extend(b.channels.iter().cloned()),
        Element::Repeat(r) => collect_touched(&r.child, out),
        Element::Stack(s) => {
            for child in &s.children {
                collect_touched(child, out);
            }
        }
        Element::Absolute(a) => {
            for entry in &a.children {
                collect_touched(&entry.element, out);
            }
        }
        Element::Grid(g) => {
            for entry in &g.children {
                collect_touched(&entry.element, out);
            }
        }
    }
}
