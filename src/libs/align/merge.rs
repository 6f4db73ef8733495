use crate::libs::align::{Alignment, MatchOptions};

/// Whether `current` starts close enough to `previous` to be folded into it.
///
/// The allowed distance is a fraction of the previous passage's source length;
/// the probe points `start_byte - distance` must land inside the previous
/// spans on both sides. Byte arithmetic is signed so a probe before the start
/// of the file cannot underflow.
///
/// ```
/// # use textpair::{Alignment, Span};
/// # use textpair::merge::mergeable;
/// let previous = Alignment {
///     source: Span { start_byte: 0, end_byte: 100 },
///     target: Span { start_byte: 0, end_byte: 100 },
/// };
/// let current = Alignment {
///     source: Span { start_byte: 103, end_byte: 200 },
///     target: Span { start_byte: 104, end_byte: 200 },
/// };
/// assert!(mergeable(&previous, &current, 0.05));
/// ```
pub fn mergeable(previous: &Alignment, current: &Alignment, multiplier: f32) -> bool {
    let length = (previous.source.end_byte - previous.source.start_byte) as f32;
    let distance = (length * multiplier) as i64;
    let source_probe = current.source.start_byte as i64 - distance;
    let target_probe = current.target.start_byte as i64 - distance;
    previous.source.start_byte as i64 <= source_probe
        && source_probe <= previous.source.end_byte as i64
        && previous.target.start_byte as i64 <= target_probe
        && target_probe <= previous.target.end_byte as i64
}

/// Coalesce consecutive alignments whose gap is within the merge distance.
/// Each merge extends the previous alignment in place, and later candidates
/// are tested against the extended spans, so a second pass is a no-op.
pub fn merge_passages(alignments: Vec<Alignment>, opt: &MatchOptions) -> Vec<Alignment> {
    if !opt.merge_on_byte_distance {
        return alignments;
    }
    let mut merged: Vec<Alignment> = Vec::with_capacity(alignments.len());
    for current in alignments {
        if let Some(previous) = merged.last_mut() {
            if mergeable(previous, &current, opt.passage_distance_multiplier) {
                previous.source.end_byte = current.source.end_byte;
                previous.target.end_byte = current.target.end_byte;
                continue;
            }
        }
        merged.push(current);
    }
    merged
}
