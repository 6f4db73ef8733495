use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::libs::align::merge::mergeable;
use crate::libs::align::{Alignment, MatchOptions, NgramId, NgramMatch, NgramPos, Span};
use crate::libs::corpus::DocIndex;

/// N-grams present in both documents, weighted by the sum of the two
/// occurrence-list lengths. Empty iff the documents share no n-gram.
pub fn intersect_ngrams(source: &DocIndex, target: &DocIndex) -> HashMap<NgramId, usize> {
    let (smaller, larger) = if source.ngrams.len() < target.ngrams.len() {
        (source, target)
    } else {
        (target, source)
    };

    let mut shared = HashMap::new();
    for (ngram, positions) in &smaller.ngrams {
        if let Some(others) = larger.ngrams.get(ngram) {
            shared.insert(*ngram, positions.len() + others.len());
        }
    }
    shared
}

/// The "banal" set for a document pair: every globally common n-gram plus up
/// to `cap` of the heaviest shared n-grams, never counting weight-2 ones
/// (a single occurrence on each side).
///
/// Membership only feeds the common-match counter inside the matcher; it does
/// not exclude any match tuple.
pub fn banal_ngrams(
    shared: &HashMap<NgramId, usize>,
    cap: usize,
    global_common: &HashSet<NgramId>,
) -> HashSet<NgramId> {
    let mut banal: HashSet<NgramId> = global_common.clone();
    shared
        .iter()
        .sorted_by(|a, b| b.1.cmp(a.1))
        .take_while(|&(_, &weight)| weight > 2)
        .take(cap)
        .for_each(|(&ngram, _)| {
            banal.insert(ngram);
        });
    banal
}

/// Expand each shared n-gram into the cartesian product of its source and
/// target occurrences, sorted by (source index, target index). The n-gram id
/// breaks remaining ties so the stream does not depend on map iteration order.
pub fn build_matches(
    source: &DocIndex,
    target: &DocIndex,
    shared: &HashMap<NgramId, usize>,
) -> Vec<NgramMatch> {
    let mut matches = Vec::new();
    for &ngram in shared.keys() {
        for source_pos in &source.ngrams[&ngram] {
            for target_pos in &target.ngrams[&ngram] {
                matches.push(NgramMatch {
                    source: *source_pos,
                    target: *target_pos,
                    ngram,
                });
            }
        }
    }
    matches.sort_unstable_by_key(|m| (m.source.index, m.target.index, m.ngram));
    matches
}

// State of one matcher invocation. An "attempt" lives from the anchor tuple
// that opened it until the alignment is closed or the stream runs out.
#[derive(Debug, Default)]
struct MatcherState {
    in_alignment: bool,
    matches_in_current_alignment: u32,
    matches_in_current_window: u32,
    source_anchor: u32,
    last_source_position: u32,
    target_anchor: u32,
    last_target_position: u32,
    previous_source_index: u32,
    common_ngram_matches: u32,
    max_source_gap: u32,
    max_target_gap: u32,
    source_window_boundary: u32,
    target_window_boundary: u32,
    first_match: (NgramPos, NgramPos),
    last_match: (NgramPos, NgramPos),
}

/// Walk the sorted match stream and emit alignments.
///
/// Every tuple is a candidate anchor unless the source cursor has already
/// moved past it. An open attempt accumulates matches while they stay within
/// `max_gap` of the previous match on both sides; crossing a window boundary
/// requires `minimum_matching_ngrams_in_window` matches in the closing window
/// and then re-anchors the window on the current tuple. A closed attempt is
/// emitted when it is not dominated by banal n-grams and is either long enough
/// for a full window or a small dense match within `max_gap` of its anchor.
pub fn match_passages(
    matches: &[NgramMatch],
    banal: &HashSet<NgramId>,
    opt: &MatchOptions,
) -> Vec<Alignment> {
    let mut alignments: Vec<Alignment> = Vec::new();
    let mut m = MatcherState::default();

    'anchors: for (anchor_index, anchor) in matches.iter().enumerate() {
        if anchor.source.index < m.last_source_position {
            continue;
        }

        // Open a new attempt on this anchor
        m.source_anchor = anchor.source.index;
        m.source_window_boundary = m.source_anchor + opt.matching_window_size;
        m.last_source_position = m.source_anchor;
        m.max_source_gap = m.last_source_position + opt.max_gap;
        m.target_anchor = anchor.target.index;
        m.target_window_boundary = m.target_anchor + opt.matching_window_size;
        m.last_target_position = m.target_anchor;
        m.max_target_gap = m.last_target_position + opt.max_gap;
        m.in_alignment = true;
        m.previous_source_index = m.source_anchor;
        m.first_match = (anchor.source, anchor.target);
        m.last_match = (anchor.source, anchor.target);
        m.matches_in_current_alignment = 1;
        m.matches_in_current_window = 1;
        m.common_ngram_matches = 0;
        if banal.contains(&anchor.ngram) {
            m.common_ngram_matches += 1;
        }

        for current in &matches[anchor_index + 1..] {
            let (source, target) = (current.source, current.target);
            // Skip repeats of the same source position and targets at or
            // before the last accepted target match
            if source.index == m.previous_source_index || target.index <= m.last_target_position {
                continue;
            }
            if source.index > m.max_source_gap || target.index > m.max_target_gap {
                m.in_alignment = false;
            }
            if source.index > m.source_window_boundary || target.index > m.target_window_boundary {
                if m.matches_in_current_window < opt.minimum_matching_ngrams_in_window {
                    m.in_alignment = false;
                } else if source.index > m.max_source_gap || target.index > m.max_target_gap {
                    m.in_alignment = false;
                } else {
                    // Slide the window, re-anchored on the current tuple
                    m.source_anchor = source.index;
                    m.source_window_boundary = m.source_anchor + opt.matching_window_size;
                    m.target_anchor = target.index;
                    m.target_window_boundary = m.target_anchor + opt.matching_window_size;
                    m.matches_in_current_window = 0;
                }
            }
            if !m.in_alignment {
                // Integer quotient: the banal gate only fires when every
                // match in the alignment is banal
                let common_fraction =
                    (m.common_ngram_matches / m.matches_in_current_alignment) as f32;
                if common_fraction < opt.common_ngrams_limit {
                    if m.matches_in_current_alignment >= opt.minimum_matching_ngrams_in_window {
                        add_alignment(&mut m, opt, &mut alignments);
                    } else if m.last_match.0.index - anchor.source.index <= opt.max_gap
                        && m.matches_in_current_alignment >= opt.minimum_matching_ngrams
                    {
                        // Small match within max_gap of its anchor
                        add_alignment(&mut m, opt, &mut alignments);
                    }
                }
                // Restart the next attempt past the last accepted source match
                m.last_source_position = m.last_match.0.index + 1;
                continue 'anchors;
            }
            m.last_source_position = source.index;
            m.max_source_gap = m.last_source_position + opt.max_gap;
            m.last_target_position = target.index;
            m.max_target_gap = m.last_target_position + opt.max_gap;
            m.previous_source_index = source.index;
            m.matches_in_current_window += 1;
            m.matches_in_current_alignment += 1;
            m.last_match = (source, target);
            if banal.contains(&current.ngram) {
                m.common_ngram_matches += 1;
            }
        }

        // The inner scan consumed the rest of the stream; any remaining
        // anchor candidate was already folded into the open attempt, so stop
        // here and let the flush below decide
        break;
    }

    if m.in_alignment && m.matches_in_current_alignment >= opt.minimum_matching_ngrams {
        add_alignment(&mut m, opt, &mut alignments);
    }

    alignments
}

fn add_alignment(m: &mut MatcherState, opt: &MatchOptions, alignments: &mut Vec<Alignment>) {
    let current = Alignment {
        source: Span {
            start_byte: m.first_match.0.start_byte,
            end_byte: m.last_match.0.end_byte,
        },
        target: Span {
            start_byte: m.first_match.1.start_byte,
            end_byte: m.last_match.1.end_byte,
        },
    };
    if opt.merge_on_byte_distance {
        if let Some(previous) = alignments.last_mut() {
            if mergeable(previous, &current, opt.passage_distance_multiplier) {
                previous.source.end_byte = current.source.end_byte;
                previous.target.end_byte = current.target.end_byte;
                return;
            }
        }
    }
    alignments.push(current);
}
