use std::collections::HashSet;

use crate::libs::align::matcher::match_passages;
use crate::libs::align::merge::merge_passages;
use crate::libs::align::{Alignment, MatchOptions, NgramId, NgramMatch, Span};

/// Two-way refinement: run the matcher over the mirrored match stream and use
/// the reverse alignments to extend the forward ones, then merge the combined
/// sequence.
pub fn two_way_refine(
    matches: &[NgramMatch],
    banal: &HashSet<NgramId>,
    opt: &MatchOptions,
    alignments: Vec<Alignment>,
) -> Vec<Alignment> {
    let mut inverted: Vec<NgramMatch> = matches
        .iter()
        .map(|m| NgramMatch {
            source: m.target,
            target: m.source,
            ngram: m.ngram,
        })
        .collect();
    inverted.sort_unstable_by_key(|m| (m.source.index, m.target.index, m.ngram));
    let reverse = match_passages(&inverted, banal, opt);

    let refined = extend_with_reverse(alignments, &reverse);
    merge_passages(refined, opt)
}

/// Fold reverse-pass alignments into the forward ones.
///
/// A reverse alignment is spent on the first forward alignment it overlaps:
/// reaching back before the forward start extends it leftward, reaching past
/// the forward end extends it rightward. Reverse alignments that touch no
/// forward alignment are appended with their sides swapped back. The result
/// is resorted by byte position.
///
/// Note the sides: a reverse alignment's `source` is the target document and
/// its `target` is the source document.
pub fn extend_with_reverse(forward: Vec<Alignment>, reverse: &[Alignment]) -> Vec<Alignment> {
    let mut refined = forward;
    let mut consumed = vec![false; reverse.len()];

    for alignment in refined.iter_mut() {
        for (i, r) in reverse.iter().enumerate() {
            if consumed[i] {
                continue;
            }
            if r.target.start_byte < alignment.source.start_byte
                && r.target.end_byte >= alignment.source.start_byte
                && r.source.start_byte < alignment.target.start_byte
                && r.source.end_byte >= alignment.target.start_byte
            {
                // Reverse passage reaches back before the forward start
                *alignment = if r.target.end_byte > alignment.source.end_byte {
                    Alignment {
                        source: r.target,
                        target: r.source,
                    }
                } else {
                    Alignment {
                        source: Span {
                            start_byte: r.target.start_byte,
                            end_byte: alignment.source.end_byte,
                        },
                        target: Span {
                            start_byte: r.source.start_byte,
                            end_byte: alignment.target.end_byte,
                        },
                    }
                };
                consumed[i] = true;
                break;
            } else if r.target.end_byte > alignment.source.end_byte
                && r.target.start_byte <= alignment.source.end_byte
                && r.source.end_byte > alignment.target.end_byte
                && r.source.start_byte <= alignment.target.end_byte
            {
                // Reverse passage reaches past the forward end
                *alignment = Alignment {
                    source: Span {
                        start_byte: alignment.source.start_byte,
                        end_byte: r.target.end_byte,
                    },
                    target: Span {
                        start_byte: alignment.target.start_byte,
                        end_byte: r.source.end_byte,
                    },
                };
                consumed[i] = true;
                break;
            }
        }
    }

    for (i, r) in reverse.iter().enumerate() {
        if !consumed[i] {
            refined.push(Alignment {
                source: r.target,
                target: r.source,
            });
        }
    }

    refined.sort_unstable_by_key(|a| (a.source.start_byte, a.target.start_byte));
    refined
}
