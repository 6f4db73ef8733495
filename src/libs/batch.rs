use std::collections::HashSet;
use std::path::PathBuf;

use log::info;
use rayon::prelude::*;

use crate::libs::align::matcher::{banal_ngrams, build_matches, intersect_ngrams, match_passages};
use crate::libs::align::refine::two_way_refine;
use crate::libs::align::{Alignment, MatchOptions, NgramId};
use crate::libs::corpus::{load_doc_indexes, sort_value, DocIndex, Metadata};
use crate::libs::output::OutputWriter;

/// All alignments found between one source document and one target document.
#[derive(Debug, Clone)]
pub struct AlignmentsPerDoc {
    pub doc_id: String,
    pub alignments: Vec<Alignment>,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub threads: usize,
    pub batch_size: usize,
    pub sort_field: String,
}

/// Ceiling-divide a file list into `batch_size` contiguous chunks.
///
/// ```
/// # use std::path::PathBuf;
/// # use textpair::partition_batches;
/// let files: Vec<PathBuf> = (1..=5).map(|i| PathBuf::from(format!("{}.json", i))).collect();
/// let batches = partition_batches(&files, 2);
/// assert_eq!(batches.len(), 2);
/// assert_eq!(batches[0].len(), 3);
/// assert_eq!(batches[1].len(), 2);
/// ```
pub fn partition_batches(files: &[PathBuf], batch_size: usize) -> Vec<Vec<PathBuf>> {
    if files.is_empty() {
        return Vec::new();
    }
    let batch_size = batch_size.max(1);
    let chunk_size = (files.len() + batch_size - 1) / batch_size;
    files
        .chunks(chunk_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Run the full cartesian comparison across batches and write results.
/// Returns the total number of alignments found.
///
/// With an empty `target_batches` the source corpus is compared to itself:
/// mirrored batch pairs are skipped, the identity pair is never processed,
/// and a document already finished as a source is skipped as a target.
pub fn run(
    source_batches: &[Vec<PathBuf>],
    target_batches: &[Vec<PathBuf>],
    source_metadata: &Metadata,
    target_metadata: &Metadata,
    common_ngrams: &HashSet<NgramId>,
    opt: &MatchOptions,
    batch: &BatchOptions,
    output: &mut OutputWriter,
) -> anyhow::Result<usize> {
    let self_comparison = target_batches.is_empty();
    let target_batch_count = if self_comparison {
        source_batches.len()
    } else {
        target_batches.len()
    };

    let mut source_files_done: HashSet<String> = HashSet::new();
    let mut total = 0usize;

    for (source_batch_number, source_batch) in source_batches.iter().enumerate() {
        if source_batches.len() > 1 {
            info!("Loading source batch {}...", source_batch_number + 1);
        } else {
            info!("Loading source files...");
        }
        let source_indexes = load_doc_indexes(source_batch)?;

        for target_batch_number in 0..target_batch_count {
            if self_comparison && source_batch_number > target_batch_number {
                // already compared in the other direction
                continue;
            }

            let loaded;
            let target_indexes: &[DocIndex] =
                if self_comparison && target_batch_number == source_batch_number {
                    &source_indexes
                } else {
                    let paths = if self_comparison {
                        &source_batches[target_batch_number]
                    } else {
                        &target_batches[target_batch_number]
                    };
                    if target_batch_count > 1 {
                        info!("Loading target batch {}...", target_batch_number + 1);
                    }
                    loaded = load_doc_indexes(paths)?;
                    &loaded
                };

            let mut local_done = if self_comparison {
                source_files_done.clone()
            } else {
                HashSet::new()
            };

            for source in &source_indexes {
                if target_batch_count > 1 {
                    info!(
                        "Comparing source file {} to target batch {}...",
                        source.doc_id,
                        target_batch_number + 1
                    );
                } else {
                    info!("Comparing source file {} to all...", source.doc_id);
                }

                let results = compare_to_targets(
                    source,
                    target_indexes,
                    source_metadata,
                    target_metadata,
                    &local_done,
                    self_comparison,
                    common_ngrams,
                    opt,
                    batch,
                );

                total += results
                    .iter()
                    .map(|per_doc| per_doc.alignments.len())
                    .sum::<usize>();
                if !results.is_empty() {
                    output.write_alignments(
                        &source.doc_id,
                        source_metadata,
                        target_metadata,
                        &results,
                    )?;
                }
                if self_comparison && source_batch_number == target_batch_number {
                    local_done.insert(source.doc_id.clone());
                }
            }

            if self_comparison {
                source_files_done.extend(local_done);
            }
            // target indexes drop here, before the next batch loads
        }
    }

    Ok(total)
}

/// Compare one source document against a target batch, sharded across the
/// worker pool. Each worker owns a contiguous slice of the targets and sends
/// its private result list through a bounded channel; results are drained
/// after all workers finish.
#[allow(clippy::too_many_arguments)]
fn compare_to_targets(
    source: &DocIndex,
    target_indexes: &[DocIndex],
    source_metadata: &Metadata,
    target_metadata: &Metadata,
    local_done: &HashSet<String>,
    self_comparison: bool,
    common_ngrams: &HashSet<NgramId>,
    opt: &MatchOptions,
    batch: &BatchOptions,
) -> Vec<AlignmentsPerDoc> {
    if target_indexes.is_empty() {
        return Vec::new();
    }

    let threads = batch.threads.max(1);
    let shard_size = (target_indexes.len() + threads - 1) / threads;
    let shards: Vec<&[DocIndex]> = target_indexes.chunks(shard_size).collect();

    let (sender, receiver) = crossbeam::channel::bounded::<Vec<AlignmentsPerDoc>>(threads);
    shards.par_iter().for_each(|shard| {
        let mut local: Vec<AlignmentsPerDoc> = Vec::new();
        for target in *shard {
            if let Some(per_doc) = compare_pair(
                source,
                target,
                source_metadata,
                target_metadata,
                local_done,
                self_comparison,
                common_ngrams,
                opt,
                batch,
            ) {
                local.push(per_doc);
            }
        }
        sender.send(local).unwrap();
    });
    drop(sender);

    let mut combined: Vec<AlignmentsPerDoc> = Vec::new();
    for mut local in receiver {
        combined.append(&mut local);
    }
    combined
}

#[allow(clippy::too_many_arguments)]
fn compare_pair(
    source: &DocIndex,
    target: &DocIndex,
    source_metadata: &Metadata,
    target_metadata: &Metadata,
    local_done: &HashSet<String>,
    self_comparison: bool,
    common_ngrams: &HashSet<NgramId>,
    opt: &MatchOptions,
    batch: &BatchOptions,
) -> Option<AlignmentsPerDoc> {
    // Directional gate: only compare forward along the sort field
    let source_value = sort_value(source_metadata, &source.doc_id, &batch.sort_field);
    let target_value = sort_value(target_metadata, &target.doc_id, &batch.sort_field);
    if source_value > target_value {
        return None;
    }
    if self_comparison {
        if source.doc_id == target.doc_id {
            return None;
        }
        if local_done.contains(&target.doc_id) {
            return None;
        }
    }

    let shared = intersect_ngrams(source, target);
    if shared.len() < opt.minimum_matching_ngrams_in_docs {
        return None;
    }
    let banal = banal_ngrams(&shared, opt.banal_ngrams, common_ngrams);
    let matches = build_matches(source, target, &shared);
    let mut alignments = match_passages(&matches, &banal, opt);
    if opt.two_way_matching {
        alignments = two_way_refine(&matches, &banal, opt, alignments);
    }

    if alignments.is_empty() {
        None
    } else {
        Some(AlignmentsPerDoc {
            doc_id: target.doc_id.clone(),
            alignments,
        })
    }
}

/// Every (source, target) pair the self-comparison schedule would process,
/// in schedule order, before the sort-field gate. Mirrors the dedup rules of
/// `run` so the schedule can be checked without loading any index.
pub fn self_comparison_pairs(batches: &[Vec<PathBuf>]) -> Vec<(String, String)> {
    use crate::libs::corpus::doc_id_from_path;

    let mut pairs = Vec::new();
    let mut done: HashSet<String> = HashSet::new();
    let ids: Vec<Vec<String>> = batches
        .iter()
        .map(|batch| batch.iter().map(|p| doc_id_from_path(p)).collect())
        .collect();

    for (sb, source_batch) in ids.iter().enumerate() {
        for (tb, target_batch) in ids.iter().enumerate() {
            if sb > tb {
                continue;
            }
            let mut local_done = done.clone();
            for source in source_batch {
                for target in target_batch {
                    if source == target || local_done.contains(target) {
                        continue;
                    }
                    pairs.push((source.clone(), target.clone()));
                }
                if sb == tb {
                    local_done.insert(source.clone());
                }
            }
            done.extend(local_done);
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|n| PathBuf::from(format!("{}.json", n)))
            .collect()
    }

    #[test]
    fn batches_cover_all_files() {
        let files = paths(&["1", "2", "3", "4", "5", "6", "7"]);
        let batches = partition_batches(&files, 3);
        assert_eq!(batches.len(), 3);
        let flattened: Vec<PathBuf> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, files);

        // More batches than files still covers everything exactly once
        let batches = partition_batches(&files, 100);
        let flattened: Vec<PathBuf> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, files);
    }

    #[test]
    fn self_comparison_processes_each_unordered_pair_once() {
        let batches = partition_batches(&paths(&["A", "B", "C"]), 1);
        let pairs = self_comparison_pairs(&batches);
        assert_eq!(
            pairs,
            [
                ("A".to_string(), "B".to_string()),
                ("A".to_string(), "C".to_string()),
                ("B".to_string(), "C".to_string()),
            ]
        );
    }

    #[test]
    fn self_comparison_dedup_holds_across_batches() {
        let batches = partition_batches(&paths(&["A", "B", "C", "D"]), 2);
        let pairs = self_comparison_pairs(&batches);

        // No identity pairs, no unordered duplicates, full coverage
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for (s, t) in &pairs {
            assert_ne!(s, t);
            assert!(seen.insert((s.clone(), t.clone())), "duplicate {:?}", (s, t));
            assert!(
                !seen.contains(&(t.clone(), s.clone())),
                "mirrored duplicate {:?}",
                (s, t)
            );
        }
        assert_eq!(pairs.len(), 6);
    }
}
