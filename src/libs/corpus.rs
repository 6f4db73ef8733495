use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use indexmap::IndexMap;

use crate::libs::align::{NgramId, NgramPos};

/// docId -> field -> value, both levels in load order. The field order of the
/// first record drives the output column order.
pub type Metadata = IndexMap<String, IndexMap<String, String>>;

/// In-memory n-gram index of one document. Position lists are ordered by
/// token index ascending; upstream guarantees this and it is not re-checked.
#[derive(Debug, Clone)]
pub struct DocIndex {
    pub doc_id: String,
    pub ngrams: HashMap<NgramId, Vec<NgramPos>>,
}

/// File base name minus its extension.
pub fn doc_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read a metadata JSON file. An empty path yields an empty map; unparsable
/// content also yields an empty map so the affected pairs are skipped
/// downstream.
pub fn load_metadata(infile: &str) -> anyhow::Result<Metadata> {
    if infile.is_empty() {
        return Ok(Metadata::new());
    }
    let json = std::fs::read_to_string(infile)
        .with_context(|| format!("could not open {}", infile))?;
    Ok(serde_json::from_str(&json).unwrap_or_default())
}

/// Read one per-document index file: a JSON object from stringified ngram id
/// to a list of [token index, start byte, end byte] triples.
pub fn load_doc_index(path: &Path) -> anyhow::Result<DocIndex> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("could not open {}", path.display()))?;
    let raw: HashMap<String, Vec<[u32; 3]>> = serde_json::from_str(&json).unwrap_or_default();

    let mut ngrams = HashMap::with_capacity(raw.len());
    for (key, positions) in raw {
        if let Ok(ngram) = key.parse::<NgramId>() {
            let positions = positions
                .into_iter()
                .map(|p| NgramPos {
                    index: p[0],
                    start_byte: p[1],
                    end_byte: p[2],
                })
                .collect();
            ngrams.insert(ngram, positions);
        }
    }

    Ok(DocIndex {
        doc_id: doc_id_from_path(path),
        ngrams,
    })
}

pub fn load_doc_indexes(paths: &[PathBuf]) -> anyhow::Result<Vec<DocIndex>> {
    paths.iter().map(|path| load_doc_index(path)).collect()
}

/// Union of the source and target common-ngram lists, each truncated to
/// `threshold` entries. Entries that do not parse as ngram ids are dropped.
pub fn load_common_ngrams(
    source_file: &str,
    target_file: &str,
    threshold: usize,
) -> anyhow::Result<HashSet<NgramId>> {
    let mut common = HashSet::new();
    for infile in [source_file, target_file] {
        if infile.is_empty() {
            continue;
        }
        let json = std::fs::read_to_string(infile)
            .with_context(|| format!("could not open {}", infile))?;
        let mut listed: Vec<String> = serde_json::from_str(&json).unwrap_or_default();
        listed.truncate(threshold);
        common.extend(listed.iter().filter_map(|ngram| ngram.parse::<NgramId>().ok()));
    }
    Ok(common)
}

/// Enumerate a corpus directory and order the files for comparison.
///
/// When the configured sort field is present in the metadata the files are
/// ordered by it, numerically if the probed value parses as an integer, with
/// docId as tie-break. Otherwise files are ordered by docId parsed as an
/// integer (unparsable stems order as 0).
pub fn list_corpus_files(
    dir: &str,
    metadata: &Metadata,
    sort_field: &str,
) -> anyhow::Result<Vec<PathBuf>> {
    if dir.is_empty() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("could not open {}", dir))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    // Probe one record to learn whether the field exists and is numeric
    let mut field = sort_field;
    let mut numeric = false;
    match metadata.first() {
        Some((_, fields)) => match fields.get(field) {
            Some(value) => numeric = value.parse::<i64>().is_ok(),
            None => field = "",
        },
        None => field = "",
    }

    if field.is_empty() {
        files.sort_by_cached_key(|path| {
            let doc_id = doc_id_from_path(path);
            (doc_id.parse::<i64>().unwrap_or(0), doc_id)
        });
    } else {
        files.sort_by(|a, b| {
            let first = doc_id_from_path(a);
            let second = doc_id_from_path(b);
            let first_value = sort_value(metadata, &first, field);
            let second_value = sort_value(metadata, &second, field);
            let ordering = if numeric {
                match (first_value.parse::<i64>(), second_value.parse::<i64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => Ordering::Equal,
                }
            } else {
                first_value.cmp(second_value)
            };
            ordering.then_with(|| first.cmp(&second))
        });
    }

    Ok(files)
}

pub fn sort_value<'a>(metadata: &'a Metadata, doc_id: &str, field: &str) -> &'a str {
    metadata
        .get(doc_id)
        .and_then(|fields| fields.get(field))
        .map(|value| value.as_str())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn doc_index_from_json() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("42.json");
        let mut file = std::fs::File::create(&path)?;
        write!(file, r#"{{"7": [[0, 0, 5], [10, 40, 45]], "9": [[1, 6, 11]]}}"#)?;

        let index = load_doc_index(&path)?;
        assert_eq!(index.doc_id, "42");
        assert_eq!(index.ngrams.len(), 2);
        assert_eq!(
            index.ngrams[&7][1],
            NgramPos {
                index: 10,
                start_byte: 40,
                end_byte: 45
            }
        );

        Ok(())
    }

    #[test]
    fn malformed_index_yields_empty() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not json at all")?;

        let index = load_doc_index(&path)?;
        assert_eq!(index.doc_id, "broken");
        assert!(index.ngrams.is_empty());

        Ok(())
    }

    #[test]
    fn corpus_files_sorted_by_numeric_field() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        for name in ["a.json", "b.json", "c.json"] {
            std::fs::write(dir.path().join(name), "{}")?;
        }
        let metadata: Metadata = serde_json::from_str(
            r#"{
                "a": {"filename": "a.txt", "year": "1850"},
                "b": {"filename": "b.txt", "year": "1750"},
                "c": {"filename": "c.txt", "year": "1800"}
            }"#,
        )?;

        let files = list_corpus_files(dir.path().to_str().unwrap(), &metadata, "year")?;
        let ids: Vec<String> = files.iter().map(|f| doc_id_from_path(f)).collect();
        assert_eq!(ids, ["b", "c", "a"]);

        Ok(())
    }

    #[test]
    fn corpus_files_fall_back_to_doc_id_order() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        for name in ["10.json", "2.json", "1.json"] {
            std::fs::write(dir.path().join(name), "{}")?;
        }

        let files = list_corpus_files(dir.path().to_str().unwrap(), &Metadata::new(), "year")?;
        let ids: Vec<String> = files.iter().map(|f| doc_id_from_path(f)).collect();
        assert_eq!(ids, ["1", "2", "10"]);

        Ok(())
    }
}
