use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

#[test]
fn command_invalid() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("textpair")?;
    cmd.arg("foobar");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("recognized"));

    Ok(())
}

#[test]
fn source_files_required() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("textpair")?;
    cmd.arg("align");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("required"));

    Ok(())
}

#[test]
fn source_dir_doesnt_exist() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("textpair")?;
    cmd.arg("align")
        .arg("--source_files")
        .arg("tests/dir/doesnt/exist");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("could not open"));

    Ok(())
}

// Eight shared ngrams at tokens 0..=7 covering bytes [0, 80) of an 80-byte
// text, identical in every document.
fn write_document(
    index_dir: &Path,
    text_dir: &Path,
    doc_id: &str,
) -> anyhow::Result<String> {
    let text_path = text_dir.join(format!("{}.txt", doc_id));
    let mut text = std::fs::File::create(&text_path)?;
    write!(text, "{}", "abcdefghij".repeat(8))?;

    let mut index = serde_json::Map::new();
    for token in 0u32..8 {
        index.insert(
            (token + 1).to_string(),
            json!([[token, token * 10, token * 10 + 9]]),
        );
    }
    std::fs::write(
        index_dir.join(format!("{}.json", doc_id)),
        serde_json::Value::Object(index).to_string(),
    )?;

    Ok(text_path.to_string_lossy().into_owned())
}

// Written by hand so the field order of the JSON document is fixed; the
// output header mirrors it
fn write_metadata(
    path: &Path,
    docs: &[(&str, &str, &str)], // (doc_id, filename, year)
) -> anyhow::Result<()> {
    let records: Vec<String> = docs
        .iter()
        .map(|(doc_id, filename, year)| {
            format!(
                r#""{}": {{"filename": "{}", "title": "Title {}", "author": "Author {}", "year": "{}"}}"#,
                doc_id, filename, doc_id, doc_id, year
            )
        })
        .collect();
    std::fs::write(path, format!("{{{}}}", records.join(", ")))?;
    Ok(())
}

fn result_pairs(output: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(output)?;
    let mut lines = content.lines();
    let header = lines.next().unwrap_or_default();
    assert!(header.starts_with("source_doc_id\tfilename\ttitle\tauthor\tyear"));
    assert!(header.contains("target_doc_id"));

    let mut pairs = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        // 1 id + 4 metadata + 2 bytes + 3 passages per side
        assert_eq!(fields.len(), 20);
        pairs.push((fields[0].to_string(), fields[10].to_string()));
    }
    pairs.sort();
    Ok(pairs)
}

#[test]
fn self_comparison_processes_each_pair_once() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let index_dir = dir.path().join("index");
    let text_dir = dir.path().join("texts");
    let output_dir = dir.path().join("output");
    std::fs::create_dir_all(&index_dir)?;
    std::fs::create_dir_all(&text_dir)?;

    let mut docs = Vec::new();
    for (doc_id, year) in [("a", "1700"), ("b", "1800"), ("c", "1900")] {
        let filename = write_document(&index_dir, &text_dir, doc_id)?;
        docs.push((doc_id, filename, year));
    }
    let metadata_path = dir.path().join("metadata.json");
    let docs: Vec<(&str, &str, &str)> = docs
        .iter()
        .map(|(id, filename, year)| (*id, filename.as_str(), *year))
        .collect();
    write_metadata(&metadata_path, &docs)?;

    let mut cmd = Command::cargo_bin("textpair")?;
    cmd.arg("align")
        .arg("--source_files")
        .arg(&index_dir)
        .arg("--source_metadata")
        .arg(&metadata_path)
        .arg("--output_path")
        .arg(&output_dir)
        .arg("--threads")
        .arg("2");
    cmd.assert().success();

    let pairs = result_pairs(&output_dir.join("alignments_results.tab"))?;
    assert_eq!(
        pairs,
        [
            ("a".to_string(), "b".to_string()),
            ("a".to_string(), "c".to_string()),
            ("b".to_string(), "c".to_string()),
        ]
    );

    Ok(())
}

#[test]
fn self_comparison_dedup_holds_across_batches() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let index_dir = dir.path().join("index");
    let text_dir = dir.path().join("texts");
    let output_dir = dir.path().join("output");
    std::fs::create_dir_all(&index_dir)?;
    std::fs::create_dir_all(&text_dir)?;

    let mut docs = Vec::new();
    for (doc_id, year) in [("a", "1700"), ("b", "1800"), ("c", "1900"), ("d", "2000")] {
        let filename = write_document(&index_dir, &text_dir, doc_id)?;
        docs.push((doc_id, filename, year));
    }
    let metadata_path = dir.path().join("metadata.json");
    let docs: Vec<(&str, &str, &str)> = docs
        .iter()
        .map(|(id, filename, year)| (*id, filename.as_str(), *year))
        .collect();
    write_metadata(&metadata_path, &docs)?;

    let mut cmd = Command::cargo_bin("textpair")?;
    cmd.arg("align")
        .arg("--source_files")
        .arg(&index_dir)
        .arg("--source_metadata")
        .arg(&metadata_path)
        .arg("--output_path")
        .arg(&output_dir)
        .arg("--batch_size")
        .arg("2")
        .arg("--threads")
        .arg("2");
    cmd.assert().success();

    let pairs = result_pairs(&output_dir.join("alignments_results.tab"))?;
    assert_eq!(pairs.len(), 6);
    for (source, target) in &pairs {
        assert_ne!(source, target);
        assert!(!pairs.contains(&(target.clone(), source.clone())));
    }

    Ok(())
}

#[test]
fn sort_field_gates_comparison_direction() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let source_dir = dir.path().join("source");
    let target_dir = dir.path().join("target");
    let text_dir = dir.path().join("texts");
    let output_dir = dir.path().join("output");
    std::fs::create_dir_all(&source_dir)?;
    std::fs::create_dir_all(&target_dir)?;
    std::fs::create_dir_all(&text_dir)?;

    // The source is newer than the target, so the pair is skipped
    let source_text = write_document(&source_dir, &text_dir, "newer")?;
    let target_text = write_document(&target_dir, &text_dir, "older")?;
    let source_metadata = dir.path().join("source_metadata.json");
    let target_metadata = dir.path().join("target_metadata.json");
    write_metadata(&source_metadata, &[("newer", source_text.as_str(), "1900")])?;
    write_metadata(&target_metadata, &[("older", target_text.as_str(), "1800")])?;

    let mut cmd = Command::cargo_bin("textpair")?;
    cmd.arg("align")
        .arg("--source_files")
        .arg(&source_dir)
        .arg("--target_files")
        .arg(&target_dir)
        .arg("--source_metadata")
        .arg(&source_metadata)
        .arg("--target_metadata")
        .arg(&target_metadata)
        .arg("--output_path")
        .arg(&output_dir);
    cmd.assert().success();

    let content = std::fs::read_to_string(output_dir.join("alignments_results.tab"))?;
    assert_eq!(content.lines().count(), 1); // header only

    Ok(())
}

#[test]
fn html_output_renders_blocks() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let source_dir = dir.path().join("source");
    let target_dir = dir.path().join("target");
    let text_dir = dir.path().join("texts");
    let output_dir = dir.path().join("output");
    std::fs::create_dir_all(&source_dir)?;
    std::fs::create_dir_all(&target_dir)?;
    std::fs::create_dir_all(&text_dir)?;

    let source_text = write_document(&source_dir, &text_dir, "older")?;
    let target_text = write_document(&target_dir, &text_dir, "newer")?;
    let source_metadata = dir.path().join("source_metadata.json");
    let target_metadata = dir.path().join("target_metadata.json");
    write_metadata(&source_metadata, &[("older", source_text.as_str(), "1800")])?;
    write_metadata(&target_metadata, &[("newer", target_text.as_str(), "1900")])?;

    let mut cmd = Command::cargo_bin("textpair")?;
    cmd.arg("align")
        .arg("--source_files")
        .arg(&source_dir)
        .arg("--target_files")
        .arg(&target_dir)
        .arg("--source_metadata")
        .arg(&source_metadata)
        .arg("--target_metadata")
        .arg(&target_metadata)
        .arg("--output_format")
        .arg("html")
        .arg("--output_path")
        .arg(&output_dir);
    cmd.assert().success();

    let content = std::fs::read_to_string(output_dir.join("alignments_results.html"))?;
    assert!(content.starts_with("<html>"));
    assert!(content.contains("<h1>===================</h1>"));
    assert!(content.contains("Title older, (Author older)"));
    assert!(content.contains("<span style='color:red'>"));

    Ok(())
}
