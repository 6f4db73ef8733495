use std::io::{Read, Seek, SeekFrom};

use anyhow::Context;
use regex::Regex;

use crate::libs::align::Span;

lazy_static! {
    static ref TAGS: Regex = Regex::new("<[^>]*?>").unwrap();
    static ref BROKEN_BEGIN_TAGS: Regex = Regex::new("^[^<]*?>").unwrap();
    static ref BROKEN_END_TAGS: Regex = Regex::new("<[^>]*?$").unwrap();
    static ref SPACES: Regex = Regex::new(" +").unwrap();
}

/// Read the byte range `[start_byte, end_byte)` from an original text file
/// and clean it up for display: lossy UTF-8, tag residue stripped, tabs and
/// newlines flattened, space runs collapsed. Negative starts clamp to the
/// beginning of the file; ranges past EOF shorten to what is there.
pub fn passage_text(filename: &str, start_byte: i64, end_byte: i64) -> anyhow::Result<String> {
    let mut file = std::fs::File::open(filename)
        .with_context(|| format!("could not open {}", filename))?;
    let start = start_byte.max(0);
    let length = (end_byte - start).max(0) as u64;
    file.seek(SeekFrom::Start(start as u64))?;

    let mut buffer = Vec::with_capacity(length as usize);
    file.take(length).read_to_end(&mut buffer)?;

    let text = String::from_utf8_lossy(&buffer);
    let text = TAGS.replace_all(&text, "");
    let text = BROKEN_BEGIN_TAGS.replace_all(&text, "");
    let text = BROKEN_END_TAGS.replace_all(&text, "");
    let text = text.replace(['\t', '\n'], " ");
    Ok(SPACES.replace_all(&text, " ").into_owned())
}

/// The three display pieces for one side of an alignment: before-context,
/// the passage itself, after-context.
pub fn passage_with_context(
    filename: &str,
    span: &Span,
    context_size: u32,
) -> anyhow::Result<[String; 3]> {
    let start = span.start_byte as i64;
    let end = span.end_byte as i64;
    let before = passage_text(filename, start - context_size as i64, start)?;
    let passage = passage_text(filename, start, end)?;
    let after = passage_text(filename, end, end + context_size as i64)?;
    Ok([before, passage, after])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn passage_is_cleaned_and_clamped() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("doc.txt");
        let mut file = std::fs::File::create(&path)?;
        write!(file, "one <b>two</b>\tthree\nfour   five")?;
        let filename = path.to_str().unwrap().to_string();

        // Negative start clamps to 0; tags and whitespace are normalized
        let text = passage_text(&filename, -10, 20)?;
        assert_eq!(text, "one two three");

        // Reading past EOF returns what is available
        let tail = passage_text(&filename, 21, 1000)?;
        assert_eq!(tail, "four five");

        Ok(())
    }

    #[test]
    fn broken_tag_fragments_are_stripped() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "b>middle words<i class")?;
        let filename = path.to_str().unwrap().to_string();

        let text = passage_text(&filename, 0, 22)?;
        assert_eq!(text, "middle words");

        Ok(())
    }
}
