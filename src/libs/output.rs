use std::io::Write;
use std::path::Path;

use anyhow::Context;

use crate::libs::align::Alignment;
use crate::libs::batch::AlignmentsPerDoc;
use crate::libs::context::passage_with_context;
use crate::libs::corpus::Metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tab,
    Html,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Self {
        match name {
            "html" => Self::Html,
            _ => Self::Tab,
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            Self::Tab => "tab",
            Self::Html => "html",
        }
    }
}

/// Writes `alignments_results.tab` (or `.html`) under the output directory.
/// Metadata columns appear in the field order of the first metadata record.
pub struct OutputWriter {
    writer: std::io::BufWriter<std::fs::File>,
    format: OutputFormat,
    source_fields: Vec<String>,
    target_fields: Vec<String>,
    context_size: u32,
}

impl OutputWriter {
    pub fn create(
        output_path: &str,
        format: OutputFormat,
        source_metadata: &Metadata,
        target_metadata: &Metadata,
        context_size: u32,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(output_path)
            .with_context(|| format!("could not create {}", output_path))?;
        let outfile =
            Path::new(output_path).join(format!("alignments_results.{}", format.extension()));
        let file = std::fs::File::create(&outfile)
            .with_context(|| format!("could not create {}", outfile.display()))?;

        let source_fields = metadata_fields(source_metadata);
        let target_fields = metadata_fields(target_metadata);

        let mut writer = Self {
            writer: std::io::BufWriter::new(file),
            format,
            source_fields,
            target_fields,
            context_size,
        };
        writer.write_header()?;
        Ok(writer)
    }

    fn write_header(&mut self) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Tab => {
                let mut columns = vec!["source_doc_id".to_string()];
                columns.extend(self.source_fields.iter().cloned());
                columns.extend(
                    ["source_start_byte", "source_end_byte"].map(String::from),
                );
                columns.extend(
                    ["source_context_before", "source_passage", "source_context_after"]
                        .map(String::from),
                );
                columns.push("target_doc_id".to_string());
                columns.extend(self.target_fields.iter().cloned());
                columns.extend(
                    ["target_start_byte", "target_end_byte"].map(String::from),
                );
                columns.extend(
                    ["target_context_before", "target_passage", "target_context_after"]
                        .map(String::from),
                );
                writeln!(self.writer, "{}", columns.join("\t"))?;
            }
            OutputFormat::Html => {
                writeln!(self.writer, "<html>")?;
            }
        }
        Ok(())
    }

    /// Write every alignment found for one source document.
    pub fn write_alignments(
        &mut self,
        source_id: &str,
        source_metadata: &Metadata,
        target_metadata: &Metadata,
        results: &[AlignmentsPerDoc],
    ) -> anyhow::Result<()> {
        let source_values = field_values(source_metadata, source_id, &self.source_fields);
        let source_filename = metadata_value(source_metadata, source_id, "filename");
        for per_doc in results {
            let target_values = field_values(target_metadata, &per_doc.doc_id, &self.target_fields);
            let target_filename = metadata_value(target_metadata, &per_doc.doc_id, "filename");
            for alignment in &per_doc.alignments {
                match self.format {
                    OutputFormat::Tab => self.write_tab_row(
                        alignment,
                        source_id,
                        &source_values,
                        &source_filename,
                        &per_doc.doc_id,
                        &target_values,
                        &target_filename,
                    )?,
                    OutputFormat::Html => self.write_html_block(
                        alignment,
                        source_metadata,
                        source_id,
                        &source_filename,
                        target_metadata,
                        &per_doc.doc_id,
                        &target_filename,
                    )?,
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_tab_row(
        &mut self,
        alignment: &Alignment,
        source_id: &str,
        source_values: &[String],
        source_filename: &str,
        target_id: &str,
        target_values: &[String],
        target_filename: &str,
    ) -> anyhow::Result<()> {
        let source_passages =
            passage_with_context(source_filename, &alignment.source, self.context_size)?;
        let target_passages =
            passage_with_context(target_filename, &alignment.target, self.context_size)?;

        let mut fields = vec![source_id.to_string()];
        fields.extend(source_values.iter().cloned());
        fields.push(alignment.source.start_byte.to_string());
        fields.push(alignment.source.end_byte.to_string());
        fields.extend(source_passages);
        fields.push(target_id.to_string());
        fields.extend(target_values.iter().cloned());
        fields.push(alignment.target.start_byte.to_string());
        fields.push(alignment.target.end_byte.to_string());
        fields.extend(target_passages);
        writeln!(self.writer, "{}", fields.join("\t"))?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_html_block(
        &mut self,
        alignment: &Alignment,
        source_metadata: &Metadata,
        source_id: &str,
        source_filename: &str,
        target_metadata: &Metadata,
        target_id: &str,
        target_filename: &str,
    ) -> anyhow::Result<()> {
        let source_passages =
            passage_with_context(source_filename, &alignment.source, self.context_size)?;
        let target_passages =
            passage_with_context(target_filename, &alignment.target, self.context_size)?;

        writeln!(self.writer, "<h1>===================</h1>")?;
        writeln!(self.writer, "<div><button type='button'>Diff alignments</button>")?;
        writeln!(
            self.writer,
            "<h4>====== Source ======</h4><h5>{}, ({})</h5>",
            metadata_value(source_metadata, source_id, "title"),
            metadata_value(source_metadata, source_id, "author"),
        )?;
        writeln!(
            self.writer,
            "<p>{} <span style='color:red'>{}</span> {}</p>",
            source_passages[0], source_passages[1], source_passages[2],
        )?;
        writeln!(
            self.writer,
            "<h4>====== Target ======</h4><h5>{}, ({})</h5>",
            metadata_value(target_metadata, target_id, "title"),
            metadata_value(target_metadata, target_id, "author"),
        )?;
        writeln!(
            self.writer,
            "<p>{} <span style='color:red'>{}</span> {}</p>",
            target_passages[0], target_passages[1], target_passages[2],
        )?;
        writeln!(self.writer, "</div>")?;
        Ok(())
    }

    pub fn finish(&mut self) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn metadata_fields(metadata: &Metadata) -> Vec<String> {
    metadata
        .first()
        .map(|(_, fields)| fields.keys().cloned().collect())
        .unwrap_or_default()
}

fn field_values(metadata: &Metadata, doc_id: &str, fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .map(|field| metadata_value(metadata, doc_id, field))
        .collect()
}

fn metadata_value(metadata: &Metadata, doc_id: &str, field: &str) -> String {
    metadata
        .get(doc_id)
        .and_then(|fields| fields.get(field))
        .cloned()
        .unwrap_or_default()
}
