use crate::core::extractor::FieldExtractor;
use crate::core::parser::{DecodeError, UniversalParser};
use crate::core::record::{ExtractedTrainingRecord, Field};
use crate::DocumentFormat;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "summary.json";

/// One extracted record plus enough context for a reviewer to act on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionReport {
    pub source_file: String,
    pub format: DocumentFormat,
    pub extracted_at: DateTime<Utc>,
    pub populated_fields: Vec<Field>,
    pub missing_fields: Vec<Field>,
    pub record: ExtractedTrainingRecord,
}

impl ExtractionReport {
    pub fn new(source_file: String, format: DocumentFormat, record: ExtractedTrainingRecord) -> Self {
        Self {
            source_file,
            format,
            extracted_at: Utc::now(),
            populated_fields: record.populated_fields(),
            missing_fields: record.missing_fields(),
            record,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Extracted {
        source_file: String,
        output_file: String,
        populated_fields: usize,
    },
    Failed {
        source_file: String,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processed: usize,
    pub failed: usize,
    pub outcomes: Vec<FileOutcome>,
}

pub struct DocumentProcessor {
    parser: UniversalParser,
    extractor: FieldExtractor,
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentProcessor {
    pub fn new() -> Self {
        Self {
            parser: UniversalParser::new(),
            extractor: FieldExtractor::new(),
        }
    }

    pub fn with_parts(parser: UniversalParser, extractor: FieldExtractor) -> Self {
        Self { parser, extractor }
    }

    pub fn extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    /// Decode and extract a document already held in memory.
    pub fn extract_upload(&self, file_name: &str, bytes: &[u8]) -> Result<ExtractionReport, DecodeError> {
        let parsed = self.parser.parse_upload(file_name, bytes)?;
        let record = self.extractor.extract(&parsed.text);
        if record.is_empty() {
            warn!("no course fields found in {}", file_name);
        }
        Ok(ExtractionReport::new(file_name.to_string(), parsed.format, record))
    }

    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<ExtractionReport, DecodeError> {
        let path = path.as_ref();
        let parsed = self.parser.parse(path)?;
        let record = self.extractor.extract(&parsed.text);
        if record.is_empty() {
            warn!("no course fields found in {}", path.display());
        }
        Ok(ExtractionReport::new(display_name(path), parsed.format, record))
    }

    /// Extract every supported document in `input_dir` and write one JSON report per
    /// document into `output_dir`, followed by a `summary.json`.
    ///
    /// A document that fails to decode is logged and recorded in the summary; the
    /// rest of the batch still runs.
    pub fn process_documents<P: AsRef<Path>, Q: AsRef<Path>>(&self, input_dir: P, output_dir: Q) -> Result<BatchSummary> {
        let input_path = input_dir.as_ref();
        let output_path = output_dir.as_ref();
        let started_at = Utc::now();

        info!("Starting to process documents from: {}", input_path.display());

        fs::create_dir_all(output_path)
            .with_context(|| format!("Failed to create output directory {}", output_path.display()))?;

        let documents = self.collect_documents(input_path)?;
        info!("Found {} documents to extract", documents.len());

        let outcomes: Vec<FileOutcome> = documents
            .par_iter()
            .map(|path| self.process_file(path, output_path))
            .collect();

        let failed = outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Failed { .. }))
            .count();
        let summary = BatchSummary {
            started_at,
            finished_at: Utc::now(),
            processed: outcomes.len() - failed,
            failed,
            outcomes,
        };

        let summary_path = output_path.join(SUMMARY_FILE);
        write_json(&summary, &summary_path)?;

        info!(
            "Completed batch: {} extracted, {} failed (summary at {})",
            summary.processed,
            summary.failed,
            summary_path.display()
        );
        Ok(summary)
    }

    fn collect_documents(&self, input_path: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(input_path)
            .with_context(|| format!("Failed to read input directory {}", input_path.display()))?;

        let mut documents = Vec::new();
        for entry in entries {
            let path = entry.context("Failed to read directory entry")?.path();
            if !path.is_file() {
                debug!("Skipping non-file entry: {}", path.display());
                continue;
            }
            if DocumentFormat::from_path(&path).is_none() {
                debug!("Skipping unsupported file: {}", path.display());
                continue;
            }
            documents.push(path);
        }
        documents.sort();
        Ok(documents)
    }

    fn process_file(&self, path: &Path, output_dir: &Path) -> FileOutcome {
        let source_file = display_name(path);
        debug!("Processing file: {}", path.display());

        let written = self
            .extract_file(path)
            .map_err(anyhow::Error::from)
            .and_then(|report| {
                let output_file = output_dir.join(format!("{}.json", source_file));
                write_json(&report, &output_file)?;
                Ok((report, output_file))
            });

        match written {
            Ok((report, output_file)) => {
                debug!(
                    "Extracted {} fields from {}",
                    report.populated_fields.len(),
                    source_file
                );
                FileOutcome::Extracted {
                    source_file,
                    output_file: display_name(&output_file),
                    populated_fields: report.populated_fields.len(),
                }
            }
            Err(e) => {
                error!("Failed to process {}: {:#}", source_file, e);
                FileOutcome::Failed {
                    source_file,
                    error: format!("{:#}", e),
                }
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_report_lists_missing_fields() {
        let processor = DocumentProcessor::new();
        let report = processor
            .extract_upload("outline.txt", b"Title\nBusiness Writing Clinic\nHRDCorp Approval No: 1000")
            .unwrap();

        assert_eq!(report.format, DocumentFormat::Txt);
        assert_eq!(report.record.title, "Business Writing Clinic");
        assert_eq!(
            report.populated_fields,
            vec![Field::Title, Field::Description, Field::HrdcorpApprovalNo]
        );
        assert!(report.missing_fields.contains(&Field::Objectives));
    }

    #[test]
    fn unsupported_upload_is_an_error() {
        let processor = DocumentProcessor::new();
        assert!(processor.extract_upload("deck.pptx", b"slides").is_err());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = FileOutcome::Failed {
            source_file: "broken.docx".into(),
            error: "invalid docx container".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["source_file"], "broken.docx");
    }
}
