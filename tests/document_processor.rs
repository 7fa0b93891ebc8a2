use course_intake::utils::document_processor::{DocumentProcessor, FileOutcome, SUMMARY_FILE};
use course_intake::DocumentFormat;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::tempdir;
use zip::write::FileOptions;
use zip::ZipWriter;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const OUTLINE_TXT: &str = "\
COURSE OUTLINE
Title
Business Writing Clinic
HRDCorp Approval No: 10005555
Objectives
1. Write clear and concise emails
2. Structure reports for decision makers
Course Contents
Module 1: Plain language
Who Should Attend
Executives and officers
";

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
        W_NS, body
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("word/document.xml", FileOptions::default()).unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    let bytes = writer.finish().unwrap().into_inner();
    fs::write(path, bytes).unwrap();
}

#[test]
fn batch_writes_reports_and_continues_past_failures() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();

    fs::write(input.path().join("outline.txt"), OUTLINE_TXT).unwrap();
    write_docx(
        &input.path().join("leadership.docx"),
        &[
            "1.0 Title",
            "Advanced Leadership Skills",
            "HRDCorp Approval No: 10001234",
            "This is a 3-day course on leading teams.",
        ],
    );
    fs::write(input.path().join("broken.docx"), b"this is not a zip archive").unwrap();
    fs::write(input.path().join("notes.md"), "# ignored").unwrap();

    let processor = DocumentProcessor::new();
    let summary = processor
        .process_documents(input.path(), output.path())
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.outcomes.len(), 3);
    assert!(summary.outcomes.iter().any(|o| matches!(
        o,
        FileOutcome::Failed { source_file, .. } if source_file == "broken.docx"
    )));

    assert!(output.path().join(SUMMARY_FILE).is_file());
    assert!(output.path().join("outline.txt.json").is_file());
    assert!(!output.path().join("broken.docx.json").exists());
    assert!(!output.path().join("notes.md.json").exists());

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(output.path().join("leadership.docx.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["format"], "docx");
    assert_eq!(report["record"]["title"], "Advanced Leadership Skills");
    assert_eq!(report["record"]["hrdcorp_approval_no"], "10001234");
    assert_eq!(report["record"]["duration"], "3 days");
    assert_eq!(
        report["record"]["description"],
        "Training program: Advanced Leadership Skills"
    );
}

#[test]
fn single_file_extraction_reads_text_outline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("outline.txt");
    fs::write(&path, OUTLINE_TXT).unwrap();

    let report = DocumentProcessor::new().extract_file(&path).unwrap();
    assert_eq!(report.source_file, "outline.txt");
    assert_eq!(report.format, DocumentFormat::Txt);

    let record = report.record;
    assert_eq!(record.title, "Business Writing Clinic");
    assert_eq!(record.hrdcorp_approval_no, "10005555");
    assert_eq!(
        record.objectives,
        vec![
            "Write clear and concise emails".to_string(),
            "Structure reports for decision makers".to_string(),
        ]
    );
    assert_eq!(record.course_contents, "Module 1: Plain language");
    assert_eq!(record.target_audience, "Executives and officers");
}

#[test]
fn missing_input_directory_is_an_error() {
    let output = tempdir().unwrap();
    let processor = DocumentProcessor::new();
    assert!(processor
        .process_documents(output.path().join("nope"), output.path())
        .is_err());
}
