use crate::mmap_reader::{read_document, DEFAULT_MMAP_THRESHOLD};
use crate::DocumentFormat;
use log::{debug, warn};
use roxmltree::Document;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
/// Upper bound on the inflated size of `word/document.xml`.
const MAX_DOCUMENT_PART_BYTES: u64 = 64 * 1024 * 1024;
const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const W_STRICT_NS: &str = "http://purl.oclc.org/ooxml/wordprocessingml/main";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Recovered runs from a binary `.doc` need at least this many letters to count as text.
const MIN_RUN_LETTERS: usize = 4;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("document is empty")]
    Empty,
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read document part: {0}")]
    Read(#[from] std::io::Error),
    #[error("invalid docx container: {0}")]
    Zip(#[from] ZipError),
    #[error("invalid document xml: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("docx is missing {0}")]
    MissingPart(&'static str),
    #[error("{part} inflates past {limit} bytes")]
    PartTooLarge { part: &'static str, limit: u64 },
    #[error("document xml is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("not a Word 97-2003 document")]
    NotOleDocument,
}

pub trait Parser {
    /// Decode an uploaded document body into plain text, one paragraph per line.
    fn parse_bytes(&self, bytes: &[u8]) -> Result<String, DecodeError>;
}

/// Text of a decoded upload along with the format it was decoded as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub format: DocumentFormat,
    pub text: String,
}

/// DocxParser: walks `word/document.xml` in document order, one line per `w:p`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxParser;

impl Parser for DocxParser {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let doc_xml = match archive.by_name(DOCUMENT_PART) {
            Ok(part) => read_capped(part, DOCUMENT_PART, MAX_DOCUMENT_PART_BYTES)?,
            Err(ZipError::FileNotFound) => return Err(DecodeError::MissingPart(DOCUMENT_PART)),
            Err(e) => return Err(e.into()),
        };

        let doc = Document::parse(&doc_xml)?;
        Ok(self.extract_text(&doc))
    }
}

impl DocxParser {
    fn extract_text(&self, doc: &Document) -> String {
        let mut text = String::new();

        for node in doc.descendants().filter(|n| n.is_element()) {
            let tag = node.tag_name();
            if !matches!(tag.namespace(), Some(W_NS) | Some(W_STRICT_NS)) {
                continue;
            }
            match tag.name() {
                "p" => {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                "t" => {
                    if let Some(content) = node.text() {
                        text.push_str(content);
                    }
                }
                // Tab stops and breaks also appear inside paragraph properties; only runs carry text
                "tab" if Self::in_run(&node) => text.push('\t'),
                "br" | "cr" if Self::in_run(&node) => text.push('\n'),
                _ => {}
            }
        }

        text
    }

    fn in_run(node: &roxmltree::Node) -> bool {
        node.parent_element()
            .map_or(false, |parent| parent.tag_name().name() == "r")
    }
}

fn read_capped<R: Read>(reader: R, part: &'static str, limit: u64) -> Result<String, DecodeError> {
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Err(DecodeError::PartTooLarge { part, limit });
    }
    Ok(String::from_utf8(bytes)?)
}

/// Plain `.txt` uploads: honours UTF-8 and UTF-16 byte order marks, otherwise lossy UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl Parser for PlainTextParser {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
            return Ok(String::from_utf8_lossy(rest).into_owned());
        }
        if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
            return Ok(decode_utf16(rest, u16::from_le_bytes));
        }
        if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
            return Ok(decode_utf16(rest, u16::from_be_bytes));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

fn decode_utf16(bytes: &[u8], read_unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| read_unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Best-effort text recovery for Word 97-2003 binaries.
///
/// Does not interpret the OLE directory or the piece table. It scans for printable
/// runs, both UTF-16LE and 8-bit, and keeps whichever encoding recovered more letters.
/// Paragraph and cell marks become line breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyDocParser;

impl Parser for LegacyDocParser {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        if !bytes.starts_with(OLE_MAGIC) {
            return Err(DecodeError::NotOleDocument);
        }

        let body = &bytes[OLE_MAGIC.len()..];
        let wide = collect_runs(
            body.chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .map(wide_char),
        );
        let narrow = collect_runs(body.iter().map(|b| narrow_char(*b)));

        let text = if letter_count(&wide) >= letter_count(&narrow) {
            wide
        } else {
            narrow
        };
        if text.is_empty() {
            warn!("no readable text recovered from legacy .doc");
        }
        Ok(text)
    }
}

fn wide_char(unit: u16) -> Option<char> {
    match unit {
        0x0D | 0x07 | 0x0B => Some('\n'),
        0x09 => Some('\t'),
        0x20..=0x7E | 0xA0..=0x024F | 0x2000..=0x206F | 0x25A0..=0x25FF => char::from_u32(unit as u32),
        _ => None,
    }
}

fn narrow_char(byte: u8) -> Option<char> {
    match byte {
        0x0D | 0x07 | 0x0B => Some('\n'),
        0x09 => Some('\t'),
        0x20..=0x7E | 0xA0..=0xFF => Some(char::from(byte)),
        // Windows-1252 punctuation Word uses for smart quotes, bullets and dashes
        0x91 | 0x92 => Some('\''),
        0x93 | 0x94 => Some('"'),
        0x95 => Some('•'),
        0x96 | 0x97 => Some('-'),
        _ => None,
    }
}

fn collect_runs<I: Iterator<Item = Option<char>>>(chars: I) -> String {
    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();

    for c in chars {
        match c {
            Some(c) => current.push(c),
            None => {
                if letter_count(&current) >= MIN_RUN_LETTERS {
                    runs.push(current.trim().to_string());
                }
                current.clear();
            }
        }
    }
    if letter_count(&current) >= MIN_RUN_LETTERS {
        runs.push(current.trim().to_string());
    }

    runs.join("\n")
}

fn letter_count(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphabetic()).count()
}

/// Picks a parser from the file signature and name.
#[derive(Debug, Clone)]
pub struct UniversalParser {
    mmap_threshold: u64,
}

impl Default for UniversalParser {
    fn default() -> Self {
        Self::new()
    }
}

impl UniversalParser {
    pub fn new() -> Self {
        Self {
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }

    pub fn with_mmap_threshold(mmap_threshold: u64) -> Self {
        Self { mmap_threshold }
    }

    pub fn parser_for(format: DocumentFormat) -> &'static dyn Parser {
        match format {
            DocumentFormat::Docx => &DocxParser,
            DocumentFormat::Doc => &LegacyDocParser,
            DocumentFormat::Txt => &PlainTextParser,
        }
    }

    /// Decode an upload held in memory. `file_name` is only used for format detection.
    pub fn parse_upload(&self, file_name: &str, bytes: &[u8]) -> Result<ParsedDocument, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let format = DocumentFormat::detect(file_name, bytes)
            .ok_or_else(|| DecodeError::UnsupportedFormat(file_name.to_string()))?;

        let text = Self::parser_for(format).parse_bytes(bytes)?;
        debug!("decoded {} as {} ({} chars)", file_name, format, text.chars().count());
        Ok(ParsedDocument { format, text })
    }

    pub fn parse<P: AsRef<Path>>(&self, path: P) -> Result<ParsedDocument, DecodeError> {
        let path = path.as_ref();
        let bytes = read_document(path, self.mmap_threshold).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path.to_string_lossy();
        self.parse_upload(&file_name, &bytes)
    }
}
