pub mod core {
    pub mod extractor;
    pub mod parser;
    pub mod record;
    pub mod rules;
}

pub mod utils {
    pub mod document_processor;
}

pub mod config;
pub mod mmap_reader;

#[cfg(feature = "with-proto")]
pub mod grpc_service;
#[cfg(feature = "with-proto")]
pub mod protobuf_converter;

pub use crate::core::extractor::{extract_training_record, FieldExtractor};
pub use crate::core::record::{ExtractedTrainingRecord, Field};

use serde::{Deserialize, Serialize};
use std::path::Path;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Upload formats the intake pipeline knows how to turn into text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Docx,
    Doc,
    Txt,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(DocumentFormat::Docx),
            "doc" => Some(DocumentFormat::Doc),
            "txt" | "text" => Some(DocumentFormat::Txt),
            _ => None,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Recognise the two binary containers by their leading signature.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(ZIP_MAGIC) {
            Some(DocumentFormat::Docx)
        } else if bytes.starts_with(OLE_MAGIC) {
            Some(DocumentFormat::Doc)
        } else {
            None
        }
    }

    /// Signature wins over the file name, so a `.docx` saved as `.doc` still decodes.
    pub fn detect(file_name: &str, bytes: &[u8]) -> Option<Self> {
        Self::from_magic(bytes).or_else(|| Self::from_path(file_name))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Txt => "txt",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
