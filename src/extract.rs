//! Page-level text extraction for uploaded documents.

use std::path::Path;

use thiserror::Error;

use crate::core::errors::ApiError;
use crate::rag::PageText;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type")]
    Unsupported { extension: Option<String> },

    #[error("File appears empty")]
    Empty,

    #[error("File is too large ({size} bytes, limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("Could not read PDF: {0}")]
    Pdf(String),
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Unsupported { .. } => ApiError::UnsupportedMedia(err.to_string()),
            ExtractError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            ExtractError::Empty | ExtractError::Pdf(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// Case-insensitive match on the filename extension.
    pub fn from_filename(filename: &str) -> Result<Self, ExtractError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => Ok(DocumentKind::Pdf),
            Some("txt") => Ok(DocumentKind::Text),
            _ => Err(ExtractError::Unsupported { extension }),
        }
    }
}

/// Checks the size limit and returns the document kind without parsing.
pub fn precheck(filename: &str, size: u64, max_bytes: u64) -> Result<DocumentKind, ExtractError> {
    let kind = DocumentKind::from_filename(filename)?;
    if size == 0 {
        return Err(ExtractError::Empty);
    }
    if size > max_bytes {
        return Err(ExtractError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    Ok(kind)
}

/// Extracts the non-blank pages of `bytes`. PDF pages are numbered from 1
/// in document order; plain text is a single page 1.
///
/// PDF parsing is CPU-bound; call from a blocking context.
pub fn extract_pages(
    filename: &str,
    bytes: &[u8],
    max_bytes: u64,
) -> Result<Vec<PageText>, ExtractError> {
    let kind = precheck(filename, bytes.len() as u64, max_bytes)?;

    let pages = match kind {
        DocumentKind::Text => vec![PageText {
            page: 1,
            text: String::from_utf8_lossy(bytes).into_owned(),
        }],
        DocumentKind::Pdf => pdf_pages(bytes)?
            .into_iter()
            .enumerate()
            .map(|(idx, text)| PageText {
                page: idx as u32 + 1,
                text,
            })
            .collect(),
    };

    let pages: Vec<PageText> = pages
        .into_iter()
        .filter(|page| !page.text.trim().is_empty())
        .collect();

    if pages.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(pages)
}

fn pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    // the parser panics on some malformed files
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("malformed document".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))
}
