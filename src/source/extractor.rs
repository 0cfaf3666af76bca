// src/source/extractor.rs
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::utils::error::ExtractError;

// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Produces the plain text of one document in a single pass.
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Text layer of a PDF, extracted in memory with `pdf-extract`.
#[derive(Debug, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());

        // pdf-extract panics on some malformed documents.
        let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
            .map_err(|_| ExtractError::Pdf {
                path: path.to_path_buf(),
                reason: "extractor panicked on malformed document".to_string(),
            })?
            .map_err(|e| ExtractError::Pdf {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        tracing::debug!("Extracted {} characters of text from {}", text.len(), path.display());
        Ok(text)
    }
}

/// Text that was already extracted to a file. Invalid UTF-8 is replaced
/// rather than rejected.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn starts_with_pdf_magic(path: &Path) -> Result<bool, ExtractError> {
    let io_err = |source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut header = [0u8; 5];
    let mut file = File::open(path).map_err(io_err)?;
    let read = file.read(&mut header).map_err(io_err)?;
    Ok(read == PDF_MAGIC.len() && header == PDF_MAGIC)
}

/// Picks the extractor for `path`: PDF by magic bytes, then by extension.
pub fn extractor_for(path: &Path) -> Result<Box<dyn TextExtractor>, ExtractError> {
    if starts_with_pdf_magic(path)? {
        return Ok(Box::new(PdfTextExtractor));
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => Ok(Box::new(PdfTextExtractor)),
        Some("txt") | Some("text") => Ok(Box::new(PlainTextExtractor)),
        _ => Err(ExtractError::UnsupportedFormat(path.to_path_buf())),
    }
}
