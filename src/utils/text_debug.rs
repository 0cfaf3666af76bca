// src/utils/text_debug.rs
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::extractors::classifier::ClassifiedUnit;
use crate::utils::error::StorageError;

/// Saves the raw extracted text so a failed pass can be inspected by hand.
pub fn save_raw_text(text: &str, path: &Path) -> Result<(), StorageError> {
    std::fs::write(path, text)?;
    tracing::info!("Saved raw extracted text to {}", path.display());
    Ok(())
}

/// Renders one classified unit as `line[.word]  LABEL  [rule]  text`.
pub fn annotate(entry: &ClassifiedUnit) -> String {
    let position = match entry.unit.word {
        Some(word) => format!("{}.{}", entry.unit.line, word),
        None => entry.unit.line.to_string(),
    };
    format!(
        "{:>8}  {:<15}  [{}]  {}",
        position,
        entry.label.name(),
        entry.rule,
        entry.unit.text
    )
}

/// Writes the classification of every unit of a pass, one per line, in
/// source order.
pub fn save_classification(trace: &[ClassifiedUnit], path: &Path) -> Result<(), StorageError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in trace {
        writeln!(writer, "{}", annotate(entry))?;
    }
    writer.flush()?;

    tracing::info!("Saved classification of {} units to {}", trace.len(), path.display());
    Ok(())
}
