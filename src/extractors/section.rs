// src/extractors/section.rs

use crate::extractors::classifier::Label;
use crate::extractors::tokenizer::RawUnit;

/// Tracks the issuing body that heads the records currently being read.
/// Empty until the first section header of the pass.
#[derive(Debug, Default)]
pub struct SectionTracker {
    current: String,
    seen: usize,
}

impl SectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one classified unit. Returns true when the section changed.
    pub fn observe(&mut self, unit: &RawUnit, label: &Label) -> bool {
        if *label != Label::SectionHeader {
            return false;
        }
        tracing::debug!("Section header at line {}: '{}'", unit.line, unit.text);
        self.current = unit.text.clone();
        self.seen += 1;
        true
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn sections_seen(&self) -> usize {
        self.seen
    }
}
