// src/extractors/tokenizer.rs

use serde::Serialize;

/// One trimmed, non-empty piece of extracted text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUnit {
    pub line: usize,         // Index among the non-empty lines of the document
    pub word: Option<usize>, // Sub-token index when split out of a line
    pub text: String,
}

impl RawUnit {
    pub fn is_word(&self) -> bool {
        self.word.is_some()
    }
}

/// Whether record lines are kept whole or split into whitespace sub-tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMode {
    #[default]
    Lines,
    Words,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer {
    mode: TokenMode,
}

impl Tokenizer {
    pub fn new(mode: TokenMode) -> Self {
        Self { mode }
    }

    /// Lazily yields the non-empty, trimmed lines of `text` in source order.
    pub fn lines<'a>(&self, text: &'a str) -> impl Iterator<Item = RawUnit> + 'a {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(line, text)| RawUnit {
                line,
                word: None,
                text: text.to_string(),
            })
    }

    /// Splits a line unit into its whitespace-delimited sub-tokens.
    pub fn words(unit: &RawUnit) -> Vec<RawUnit> {
        unit.text
            .split_whitespace()
            .enumerate()
            .map(|(word, text)| RawUnit {
                line: unit.line,
                word: Some(word),
                text: text.to_string(),
            })
            .collect()
    }

    /// Returns the units a line contributes: itself, or its words when the
    /// tokenizer runs in sub-token mode and the line may be split.
    pub fn expand(&self, unit: RawUnit, splittable: bool) -> Vec<RawUnit> {
        if self.mode == TokenMode::Words && splittable {
            Self::words(&unit)
        } else {
            vec![unit]
        }
    }
}
