// src/extractors/profile.rs

use regex::Regex;
use serde::Serialize;

use crate::extractors::grammar::DESTINATION_SECTION_RE;
use crate::extractors::records::{Schema, DEFINITIVE_SCHEMA, DESTINATION_SCHEMA, SCORE_SCHEMA};
use crate::extractors::tokenizer::TokenMode;

// --- Constants ---
pub const DEFAULT_MIN_FRAGMENTS: usize = 4;
pub const DEFAULT_SUPPLEMENT_WINDOW: usize = 8;

// First row of the two-row column header on every destination listing page.
const DESTINATION_PAIR_OPENER: &str = "PUESTO CENTRO DIRECTIVO";

// Column names that survive extraction as standalone units.
const DESTINATION_HEADER_WORDS: &[&str] = &[
    "PUESTO",
    "NÚMERO",
    "CENTRO",
    "DIRECTIVO/00.A.A",
    "CENTRO DIRECTIVO/00.A.A",
    "CENTRO DE DESTINO",
    "PROVINCIA",
    "LOCALIDAD",
    "PUESTO DE TRABAJO",
    "NIVEL",
    "C.D.",
    "C.",
    "ESPECÍFICO",
    "C. ESPECÍFICO",
    "NIVEL C.D.",
];

/// The three source document families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Definitive results list: one complete record per line.
    Definitive,
    /// Vacancy/destination listing: records assembled from fragments.
    Destinations,
    /// Ranking-score list, emitted highest score first.
    Scores,
}

/// Everything the engine needs to know about one document family.
#[derive(Debug, Clone)]
pub struct Profile {
    pub kind: DocumentKind,
    pub section_pattern: Option<&'static Regex>,
    pub pair_opener: Option<&'static str>,
    pub header_words: &'static [&'static str],
    pub min_fragments: usize,
    pub token_mode: TokenMode,
    pub supplement_window: usize,
    pub decimal_point: bool,
}

impl Profile {
    pub fn for_kind(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Destinations => Self {
                kind,
                section_pattern: Some(&*DESTINATION_SECTION_RE),
                pair_opener: Some(DESTINATION_PAIR_OPENER),
                header_words: DESTINATION_HEADER_WORDS,
                min_fragments: DEFAULT_MIN_FRAGMENTS,
                token_mode: TokenMode::Lines,
                supplement_window: DEFAULT_SUPPLEMENT_WINDOW,
                decimal_point: false,
            },
            DocumentKind::Definitive | DocumentKind::Scores => Self {
                kind,
                section_pattern: None,
                pair_opener: None,
                header_words: &[],
                min_fragments: DEFAULT_MIN_FRAGMENTS,
                token_mode: TokenMode::Lines,
                supplement_window: 0,
                decimal_point: false,
            },
        }
    }

    pub fn with_token_mode(mut self, mode: TokenMode) -> Self {
        self.token_mode = mode;
        self
    }

    pub fn with_min_fragments(mut self, min_fragments: usize) -> Self {
        self.min_fragments = min_fragments;
        self
    }

    pub fn with_decimal_point(mut self, decimal_point: bool) -> Self {
        self.decimal_point = decimal_point;
        self
    }

    /// Only destination listings assemble records from loose fragments;
    /// the other families skip anything that is not a full record line.
    pub fn accumulates_fragments(&self) -> bool {
        self.kind == DocumentKind::Destinations
    }

    pub fn schema(&self) -> Schema {
        match self.kind {
            DocumentKind::Definitive => DEFINITIVE_SCHEMA,
            DocumentKind::Destinations => DESTINATION_SCHEMA,
            DocumentKind::Scores => SCORE_SCHEMA,
        }
    }
}
