// src/extractors/grammar.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;

// --- Record Grammars (Lazy Static) ---
// Shared by the classifier (shape test) and the resolver (capture mapping).

// ***DNI** APELLIDOS, NOMBRE. P1 A1 E1 P2 A2 E2 TPS ORDEN
pub static DEFINITIVE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\*{3}(?P<dni>\d+)\*{2}\s+",
        r"(?P<name>[^.]+?)\.\s+",
        r"(?P<p1>\d{1,2}(?:,\d{1,2})?)\s+",
        r"(?P<a1>\d+)\s+",
        r"(?P<e1>\d+)\s+",
        r"(?P<p2>\d{1,2}(?:,\d{1,2})?)\s+",
        r"(?P<a2>\d+)\s+",
        r"(?P<e2>\d+)\s+",
        r"(?P<tps>\d{1,2}(?:,\d{1,2})?)\s+",
        r"(?P<orden>\d+)$",
    ))
    .expect("Failed to compile DEFINITIVE_LINE_RE")
});

// APELLIDO1 APELLIDO2, NOMBRE ***DNI** 9,20
pub static SCORE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<surname1>\S+)\s+(?P<surname2>[^,]+?)\s*,\s*",
        r"(?P<given>.+?)\s+",
        r"\*{3}(?P<dni>\d+)\*{2}\s+",
        r"(?P<score>\d{1,2},\d{2})$",
    ))
    .expect("Failed to compile SCORE_LINE_RE")
});

// Position code, optionally preceded by the sibling row's leading cell and
// followed by the salary supplement.
pub static CODE_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<lead>.*\S)\s+)?(?P<code>\d{6,})(?:\s+(?P<amount>(?:\d+\.)*\d+,\d{2}))?$")
        .expect("Failed to compile CODE_ROW_RE")
});

// 3.656,24 or 589,76
pub static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+\.)*\d+,\d{2}$").expect("Failed to compile AMOUNT_RE")
});

// Page numbers, row counters and level columns.
pub static SHORT_DIGITS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,5}$").expect("Failed to compile SHORT_DIGITS_RE")
});

pub static LEVEL_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^NIVEL\s*\d{1,2}$").expect("Failed to compile LEVEL_TAG_RE")
});

// Issuing-body prefixes. CENTRO, OFICINA, MUSEO and BIBLIOTECA also open
// ordinary center cells, so they are not section markers.
pub static DESTINATION_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:MINISTERIO|AGENCIA|ORGANISMO|JEFATURA|INSTITUTO|CONSORCIO",
        r"|CONFEDERACI[OÓ]N|FONDO|MUTUALIDAD|TESORER[IÍ]A|CONSEJO|GERENCIA",
        r"|COMISI[OÓ]N|MANCOMUNIDAD)\b",
    ))
    .expect("Failed to compile DESTINATION_SECTION_RE")
});
