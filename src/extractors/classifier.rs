// src/extractors/classifier.rs

// --- Imports ---
use crate::extractors::grammar::{
    AMOUNT_RE, CODE_ROW_RE, DEFINITIVE_LINE_RE, LEVEL_TAG_RE, SCORE_LINE_RE, SHORT_DIGITS_RE,
};
use crate::extractors::profile::{DocumentKind, Profile};
use crate::extractors::tokenizer::RawUnit;

/// Which full-record grammar a RECORD_LINE unit matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Definitive,
    Score,
    /// A position code (plus optional leading cell and amount) that closes a
    /// destination row.
    CodeRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentShape {
    Text,
    Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    SectionHeader,
    TableHeader { opens_pair: bool },
    RecordLine(Grammar),
    RecordFragment(FragmentShape),
    Noise,
}

impl Label {
    pub fn name(&self) -> &'static str {
        match self {
            Label::SectionHeader => "SECTION_HEADER",
            Label::TableHeader { .. } => "TABLE_HEADER",
            Label::RecordLine(_) => "RECORD_LINE",
            Label::RecordFragment(_) => "RECORD_FRAGMENT",
            Label::Noise => "NOISE",
        }
    }
}

/// A unit together with the label and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedUnit {
    pub unit: RawUnit,
    pub label: Label,
    pub rule: &'static str,
}

/// What the classifier remembers about the previous unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    after_pair_opener: bool,
}

impl Context {
    pub fn after(label: &Label) -> Self {
        Self {
            after_pair_opener: matches!(label, Label::TableHeader { opens_pair: true }),
        }
    }
}

// --- Rules ---
// Evaluated top to bottom; the first rule that returns a label wins.

type RuleFn = fn(&Profile, &RawUnit, Context) -> Option<Label>;

pub struct Rule {
    pub name: &'static str,
    apply: RuleFn,
}

pub const RULES: &[Rule] = &[
    Rule { name: "section-header", apply: section_header },
    Rule { name: "table-header-pair", apply: second_header_row },
    Rule { name: "table-header", apply: table_header_opener },
    Rule { name: "header-word", apply: header_word },
    Rule { name: "record-line", apply: record_line },
    Rule { name: "artifact", apply: page_artifact },
    Rule { name: "amount", apply: amount_fragment },
    Rule { name: "fragment", apply: fallback },
];

fn section_header(profile: &Profile, unit: &RawUnit, _: Context) -> Option<Label> {
    let pattern = profile.section_pattern?;
    (!unit.is_word() && pattern.is_match(&unit.text)).then_some(Label::SectionHeader)
}

fn second_header_row(_: &Profile, _: &RawUnit, ctx: Context) -> Option<Label> {
    ctx.after_pair_opener
        .then_some(Label::TableHeader { opens_pair: false })
}

fn table_header_opener(profile: &Profile, unit: &RawUnit, _: Context) -> Option<Label> {
    let opener = profile.pair_opener?;
    unit.text
        .starts_with(opener)
        .then_some(Label::TableHeader { opens_pair: true })
}

// Header words only match a whole extracted unit; a word split out of a
// record line ("CENTRO" in "CENTRO A") is data.
fn header_word(profile: &Profile, unit: &RawUnit, _: Context) -> Option<Label> {
    (!unit.is_word() && profile.header_words.contains(&unit.text.as_str())).then_some(Label::Noise)
}

fn record_line(profile: &Profile, unit: &RawUnit, _: Context) -> Option<Label> {
    let (grammar, pattern) = match profile.kind {
        DocumentKind::Definitive => (Grammar::Definitive, &*DEFINITIVE_LINE_RE),
        DocumentKind::Scores => (Grammar::Score, &*SCORE_LINE_RE),
        DocumentKind::Destinations => (Grammar::CodeRow, &*CODE_ROW_RE),
    };
    pattern
        .is_match(&unit.text)
        .then_some(Label::RecordLine(grammar))
}

fn page_artifact(_: &Profile, unit: &RawUnit, _: Context) -> Option<Label> {
    (SHORT_DIGITS_RE.is_match(&unit.text) || LEVEL_TAG_RE.is_match(&unit.text))
        .then_some(Label::Noise)
}

fn amount_fragment(profile: &Profile, unit: &RawUnit, _: Context) -> Option<Label> {
    (profile.accumulates_fragments() && AMOUNT_RE.is_match(&unit.text))
        .then_some(Label::RecordFragment(FragmentShape::Amount))
}

fn fallback(profile: &Profile, _: &RawUnit, _: Context) -> Option<Label> {
    if profile.accumulates_fragments() {
        Some(Label::RecordFragment(FragmentShape::Text))
    } else {
        Some(Label::Noise)
    }
}

// --- Classifier ---

pub struct Classifier<'p> {
    profile: &'p Profile,
    rules: &'static [Rule],
}

impl<'p> Classifier<'p> {
    pub fn new(profile: &'p Profile) -> Self {
        Self { profile, rules: RULES }
    }

    /// Labels `unit`, returning the name of the deciding rule alongside.
    /// Total: a unit no rule claims is NOISE.
    pub fn classify_with_rule(&self, unit: &RawUnit, ctx: Context) -> (&'static str, Label) {
        self.rules
            .iter()
            .find_map(|rule| (rule.apply)(self.profile, unit, ctx).map(|label| (rule.name, label)))
            .unwrap_or(("none", Label::Noise))
    }

    #[cfg(test)]
    pub fn classify(&self, unit: &RawUnit, ctx: Context) -> Label {
        self.classify_with_rule(unit, ctx).1
    }
}
