// src/extractors/pipeline.rs

//! One document pass: Tokenizer → Classifier → {SectionTracker, Assembler}
//! → Emitter, strictly forward and single-threaded. Every piece of mutable
//! state lives in a [`PassContext`] created for the pass and dropped after it.

use serde::Serialize;

use crate::extractors::assembler::{Assembler, AssemblerStats};
use crate::extractors::classifier::{ClassifiedUnit, Classifier, Context, FragmentShape, Label};
use crate::extractors::profile::{DocumentKind, Profile};
use crate::extractors::records::{OutputRecord, Schema};
use crate::extractors::section::SectionTracker;
use crate::extractors::tokenizer::{RawUnit, Tokenizer};

/// Collects completed records in emission order. Score lists are reordered
/// by descending score when the pass ends.
#[derive(Debug)]
pub struct Emitter {
    kind: DocumentKind,
    records: Vec<OutputRecord>,
}

impl Emitter {
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
        }
    }

    pub fn buffer(&mut self) -> &mut Vec<OutputRecord> {
        &mut self.records
    }

    pub fn finish(mut self) -> Vec<OutputRecord> {
        if self.kind == DocumentKind::Scores {
            // Stable: equal scores keep their encounter order.
            self.records.sort_by(|a, b| score_of(b).total_cmp(&score_of(a)));
        }
        self.records
    }
}

fn score_of(record: &OutputRecord) -> f64 {
    match record {
        OutputRecord::Score(row) => row.score_value(),
        _ => f64::NEG_INFINITY,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcome {
    Records(usize),
    NoRecordsFound,
}

#[derive(Debug)]
pub struct PassReport {
    pub schema: Schema,
    pub records: Vec<OutputRecord>,
    pub outcome: PassOutcome,
    pub units: usize,
    pub sections: usize,
    pub stats: AssemblerStats,
    /// Per-unit classification, kept only when requested for diagnostics.
    pub trace: Vec<ClassifiedUnit>,
}

/// Pass-scoped state threaded through the pipeline.
pub struct PassContext<'p> {
    schema: Schema,
    tokenizer: Tokenizer,
    classifier: Classifier<'p>,
    sections: SectionTracker,
    assembler: Assembler<'p>,
    emitter: Emitter,
    previous: Context,
    units: usize,
    trace: Option<Vec<ClassifiedUnit>>,
}

impl<'p> PassContext<'p> {
    pub fn new(profile: &'p Profile, keep_trace: bool) -> Self {
        Self {
            schema: profile.schema(),
            tokenizer: Tokenizer::new(profile.token_mode),
            classifier: Classifier::new(profile),
            sections: SectionTracker::new(),
            assembler: Assembler::new(profile),
            emitter: Emitter::new(profile.kind),
            previous: Context::default(),
            units: 0,
            trace: keep_trace.then(Vec::new),
        }
    }

    /// Feeds one extracted line, splitting it into words first when the
    /// tokenizer is in sub-token mode and the line is plain record text.
    pub fn push_line(&mut self, line: RawUnit) {
        let (rule, label) = self.classifier.classify_with_rule(&line, self.previous);
        let splittable = label == Label::RecordFragment(FragmentShape::Text);
        for unit in self.tokenizer.expand(line, splittable) {
            if unit.is_word() {
                let (rule, label) = self.classifier.classify_with_rule(&unit, self.previous);
                self.apply(unit, rule, label);
            } else {
                self.apply(unit, rule, label);
            }
        }
    }

    fn apply(&mut self, unit: RawUnit, rule: &'static str, label: Label) {
        tracing::trace!("{:>5} {:<15} [{}] {}", unit.line, label.name(), rule, unit.text);
        self.units += 1;
        // Records closed by a section header still belong to the old section.
        self.assembler
            .feed(&unit, &label, self.sections.current(), self.emitter.buffer());
        self.sections.observe(&unit, &label);
        self.previous = Context::after(&label);
        if let Some(trace) = self.trace.as_mut() {
            trace.push(ClassifiedUnit { unit, label, rule });
        }
    }

    pub fn finish(mut self) -> PassReport {
        self.assembler
            .finish(self.sections.current(), self.emitter.buffer());
        let stats = self.assembler.stats();
        let records = self.emitter.finish();
        let outcome = if records.is_empty() {
            PassOutcome::NoRecordsFound
        } else {
            PassOutcome::Records(records.len())
        };
        PassReport {
            schema: self.schema,
            records,
            outcome,
            units: self.units,
            sections: self.sections.sections_seen(),
            stats,
            trace: self.trace.unwrap_or_default(),
        }
    }
}

/// Runs a full pass over already-extracted text.
pub fn run_pass(profile: &Profile, text: &str, keep_trace: bool) -> PassReport {
    let mut ctx = PassContext::new(profile, keep_trace);
    let lines: Vec<RawUnit> = ctx.tokenizer.lines(text).collect();
    for line in lines {
        ctx.push_line(line);
    }
    let report = ctx.finish();
    tracing::debug!(
        "Pass over {} units: {:?}, stats {:?}",
        report.units,
        report.outcome,
        report.stats
    );
    report
}
