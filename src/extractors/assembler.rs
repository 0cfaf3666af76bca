// src/extractors/assembler.rs

//! Groups classified units into records.
//!
//! Destination listings arrive as loose cells: the assembler accumulates
//! fragments until a position code closes the row, reunites sparse sibling
//! rows with the last complete row, and attaches the salary supplement that
//! follows the code. Line grammars pass straight through.

use serde::Serialize;

use crate::extractors::classifier::{FragmentShape, Grammar, Label};
use crate::extractors::grammar::CODE_ROW_RE;
use crate::extractors::profile::Profile;
use crate::extractors::records::{DestinationRow, OutputRecord};
use crate::extractors::resolver::{self, ResolvedFields};
use crate::extractors::tokenizer::RawUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Accumulating,
}

/// Fragments collected for the record in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PendingRecord {
    fragments: Vec<String>,
}

impl PendingRecord {
    fn push(&mut self, fragment: &str) {
        self.fragments.push(fragment.to_string());
    }

    fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.fragments)
    }
}

/// Counters reported at the end of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblerStats {
    pub emitted: usize,
    pub backfilled: usize,
    pub abandoned: usize,
    pub stray_amounts: usize,
}

// A destination row closed at its code, waiting for the supplement that
// follows within a few units.
#[derive(Debug)]
struct AwaitingSupplement {
    row: DestinationRow,
    remaining: usize,
}

// What closed the pending record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    SectionHeader,
    TableHeader,
    EndOfInput,
}

/// Merges a sparse sibling row behind the last complete row, keeping the
/// first occurrence of every fragment text.
pub fn backfill(last_complete: &[String], sparse: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(last_complete.len() + sparse.len());
    for fragment in last_complete.iter().chain(sparse) {
        if !merged.contains(fragment) {
            merged.push(fragment.clone());
        }
    }
    merged
}

pub struct Assembler<'p> {
    profile: &'p Profile,
    state: State,
    pending: PendingRecord,
    last_complete: Option<Vec<String>>,
    awaiting: Option<AwaitingSupplement>,
    stats: AssemblerStats,
}

impl<'p> Assembler<'p> {
    pub fn new(profile: &'p Profile) -> Self {
        Self {
            profile,
            state: State::Idle,
            pending: PendingRecord::default(),
            last_complete: None,
            awaiting: None,
            stats: AssemblerStats::default(),
        }
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    /// Consumes one classified unit. `section` is the issuing body in force
    /// before this unit; completed records are appended to `out`.
    pub fn feed(&mut self, unit: &RawUnit, label: &Label, section: &str, out: &mut Vec<OutputRecord>) {
        match label {
            Label::SectionHeader => {
                self.close(Trigger::SectionHeader, section, out);
                self.flush_awaiting(out);
                // Sibling rows never reach across a section boundary.
                self.last_complete = None;
            }
            Label::TableHeader { .. } => {
                self.tick_awaiting(out);
                self.close(Trigger::TableHeader, section, out);
            }
            Label::RecordLine(Grammar::CodeRow) => self.close_at_code(unit, section, out),
            Label::RecordLine(Grammar::Definitive) => match resolver::resolve_definitive(&unit.text) {
                Some(row) => self.emit(OutputRecord::Definitive(row), out),
                None => self.skip_unparseable(unit),
            },
            Label::RecordLine(Grammar::Score) => match resolver::resolve_score(&unit.text) {
                Some(row) => self.emit(OutputRecord::Score(row), out),
                None => self.skip_unparseable(unit),
            },
            Label::RecordFragment(FragmentShape::Amount) => self.attach_supplement(unit, out),
            Label::RecordFragment(FragmentShape::Text) => {
                self.tick_awaiting(out);
                self.pending.push(&unit.text);
                self.state = State::Accumulating;
            }
            Label::Noise => self.tick_awaiting(out),
        }
    }

    /// Closes whatever is still open once the input is exhausted.
    pub fn finish(&mut self, section: &str, out: &mut Vec<OutputRecord>) {
        self.close(Trigger::EndOfInput, section, out);
        self.flush_awaiting(out);
    }

    // Header and end-of-input closes: the pending record is emitted without
    // code or supplement. A sparse one is backfilled from the last complete
    // row, except at a section header, which drops it.
    fn close(&mut self, trigger: Trigger, section: &str, out: &mut Vec<OutputRecord>) {
        if self.state == State::Idle {
            return;
        }
        self.state = State::Idle;
        let fragments = self.pending.take();
        let resolved = match resolver::resolve_destination(&fragments, self.profile.min_fragments) {
            Some(resolved) => Some(resolved),
            None if trigger == Trigger::SectionHeader => None,
            None => self.backfill_from_cache(&fragments),
        };
        match resolved {
            Some((fields, used)) => {
                tracing::debug!("Closing row without code at {:?}: {:?}", trigger, used);
                let row = self.build_row(section, fields, String::new());
                self.last_complete = Some(used);
                self.emit(OutputRecord::Destination(row), out);
            }
            None => {
                tracing::debug!("Abandoning {} fragments at {:?}: {:?}", fragments.len(), trigger, fragments);
                self.stats.abandoned += 1;
            }
        }
    }

    fn close_at_code(&mut self, unit: &RawUnit, section: &str, out: &mut Vec<OutputRecord>) {
        let Some(caps) = CODE_ROW_RE.captures(&unit.text) else {
            self.skip_unparseable(unit);
            return;
        };
        let lead = caps.name("lead").map(|m| m.as_str().to_string());
        let code = caps["code"].to_string();
        let amount = caps.name("amount").map(|m| m.as_str().to_string());

        self.flush_awaiting(out);
        self.state = State::Idle;
        let prior = self.pending.take();
        let min = self.profile.min_fragments;

        let resolved = match resolver::resolve_destination(&prior, min) {
            Some((mut fields, used)) => {
                // The sibling row's leading cell is the destination center.
                if let Some(lead) = lead {
                    if fields.destination_center.is_empty() {
                        fields.destination_center = lead;
                    }
                }
                Some((fields, used))
            }
            None => {
                let row_line = prior.last().cloned();
                let mut merged = prior;
                merged.extend(lead.clone());
                match resolver::resolve_destination(&merged, min) {
                    Some(resolved) => Some(resolved),
                    None => row_line
                        .as_deref()
                        .and_then(|line| resolver::resolve_record_line(line, lead.as_deref()))
                        .or_else(|| self.backfill_from_cache(&merged)),
                }
            }
        };

        let Some((fields, used)) = resolved else {
            tracing::debug!("Code {} at line {} has no resolvable row, skipping", code, unit.line);
            self.stats.abandoned += 1;
            return;
        };

        self.last_complete = Some(used);
        let mut row = self.build_row(section, fields, code);
        match amount {
            Some(amount) => {
                row.supplement = self.format_amount(&amount);
                self.emit(OutputRecord::Destination(row), out);
            }
            None if self.profile.supplement_window == 0 => {
                self.emit(OutputRecord::Destination(row), out);
            }
            None => {
                self.awaiting = Some(AwaitingSupplement {
                    row,
                    remaining: self.profile.supplement_window,
                });
            }
        }
    }

    // Reunites a sparse row with the last complete row of the section.
    fn backfill_from_cache(&mut self, sparse: &[String]) -> Option<(ResolvedFields, Vec<String>)> {
        let cache = self.last_complete.as_ref()?;
        let filled = backfill(cache, sparse);
        tracing::debug!("Backfilling sparse row {:?} from {:?}", sparse, cache);
        let resolved = resolver::resolve_destination(&filled, self.profile.min_fragments);
        if resolved.is_some() {
            self.stats.backfilled += 1;
        }
        resolved
    }

    fn attach_supplement(&mut self, unit: &RawUnit, out: &mut Vec<OutputRecord>) {
        match self.awaiting.take() {
            Some(AwaitingSupplement { mut row, .. }) => {
                row.supplement = self.format_amount(&unit.text);
                self.emit(OutputRecord::Destination(row), out);
            }
            None => {
                tracing::debug!("Amount '{}' at line {} follows no open code, skipping", unit.text, unit.line);
                self.stats.stray_amounts += 1;
            }
        }
    }

    fn tick_awaiting(&mut self, out: &mut Vec<OutputRecord>) {
        let expired = match self.awaiting.as_mut() {
            Some(awaiting) => {
                awaiting.remaining = awaiting.remaining.saturating_sub(1);
                awaiting.remaining == 0
            }
            None => false,
        };
        if expired {
            tracing::trace!("No supplement within {} units of the code", self.profile.supplement_window);
            self.flush_awaiting(out);
        }
    }

    fn flush_awaiting(&mut self, out: &mut Vec<OutputRecord>) {
        if let Some(awaiting) = self.awaiting.take() {
            self.emit(OutputRecord::Destination(awaiting.row), out);
        }
    }

    fn build_row(&self, section: &str, fields: ResolvedFields, code: String) -> DestinationRow {
        DestinationRow {
            issuing_body: section.to_string(),
            directive_center: fields.directive_center,
            destination_center: fields.destination_center,
            province: fields.province,
            locality: fields.locality,
            position: fields.position,
            position_code: code,
            supplement: String::new(),
        }
    }

    fn format_amount(&self, amount: &str) -> String {
        if self.profile.decimal_point {
            resolver::normalize_decimal(amount)
        } else {
            amount.to_string()
        }
    }

    // A record held for its supplement was resolved earlier, so it goes out first.
    fn emit(&mut self, record: OutputRecord, out: &mut Vec<OutputRecord>) {
        self.flush_awaiting(out);
        self.stats.emitted += 1;
        out.push(record);
    }

    fn skip_unparseable(&mut self, unit: &RawUnit) {
        tracing::debug!("Skipping unparseable unit at line {}: '{}'", unit.line, unit.text);
        self.stats.abandoned += 1;
    }
}
