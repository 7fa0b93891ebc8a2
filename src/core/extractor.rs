//! Single-pass field extraction over the lines of a decoded course outline.
//!
//! Every rule in the [`RuleSet`] runs as its own small state machine
//! (`Idle -> Collecting -> Done`) and all of them share one forward pass over the
//! trimmed, non-blank lines. Extraction never fails: a rule that finds nothing
//! leaves its field at the default value.

use crate::core::record::ExtractedTrainingRecord;
use crate::core::rules::{any_match, strip_list_marker, Collection, FieldRule, RuleError, RuleSet};
use log::debug;
use once_cell::sync::Lazy;

static DEFAULT_EXTRACTOR: Lazy<FieldExtractor> = Lazy::new(FieldExtractor::new);

/// Extract a record with the builtin rules.
pub fn extract_training_record(text: &str) -> ExtractedTrainingRecord {
    DEFAULT_EXTRACTOR.extract(text)
}

struct Line<'a> {
    text: &'a str,
    lower: String,
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    text.split(['\n', '\r', '\u{000B}', '\u{000C}'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|text| Line {
            text,
            lower: text.to_lowercase(),
        })
        .collect()
}

#[derive(Debug, Default)]
enum Progress {
    #[default]
    Idle,
    Collecting(Vec<String>),
    Done,
}

#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: RuleSet,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self {
            rules: RuleSet::builtin(),
        }
    }

    /// Build an extractor from a custom rule table. Markers are normalised first.
    pub fn with_rules(rules: RuleSet) -> Result<Self, RuleError> {
        let rules = rules.normalized();
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn extract(&self, text: &str) -> ExtractedTrainingRecord {
        let lines = split_lines(text);
        let mut record = ExtractedTrainingRecord::default();
        let mut progress: Vec<Progress> = self.rules.rules.iter().map(|_| Progress::Idle).collect();

        for index in 0..lines.len() {
            for (rule, state) in self.rules.rules.iter().zip(progress.iter_mut()) {
                step(rule, state, &lines, index, &mut record);
            }
        }

        // Sections still open at the end of the document run to the last line
        for (rule, state) in self.rules.rules.iter().zip(progress.iter_mut()) {
            if let Progress::Collecting(buffer) = std::mem::take(state) {
                finish(rule, buffer, &mut record);
            }
        }

        record.synthesize_description();

        debug!(
            "extracted {} of {} fields from {} lines",
            record.populated_fields().len(),
            self.rules.rules.len(),
            lines.len()
        );
        record
    }
}

fn step(
    rule: &FieldRule,
    state: &mut Progress,
    lines: &[Line<'_>],
    index: usize,
    record: &mut ExtractedTrainingRecord,
) {
    let line = &lines[index];
    match state {
        Progress::Done => {}
        Progress::Collecting(buffer) => {
            if any_match(rule.collect.terminators(), &line.lower) {
                let buffer = std::mem::take(buffer);
                finish(rule, buffer, record);
                *state = Progress::Done;
            } else {
                accumulate(&rule.collect, line, buffer);
            }
        }
        Progress::Idle => {
            if !rule.trigger.fires(&line.lower) {
                return;
            }
            if rule.collect.is_streaming() {
                *state = Progress::Collecting(Vec::new());
            } else if let Some(value) = look_ahead(&rule.collect, line, &lines[index + 1..]) {
                record.set_text(rule.field, value);
                *state = Progress::Done;
            } else if rule.collect.first_trigger_only() {
                *state = Progress::Done;
            }
        }
    }
}

fn accumulate(collect: &Collection, line: &Line<'_>, buffer: &mut Vec<String>) {
    match collect {
        Collection::Block { .. } => buffer.push(line.text.to_string()),
        Collection::List { min_chars, .. } => {
            if let Some(item) = strip_list_marker(line.text) {
                if item.chars().count() > *min_chars {
                    buffer.push(item.to_string());
                }
            }
        }
        _ => {}
    }
}

fn finish(rule: &FieldRule, buffer: Vec<String>, record: &mut ExtractedTrainingRecord) {
    if buffer.is_empty() {
        return;
    }
    match rule.collect {
        Collection::List { .. } => record.set_objectives(buffer),
        _ => {
            let value = buffer.join("\n").trim().to_string();
            if !value.is_empty() {
                record.set_text(rule.field, value);
            }
        }
    }
}

fn look_ahead(collect: &Collection, trigger: &Line<'_>, rest: &[Line<'_>]) -> Option<String> {
    match collect {
        Collection::Inline { capture } => capture.apply(trigger.text),
        Collection::FirstLine {
            window,
            min_chars,
            reject,
        } => rest
            .iter()
            .take(*window)
            .find(|l| l.text.chars().count() > *min_chars && !any_match(reject, &l.lower))
            .map(|l| l.text.to_string()),
        Collection::Window {
            window,
            skip,
            stop,
            separator,
        } => {
            let joined = rest
                .iter()
                .take(*window)
                .take_while(|l| !any_match(stop, &l.lower))
                .filter(|l| !any_match(skip, &l.lower))
                .map(|l| l.text)
                .collect::<Vec<_>>()
                .join(separator);
            let joined = joined.trim();
            if joined.is_empty() {
                None
            } else {
                Some(joined.to_string())
            }
        }
        Collection::Block { .. } | Collection::List { .. } => None,
    }
}
