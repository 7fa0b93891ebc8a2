//! Declarative rule table driving the field extractor.
//!
//! Each record field is described by one [`FieldRule`]: the markers that trigger it and
//! how the lines after the trigger are collected. The extractor owns no field-specific
//! control flow, so tuning a heuristic means editing this table (or a JSON rule file
//! with the same shape), not the scanning loop.

use crate::core::record::Field;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("DIGIT_RUN should compile - this is a bug"));

static DAY_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+)[\s\-–]*day").expect("DAY_COUNT should compile - this is a bug")
});

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+\.(?:[0-9]+\.?)*|[•●▪◦‣·∙*\-–])\s*")
        .expect("LIST_MARKER should compile - this is a bug")
});

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("failed to read rule file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rule definition: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field `{0}` has more than one rule")]
    DuplicateField(Field),
    #[error("rule for `{0}` has no trigger markers")]
    EmptyTrigger(Field),
    #[error("rule for `{0}` contains an empty marker")]
    EmptyMarker(Field),
    #[error("rule for `{field}` cannot use `{mode}` collection")]
    IncompatibleCollection { field: Field, mode: &'static str },
}

/// A case-insensitive cue marking where a section starts or stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Marker {
    /// Matches anywhere in the line.
    Phrase(String),
    /// Matches a numbered heading such as `4.0` at the start of the line.
    Section(String),
}

impl Marker {
    pub fn phrase(text: &str) -> Self {
        Marker::Phrase(text.to_lowercase())
    }

    pub fn section(number: &str) -> Self {
        Marker::Section(number.to_lowercase())
    }

    /// `lower` must already be the trimmed, lower-cased line.
    pub fn matches(&self, lower: &str) -> bool {
        match self {
            Marker::Phrase(phrase) => lower.contains(phrase.as_str()),
            Marker::Section(number) => lower.starts_with(number.as_str()),
        }
    }

    fn value(&self) -> &str {
        match self {
            Marker::Phrase(v) | Marker::Section(v) => v,
        }
    }

    fn normalized(self) -> Self {
        match self {
            Marker::Phrase(v) => Marker::Phrase(v.trim().to_lowercase()),
            Marker::Section(v) => Marker::Section(v.trim().to_lowercase()),
        }
    }
}

pub(crate) fn any_match(markers: &[Marker], lower: &str) -> bool {
    markers.iter().any(|m| m.matches(lower))
}

/// Fires when every `all_of` marker and at least one `any_of` marker match the line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Marker>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Marker>,
}

impl Trigger {
    pub fn any_of(markers: Vec<Marker>) -> Self {
        Self { all_of: Vec::new(), any_of: markers }
    }

    pub fn all_of(markers: Vec<Marker>) -> Self {
        Self { all_of: markers, any_of: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.all_of.is_empty() && self.any_of.is_empty()
    }

    pub fn fires(&self, lower: &str) -> bool {
        !self.is_empty()
            && self.all_of.iter().all(|m| m.matches(lower))
            && (self.any_of.is_empty() || any_match(&self.any_of, lower))
    }

    fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.all_of.iter().chain(self.any_of.iter())
    }
}

/// Value pulled straight out of the trigger line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capture {
    /// First contiguous run of ASCII digits, verbatim.
    DigitRun,
    /// Integer right before "day", rendered as `"<N> days"`.
    DayCount,
}

impl Capture {
    pub fn apply(&self, line: &str) -> Option<String> {
        match self {
            Capture::DigitRun => DIGIT_RUN.find(line).map(|m| m.as_str().to_string()),
            Capture::DayCount => DAY_COUNT
                .captures(&line.to_lowercase())
                .and_then(|caps| caps.get(1))
                .map(|n| format!("{} days", n.as_str())),
        }
    }
}

/// How the lines around a trigger become the field's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Collection {
    /// First of the next `window` lines longer than `min_chars` that matches no `reject` marker.
    FirstLine {
        window: usize,
        min_chars: usize,
        #[serde(default)]
        reject: Vec<Marker>,
    },
    /// Capture from the trigger line itself.
    Inline { capture: Capture },
    /// Join the next `window` lines, leaving out `skip` lines and cutting off at a `stop` line.
    Window {
        window: usize,
        #[serde(default)]
        skip: Vec<Marker>,
        #[serde(default)]
        stop: Vec<Marker>,
        separator: String,
    },
    /// Every following line, verbatim, until a terminator.
    Block { until: Vec<Marker> },
    /// Numbered or bulleted items until a terminator; items of `min_chars` or fewer are dropped.
    List { until: Vec<Marker>, min_chars: usize },
}

impl Collection {
    pub fn mode(&self) -> &'static str {
        match self {
            Collection::FirstLine { .. } => "first_line",
            Collection::Inline { .. } => "inline",
            Collection::Window { .. } => "window",
            Collection::Block { .. } => "block",
            Collection::List { .. } => "list",
        }
    }

    /// Whether the rule keeps state across lines instead of looking ahead.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Collection::Block { .. } | Collection::List { .. })
    }

    /// `FirstLine` only looks after the first trigger line, found or not.
    pub fn first_trigger_only(&self) -> bool {
        matches!(self, Collection::FirstLine { .. })
    }

    pub fn terminators(&self) -> &[Marker] {
        match self {
            Collection::Block { until } | Collection::List { until, .. } => until,
            _ => &[],
        }
    }

    fn markers(&self) -> Vec<&Marker> {
        match self {
            Collection::FirstLine { reject, .. } => reject.iter().collect(),
            Collection::Inline { .. } => Vec::new(),
            Collection::Window { skip, stop, .. } => skip.iter().chain(stop.iter()).collect(),
            Collection::Block { until } | Collection::List { until, .. } => until.iter().collect(),
        }
    }

    fn normalized(self) -> Self {
        fn norm(markers: Vec<Marker>) -> Vec<Marker> {
            markers.into_iter().map(Marker::normalized).collect()
        }
        match self {
            Collection::FirstLine { window, min_chars, reject } => Collection::FirstLine {
                window,
                min_chars,
                reject: norm(reject),
            },
            Collection::Inline { capture } => Collection::Inline { capture },
            Collection::Window { window, skip, stop, separator } => Collection::Window {
                window,
                skip: norm(skip),
                stop: norm(stop),
                separator,
            },
            Collection::Block { until } => Collection::Block { until: norm(until) },
            Collection::List { until, min_chars } => Collection::List {
                until: norm(until),
                min_chars,
            },
        }
    }
}

/// Strip a leading `1.` / `1.2` / bullet glyph. Returns `None` for lines that are not list items.
pub fn strip_list_marker(line: &str) -> Option<&str> {
    LIST_MARKER.find(line).map(|m| line[m.end()..].trim())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: Field,
    pub trigger: Trigger,
    pub collect: Collection,
}

impl FieldRule {
    pub fn new(field: Field, trigger: Trigger, collect: Collection) -> Self {
        Self { field, trigger, collect }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<FieldRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleSet {
    /// The stock heuristics for HRDCorp-style course outlines.
    pub fn builtin() -> Self {
        use Marker as M;

        let rules = vec![
            FieldRule::new(
                Field::Title,
                Trigger::any_of(vec![M::phrase("title")]),
                Collection::FirstLine {
                    window: 4,
                    min_chars: 5,
                    reject: vec![M::phrase("hrdcorp")],
                },
            ),
            FieldRule::new(
                Field::HrdcorpApprovalNo,
                Trigger::all_of(vec![M::phrase("hrdcorp"), M::phrase("approval")]),
                Collection::Inline { capture: Capture::DigitRun },
            ),
            FieldRule::new(
                Field::Duration,
                Trigger {
                    all_of: vec![M::phrase("day")],
                    any_of: vec![M::phrase("course"), M::phrase("training")],
                },
                Collection::Inline { capture: Capture::DayCount },
            ),
            FieldRule::new(
                Field::Description,
                Trigger::any_of(vec![M::phrase("introduction")]),
                Collection::Window {
                    window: 3,
                    skip: Vec::new(),
                    stop: vec![M::phrase("objectives"), M::phrase("outcomes")],
                    separator: " ".into(),
                },
            ),
            FieldRule::new(
                Field::Objectives,
                Trigger::any_of(vec![M::phrase("objectives"), M::phrase("outcomes")]),
                Collection::List {
                    until: vec![M::phrase("course contents"), M::section("4.0"), M::section("5.0")],
                    min_chars: 10,
                },
            ),
            FieldRule::new(
                Field::CourseContents,
                Trigger::any_of(vec![M::phrase("course contents"), M::section("4.0")]),
                Collection::Block {
                    until: vec![M::phrase("who should attend"), M::section("5.0"), M::section("6.0")],
                },
            ),
            FieldRule::new(
                Field::TargetAudience,
                Trigger::any_of(vec![M::phrase("who should attend"), M::phrase("target audience")]),
                Collection::Window {
                    window: 2,
                    skip: vec![M::phrase("methodology"), M::phrase("6.0")],
                    stop: Vec::new(),
                    separator: " ".into(),
                },
            ),
            FieldRule::new(
                Field::Methodology,
                Trigger::any_of(vec![M::phrase("methodology")]),
                Collection::Window {
                    window: 4,
                    skip: vec![M::phrase("certification"), M::phrase("7.0")],
                    stop: Vec::new(),
                    separator: " ".into(),
                },
            ),
            FieldRule::new(
                Field::Certification,
                Trigger::any_of(vec![M::phrase("certification")]),
                Collection::Window {
                    window: 2,
                    skip: vec![M::phrase("contact"), M::phrase("7.0")],
                    stop: Vec::new(),
                    separator: " ".into(),
                },
            ),
        ];

        Self { rules }
    }

    pub fn from_json_str(json: &str) -> Result<Self, RuleError> {
        let set: RuleSet = serde_json::from_str(json)?;
        let set = set.normalized();
        set.validate()?;
        Ok(set)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, RuleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn rule(&self, field: Field) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.field) {
                return Err(RuleError::DuplicateField(rule.field));
            }
            if rule.trigger.is_empty() {
                return Err(RuleError::EmptyTrigger(rule.field));
            }
            let has_empty_marker = rule
                .trigger
                .markers()
                .chain(rule.collect.markers())
                .any(|m| m.value().is_empty());
            if has_empty_marker {
                return Err(RuleError::EmptyMarker(rule.field));
            }
            let is_list = matches!(rule.collect, Collection::List { .. });
            if is_list != rule.field.is_list() {
                return Err(RuleError::IncompatibleCollection {
                    field: rule.field,
                    mode: rule.collect.mode(),
                });
            }
        }
        Ok(())
    }

    /// Lower-case and trim every marker so matching can compare against lower-cased lines.
    pub fn normalized(self) -> Self {
        let rules = self
            .rules
            .into_iter()
            .map(|rule| FieldRule {
                field: rule.field,
                trigger: Trigger {
                    all_of: rule.trigger.all_of.into_iter().map(Marker::normalized).collect(),
                    any_of: rule.trigger.any_of.into_iter().map(Marker::normalized).collect(),
                },
                collect: rule.collect.normalized(),
            })
            .collect();
        Self { rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_validate_and_cover_every_field() {
        let rules = RuleSet::builtin();
        rules.validate().unwrap();
        for field in Field::ALL {
            assert!(rules.rule(field).is_some(), "missing rule for {}", field);
        }
    }

    #[test]
    fn section_marker_only_matches_line_start() {
        let marker = Marker::section("4.0");
        assert!(marker.matches("4.0 course contents"));
        assert!(!marker.matches("duration: 14.0 hours"));
    }

    #[test]
    fn trigger_requires_all_and_any() {
        let rule = RuleSet::builtin();
        let duration = &rule.rule(Field::Duration).unwrap().trigger;
        assert!(duration.fires("a 2-day training on sales"));
        assert!(!duration.fires("a 2-day workshop"));
        assert!(!duration.fires("the training course"));
        assert!(!Trigger::default().fires("anything"));
    }

    #[test]
    fn captures() {
        assert_eq!(
            Capture::DigitRun.apply("HRDCorp Approval No: 10001234").as_deref(),
            Some("10001234")
        );
        assert_eq!(Capture::DigitRun.apply("HRDCorp approval pending"), None);
        assert_eq!(
            Capture::DayCount.apply("This is a 3-day course on management.").as_deref(),
            Some("3 days")
        );
        assert_eq!(
            Capture::DayCount.apply("Training length: 2 Days").as_deref(),
            Some("2 days")
        );
        assert_eq!(Capture::DayCount.apply("A full day of training"), None);
    }

    #[test]
    fn list_markers() {
        assert_eq!(strip_list_marker("1. Understand leadership"), Some("Understand leadership"));
        assert_eq!(strip_list_marker("2.1 Plan the sprint"), Some("Plan the sprint"));
        assert_eq!(strip_list_marker("• Apply feedback models"), Some("Apply feedback models"));
        assert_eq!(strip_list_marker("- dash item"), Some("dash item"));
        assert_eq!(strip_list_marker("Understand leadership"), None);
        assert_eq!(strip_list_marker("2023 budget"), None);
    }

    #[test]
    fn json_rules_are_normalized() {
        let json = r#"{
            "rules": [
                {
                    "field": "title",
                    "trigger": { "any_of": [ { "kind": "phrase", "value": "  Programme NAME " } ] },
                    "collect": { "mode": "first_line", "window": 2, "min_chars": 3 }
                }
            ]
        }"#;
        let rules = RuleSet::from_json_str(json).unwrap();
        let title = rules.rule(Field::Title).unwrap();
        assert_eq!(title.trigger.any_of, vec![Marker::Phrase("programme name".into())]);
    }

    #[test]
    fn builtin_rules_survive_json_round_trip() {
        let json = RuleSet::builtin().to_json_pretty().unwrap();
        assert_eq!(RuleSet::from_json_str(&json).unwrap(), RuleSet::builtin());
    }

    #[test]
    fn rejects_duplicate_fields() {
        let mut rules = RuleSet::builtin();
        let title = rules.rule(Field::Title).unwrap().clone();
        rules.rules.push(title);
        assert!(matches!(rules.validate(), Err(RuleError::DuplicateField(Field::Title))));
    }

    #[test]
    fn rejects_empty_trigger_and_marker() {
        let empty_trigger = RuleSet {
            rules: vec![FieldRule::new(
                Field::Methodology,
                Trigger::default(),
                Collection::Block { until: Vec::new() },
            )],
        };
        assert!(matches!(
            empty_trigger.validate(),
            Err(RuleError::EmptyTrigger(Field::Methodology))
        ));

        let empty_marker = RuleSet {
            rules: vec![FieldRule::new(
                Field::Methodology,
                Trigger::any_of(vec![Marker::phrase("")]),
                Collection::Block { until: Vec::new() },
            )],
        };
        assert!(matches!(
            empty_marker.validate(),
            Err(RuleError::EmptyMarker(Field::Methodology))
        ));
    }

    #[test]
    fn list_collection_is_reserved_for_objectives() {
        let wrong = RuleSet {
            rules: vec![FieldRule::new(
                Field::Methodology,
                Trigger::any_of(vec![Marker::phrase("methodology")]),
                Collection::List { until: Vec::new(), min_chars: 0 },
            )],
        };
        assert!(matches!(
            wrong.validate(),
            Err(RuleError::IncompatibleCollection { field: Field::Methodology, mode: "list" })
        ));

        let wrong = RuleSet {
            rules: vec![FieldRule::new(
                Field::Objectives,
                Trigger::any_of(vec![Marker::phrase("objectives")]),
                Collection::Block { until: Vec::new() },
            )],
        };
        assert!(wrong.validate().is_err());
    }

    #[test]
    fn missing_rule_file_reports_path() {
        let err = RuleSet::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
