use serde::{Deserialize, Serialize};

/// Prefix used when a description has to be synthesised from the title.
pub const DESCRIPTION_PREFIX: &str = "Training program: ";

/// The fields a course outline can populate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Description,
    Duration,
    Objectives,
    CourseContents,
    TargetAudience,
    Methodology,
    Certification,
    HrdcorpApprovalNo,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Title,
        Field::Description,
        Field::Duration,
        Field::Objectives,
        Field::CourseContents,
        Field::TargetAudience,
        Field::Methodology,
        Field::Certification,
        Field::HrdcorpApprovalNo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Duration => "duration",
            Field::Objectives => "objectives",
            Field::CourseContents => "course_contents",
            Field::TargetAudience => "target_audience",
            Field::Methodology => "methodology",
            Field::Certification => "certification",
            Field::HrdcorpApprovalNo => "hrdcorp_approval_no",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Field::Objectives)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Course fields recovered from one uploaded outline.
///
/// Every field is always present; a field the heuristics could not find is left
/// empty rather than omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedTrainingRecord {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub objectives: Vec<String>,
    pub course_contents: String,
    pub target_audience: String,
    pub methodology: String,
    pub certification: String,
    pub hrdcorp_approval_no: String,
}

impl ExtractedTrainingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Title => Some(&self.title),
            Field::Description => Some(&self.description),
            Field::Duration => Some(&self.duration),
            Field::Objectives => None,
            Field::CourseContents => Some(&self.course_contents),
            Field::TargetAudience => Some(&self.target_audience),
            Field::Methodology => Some(&self.methodology),
            Field::Certification => Some(&self.certification),
            Field::HrdcorpApprovalNo => Some(&self.hrdcorp_approval_no),
        }
    }

    pub fn is_populated(&self, field: Field) -> bool {
        match self.text(field) {
            Some(value) => !value.is_empty(),
            None => !self.objectives.is_empty(),
        }
    }

    pub fn populated_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| self.is_populated(*field))
            .collect()
    }

    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| !self.is_populated(*field))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.populated_fields().is_empty()
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Title => Some(&mut self.title),
            Field::Description => Some(&mut self.description),
            Field::Duration => Some(&mut self.duration),
            Field::Objectives => None,
            Field::CourseContents => Some(&mut self.course_contents),
            Field::TargetAudience => Some(&mut self.target_audience),
            Field::Methodology => Some(&mut self.methodology),
            Field::Certification => Some(&mut self.certification),
            Field::HrdcorpApprovalNo => Some(&mut self.hrdcorp_approval_no),
        }
    }

    /// Store a scalar value. `RuleSet::validate` only lets `objectives` be filled
    /// through [`set_objectives`](Self::set_objectives), so the list field has no slot here.
    pub(crate) fn set_text(&mut self, field: Field, value: String) {
        if let Some(slot) = self.text_mut(field) {
            *slot = value;
        }
    }

    pub(crate) fn set_objectives(&mut self, items: Vec<String>) {
        self.objectives = items;
    }

    /// Fill in the description from the title when the outline had none.
    pub(crate) fn synthesize_description(&mut self) {
        if self.description.is_empty() && !self.title.is_empty() {
            self.description = format!("{}{}", DESCRIPTION_PREFIX, self.title);
        }
    }
}
