//! Shared deterministic types for the survey core.
//!
//! These types define stable contracts between the controller, the answer
//! store and the submission client. Wire names follow the question-set
//! document and the collection endpoint (`questionIndex`, `setNumber`, ...).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::InputValidationError;

/// Opaque rating label (e.g. `"3"` or `"A-preferred"`).
///
/// The core only compares labels for equality; which labels are valid is
/// decided by the configured rating vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(String);

impl Rating {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media references played for one comparison: a reference and two samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRefs {
    #[serde(rename = "refAudio")]
    pub reference: String,
    #[serde(rename = "method1Audio")]
    pub sample_a: String,
    #[serde(rename = "method2Audio")]
    pub sample_b: String,
}

impl MediaRefs {
    /// Named references in presentation order.
    pub fn named(&self) -> [(&'static str, &str); 3] {
        [
            ("reference", self.reference.as_str()),
            ("sample-A", self.sample_a.as_str()),
            ("sample-B", self.sample_b.as_str()),
        ]
    }
}

/// One comparison question as listed in the question-set document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDescriptor {
    /// Positive, unique within a set; defines display and submission order.
    pub question_index: u32,
    #[serde(flatten)]
    pub media: MediaRefs,
}

/// Questions of one set as stored in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetEntry {
    pub questions: Vec<QuestionDescriptor>,
}

/// Immutable, ordered questions for the set a respondent chose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    set_id: String,
    questions: Vec<QuestionDescriptor>,
}

impl QuestionSet {
    pub fn new(set_id: impl Into<String>, questions: Vec<QuestionDescriptor>) -> Self {
        Self {
            set_id: set_id.into(),
            questions,
        }
    }

    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    pub fn questions(&self) -> &[QuestionDescriptor] {
        &self.questions
    }

    pub fn get(&self, position: usize) -> Option<&QuestionDescriptor> {
        self.questions.get(position)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// The whole question-set document: set id -> questions.
///
/// Loaded once before any survey starts and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionCatalog {
    sets: BTreeMap<String, SetEntry>,
}

impl QuestionCatalog {
    pub fn new(sets: BTreeMap<String, SetEntry>) -> Self {
        Self { sets }
    }

    /// Resolve a set id to its question set.
    pub fn load(&self, set_id: &str) -> Result<QuestionSet, InputValidationError> {
        let entry = self
            .sets
            .get(set_id)
            .ok_or_else(|| InputValidationError::UnknownSet(set_id.to_string()))?;
        Ok(QuestionSet::new(set_id, entry.questions.clone()))
    }

    /// Set ids in natural order (`set2` before `set10`).
    pub fn set_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sets.keys().map(String::as_str).collect();
        ids.sort_by_key(|&id| natural_key(id));
        ids
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &SetEntry)> {
        self.sets.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Split a trailing decimal suffix off so ids sort as `(prefix, number)`.
fn natural_key(id: &str) -> (&str, u64, &str) {
    let digits_at = id
        .char_indices()
        .rev()
        .take_while(|(_, ch)| ch.is_ascii_digit())
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(id.len());
    let (prefix, digits) = id.split_at(digits_at);
    (prefix, digits.parse().unwrap_or(0), id)
}

/// What the respondent currently has selected on the question screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub dimension_a: Option<Rating>,
    pub dimension_b: Option<Rating>,
}

impl Selection {
    pub fn new(dimension_a: Option<Rating>, dimension_b: Option<Rating>) -> Self {
        Self {
            dimension_a,
            dimension_b,
        }
    }

    /// Both dimensions chosen.
    pub fn both(dimension_a: &str, dimension_b: &str) -> Self {
        Self::new(Some(Rating::new(dimension_a)), Some(Rating::new(dimension_b)))
    }

    pub fn is_complete(&self) -> bool {
        self.dimension_a.is_some() && self.dimension_b.is_some()
    }
}

/// Per-question answer slot; `None` means not yet rated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSlot {
    pub question_index: u32,
    pub dimension_a: Option<Rating>,
    pub dimension_b: Option<Rating>,
}

/// A fully rated question, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAnswer {
    pub question_index: u32,
    #[serde(rename = "naturalness")]
    pub dimension_a: Rating,
    #[serde(rename = "reproduction")]
    pub dimension_b: Rating,
}

/// Finalized submission bundle. Immutable once built and kept for retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    #[serde(rename = "name")]
    respondent_name: String,
    #[serde(rename = "setNumber")]
    set_id: String,
    answers: Vec<ResolvedAnswer>,
}

impl SubmissionPayload {
    /// Build a payload; the respondent name must be non-blank.
    pub fn new(
        respondent_name: impl Into<String>,
        set_id: impl Into<String>,
        answers: Vec<ResolvedAnswer>,
    ) -> Result<Self, InputValidationError> {
        let respondent_name = respondent_name.into();
        if respondent_name.trim().is_empty() {
            return Err(InputValidationError::MissingName);
        }
        Ok(Self {
            respondent_name,
            set_id: set_id.into(),
            answers,
        })
    }

    pub fn respondent_name(&self) -> &str {
        &self.respondent_name
    }

    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    pub fn answers(&self) -> &[ResolvedAnswer] {
        &self.answers
    }

    /// Encode for the collection endpoint.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Positive acknowledgement from the collection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    pub message: Option<String>,
}

/// Position of the survey flow. Exactly one per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Intake,
    InProgress { position: usize },
    Submitting,
    Done,
    Failed,
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Intake => "intake",
            FlowState::InProgress { .. } => "in_progress",
            FlowState::Submitting => "submitting",
            FlowState::Done => "done",
            FlowState::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_reads_document_field_names() {
        let raw = r#"{
            "questionIndex": 3,
            "refAudio": "ref.wav",
            "method1Audio": "a.wav",
            "method2Audio": "b.wav"
        }"#;
        let descriptor: QuestionDescriptor = serde_json::from_str(raw).expect("parse");
        assert_eq!(descriptor.question_index, 3);
        assert_eq!(descriptor.media.sample_b, "b.wav");
        assert_eq!(descriptor.media.named()[0], ("reference", "ref.wav"));
    }

    #[test]
    fn catalog_orders_set_ids_naturally() {
        let entry = SetEntry {
            questions: Vec::new(),
        };
        let sets = ["set10", "set2", "set1", "extra"]
            .into_iter()
            .map(|id| (id.to_string(), entry.clone()))
            .collect();
        let catalog = QuestionCatalog::new(sets);
        assert_eq!(catalog.set_ids(), vec!["extra", "set1", "set2", "set10"]);
    }

    #[test]
    fn catalog_load_reports_unknown_set() {
        let catalog = QuestionCatalog::default();
        let err = catalog.load("set9").unwrap_err();
        assert_eq!(err, InputValidationError::UnknownSet("set9".to_string()));
    }

    #[test]
    fn payload_rejects_blank_name() {
        let err = SubmissionPayload::new("  ", "set1", Vec::new()).unwrap_err();
        assert_eq!(err, InputValidationError::MissingName);
    }

    #[test]
    fn payload_serializes_with_endpoint_field_names() {
        let payload = SubmissionPayload::new(
            "Aki",
            "set1",
            vec![ResolvedAnswer {
                question_index: 1,
                dimension_a: Rating::new("2"),
                dimension_b: Rating::new("3"),
            }],
        )
        .expect("payload");
        assert_eq!(
            payload.to_json().expect("json"),
            r#"{"name":"Aki","setNumber":"set1","answers":[{"questionIndex":1,"naturalness":"2","reproduction":"3"}]}"#
        );
    }
}
