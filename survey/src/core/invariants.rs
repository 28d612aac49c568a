//! Semantic invariants of a question-set document not expressible via JSON Schema.

use std::collections::HashSet;

use crate::core::types::{QuestionCatalog, SetEntry};

/// Check semantic invariants not expressible in JSON Schema:
/// - At least one set
/// - Every set has at least one question
/// - `questionIndex > 0` and unique within its set
/// - Questions listed in ascending `questionIndex` order
/// - Media references are non-blank
pub fn validate_invariants(catalog: &QuestionCatalog) -> Vec<String> {
    let mut errors = Vec::new();
    if catalog.is_empty() {
        errors.push("document defines no question sets".to_string());
    }
    for (set_id, entry) in catalog.entries() {
        validate_set(set_id, entry, &mut errors);
    }
    errors
}

fn validate_set(set_id: &str, entry: &SetEntry, errors: &mut Vec<String>) {
    if entry.questions.is_empty() {
        errors.push(format!("{}: set has no questions", set_id));
        return;
    }

    let mut seen = HashSet::new();
    for (position, question) in entry.questions.iter().enumerate() {
        let path = format!("{}/questions/{}", set_id, position);
        if question.question_index == 0 {
            errors.push(format!("{}: questionIndex must be > 0", path));
        }
        if !seen.insert(question.question_index) {
            errors.push(format!(
                "{}: duplicate questionIndex {}",
                path, question.question_index
            ));
        }
        for (name, reference) in question.media.named() {
            if reference.trim().is_empty() {
                errors.push(format!("{}: {} reference is blank", path, name));
            }
        }
    }

    if !indexes_ascending(entry) {
        errors.push(format!(
            "{}: questions must be sorted by questionIndex",
            set_id
        ));
    }
}

fn indexes_ascending(entry: &SetEntry) -> bool {
    entry
        .questions
        .windows(2)
        .all(|pair| pair[0].question_index <= pair[1].question_index)
}
