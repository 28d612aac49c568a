//! Test-only helpers for building question sets, payloads and scripted endpoints.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::error::SubmissionError;
use crate::core::types::{
    Ack, MediaRefs, QuestionCatalog, QuestionDescriptor, QuestionSet, Rating, ResolvedAnswer,
    SetEntry, SubmissionPayload,
};
use crate::io::catalog::write_catalog;
use crate::io::config::{SurveyConfig, write_config};
use crate::io::submission::Endpoint;

/// Create a deterministic descriptor for `questionIndex = index`.
pub fn descriptor(index: u32) -> QuestionDescriptor {
    QuestionDescriptor {
        question_index: index,
        media: MediaRefs {
            reference: format!("assets/audio/ref/q{}.wav", index),
            sample_a: format!("assets/audio/method1/q{}.wav", index),
            sample_b: format!("assets/audio/method2/q{}.wav", index),
        },
    }
}

/// Create a set with questions numbered `1..=count`.
pub fn question_set(set_id: &str, count: u32) -> QuestionSet {
    QuestionSet::new(set_id, (1..=count).map(descriptor).collect())
}

/// Create a catalog from `(set id, question count)` pairs.
pub fn catalog_with_sets(sets: &[(&str, u32)]) -> QuestionCatalog {
    let sets: BTreeMap<String, SetEntry> = sets
        .iter()
        .map(|(set_id, count)| {
            (
                set_id.to_string(),
                SetEntry {
                    questions: (1..=*count).map(descriptor).collect(),
                },
            )
        })
        .collect();
    QuestionCatalog::new(sets)
}

/// A two-answer payload for respondent "Aki" on "set1".
pub fn sample_payload() -> SubmissionPayload {
    let answer = |index: u32, a: &str, b: &str| ResolvedAnswer {
        question_index: index,
        dimension_a: Rating::new(a),
        dimension_b: Rating::new(b),
    };
    SubmissionPayload::new("Aki", "set1", vec![answer(1, "2", "3"), answer(2, "1", "4")])
        .expect("sample payload")
}

/// Endpoint that replays queued results and records every delivered body.
///
/// When the queue runs dry every further delivery fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedEndpoint {
    responses: RefCell<VecDeque<Result<Ack, SubmissionError>>>,
    bodies: RefCell<Vec<String>>,
}

impl ScriptedEndpoint {
    pub fn new(responses: Vec<Result<Ack, SubmissionError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            bodies: RefCell::new(Vec::new()),
        }
    }

    /// JSON bodies delivered so far, in order.
    pub fn bodies(&self) -> Vec<String> {
        self.bodies.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.bodies.borrow().len()
    }
}

impl Endpoint for ScriptedEndpoint {
    fn deliver(&self, payload: &SubmissionPayload) -> Result<Ack, SubmissionError> {
        let body = payload
            .to_json()
            .map_err(|err| SubmissionError::Encoding(err.to_string()))?;
        self.bodies.borrow_mut().push(body);
        self.responses.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(SubmissionError::Transport(
                "no scripted response left".to_string(),
            ))
        })
    }
}

/// Temporary working directory holding a question-set document and config.
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `catalog` to `config/sets.json` and return its path.
    pub fn write_sets(&self, catalog: &QuestionCatalog) -> Result<PathBuf> {
        let path = self.path().join("config").join("sets.json");
        write_catalog(&path, catalog)?;
        Ok(path)
    }

    /// Write `cfg` to `survey.toml` and return its path.
    pub fn write_config(&self, cfg: &SurveyConfig) -> Result<PathBuf> {
        let path = self.path().join("survey.toml");
        write_config(&path, cfg)?;
        Ok(path)
    }
}
