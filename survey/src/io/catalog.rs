//! Question-set document loading with schema + invariant validation.
//!
//! The document is read exactly once, before a session exists. Any failure
//! here is fatal to starting a survey: without a [`QuestionCatalog`] no
//! `SurveySession` can be constructed.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use jsonschema::validator_for;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::core::invariants::validate_invariants;
use crate::core::types::QuestionCatalog;

pub const QUESTION_SET_SCHEMA: &str =
    include_str!("../../../schemas/question_sets/v1.schema.json");

/// The question-set source is unreachable or malformed.
#[derive(Debug, Error)]
pub enum SetLoadError {
    #[error("read question sets {location}: {source}")]
    Read {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fetch question sets {location}: {message}")]
    Fetch { location: String, message: String },

    #[error("parse question sets {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("question sets {location} failed schema validation: {}", join_messages(.messages))]
    Schema {
        location: String,
        messages: Vec<String>,
    },

    #[error("question sets {location} failed invariants: {}", join_messages(.messages))]
    Invariants {
        location: String,
        messages: Vec<String>,
    },
}

fn join_messages(messages: &[String]) -> String {
    messages.join("; ")
}

/// True when `location` should be fetched over HTTP rather than read from disk.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Load and validate the question-set document from a path or http(s) URL.
#[instrument(skip_all, fields(location = %location))]
pub fn load_catalog(location: &str, timeout: Duration) -> Result<QuestionCatalog, SetLoadError> {
    let raw = if is_remote(location) {
        fetch_remote(location, timeout)?
    } else {
        fs::read_to_string(location).map_err(|source| SetLoadError::Read {
            location: location.to_string(),
            source,
        })?
    };
    let catalog = parse_catalog(location, &raw)?;
    info!(sets = catalog.len(), "question sets loaded");
    Ok(catalog)
}

fn fetch_remote(location: &str, timeout: Duration) -> Result<String, SetLoadError> {
    let fetch_error = |message: String| SetLoadError::Fetch {
        location: location.to_string(),
        message,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| fetch_error(err.to_string()))?;
    debug!(timeout_secs = timeout.as_secs(), "fetching question sets");
    client
        .get(location)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(|err| fetch_error(err.to_string()))
}

/// Parse a raw document and check it against the bundled schema and invariants.
pub fn parse_catalog(location: &str, raw: &str) -> Result<QuestionCatalog, SetLoadError> {
    let value: Value = serde_json::from_str(raw).map_err(|source| SetLoadError::Parse {
        location: location.to_string(),
        source,
    })?;
    validate_schema(location, &value)?;
    let catalog: QuestionCatalog =
        serde_json::from_value(value).map_err(|source| SetLoadError::Parse {
            location: location.to_string(),
            source,
        })?;
    let errors = validate_invariants(&catalog);
    if !errors.is_empty() {
        return Err(SetLoadError::Invariants {
            location: location.to_string(),
            messages: errors,
        });
    }
    Ok(catalog)
}

fn validate_schema(location: &str, document: &Value) -> Result<(), SetLoadError> {
    let schema_error = |messages: Vec<String>| SetLoadError::Schema {
        location: location.to_string(),
        messages,
    };
    let schema: Value = serde_json::from_str(QUESTION_SET_SCHEMA)
        .map_err(|err| schema_error(vec![format!("bundled schema: {err}")]))?;
    let compiled = validator_for(&schema)
        .map_err(|err| schema_error(vec![format!("bundled schema: {err}")]))?;
    if compiled.is_valid(document) {
        return Ok(());
    }
    let messages = compiled
        .iter_errors(document)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    Err(schema_error(messages))
}

/// Write a document to disk as pretty-printed JSON with trailing newline.
pub fn write_catalog(path: &Path, catalog: &QuestionCatalog) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(catalog).context("serialize question sets")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write question sets {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::catalog_with_sets;

    const TWO_QUESTIONS: &str = r#"{
        "set1": {
            "questions": [
                {"questionIndex": 1, "refAudio": "r1.wav", "method1Audio": "a1.wav", "method2Audio": "b1.wav"},
                {"questionIndex": 2, "refAudio": "r2.wav", "method1Audio": "a2.wav", "method2Audio": "b2.wav"}
            ]
        }
    }"#;

    #[test]
    fn parses_valid_document() {
        let catalog = parse_catalog("inline", TWO_QUESTIONS).expect("parse");
        let set = catalog.load("set1").expect("set1");
        assert_eq!(set.len(), 2);
        assert_eq!(set.questions()[1].media.reference, "r2.wav");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_catalog("inline", "{ not json").unwrap_err();
        assert!(matches!(err, SetLoadError::Parse { .. }));
    }

    #[test]
    fn rejects_schema_violations() {
        let raw = r#"{"set1": {"questions": [{"questionIndex": "one", "refAudio": "r.wav"}]}}"#;
        let err = parse_catalog("inline", raw).unwrap_err();
        assert!(matches!(err, SetLoadError::Schema { .. }), "{err}");
    }

    #[test]
    fn rejects_invariant_violations() {
        let raw = r#"{"set1": {"questions": [
            {"questionIndex": 2, "refAudio": "r.wav", "method1Audio": "a.wav", "method2Audio": "b.wav"},
            {"questionIndex": 2, "refAudio": "r.wav", "method1Audio": "a.wav", "method2Audio": "b.wav"}
        ]}}"#;
        let err = parse_catalog("inline", raw).unwrap_err();
        match err {
            SetLoadError::Invariants { messages, .. } => {
                assert!(messages.iter().any(|msg| msg.contains("duplicate questionIndex 2")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("sets.json");
        let err = load_catalog(path.to_str().expect("utf8"), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SetLoadError::Read { .. }));
    }

    #[test]
    fn written_document_loads_back() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config").join("sets.json");
        let catalog = catalog_with_sets(&[("set1", 2), ("set2", 3)]);
        write_catalog(&path, &catalog).expect("write");

        let loaded = load_catalog(path.to_str().expect("utf8"), Duration::from_secs(1))
            .expect("load");
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn detects_remote_locations() {
        assert!(is_remote("https://example.org/sets.json"));
        assert!(!is_remote("config/sets.json"));
    }
}
