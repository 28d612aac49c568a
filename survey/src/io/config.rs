//! Survey configuration stored in `survey.toml`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::set_generator::GeneratorParams;
use crate::core::types::Rating;

pub const DEFAULT_CONFIG_PATH: &str = "survey.toml";

const NATURALNESS_PROMPT: &str =
    "Which sample sounds more natural? (1 = clearly A ... 4 = clearly B)";
const REPRODUCTION_PROMPT: &str =
    "Which sample better reproduces the reference? (1 = clearly A ... 4 = clearly B)";

/// Survey configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// the values of the reference deployment except `endpoint_url`, which
/// must be set before anything can be submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SurveyConfig {
    /// Collection endpoint receiving one POST per submission.
    pub endpoint_url: String,

    /// How the payload is carried in the POST body.
    pub encoding: PayloadEncoding,

    /// Transport timeout for endpoint and question-set requests.
    pub request_timeout_secs: u64,

    /// Question-set document: a file path or an http(s) URL.
    pub sets_location: String,

    pub dimension_a: DimensionConfig,

    pub dimension_b: DimensionConfig,

    pub generator: GeneratorParams,
}

/// Transport encoding of the submission payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayloadEncoding {
    /// Raw JSON request body.
    Json,
    /// Multipart form with the JSON string in a single `payload` field.
    FormField,
}

/// Prompt and closed label vocabulary of one rating dimension.
///
/// A table that omits `prompt` gets the dimension's standard prompt at load
/// time; see [`SurveyConfig::fill_default_prompts`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DimensionConfig {
    pub prompt: String,
    pub labels: Vec<String>,
}

impl DimensionConfig {
    fn numeric(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            labels: (1..=4).map(|n| n.to_string()).collect(),
        }
    }

    /// Resolve user input to a rating if it names one of the labels.
    pub fn rating(&self, label: &str) -> Option<Rating> {
        let label = label.trim();
        self.labels
            .iter()
            .find(|known| known.as_str() == label)
            .map(|known| Rating::new(known.as_str()))
    }

    fn validate(&self, key: &str) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(anyhow!("{key}.prompt must not be blank"));
        }
        if self.labels.is_empty() {
            return Err(anyhow!("{key}.labels must be a non-empty array"));
        }
        let mut seen = HashSet::new();
        for label in &self.labels {
            if label.trim().is_empty() || label.chars().any(char::is_whitespace) {
                return Err(anyhow!("{key}.labels entries must be non-blank single words"));
            }
            if !seen.insert(label.as_str()) {
                return Err(anyhow!("{key}.labels contains duplicate '{label}'"));
            }
        }
        Ok(())
    }
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self::numeric("")
    }
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            encoding: PayloadEncoding::FormField,
            request_timeout_secs: 30,
            sets_location: "config/sets.json".to_string(),
            dimension_a: DimensionConfig::numeric(NATURALNESS_PROMPT),
            dimension_b: DimensionConfig::numeric(REPRODUCTION_PROMPT),
            generator: GeneratorParams::default(),
        }
    }
}

impl SurveyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.sets_location.trim().is_empty() {
            return Err(anyhow!("sets_location must not be empty"));
        }
        self.dimension_a.validate("dimension_a")?;
        self.dimension_b.validate("dimension_b")?;
        Ok(())
    }

    /// Give each dimension its standard prompt when the file left it out.
    pub fn fill_default_prompts(&mut self) {
        for (dimension, prompt) in [
            (&mut self.dimension_a, NATURALNESS_PROMPT),
            (&mut self.dimension_b, REPRODUCTION_PROMPT),
        ] {
            if dimension.prompt.is_empty() {
                dimension.prompt = prompt.to_string();
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Endpoint URL, required before a survey can run.
    pub fn require_endpoint(&self) -> Result<&str> {
        let url = self.endpoint_url.trim();
        if url.is_empty() {
            return Err(anyhow!(
                "endpoint_url is not configured (set it in {} or pass --endpoint)",
                DEFAULT_CONFIG_PATH
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!("endpoint_url must be an http(s) URL, got '{url}'"));
        }
        Ok(url)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SurveyConfig::default()`.
pub fn load_config(path: &Path) -> Result<SurveyConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = SurveyConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut cfg: SurveyConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.fill_default_prompts();
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SurveyConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
