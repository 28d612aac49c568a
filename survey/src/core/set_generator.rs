//! Deterministic (given an RNG) generation of balanced question-set documents.
//!
//! Every (source speaker, target speaker, method pair) combination becomes one
//! question per set. Text ids are shuffled once per combination so set `k`
//! uses the `k`-th text of every combination and no two sets share a text
//! for the same combination. Within each question the two methods are
//! randomly assigned to sample A and sample B.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::core::types::{MediaRefs, QuestionCatalog, QuestionDescriptor, SetEntry};

/// Parameters for [`generate_catalog`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorParams {
    pub sources: Vec<String>,
    pub targets: Vec<String>,
    /// Method pairs compared head to head.
    pub showdowns: Vec<[String; 2]>,
    pub text_prefix: String,
    pub text_count: u32,
    pub set_count: u32,
    pub audio_root: String,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        let names = |items: &[&str]| items.iter().map(|item| item.to_string()).collect::<Vec<_>>();
        Self {
            sources: names(&["SEF1", "SEF2", "SEM1", "SEM2"]),
            targets: names(&["TEF1", "TEF2", "TEM1", "TEM2"]),
            showdowns: vec![
                ["method1".to_string(), "method2".to_string()],
                ["method2".to_string(), "method3".to_string()],
            ],
            text_prefix: "E3".to_string(),
            text_count: 25,
            set_count: 25,
            audio_root: "assets/audio".to_string(),
        }
    }
}

impl GeneratorParams {
    /// Returns a list of stable error messages (empty on success).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.sources.is_empty() {
            errors.push("generator.sources must not be empty".to_string());
        }
        if self.targets.is_empty() {
            errors.push("generator.targets must not be empty".to_string());
        }
        if self.showdowns.is_empty() {
            errors.push("generator.showdowns must not be empty".to_string());
        }
        if self.set_count == 0 {
            errors.push("generator.set_count must be > 0".to_string());
        }
        if self.set_count > self.text_count {
            errors.push(format!(
                "generator.set_count {} exceeds text_count {}",
                self.set_count, self.text_count
            ));
        }
        errors
    }

    fn combinations(&self) -> Vec<Combination<'_>> {
        let mut combos = Vec::new();
        for source in &self.sources {
            for target in &self.targets {
                for [first, second] in &self.showdowns {
                    combos.push(Combination {
                        source,
                        target,
                        first,
                        second,
                    });
                }
            }
        }
        combos
    }
}

struct Combination<'a> {
    source: &'a str,
    target: &'a str,
    first: &'a str,
    second: &'a str,
}

/// Generate `set_count` sets named `set1..setN`.
pub fn generate_catalog<R: Rng>(
    params: &GeneratorParams,
    rng: &mut R,
) -> Result<QuestionCatalog, String> {
    let errors = params.validate();
    if !errors.is_empty() {
        return Err(errors.join("; "));
    }

    let combos = params.combinations();
    let texts: Vec<Vec<String>> = combos
        .iter()
        .map(|_| {
            let mut ids: Vec<String> = (1..=params.text_count)
                .map(|n| format!("{}{:04}", params.text_prefix, n))
                .collect();
            ids.shuffle(rng);
            ids
        })
        .collect();

    let mut sets = BTreeMap::new();
    for set in 0..params.set_count as usize {
        let questions = combos
            .iter()
            .zip(&texts)
            .enumerate()
            .map(|(position, (combo, ids))| {
                let text = &ids[set];
                let (sample_a, sample_b) = if rng.gen_bool(0.5) {
                    (combo.first, combo.second)
                } else {
                    (combo.second, combo.first)
                };
                QuestionDescriptor {
                    question_index: position as u32 + 1,
                    media: MediaRefs {
                        reference: format!(
                            "{}/ref/{}_{}.wav",
                            params.audio_root, combo.target, text
                        ),
                        sample_a: sample_path(params, sample_a, combo, text),
                        sample_b: sample_path(params, sample_b, combo, text),
                    },
                }
            })
            .collect();
        sets.insert(format!("set{}", set + 1), SetEntry { questions });
    }
    Ok(QuestionCatalog::new(sets))
}

fn sample_path(
    params: &GeneratorParams,
    method: &str,
    combo: &Combination<'_>,
    text: &str,
) -> String {
    format!(
        "{}/{}/{}_{}_{}.wav",
        params.audio_root, method, combo.source, combo.target, text
    )
}
