//! Persona and question-set definitions.
//!
//! Definitions live in YAML files authored by hand. Every section beyond the
//! identity fields is optional; the prompt renderer is total over presence
//! and absence, so a minimal persona with just `id` and `name` is valid.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, LoaderResult};

/// Structured description of the person a model is asked to imitate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    /// Scalar facts about the person (age, location, occupation, ...).
    /// Nested values are ignored by the prompt renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<BTreeMap<String, serde_yaml::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<Personality>,
    /// Named behavior facets, each a scalar or a list of concrete habits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<BTreeMap<String, TraitValue>>,
    /// Free-text context that does not fit the structured sections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavioral_notes: Option<String>,
}

/// Personality traits and values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

/// A behavior facet value: either one line of text or a list of items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    Text(String),
    List(Vec<String>),
}

/// One question posed to the persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub question: String,
    /// Grouping key for analytics; absent types land in the "unknown" bucket
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

/// An ordered question set loaded from one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Persona {
    /// Load a persona definition from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> LoaderResult<Self> {
        load_yaml(path.as_ref())
    }
}

impl QuestionSet {
    /// Load a question set from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> LoaderResult<Self> {
        load_yaml(path.as_ref())
    }

    /// Keep only the questions whose ids appear in `ids`, preserving source
    /// order. Unmatched ids drop silently.
    pub fn filtered(self, ids: &[String]) -> Self {
        Self {
            questions: self
                .questions
                .into_iter()
                .filter(|q| ids.contains(&q.id))
                .collect(),
        }
    }
}

impl Question {
    /// The question text sent to the model, follow-up included
    pub fn full_text(&self) -> String {
        match &self.follow_up {
            Some(follow_up) => format!("{}\n\n{}", self.question, follow_up),
            None => self.question.clone(),
        }
    }
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> LoaderResult<T> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoaderError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoaderError::Invalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        }
    })?;

    serde_yaml::from_str(&raw).map_err(|e| LoaderError::Invalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
