//! Shared types and errors for the askflow question engine.
//!
//! This crate provides the foundational types used across the other askflow crates:
//! - `AskflowError`: unified error taxonomy
//! - `AnswerValue`: a single answer as returned by a prompter
//! - `ResultTree` / `ResultNode`: the nested, insertion-ordered answer tree

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Unified error type for all askflow subsystems.
#[derive(Debug, thiserror::Error)]
pub enum AskflowError {
    // === Construction ===
    #[error("An invalid manifest was supplied: {0}")]
    ConfigurationError(String),

    // === Script shape ===
    #[error("Invalid directive list: {0}")]
    ValidationError(String),

    // === Resolution ===
    #[error("Question \"{question}\" not found in the manifest")]
    NotFound { question: String },

    #[error("Answer not found for question \"{question}\"")]
    AnswerMissing { question: String },

    #[error("Prompt for question \"{question}\" was cancelled")]
    PromptCancelled { question: String },

    #[error("Prompt for question \"{question}\" failed: {message}")]
    PromptFailed { question: String, message: String },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl AskflowError {
    /// Returns `true` when the caller's inputs (manifest or script) must be fixed.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AskflowError::ConfigurationError(_)
                | AskflowError::ValidationError(_)
                | AskflowError::NotFound { .. }
        )
    }

    /// Returns `true` when the prompter collaborator misbehaved or aborted.
    pub fn is_collaborator_error(&self) -> bool {
        matches!(
            self,
            AskflowError::AnswerMissing { .. }
                | AskflowError::PromptCancelled { .. }
                | AskflowError::PromptFailed { .. }
        )
    }

    /// The question identifier this error is about, if any.
    pub fn question(&self) -> Option<&str> {
        match self {
            AskflowError::NotFound { question }
            | AskflowError::AnswerMissing { question }
            | AskflowError::PromptCancelled { question }
            | AskflowError::PromptFailed { question, .. } => Some(question),
            _ => None,
        }
    }
}

/// A convenience alias for `Result<T, AskflowError>`.
pub type Result<T> = std::result::Result<T, AskflowError>;

/// A single answer. Opaque to the engine; whatever the prompter produced.
pub type AnswerValue = serde_json::Value;

// ---------------------------------------------------------------------------
// ResultNode / ResultTree
// ---------------------------------------------------------------------------

/// One entry of a [`ResultTree`]: a scalar answer or a nested tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultNode {
    Answer(AnswerValue),
    Tree(ResultTree),
}

impl ResultNode {
    pub fn as_answer(&self) -> Option<&AnswerValue> {
        match self {
            ResultNode::Answer(v) => Some(v),
            ResultNode::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&ResultTree> {
        match self {
            ResultNode::Tree(t) => Some(t),
            ResultNode::Answer(_) => None,
        }
    }
}

impl From<AnswerValue> for ResultNode {
    fn from(value: AnswerValue) -> Self {
        ResultNode::Answer(value)
    }
}

impl From<ResultTree> for ResultNode {
    fn from(tree: ResultTree) -> Self {
        ResultNode::Tree(tree)
    }
}

/// Nested mapping of identifiers to answers or further trees.
///
/// Keys keep the order in which they were first inserted. Inserting an existing
/// key replaces its value in place, so the tree only ever grows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTree {
    entries: Vec<(String, ResultNode)>,
}

impl ResultTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree seeded with a single answer under `field`.
    pub fn seeded(field: impl Into<String>, answer: AnswerValue) -> Self {
        let mut tree = Self::new();
        tree.insert(field, answer);
        tree
    }

    /// Insert or replace `key`. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<ResultNode>) -> Option<ResultNode> {
        let key = key.into();
        let node = node.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, node)),
            None => {
                self.entries.push((key, node));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ResultNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Scalar answer stored under `key`.
    pub fn answer(&self, key: &str) -> Option<&AnswerValue> {
        self.get(key).and_then(ResultNode::as_answer)
    }

    /// Nested tree stored under `key`.
    pub fn subtree(&self, key: &str) -> Option<&ResultTree> {
        self.get(key).and_then(ResultNode::as_tree)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of scalar answers at every depth.
    pub fn answer_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, node)| match node {
                ResultNode::Answer(_) => 1,
                ResultNode::Tree(t) => t.answer_count(),
            })
            .sum()
    }

    /// Convert into a plain JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|(k, node)| {
                let value = match node {
                    ResultNode::Answer(v) => v.clone(),
                    ResultNode::Tree(t) => t.to_json(),
                };
                (k.clone(), value)
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl Serialize for ResultTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, node) in &self.entries {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}
