//! Manifest registry: the immutable question identifier → specification map.

use std::collections::BTreeMap;
use std::path::Path;

use askflow_types::{AskflowError, Result};

/// An opaque question specification. Passed to the prompter unmodified apart
/// from the `name` field stamped on by the invoker.
pub type QuestionSpec = serde_json::Map<String, serde_json::Value>;

/// Read-only registry of questions that a script may ask.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    questions: BTreeMap<String, serde_json::Value>,
}

impl Manifest {
    /// Build a manifest from a JSON value.
    ///
    /// Fails with `ConfigurationError` when the value is null, not an object,
    /// or an object with no entries.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Self::from_map(map),
            serde_json::Value::Null => Err(AskflowError::ConfigurationError(
                "no manifest was found".into(),
            )),
            other => Err(AskflowError::ConfigurationError(format!(
                "expected an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Build a manifest from an already-parsed JSON object.
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        if map.is_empty() {
            return Err(AskflowError::ConfigurationError(
                "manifest contains no questions".into(),
            ));
        }
        Ok(Self {
            questions: map.into_iter().collect(),
        })
    }

    /// Read a JSON manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            AskflowError::ConfigurationError(format!("cannot read {}: {e}", path.display()))
        })?;
        let value: serde_json::Value = serde_json::from_str(&source)?;
        let manifest = Self::from_value(value)?;
        tracing::debug!(path = %path.display(), questions = manifest.len(), "Manifest loaded");
        Ok(manifest)
    }

    /// Look up the specification registered for `name`.
    ///
    /// An absent identifier and an entry that is not an object are both
    /// reported as `NotFound`.
    pub fn lookup(&self, name: &str) -> Result<&QuestionSpec> {
        self.questions
            .get(name)
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| AskflowError::NotFound {
                question: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Question identifiers in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.questions.keys().map(String::as_str)
    }

    /// All entries that have a valid specification shape.
    pub fn questions(&self) -> impl Iterator<Item = (&str, &QuestionSpec)> {
        self.questions
            .iter()
            .filter_map(|(k, v)| v.as_object().map(|spec| (k.as_str(), spec)))
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl TryFrom<serde_json::Value> for Manifest {
    type Error = AskflowError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Self::from_value(value)
    }
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "favoriteColor": {
                "type": "list",
                "message": "What's your favorite color?",
                "choices": ["red", "green", "blue"]
            },
            "favoriteWord": {
                "type": "input",
                "message": "What's your favorite word?",
                "default": "quizzical"
            },
            "broken": "not an object"
        })
    }

    #[test]
    fn null_manifest_is_rejected() {
        let err = Manifest::from_value(serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, AskflowError::ConfigurationError(_)));
    }

    #[test]
    fn empty_manifest_is_rejected() {
        let err = Manifest::from_value(json!({})).unwrap_err();
        match err {
            AskflowError::ConfigurationError(msg) => assert!(msg.contains("no questions")),
            other => panic!("Expected ConfigurationError, got: {other:?}"),
        }
    }

    #[test]
    fn non_object_manifest_is_rejected() {
        for value in [json!(["a"]), json!("a"), json!(3), json!(true)] {
            let err = Manifest::from_value(value).unwrap_err();
            assert!(matches!(err, AskflowError::ConfigurationError(_)));
        }
    }

    #[test]
    fn lookup_returns_spec() {
        let manifest = Manifest::from_value(sample()).unwrap();
        let spec = manifest.lookup("favoriteWord").unwrap();
        assert_eq!(spec.get("default"), Some(&json!("quizzical")));
    }

    #[test]
    fn lookup_missing_is_not_found() {
        let manifest = Manifest::from_value(sample()).unwrap();
        match manifest.lookup("questionThatDoesNotExist").unwrap_err() {
            AskflowError::NotFound { question } => {
                assert_eq!(question, "questionThatDoesNotExist")
            }
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn lookup_non_object_entry_is_not_found() {
        let manifest = Manifest::from_value(sample()).unwrap();
        assert!(matches!(
            manifest.lookup("broken"),
            Err(AskflowError::NotFound { .. })
        ));
        assert!(!manifest.contains("broken"));
        assert_eq!(manifest.questions().count(), 2);
        assert_eq!(manifest.len(), 3);
    }

    #[test]
    fn load_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, sample().to_string()).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert!(manifest.contains("favoriteColor"));
        assert_eq!(
            manifest.names().collect::<Vec<_>>(),
            vec!["broken", "favoriteColor", "favoriteWord"]
        );
    }

    #[test]
    fn load_missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, AskflowError::ConfigurationError(_)));
    }
}
