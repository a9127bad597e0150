//! Directive classifier: raw script entries → typed directives.

use askflow_types::{AskflowError, Result};

use crate::script::{Branch, ScriptEntry};

/// A classified instruction of a script.
#[derive(Debug, Clone)]
pub enum Directive {
    /// Ask a single question.
    Leaf(String),
    /// Resolve a nested list as a unit, under its own key.
    Group(Vec<Directive>),
    /// Ask a pivot question, then resolve the follow-ups its branch computes.
    Fork(Fork),
}

#[derive(Debug, Clone)]
pub struct Fork {
    pub question: String,
    pub branch: Branch,
}

impl Directive {
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::Leaf(_) => "leaf",
            Directive::Group(_) => "group",
            Directive::Fork(_) => "fork",
        }
    }

    /// Question identifiers this directive asks up front, depth-first.
    /// Branch follow-ups are not included since they depend on an answer.
    pub fn question_ids(&self) -> Vec<&str> {
        match self {
            Directive::Leaf(name) => vec![name.as_str()],
            Directive::Group(items) => items.iter().flat_map(Directive::question_ids).collect(),
            Directive::Fork(fork) => vec![fork.question.as_str()],
        }
    }
}

/// Classify one entry.
///
/// Returns `Ok(None)` for scalar entries, which resolve as no-ops. Sequences
/// are classified recursively and must not be empty. Records must carry a
/// string `question` and a branch.
pub fn classify(entry: &ScriptEntry) -> Result<Option<Directive>> {
    match entry {
        ScriptEntry::Name(name) => Ok(Some(Directive::Leaf(name.clone()))),
        ScriptEntry::Sequence(items) => {
            if items.is_empty() {
                return Err(AskflowError::ValidationError(
                    "Group does not contain any directives".into(),
                ));
            }
            Ok(Some(Directive::Group(classify_all(items)?)))
        }
        ScriptEntry::Record(record) => {
            let question = match &record.question {
                Some(serde_json::Value::String(q)) => q.clone(),
                _ => {
                    return Err(AskflowError::ValidationError(
                        "Pivot does not contain a valid \"question\" property".into(),
                    ))
                }
            };
            let branch = record.branch.clone().ok_or_else(|| {
                AskflowError::ValidationError(format!(
                    "Pivot \"{question}\" does not contain a valid \"branch\" property"
                ))
            })?;
            Ok(Some(Directive::Fork(Fork { question, branch })))
        }
        ScriptEntry::Scalar(value) => {
            tracing::warn!(entry = %value, "Skipping unrecognized directive entry");
            Ok(None)
        }
    }
}

/// Classify every entry of a list, dropping no-ops. Fails on the first
/// malformed entry.
pub fn classify_all(entries: &[ScriptEntry]) -> Result<Vec<Directive>> {
    let mut directives = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(directive) = classify(entry)? {
            directives.push(directive);
        }
    }
    Ok(directives)
}
