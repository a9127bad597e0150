//! Script input model: the untyped directive entries a caller supplies.
//!
//! Entries are built in Rust (with closure branches) or parsed from JSON (with
//! declarative branch tables). Either way they are untrusted until the
//! classifier in [`crate::directive`] turns them into typed directives.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use askflow_types::{AnswerValue, AskflowError, Result};

use crate::manifest::json_kind;

/// A branch closure: pivot answer in, follow-up entries out.
pub type BranchFn = dyn Fn(&AnswerValue) -> Vec<ScriptEntry> + Send + Sync;

/// One raw entry of a directive list.
#[derive(Debug, Clone)]
pub enum ScriptEntry {
    /// A question identifier.
    Name(String),
    /// A nested list of entries.
    Sequence(Vec<ScriptEntry>),
    /// A key/value record, expected to describe a pivot.
    Record(PivotRecord),
    /// Anything else (number, bool, null). Skipped during resolution.
    Scalar(serde_json::Value),
}

/// The raw fields of a pivot entry. Neither field is trusted yet.
#[derive(Debug, Clone, Default)]
pub struct PivotRecord {
    pub question: Option<serde_json::Value>,
    pub branch: Option<Branch>,
}

impl ScriptEntry {
    pub fn name(name: impl Into<String>) -> Self {
        ScriptEntry::Name(name.into())
    }

    pub fn group(entries: impl IntoIterator<Item = ScriptEntry>) -> Self {
        ScriptEntry::Sequence(entries.into_iter().collect())
    }

    /// A pivot whose follow-ups are computed by `branch`.
    pub fn fork<F>(question: impl Into<String>, branch: F) -> Self
    where
        F: Fn(&AnswerValue) -> Vec<ScriptEntry> + Send + Sync + 'static,
    {
        ScriptEntry::Record(PivotRecord {
            question: Some(serde_json::Value::String(question.into())),
            branch: Some(Branch::func(branch)),
        })
    }

    /// A pivot whose follow-ups come from a lookup table.
    pub fn fork_table(question: impl Into<String>, table: BranchTable) -> Self {
        ScriptEntry::Record(PivotRecord {
            question: Some(serde_json::Value::String(question.into())),
            branch: Some(Branch::Table(table)),
        })
    }
}

impl From<&str> for ScriptEntry {
    fn from(name: &str) -> Self {
        ScriptEntry::Name(name.to_string())
    }
}

impl From<String> for ScriptEntry {
    fn from(name: String) -> Self {
        ScriptEntry::Name(name)
    }
}

impl From<Vec<ScriptEntry>> for ScriptEntry {
    fn from(entries: Vec<ScriptEntry>) -> Self {
        ScriptEntry::Sequence(entries)
    }
}

impl From<serde_json::Value> for ScriptEntry {
    fn from(value: serde_json::Value) -> Self {
        parse_entry(value)
    }
}

// ---------------------------------------------------------------------------
// Branch
// ---------------------------------------------------------------------------

/// How a pivot computes its follow-up entries.
#[derive(Clone)]
pub enum Branch {
    Func(Arc<BranchFn>),
    Table(BranchTable),
}

impl Branch {
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&AnswerValue) -> Vec<ScriptEntry> + Send + Sync + 'static,
    {
        Branch::Func(Arc::new(f))
    }

    /// Compute the follow-up entries for `answer`.
    pub fn evaluate(&self, answer: &AnswerValue) -> Vec<ScriptEntry> {
        match self {
            Branch::Func(f) => f(answer),
            Branch::Table(table) => table.select(answer).to_vec(),
        }
    }

    pub fn as_table(&self) -> Option<&BranchTable> {
        match self {
            Branch::Table(t) => Some(t),
            Branch::Func(_) => None,
        }
    }
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Func(_) => f.write_str("Branch::Func(..)"),
            Branch::Table(t) => f.debug_tuple("Branch::Table").field(t).finish(),
        }
    }
}

/// Declarative branch: answer key → follow-up entries, plus a fallback.
#[derive(Debug, Clone, Default)]
pub struct BranchTable {
    cases: Vec<(String, Vec<ScriptEntry>)>,
    otherwise: Vec<ScriptEntry>,
}

impl BranchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case(mut self, answer: impl Into<String>, entries: Vec<ScriptEntry>) -> Self {
        let answer = answer.into();
        match self.cases.iter_mut().find(|(k, _)| *k == answer) {
            Some((_, slot)) => *slot = entries,
            None => self.cases.push((answer, entries)),
        }
        self
    }

    pub fn otherwise(mut self, entries: Vec<ScriptEntry>) -> Self {
        self.otherwise = entries;
        self
    }

    /// Entries for the case matching `answer`, or the fallback.
    pub fn select(&self, answer: &AnswerValue) -> &[ScriptEntry] {
        let key = answer_key(answer);
        self.cases
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&self.otherwise)
    }

    pub fn cases(&self) -> impl Iterator<Item = (&str, &[ScriptEntry])> {
        self.cases.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn fallback(&self) -> &[ScriptEntry] {
        &self.otherwise
    }
}

/// String form of an answer used for table matching: strings verbatim,
/// everything else as rendered JSON.
pub fn answer_key(answer: &AnswerValue) -> String {
    match answer {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// JSON parsing
// ---------------------------------------------------------------------------

/// Parse a top-level JSON directive list.
pub fn parse_script(value: serde_json::Value) -> Result<Vec<ScriptEntry>> {
    match value {
        serde_json::Value::Array(items) => Ok(items.into_iter().map(parse_entry).collect()),
        other => Err(AskflowError::ValidationError(format!(
            "expected a list of directives, got {}",
            json_kind(&other)
        ))),
    }
}

/// Read a JSON directive list from disk.
pub fn load_script(path: &Path) -> Result<Vec<ScriptEntry>> {
    let source = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&source)?;
    parse_script(value)
}

/// Parse one JSON value into an entry. Never fails: shape problems surface
/// later, at classification.
pub fn parse_entry(value: serde_json::Value) -> ScriptEntry {
    match value {
        serde_json::Value::String(name) => ScriptEntry::Name(name),
        serde_json::Value::Array(items) => {
            ScriptEntry::Sequence(items.into_iter().map(parse_entry).collect())
        }
        serde_json::Value::Object(mut fields) => {
            let question = fields.remove("question");
            let branches = fields.remove("branches");
            let otherwise = fields.remove("otherwise");
            ScriptEntry::Record(PivotRecord {
                question,
                branch: parse_branch_table(branches, otherwise).map(Branch::Table),
            })
        }
        scalar => ScriptEntry::Scalar(scalar),
    }
}

fn parse_branch_table(
    branches: Option<serde_json::Value>,
    otherwise: Option<serde_json::Value>,
) -> Option<BranchTable> {
    let mut table = BranchTable::new();
    match branches {
        Some(serde_json::Value::Object(cases)) => {
            for (answer, entries) in cases {
                table = table.case(answer, parse_follow_ups(entries));
            }
        }
        Some(_) => return None,
        None if otherwise.is_none() => return None,
        None => {}
    }
    if let Some(entries) = otherwise {
        table = table.otherwise(parse_follow_ups(entries));
    }
    Some(table)
}

// A case may name a single entry instead of a list.
fn parse_follow_ups(value: serde_json::Value) -> Vec<ScriptEntry> {
    match value {
        serde_json::Value::Array(items) => items.into_iter().map(parse_entry).collect(),
        single => vec![parse_entry(single)],
    }
}
