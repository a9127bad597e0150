//! Prompter trait and built-in implementations.
//!
//! A prompter renders one question specification and returns the answers it
//! collected, keyed by question identifier. The engine only ever hands it one
//! question at a time.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use askflow_types::{AnswerValue, AskflowError, Result};

use crate::manifest::QuestionSpec;
use crate::script::answer_key;

/// Identifier → answer map returned by a prompter.
pub type Answers = serde_json::Map<String, AnswerValue>;

#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask `question` (which carries its identifier in the `name` field).
    async fn prompt(&self, question: &QuestionSpec) -> Result<Answers>;
}

/// The identifier stamped onto a question specification.
pub fn question_name(question: &QuestionSpec) -> &str {
    question
        .get("name")
        .and_then(AnswerValue::as_str)
        .unwrap_or_default()
}

fn question_kind(question: &QuestionSpec) -> &str {
    question
        .get("type")
        .and_then(AnswerValue::as_str)
        .unwrap_or("input")
}

/// `(label, value)` pairs for a question's `choices`. A choice may be a plain
/// value or an object with `name`/`value`.
fn choices(question: &QuestionSpec) -> Vec<(String, AnswerValue)> {
    let Some(items) = question.get("choices").and_then(AnswerValue::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|choice| match choice {
            AnswerValue::Object(fields) => {
                let value = fields
                    .get("value")
                    .or_else(|| fields.get("name"))
                    .cloned()
                    .unwrap_or(AnswerValue::Null);
                let label = fields
                    .get("name")
                    .map(answer_key)
                    .unwrap_or_else(|| answer_key(&value));
                (label, value)
            }
            other => (answer_key(other), other.clone()),
        })
        .collect()
}

fn single(name: &str, value: AnswerValue) -> Answers {
    let mut answers = Answers::new();
    answers.insert(name.to_string(), value);
    answers
}

// ---------------------------------------------------------------------------
// ConsolePrompter
// ---------------------------------------------------------------------------

struct ConsoleIo {
    input: Box<dyn BufRead + Send>,
    output: Box<dyn Write + Send>,
}

/// Line-oriented terminal prompter.
///
/// Understands the conventional `message`, `type` (`input`, `list`, `rawlist`,
/// `confirm`, `number`, `checkbox`), `choices` and `default` fields. End of
/// input cancels the question. Reads run on the blocking thread pool, never on
/// the async runtime's worker threads.
pub struct ConsolePrompter {
    io: Arc<Mutex<ConsoleIo>>,
}

impl ConsolePrompter {
    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            io: Arc::new(Mutex::new(ConsoleIo {
                input: Box::new(input),
                output: Box::new(output),
            })),
        }
    }

    /// Read from stdin, render to stderr so stdout stays free for results.
    pub fn stdio() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::stdio()
    }
}

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn prompt(&self, question: &QuestionSpec) -> Result<Answers> {
        let name = question_name(question).to_string();
        let io = Arc::clone(&self.io);
        let question = question.clone();
        tokio::task::spawn_blocking(move || ask_blocking(&io, &question))
            .await
            .map_err(|e| AskflowError::PromptFailed {
                question: name,
                message: e.to_string(),
            })?
    }
}

fn ask_blocking(io: &Mutex<ConsoleIo>, question: &QuestionSpec) -> Result<Answers> {
    let name = question_name(question);
    let mut io = io.lock().map_err(|_| AskflowError::PromptFailed {
        question: name.to_string(),
        message: "console lock poisoned".into(),
    })?;
    let io = &mut *io;

    render(question, &mut io.output)?;
    loop {
        write!(io.output, "> ")?;
        io.output.flush()?;

        let mut line = String::new();
        if io.input.read_line(&mut line)? == 0 {
            return Err(AskflowError::PromptCancelled {
                question: name.to_string(),
            });
        }
        match interpret_input(question, line.trim()) {
            Some(value) => return Ok(single(name, value)),
            None => writeln!(io.output, "  Please enter a valid {} answer", question_kind(question))?,
        }
    }
}

fn render(question: &QuestionSpec, out: &mut dyn Write) -> Result<()> {
    let message = question
        .get("message")
        .and_then(AnswerValue::as_str)
        .unwrap_or_else(|| question_name(question));
    writeln!(out, "? {message}")?;
    for (i, (label, _)) in choices(question).iter().enumerate() {
        writeln!(out, "  [{}] {}", i + 1, label)?;
    }
    if question_kind(question) == "confirm" {
        writeln!(out, "  (y/n)")?;
    }
    if let Some(default) = question.get("default") {
        writeln!(out, "  (default: {})", answer_key(default))?;
    }
    Ok(())
}

/// Turn a line of user input into an answer. `None` means the input is not
/// acceptable for the question's type.
pub(crate) fn interpret_input(question: &QuestionSpec, input: &str) -> Option<AnswerValue> {
    let default = question.get("default").cloned();
    match question_kind(question) {
        "list" | "rawlist" | "expand" => {
            let options = choices(question);
            if input.is_empty() {
                return default.or_else(|| options.first().map(|(_, v)| v.clone()));
            }
            if let Ok(idx) = input.parse::<usize>() {
                if idx > 0 && idx <= options.len() {
                    return Some(options[idx - 1].1.clone());
                }
            }
            options
                .into_iter()
                .find(|(label, _)| label == input)
                .map(|(_, value)| value)
        }
        "checkbox" => {
            if input.is_empty() {
                return Some(default.unwrap_or_else(|| AnswerValue::Array(Vec::new())));
            }
            let options = choices(question);
            let mut picked = Vec::new();
            for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let idx = part.parse::<usize>().ok()?;
                if idx == 0 || idx > options.len() {
                    return None;
                }
                picked.push(options[idx - 1].1.clone());
            }
            Some(AnswerValue::Array(picked))
        }
        "confirm" => match input.to_ascii_lowercase().as_str() {
            "" => Some(default.unwrap_or(AnswerValue::Bool(false))),
            "y" | "yes" | "true" => Some(AnswerValue::Bool(true)),
            "n" | "no" | "false" => Some(AnswerValue::Bool(false)),
            _ => None,
        },
        "number" => {
            if input.is_empty() {
                return default;
            }
            if let Ok(n) = input.parse::<i64>() {
                return Some(AnswerValue::from(n));
            }
            input
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(AnswerValue::Number)
        }
        _ => {
            if input.is_empty() {
                Some(default.unwrap_or_else(|| AnswerValue::String(String::new())))
            } else {
                Some(AnswerValue::String(input.to_string()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// AutoPrompter
// ---------------------------------------------------------------------------

/// Non-interactive prompter: answers every question with its default, else
/// its first choice, else an empty value of the question's type.
pub struct AutoPrompter;

#[async_trait]
impl Prompter for AutoPrompter {
    async fn prompt(&self, question: &QuestionSpec) -> Result<Answers> {
        let value = question
            .get("default")
            .cloned()
            .or_else(|| choices(question).into_iter().next().map(|(_, v)| v))
            .unwrap_or_else(|| match question_kind(question) {
                "confirm" => AnswerValue::Bool(false),
                "checkbox" => AnswerValue::Array(Vec::new()),
                _ => AnswerValue::String(String::new()),
            });
        Ok(single(question_name(question), value))
    }
}

// ---------------------------------------------------------------------------
// ScriptedPrompter
// ---------------------------------------------------------------------------

/// Plays back preset answers by identifier and records every question asked.
///
/// A question without a preset answer gets an empty response, which the
/// engine reports as a missing answer.
pub struct ScriptedPrompter {
    answers: HashMap<String, AnswerValue>,
    cancel_on: HashSet<String>,
    asked: Mutex<Vec<QuestionSpec>>,
}

impl ScriptedPrompter {
    pub fn new<K: Into<String>>(answers: impl IntoIterator<Item = (K, AnswerValue)>) -> Self {
        Self {
            answers: answers.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            cancel_on: HashSet::new(),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Build from a JSON object of identifier → answer.
    pub fn from_value(value: AnswerValue) -> Result<Self> {
        match value {
            AnswerValue::Object(map) => Ok(Self::new(map)),
            other => Err(AskflowError::ConfigurationError(format!(
                "scripted answers must be an object, got {}",
                crate::manifest::json_kind(&other)
            ))),
        }
    }

    /// Cancel instead of answering when `name` is asked.
    pub fn cancel_on(mut self, name: impl Into<String>) -> Self {
        self.cancel_on.insert(name.into());
        self
    }

    /// Identifiers asked so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.questions()
            .iter()
            .map(|q| question_name(q).to_string())
            .collect()
    }

    /// Question specifications received so far, in order.
    pub fn questions(&self) -> Vec<QuestionSpec> {
        self.asked.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn prompt(&self, question: &QuestionSpec) -> Result<Answers> {
        self.asked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(question.clone());
        let name = question_name(question);
        if self.cancel_on.contains(name) {
            return Err(AskflowError::PromptCancelled {
                question: name.to_string(),
            });
        }
        Ok(match self.answers.get(name) {
            Some(value) => single(name, value.clone()),
            None => Answers::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
