//! Prompt invoker: one question identifier in, one answer out.

use askflow_types::{AnswerValue, AskflowError, Result};

use crate::manifest::QuestionSpec;
use crate::prompter::Prompter;

/// Ask a single question through `prompter`.
///
/// The specification is copied and stamped with `name` before it is handed
/// over. The response must contain an answer keyed by `name`.
pub async fn invoke(prompter: &dyn Prompter, name: &str, spec: &QuestionSpec) -> Result<AnswerValue> {
    let mut question = spec.clone();
    question.insert("name".into(), AnswerValue::String(name.to_string()));

    let mut answers = prompter.prompt(&question).await?;
    answers.remove(name).ok_or_else(|| AskflowError::AnswerMissing {
        question: name.to_string(),
    })
}
