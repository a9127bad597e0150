//! Directive-resolution engine for branching question scripts.
//!
//! This crate walks an ordered directive list against a manifest of questions:
//! leaves are asked through a [`Prompter`], groups resolve into their own
//! subtree, and forks ask a pivot question before resolving the follow-ups a
//! branch computes from its answer.

pub mod directive;
pub mod engine;
pub mod events;
pub mod invoker;
pub mod manifest;
pub mod prompter;
pub mod resolver;
pub mod script;
pub mod validation;

pub use askflow_types::{AnswerValue, AskflowError, Result, ResultNode, ResultTree};
pub use directive::{classify, classify_all, Directive, Fork};
pub use engine::{prompt, prompt_with, Engine, EngineOptions};
pub use events::{EventEmitter, ResolutionEvent};
pub use invoker::invoke;
pub use manifest::{Manifest, QuestionSpec};
pub use prompter::{
    question_name, Answers, AutoPrompter, ConsolePrompter, Prompter, ScriptedPrompter,
};
pub use resolver::{GroupKeyStyle, Resolver, ResolverConfig, DEFAULT_ANSWER_FIELD};
pub use script::{
    answer_key, load_script, parse_entry, parse_script, Branch, BranchTable, PivotRecord,
    ScriptEntry,
};
pub use validation::{
    validate, validate_or_raise, validate_with_answer_field, Diagnostic, LintRule, Severity,
};
