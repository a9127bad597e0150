//! Script validation: lint rules and diagnostics.
//!
//! Checks a classified script against a manifest without prompting. Table
//! branches are followed into every case; closure branches are opaque. Call
//! [`validate`] for advisory diagnostics or [`validate_or_raise`] to fail on
//! any `Error`-severity issue.

use std::collections::HashSet;

use askflow_types::{AskflowError, Result};

use crate::directive::{classify_all, Directive, Fork};
use crate::manifest::Manifest;
use crate::resolver::DEFAULT_ANSWER_FIELD;
use crate::script::{answer_key, Branch};

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub question: Option<String>,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

// ---------------------------------------------------------------------------
// Lint context
// ---------------------------------------------------------------------------

/// One list of sibling directives that resolves into a single result tree.
pub struct Scope {
    /// Where the scope sits, e.g. `root`, `root/#1`, `root/animalChoice=dog`.
    pub path: String,
    /// The pivot whose fork subtree this scope fills, if any.
    pub pivot: Option<String>,
    pub directives: Vec<Directive>,
}

/// Everything the rules look at, precomputed once.
pub struct LintContext<'a> {
    pub manifest: &'a Manifest,
    pub answer_field: &'a str,
    pub scopes: Vec<Scope>,
    /// `(path, message)` for table cases that failed classification.
    pub branch_errors: Vec<(String, String)>,
    /// Whether any fork uses a closure branch.
    pub has_opaque_branches: bool,
}

impl<'a> LintContext<'a> {
    pub fn new(script: &[Directive], manifest: &'a Manifest, answer_field: &'a str) -> Self {
        let mut ctx = Self {
            manifest,
            answer_field,
            scopes: Vec::new(),
            branch_errors: Vec::new(),
            has_opaque_branches: false,
        };
        ctx.collect("root".to_string(), None, script.to_vec());
        ctx
    }

    fn collect(&mut self, path: String, pivot: Option<String>, directives: Vec<Directive>) {
        for (index, directive) in directives.iter().enumerate() {
            match directive {
                Directive::Leaf(_) => {}
                Directive::Group(items) => {
                    self.collect(format!("{path}/#{index}"), None, items.clone());
                }
                Directive::Fork(fork) => match &fork.branch {
                    Branch::Func(_) => self.has_opaque_branches = true,
                    Branch::Table(table) => {
                        let cases = table
                            .cases()
                            .map(|(k, v)| (format!("{}={}", fork.question, k), v))
                            .chain(std::iter::once((
                                format!("{}=*", fork.question),
                                table.fallback(),
                            )));
                        for (label, entries) in cases.collect::<Vec<_>>() {
                            let case_path = format!("{path}/{label}");
                            match classify_all(entries) {
                                Ok(follow_ups) => {
                                    self.collect(case_path, Some(fork.question.clone()), follow_ups)
                                }
                                Err(e) => self.branch_errors.push((case_path, e.to_string())),
                            }
                        }
                    }
                },
            }
        }
        self.scopes.push(Scope {
            path,
            pivot,
            directives,
        });
    }

    /// Every fork reachable in any scope.
    fn forks(&self) -> impl Iterator<Item = &Fork> {
        self.scopes.iter().flat_map(|s| {
            s.directives.iter().filter_map(|d| match d {
                Directive::Fork(f) => Some(f),
                _ => None,
            })
        })
    }
}

/// Result keys a scope writes directly: leaf names and pivot names.
fn scope_keys(scope: &Scope) -> impl Iterator<Item = &str> {
    scope.directives.iter().filter_map(|d| match d {
        Directive::Leaf(name) => Some(name.as_str()),
        Directive::Fork(fork) => Some(fork.question.as_str()),
        Directive::Group(_) => None,
    })
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic>;
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct UnknownQuestionRule;
impl LintRule for UnknownQuestionRule {
    fn name(&self) -> &str { "unknown_question" }
    fn apply(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        ctx.scopes
            .iter()
            .flat_map(|scope| scope_keys(scope).map(move |q| (scope, q)))
            .filter(|(_, q)| !ctx.manifest.contains(q))
            .map(|(scope, q)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!("Question \"{}\" in {} not found in the manifest", q, scope.path),
                question: Some(q.to_string()),
                fix: Some(format!("Add \"{q}\" to the manifest or fix the identifier")),
            })
            .collect()
    }
}

struct DuplicateQuestionRule;
impl LintRule for DuplicateQuestionRule {
    fn name(&self) -> &str { "duplicate_question" }
    fn apply(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for scope in &ctx.scopes {
            let mut seen = HashSet::new();
            for q in scope_keys(scope) {
                if !seen.insert(q) {
                    diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Warning,
                        message: format!(
                            "Question \"{}\" is asked more than once in {}; the last answer wins",
                            q, scope.path
                        ),
                        question: Some(q.to_string()),
                        fix: Some("Move the repeat into its own group".into()),
                    });
                }
            }
        }
        diags
    }
}

struct ReservedFieldRule;
impl LintRule for ReservedFieldRule {
    fn name(&self) -> &str { "reserved_field" }
    fn apply(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        ctx.scopes
            .iter()
            .filter_map(|scope| scope.pivot.as_deref().map(|p| (scope, p)))
            .flat_map(|(scope, pivot)| scope_keys(scope).map(move |q| (pivot, q)))
            .filter(|(_, q)| *q == ctx.answer_field)
            .map(|(pivot, q)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!(
                    "Follow-up \"{}\" of pivot \"{}\" overwrites the pivot's own answer",
                    q, pivot
                ),
                question: Some(q.to_string()),
                fix: Some("Rename the question or configure another answer field".into()),
            })
            .collect()
    }
}

struct ReservedGroupKeyRule;
impl LintRule for ReservedGroupKeyRule {
    fn name(&self) -> &str { "reserved_group_key" }
    fn apply(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        ctx.scopes
            .iter()
            .flat_map(|scope| scope_keys(scope).map(move |q| (scope, q)))
            .filter(|(_, q)| q.starts_with('#'))
            .map(|(scope, q)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!(
                    "Question \"{}\" in {} uses the \"#\" prefix reserved for group keys",
                    q, scope.path
                ),
                question: Some(q.to_string()),
                fix: Some("Rename the question so it does not start with \"#\"".into()),
            })
            .collect()
    }
}

struct BranchCaseChoiceRule;
impl LintRule for BranchCaseChoiceRule {
    fn name(&self) -> &str { "branch_case_choice" }
    fn apply(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for fork in ctx.forks() {
            let Some(table) = fork.branch.as_table() else { continue };
            let Ok(spec) = ctx.manifest.lookup(&fork.question) else { continue };
            let Some(choices) = spec.get("choices").and_then(|c| c.as_array()) else { continue };

            let known: HashSet<String> = choices
                .iter()
                .map(|c| match c.get("value").or_else(|| c.get("name")) {
                    Some(v) if c.is_object() => answer_key(v),
                    _ => answer_key(c),
                })
                .collect();
            let mut expected: Vec<_> = known.iter().cloned().collect();
            expected.sort();
            for (case, _) in table.cases() {
                if !known.contains(case) {
                    diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Warning,
                        message: format!(
                            "Branch case \"{}\" of pivot \"{}\" matches none of its choices",
                            case, fork.question
                        ),
                        question: Some(fork.question.clone()),
                        fix: Some(format!("Use one of: {}", expected.join(", "))),
                    });
                }
            }
        }
        diags
    }
}

struct BranchShapeRule;
impl LintRule for BranchShapeRule {
    fn name(&self) -> &str { "branch_shape" }
    fn apply(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        ctx.branch_errors
            .iter()
            .map(|(path, message)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!("Branch {path} is malformed: {message}"),
                question: None,
                fix: None,
            })
            .collect()
    }
}

struct UnusedQuestionRule;
impl LintRule for UnusedQuestionRule {
    fn name(&self) -> &str { "unused_question" }
    fn apply(&self, ctx: &LintContext<'_>) -> Vec<Diagnostic> {
        // A closure branch may ask anything.
        if ctx.has_opaque_branches {
            return vec![];
        }
        let used: HashSet<&str> = ctx.scopes.iter().flat_map(scope_keys).collect();
        ctx.manifest
            .names()
            .filter(|name| !used.contains(name))
            .map(|name| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Info,
                message: format!("Question \"{name}\" is never asked"),
                question: Some(name.to_string()),
                fix: None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run all built-in lint rules using the default answer field.
pub fn validate(script: &[Directive], manifest: &Manifest) -> Vec<Diagnostic> {
    validate_with_answer_field(script, manifest, DEFAULT_ANSWER_FIELD)
}

/// Run all built-in lint rules with a custom reserved answer field.
pub fn validate_with_answer_field(
    script: &[Directive],
    manifest: &Manifest,
    answer_field: &str,
) -> Vec<Diagnostic> {
    let rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(UnknownQuestionRule),
        Box::new(BranchShapeRule),
        Box::new(DuplicateQuestionRule),
        Box::new(ReservedFieldRule),
        Box::new(ReservedGroupKeyRule),
        Box::new(BranchCaseChoiceRule),
        Box::new(UnusedQuestionRule),
    ];

    let ctx = LintContext::new(script, manifest, answer_field);
    let mut diagnostics = Vec::new();
    for rule in &rules {
        diagnostics.extend(rule.apply(&ctx));
    }
    diagnostics
}

/// Run all lint rules; return `Err` if any `Error`-severity diagnostic found.
pub fn validate_or_raise(script: &[Directive], manifest: &Manifest) -> Result<Vec<Diagnostic>> {
    let diagnostics = validate(script, manifest);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    if !errors.is_empty() {
        let messages: Vec<_> = errors.iter().map(|d| d.message.clone()).collect();
        return Err(AskflowError::ValidationError(messages.join("; ")));
    }
    Ok(diagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
