//! Resolver: the sequential, recursive walk over a directive list.

use futures_core::future::BoxFuture;

use askflow_types::{AnswerValue, Result, ResultNode, ResultTree};

use crate::directive::{classify_all, Directive};
use crate::events::{EventEmitter, ResolutionEvent};
use crate::invoker::invoke;
use crate::manifest::Manifest;
use crate::prompter::Prompter;

/// Reserved key holding a pivot's own answer inside its fork subtree.
pub const DEFAULT_ANSWER_FIELD: &str = "_answer";

/// How a group's subtree is keyed in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupKeyStyle {
    /// `#<index>`, the group's position among its (non-skipped) siblings.
    ///
    /// Keys starting with `#` are reserved for groups; the `reserved_group_key`
    /// lint flags question identifiers that use the prefix.
    #[default]
    Positional,
    /// `#` followed by the group's question identifiers joined with `,`,
    /// nested groups flattened. A key already taken in the same tree gets
    /// `#<index>` appended.
    Joined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub answer_field: String,
    pub group_keys: GroupKeyStyle,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            answer_field: DEFAULT_ANSWER_FIELD.to_string(),
            group_keys: GroupKeyStyle::default(),
        }
    }
}

/// Walks directives against a manifest, one question at a time.
///
/// Each directive is fully resolved, including everything nested under it,
/// before the next sibling starts. The first error aborts the walk.
pub struct Resolver<'a> {
    manifest: &'a Manifest,
    prompter: &'a dyn Prompter,
    config: &'a ResolverConfig,
    events: Option<&'a EventEmitter>,
}

impl<'a> Resolver<'a> {
    pub fn new(manifest: &'a Manifest, prompter: &'a dyn Prompter, config: &'a ResolverConfig) -> Self {
        Self {
            manifest,
            prompter,
            config,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Option<&'a EventEmitter>) -> Self {
        self.events = events;
        self
    }

    /// Resolve a directive list into a fresh result tree. An empty list
    /// (e.g. a script of skipped scalars) resolves to an empty tree.
    pub async fn resolve(&self, directives: &[Directive]) -> Result<ResultTree> {
        self.resolve_into(directives, ResultTree::new()).await
    }

    fn resolve_into<'s>(
        &'s self,
        directives: &'s [Directive],
        mut results: ResultTree,
    ) -> BoxFuture<'s, Result<ResultTree>> {
        Box::pin(async move {
            for (index, directive) in directives.iter().enumerate() {
                match directive {
                    Directive::Leaf(name) => {
                        let answer = self.ask(name).await?;
                        record(&mut results, name.clone(), answer);
                    }
                    Directive::Group(items) => {
                        let key = self.group_key(index, directive, &results);
                        tracing::debug!(key = %key, size = items.len(), "Entering group");
                        self.emit(ResolutionEvent::GroupEntered {
                            key: key.clone(),
                            size: items.len(),
                        });
                        let subtree = self.resolve_into(items, ResultTree::new()).await?;
                        record(&mut results, key, subtree);
                    }
                    Directive::Fork(fork) => {
                        let answer = self.ask(&fork.question).await?;
                        // Branch output is untrusted; classify it before asking anything.
                        let follow_ups = classify_all(&fork.branch.evaluate(&answer))?;
                        tracing::debug!(
                            question = %fork.question,
                            follow_ups = follow_ups.len(),
                            "Branch taken"
                        );
                        self.emit(ResolutionEvent::BranchTaken {
                            question: fork.question.clone(),
                            follow_ups: follow_ups.len(),
                        });
                        let seeded = ResultTree::seeded(self.config.answer_field.clone(), answer);
                        let subtree = self.resolve_into(&follow_ups, seeded).await?;
                        record(&mut results, fork.question.clone(), subtree);
                    }
                }
            }
            Ok(results)
        })
    }

    async fn ask(&self, name: &str) -> Result<AnswerValue> {
        let spec = self.manifest.lookup(name)?;
        tracing::debug!(question = %name, "Asking question");
        self.emit(ResolutionEvent::QuestionAsked {
            question: name.to_string(),
        });
        let answer = invoke(self.prompter, name, spec).await?;
        self.emit(ResolutionEvent::QuestionAnswered {
            question: name.to_string(),
        });
        Ok(answer)
    }

    fn group_key(&self, index: usize, group: &Directive, results: &ResultTree) -> String {
        match self.config.group_keys {
            GroupKeyStyle::Positional => format!("#{index}"),
            GroupKeyStyle::Joined => {
                let key = format!("#{}", group.question_ids().join(","));
                if results.contains_key(&key) {
                    format!("{key}#{index}")
                } else {
                    key
                }
            }
        }
    }

    fn emit(&self, event: ResolutionEvent) {
        if let Some(events) = self.events {
            events.emit(event);
        }
    }
}

fn record(results: &mut ResultTree, key: String, node: impl Into<ResultNode>) {
    if results.insert(key.clone(), node).is_some() {
        tracing::warn!(key = %key, "Earlier answer overwritten");
    }
}
