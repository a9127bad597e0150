//! Resolution event system for observability.
//!
//! Emits [`ResolutionEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! external observers (progress displays, transcripts, tests) can follow a
//! resolution without coupling to the resolver internals.

use serde::{Deserialize, Serialize};

/// Events emitted while a directive list is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolutionEvent {
    ResolutionStarted {
        run_id: String,
        directives: usize,
    },
    ResolutionCompleted {
        run_id: String,
        answered: usize,
        duration_ms: u64,
    },
    ResolutionFailed {
        run_id: String,
        error: String,
    },
    QuestionAsked {
        question: String,
    },
    QuestionAnswered {
        question: String,
    },
    GroupEntered {
        key: String,
        size: usize,
    },
    BranchTaken {
        question: String,
        follow_ups: usize,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<ResolutionEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: ResolutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ResolutionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
