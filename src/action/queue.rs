//! Priority-ordered action queue with a bounded execution history.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::action::model::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuedStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub action: Action,
    pub queued_at: f64,
    pub status: QueuedStatus,
    pub error: Option<String>,
}

impl QueuedAction {
    fn new(action: Action) -> Self {
        Self { action, queued_at: now_seconds(), status: QueuedStatus::Pending, error: None }
    }
}

fn now_seconds() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending_count: usize,
    pub history_count: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    pub has_current: bool,
}

/// Manages pending and historical actions, sorted by descending
/// priority. `max_history` bounds the history ring.
pub struct ActionQueue {
    pending: Vec<QueuedAction>,
    history: VecDeque<QueuedAction>,
    max_history: usize,
    current: Option<QueuedAction>,
}

impl ActionQueue {
    pub fn new(max_history: usize) -> Self {
        Self { pending: Vec::new(), history: VecDeque::with_capacity(max_history), max_history, current: None }
    }

    /// Enqueues a single action, re-sorting pending by priority
    /// descending (stable, so same-priority actions keep arrival order).
    pub fn enqueue(&mut self, action: Action) -> &QueuedAction {
        let queued = QueuedAction::new(action);
        self.pending.push(queued);
        self.pending.sort_by(|a, b| b.action.priority.value().cmp(&a.action.priority.value()));
        self.pending.last().expect("just pushed")
    }

    pub fn enqueue_batch(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.enqueue(action);
        }
    }

    pub fn dequeue(&mut self) -> Option<&QueuedAction> {
        if self.pending.is_empty() {
            return None;
        }
        let mut queued = self.pending.remove(0);
        queued.status = QueuedStatus::Executing;
        self.current = Some(queued);
        self.current.as_ref()
    }

    pub fn complete_current(&mut self, success: bool, error: Option<String>) {
        if let Some(mut queued) = self.current.take() {
            queued.status = if success { QueuedStatus::Completed } else { QueuedStatus::Failed };
            queued.error = error;
            if self.history.len() == self.max_history {
                self.history.pop_front();
            }
            self.history.push_back(queued);
        }
    }

    pub fn peek(&self) -> Option<&QueuedAction> {
        self.pending.first()
    }

    pub fn clear_pending(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn pending(&self) -> &[QueuedAction] {
        &self.pending
    }

    /// Most recent `limit` history entries, newest first.
    pub fn history(&self, limit: usize) -> Vec<&QueuedAction> {
        self.history.iter().rev().take(limit).collect()
    }

    pub fn current(&self) -> Option<&QueuedAction> {
        self.current.as_ref()
    }

    pub fn stats(&self) -> QueueStats {
        let completed = self.history.iter().filter(|qa| qa.status == QueuedStatus::Completed).count();
        let failed = self.history.iter().filter(|qa| qa.status == QueuedStatus::Failed).count();
        QueueStats {
            pending_count: self.pending.len(),
            history_count: self.history.len(),
            completed_count: completed,
            failed_count: failed,
            has_current: self.current.is_some(),
        }
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new(100)
    }
}
