use crate::pool::Task;
use tracing::{debug, info};

/// Tracks which of the session's active tasks have been discovered.
///
/// Matching is deliberately simple: lower-case the text, test each keyword
/// as a substring. No stemming, no word boundaries. Predictable and easy to
/// debug, at the cost of the occasional false positive.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    active: Vec<Task>,
    completed_count: usize,
}

impl TaskRegistry {
    pub fn new(active: Vec<Task>) -> Self {
        Self {
            active,
            completed_count: 0,
        }
    }

    /// Rebuild an active set from persisted pool indices. Indices outside the
    /// pool are skipped with a log line rather than panicking, so a stale
    /// record never takes down a session.
    pub fn from_pool_indices(pool: &[Task], indices: &[usize]) -> Self {
        let active = indices
            .iter()
            .filter_map(|&i| {
                let task = pool.get(i).cloned();
                if task.is_none() {
                    tracing::warn!(index = i, pool = pool.len(), "session record index out of range");
                }
                task
            })
            .collect();
        Self::new(active)
    }

    /// Scan `text` for the keywords of every not-yet-completed task, marking
    /// the first keyword hit per task. Returns the titles completed by this
    /// call, in active-set order. Already-completed tasks are untouched, so
    /// repeating the same text is a no-op.
    pub fn match_and_complete(&mut self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let total = self.active.len();
        let mut discovered = Vec::new();

        for task in self.active.iter_mut().filter(|t| !t.completed) {
            if let Some(keyword) = task
                .keywords
                .iter()
                .find(|k| lowered.contains(&k.to_lowercase()))
            {
                task.completed = true;
                task.matched_keyword = Some(keyword.clone());
                self.completed_count += 1;
                info!(
                    task = %task.title,
                    keyword = %keyword,
                    completed = self.completed_count,
                    total,
                    "background info discovered"
                );
                discovered.push(task.title.clone());
            }
        }

        discovered
    }

    /// Human-readable status fragment appended verbatim to the next prompt.
    pub fn status_directive(&self) -> String {
        if self.is_complete() {
            "[BACKGROUND STATUS: every topic has come up naturally. You may begin saying goodbye.]"
                .to_string()
        } else {
            let remaining: Vec<&str> = self
                .active
                .iter()
                .filter(|t| !t.completed)
                .map(|t| t.title.as_str())
                .collect();
            format!(
                "[BACKGROUND STATUS: topics not yet mentioned: {}. Work them into the conversation naturally, one at a time.]",
                remaining.join(", ")
            )
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count >= self.active.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    pub fn total(&self) -> usize {
        self.active.len()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.active
    }

    /// Clear completion flags without changing the active set. Manual
    /// re-testing only; normal flow never resets mid-session.
    pub fn reset(&mut self) {
        for task in &mut self.active {
            task.completed = false;
            task.matched_keyword = None;
        }
        self.completed_count = 0;
        debug!("task registry reset");
    }
}
