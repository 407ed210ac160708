//! Registry of in-flight upstream calls, for cooperative cancellation.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use crate::cancel::CancelToken;

/// Tracks cancellation tokens by task id. Holds no results.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: DashMap<String, CancelToken>,
    next_id: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh id of the form `task_<n>`, starting at `task_1`.
    pub fn next_task_id(&self) -> String {
        format!("task_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Register a fresh task that is unregistered when the handle drops.
    pub fn track(&self) -> TrackedTask<'_> {
        let id = self.next_task_id();
        let token = CancelToken::new();
        self.register(id.clone(), token.clone());
        TrackedTask {
            registry: self,
            id,
            token,
        }
    }

    pub fn register(&self, id: impl Into<String>, token: CancelToken) {
        self.tasks.insert(id.into(), token);
    }

    pub fn unregister(&self, id: &str) {
        self.tasks.remove(id);
    }

    /// Cancel and forget one task. False when no such task is registered.
    pub fn cancel(&self, id: &str) -> bool {
        match self.tasks.remove(id) {
            Some((_, token)) => {
                token.cancel();
                debug!("Cancelled {}", id);
                true
            }
            None => false,
        }
    }

    /// Cancel every registered task. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<String> = self.tasks.iter().map(|e| e.key().clone()).collect();
        ids.iter().filter(|id| self.cancel(id)).count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Registration of one in-flight call.
#[derive(Debug)]
pub struct TrackedTask<'a> {
    registry: &'a TaskRegistry,
    pub id: String,
    pub token: CancelToken,
}

impl Drop for TrackedTask<'_> {
    fn drop(&mut self) {
        self.registry.unregister(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let registry = TaskRegistry::new();
        assert_eq!(registry.next_task_id(), "task_1");
        assert_eq!(registry.next_task_id(), "task_2");
    }

    #[test]
    fn test_cancel_once() {
        let registry = TaskRegistry::new();
        let token = CancelToken::new();
        registry.register("task_7", token.clone());

        assert!(registry.cancel("task_7"));
        assert!(token.is_cancelled());
        assert!(!registry.cancel("task_7"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cancel_leaves_siblings() {
        let registry = TaskRegistry::new();
        let a = CancelToken::new();
        let b = CancelToken::new();
        registry.register("task_1", a.clone());
        registry.register("task_2", b.clone());

        registry.cancel("task_1");
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(registry.contains("task_2"));
    }

    #[test]
    fn test_cancel_all() {
        let registry = TaskRegistry::new();
        let tokens: Vec<CancelToken> = (0..3).map(|_| CancelToken::new()).collect();
        for token in &tokens {
            registry.register(registry.next_task_id(), token.clone());
        }
        assert_eq!(registry.cancel_all(), 3);
        assert!(tokens.iter().all(|t| t.is_cancelled()));
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.cancel_all(), 0);
    }

    #[test]
    fn test_unregister() {
        let registry = TaskRegistry::new();
        registry.register("task_1", CancelToken::new());
        registry.unregister("task_1");
        assert!(!registry.cancel("task_1"));
    }

    #[test]
    fn test_tracked_task_unregisters_on_drop() {
        let registry = TaskRegistry::new();
        let tracked = registry.track();
        assert_eq!(tracked.id, "task_1");
        assert!(registry.contains("task_1"));

        assert!(registry.cancel("task_1"));
        assert!(tracked.token.is_cancelled());
        drop(tracked);

        let second = registry.track();
        drop(second);
        assert!(registry.is_empty());
    }
}
