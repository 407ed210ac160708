//! Runtime types.

use serde::{Deserialize, Serialize};

/// What to cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "target", content = "id")]
pub enum CancelTarget {
    /// One in-flight task, by id (`task_<n>`).
    Task(String),
    /// Everything in flight.
    All,
}

/// Runtime status information.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStatus {
    /// Upstream calls currently registered for cancellation.
    #[serde(rename = "activeTasks")]
    pub active_tasks: usize,
    /// Entries in the extraction content cache.
    #[serde(rename = "cacheEntries")]
    pub cache_entries: usize,
    #[serde(rename = "maxConcurrency")]
    pub max_concurrency: usize,
    /// Highest concurrency observed since startup.
    #[serde(rename = "peakConcurrency")]
    pub peak_concurrency: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_target_serde() {
        let json = serde_json::to_value(CancelTarget::Task("task_3".into())).unwrap();
        assert_eq!(json, serde_json::json!({"target": "task", "id": "task_3"}));
        let all: CancelTarget = serde_json::from_str(r#"{"target":"all"}"#).unwrap();
        assert_eq!(all, CancelTarget::All);
    }

    #[test]
    fn test_status_field_names() {
        let status = RuntimeStatus {
            active_tasks: 1,
            cache_entries: 2,
            max_concurrency: 10,
            peak_concurrency: 4,
        };
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["activeTasks"], 1);
        assert_eq!(json["peakConcurrency"], 4);
    }
}
