// src/jobs.rs
//! Tracked background tasks. Jobs live in memory only and are lost on restart.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed { error: String },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub status: JobStatus,
    /// Short value a successful task hands back, e.g. the id it worked on
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// How long a finished record stays queryable
fn default_job_retention() -> Duration {
    Duration::hours(6)
}

#[derive(Debug, Clone)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
    retention: Duration,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::with_retention(default_job_retention())
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Spawn `task` on the runtime and return its id immediately
    pub async fn spawn<F>(&self, name: &str, task: F) -> Uuid
    where
        F: Future<Output = anyhow::Result<Option<String>>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let record = JobRecord {
            id,
            name: name.to_string(),
            status: JobStatus::Pending,
            result: None,
            created_at: Utc::now(),
            finished_at: None,
        };
        {
            let mut jobs = self.jobs.write().await;
            let cutoff = Utc::now() - self.retention;
            let before = jobs.len();
            jobs.retain(|_, job| job.finished_at.map_or(true, |at| at > cutoff));
            if jobs.len() < before {
                debug!("Pruned {} finished job(s)", before - jobs.len());
            }
            jobs.insert(id, record);
        }

        let tracker = self.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            tracker.set_status(id, JobStatus::Running, None).await;
            info!("Job {} ({}) started", id, name);

            match task.await {
                Ok(result) => {
                    info!("Job {} ({}) succeeded", id, name);
                    tracker.set_status(id, JobStatus::Succeeded, result).await;
                }
                Err(e) => {
                    error!("Job {} ({}) failed: {:#}", id, name, e);
                    let status = JobStatus::Failed {
                        error: format!("{:#}", e),
                    };
                    tracker.set_status(id, status, None).await;
                }
            }
        });

        id
    }

    async fn set_status(&self, id: Uuid, status: JobStatus, result: Option<String>) {
        if let Some(record) = self.jobs.write().await.get_mut(&id) {
            if status.is_finished() {
                record.finished_at = Some(Utc::now());
            }
            record.status = status;
            record.result = result;
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.jobs.read().await.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    async fn wait_until_finished(tracker: &JobTracker, id: Uuid) -> JobRecord {
        for _ in 0..100 {
            if let Some(record) = tracker.get(id).await {
                if record.status.is_finished() {
                    return record;
                }
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        panic!("job {} did not finish", id);
    }

    #[tokio::test]
    async fn test_successful_job_is_observable() {
        let tracker = JobTracker::new();
        let id = tracker
            .spawn("ok", async { Ok(Some("urn:li:person:1".to_string())) })
            .await;

        let record = wait_until_finished(&tracker, id).await;
        assert_eq!(record.status, JobStatus::Succeeded);
        assert_eq!(record.result.as_deref(), Some("urn:li:person:1"));
        assert!(record.finished_at.is_some());
        assert_eq!(record.name, "ok");
    }

    #[tokio::test]
    async fn test_failed_job_records_error() {
        let tracker = JobTracker::new();
        let id = tracker
            .spawn("boom", async { Err(anyhow::anyhow!("upstream down")) })
            .await;

        let record = wait_until_finished(&tracker, id).await;
        assert_eq!(
            record.status,
            JobStatus::Failed {
                error: "upstream down".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_finished_jobs_are_pruned_after_retention() {
        let tracker = JobTracker::with_retention(Duration::zero());
        let first = tracker.spawn("old", async { Ok(None) }).await;
        wait_until_finished(&tracker, first).await;
        tokio::time::sleep(StdDuration::from_millis(5)).await;

        let second = tracker
            .spawn("slow", async {
                tokio::time::sleep(StdDuration::from_millis(50)).await;
                Ok(None)
            })
            .await;

        assert!(tracker.get(first).await.is_none());
        assert!(tracker.get(second).await.is_some());
    }

    #[tokio::test]
    async fn test_retention_keeps_recent_jobs() {
        let tracker = JobTracker::new();
        let first = tracker.spawn("a", async { Ok(None) }).await;
        wait_until_finished(&tracker, first).await;
        tracker.spawn("b", async { Ok(None) }).await;

        assert!(tracker.get(first).await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_job() {
        assert!(JobTracker::new().get(Uuid::new_v4()).await.is_none());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(JobStatus::Failed {
            error: "x".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"state": "failed", "error": "x"}));
    }
}
