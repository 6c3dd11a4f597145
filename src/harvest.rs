use crate::{
    archive::Archive,
    error::{FetchError, HarvestError},
    extract::{extract_samples, LabelSet},
    fetch::Fetcher,
    tasks::list_tasks,
    types::{ContestId, TaskId, TaskRef},
};
use derive_builder::Builder;
use serde::{Serialize, Serializer};
use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Semaphore;
use tracing::{info, info_span, warn, Instrument};

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const MAX_CONCURRENCY: usize = 64;

/// Downloads and archives the samples of every task in a contest.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct Harvester {
    fetcher: Fetcher,
    #[builder(default)]
    archive: Archive,
    #[builder(default)]
    labels: LabelSet,
    /// Task pages fetched at the same time, clamped to `1..=MAX_CONCURRENCY`.
    #[builder(default = "DEFAULT_CONCURRENCY")]
    concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Harvested { samples: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: TaskId,
    pub path: String,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub contest: ContestId,
    /// In task-list order.
    pub tasks: Vec<TaskReport>,
    #[serde(rename = "elapsed_ms", serialize_with = "millis")]
    pub elapsed: Duration,
}

impl Harvester {
    pub async fn harvest(&self, contest: &ContestId) -> Result<HarvestReport, FetchError> {
        let started = Instant::now();
        let tasks = list_tasks(&self.fetcher, contest).await?;
        info!(%contest, tasks = tasks.len(), "found tasks");

        let permits = Arc::new(Semaphore::new(self.concurrency.clamp(1, MAX_CONCURRENCY)));
        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let harvester = self.clone();
            let permits = permits.clone();
            let contest = contest.clone();
            let span = info_span!("task", %contest, task = %task.id);
            let TaskRef { id, path, .. } = task.clone();

            let handle = tokio::spawn(
                async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return Err(HarvestError::Cancelled);
                    };
                    harvester.harvest_task(&contest, &task).await
                }
                .instrument(span),
            );
            handles.push((id, path, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (task, path, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(samples)) => TaskOutcome::Harvested { samples },
                Ok(Err(e)) => {
                    warn!(%task, error = %e, "harvest failed");
                    TaskOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
                Err(e) => {
                    warn!(%task, error = %e, "harvest worker died");
                    TaskOutcome::Failed {
                        reason: format!("worker failed: {e}"),
                    }
                }
            };
            reports.push(TaskReport {
                task,
                path,
                outcome,
            });
        }

        let report = HarvestReport {
            contest: contest.clone(),
            tasks: reports,
            elapsed: started.elapsed(),
        };
        info!(
            harvested = report.harvested(),
            failed = report.failed(),
            elapsed = ?report.elapsed,
            "harvest finished"
        );
        Ok(report)
    }

    async fn harvest_task(&self, contest: &ContestId, task: &TaskRef) -> Result<usize, HarvestError> {
        if self.fetcher.cancel_token().is_cancelled() {
            return Err(HarvestError::Cancelled);
        }

        let samples = {
            let doc = self.fetcher.fetch(&task.path).await?;
            extract_samples(&doc, &self.labels)?
        };
        if samples.is_empty() {
            warn!(path = %task.path, "no samples found");
        }

        self.archive.write_all(&samples, contest, &task.id)?;
        info!(samples = samples.len(), "archived");
        Ok(samples.len())
    }
}

impl HarvestReport {
    pub fn harvested(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| matches!(t.outcome, TaskOutcome::Harvested { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.tasks.len() - self.harvested()
    }

    pub fn outcome(&self, task: &str) -> Option<&TaskOutcome> {
        self.tasks
            .iter()
            .find(|t| t.task.as_str() == task)
            .map(|t| &t.outcome)
    }

    pub fn elapsed_label(&self) -> String {
        format!("{} ms", self.elapsed.as_millis())
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Harvested { samples: 1 } => write!(f, "ok (1 sample)"),
            TaskOutcome::Harvested { samples } => write!(f, "ok ({samples} samples)"),
            TaskOutcome::Failed { reason } => write!(f, "FAILED: {reason}"),
        }
    }
}

fn millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
