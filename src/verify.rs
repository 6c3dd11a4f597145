use crate::{
    archive::Archive,
    error::{ArchiveError, ProcessError},
    runner::{self, RunOutcome},
    types::{ContestId, Sample, TaskId},
};
use derive_builder::Builder;
use serde::{Serialize, Serializer};
use std::{os::unix::process::ExitStatusExt, path::PathBuf, time::Duration};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

pub const DEFAULT_EXECUTABLE: &str = "./main";
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, Display)]
pub enum Verdict {
    #[strum(serialize = "AC")]
    #[serde(rename = "AC")]
    Accepted,
    #[strum(serialize = "WA")]
    #[serde(rename = "WA")]
    WrongAnswer,
    #[strum(serialize = "RE")]
    #[serde(rename = "RE")]
    RuntimeError,
    #[strum(serialize = "TLE")]
    #[serde(rename = "TLE")]
    TimeLimitExceeded,
    #[strum(serialize = "IE")]
    #[serde(rename = "IE")]
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub index: usize,
    pub verdict: Verdict,
    #[serde(rename = "elapsed_ms", serialize_with = "millis")]
    pub elapsed: Option<Duration>,
    pub memory_kib: Option<u64>,
    /// Exit status or launch error, for anything that is not AC/WA.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<Mismatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub contest: ContestId,
    pub task: TaskId,
    pub cases: Vec<CaseReport>,
    #[serde(rename = "max_elapsed_ms", serialize_with = "millis")]
    pub max_elapsed: Option<Duration>,
    pub max_memory_kib: Option<u64>,
    /// Samples never run because the check was cancelled.
    pub skipped: usize,
}

/// Runs a solution executable against a task's archived samples.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct Verifier {
    #[builder(default)]
    archive: Archive,
    #[builder(default = "PathBuf::from(DEFAULT_EXECUTABLE)")]
    executable: PathBuf,
    #[builder(default = "DEFAULT_TIME_LIMIT")]
    time_limit: Duration,
    #[builder(default)]
    cancel: CancellationToken,
}

impl Verifier {
    /// Check every archived sample of one task, one run at a time.
    #[instrument(skip(self), fields(exec = %self.executable.display()))]
    pub async fn check(&self, contest: &ContestId, task: &TaskId) -> Result<CheckReport, ArchiveError> {
        let samples = self.archive.load(contest, task)?;
        info!(samples = samples.len(), "checking samples");

        let mut cases = Vec::with_capacity(samples.len());
        for (index, sample) in samples.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(index, "check cancelled");
                break;
            }

            let case = match runner::run(
                &self.executable,
                sample.input.as_bytes(),
                self.time_limit,
                &self.cancel,
            )
            .await
            {
                Ok(outcome) => CaseReport::judge(index, sample, outcome),
                Err(ProcessError::Cancelled) => {
                    warn!(index, "check cancelled");
                    break;
                }
                Err(e) => CaseReport::internal_error(index, &e),
            };

            if case.verdict == Verdict::Accepted {
                info!(index, verdict = %case.verdict, elapsed = ?case.elapsed, "sample done");
            } else {
                warn!(index, verdict = %case.verdict, detail = ?case.detail, "sample failed");
            }
            cases.push(case);
        }

        let mut report = CheckReport::new(contest.clone(), task.clone(), cases);
        report.skipped = samples.len() - report.cases.len();
        Ok(report)
    }
}

impl CaseReport {
    fn judge(index: usize, sample: &Sample, outcome: RunOutcome) -> Self {
        let (verdict, detail, mismatch) = if outcome.timed_out {
            (Verdict::TimeLimitExceeded, None, None)
        } else if !outcome.status.success() {
            let detail = match (outcome.status.code(), outcome.status.signal()) {
                (Some(code), _) => format!("exit code {code}"),
                (None, Some(signal)) => format!("killed by signal {signal}"),
                (None, None) => outcome.status.to_string(),
            };
            (Verdict::RuntimeError, Some(detail), None)
        } else if outcome.stdout == sample.output.as_bytes() {
            (Verdict::Accepted, None, None)
        } else {
            let mismatch = Mismatch {
                expected: sample.output.clone(),
                actual: String::from_utf8_lossy(&outcome.stdout).into_owned(),
            };
            (Verdict::WrongAnswer, None, Some(mismatch))
        };

        Self {
            index,
            verdict,
            elapsed: Some(outcome.elapsed),
            memory_kib: Some(outcome.peak_memory_kib),
            detail,
            mismatch,
        }
    }

    fn internal_error(index: usize, err: &ProcessError) -> Self {
        Self {
            index,
            verdict: Verdict::InternalError,
            elapsed: None,
            memory_kib: None,
            detail: Some(err.to_string()),
            mismatch: None,
        }
    }

    pub fn elapsed_label(&self) -> String {
        duration_label(self.elapsed)
    }

    pub fn memory_label(&self) -> String {
        memory_label(self.memory_kib)
    }
}

impl CheckReport {
    pub fn new(contest: ContestId, task: TaskId, cases: Vec<CaseReport>) -> Self {
        let max_elapsed = cases.iter().filter_map(|c| c.elapsed).max();
        let max_memory_kib = cases.iter().filter_map(|c| c.memory_kib).max();
        Self {
            contest,
            task,
            cases,
            max_elapsed,
            max_memory_kib,
            skipped: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.skipped == 0
    }

    pub fn accepted(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| c.verdict == Verdict::Accepted)
            .count()
    }

    pub fn all_accepted(&self) -> bool {
        self.is_complete() && !self.cases.is_empty() && self.accepted() == self.cases.len()
    }

    pub fn max_elapsed_label(&self) -> String {
        duration_label(self.max_elapsed)
    }

    pub fn max_memory_label(&self) -> String {
        memory_label(self.max_memory_kib)
    }
}

fn duration_label(d: Option<Duration>) -> String {
    d.map(|d| format!("{} ms", d.as_millis()))
        .unwrap_or_else(|| "-".to_string())
}

fn memory_label(kib: Option<u64>) -> String {
    kib.map(|kib| format!("{kib} KiB"))
        .unwrap_or_else(|| "-".to_string())
}

fn millis<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&(d.as_millis() as u64)),
        None => s.serialize_none(),
    }
}
