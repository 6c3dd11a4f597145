use crate::{
    archive::{Archive, DEFAULT_SAMPLE_DIR},
    error::FetchError,
    extract::{LabelPreset, LabelSet},
    fetch::{Fetcher, DEFAULT_BASE_URL},
    harvest::{Harvester, HarvesterBuilder, DEFAULT_CONCURRENCY, MAX_CONCURRENCY},
    report::OutputFormat,
    verify::{Verifier, VerifierBuilder, DEFAULT_EXECUTABLE},
};
use anyhow::Result;
use clap::Args;
use std::{path::PathBuf, time::Duration};
use tokio_util::sync::CancellationToken;

/// Options shared by every subcommand. Each one can also come from the
/// environment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Judge site root
    #[arg(long, env = "JUDGE_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Directory holding archived samples
    #[arg(long, env = "JUDGE_SAMPLE_DIR", default_value = DEFAULT_SAMPLE_DIR, global = true)]
    pub sample_dir: PathBuf,

    /// Statement language whose sample headings are matched (ja, en)
    #[arg(long, env = "JUDGE_LABELS", default_value = "ja", global = true)]
    pub labels: LabelPreset,

    /// Custom heading prefix for sample inputs
    #[arg(long, requires = "output_label", global = true)]
    pub input_label: Option<String>,

    /// Custom heading prefix for sample outputs
    #[arg(long, requires = "input_label", global = true)]
    pub output_label: Option<String>,

    /// Task pages downloaded at the same time
    #[arg(long, env = "JUDGE_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY,
          value_parser = parse_concurrency, global = true)]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "JUDGE_REQUEST_TIMEOUT", default_value = "30",
          value_parser = parse_seconds, global = true)]
    pub request_timeout: Duration,

    /// Report format (text, json)
    #[arg(long, env = "JUDGE_FORMAT", default_value = "text", global = true)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct CheckSettings {
    /// Pre-built solution executable, run without arguments
    #[arg(long, env = "JUDGE_EXEC", default_value = DEFAULT_EXECUTABLE)]
    pub exec: PathBuf,

    /// Seconds a single sample run may take before it is killed
    #[arg(long, env = "JUDGE_TIME_LIMIT", default_value = "2", value_parser = parse_seconds)]
    pub time_limit: Duration,
}

impl Settings {
    pub fn label_set(&self) -> LabelSet {
        match (&self.input_label, &self.output_label) {
            (Some(input), Some(output)) => LabelSet::new(input, output),
            _ => self.labels.into(),
        }
    }

    pub fn archive(&self) -> Archive {
        Archive::new(&self.sample_dir)
    }

    pub fn fetcher(&self, cancel: CancellationToken) -> Result<Fetcher, FetchError> {
        Fetcher::new(&self.base_url, self.request_timeout, cancel)
    }

    pub fn harvester(&self, cancel: CancellationToken) -> Result<Harvester> {
        Ok(HarvesterBuilder::default()
            .fetcher(self.fetcher(cancel)?)
            .archive(self.archive())
            .labels(self.label_set())
            .concurrency(self.concurrency)
            .build()?)
    }

    pub fn verifier(&self, check: &CheckSettings, cancel: CancellationToken) -> Result<Verifier> {
        Ok(VerifierBuilder::default()
            .archive(self.archive())
            .executable(check.exec.clone())
            .time_limit(check.time_limit)
            .cancel(cancel)
            .build()?)
    }
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("{s:?} is not a number of seconds"))?;
    if secs <= 0.0 {
        return Err(format!("{s:?} must be a positive number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{s:?}: {e}"))
}

fn parse_concurrency(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("{s:?} is not a whole number"))?;
    if (1..=MAX_CONCURRENCY).contains(&n) {
        Ok(n)
    } else {
        Err(format!("{n} is outside 1..={MAX_CONCURRENCY}"))
    }
}
