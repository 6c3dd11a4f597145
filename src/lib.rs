#[cfg(not(unix))]
compile_error!("judge-sample measures solution runs with wait4 and only builds on Unix");

pub mod archive;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod harvest;
pub mod report;
pub mod runner;
pub mod tasks;
pub mod types;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use archive::Archive;
pub use extract::{extract_samples, LabelPreset, LabelSet};
pub use fetch::Fetcher;
pub use harvest::{HarvestReport, Harvester, HarvesterBuilder, TaskOutcome};
pub use report::{OutputFormat, Render};
pub use tasks::list_tasks;
pub use types::{ContestId, Sample, SampleKind, TaskId, TaskRef};
pub use verify::{CheckReport, Verdict, Verifier, VerifierBuilder};
