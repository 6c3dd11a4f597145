use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use judge_sample::{
    config::{CheckSettings, Settings},
    ContestId, Render, TaskId,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "judge-sample", version, about = "AtCoder sample downloader and checker")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download the samples of every task in a contest
    #[command(alias = "d")]
    Download {
        /// Contest id, e.g. abc059
        contest: ContestId,
    },
    /// Run the solution against one task's downloaded samples
    #[command(visible_alias = "test", alias = "t")]
    Check {
        /// Contest id, e.g. abc059
        contest: ContestId,
        /// Task id, e.g. b
        task: TaskId,
        #[command(flatten)]
        check: CheckSettings,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let output = match &cli.command {
        Command::Download { contest } => {
            let harvester = cli.settings.harvester(cancel)?;
            harvester.harvest(contest).await?.render(cli.settings.format)?
        }
        Command::Check {
            contest,
            task,
            check,
        } => {
            let verifier = cli.settings.verifier(check, cancel)?;
            let report = verifier.check(contest, task).await?;
            let output = report.render(cli.settings.format)?;
            if !report.is_complete() {
                println!("{output}");
                bail!("check cancelled with {} sample(s) not run", report.skipped);
            }
            output
        }
    };

    println!("{output}");
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupted, stopping");
        cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("judge-sample").chain(args.iter().copied()))
    }

    #[test]
    fn positional_ids_should_be_required() {
        assert!(parse(&["download"]).is_err());
        assert!(parse(&["check", "abc059"]).is_err());
    }

    #[test]
    fn ids_should_be_validated_before_use() {
        assert!(parse(&["check", "../x", "b"]).is_err());
        assert!(parse(&["download", "abc/059"]).is_err());
    }

    #[test]
    fn short_aliases_should_pick_the_subcommand() {
        let cli = parse(&["d", "abc059"]).unwrap();
        assert!(matches!(cli.command, Command::Download { contest } if contest.as_str() == "abc059"));

        for alias in ["t", "test"] {
            let cli = parse(&[alias, "abc059", "b", "--time-limit", "0.5"]).unwrap();
            let Command::Check {
                contest,
                task,
                check,
            } = cli.command
            else {
                panic!("{alias} did not parse as check");
            };
            assert_eq!(contest.as_str(), "abc059");
            assert_eq!(task.as_str(), "b");
            assert_eq!(check.time_limit, std::time::Duration::from_millis(500));
        }
    }
}
