use crate::{
    error::FetchError,
    fetch::Fetcher,
    types::{ContestId, TaskId, TaskRef},
};
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::warn;

pub fn tasks_path(contest: &ContestId) -> String {
    format!("/contests/{contest}/tasks")
}

/// Fetch the contest's task table and list its tasks top to bottom.
pub async fn list_tasks(fetcher: &Fetcher, contest: &ContestId) -> Result<Vec<TaskRef>, FetchError> {
    let doc = fetcher.fetch(&tasks_path(contest)).await?;
    Ok(parse_task_list(&doc, contest))
}

pub fn parse_task_list(doc: &Html, contest: &ContestId) -> Vec<TaskRef> {
    let rows = Selector::parse("table tr").expect("static selector");
    let cells = Selector::parse("td").expect("static selector");
    let anchor = Selector::parse("a").expect("static selector");

    let mut seen = HashSet::new();
    let mut tasks = vec![];
    for row in doc.select(&rows) {
        let mut row_cells = row.select(&cells);
        let label = row_cells
            .next()
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .filter(|label| !label.is_empty());

        let path = row_cells
            .flat_map(|cell| cell.select(&anchor))
            .find_map(|a| a.value().attr("href"))
            .map(str::trim)
            .unwrap_or_default();
        if path.is_empty() {
            continue;
        }

        let Some(id) = derive_task_id(contest, label.as_deref(), path) else {
            warn!(%path, "cannot derive a task id, skipping row");
            continue;
        };
        if !seen.insert(id.clone()) {
            warn!(task = %id, %path, "duplicate task id, skipping row");
            continue;
        }

        tasks.push(TaskRef {
            id,
            label,
            path: path.to_string(),
        });
    }

    tasks
}

/// `abc059_b` listed under `abc059` is task `b`. Tasks borrowed from another
/// contest (`arc072_a` under `abc059`) fall back to the row label.
fn derive_task_id(contest: &ContestId, label: Option<&str>, path: &str) -> Option<TaskId> {
    let slug = path.trim_end_matches('/').rsplit('/').next()?;
    let own_prefix = format!("{contest}_");

    slug.strip_prefix(&own_prefix)
        .and_then(|id| id.parse().ok())
        .or_else(|| label.and_then(|l| l.to_lowercase().parse().ok()))
        .or_else(|| slug.rsplit('_').next().and_then(|id| id.parse().ok()))
        .or_else(|| slug.parse().ok())
}
