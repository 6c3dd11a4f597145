#![allow(dead_code)]

#[path = "../../src/testing.rs"]
mod testing;

pub use testing::script;

use judge_sample::{Archive, Fetcher, Harvester, HarvesterBuilder, LabelSet};
use std::{fs, path::Path, time::Duration};
use tokio_util::sync::CancellationToken;

pub fn fixture(name: &str) -> String {
    fs::read_to_string(Path::new("fixtures").join(name)).unwrap()
}

pub fn harvester(base_url: &str, root: &Path) -> Harvester {
    harvester_with(base_url, root, 2)
}

pub fn harvester_with(base_url: &str, root: &Path, concurrency: usize) -> Harvester {
    HarvesterBuilder::default()
        .fetcher(Fetcher::new(base_url, Duration::from_secs(5), CancellationToken::new()).unwrap())
        .archive(Archive::new(root))
        .labels(LabelSet::default())
        .concurrency(concurrency)
        .build()
        .unwrap()
}

pub fn task_page(samples: &[(&str, &str)]) -> String {
    let sections = samples
        .iter()
        .enumerate()
        .map(|(i, (input, output))| {
            format!(
                "<div class=\"part\"><section><h3>入力例 {n}</h3><pre>{input}</pre></section></div>\n\
                 <div class=\"part\"><section><h3>出力例 {n}</h3><pre>{output}</pre></section></div>\n",
                n = i + 1
            )
        })
        .collect::<String>();
    format!("<html><body><div id=\"task-statement\">{sections}</div></body></html>")
}

pub fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
