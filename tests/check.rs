mod common;

use common::script;
use judge_sample::{
    Archive, ContestId, OutputFormat, Render, SampleKind, TaskId, Verdict, VerifierBuilder,
};
use std::time::Duration;

fn archive_abc059_b(root: &std::path::Path) -> (Archive, ContestId, TaskId) {
    let archive = Archive::new(root.join("sample"));
    let contest: ContestId = "abc059".parse().unwrap();
    let task: TaskId = "b".parse().unwrap();
    archive
        .write("3\n", 0, &contest, &task, SampleKind::Input)
        .unwrap();
    archive
        .write("9", 0, &contest, &task, SampleKind::Output)
        .unwrap();
    (archive, contest, task)
}

#[tokio::test]
async fn check_should_accept_matching_output() {
    let tmp = tempfile::tempdir().unwrap();
    let (archive, contest, task) = archive_abc059_b(tmp.path());
    let exec = script(tmp.path(), "main", "read n\nprintf '%s' $((n * n))\n");

    let verifier = VerifierBuilder::default()
        .archive(archive)
        .executable(exec)
        .build()
        .unwrap();

    let report = verifier.check(&contest, &task).await.unwrap();
    assert_eq!(report.cases.len(), 1);
    assert_eq!(report.cases[0].verdict, Verdict::Accepted);
    assert!(report.all_accepted());

    let again = verifier.check(&contest, &task).await.unwrap();
    assert_eq!(again.cases[0].verdict, Verdict::Accepted);
}

#[tokio::test]
async fn check_should_print_both_outputs_on_wrong_answer() {
    let tmp = tempfile::tempdir().unwrap();
    let (archive, contest, task) = archive_abc059_b(tmp.path());
    let exec = script(tmp.path(), "main", "printf 8\n");

    let verifier = VerifierBuilder::default()
        .archive(archive)
        .executable(exec)
        .build()
        .unwrap();

    let report = verifier.check(&contest, &task).await.unwrap();
    assert_eq!(report.cases[0].verdict, Verdict::WrongAnswer);

    let text = report.render(OutputFormat::Text).unwrap();
    assert!(text.contains("sample 0: WA"));
    assert!(text.contains("--- expected\n9\n--- actual\n8\n"));
    assert!(text.contains("0/1 accepted"));
}

#[tokio::test]
async fn check_should_flag_slow_and_crashing_solutions() {
    let tmp = tempfile::tempdir().unwrap();
    let (archive, contest, task) = archive_abc059_b(tmp.path());
    archive
        .write("4\n", 1, &contest, &task, SampleKind::Input)
        .unwrap();
    archive
        .write("16", 1, &contest, &task, SampleKind::Output)
        .unwrap();
    let exec = script(
        tmp.path(),
        "main",
        "read n\nif [ \"$n\" = 3 ]; then exec sleep 30; fi\nexit 1\n",
    );

    let verifier = VerifierBuilder::default()
        .archive(archive)
        .executable(exec)
        .time_limit(Duration::from_millis(300))
        .build()
        .unwrap();

    let report = verifier.check(&contest, &task).await.unwrap();
    let verdicts = report.cases.iter().map(|c| c.verdict).collect::<Vec<_>>();
    assert_eq!(
        verdicts,
        [Verdict::TimeLimitExceeded, Verdict::RuntimeError]
    );
    assert!(report.max_elapsed.unwrap() >= Duration::from_millis(300));
}
