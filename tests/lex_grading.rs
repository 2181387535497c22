use std::{fs, path::PathBuf};

use sysu_grader::{
    CaseError, Comparator, LogRouter, Orchestrator, TokenStreamComparator, Verbosity,
};
use uuid::Uuid;

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("sysu-grader-lex-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

fn dump(tokens: &[(&str, &str, &str, &str)]) -> String {
    tokens
        .iter()
        .map(|(kind, value, flags, loc)| format!("{kind} '{value}'\t {flags}\tLoc=<{loc}>\n"))
        .collect()
}

fn reference_dump() -> String {
    dump(&[
        ("int", "int", "[StartOfLine]", "main.c:1:1"),
        ("identifier", "main", "[LeadingSpace]", "main.c:1:5"),
        ("l_paren", "(", "", "main.c:1:9"),
        ("r_paren", ")", "", "main.c:1:10"),
        ("l_brace", "{", "[LeadingSpace]", "main.c:1:12"),
        ("return", "return", "[StartOfLine] [LeadingSpace]", "main.c:2:3"),
        ("numeric_constant", "0", "[LeadingSpace]", "main.c:2:10"),
        ("semi", ";", "", "main.c:2:11"),
        ("r_brace", "}", "[StartOfLine]", "main.c:3:1"),
        ("eof", "", "", "main.c:3:2"),
    ])
}

fn write_case(root: &PathBuf, case: &str, reference: Option<&str>, candidate: Option<&str>) {
    let dir = root.join(case);
    fs::create_dir_all(&dir).expect("create case dir");
    if let Some(reference) = reference {
        fs::write(dir.join("answer.txt"), reference).expect("write answer.txt");
    }
    if let Some(candidate) = candidate {
        fs::write(dir.join("output.txt"), candidate).expect("write output.txt");
    }
}

#[tokio::test]
async fn identical_dumps_score_one_hundred() {
    let root = temp_root();
    let dump = reference_dump();
    write_case(&root, "000", Some(&dump), Some(&dump));

    let verdict = TokenStreamComparator::new(Verbosity::MAX)
        .compare(&root.join("000"))
        .await
        .expect("dumps compare");
    assert_eq!(verdict.score, 100.0);
    assert_eq!(verdict.outcome, "graded");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn tiers_are_cumulative() {
    let reference = reference_dump();
    // Every token right except: line 3 wrong kind, line 5 wrong location,
    // line 8 wrong whitespace.
    let candidate = reference
        .lines()
        .enumerate()
        .map(|(idx, line)| match idx + 1 {
            3 => line.replacen("l_paren", "r_paren", 1),
            5 => line.replace("main.c:1:12", "main.c:1:13"),
            8 => line.replace("\t \t", "\t [LeadingSpace]\t"),
            _ => line.to_owned(),
        })
        .fold(String::new(), |mut acc, line| {
            acc.push_str(&line);
            acc.push('\n');
            acc
        });

    let tally = TokenStreamComparator::new(Verbosity::MIN)
        .tally(&reference, &candidate)
        .expect("same number of tokens");

    assert_eq!(tally.total, 10);
    assert_eq!(tally.kind_value, 9);
    assert_eq!(tally.location, 8);
    assert_eq!(tally.whitespace, 7);
    // (6 * 9 + 3 * 8 + 7) * 10 / 10
    assert_eq!(tally.score(), 85.0);
}

#[test]
fn malformed_candidate_line_counts_for_nothing() {
    let reference = reference_dump();
    let candidate = reference.replacen("Loc=<main.c:1:1>", "", 1);

    let tally = TokenStreamComparator::default()
        .tally(&reference, &candidate)
        .expect("same number of tokens");
    assert_eq!(tally.kind_value, 9);
    assert_eq!(tally.location, 9);
    assert_eq!(tally.whitespace, 9);
}

#[test]
fn different_token_counts_score_zero() {
    let reference = reference_dump();
    let candidate: String = reference.lines().take(7).map(|l| format!("{l}\n")).collect();

    let err = TokenStreamComparator::default()
        .tally(&reference, &candidate)
        .expect_err("counts differ");
    assert!(matches!(err, CaseError::TokenCountMismatch {
        reference: 10,
        candidate: 7
    }));
    assert_eq!(err.outcome(), "token count mismatch");
}

#[tokio::test]
async fn missing_dumps_are_reported_per_side() {
    let root = temp_root();
    write_case(&root, "no-answer", None, Some("x"));
    write_case(&root, "no-output", Some("x"), None);
    let comparator = TokenStreamComparator::default();

    let err = comparator
        .compare(&root.join("no-answer"))
        .await
        .expect_err("answer.txt is missing");
    assert_eq!(err.outcome(), "reference not generated");

    let err = comparator
        .compare(&root.join("no-output"))
        .await
        .expect_err("output.txt is missing");
    assert_eq!(err.outcome(), "candidate not generated");

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn run_folds_case_scores_by_weight() {
    let root = temp_root();
    let dump = reference_dump();
    write_case(&root, "a", Some(&dump), None);
    write_case(&root, "b", Some(&dump), Some(&dump));
    let weights = root.join("weights.txt");
    fs::write(&weights, "a 1\nb 3\n").expect("write weights");

    let router = LogRouter::new(&root.join("score.txt")).expect("aggregate log");
    let _default = tracing::subscriber::set_default(router.subscriber());
    let mut orchestrator =
        Orchestrator::new(TokenStreamComparator::new(Verbosity::MAX), &root, router);

    let total = orchestrator.run(&weights).await.expect("run succeeds");
    assert_eq!(total, 75.0);

    let reports = orchestrator.finish().expect("reports written");
    let cases: Vec<_> = reports
        .test_reports()
        .iter()
        .map(|t| (t.name.as_str(), t.score, t.outcome_label.as_str()))
        .collect();
    assert_eq!(cases, [("a", 0.0, "candidate not generated"), ("b", 100.0, "graded")]);
    assert_eq!(reports.leaderboard()[0].name, "总分");
    assert_eq!(reports.leaderboard()[0].value, 75.0);

    let case_log = fs::read_to_string(root.join("a").join("score.txt")).expect("case log");
    assert!(case_log.contains("case: a"));
    assert!(!case_log.contains("case: b"));
    assert!(
        fs::read_to_string(root.join("score.txt"))
            .expect("aggregate log")
            .contains("总分:")
    );
    assert!(root.join("report.json").is_file());
    assert!(root.join("report.txt").is_file());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn unit_weights_average_plainly() {
    let root = temp_root();
    let dump = reference_dump();
    write_case(&root, "a", Some(&dump), Some(&dump));
    write_case(&root, "b", Some(&dump), Some(&dump));
    let weights = root.join("weights.txt");
    fs::write(&weights, "a\nb 2.0\n").expect("write weights");

    let router = LogRouter::new(&root.join("score.txt")).expect("aggregate log");
    let mut orchestrator = Orchestrator::new(TokenStreamComparator::default(), &root, router);

    assert_eq!(orchestrator.run(&weights).await.expect("run succeeds"), 100.0);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn case_without_a_directory_scores_zero_without_a_log() {
    let root = temp_root();
    let weights = root.join("weights.txt");
    fs::write(&weights, "ghost\n").expect("write weights");

    let router = LogRouter::new(&root.join("score.txt")).expect("aggregate log");
    let mut orchestrator = Orchestrator::new(TokenStreamComparator::default(), &root, router);

    assert_eq!(orchestrator.run(&weights).await.expect("run succeeds"), 0.0);
    let report = &orchestrator.reports().test_reports()[0];
    assert_eq!(report.outcome_label, "reference not generated");
    assert_eq!(report.detail_path, None);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn missing_case_root_fails_the_run() {
    let root = temp_root();
    let weights = root.join("weights.txt");
    fs::write(&weights, "a\n").expect("write weights");

    let mut orchestrator = Orchestrator::new(
        TokenStreamComparator::default(),
        root.join("absent"),
        LogRouter::console_only(),
    );

    assert!(orchestrator.run(&weights).await.is_err());
    assert!(orchestrator.reports().test_reports().is_empty());

    let _ = fs::remove_dir_all(root);
}
