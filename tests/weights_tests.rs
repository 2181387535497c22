use std::{fs, path::PathBuf};

use sysu_grader::{GradingError, WeightTable};
use uuid::Uuid;

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("sysu-grader-weights-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

#[test]
fn one_token_lines_get_the_default_weight() {
    let table = WeightTable::parse("000_main\n001_add 2.5\n").expect("valid table");

    let entries: Vec<_> = table.iter().map(|e| (e.case_id.as_str(), e.weight)).collect();
    assert_eq!(entries, [("000_main", 1.0), ("001_add", 2.5)]);
}

#[test]
fn blank_and_overlong_lines_are_skipped() {
    let table =
        WeightTable::parse("\n   \na 1 extra\n\tb   3\nc\n").expect("lenient table parses");

    let ids: Vec<_> = table.iter().map(|e| e.case_id.clone()).collect();
    assert_eq!(ids, ["b", "c"]);
    assert_eq!(table.weight_of("b"), Some(3.0));
    assert_eq!(table.weight_of("a"), None);
}

#[test]
fn duplicate_case_keeps_its_position_and_takes_the_last_weight() {
    let table = WeightTable::parse("a 1\nb 2\na 5\n").expect("valid table");

    let entries: Vec<_> = table.iter().map(|e| (e.case_id.as_str(), e.weight)).collect();
    assert_eq!(entries, [("a", 5.0), ("b", 2.0)]);
    assert_eq!(table.len(), 2);
}

#[test]
fn non_numeric_weight_is_a_config_error() {
    let root = temp_root();
    let path = root.join("weights.txt");
    fs::write(&path, "a 1\nb heavy\n").expect("write weights");

    match WeightTable::load(&path) {
        Err(GradingError::ConfigFormat { line, weight, .. }) => {
            assert_eq!(line, 2);
            assert_eq!(weight, "heavy");
        }
        other => panic!("expected a config format error, got {other:?}"),
    }

    let _ = fs::remove_dir_all(root);
}

#[test]
fn missing_table_is_path_not_found() {
    let root = temp_root();
    let path = root.join("nope.txt");

    assert!(matches!(
        WeightTable::load(&path),
        Err(GradingError::PathNotFound(p)) if p == path
    ));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn empty_table_has_no_cases() {
    let table = WeightTable::parse("").expect("empty table parses");
    assert!(table.is_empty());
    assert_eq!((&table).into_iter().count(), 0);
}
