use std::path::{Path, PathBuf};

use localflow::events::trigger::FileSnapshot;
use localflow::workflow::model::EventTrigger;

fn snapshot(path: &str, size: u64) -> FileSnapshot {
    FileSnapshot {
        path: PathBuf::from(path),
        size: Some(size),
        owner: Some("alice".to_string()),
        group: Some("staff".to_string()),
        ..FileSnapshot::default()
    }
}

#[test]
fn test_regex_pattern_with_size_bounds() {
    let trigger = EventTrigger {
        patterns: vec![r"data\d+\.csv".to_string()],
        min_size: Some(100),
        max_size: Some(1000),
        ..EventTrigger::default()
    };

    assert!(trigger.matches(&snapshot("/in/data42.csv", 500)));
    assert!(!trigger.matches(&snapshot("/in/data42.csv", 50)));
    assert!(!trigger.matches(&snapshot("/in/data42.csv", 5000)));
    assert!(!trigger.matches(&snapshot("/in/other.csv", 500)));
}

#[test]
fn test_invalid_regex_falls_back_to_glob() {
    // "*.csv" is not valid regex, so it is translated as a glob.
    let trigger = EventTrigger {
        patterns: vec!["*.csv".to_string()],
        ..EventTrigger::default()
    };

    assert!(trigger.matches(&snapshot("/in/report.csv", 10)));
    assert!(!trigger.matches(&snapshot("/in/report.txt", 10)));
}

#[test]
fn test_valid_regex_is_not_treated_as_glob() {
    // "log?.txt" is valid regex: optional 'g', then any single character,
    // then literal "txt". It must not match "log1.txt" the way the glob
    // reading would.
    let trigger = EventTrigger {
        patterns: vec!["log?.txt".to_string()],
        ..EventTrigger::default()
    };

    assert!(trigger.matches(&snapshot("/var/log1txt", 10)));
    assert!(trigger.matches(&snapshot("/var/lootxt", 10)));
    assert!(!trigger.matches(&snapshot("/var/log1.txt", 10)));
}

#[test]
fn test_question_mark_in_glob_fallback() {
    // The leading '*' makes this invalid regex, so the whole pattern is
    // translated as a glob where '?' matches exactly one character.
    let trigger = EventTrigger {
        patterns: vec!["*log?.txt".to_string()],
        ..EventTrigger::default()
    };

    assert!(trigger.matches(&snapshot("/var/mylog1.txt", 10)));
    assert!(!trigger.matches(&snapshot("/var/mylog12.txt", 10)));
}

#[test]
fn test_include_patterns_require_one_match() {
    let trigger = EventTrigger {
        include_patterns: vec!["*.csv".to_string(), "*.json".to_string()],
        ..EventTrigger::default()
    };

    assert!(trigger.matches(&snapshot("/in/a.csv", 10)));
    assert!(trigger.matches(&snapshot("/in/a.json", 10)));
    assert!(!trigger.matches(&snapshot("/in/a.txt", 10)));
}

#[test]
fn test_exclude_patterns_veto() {
    let trigger = EventTrigger {
        include_patterns: vec!["*.csv".to_string()],
        exclude_patterns: vec!["tmp_*".to_string()],
        ..EventTrigger::default()
    };

    assert!(trigger.matches(&snapshot("/in/a.csv", 10)));
    assert!(!trigger.matches(&snapshot("/in/tmp_a.csv", 10)));
}

#[test]
fn test_path_glob_matches_full_path() {
    let trigger = EventTrigger {
        include_patterns: vec!["/in/**/*.csv".to_string()],
        ..EventTrigger::default()
    };

    assert!(trigger.matches(&snapshot("/in/daily/a.csv", 10)));
    assert!(!trigger.matches(&snapshot("/out/daily/a.csv", 10)));
}

#[test]
fn test_owner_and_group_must_match_exactly() {
    let trigger = EventTrigger {
        owner: Some("alice".to_string()),
        ..EventTrigger::default()
    };
    assert!(trigger.matches(&snapshot("/in/a.csv", 10)));

    let trigger = EventTrigger {
        owner: Some("bob".to_string()),
        ..EventTrigger::default()
    };
    assert!(!trigger.matches(&snapshot("/in/a.csv", 10)));

    let trigger = EventTrigger {
        group: Some("wheel".to_string()),
        ..EventTrigger::default()
    };
    assert!(!trigger.matches(&snapshot("/in/a.csv", 10)));
}

#[test]
fn test_unconstrained_trigger_matches_everything() {
    let trigger = EventTrigger::default();
    assert!(trigger.matches(&snapshot("/anything/at/all", 0)));
    assert!(trigger.matches(&FileSnapshot::path_only(Path::new("/gone.csv"))));
}

#[test]
fn test_deleted_file_counts_as_zero_bytes() {
    // A deletion snapshot carries no size; min_size can therefore never
    // match it, while max_size always does.
    let snapshot = FileSnapshot::path_only(Path::new("/in/a.csv"));

    let trigger = EventTrigger {
        min_size: Some(1),
        ..EventTrigger::default()
    };
    assert!(!trigger.matches(&snapshot));

    let trigger = EventTrigger {
        max_size: Some(10),
        ..EventTrigger::default()
    };
    assert!(trigger.matches(&snapshot));
}

#[test]
fn test_deleted_file_has_no_owner_to_match() {
    let snapshot = FileSnapshot::path_only(Path::new("/in/a.csv"));
    let trigger = EventTrigger {
        owner: Some("alice".to_string()),
        ..EventTrigger::default()
    };
    assert!(!trigger.matches(&snapshot));
}
