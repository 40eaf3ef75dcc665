use std::collections::BTreeSet;
use std::path::Path;

use localflow::workflow::registry::{ensure_ids, WorkflowRegistry};
use localflow_test_utils::init_tracing;

const BASIC_WORKFLOW: &str = r#"
name: Data Pipeline
version: 2.1.0
tags: [etl, daily]
jobs:
  ingest:
    steps:
      - run: echo ingest
  transform:
    steps:
      - run: echo transform
"#;

fn write_workflow(dir: &Path, file: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_ids_are_injected_and_persisted() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_workflow(dir.path(), "pipeline.yml", BASIC_WORKFLOW);

    ensure_ids(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();

    let wf_id = doc["id"].as_str().unwrap();
    assert!(wf_id.starts_with("wf_"));
    assert_eq!(wf_id.len(), "wf_".len() + 8);

    let ingest_id = doc["jobs"]["ingest"]["id"].as_str().unwrap();
    assert!(ingest_id.starts_with("job_"));
    assert_ne!(ingest_id, doc["jobs"]["transform"]["id"].as_str().unwrap());
}

#[test]
fn test_ids_are_stable_across_rediscovery() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_workflow(dir.path(), "pipeline.yml", BASIC_WORKFLOW);

    ensure_ids(&path).unwrap();
    let first = std::fs::read_to_string(&path).unwrap();

    ensure_ids(&path).unwrap();
    let second = std::fs::read_to_string(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_existing_ids_are_never_rederived() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_workflow(
        dir.path(),
        "pinned.yml",
        "id: wf_pinned\njobs:\n  only:\n    steps:\n      - run: echo hi\n",
    );

    ensure_ids(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
    assert_eq!(doc["id"].as_str(), Some("wf_pinned"));
}

#[test]
fn test_discovery_parses_workflows() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_workflow(dir.path(), "pipeline.yml", BASIC_WORKFLOW);

    let mut registry = WorkflowRegistry::new();
    registry.discover(&[dir.path().to_path_buf()]);

    let workflows = registry.find(None);
    assert_eq!(workflows.len(), 1);

    let wf = workflows[0];
    assert_eq!(wf.name, "Data Pipeline");
    assert_eq!(wf.version, "2.1.0");
    assert_eq!(wf.jobs.len(), 2);
    assert!(registry.get(&wf.id).is_some());
}

#[test]
fn test_earlier_directory_wins_on_id_collision() {
    init_tracing();
    let local = tempfile::tempdir().unwrap();
    let global = tempfile::tempdir().unwrap();

    let content = |name: &str| {
        format!(
            "id: wf_shared\nname: {name}\njobs:\n  only:\n    id: job_only\n    steps:\n      - run: echo hi\n"
        )
    };
    write_workflow(local.path(), "wf.yml", &content("Local Copy"));
    write_workflow(global.path(), "wf.yml", &content("Global Copy"));

    let mut registry = WorkflowRegistry::new();
    registry.discover(&[local.path().to_path_buf(), global.path().to_path_buf()]);

    assert_eq!(registry.get("wf_shared").unwrap().name, "Local Copy");
}

#[test]
fn test_broken_file_does_not_hide_others() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_workflow(dir.path(), "broken.yml", "jobs: [not, a, mapping]");
    write_workflow(dir.path(), "good.yml", BASIC_WORKFLOW);
    write_workflow(dir.path(), "ignored.txt", BASIC_WORKFLOW);

    let mut registry = WorkflowRegistry::new();
    registry.discover(&[dir.path().to_path_buf()]);

    assert_eq!(registry.find(None).len(), 1);
}

#[test]
fn test_find_filters_by_tags() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_workflow(dir.path(), "etl.yml", BASIC_WORKFLOW);
    write_workflow(
        dir.path(),
        "other.yml",
        "name: Backup\ntags: [nightly]\njobs:\n  only:\n    steps:\n      - run: echo hi\n",
    );

    let mut registry = WorkflowRegistry::new();
    registry.discover(&[dir.path().to_path_buf()]);

    let tags: BTreeSet<String> = ["etl".to_string()].into_iter().collect();
    let matches = registry.find(Some(&tags));
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "Data Pipeline");

    let tags: BTreeSet<String> = ["etl".to_string(), "weekly".to_string()]
        .into_iter()
        .collect();
    assert!(registry.find(Some(&tags)).is_empty());
}

#[test]
fn test_resolve_by_normalized_name() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_workflow(dir.path(), "pipeline.yml", BASIC_WORKFLOW);

    let mut registry = WorkflowRegistry::new();
    registry.discover(&[dir.path().to_path_buf()]);

    let wf = registry.resolve("data_pipeline").expect("resolved by name");
    assert_eq!(wf.name, "Data Pipeline");
    assert!(registry.resolve(&wf.id).is_some());
    assert!(registry.resolve("no_such_workflow").is_none());
}

#[test]
fn test_validation_reports_unknown_references() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_workflow(
        dir.path(),
        "bad.yml",
        "name: Bad\njobs:\n  a:\n    needs: [job_missing]\n    steps:\n      - run: echo hi\n",
    );

    ensure_ids(&path).unwrap();
    let workflow = localflow::workflow::model::Workflow::from_path(&path).unwrap();
    let errors = workflow.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("job_missing"));
}

#[test]
fn test_validation_parses_condition_references() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    // No declared reference list, so the expression itself is parsed.
    let path = write_workflow(
        dir.path(),
        "cond.yml",
        concat!(
            "name: Cond\n",
            "jobs:\n",
            "  a:\n",
            "    id: job_a\n",
            "    steps:\n",
            "      - run: echo a\n",
            "  b:\n",
            "    id: job_b\n",
            "    condition: \"job_a and job_ghost\"\n",
            "    steps:\n",
            "      - run: echo b\n",
        ),
    );

    ensure_ids(&path).unwrap();
    let workflow = localflow::workflow::model::Workflow::from_path(&path).unwrap();
    let errors = workflow.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("job_ghost"));
}

#[test]
fn test_validation_accepts_known_condition_references() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_workflow(
        dir.path(),
        "cond_ok.yml",
        concat!(
            "name: CondOk\n",
            "jobs:\n",
            "  a:\n",
            "    id: job_a\n",
            "    steps:\n",
            "      - run: echo a\n",
            "  b:\n",
            "    id: job_b\n",
            "    condition: \"not job_a\"\n",
            "    steps:\n",
            "      - run: echo b\n",
        ),
    );

    ensure_ids(&path).unwrap();
    let workflow = localflow::workflow::model::Workflow::from_path(&path).unwrap();
    assert!(workflow.validate().is_empty());
}

#[test]
fn test_empty_workflow_fails_validation() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_workflow(dir.path(), "empty.yml", "name: Empty\n");

    ensure_ids(&path).unwrap();
    let workflow = localflow::workflow::model::Workflow::from_path(&path).unwrap();
    let errors = workflow.validate();
    assert_eq!(errors, vec!["Workflow must contain at least one job"]);
}
