//! CLI tests for `survey init`, `validate`, `generate-sets` and `run`.
//!
//! Spawns the survey binary in a temporary directory and checks exit codes.

use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use survey::exit_codes;
use survey::io::catalog::load_catalog;
use survey::io::config::{SurveyConfig, load_config};
use survey::test_support::{TestWorkspace, catalog_with_sets};

fn survey(workspace: &TestWorkspace) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_survey"));
    command.current_dir(workspace.path());
    command
}

#[test]
fn init_writes_default_config() {
    let workspace = TestWorkspace::new().expect("workspace");
    let status = survey(&workspace)
        .arg("init")
        .status()
        .expect("survey init");

    assert_eq!(status.code(), Some(exit_codes::OK));
    let cfg = load_config(&workspace.path().join("survey.toml")).expect("load config");
    assert_eq!(cfg, SurveyConfig::default());
}

#[test]
fn validate_accepts_well_formed_sets() {
    let workspace = TestWorkspace::new().expect("workspace");
    workspace
        .write_sets(&catalog_with_sets(&[("set1", 3), ("set2", 2)]))
        .expect("write sets");

    let output = survey(&workspace)
        .arg("validate")
        .output()
        .expect("survey validate");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("set1: 3 questions"), "{stdout}");
}

#[test]
fn validate_rejects_duplicate_question_indexes() {
    let workspace = TestWorkspace::new().expect("workspace");
    let raw = r#"{"set1": {"questions": [
        {"questionIndex": 1, "refAudio": "r.wav", "method1Audio": "a.wav", "method2Audio": "b.wav"},
        {"questionIndex": 1, "refAudio": "r.wav", "method1Audio": "a.wav", "method2Audio": "b.wav"}
    ]}}"#;
    fs::create_dir_all(workspace.path().join("config")).expect("config dir");
    fs::write(workspace.path().join("config/sets.json"), raw).expect("write sets");

    let status = survey(&workspace)
        .arg("validate")
        .status()
        .expect("survey validate");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn validate_fails_when_sets_missing() {
    let workspace = TestWorkspace::new().expect("workspace");
    let status = survey(&workspace)
        .args(["validate", "--sets", "nowhere.json"])
        .status()
        .expect("survey validate");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn generate_sets_is_reproducible_with_seed() {
    let workspace = TestWorkspace::new().expect("workspace");
    for out in ["a.json", "b.json"] {
        let status = survey(&workspace)
            .args(["generate-sets", "--seed", "42", "--out", out])
            .status()
            .expect("survey generate-sets");
        assert_eq!(status.code(), Some(exit_codes::OK));
    }

    let first = fs::read_to_string(workspace.path().join("a.json")).expect("read a");
    let second = fs::read_to_string(workspace.path().join("b.json")).expect("read b");
    assert_eq!(first, second);

    let path = workspace.path().join("a.json");
    let catalog =
        load_catalog(path.to_str().expect("utf8"), Duration::from_secs(1)).expect("load");
    assert_eq!(catalog.len(), 25);
    assert_eq!(catalog.load("set1").expect("set1").len(), 32);
}

#[test]
fn run_without_endpoint_is_invalid() {
    let workspace = TestWorkspace::new().expect("workspace");
    workspace
        .write_sets(&catalog_with_sets(&[("set1", 1)]))
        .expect("write sets");

    let status = survey(&workspace)
        .args(["run", "--name", "Aki", "--set", "set1"])
        .stdin(Stdio::null())
        .status()
        .expect("survey run");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn run_quit_before_submitting_exits_not_submitted() {
    let workspace = TestWorkspace::new().expect("workspace");
    workspace
        .write_sets(&catalog_with_sets(&[("set1", 2)]))
        .expect("write sets");
    let cfg = SurveyConfig {
        endpoint_url: "http://127.0.0.1:9/collect".to_string(),
        ..SurveyConfig::default()
    };
    workspace.write_config(&cfg).expect("write config");

    let mut child = survey(&workspace)
        .args(["run", "--name", "Aki", "--set", "set1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn survey run");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"a 1\nb 2\nn\nq\n")
        .expect("write script");
    let output = child.wait_with_output().expect("survey run");

    assert_eq!(output.status.code(), Some(exit_codes::NOT_SUBMITTED));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("== Question 2 / 2 =="), "{stdout}");
}
