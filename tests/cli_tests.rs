use regex::Regex;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
    config_path: PathBuf,
    elements_path: PathBuf,
}

impl TestContext {
    fn new(config: Value) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = dir.path().join("config.json");
        let elements_path = dir.path().join("elements.tsv");
        fs::write(&config_path, config.to_string()).unwrap();
        fs::write(&elements_path, "甲\tX Y\t3\n乙\tY X\t2\n丙\tX X\t1\n").unwrap();
        Self {
            dir,
            config_path,
            elements_path,
        }
    }

    fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_mapforge"))
            .args(args)
            .arg("--config")
            .arg(&self.config_path)
            .arg("--elements")
            .arg(&self.elements_path)
            .output()
            .expect("Failed to run mapforge")
    }
}

fn tiny_config() -> Value {
    json!({
        "form": { "alphabet": "ab", "mapping": { "X": "a", "Y": "a" } },
        "encoder": { "max_length": 2 },
        "objective": { "characters_full": { "duplication": 1.0 } },
        "solver": {
            "algorithm": "simulated_annealing",
            "t_max": 1.0,
            "t_min": 0.01,
            "steps": 200
        }
    })
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_search_writes_results() {
    let ctx = TestContext::new(tiny_config());
    let out = ctx.output_dir();
    let output = ctx.run(&["search", "-S", "7", "-o", out.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let result = read_json(&out.join("result.json"));
    let run_id = result["run_id"].as_str().unwrap();
    assert!(Regex::new(r"^[0-9a-f]{64}$").unwrap().is_match(run_id));
    assert_eq!(result["score"].as_f64(), Some(0.0));

    let codes = fs::read_to_string(out.join("codes.tsv")).unwrap();
    assert_eq!(codes.lines().count(), 3);
    assert!(codes.lines().next().unwrap().starts_with("甲\t"));

    // the written config carries the best mapping and loads again
    let updated = read_json(&out.join("config.json"));
    assert_ne!(updated["form"]["mapping"]["X"], updated["form"]["mapping"]["Y"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FINAL RESULT"));
    assert!(stdout.contains(run_id));
}

#[test]
fn test_same_seed_same_run_id_and_result() {
    let ctx = TestContext::new(tiny_config());
    let first = ctx.dir.path().join("first");
    let second = ctx.dir.path().join("second");
    for out in [&first, &second] {
        let output = ctx.run(&["search", "--seed", "11", "--output", out.to_str().unwrap()]);
        assert!(output.status.success());
    }
    let (a, b) = (read_json(&first.join("result.json")), read_json(&second.join("result.json")));
    assert_eq!(a["run_id"], b["run_id"]);
    assert_eq!(a["mapping"], b["mapping"]);
    assert_eq!(a["score"], b["score"]);
}

#[test]
fn test_evaluate_prints_score_and_codes() {
    let ctx = TestContext::new(tiny_config());
    let output = ctx.run(&["evaluate", "--top", "2"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Score: 0.500000"), "stdout: {}", stdout);
    assert!(stdout.contains("characters_full"));
    assert!(stdout.contains("... 1 more"));
    assert!(!ctx.output_dir().exists());
}

#[test]
fn test_setup_errors_exit_with_two() {
    let mut config = tiny_config();
    config["form"]["alphabet"] = json!("");
    let ctx = TestContext::new(config);
    let output = ctx.run(&["evaluate"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Configuration Error"));
}

#[test]
fn test_unknown_element_in_corpus_is_rejected() {
    let ctx = TestContext::new(tiny_config());
    fs::write(&ctx.elements_path, "甲\tX Q\t3\n").unwrap();
    let output = ctx.run(&["evaluate"]);
    assert_eq!(output.status.code(), Some(2));
}
