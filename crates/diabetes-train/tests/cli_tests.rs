//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn trainer(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_diabetes-train"))
        .args(args)
        .env_remove("TRAIN_DATA")
        .env_remove("ARTIFACT_DIR")
        .env_remove("TRAIN_SEED")
        .output()
        .expect("Failed to execute command")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp path is valid UTF-8")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "diabetes-train", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Diabetes Risk Model"), "Should show app name");
    assert!(stdout.contains("train"), "Should show train command");
    assert!(stdout.contains("generate"), "Should show generate command");
    assert!(stdout.contains("inspect"), "Should show inspect command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new("cargo")
        .args(["run", "-p", "diabetes-train", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("diabetes-train"), "Should show binary name");
}

/// Test train subcommand help
#[test]
fn test_train_help() {
    let output = trainer(&["train", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Train help should succeed");
    assert!(stdout.contains("--data"), "Should show data option");
    assert!(stdout.contains("--artifact-dir"), "Should show artifact-dir option");
    assert!(stdout.contains("--seed"), "Should show seed option");
    assert!(stdout.contains("TRAIN_DATA"), "Should show env fallback");
}

/// Test that train without a dataset fails
#[test]
fn test_train_requires_data() {
    let output = trainer(&["train"]);
    assert!(!output.status.success(), "Train without --data should fail");
}

/// Test that training on a file lacking required columns fails and writes nothing
#[test]
fn test_train_missing_columns_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("bad.csv");
    std::fs::write(&data, "Glucose,BMI,Diabetic\n120,30,1\n90,22,0\n").unwrap();
    let artifacts = dir.path().join("artifacts");

    let output = trainer(&[
        "train",
        "--data",
        path_arg(&data),
        "--artifact-dir",
        path_arg(&artifacts),
    ]);

    assert!(!output.status.success(), "Training on bad data should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Pregnancies"), "Should name the missing column");
    assert!(!artifacts.join("diabetes_model.json").exists());
    assert!(!artifacts.join("model_metadata.json").exists());
}

/// Test generate, train and inspect end to end
#[test]
fn test_generate_train_inspect() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data").join("diabetes.csv");
    let artifacts = dir.path().join("artifacts");

    let output = trainer(&["generate", "--rows", "300", "--seed", "7", "--output", path_arg(&data)]);
    assert!(output.status.success(), "Generate should succeed");
    let csv = std::fs::read_to_string(&data).unwrap();
    assert!(csv.starts_with("Pregnancies,Glucose,BloodPressure,BMI,Age,Diabetic"));
    assert_eq!(csv.lines().count(), 301);

    let output = trainer(&[
        "train",
        "--data",
        path_arg(&data),
        "--artifact-dir",
        path_arg(&artifacts),
        "--trees",
        "10",
        "--model-version",
        "v-cli",
        "--format",
        "json",
    ]);
    assert!(
        output.status.success(),
        "Train should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["metadata"]["model_version"], "v-cli");
    assert_eq!(summary["metadata"]["hyperparameters"]["n_estimators"], 10);
    assert!(artifacts.join("diabetes_model.json").exists());
    assert!(artifacts.join("model_metadata.json").exists());

    let output = trainer(&["inspect", "--artifact-dir", path_arg(&artifacts), "--format", "json"]);
    assert!(output.status.success(), "Inspect should succeed");
    let metadata: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(metadata["model_version"], "v-cli");
    assert_eq!(
        metadata["feature_order"],
        serde_json::json!(["Pregnancies", "Glucose", "BloodPressure", "BMI", "Age"])
    );
    assert!(metadata["validation_metrics"]["accuracy"].as_f64().unwrap() > 0.5);

    // Tampering with the model invalidates the checksum
    let model_path = artifacts.join("diabetes_model.json");
    let mut model = std::fs::read_to_string(&model_path).unwrap();
    model.push(' ');
    std::fs::write(&model_path, model).unwrap();

    let output = trainer(&["inspect", "--artifact-dir", path_arg(&artifacts)]);
    assert!(!output.status.success(), "Inspect should reject a tampered model");
}
