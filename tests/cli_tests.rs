//! Integration tests for the CLI application
//!
//! These tests verify that the CLI commands work correctly with real data files.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

/// Helper to create test data files
struct TestDataFiles {
    pub libsvm_file: NamedTempFile,
    pub test_libsvm_file: NamedTempFile,
    pub regression_file: NamedTempFile,
}

impl TestDataFiles {
    fn new() -> std::io::Result<Self> {
        // Create LibSVM training data
        let mut libsvm_file = NamedTempFile::new()?;
        writeln!(libsvm_file, "+1 1:2.0 2:1.0")?;
        writeln!(libsvm_file, "-1 1:-2.0 2:-1.0")?;
        writeln!(libsvm_file, "+1 1:1.5 2:0.8")?;
        writeln!(libsvm_file, "-1 1:-1.5 2:-0.8")?;
        writeln!(libsvm_file, "+1 1:1.8 2:0.9")?;
        writeln!(libsvm_file, "-1 1:-1.8 2:-0.9")?;
        libsvm_file.flush()?;

        // Create LibSVM test data
        let mut test_libsvm_file = NamedTempFile::new()?;
        writeln!(test_libsvm_file, "+1 1:1.6 2:0.7")?;
        writeln!(test_libsvm_file, "-1 1:-1.6 2:-0.7")?;
        test_libsvm_file.flush()?;

        // Real-valued targets on a line
        let mut regression_file = NamedTempFile::new()?;
        for i in 0..20 {
            let x = i as f64 / 4.0;
            writeln!(regression_file, "{} 1:{}", 0.5 * x - 1.25, x)?;
        }
        regression_file.flush()?;

        Ok(TestDataFiles {
            libsvm_file,
            test_libsvm_file,
            regression_file,
        })
    }
}

/// Get the path to the compiled CLI binary
fn get_cli_binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_kernlearn")
}

fn run(args: &[&str]) -> Output {
    Command::new(get_cli_binary_path())
        .args(args)
        .output()
        .expect("Failed to run CLI")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are valid UTF-8")
}

fn train_model(data: &Path, model: &Path, extra: &[&str]) {
    let mut args = vec!["train", "--data", path_str(data), "--output", path_str(model)];
    args.extend_from_slice(extra);
    let output = run(&args);
    assert!(
        output.status.success(),
        "Train command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(model.exists(), "Model file was not created");
}

#[test]
fn test_cli_train_command_libsvm() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(
        test_data.libsvm_file.path(),
        &model_path,
        &["--param", "C=1.0", "--param", "convergence_epsilon=0.001"],
    );
}

#[test]
fn test_cli_train_each_algorithm() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    for algorithm in ["dual", "relevance", "evolutionary", "gaussian_process"] {
        let model_path = temp_dir.path().join(format!("{algorithm}.json"));
        train_model(
            test_data.libsvm_file.path(),
            &model_path,
            &[
                "--algorithm",
                algorithm,
                "-p",
                "kernel_type=radial",
                "-p",
                "kernel_gamma=0.5",
                "-p",
                "seed=3",
            ],
        );
        let json = std::fs::read_to_string(&model_path).expect("Failed to read model");
        assert!(json.contains(&format!("\"algorithm\": \"{algorithm}\"")));
    }
}

#[test]
fn test_cli_train_with_config_file() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let mut config_file = NamedTempFile::new().expect("Failed to create config file");
    writeln!(
        config_file,
        r#"{{"kernel_type": "polynomial", "kernel_degree": 3, "C": 5, "scale": false}}"#
    )
    .expect("Failed to write");
    config_file.flush().expect("Failed to flush");

    train_model(
        test_data.libsvm_file.path(),
        &model_path,
        &["--config", path_str(config_file.path())],
    );
}

#[test]
fn test_cli_train_missing_kernel_parameter() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let output = run(&[
        "train",
        "--data",
        path_str(test_data.libsvm_file.path()),
        "--output",
        path_str(&model_path),
        "--param",
        "kernel_type=radial",
    ]);

    assert!(!output.status.success());
    assert!(!model_path.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("kernel_gamma"), "stderr: {stderr}");
}

#[test]
fn test_cli_info_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(test_data.libsvm_file.path(), &model_path, &[]);

    let info_output = run(&["info", path_str(&model_path)]);
    assert!(
        info_output.status.success(),
        "Info command failed: {}",
        String::from_utf8_lossy(&info_output.stderr)
    );

    let stdout = String::from_utf8_lossy(&info_output.stdout);
    assert!(stdout.contains("Kernel Model Summary"));
    assert!(stdout.contains("Decision function"));
    // Dot kernel by default, so per-attribute weights are shown
    assert!(stdout.contains("Feature weights"));
    assert!(stdout.contains("att1"));
}

#[test]
fn test_cli_predict_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(test_data.libsvm_file.path(), &model_path, &[]);

    let predict_output = run(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_libsvm_file.path()),
    ]);
    assert!(
        predict_output.status.success(),
        "Predict command failed: {}",
        String::from_utf8_lossy(&predict_output.stderr)
    );

    let stdout = String::from_utf8_lossy(&predict_output.stdout);
    assert!(stdout.contains("Predictions for 2 samples"));
    let lines: Vec<&str> = stdout.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(lines, vec!["0 +1", "1 -1"]);
}

#[test]
fn test_cli_predict_with_confidence_to_file() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");
    let output_path = temp_dir.path().join("predictions.txt");

    train_model(test_data.libsvm_file.path(), &model_path, &[]);

    let predict_output = run(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_libsvm_file.path()),
        "--confidence",
        "--output",
        path_str(&output_path),
    ]);
    assert!(predict_output.status.success());

    let written = std::fs::read_to_string(&output_path).expect("Failed to read predictions");
    assert!(written.contains("confidence"));
    for line in written.lines().filter(|l| !l.starts_with('#')) {
        let confidence: f64 = line
            .split_whitespace()
            .nth(2)
            .expect("confidence column")
            .parse()
            .expect("numeric confidence");
        assert!((0.5..=1.0).contains(&confidence));
    }
}

#[test]
fn test_cli_evaluate_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(test_data.libsvm_file.path(), &model_path, &[]);

    let output = run(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_libsvm_file.path()),
        "--detailed",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Accuracy: 100.00%"));
    assert!(stdout.contains("F1 Score"));
}

#[test]
fn test_cli_evaluate_single_class_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    // Classes 1 and 2: class "+1" is the negative one
    let mut train_file = NamedTempFile::new().expect("Failed to create data file");
    for (label, x, y) in [(2, 2.0, 1.0), (1, -2.0, -1.0), (2, 1.5, 0.8), (1, -1.5, -0.8)] {
        writeln!(train_file, "{label} 1:{x} 2:{y}").expect("Failed to write");
    }
    train_file.flush().expect("Failed to flush");
    train_model(train_file.path(), &model_path, &[]);

    let mut test_file = NamedTempFile::new().expect("Failed to create data file");
    writeln!(test_file, "1 1:-1.6 2:-0.7").expect("Failed to write");
    writeln!(test_file, "1 1:-1.8 2:-0.9").expect("Failed to write");
    test_file.flush().expect("Failed to flush");

    let output = run(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_file.path()),
        "--detailed",
    ]);
    assert!(
        output.status.success(),
        "Evaluate command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Accuracy: 100.00%"), "stdout: {stdout}");
    assert!(stdout.contains("True Negatives:  2"));

    // A label the model never saw is refused
    let mut unknown_file = NamedTempFile::new().expect("Failed to create data file");
    writeln!(unknown_file, "3 1:-1.6 2:-0.7").expect("Failed to write");
    unknown_file.flush().expect("Failed to flush");
    let output = run(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(unknown_file.path()),
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_regression_workflow() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    train_model(
        test_data.regression_file.path(),
        &model_path,
        &["--algorithm", "gaussian_process", "--regression"],
    );

    let output = run(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.regression_file.path()),
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Task: regression"));
    assert!(stdout.contains("RMSE"));
}

#[test]
fn test_cli_missing_model_file() {
    let output = run(&["info", "/nonexistent/model.json"]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["train", "predict", "evaluate", "info"] {
        assert!(stdout.contains(command));
    }
}
