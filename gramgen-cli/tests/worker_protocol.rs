//! End-to-end tests that drive the real worker binary through the
//! supervisor and through the full command line.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use gramgen_execution::supervisor::{SupervisorConfig, WorkerSupervisor};
use gramgen_execution::{translate, ExecutionError};
use gramgen_ipc::protocol::GenerationSpec;

fn gramgen_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gramgen"))
}

fn write_fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn supervisor_with_tool_bin(tool_bin: &str) -> WorkerSupervisor {
    let mut config = SupervisorConfig::default();
    config.worker_program = Some(gramgen_binary());
    config
        .extra_env
        .push(("GRAMGEN_TOOL_BIN".to_string(), tool_bin.to_string()));
    WorkerSupervisor::new(config)
}

#[tokio::test]
async fn clean_generation_reports_zero_errors() {
    let tool_dir = tempfile::tempdir().unwrap();
    write_fake_tool(tool_dir.path(), "fakegen", "#!/bin/sh\nexit 0\n");
    let work_dir = tempfile::tempdir().unwrap();

    let supervisor = supervisor_with_tool_bin("fakegen");
    let result = supervisor
        .run(
            work_dir.path(),
            &[tool_dir.path().to_path_buf()],
            GenerationSpec::new(Vec::new(), "1g"),
        )
        .await
        .unwrap();

    assert_eq!(result.error_count, 0);
    assert!(translate::evaluate(&result).is_ok());
}

#[tokio::test]
async fn tool_diagnostics_become_a_counted_failure() {
    let tool_dir = tempfile::tempdir().unwrap();
    write_fake_tool(
        tool_dir.path(),
        "fakegen",
        "#!/bin/sh\n\
         echo 'error(50): A.g4:1:0: syntax error' >&2\n\
         echo 'error(50): B.g4:2:0: syntax error' >&2\n\
         exit 1\n",
    );
    let work_dir = tempfile::tempdir().unwrap();

    let supervisor = supervisor_with_tool_bin("fakegen");
    let result = supervisor
        .run(
            work_dir.path(),
            &[tool_dir.path().to_path_buf()],
            GenerationSpec::new(Vec::new(), "1g"),
        )
        .await
        .unwrap();

    assert_eq!(result.error_count, 2);
    let failure = translate::evaluate(&result).unwrap_err();
    assert_eq!(
        failure.to_string(),
        "There were 2 errors during grammar generation"
    );
}

#[tokio::test]
async fn missing_tool_is_reported_not_crashed() {
    let tool_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();

    let supervisor = supervisor_with_tool_bin("fakegen");
    let result = supervisor
        .run(
            work_dir.path(),
            &[tool_dir.path().to_path_buf()],
            GenerationSpec::new(Vec::new(), "1g"),
        )
        .await
        .unwrap();

    // The worker still reports: one error, not an abnormal termination.
    assert_eq!(result.error_count, 1);
    let failure = translate::evaluate(&result).unwrap_err();
    assert_eq!(
        failure.to_string(),
        "There was 1 error during grammar generation"
    );
}

#[tokio::test]
async fn spec_working_dir_is_honored_by_the_tool() {
    let tool_dir = tempfile::tempdir().unwrap();
    write_fake_tool(
        tool_dir.path(),
        "fakegen",
        "#!/bin/sh\ntouch tool-was-here\nexit 0\n",
    );
    let work_dir = tempfile::tempdir().unwrap();
    let tool_cwd = tempfile::tempdir().unwrap();

    let supervisor = supervisor_with_tool_bin("fakegen");
    let spec = GenerationSpec::new(Vec::new(), "1g")
        .with_working_dir(tool_cwd.path().to_path_buf());
    let result = supervisor
        .run(work_dir.path(), &[tool_dir.path().to_path_buf()], spec)
        .await
        .unwrap();

    assert_eq!(result.error_count, 0);
    assert!(tool_cwd.path().join("tool-was-here").is_file());
}

#[tokio::test]
async fn dead_worker_program_is_abnormal_termination() {
    let work_dir = tempfile::tempdir().unwrap();

    let mut config = SupervisorConfig::default();
    config.worker_program = Some(PathBuf::from("/bin/true"));
    let supervisor = WorkerSupervisor::new(config);

    let err = supervisor
        .run(work_dir.path(), &[], GenerationSpec::new(Vec::new(), "1g"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExecutionError::AbnormalTermination { .. }));
}

#[test]
fn cli_generate_succeeds_for_a_clean_tool_run() {
    let tool_dir = tempfile::tempdir().unwrap();
    write_fake_tool(tool_dir.path(), "fakegen", "#!/bin/sh\nexit 0\n");

    let source_dir = tempfile::tempdir().unwrap();
    fs::write(source_dir.path().join("Test.g4"), b"grammar Test;").unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();

    let status = Command::new(gramgen_binary())
        .args([
            "generate",
            "--source-dir",
            source_dir.path().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
            "--tool-path",
            tool_dir.path().to_str().unwrap(),
            "--tool-bin",
            "fakegen",
            "--working-dir",
            work_dir.path().to_str().unwrap(),
        ])
        .status()
        .unwrap();

    assert!(status.success());
}

#[test]
fn cli_generate_surfaces_the_counted_failure_message() {
    let tool_dir = tempfile::tempdir().unwrap();
    write_fake_tool(
        tool_dir.path(),
        "fakegen",
        "#!/bin/sh\n\
         echo 'error(50): Test.g4:1:0: syntax error' >&2\n\
         echo 'error(50): Test.g4:2:0: syntax error' >&2\n\
         exit 1\n",
    );

    let source_dir = tempfile::tempdir().unwrap();
    fs::write(source_dir.path().join("Test.g4"), b"grammar Test;").unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();

    let output = Command::new(gramgen_binary())
        .args([
            "generate",
            "--source-dir",
            source_dir.path().to_str().unwrap(),
            "--output-dir",
            output_dir.path().to_str().unwrap(),
            "--tool-path",
            tool_dir.path().to_str().unwrap(),
            "--tool-bin",
            "fakegen",
            "--working-dir",
            work_dir.path().to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("There were 2 errors during grammar generation"));
}
