//! Integration tests for top-level CLI behavior.

use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use ghcommit::adapters::memory::{InMemoryGitHub, MEMORY_API_BASE};
use ghcommit::adapters::recording::http::RecordingHttpTransport;
use ghcommit::cassette::recorder::CassetteRecorder;
use ghcommit::{commit_files, CommitOptions, FileInput, RefUpdatePolicy};

fn ghcommit() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ghcommit"));
    for var in [
        "GITHUB_TOKEN",
        "GITHUB_REPOSITORY",
        "GITHUB_API_URL",
        "GHCOMMIT_BRANCH",
        "GHCOMMIT_RECORD",
        "GHCOMMIT_REPLAY",
        "GHCOMMIT_TIMEOUT_SECS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn run(cmd: &mut Command, args: &[&str]) -> std::process::Output {
    cmd.args(args)
        .output()
        .expect("failed to run ghcommit binary")
}

/// Records a one-file commit of `contents` to `notes/a.txt` on `main`.
async fn record_cassette(path: &Path, contents: &str) {
    let github = InMemoryGitHub::new("o/r");
    github.create_branch("main");
    let recorder = CassetteRecorder::new(path, "cli", "o/r@main");
    let recorder = Arc::new(Mutex::new(recorder));
    {
        let inner = Box::new(github.clone());
        let transport = RecordingHttpTransport::new(inner, Arc::clone(&recorder));
        let options = CommitOptions::new(RefUpdatePolicy::FastForward)
            .api_base(MEMORY_API_BASE);
        let files = [FileInput::text("notes/a.txt", contents)];
        commit_files(&transport, "o/r", "main", &files, &options)
            .await
            .unwrap();
    }
    recorder.lock().unwrap().write().unwrap();
}

#[test]
fn help_lists_commit_subcommand() {
    let output = run(&mut ghcommit(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("commit"));
}

#[test]
fn version_prints_to_stdout_and_succeeds() {
    let output = run(&mut ghcommit(), &["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.starts_with("ghcommit "), "{stdout}");
}

#[test]
fn commit_requires_a_ref_update_policy() {
    let output = run(
        &mut ghcommit(),
        &["commit", "--repo", "o/r", "--branch", "main", "a.txt"],
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(
        stderr.contains("--fast-forward") || stderr.contains("--force"),
        "{stderr}"
    );
}

#[test]
fn commit_without_token_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        ghcommit().current_dir(dir.path()),
        &[
            "commit", "--repo", "o/r", "--branch", "main", "--force", "a.txt",
        ],
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("GITHUB_TOKEN is not set"), "{stderr}");
}

#[test]
fn repository_and_branch_come_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        ghcommit()
            .current_dir(dir.path())
            .env("GITHUB_REPOSITORY", "o/r")
            .env("GHCOMMIT_BRANCH", "main"),
        &["commit", "--force", "missing.txt"],
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    // Parsing succeeded; the failure is the missing token.
    assert!(stderr.contains("GITHUB_TOKEN"), "{stderr}");
}

#[tokio::test]
async fn commit_replays_recorded_session() {
    let dir = tempfile::tempdir().unwrap();
    let cassette = dir.path().join("cli.cassette.yaml");
    record_cassette(&cassette, "hello").await;
    let local = dir.path().join("a.txt");
    std::fs::write(&local, "hello").unwrap();
    let file_arg = format!("{}=notes/a.txt", local.display());

    let output = run(
        ghcommit()
            .current_dir(dir.path())
            .env("GHCOMMIT_REPLAY", &cassette),
        &[
            "commit",
            "--repo",
            "o/r",
            "--branch",
            "main",
            "--fast-forward",
            "--api-url",
            MEMORY_API_BASE,
            &file_arg,
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {stderr}");
    assert!(stdout.starts_with("Committed "), "{stdout}");
    let stdout = stdout.trim_end();
    assert!(stdout.ends_with(" to refs/heads/main"), "{stdout}");
}

#[test]
fn invalid_subcommand_exits_with_error() {
    let output = run(&mut ghcommit(), &["nonsense"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("unrecognized subcommand"));
}
