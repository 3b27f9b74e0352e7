//! `ghcommit commit`: read local files and commit them to a branch.

use crate::cli::{CommitArgs, FileSpec};
use crate::commit::commit_files;
use crate::context::ServiceContext;
use crate::model::FileInput;

/// Execute the commit command and print the outcome.
///
/// # Errors
///
/// Returns an error string if a file cannot be read or the commit fails.
pub async fn run(ctx: &ServiceContext, args: &CommitArgs) -> Result<(), String> {
    let files = load_files(ctx, &args.files, args.base64)?;
    let options = args.options();
    let outcome = commit_files(
        ctx.http.as_ref(),
        &args.repo,
        &args.branch,
        &files,
        &options,
    )
    .await
    .map_err(|e| e.to_string())?;
    println!("{outcome}");
    Ok(())
}

/// Read every file through the context's filesystem.
///
/// Content that is not valid UTF-8 is sent base64-encoded; `force_base64`
/// does that for all files.
///
/// # Errors
///
/// Returns an error string naming the first file that could not be read.
pub fn load_files(
    ctx: &ServiceContext,
    specs: &[FileSpec],
    force_base64: bool,
) -> Result<Vec<FileInput>, String> {
    specs
        .iter()
        .map(|spec| -> Result<FileInput, String> {
            let bytes = ctx
                .fs
                .read(&spec.local)
                .map_err(|e| format!("failed to read {e}"))?;
            Ok(if force_base64 {
                FileInput::base64(spec.remote.clone(), &bytes)
            } else {
                FileInput::from_bytes(spec.remote.clone(), bytes)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryGitHub;
    use crate::cli::{Cli, Command};
    use crate::model::Encoding;
    use clap::Parser;

    fn args(dir: &std::path::Path, api_base: &str, extra: &[&str]) -> CommitArgs {
        let mut argv: Vec<String> = ["ghcommit", "commit", "--repo", "o/r", "--branch", "main"]
            .iter()
            .map(ToString::to_string)
            .collect();
        argv.extend(["--api-url".to_string(), api_base.to_string()]);
        argv.extend(extra.iter().map(ToString::to_string));
        argv.push(format!("{}=notes/a.txt", dir.join("a.txt").display()));
        match Cli::parse_from(argv).command {
            Command::Commit(args) => args,
        }
    }

    #[test]
    fn load_files_picks_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("a.txt");
        let binary = dir.path().join("b.bin");
        std::fs::write(&text, "hello").unwrap();
        std::fs::write(&binary, [0xffu8, 0xfe]).unwrap();
        let ctx = ServiceContext::with_transport(Box::new(InMemoryGitHub::new("o/r")));

        let specs: Vec<FileSpec> = vec![
            format!("{}=a.txt", text.display()).parse().unwrap(),
            format!("{}=b.bin", binary.display()).parse().unwrap(),
        ];
        let files = load_files(&ctx, &specs, false).unwrap();
        assert_eq!(files[0], FileInput::text("a.txt", "hello"));
        assert_eq!(files[1].encoding, Encoding::Base64);

        let files = load_files(&ctx, &specs[..1], true).unwrap();
        assert_eq!(files[0].encoding, Encoding::Base64);
        assert_eq!(files[0].contents, "aGVsbG8=");
    }

    #[test]
    fn load_files_reports_missing_file() {
        let ctx = ServiceContext::with_transport(Box::new(InMemoryGitHub::new("o/r")));
        let specs = vec!["/definitely/not/here.txt=x.txt".parse().unwrap()];
        let err = load_files(&ctx, &specs, false).unwrap_err();
        assert!(err.contains("failed to read /definitely/not/here.txt"));
    }

    #[tokio::test]
    async fn run_commits_local_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let github = InMemoryGitHub::new("o/r");
        let root = github.create_branch("main");
        let ctx = ServiceContext::with_transport(Box::new(github.clone()));

        let args = args(dir.path(), github.api_base(), &["--fast-forward"]);
        run(&ctx, &args).await.unwrap();

        let tip = github.tip("main").unwrap();
        assert_ne!(tip, root);
        let stored = github.read_file("main", "notes/a.txt").unwrap();
        assert_eq!(stored, b"hello");
    }

    #[tokio::test]
    async fn run_surfaces_pipeline_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let github = InMemoryGitHub::new("o/r");
        let ctx = ServiceContext::with_transport(Box::new(github.clone()));

        let args = args(dir.path(), github.api_base(), &["--force"]);
        let err = run(&ctx, &args).await.unwrap_err();
        assert!(err.contains("refs/heads/main not found"), "{err}");
    }
}
