use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::{Result, ShortsError};
use super::{CommandOutput, CommandRunner, MediaCommand};

/// Runner backed by real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &MediaCommand) -> std::io::Result<CommandOutput> {
        debug!("Executing media processing command: {}", command.command_line());
        debug!("Description: {}", command.description);

        let output = Command::new(&command.binary_path)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(output.into())
    }
}

/// Check that a resolved tool still points at a regular file.
///
/// Paths are resolved once but the filesystem can change underneath them,
/// so this runs on every call.
pub fn require_tool<'a>(tool: &'static str, path: Option<&'a Path>) -> Result<&'a Path> {
    match path {
        Some(path) if path.is_file() => Ok(path),
        other => Err(ShortsError::MissingTool {
            tool,
            path: other.map(Path::to_path_buf),
        }),
    }
}

pub fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ShortsError::FileNotFound(path.to_path_buf()))
    }
}

/// Output must exist and be non-empty, whatever the tool's exit status said
pub fn validate_output(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(ShortsError::EmptyOutput(path.to_path_buf())),
    }
}

/// First `limit` characters of captured tool output, marked when cut
pub fn preview(text: &str, limit: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Execute `command`, then validate the file it should have produced.
pub async fn run_stage(
    runner: &dyn CommandRunner,
    command: &MediaCommand,
    output_path: &Path,
    preview_chars: usize,
) -> Result<()> {
    info!("{}: running {}", command.description, command.command_line());

    let output = runner.run(command).await.map_err(|e| {
        error!("{}: failed to start {}: {}", command.description, command.binary_path.display(), e);
        ShortsError::Process {
            stage: command.description.clone(),
            code: None,
            stderr: e.to_string(),
        }
    })?;

    if !output.success {
        error!("{}: tool failed with exit code {:?}:\n{}", command.description, output.code, output.stderr.trim());
        return Err(ShortsError::Process {
            stage: command.description.clone(),
            code: output.code,
            stderr: output.stderr,
        });
    }

    if !output.stderr.trim().is_empty() {
        debug!("{} output:\n{}", command.description, preview(&output.stderr, preview_chars));
    }

    if let Err(e) = validate_output(output_path) {
        error!("{}: tool finished but output is missing or empty: {}", command.description, output_path.display());
        return Err(e);
    }

    info!("{} completed -> {}", command.description, output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::media::MockCommandRunner;
    use assert_fs::prelude::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("  short  ", 10), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("ééééé", 2), "éé...");
        assert_eq!(preview("abc", 3), "abc");
    }

    #[test]
    fn test_require_tool() {
        let dir = assert_fs::TempDir::new().unwrap();
        let tool = dir.child("ffmpeg");
        tool.touch().unwrap();

        assert!(require_tool("ffmpeg", Some(tool.path())).is_ok());
        assert_eq!(require_tool("ffmpeg", None).unwrap_err().kind(), ErrorKind::Config);
        // a directory is not an executable file
        assert!(require_tool("ffmpeg", Some(dir.path())).is_err());
    }

    #[tokio::test]
    async fn test_run_stage_rejects_empty_output() {
        let dir = assert_fs::TempDir::new().unwrap();
        let out = dir.child("out.mp4");
        let out_path = out.path().to_path_buf();

        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(move |_| {
            std::fs::write(&out_path, b"")?;
            Ok(CommandOutput::ok(""))
        });

        let cmd = MediaCommand::new("ffmpeg", "Test stage").output(out.path());
        let err = run_stage(&runner, &cmd, out.path(), 100).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[tokio::test]
    async fn test_run_stage_reports_exit_code() {
        let dir = assert_fs::TempDir::new().unwrap();
        let out = dir.child("out.mp4");

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(CommandOutput::failed(1, "Invalid data found")));

        let cmd = MediaCommand::new("ffmpeg", "Test stage");
        match run_stage(&runner, &cmd, out.path(), 100).await {
            Err(ShortsError::Process { code, stderr, .. }) => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "Invalid data found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_stage_spawn_failure_is_process_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        let out = dir.child("out.mp4");

        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"))
        });

        let cmd = MediaCommand::new("ffmpeg", "Test stage");
        let err = run_stage(&runner, &cmd, out.path(), 100).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Process);
    }

    #[tokio::test]
    async fn test_run_stage_accepts_written_output() {
        let dir = assert_fs::TempDir::new().unwrap();
        let out = dir.child("out.mp4");
        let out_path = out.path().to_path_buf();

        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(move |_| {
            std::fs::write(&out_path, b"data")?;
            Ok(CommandOutput::ok(""))
        });

        let cmd = MediaCommand::new("ffmpeg", "Test stage");
        run_stage(&runner, &cmd, out.path(), 100).await.unwrap();
    }
}
