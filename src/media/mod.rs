// Media processing built on external ffmpeg/ffprobe processes
//
// - Commands: pure command and filtergraph construction
// - Processor: process execution and output validation
// - Background: vertical background clip preparation
// - Compose: final muxing of video, voice, subtitles and music

pub mod background;
pub mod commands;
pub mod compose;
pub mod processor;

use async_trait::async_trait;

pub use background::*;
pub use commands::*;
pub use compose::*;
pub use processor::*;

/// Captured result of a finished tool invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful run with the given stdout, handy for simulated tools
    pub fn ok<S: Into<String>>(stdout: S) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed run with the given exit code and stderr
    pub fn failed<S: Into<String>>(code: i32, stderr: S) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs a built command to completion and captures both output streams.
///
/// An `Err` means the process could not be run at all; a non-zero exit is
/// reported through [`CommandOutput::success`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &MediaCommand) -> std::io::Result<CommandOutput>;
}
