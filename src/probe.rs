use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{ErrorKind, Result, ShortsError};
use crate::media::{require_file, require_tool, CommandRunner, MediaCommand};

#[derive(Debug, Deserialize)]
struct ProbeReport {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    /// ffprobe reports numbers as strings in JSON output
    duration: Option<String>,
}

/// Build the ffprobe invocation that reports container-level metadata as JSON
pub fn duration_command(prober: &Path, media: &Path) -> MediaCommand {
    MediaCommand::new(prober, "Duration probe")
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .output(media)
}

/// Extract `format.duration` from ffprobe's JSON output
pub fn parse_duration(json: &str) -> Result<f64> {
    let report: ProbeReport = serde_json::from_str(json)?;
    let raw = report
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| ShortsError::Probe("duration missing from probe output".to_string()))?;

    let duration: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ShortsError::Probe(format!("invalid duration '{}': {}", raw, e)))?;

    if !duration.is_finite() || duration < 0.0 {
        return Err(ShortsError::Probe(format!("invalid duration '{}'", raw)));
    }
    Ok(duration)
}

/// Queries media duration through the prober tool. Nothing is cached.
#[derive(Clone)]
pub struct DurationProber {
    runner: Arc<dyn CommandRunner>,
}

impl DurationProber {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Duration in seconds, with `0.0` standing for "unknown".
    ///
    /// Only a missing or invalid prober is returned as an error; every
    /// problem with the media itself is logged and yields `0.0`.
    pub async fn duration(&self, media: &Path, prober: Option<&Path>) -> Result<f64> {
        match self.try_duration(media, prober).await {
            Ok(duration) => Ok(duration),
            Err(e) if e.kind() == ErrorKind::Config => Err(e),
            Err(_) => Ok(0.0),
        }
    }

    /// Duration in seconds, with every failure reported as a typed error
    pub async fn try_duration(&self, media: &Path, prober: Option<&Path>) -> Result<f64> {
        let name = display_name(media);

        if let Err(e) = require_file(media) {
            error!("Duration probe: file not found: {}", media.display());
            return Err(e);
        }
        let prober = require_tool("ffprobe", prober).inspect_err(|e| {
            error!("Duration probe: {}", e);
        })?;

        info!("Probing duration for {} using {}", name, prober.display());
        let command = duration_command(prober, media);

        let output = self.runner.run(&command).await.map_err(|e| {
            error!("Duration probe: failed to run {} for {}: {}", prober.display(), name, e);
            ShortsError::Io(e)
        })?;

        if !output.success {
            error!("Duration probe: ffprobe error for {}: {}", name, output.stderr.trim());
            return Err(ShortsError::Process {
                stage: command.description,
                code: output.code,
                stderr: output.stderr,
            });
        }

        let duration = parse_duration(&output.stdout).inspect_err(|e| {
            error!("Duration probe: error parsing duration for {}: {}", name, e);
        })?;

        info!("Detected duration: {:.3}s", duration);
        Ok(duration)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{CommandOutput, MockCommandRunner};
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    const REPORT: &str = r#"{"format": {"filename": "clip.mp4", "duration": "12.480000", "size": "1024"}}"#;

    fn fixture() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let media = dir.child("clip.mp4");
        media.write_binary(b"not really a video").unwrap();
        let prober = dir.child("ffprobe");
        prober.touch().unwrap();
        let media = media.path().to_path_buf();
        let prober = prober.path().to_path_buf();
        (dir, media, prober)
    }

    fn prober_returning(output: CommandOutput) -> DurationProber {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(move |_| Ok(output.clone()));
        DurationProber::new(Arc::new(runner))
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration(REPORT).unwrap(), 12.48);
        assert!(parse_duration(r#"{"format": {}}"#).is_err());
        assert!(parse_duration(r#"{"streams": []}"#).is_err());
        assert!(parse_duration(r#"{"format": {"duration": "N/A"}}"#).is_err());
        assert!(parse_duration("garbage").is_err());
    }

    #[test]
    fn test_duration_command() {
        let cmd = duration_command(Path::new("/bin/ffprobe"), Path::new("/media/a.mp4"));
        assert_eq!(
            cmd.args,
            ["-v", "error", "-print_format", "json", "-show_format", "/media/a.mp4"]
        );
    }

    #[tokio::test]
    async fn test_duration_is_repeatable() {
        let (_dir, media, prober_path) = fixture();
        let prober = prober_returning(CommandOutput::ok(REPORT));

        let first = prober.duration(&media, Some(prober_path.as_path())).await.unwrap();
        let second = prober.duration(&media, Some(prober_path.as_path())).await.unwrap();
        assert_eq!(first, 12.48);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_media_is_soft() {
        let (dir, _media, prober_path) = fixture();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();
        let prober = DurationProber::new(Arc::new(runner));

        let missing = dir.child("missing.mp4");
        assert_eq!(prober.duration(missing.path(), Some(prober_path.as_path())).await.unwrap(), 0.0);
        let err = prober.try_duration(missing.path(), Some(prober_path.as_path())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[tokio::test]
    async fn test_missing_prober_is_hard() {
        let (dir, media, _prober) = fixture();
        let prober = DurationProber::new(Arc::new(MockCommandRunner::new()));

        let err = prober.duration(&media, None).await.unwrap_err();
        assert!(matches!(err, ShortsError::MissingTool { tool: "ffprobe", .. }));

        let not_a_file = dir.child("bin");
        not_a_file.create_dir_all().unwrap();
        let err = prober.duration(&media, Some(not_a_file.path())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_tool_error_and_malformed_output_are_soft() {
        let (_dir, media, prober_path) = fixture();

        let failing = prober_returning(CommandOutput::failed(1, "moov atom not found"));
        assert_eq!(failing.duration(&media, Some(prober_path.as_path())).await.unwrap(), 0.0);

        let malformed = prober_returning(CommandOutput::ok(r#"{"format": {"size": "1"}}"#));
        assert_eq!(malformed.duration(&media, Some(prober_path.as_path())).await.unwrap(), 0.0);
        let err = malformed.try_duration(&media, Some(prober_path.as_path())).await.unwrap_err();
        assert!(matches!(err, ShortsError::Probe(_)));
    }
}
