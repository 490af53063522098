use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ShortsError};
use crate::media::{require_file, require_tool, CommandRunner, Filter, FilterChain, MediaCommand};
use crate::tools::ToolPaths;

/// A detected cut; `score` is `None` for the implicit start-of-video entry
#[derive(Debug, Clone, PartialEq)]
pub struct SceneChange {
    pub timestamp: f64,
    pub score: Option<f64>,
}

pub fn scene_command(processor: &Path, input: &Path, threshold: f64) -> MediaCommand {
    // `\,` keeps the expression's comma from splitting the chain
    let chain = FilterChain::new()
        .filter(Filter::new("select").arg("expr", format!("gt(scene\\,{})", threshold)))
        .filter(Filter::new("metadata").arg("mode", "print").arg("key", "lavfi.scene_score"));

    MediaCommand::new(processor, "Scene detection")
        .input(input)
        .video_filter(&chain)
        .no_audio()
        .args(["-f", "null", "-"])
}

/// Pair each `pts_time:` with the `lavfi.scene_score=` printed after it.
pub fn parse_scene_log(log: &str) -> Vec<SceneChange> {
    let mut changes = Vec::new();
    let mut pending_time: Option<f64> = None;

    for line in log.lines() {
        if let Some(time) = field_after(line, "pts_time:") {
            pending_time = Some(time);
        }
        if let Some(score) = field_after(line, "lavfi.scene_score=") {
            if let Some(timestamp) = pending_time.take() {
                changes.push(SceneChange { timestamp, score: Some(score) });
            }
        }
    }
    changes
}

fn field_after(line: &str, marker: &str) -> Option<f64> {
    let start = line.find(marker)? + marker.len();
    line[start..].split_whitespace().next()?.parse().ok()
}

/// Always starts at 0.0 and is ordered by time
fn normalize(mut changes: Vec<SceneChange>) -> Vec<SceneChange> {
    if !changes.iter().any(|c| c.timestamp.abs() < 0.001) {
        changes.push(SceneChange { timestamp: 0.0, score: None });
    }
    changes.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    changes
}

pub struct SceneDetector {
    runner: Arc<dyn CommandRunner>,
}

impl SceneDetector {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Lower thresholds report more changes; useful values sit around 0.3-0.5.
    pub async fn detect(&self, input: &Path, threshold: f64, tools: &ToolPaths) -> Result<Vec<SceneChange>> {
        let processor = require_tool("ffmpeg", tools.processor()).inspect_err(|e| {
            error!("Scene detection: {}", e);
        })?;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ShortsError::InvalidInput(format!(
                "scene threshold must be within (0, 1], got {}",
                threshold
            )));
        }
        require_file(input).inspect_err(|_| {
            error!("Scene detection: input not found: {}", input.display());
        })?;

        debug!("Detecting scenes in {} with threshold {}", input.display(), threshold);
        let command = scene_command(processor, input, threshold);
        let output = self.runner.run(&command).await?;
        let changes = parse_scene_log(&output.stderr);

        if !output.success {
            if changes.is_empty() {
                error!("Scene detection failed for {} (exit code {:?}): {}", input.display(), output.code, output.stderr.trim());
                return Err(ShortsError::Process {
                    stage: command.description,
                    code: output.code,
                    stderr: output.stderr,
                });
            }
            warn!(
                "Scene detection exited with code {:?} for {}, keeping {} parsed changes",
                output.code,
                input.display(),
                changes.len()
            );
        }

        info!("Scene detection complete for {}: {} potential changes", input.display(), changes.len());
        Ok(normalize(changes))
    }
}
