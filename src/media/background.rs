use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::BackgroundConfig;
use crate::error::{Result, ShortsError};
use crate::probe::DurationProber;
use crate::tools::ToolPaths;
use super::{require_file, require_tool, run_stage, CommandRunner, Filter, FilterChain, MediaCommand};

/// How the source clip is fitted to the target duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationFit {
    /// Repeat the input `extra_loops` additional times, then cap the output
    Loop { extra_loops: u64, target: f64 },
    /// Cut the input at `target`
    Trim { target: f64 },
}

impl DurationFit {
    /// A source exactly as long as the target is trimmed, not looped.
    pub fn plan(source_duration: f64, target_duration: f64) -> Self {
        if source_duration < target_duration {
            let extra_loops = (target_duration / source_duration).floor() as u64;
            DurationFit::Loop { extra_loops, target: target_duration }
        } else {
            DurationFit::Trim { target: target_duration }
        }
    }
}

/// crop to 9:16, shrink into the frame, letterbox, then square pixels
///
/// The final `setsar` matters: after crop/scale/pad the sample aspect ratio
/// can be left non-square and the compositor would stretch the frame.
pub fn vertical_geometry(width: u32, height: u32) -> FilterChain {
    let (w, h) = (width.to_string(), height.to_string());
    let divisor = gcd(width, height).max(1);
    let (aw, ah) = (width / divisor, height / divisor);
    FilterChain::new()
        .filter(
            Filter::new("crop")
                .arg("w", format!("min(iw\\,ih*{}/{})", aw, ah))
                .arg("h", format!("min(ih\\,iw*{}/{})", ah, aw)),
        )
        .filter(
            Filter::new("scale")
                .arg("w", w.clone())
                .arg("h", h.clone())
                .arg("force_original_aspect_ratio", "decrease"),
        )
        .filter(
            Filter::new("pad")
                .arg("w", w)
                .arg("h", h)
                .arg("x", "(ow-iw)/2")
                .arg("y", "(oh-ih)/2")
                .arg("color", "black"),
        )
        .filter(Filter::new("setsar").arg("sar", "1"))
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Assemble the full background command; no process is started here
pub fn background_command(
    processor: &Path,
    source: &Path,
    output: &Path,
    fit: DurationFit,
    settings: &BackgroundConfig,
) -> MediaCommand {
    let mut cmd = MediaCommand::new(processor, "Background preparation").overwrite();

    cmd = match fit {
        DurationFit::Loop { extra_loops, .. } => cmd.stream_loop(extra_loops),
        DurationFit::Trim { target } => cmd.duration(target),
    };

    cmd = cmd
        .input(source)
        .map("0:v:0")
        .video_filter(&vertical_geometry(settings.width, settings.height))
        .video_codec("libx264")
        .preset(&settings.preset)
        .crf(settings.crf)
        .no_audio();

    if let DurationFit::Loop { target, .. } = fit {
        cmd = cmd.duration(target);
    }

    cmd.output(output)
}

/// Normalizes an arbitrary clip into a silent vertical background of fixed length
pub struct BackgroundPreparer {
    runner: Arc<dyn CommandRunner>,
    prober: DurationProber,
    settings: BackgroundConfig,
    preview_chars: usize,
}

impl BackgroundPreparer {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: BackgroundConfig, preview_chars: usize) -> Self {
        let prober = DurationProber::new(runner.clone());
        Self {
            runner,
            prober,
            settings,
            preview_chars,
        }
    }

    pub async fn prepare(
        &self,
        source: &Path,
        output: &Path,
        target_duration: f64,
        tools: &ToolPaths,
    ) -> Result<()> {
        let processor = require_tool("ffmpeg", tools.processor()).inspect_err(|e| {
            error!("Background preparation: {}", e);
        })?;

        if !(target_duration.is_finite() && target_duration > 0.0) {
            error!("Background preparation: target duration must be positive, got {}", target_duration);
            return Err(ShortsError::InvalidInput(format!(
                "target duration must be positive, got {}",
                target_duration
            )));
        }

        if let Err(e) = require_file(source) {
            error!("Background preparation: source video not found: {}", source.display());
            return Err(e);
        }

        let source_duration = self.prober.duration(source, tools.prober()).await.inspect_err(|e| {
            error!("Background preparation: {}", e);
        })?;
        if source_duration <= 0.0 {
            error!("Background preparation: source video duration invalid ({:.2}s)", source_duration);
            return Err(ShortsError::InvalidInput(format!(
                "source video duration invalid ({:.2}s)",
                source_duration
            )));
        }

        let fit = DurationFit::plan(source_duration, target_duration);
        match fit {
            DurationFit::Loop { extra_loops, .. } => info!(
                "Looping input {} times (target duration {:.2}s)",
                extra_loops + 1,
                target_duration
            ),
            DurationFit::Trim { .. } => info!("Trimming input to {:.2}s", target_duration),
        }

        let command = background_command(processor, source, output, fit, &self.settings);
        run_stage(self.runner.as_ref(), &command, output, self.preview_chars).await
    }
}
