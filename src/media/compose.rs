use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::ComposeConfig;
use crate::error::{Result, ShortsError};
use crate::subtitle::overlay_filter;
use crate::tools::ToolPaths;
use super::{
    require_file, require_tool, run_stage, CommandRunner, Filter, FilterChain, FilterGraph,
    MediaCommand,
};

/// Inputs and output of one final composition
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionRequest {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub subtitles: PathBuf,
    pub output: PathBuf,
    pub music: Option<PathBuf>,
    /// Fraction of the music's original level (0.1 = 10%)
    pub music_volume: f64,
}

impl CompositionRequest {
    pub fn new<P: Into<PathBuf>>(video: P, audio: P, subtitles: P, output: P) -> Self {
        Self {
            video: video.into(),
            audio: audio.into(),
            subtitles: subtitles.into(),
            output: output.into(),
            music: None,
            music_volume: 0.1,
        }
    }

    pub fn with_music<P: Into<PathBuf>>(mut self, music: Option<P>, volume: f64) -> Self {
        self.music = music.map(Into::into);
        self.music_volume = volume;
        self
    }
}

/// Assemble the composition command; `music` must already be validated.
///
/// Input order is fixed: 0 = video, 1 = voice, 2 = music.
pub fn composition_command(
    processor: &Path,
    request: &CompositionRequest,
    music: Option<&Path>,
    settings: &ComposeConfig,
) -> MediaCommand {
    let mut graph = FilterGraph::new().chain(
        FilterChain::new()
            .input("0:v")
            .filter(overlay_filter(&request.subtitles))
            .output("vout"),
    );

    let mut cmd = MediaCommand::new(processor, "Final composition")
        .overwrite()
        .input(&request.video)
        .input(&request.audio);

    let audio_map = match music {
        Some(music) => {
            cmd = cmd.input(music);
            graph = graph
                .chain(
                    FilterChain::new()
                        .input("2:a")
                        .filter(Filter::new("volume").arg("volume", format!("{:.2}", request.music_volume)))
                        .output("music"),
                )
                .chain(
                    FilterChain::new()
                        .input("1:a")
                        .input("music")
                        .filter(
                            Filter::new("amix")
                                .arg("inputs", "2")
                                .arg("duration", "first")
                                .arg("dropout_transition", settings.dropout_transition.to_string()),
                        )
                        .output("aout"),
                );
            "[aout]"
        }
        None => "1:a",
    };

    cmd.filter_complex(&graph)
        .map("[vout]")
        .map(audio_map)
        .video_codec("libx264")
        .preset(&settings.preset)
        .crf(settings.crf)
        .audio_codec(&settings.audio_codec)
        .audio_bitrate(&settings.audio_bitrate)
        .shortest()
        .output(&request.output)
}

/// Muxes the prepared video, voiceover, burned-in subtitles and optional music
pub struct Composer {
    runner: Arc<dyn CommandRunner>,
    settings: ComposeConfig,
    preview_chars: usize,
}

impl Composer {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: ComposeConfig, preview_chars: usize) -> Self {
        Self {
            runner,
            settings,
            preview_chars,
        }
    }

    /// Music that was asked for but is missing is dropped with a warning;
    /// every other missing input fails the composition.
    pub async fn compose(&self, request: &CompositionRequest, tools: &ToolPaths) -> Result<()> {
        let processor = require_tool("ffmpeg", tools.processor()).inspect_err(|e| {
            error!("Composition: {}", e);
        })?;

        if !(0.0..=1.0).contains(&request.music_volume) {
            error!("Composition: music volume must be within 0.0-1.0, got {}", request.music_volume);
            return Err(ShortsError::InvalidInput(format!(
                "music volume must be within 0.0-1.0, got {}",
                request.music_volume
            )));
        }

        for (label, path) in [
            ("Prepared video", &request.video),
            ("Voiceover audio", &request.audio),
            ("Subtitle file", &request.subtitles),
        ] {
            if let Err(e) = require_file(path) {
                error!("Composition: {} not found: {}", label, path.display());
                return Err(e);
            }
        }

        let music = match request.music.as_deref() {
            Some(music) if music.is_file() => {
                info!("Mixing background music at {:.0}% volume", request.music_volume * 100.0);
                Some(music)
            }
            Some(music) => {
                warn!("Background music file specified but not found, continuing without it: {}", music.display());
                None
            }
            None => None,
        };

        let command = composition_command(processor, request, music, &self.settings);
        run_stage(self.runner.as_ref(), &command, &request.output, self.preview_chars).await
    }
}
