use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Result, ShortsError};
use crate::media::{BackgroundPreparer, CommandRunner, Composer, CompositionRequest, SystemRunner};
use crate::probe::DurationProber;
use crate::scenes::{SceneChange, SceneDetector};
use crate::tools::ToolPaths;

/// Everything needed to turn a source clip and a voiceover into a short
#[derive(Debug, Clone)]
pub struct ShortRequest {
    pub background: PathBuf,
    pub voice: PathBuf,
    pub subtitles: PathBuf,
    pub output: PathBuf,
    pub music: Option<PathBuf>,
    pub music_volume: f64,
    /// Keep the prepared background next to the output instead of deleting it
    pub keep_intermediate: bool,
}

pub struct Workflow {
    config: Config,
    tools: ToolPaths,
    prober: DurationProber,
    preparer: BackgroundPreparer,
    composer: Composer,
    scenes: SceneDetector,
}

impl Workflow {
    pub fn new(config: Config, tools: ToolPaths) -> Self {
        Self::with_runner(config, tools, Arc::new(SystemRunner))
    }

    pub fn with_runner(config: Config, tools: ToolPaths, runner: Arc<dyn CommandRunner>) -> Self {
        let preview = config.logging.output_preview_chars;
        Self {
            prober: DurationProber::new(runner.clone()),
            preparer: BackgroundPreparer::new(runner.clone(), config.background.clone(), preview),
            composer: Composer::new(runner.clone(), config.compose.clone(), preview),
            scenes: SceneDetector::new(runner),
            config,
            tools,
        }
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    /// Duration in seconds, `0.0` when unknown
    pub async fn probe_duration(&self, media: &Path) -> Result<f64> {
        self.prober.duration(media, self.tools.prober()).await
    }

    pub async fn prepare_background(&self, source: &Path, output: &Path, target_duration: f64) -> Result<()> {
        self.preparer.prepare(source, output, target_duration, &self.tools).await
    }

    pub async fn compose(&self, request: &CompositionRequest) -> Result<()> {
        self.composer.compose(request, &self.tools).await
    }

    pub async fn detect_scenes(&self, input: &Path, threshold: f64) -> Result<Vec<SceneChange>> {
        self.scenes.detect(input, threshold, &self.tools).await
    }

    /// Prepare a background as long as the voiceover, then compose the final video
    pub async fn run_short(&self, request: &ShortRequest) -> Result<()> {
        info!("Building short: {} + {} -> {}", request.background.display(), request.voice.display(), request.output.display());

        let voice_duration = self.probe_duration(&request.voice).await?;
        if voice_duration <= 0.0 {
            error!("Could not determine voiceover duration: {}", request.voice.display());
            return Err(ShortsError::InvalidInput(format!(
                "voiceover duration unknown: {}",
                request.voice.display()
            )));
        }

        let output_dir = match request.output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&output_dir)?;

        let intermediate = tempfile::Builder::new()
            .prefix(".background-")
            .suffix(".mp4")
            .tempfile_in(&output_dir)?
            .into_temp_path();

        self.prepare_background(&request.background, &intermediate, voice_duration).await?;

        let composition = CompositionRequest::new(
            intermediate.to_path_buf(),
            request.voice.clone(),
            request.subtitles.clone(),
            request.output.clone(),
        )
        .with_music(request.music.clone(), request.music_volume);

        let result = self.compose(&composition).await;

        if request.keep_intermediate {
            match intermediate.keep() {
                Ok(path) => info!("Prepared background kept at {}", path.display()),
                Err(e) => warn!("Could not keep prepared background: {}", e),
            }
        } else if let Err(e) = intermediate.close() {
            warn!("Failed to remove prepared background: {}", e);
        }

        result
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{CommandOutput, MediaCommand, MockCommandRunner};
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use std::sync::Mutex;

    fn tools_in(dir: &TempDir) -> ToolPaths {
        dir.child("ffmpeg").touch().unwrap();
        dir.child("ffprobe").touch().unwrap();
        ToolPaths::new(
            Some(dir.child("ffmpeg").path().to_path_buf()),
            Some(dir.child("ffprobe").path().to_path_buf()),
        )
    }

    fn request(dir: &TempDir) -> ShortRequest {
        for name in ["clip.mp4", "voice.mp3", "captions.ass"] {
            dir.child(name).write_binary(b"media").unwrap();
        }
        ShortRequest {
            background: dir.child("clip.mp4").path().to_path_buf(),
            voice: dir.child("voice.mp3").path().to_path_buf(),
            subtitles: dir.child("captions.ass").path().to_path_buf(),
            output: dir.child("out/final.mp4").path().to_path_buf(),
            music: None,
            music_volume: 0.1,
            keep_intermediate: false,
        }
    }

    /// Voice is 10s, the clip 15s; every ffmpeg run writes its last argument
    fn simulated_runner(seen: Arc<Mutex<Vec<MediaCommand>>>) -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(move |cmd| {
            if cmd.description == "Duration probe" {
                let seconds = if cmd.args.last().is_some_and(|a| a.ends_with("voice.mp3")) { 10.0 } else { 15.0 };
                return Ok(CommandOutput::ok(format!(r#"{{"format": {{"duration": "{}"}}}}"#, seconds)));
            }
            seen.lock().unwrap().push(cmd.clone());
            if let Some(out) = cmd.args.last() {
                std::fs::write(out, b"encoded")?;
            }
            Ok(CommandOutput::ok(""))
        });
        runner
    }

    #[tokio::test]
    async fn test_short_trims_background_to_voice() {
        let dir = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let workflow = Workflow::with_runner(Config::default(), tools_in(&dir), Arc::new(simulated_runner(seen.clone())));

        let request = request(&dir);
        workflow.run_short(&request).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].description, "Background preparation");
        assert_eq!(seen[0].input_options(), ["-y", "-t", "10.0000"]);
        assert_eq!(seen[1].description, "Final composition");
        assert!(seen[1].has_arg("-shortest"));

        assert!(request.output.is_file());
        // the intermediate background is removed
        let leftovers: Vec<_> = std::fs::read_dir(dir.child("out").path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".background-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_short_keeps_intermediate_on_request() {
        let dir = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let workflow = Workflow::with_runner(Config::default(), tools_in(&dir), Arc::new(simulated_runner(seen)));

        let mut request = request(&dir);
        request.keep_intermediate = true;
        workflow.run_short(&request).await.unwrap();

        let kept = std::fs::read_dir(dir.child("out").path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().starts_with(".background-"));
        assert!(kept);
    }

    #[tokio::test]
    async fn test_short_requires_known_voice_duration() {
        let dir = TempDir::new().unwrap();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(CommandOutput::failed(1, "Invalid data")));
        let workflow = Workflow::with_runner(Config::default(), tools_in(&dir), Arc::new(runner));

        let err = workflow.run_short(&request(&dir)).await.unwrap_err();
        assert!(matches!(err, ShortsError::InvalidInput(_)));
    }
}
