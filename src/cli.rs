use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Locate ffmpeg/ffprobe and report their versions
    Tools,

    /// Print the duration of a media file in seconds
    Probe {
        /// Media file to inspect
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Turn a source clip into a silent 1080x1920 background of fixed length
    Prepare {
        /// Source video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Target duration in seconds
        #[arg(short, long)]
        duration: f64,
    },

    /// Combine a prepared video, voiceover, subtitles and optional music
    Compose {
        /// Prepared background video
        #[arg(long)]
        video: PathBuf,

        /// Voiceover audio
        #[arg(short, long)]
        audio: PathBuf,

        /// Subtitle file (ASS/SSA or anything the subtitles filter reads)
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Background music file
        #[arg(short, long)]
        music: Option<PathBuf>,

        /// Music level as a fraction of the original (defaults to the config value)
        #[arg(long)]
        music_volume: Option<f64>,
    },

    /// Prepare a background matching the voiceover length and compose the short
    Short {
        /// Source video used as background
        #[arg(short, long)]
        background: PathBuf,

        /// Voiceover audio
        #[arg(short, long)]
        audio: PathBuf,

        /// Subtitle file
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Background music file
        #[arg(short, long)]
        music: Option<PathBuf>,

        /// Music level as a fraction of the original (defaults to the config value)
        #[arg(long)]
        music_volume: Option<f64>,

        /// Keep the prepared background next to the output
        #[arg(long)]
        keep_intermediate: bool,
    },

    /// List scene changes in a video
    Scenes {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Scene score threshold (lower finds more changes)
        #[arg(short, long, default_value = "0.4")]
        threshold: f64,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "shortform.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
