//! Shortform - Vertical Short Video Composition
//!
//! Locates ffmpeg/ffprobe, probes media durations, normalizes background
//! clips into 1080x1920 vertical footage and composes the final short from
//! a voiceover, burned-in subtitles and optional background music.

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod probe;
pub mod scenes;
pub mod subtitle;
pub mod tools;
pub mod workflow;

pub use error::{ErrorKind, Result, ShortsError};
pub use tools::ToolPaths;
