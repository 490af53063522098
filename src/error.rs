use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShortsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid or missing {tool} executable: {}", display_tool_path(.path))]
    MissingTool {
        tool: &'static str,
        path: Option<PathBuf>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("{stage} failed (exit code {}): {stderr}", display_code(.code))]
    Process {
        stage: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Tool finished but output is missing or empty: {}", .0.display())]
    EmptyOutput(PathBuf),
}

/// Coarse classification callers can match on instead of individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The call cannot work regardless of its inputs (missing tool, bad config).
    Config,
    /// A required input was missing or unusable.
    Input,
    /// The external tool failed or could not be run.
    Process,
    /// The tool reported success but the output failed validation.
    Integrity,
}

impl ShortsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShortsError::MissingTool { .. } | ShortsError::Config(_) | ShortsError::Toml(_) => {
                ErrorKind::Config
            }
            ShortsError::FileNotFound(_) | ShortsError::InvalidInput(_) => ErrorKind::Input,
            ShortsError::Io(_)
            | ShortsError::Json(_)
            | ShortsError::Probe(_)
            | ShortsError::Process { .. } => ErrorKind::Process,
            ShortsError::EmptyOutput(_) => ErrorKind::Integrity,
        }
    }
}

fn display_tool_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "not resolved".to_string(),
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string())
}

pub type Result<T> = std::result::Result<T, ShortsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let missing = ShortsError::MissingTool { tool: "ffmpeg", path: None };
        assert_eq!(missing.kind(), ErrorKind::Config);
        assert_eq!(ShortsError::FileNotFound(PathBuf::from("a.mp4")).kind(), ErrorKind::Input);
        assert_eq!(ShortsError::EmptyOutput(PathBuf::from("out.mp4")).kind(), ErrorKind::Integrity);

        let failed = ShortsError::Process {
            stage: "Background preparation".to_string(),
            code: Some(1),
            stderr: "boom".to_string(),
        };
        assert_eq!(failed.kind(), ErrorKind::Process);
        assert_eq!(failed.to_string(), "Background preparation failed (exit code 1): boom");
    }

    #[test]
    fn test_missing_tool_message() {
        let err = ShortsError::MissingTool { tool: "ffprobe", path: None };
        assert_eq!(err.to_string(), "Invalid or missing ffprobe executable: not resolved");
    }
}
