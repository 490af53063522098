use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::ToolsConfig;
use crate::error::{Result, ShortsError};
use crate::media::{CommandRunner, MediaCommand};

/// Resolved locations of the processor (ffmpeg) and prober (ffprobe).
///
/// `None` means the tool could not be found; callers treat that as a
/// precondition failure of whatever operation needs the tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPaths {
    pub processor: Option<PathBuf>,
    pub prober: Option<PathBuf>,
}

impl ToolPaths {
    pub fn new(processor: Option<PathBuf>, prober: Option<PathBuf>) -> Self {
        Self { processor, prober }
    }

    pub fn processor(&self) -> Option<&Path> {
        self.processor.as_deref()
    }

    pub fn prober(&self) -> Option<&Path> {
        self.prober.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.processor.is_some() && self.prober.is_some()
    }
}

/// Where bundled tools are searched for, depending on how we were launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Installed/extracted binary; tools ship next to the executable
    Packaged(PathBuf),
    /// Built from a checkout; tools live under the crate root
    Source(PathBuf),
}

impl DeploymentMode {
    /// A binary running from inside this crate's `target/` tree is a source run.
    pub fn detect() -> Self {
        let crate_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        match exe_dir {
            Some(dir) if dir.starts_with(crate_root.join("target")) => {
                debug!("Resource path: running from source, base = {}", crate_root.display());
                DeploymentMode::Source(crate_root)
            }
            Some(dir) => {
                debug!("Resource path: running packaged, base = {}", dir.display());
                DeploymentMode::Packaged(dir)
            }
            None => DeploymentMode::Source(crate_root),
        }
    }

    pub fn base_dir(&self) -> &Path {
        match self {
            DeploymentMode::Packaged(dir) | DeploymentMode::Source(dir) => dir,
        }
    }
}

/// Platform file name for a bare tool name
pub fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Finds the tool pair: bundled `bin/` first, then the environment
/// override, then `PATH`. Each tool is resolved independently.
#[derive(Debug, Clone)]
pub struct ExecutableResolver {
    base_dir: PathBuf,
    config: ToolsConfig,
    processor_override: Option<OsString>,
    prober_override: Option<OsString>,
    search_path: Option<OsString>,
}

impl ExecutableResolver {
    /// Resolver with no environment override and no PATH to search
    pub fn new<P: Into<PathBuf>>(base_dir: P, config: ToolsConfig) -> Self {
        Self {
            base_dir: base_dir.into(),
            config,
            processor_override: None,
            prober_override: None,
            search_path: None,
        }
    }

    /// Resolver reading the real process environment
    pub fn from_environment(config: ToolsConfig) -> Self {
        let processor_override = std::env::var_os(&config.processor_env);
        let prober_override = std::env::var_os(&config.prober_env);
        let base_dir = DeploymentMode::detect().base_dir().to_path_buf();

        Self::new(base_dir, config)
            .with_overrides(processor_override, prober_override)
            .with_search_path(std::env::var_os("PATH"))
    }

    pub fn with_overrides(mut self, processor: Option<OsString>, prober: Option<OsString>) -> Self {
        self.processor_override = processor;
        self.prober_override = prober;
        self
    }

    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn bundled_path(&self, name: &str) -> PathBuf {
        self.base_dir.join("bin").join(executable_name(name))
    }

    pub fn resolve(&self) -> ToolPaths {
        info!("Searching for {}/{} executables...", self.config.processor_name, self.config.prober_name);

        let processor = self.resolve_tool(
            &self.config.processor_name,
            &self.config.processor_env,
            self.processor_override.as_ref(),
        );
        let prober = self.resolve_tool(
            &self.config.prober_name,
            &self.config.prober_env,
            self.prober_override.as_ref(),
        );

        ToolPaths { processor, prober }
    }

    fn resolve_tool(&self, name: &str, env_name: &str, env_value: Option<&OsString>) -> Option<PathBuf> {
        let bundled = self.bundled_path(name);
        debug!("Checking bundled path: {}", bundled.display());
        if bundled.is_file() {
            info!("Found bundled {}: {}", name, bundled.display());
            return Some(bundled);
        }

        if let Some(value) = env_value {
            let candidate = PathBuf::from(value);
            if candidate.is_file() {
                info!("Found {} via {}: {}", name, env_name, candidate.display());
                return Some(candidate);
            }
            warn!("{} is set but does not name a file: {}", env_name, candidate.display());
        }

        if let Some(search_path) = &self.search_path {
            let cwd = std::env::current_dir().unwrap_or_else(|_| self.base_dir.clone());
            match which::which_in(name, Some(search_path), cwd) {
                Ok(found) => {
                    info!("Found {} via system PATH: {}", name, found.display());
                    return Some(found);
                }
                Err(e) => debug!("{} not found on PATH: {}", name, e),
            }
        }

        error!("{} executable could NOT be located (bundled, {}, PATH)", name, env_name);
        None
    }
}

/// Run `<tool> -version` and return the banner's first line.
///
/// The output must mention `expected_name` (the bare tool name, e.g.
/// `ffmpeg`) and "version", which keeps an unrelated executable dropped in
/// `bin/` from being accepted while allowing renamed builds like `ffmpeg7`.
pub async fn verify_tool(path: &Path, expected_name: &str, runner: &dyn CommandRunner) -> Result<String> {
    if !path.is_file() {
        warn!("Verification skipped: {} does not exist", path.display());
        return Err(ShortsError::FileNotFound(path.to_path_buf()));
    }

    let name = expected_name.to_lowercase();

    let command = MediaCommand::new(path, "Version check").arg("-version");
    let output = runner.run(&command).await?;

    let combined = format!("{}\n{}", output.stdout, output.stderr).to_lowercase();
    if output.success && combined.contains(&name) && combined.contains("version") {
        let banner = output
            .stdout
            .lines()
            .chain(output.stderr.lines())
            .find(|line| !line.trim().is_empty())
            .unwrap_or("unknown version")
            .trim()
            .to_string();
        debug!("Verification successful for {}: {}", path.display(), banner);
        Ok(banner)
    } else {
        warn!("Verification failed for {} (exit code {:?})", path.display(), output.code);
        Err(ShortsError::Process {
            stage: "Version check".to_string(),
            code: output.code,
            stderr: output.stderr,
        })
    }
}
