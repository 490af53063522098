use std::fmt;
use std::path::{Path, PathBuf};

/// A single filter with `key=value` arguments, e.g. `scale=w=1080:h=1920`.
///
/// Argument values are inserted verbatim; callers escape anything that
/// collides with filtergraph syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: String,
    args: Vec<(String, String)>,
}

impl Filter {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.args.push((key.into(), value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the first argument named `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (index, (key, value)) in self.args.iter().enumerate() {
            let sep = if index == 0 { '=' } else { ':' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}

/// Linear chain of filters applied to one stream, optionally with pad labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    inputs: Vec<String>,
    filters: Vec<Filter>,
    outputs: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input pad label such as `0:v`
    pub fn input<S: Into<String>>(mut self, label: S) -> Self {
        self.inputs.push(label.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an output pad label such as `vout`
    pub fn output<S: Into<String>>(mut self, label: S) -> Self {
        self.outputs.push(label.into());
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.inputs {
            write!(f, "[{}]", label)?;
        }
        let rendered: Vec<String> = self.filters.iter().map(Filter::to_string).collect();
        f.write_str(&rendered.join(","))?;
        for label in &self.outputs {
            write!(f, "[{}]", label)?;
        }
        Ok(())
    }
}

/// Several labeled chains joined with `;`, used with `-filter_complex`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain: FilterChain) -> Self {
        self.chains.push(chain);
        self
    }

    pub fn chains(&self) -> &[FilterChain] {
        &self.chains
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.chains.iter().map(FilterChain::to_string).collect();
        f.write_str(&rendered.join(";"))
    }
}

/// Abstract media processing command representation
///
/// Building a command is pure; running it is the job of a
/// [`CommandRunner`](super::CommandRunner). Arguments are kept in order, so
/// per-input options must be added right before the matching `input` call.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub binary_path: PathBuf,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<P: Into<PathBuf>, S: Into<String>>(binary_path: P, description: S) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Repeat the next input `count` additional times
    pub fn stream_loop(self, count: u64) -> Self {
        self.arg("-stream_loop").arg(count.to_string())
    }

    /// Limit duration; placed before an input it trims that input, after all
    /// inputs it caps the output
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(format!("{:.4}", seconds))
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn audio_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-b:a").arg(bitrate)
    }

    pub fn preset<S: Into<String>>(self, preset: S) -> Self {
        self.arg("-preset").arg(preset)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.arg("-crf").arg(crf.to_string())
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Add video filter chain
    pub fn video_filter(self, chain: &FilterChain) -> Self {
        self.arg("-vf").arg(chain.to_string())
    }

    pub fn filter_complex(self, graph: &FilterGraph) -> Self {
        self.arg("-filter_complex").arg(graph.to_string())
    }

    /// Select a stream specifier or a filtergraph output label for the output
    pub fn map<S: AsRef<str>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream.as_ref())
    }

    /// Stop the output when the shortest stream ends
    pub fn shortest(self) -> Self {
        self.arg("-shortest")
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value following the first occurrence of `flag`
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Arguments that appear before the first `-i`
    pub fn input_options(&self) -> &[String] {
        let end = self.args.iter().position(|a| a == "-i").unwrap_or(0);
        &self.args[..end]
    }

    /// Shell-like rendering for logs
    pub fn command_line(&self) -> String {
        let mut parts = vec![quote_for_log(&self.binary_path.to_string_lossy())];
        parts.extend(self.args.iter().map(|a| quote_for_log(a)));
        parts.join(" ")
    }
}

fn quote_for_log(part: &str) -> String {
    if part.is_empty() || part.contains(char::is_whitespace) || part.contains(';') {
        format!("\"{}\"", part.replace('"', "\\\""))
    } else {
        part.to_string()
    }
}
