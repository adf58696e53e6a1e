//! Logging Configuration and Initialization
//!
//! One `tracing` subscriber for every SWAPI ETL binary: console and/or a
//! daily-rolled file, text or JSON lines, filtered by level plus optional
//! extra directives. Environment variables override whatever the binary
//! configured in code.
//!
//! Use the structured macros with fields rather than `println!`:
//!
//! ```rust,ignore
//! info!(table = %name, rows = table.num_rows(), "Loaded table");
//! ```
//!
//! # Example
//!
//! ```no_run
//! use swapi_common::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::from_env().unwrap_or_default();
//! init_logging(&config).ok();
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::env;
use crate::error::{Result, SwapiError};

/// Look `raw` up in a table of accepted spellings, case-insensitively.
fn choose<T: Copy>(var: &str, raw: &str, choices: &[(&str, T)]) -> Result<T> {
    let wanted = raw.trim().to_lowercase();
    choices
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, value)| *value)
        .ok_or_else(|| {
            let accepted: Vec<&str> = choices.iter().map(|(name, _)| *name).collect();
            SwapiError::invalid_var(var, raw, format!("expected one of {}", accepted.join(", ")))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const CHOICES: &'static [(&'static str, LogLevel)] = &[
        ("trace", LogLevel::Trace),
        ("debug", LogLevel::Debug),
        ("info", LogLevel::Info),
        ("warn", LogLevel::Warn),
        ("warning", LogLevel::Warn),
        ("error", LogLevel::Error),
    ];

    pub fn as_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = SwapiError;

    fn from_str(s: &str) -> Result<Self> {
        choose("LOG_LEVEL", s, Self::CHOICES)
    }
}

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

impl LogOutput {
    const CHOICES: &'static [(&'static str, LogOutput)] = &[
        ("console", LogOutput::Console),
        ("stdout", LogOutput::Console),
        ("file", LogOutput::File),
        ("both", LogOutput::Both),
    ];

    fn console(self) -> bool {
        self != LogOutput::File
    }

    fn file(self) -> bool {
        self != LogOutput::Console
    }
}

impl std::str::FromStr for LogOutput {
    type Err = SwapiError;

    fn from_str(s: &str) -> Result<Self> {
        choose("LOG_OUTPUT", s, Self::CHOICES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = SwapiError;

    fn from_str(s: &str) -> Result<Self> {
        choose("LOG_FORMAT", s, &[("text", LogFormat::Text), ("json", LogFormat::Json)])
    }
}

/// Subscriber settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,

    /// Only read when `output` includes the file
    pub dir: PathBuf,

    /// Rolled files are named `<prefix>.<date>`
    pub file_prefix: String,

    /// Extra directives such as `sqlx=warn` or `aws_smithy_runtime=info`
    pub directives: Vec<String>,

    pub with_location: bool,
    pub with_thread_ids: bool,
    pub with_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            output: LogOutput::default(),
            format: LogFormat::default(),
            dir: PathBuf::from("./logs"),
            file_prefix: "swapi-etl".to_string(),
            directives: Vec::new(),
            with_location: false,
            with_thread_ids: false,
            with_targets: true,
        }
    }
}

impl LogConfig {
    /// Apply `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`,
    /// `LOG_FILE_PREFIX`, `LOG_FILTER` (comma separated directives),
    /// `LOG_INCLUDE_LOCATION`, `LOG_INCLUDE_THREAD_IDS` and
    /// `LOG_INCLUDE_TARGETS` on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(raw) = env::optional("LOG_LEVEL") {
            self.level = raw.parse()?;
        }
        if let Some(raw) = env::optional("LOG_OUTPUT") {
            self.output = raw.parse()?;
        }
        if let Some(raw) = env::optional("LOG_FORMAT") {
            self.format = raw.parse()?;
        }
        if let Some(dir) = env::optional("LOG_DIR") {
            self.dir = PathBuf::from(dir);
        }
        if let Some(prefix) = env::optional("LOG_FILE_PREFIX") {
            self.file_prefix = prefix;
        }
        if let Some(filter) = env::optional("LOG_FILTER") {
            self.directives = split_directives(&filter);
        }
        self.with_location = env::flag_or("LOG_INCLUDE_LOCATION", self.with_location)?;
        self.with_thread_ids = env::flag_or("LOG_INCLUDE_THREAD_IDS", self.with_thread_ids)?;
        self.with_targets = env::flag_or("LOG_INCLUDE_TARGETS", self.with_targets)?;

        Ok(self)
    }

    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }
}

fn split_directives(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dir = dir.into();
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.config.directives.push(directive.into());
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the filter: `RUST_LOG`, then the configured level, then directives.
fn env_filter(config: &LogConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env().add_directive(config.level.as_level().into());

    for raw in &config.directives {
        let directive: Directive = raw
            .parse()
            .map_err(|e| SwapiError::invalid_var("LOG_FILTER", raw.clone(), format!("{}", e)))?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.output.console() {
        layers.push(fmt_layer(config, std::io::stdout, true));
    }

    if config.output.file() {
        std::fs::create_dir_all(&config.dir).map_err(|e| {
            SwapiError::Logging(format!("cannot create {}: {}", config.dir.display(), e))
        })?;

        let appender = tracing_appender::rolling::daily(&config.dir, &config.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        // Lives for the rest of the process so buffered lines are flushed.
        std::mem::forget(guard);

        layers.push(fmt_layer(config, writer, false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| SwapiError::Logging(e.to_string()))
}

fn fmt_layer<W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(config.with_targets)
        .with_thread_ids(config.with_thread_ids)
        .with_file(config.with_location)
        .with_line_number(config.with_location)
        .with_span_events(FmtSpan::CLOSE);

    match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.boxed(),
    }
}
