//! Logging config and setup

mod defaults;
mod log_rotation_kind;
mod parsers;

pub use log_rotation_kind::LogRotationKind;
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::Path;
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE_PREFIX: &str = "schema_contracts";

/// Logging related options
#[derive(Debug, Deserialize, JsonSchema)]
pub struct Logging {
    /// The log level to use for tracing
    #[serde(
        default = "defaults::log_level",
        deserialize_with = "parsers::from_str"
    )]
    #[schemars(schema_with = "level")]
    pub level: Level,

    /// A directory to write log files to instead of stderr
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Log file rotation period to use when a log path is provided
    /// [default: Daily]
    #[serde(default = "defaults::rotation")]
    pub rotation: LogRotationKind,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            path: None,
            rotation: defaults::rotation(),
        }
    }
}

impl Logging {
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::from_default_env().add_directive(self.level.into())
    }

    /// Install the global subscriber, writing to a rolling file when a path is configured
    ///
    /// The returned guard flushes the file writer when dropped.
    pub fn setup(&self) -> Result<Option<WorkerGuard>, anyhow::Error> {
        match &self.path {
            Some(path) => self.setup_file_logging(path),
            None => self.setup_stderr_logging(),
        }
    }

    /// Sets up rolling file appender logging but falls back to stderr logging on failure
    fn setup_file_logging(&self, log_path: &Path) -> Result<Option<WorkerGuard>, anyhow::Error> {
        if let Err(error) = std::fs::create_dir_all(log_path) {
            eprintln!("Could not create log directory ({error}) - falling back to stderr");
            return self.setup_stderr_logging();
        }

        let (non_blocking_writer, guard) = match RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .build(log_path)
        {
            Ok(appender) => tracing_appender::non_blocking(appender),
            Err(error) => {
                eprintln!("Log file setup failed ({error}) - falling back to stderr");
                return self.setup_stderr_logging();
            }
        };

        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking_writer)
                    .with_ansi(false)
                    .with_target(false),
            )
            .try_init()?;

        Ok(Some(guard))
    }

    /// Stdout carries command output, so logs go to stderr
    fn setup_stderr_logging(&self) -> Result<Option<WorkerGuard>, anyhow::Error> {
        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(false),
            )
            .try_init()?;

        Ok(None)
    }
}

fn level(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    /// Log level
    #[derive(JsonSchema)]
    #[schemars(rename_all = "lowercase")]
    // Only used to generate the schema
    #[allow(dead_code)]
    enum Level {
        Trace,
        Debug,
        Info,
        Warn,
        Error,
    }

    Level::json_schema(generator)
}
