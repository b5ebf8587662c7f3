//! Structured logging bootstrap.
//!
//! Builds a tracing subscriber from [`LogConfig`]: an `EnvFilter` seeded
//! from the configured level (overridable with `RUST_LOG`), plus one
//! formatting layer per output target.

mod config;

pub use config::{LogConfig, LogFormat, LogOutput, RotationConfig};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Initializes the logging system with the given configuration.
///
/// Returns guards that must be kept alive for the duration of the
/// program so buffered file output is flushed.
///
/// # Errors
///
/// Returns `LoggingError` if a global subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use courier_telemetry::{init_logging, LogConfig};
///
/// let _guards = init_logging(&LogConfig::default()).expect("logging init");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    let mut guards = Vec::new();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let mut layers: Vec<Box<dyn Layer<_> + Send + Sync>> = Vec::new();

    for output in &config.outputs {
        match output {
            LogOutput::Stdout => {
                layers.push(stdout_layer(config));
            }
            LogOutput::File { path, rotation } => {
                let (layer, guard) = file_layer(config, path, rotation.as_ref());
                layers.push(layer);
                guards.push(guard);
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::InitFailed(e.to_string()))?;

    Ok(guards)
}

fn stdout_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info);

    match config.format {
        LogFormat::Json => base.json().flatten_event(true).boxed(),
        LogFormat::Pretty => base.boxed(),
    }
}

fn file_layer<S>(
    config: &LogConfig,
    path: &str,
    rotation: Option<&RotationConfig>,
) -> (Box<dyn Layer<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync + 'static,
{
    let appender = rotation.map_or_else(
        || tracing_appender::rolling::daily(path, "courier.log"),
        |rot| match rot {
            RotationConfig::Hourly => tracing_appender::rolling::hourly(path, "courier.log"),
            RotationConfig::Daily => tracing_appender::rolling::daily(path, "courier.log"),
            RotationConfig::Never => tracing_appender::rolling::never(path, "courier.log"),
        },
    );

    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let base = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info);

    let layer = match config.format {
        LogFormat::Json => base.json().flatten_event(true).boxed(),
        LogFormat::Pretty => base.boxed(),
    };

    (layer, guard)
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// A global subscriber was already installed.
    #[error("Failed to initialize logging: {0}")]
    InitFailed(String),
}
