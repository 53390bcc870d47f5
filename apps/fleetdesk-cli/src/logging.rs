use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{ConfigError, LogFormat, LoggingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber: stderr always, a daily-rotated file when
/// configured. Keep the returned guard alive until exit so the file writer
/// flushes.
///
/// # Errors
/// [`ConfigError::Logging`] for invalid filter directives, a file path
/// without a file name, or a subscriber that is already installed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.console_level))
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = vec![
        format_layer(config.format, std::io::stderr, true)
            .with_filter(console_filter)
            .boxed(),
    ];

    let guard = match &config.file {
        Some(path) => {
            let file_filter = EnvFilter::try_new(&config.file_level)
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let prefix = path.file_name().ok_or_else(|| {
                ConfigError::Logging(format!("log file has no file name: {}", path.display()))
            })?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, prefix));
            layers.push(
                format_layer(config.format, writer, false)
                    .with_filter(file_filter)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;
    Ok(guard)
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}
