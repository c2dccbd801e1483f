//! Tracing subscriber setup

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Directive, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. When `log_dir` is set a
/// daily rolling file is written in addition to stdout, in the same format.
/// Keep the returned guard alive until shutdown so buffered lines are flushed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let directive: Directive = config.level.parse()?;
    let filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.log_file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        let file_layer =
            writer.map(|w| fmt::layer().json().with_ansi(false).with_writer(w));
        registry
            .with(file_layer)
            .with(fmt::layer().json())
            .try_init()?;
    } else {
        let file_layer = writer.map(|w| fmt::layer().with_ansi(false).with_writer(w));
        registry
            .with(file_layer)
            .with(fmt::layer().with_target(false))
            .try_init()?;
    }

    Ok(guard)
}
