use chrono::NaiveDate;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_appender::non_blocking::WorkerGuard;
use anyhow::Result;
use crate::config::LoggingSettings;

const DEFAULT_LOG_STEM: &str = "iqx-terminal-ops";

/// Name of the log file written on `date`: the configured `file` (without a `.log` suffix) or the application name,
/// followed by the date.
pub fn log_file_name(file: Option<&str>, date: NaiveDate) -> String {
    let stem = file
        .map(str::trim)
        .map(|name| name.strip_suffix(".log").unwrap_or(name))
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_LOG_STEM);
    format!("{}_{}.log", stem, date.format("%Y-%m-%d"))
}

/// Initializes the logging system for the application
///
/// Events always go to stdout. When `settings.path` is set they are also written, without ANSI colours, to
/// [`log_file_name`] inside that directory. `RUST_LOG` overrides `settings.level`; `sqlx` is capped at `warn`.
///
/// # Arguments
///
/// * `settings`: The logging section of the application settings
///
/// # Returns
///
/// * `Ok(Some(WorkerGuard))`: A file appender was installed; keep the guard alive to flush it on exit
/// * `Ok(None)`: Console logging only
/// * `Err(anyhow::Error)`: The filter is invalid, the directory cannot be created, or a subscriber is already set
pub fn init_logger(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},sqlx=warn", settings.level)))?;

    let format = fmt::format()
        .with_timer(fmt::time::LocalTime::rfc_3339())
        .compact()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    let console_layer = fmt::Layer::default()
        .event_format(format.clone().with_ansi(true))
        .with_writer(std::io::stdout);
    let registry = tracing_subscriber::registry().with(env_filter).with(console_layer);

    let Some(dir) = settings.path.as_ref() else {
        tracing::subscriber::set_global_default(registry)?;
        tracing::info!("Logging initialized (console only)");
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let file_name = log_file_name(settings.file.as_deref(), chrono::Local::now().date_naive());
    let (writer, guard) = tracing_appender::non_blocking(RollingFileAppender::new(Rotation::NEVER, dir, &file_name));
    let file_layer = fmt::Layer::default().event_format(format).with_writer(writer);

    tracing::subscriber::set_global_default(registry.with(file_layer))?;
    tracing::info!(log_dir = %dir.display(), log_file = %file_name, "Logging initialized");
    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_file_name_is_used_as_stem() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(log_file_name(Some("gate-ops.log"), date), "gate-ops_2024-03-09.log");
        assert_eq!(log_file_name(Some("gate-ops"), date), "gate-ops_2024-03-09.log");
        assert_eq!(log_file_name(None, date), "iqx-terminal-ops_2024-03-09.log");
        assert_eq!(log_file_name(Some("  "), date), "iqx-terminal-ops_2024-03-09.log");
    }
}
