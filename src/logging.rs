use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Env var naming a log file; takes precedence over `logging.file`.
pub const LOG_ENV_VAR: &str = "KASHFLOW_LOG";

/// Where log output should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Disabled,
    Stderr,
    File(PathBuf),
}

/// Pick the log target: `KASHFLOW_LOG`, then the config file setting, then
/// stderr if `verbose`, otherwise nothing.
pub fn resolve_target(config: &LoggingConfig, env_path: Option<String>, verbose: bool) -> LogTarget {
    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return LogTarget::File(PathBuf::from(path));
    }
    if let Some(path) = &config.file {
        return LogTarget::File(path.clone());
    }
    if verbose {
        return LogTarget::Stderr;
    }
    LogTarget::Disabled
}

/// Initialize tracing.
///
/// Logging is disabled by default so state output on stdout stays clean.
/// File logs get a unique `{path}.{timestamp}.{pid}` name so concurrent
/// processes don't clobber each other. `RUST_LOG` overrides the filter.
pub fn init_tracing(config: &LoggingConfig, verbose: bool) {
    let target = resolve_target(config, std::env::var(LOG_ENV_VAR).ok(), verbose);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    match target {
        LogTarget::Disabled => {}
        LogTarget::Stderr => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(true);
            let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
        }
        LogTarget::File(path) => {
            let pid = std::process::id();
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let unique_path = format!("{}.{}.{}", path.display(), timestamp, pid);

            let Ok(file) = std::fs::File::create(&unique_path) else {
                eprintln!("Warning: Failed to create log file: {}", unique_path);
                return;
            };

            let layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_level(true);
            let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_wins_over_config() {
        let config = LoggingConfig {
            file: Some(PathBuf::from("/tmp/from-config.log")),
            ..LoggingConfig::default()
        };
        let target = resolve_target(&config, Some("/tmp/from-env.log".to_string()), true);
        assert_eq!(target, LogTarget::File(PathBuf::from("/tmp/from-env.log")));
    }

    #[test]
    fn verbose_falls_back_to_stderr() {
        let config = LoggingConfig::default();
        assert_eq!(resolve_target(&config, None, true), LogTarget::Stderr);
        assert_eq!(resolve_target(&config, Some(String::new()), false), LogTarget::Disabled);
    }
}
