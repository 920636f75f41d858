use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Per-channel tracing targets. Filter them individually, e.g.
/// `info,tileworld::lag=off`.
pub const GAME_TARGET: &str = "tileworld::game";
pub const ERROR_TARGET: &str = "tileworld::error";
pub const LAG_TARGET: &str = "tileworld::lag";
pub const LOAD_TARGET: &str = "tileworld::load";
pub const SESSION_TARGET: &str = "tileworld::session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Installs the global fmt subscriber. `RUST_LOG` wins over the configured
/// level when set. Calling it again is a no-op.
pub fn init(config: &LogConfig) -> Result<(), String> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|err| format!("invalid log level '{}': {}", config.level, err))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| format!("log system init failed: {}", err))?;
    let _ = INSTALLED.set(());
    Ok(())
}

pub fn log_game(message: &str) {
    tracing::info!(target: GAME_TARGET, "{}", message);
}

pub fn log_error(message: &str) {
    tracing::error!(target: ERROR_TARGET, "{}", message);
}

pub fn log_lag(message: &str) {
    tracing::warn!(target: LAG_TARGET, "{}", message);
}

pub fn log_session(message: &str) {
    tracing::info!(target: SESSION_TARGET, "{}", message);
}

/// Periodic load sample: active maps and live objects.
pub fn log_load(active_maps: usize, objects: usize) {
    tracing::debug!(target: LOAD_TARGET, active_maps, objects, "load");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LogConfig {
            level: "tileworld=loud".to_string(),
        };
        assert!(init(&config).is_err());
        assert_eq!(LogConfig::default().level, "info");
    }
}
