use crate::telemetry::logging::LogConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const WORLD_FILE: &str = "world.yaml";

/// Optional `world.yaml` under the data root. Every key may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldFile {
    pub tick_ms: u64,
    pub maintenance_secs: u64,
    pub cycle_secs: u64,
    pub cycles_per_season: u64,
    pub default_map: String,
    pub attitude_cache_size: usize,
    pub log_level: String,
    pub rng_seed: Option<u64>,
}

impl Default for WorldFile {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            maintenance_secs: 60,
            cycle_secs: 600,
            cycles_per_season: 30,
            default_map: "start".to_string(),
            attitude_cache_size: crate::entities::owner::DEFAULT_ATTITUDE_CACHE,
            log_level: "info".to_string(),
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root: PathBuf,
    pub tick_length: Duration,
    pub maintenance_interval: Duration,
    pub cycle_length: Duration,
    pub cycles_per_season: u64,
    pub default_map: String,
    pub attitude_cache_size: usize,
    pub log: LogConfig,
    pub rng_seed: Option<u64>,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        Self::from_parts(args, |key| std::env::var(key).ok())
    }

    /// `args[1]` is the data root, `args[2]` optionally names the default
    /// map. Precedence: arguments, then `TILEWORLD_*` variables, then
    /// `world.yaml`, then built-in defaults.
    pub fn from_parts<F>(args: &[String], env: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if args.len() < 2 {
            return Err("usage: tileworld <data-root> [default-map]".to_string());
        }
        let root = Path::new(&args[1]).to_path_buf();
        let mut file = load_world_file(&root)?;

        let env = |key: &str| {
            env(key).and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };
        if let Some(value) = env("TILEWORLD_TICK_MS") {
            file.tick_ms = parse_number("TILEWORLD_TICK_MS", &value)?;
        }
        if let Some(value) = env("TILEWORLD_MAINTENANCE_SECS") {
            file.maintenance_secs = parse_number("TILEWORLD_MAINTENANCE_SECS", &value)?;
        }
        if let Some(value) = env("TILEWORLD_CYCLE_SECS") {
            file.cycle_secs = parse_number("TILEWORLD_CYCLE_SECS", &value)?;
        }
        if let Some(value) = env("TILEWORLD_SEED") {
            file.rng_seed = Some(parse_number("TILEWORLD_SEED", &value)?);
        }
        if let Some(value) = env("TILEWORLD_LOG") {
            file.log_level = value;
        }
        if let Some(value) = env("TILEWORLD_DEFAULT_MAP") {
            file.default_map = value;
        }
        if let Some(map) = args.get(2) {
            file.default_map = map.clone();
        }

        Ok(Self {
            root,
            tick_length: Duration::from_millis(file.tick_ms.max(1)),
            maintenance_interval: Duration::from_secs(file.maintenance_secs),
            cycle_length: Duration::from_secs(file.cycle_secs),
            cycles_per_season: file.cycles_per_season,
            default_map: file.default_map,
            attitude_cache_size: file.attitude_cache_size.max(1),
            log: LogConfig {
                level: file.log_level,
            },
            rng_seed: file.rng_seed,
        })
    }
}

fn load_world_file(root: &Path) -> Result<WorldFile, String> {
    let path = root.join(WORLD_FILE);
    if !path.is_file() {
        return Ok(WorldFile::default());
    }
    let contents = std::fs::read_to_string(&path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
    serde_yaml::from_str(&contents)
        .map_err(|err| format!("failed to parse {}: {}", path.display(), err))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {} '{}'", key, value))
}
