use std::path::{Path, PathBuf};

use migserve_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

const CONFIG_FILENAMES: [&str; 3] = ["config.yml", "config.yaml", "config.toml"];

/// Loads `AppConfig` from disk and the environment.
///
/// Precedence, lowest first: built-in defaults, config file, `MIGSERVE_*`
/// environment variables. Command-line flags are applied by the caller.
pub struct ConfigLoader {
    config_dir: PathBuf,
    explicit_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_dir: Self::default_config_dir(),
            explicit_path: None,
        }
    }

    pub fn with_config_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: dir.into(),
            explicit_path: None,
        }
    }

    /// Use a specific file instead of searching the config directory.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".migserve")
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn load(&self) -> Result<AppConfig> {
        let mut config = match self.locate()? {
            Some(path) => {
                info!("loading config from {}", path.display());
                load_file(&path)?
            }
            None => {
                debug!(
                    "no config file in {}, using defaults",
                    self.config_dir.display()
                );
                AppConfig::default()
            }
        };

        apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn locate(&self) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.explicit_path {
            if !path.is_file() {
                return Err(Error::NotFound(format!(
                    "config file {}",
                    path.display()
                )));
            }
            return Ok(Some(path.clone()));
        }

        Ok(CONFIG_FILENAMES
            .iter()
            .map(|name| self.config_dir.join(name))
            .find(|p| p.is_file()))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn load_file(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "yml" | "yaml" => serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("YAML parse error: {e}"))),
        "toml" => toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("TOML parse error: {e}"))),
        other => Err(Error::Config(format!(
            "unsupported config extension: {other}"
        ))),
    }
}

/// Override fields from `MIGSERVE_*` variables resolved through `lookup`.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("MIGSERVE_HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("MIGSERVE_PORT") {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("MIGSERVE_PORT: {e}")))?;
    }
    if let Some(field) = lookup("MIGSERVE_LOCATION_FIELD") {
        config.server.location_field = field
            .parse()
            .map_err(|e| Error::Config(format!("MIGSERVE_LOCATION_FIELD: {e}")))?;
    }
    if let Some(code) = lookup("MIGSERVE_STATUS_CODE") {
        config.server.status_code = code
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("MIGSERVE_STATUS_CODE: {e}")))?;
    }
    if let Some(flag) = lookup("MIGSERVE_LOG_REQUESTS") {
        config.server.log_requests = parse_bool(&flag).ok_or_else(|| {
            Error::Config(format!("MIGSERVE_LOG_REQUESTS: invalid boolean `{flag}`"))
        })?;
    }
    if let Some(path) = lookup("MIGSERVE_DB_PATH") {
        config.database.path = Some(PathBuf::from(path));
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
