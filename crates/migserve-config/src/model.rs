use std::path::PathBuf;

use migserve_common::{Error, LocationField, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STATUS_CODE: u16 = 202;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

/// Listening address and response shape of the listing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub location_field: LocationField,
    pub status_code: u16,
    /// Log every incoming request at info level.
    pub log_requests: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            location_field: LocationField::default(),
            status_code: DEFAULT_STATUS_CODE,
            log_requests: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::Config("server.host cannot be empty".into()));
        }
        if !(200..300).contains(&self.server.status_code) {
            return Err(Error::Config(format!(
                "server.status_code must be a 2xx code, got {}",
                self.server.status_code
            )));
        }
        Ok(())
    }
}
