use std::sync::Arc;

use axum::http::StatusCode;
use bytes::Bytes;
use migserve_common::{Catalog, Error, LocationField, Result};
use migserve_config::ServerConfig;

/// Immutable data shared by every request handler.
pub struct AppState {
    pub body: Bytes,
    pub status: StatusCode,
    pub location_field: LocationField,
    pub record_count: usize,
    pub log_requests: bool,
}

impl AppState {
    /// Encode the catalog once; handlers only clone the resulting buffer.
    pub fn new(config: &ServerConfig, catalog: &Catalog) -> Result<Self> {
        let status = StatusCode::from_u16(config.status_code).map_err(|e| {
            Error::Config(format!("invalid status code {}: {e}", config.status_code))
        })?;
        let body = catalog.to_json(config.location_field)?;

        Ok(Self {
            body: Bytes::from(body),
            status,
            location_field: config.location_field,
            record_count: catalog.len(),
            log_requests: config.log_requests,
        })
    }
}

pub type SharedState = Arc<AppState>;
