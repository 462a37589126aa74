//! Remote migration source.
//!
//! A listing endpoint returns a JSON array of `{ "id", "name", "url" }`
//! objects (the location may also be keyed `file`). Each location is fetched
//! as a SQL script, resolved against the listing URL when relative, and the
//! scripts are applied in `id` order.

use migserve_common::{Error, Result};
use migserve_db::{MigrationOutcome, MigrationStore};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

/// One entry of a remote listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteMigration {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(alias = "file")]
    pub url: String,
}

/// HTTP client for listing endpoints and the scripts they point at.
#[derive(Clone, Default)]
pub struct RemoteSource {
    client: reqwest::Client,
}

impl RemoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch and parse the listing at `listing_url`, sorted by id.
    pub async fn fetch_listing(&self, listing_url: &str) -> Result<Vec<RemoteMigration>> {
        let base = parse_url(listing_url)?;

        let resp = self
            .client
            .get(base.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Remote(format!("failed to fetch listing {base}: {e}")))?;

        let mut files = resp
            .json::<Vec<RemoteMigration>>()
            .await
            .map_err(|e| Error::Remote(format!("invalid listing from {base}: {e}")))?;

        files.sort_by(|a, b| a.id.cmp(&b.id));
        debug!("listing {} returned {} migrations", base, files.len());
        Ok(files)
    }

    /// Download a migration script, resolving `location` against `base`.
    pub async fn fetch_script(&self, base: &Url, location: &str) -> Result<String> {
        let url = base
            .join(location)
            .map_err(|e| Error::InvalidInput(format!("bad migration location `{location}`: {e}")))?;

        self.client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Remote(format!("failed to fetch {url}: {e}")))?
            .text()
            .await
            .map_err(|e| Error::Remote(format!("failed to read {url}: {e}")))
    }

    /// Apply every migration from the listing at `listing_url`.
    ///
    /// Returns `true` if at least one new migration ran.
    pub async fn migrate(&self, store: &MigrationStore, listing_url: &str) -> Result<bool> {
        let base = parse_url(listing_url)?;
        let listing = self.fetch_listing(listing_url).await?;

        let mut did_new_migration = false;
        for migration in listing {
            if store.is_applied(&migration.id)? {
                debug!("migration {} already applied, skipping download", migration.id);
                continue;
            }
            let script = self.fetch_script(&base, &migration.url).await?;
            if store.apply(&migration.id, &script)? == MigrationOutcome::Executed {
                did_new_migration = true;
            }
        }

        info!(
            "remote migration from {} finished (new migrations: {})",
            base, did_new_migration
        );
        Ok(did_new_migration)
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::InvalidInput("migration URL is empty".into()));
    }
    Url::parse(raw).map_err(|e| Error::InvalidInput(format!("invalid migration URL `{raw}`: {e}")))
}
