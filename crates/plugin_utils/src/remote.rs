//! Remote version lookup against the Bukget plugin metadata API.
//!
//! The API is queried with `GET {base}/3/updates?slugs={slug}` and answers
//! with a JSON array:
//!
//! ```json
//! [{
//!     "plugin_name": "My Plugin",
//!     "slug": "myplugin",
//!     "versions": {
//!         "release": { "version": "1.1" },
//!         "latest":  { "version": "1.2-b3" }
//!     }
//! }]
//! ```
//!
//! Bukget refreshes its data every six hours, so results lag behind uploads.
//! Every failure is logged and reported to the caller as `None`; an update
//! check that fails is simply retried on the next scheduled run.

use crate::error::UpdateCheckError;
use crate::version::{PluginVersion, ReleaseChannel, UpdateCallback, VersionSet};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Public Bukget endpoint.
pub const DEFAULT_API_BASE: &str = "http://api.bukget.org";

/// Request timeout used by [`RemoteUpdateChecker::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Lower-cases a slug and strips every space, the form the API indexes by.
pub fn normalize_slug(slug: &str) -> String {
    slug.to_lowercase().replace(' ', "")
}

/// Derives the lookup slug from a plugin's display name.
///
/// If a check reports data for the wrong plugin, the listing knows the
/// plugin under another slug; pass the slug from the listing's page URL
/// instead.
pub fn slug_for_plugin(name: &str) -> String {
    normalize_slug(name)
}

#[derive(Debug, Deserialize)]
struct UpdateEntry {
    #[serde(default)]
    plugin_name: String,
    #[serde(default)]
    slug: String,
    versions: HashMap<String, ChannelEntry>,
}

#[derive(Debug, Deserialize)]
struct ChannelEntry {
    version: String,
}

/// Parses an `updates` response body for `slug`.
///
/// Exactly one entry must match. Channels missing from `versions` are left
/// empty in the returned set.
pub fn parse_version_data(slug: &str, body: &str) -> Result<VersionSet, UpdateCheckError> {
    let mut entries: Vec<UpdateEntry> = serde_json::from_str(body)?;

    match entries.len() {
        0 => Err(UpdateCheckError::NoData {
            slug: slug.to_string(),
        }),
        1 => {
            let entry = entries.remove(0);
            info!(
                "Performing update check for {} with the slug {}",
                entry.plugin_name, entry.slug
            );

            let mut versions = entry.versions;
            let found = ReleaseChannel::ALL.iter().filter_map(|channel| {
                versions
                    .remove(channel.as_str())
                    .map(|data| PluginVersion::new(data.version, *channel))
            });
            Ok(VersionSet::from_versions(found.collect::<Vec<_>>()))
        }
        count => Err(UpdateCheckError::Ambiguous {
            slug: slug.to_string(),
            count,
        }),
    }
}

/// Logs a failed check at the level its cause deserves.
fn log_failure(err: &UpdateCheckError) {
    match err {
        UpdateCheckError::NoData { .. } => {
            info!(
                "{}. If this is a new plugin this is expected, as listings refresh every 6 hours. The update check has failed.",
                err
            );
        }
        UpdateCheckError::Ambiguous { .. } => {
            error!("{}. The update check has failed.", err);
        }
        UpdateCheckError::Network(_) | UpdateCheckError::Status(_) => {
            warn!(
                "Could not reach the update API. The site could be down or there is no internet connection: {}",
                err
            );
        }
        UpdateCheckError::Parse(_) | UpdateCheckError::MissingRelease { .. } => {
            warn!("{}", err);
        }
    }
}

/// Anything that can report the versions published for a slug.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Looks up the published versions, or `None` when no usable data exists.
    async fn version_data(&self, slug: &str) -> Option<VersionSet>;

    /// Compares the published release against `running_version`.
    ///
    /// `None` means "no result, try again later".
    async fn update_check(&self, slug: &str, running_version: &str) -> Option<UpdateCallback> {
        let set = self.version_data(slug).await?;
        match set.into_release() {
            Some(release) => Some(UpdateCallback::compare(release, running_version)),
            None => {
                log_failure(&UpdateCheckError::MissingRelease {
                    slug: normalize_slug(slug),
                });
                None
            }
        }
    }
}

/// HTTP client for the `updates` endpoint.
#[derive(Debug, Clone)]
pub struct RemoteUpdateChecker {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteUpdateChecker {
    /// Checker for the public API with [`DEFAULT_TIMEOUT`].
    pub fn new() -> Result<Self, UpdateCheckError> {
        Self::with_base_url(DEFAULT_API_BASE, DEFAULT_TIMEOUT)
    }

    /// Checker for a mirror or test server.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpdateCheckError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Uses a preconfigured client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request URL for `slug`, normalized.
    pub fn updates_url(&self, slug: &str) -> String {
        format!(
            "{}/3/updates?slugs={}",
            self.base_url.trim_end_matches('/'),
            normalize_slug(slug)
        )
    }

    /// Fetches and parses the versions for `slug`, keeping the failure cause.
    pub async fn fetch_version_data(&self, slug: &str) -> Result<VersionSet, UpdateCheckError> {
        let slug = normalize_slug(slug);
        let url = self.updates_url(&slug);
        debug!("Requesting {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdateCheckError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_version_data(&slug, &body)
    }
}

#[async_trait]
impl VersionSource for RemoteUpdateChecker {
    async fn version_data(&self, slug: &str) -> Option<VersionSet> {
        match self.fetch_version_data(slug).await {
            Ok(set) => Some(set),
            Err(e) => {
                log_failure(&e);
                None
            }
        }
    }
}
