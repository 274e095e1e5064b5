//! Error types for the plugin utilities.

use std::path::PathBuf;

/// Errors raised by the plugin-facing utilities (files, messages, options).
#[derive(Debug, thiserror::Error)]
pub enum UtilsError {
    /// Filesystem access failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A data or descriptor file could not be parsed
    #[error("Failed to read {path}: {source}")]
    TomlRead {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// A data file could not be serialized
    #[error("Failed to serialize {path}: {source}")]
    TomlWrite {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },
    /// A file helper was used before `UtilPlugin::initialize_resources`
    #[error("Plugin utilities were not loaded properly. Call initialize_resources before using this function.")]
    NotInitialized,
    /// No message is mapped to the requested key
    #[error("Message key not found: {0}")]
    MissingMessage(String),
    /// A stored value has an unexpected type
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    /// The update checker could not be constructed
    #[error("Update checker setup failed: {0}")]
    UpdateCheck(#[from] UpdateCheckError),
}

impl UtilsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Reasons a remote update check produced no result.
///
/// These never reach players; the checker logs them and hands `None` to the
/// caller, which simply waits for the next scheduled check.
#[derive(Debug, thiserror::Error)]
pub enum UpdateCheckError {
    /// Connection failure or timeout
    #[error("Could not connect to the update API: {0}")]
    Network(#[from] reqwest::Error),
    /// The API answered with a non-success status
    #[error("Update API returned HTTP {0}")]
    Status(u16),
    /// The body was not valid JSON or did not match the expected schema
    #[error("Malformed update API response: {0}")]
    Parse(#[from] serde_json::Error),
    /// No plugin is listed under the slug
    #[error("No data was found for the plugin slug: {slug}")]
    NoData { slug: String },
    /// More than one plugin matches the slug
    #[error("Multiple plugins ({count}) found under the slug: {slug}")]
    Ambiguous { slug: String, count: usize },
    /// The plugin has no version published on the release channel
    #[error("No release version is published for the slug: {slug}")]
    MissingRelease { slug: String },
}
