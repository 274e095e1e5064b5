//! Version data published for a plugin.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Release maturity tier a version is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    Alpha,
    Beta,
    Release,
    Latest,
}

impl ReleaseChannel {
    /// Every channel, in the order the API documents them.
    pub const ALL: [ReleaseChannel; 4] = [
        ReleaseChannel::Alpha,
        ReleaseChannel::Beta,
        ReleaseChannel::Release,
        ReleaseChannel::Latest,
    ];

    /// Lower-case wire name, as used for keys in the API's `versions` object.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseChannel::Alpha => "alpha",
            ReleaseChannel::Beta => "beta",
            ReleaseChannel::Release => "release",
            ReleaseChannel::Latest => "latest",
        }
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single published version on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginVersion {
    version: String,
    channel: ReleaseChannel,
}

impl PluginVersion {
    pub fn new(version: impl Into<String>, channel: ReleaseChannel) -> Self {
        Self {
            version: version.into(),
            channel,
        }
    }

    /// The version identifier exactly as published.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn channel(&self) -> ReleaseChannel {
        self.channel
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.channel)
    }
}

/// Versions published on each channel for one plugin. A channel with no
/// data is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSet {
    alpha: Option<PluginVersion>,
    beta: Option<PluginVersion>,
    release: Option<PluginVersion>,
    latest: Option<PluginVersion>,
}

impl VersionSet {
    pub fn new(
        alpha: Option<PluginVersion>,
        beta: Option<PluginVersion>,
        release: Option<PluginVersion>,
        latest: Option<PluginVersion>,
    ) -> Self {
        Self {
            alpha,
            beta,
            release,
            latest,
        }
    }

    /// Builds a set from channel-tagged versions. When a channel appears more
    /// than once the last entry wins.
    pub fn from_versions(versions: impl IntoIterator<Item = PluginVersion>) -> Self {
        let mut set = Self::default();
        for version in versions {
            let slot = match version.channel() {
                ReleaseChannel::Alpha => &mut set.alpha,
                ReleaseChannel::Beta => &mut set.beta,
                ReleaseChannel::Release => &mut set.release,
                ReleaseChannel::Latest => &mut set.latest,
            };
            *slot = Some(version);
        }
        set
    }

    pub fn get(&self, channel: ReleaseChannel) -> Option<&PluginVersion> {
        match channel {
            ReleaseChannel::Alpha => self.alpha.as_ref(),
            ReleaseChannel::Beta => self.beta.as_ref(),
            ReleaseChannel::Release => self.release.as_ref(),
            ReleaseChannel::Latest => self.latest.as_ref(),
        }
    }

    /// Last alpha version. Not necessarily the newest build.
    pub fn alpha(&self) -> Option<&PluginVersion> {
        self.alpha.as_ref()
    }

    /// Last beta version. Not necessarily the newest build.
    pub fn beta(&self) -> Option<&PluginVersion> {
        self.beta.as_ref()
    }

    /// Last version published as a full release.
    pub fn release(&self) -> Option<&PluginVersion> {
        self.release.as_ref()
    }

    /// Newest version on any channel.
    pub fn latest(&self) -> Option<&PluginVersion> {
        self.latest.as_ref()
    }

    /// Consumes the set and returns the release slot.
    pub fn into_release(self) -> Option<PluginVersion> {
        self.release
    }
}

/// Outcome of one update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCallback {
    version: PluginVersion,
    is_update: bool,
}

impl UpdateCallback {
    pub fn new(version: PluginVersion, is_update: bool) -> Self {
        Self { version, is_update }
    }

    /// Compares the published release against the running version.
    ///
    /// The comparison is literal: any difference, a downgrade included,
    /// counts as an update.
    pub fn compare(release: PluginVersion, running_version: &str) -> Self {
        let is_update = release.version() != running_version;
        Self::new(release, is_update)
    }

    /// The release-channel version the check found.
    pub fn version(&self) -> &PluginVersion {
        &self.version
    }

    pub fn is_update(&self) -> bool {
        self.is_update
    }
}
