//! Stored connection profiles
//!
//! Defaults for the auth token and endpoint URLs can be persisted in a TOML
//! file under the user's config directory so they don't have to be passed
//! on every invocation:
//!
//! ```toml
//! [default]
//! auth_token = "..."
//!
//! [staging]
//! auth_token = "..."
//! batch_url = "https://asr.staging.example.com/v2"
//! ```
//!
//! Profiles are named sections; `default` is used when no profile is named.
//! The store is loaded once at startup and handed to
//! [`ConnectionSettings::with_defaults`](crate::settings::ConnectionSettings::with_defaults)
//! as an immutable collaborator.
//!
//! File location:
//! - Linux: `~/.config/skald/config.toml`
//! - macOS: `~/Library/Application Support/skald/config.toml`
//! - Windows: `%APPDATA%\skald\config.toml`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the profile used when none is specified.
pub const DEFAULT_PROFILE: &str = "default";

/// Profile error types
#[derive(Error, Debug)]
pub enum ProfileError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML
    #[error("Invalid profile file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The store cannot be rendered as TOML
    #[error("Failed to serialize profiles: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No config directory on this platform
    #[error("Could not determine the user config directory")]
    NoConfigDir,

    /// Named profile does not exist
    #[error("Profile {0:?} does not exist")]
    UnknownProfile(String),
}

/// Result type for profile operations
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Stored defaults for one profile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Profile {
    /// Default auth token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Default real-time endpoint URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_url: Option<String>,

    /// Default batch endpoint URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_url: Option<String>,

    /// Whether to exchange the token for a temporary key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_temp_token: Option<bool>,
}

impl Profile {
    /// Whether every field is unset.
    pub fn is_empty(&self) -> bool {
        *self == Profile::default()
    }
}

/// All profiles stored in the config file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ProfileStore {
    #[serde(flatten)]
    profiles: BTreeMap<String, Profile>,
}

impl ProfileStore {
    /// Location of the profile file, if the platform has a config dir.
    pub fn default_path() -> ProfileResult<PathBuf> {
        let dir = dirs::config_dir().ok_or(ProfileError::NoConfigDir)?;
        Ok(dir.join("skald").join("config.toml"))
    }

    /// Load the store from the default location.
    ///
    /// A missing file is not an error: it yields an empty store, the same
    /// as a fresh installation.
    pub fn load() -> ProfileResult<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load the store from an explicit path.
    pub fn load_from(path: &Path) -> ProfileResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Profile file not found, using empty store");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let store: ProfileStore = toml::from_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            profiles = store.profiles.len(),
            "Profiles loaded"
        );
        Ok(store)
    }

    /// Save the store to the default location, creating directories as
    /// needed.
    pub fn save(&self) -> ProfileResult<()> {
        self.save_to(&Self::default_path()?)
    }

    /// Save the store to an explicit path.
    pub fn save_to(&self, path: &Path) -> ProfileResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::info!(path = %path.display(), "Profiles saved");
        Ok(())
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Get a profile for mutation, creating it if absent.
    pub fn get_or_create(&mut self, name: &str) -> &mut Profile {
        self.profiles.entry(name.to_string()).or_default()
    }

    /// Get a profile for mutation, failing if it does not exist.
    ///
    /// Used by `config unset`, where silently creating a profile would
    /// mask a typo.
    pub fn get_existing(&mut self, name: &str) -> ProfileResult<&mut Profile> {
        self.profiles
            .get_mut(name)
            .ok_or_else(|| ProfileError::UnknownProfile(name.to_string()))
    }

    /// Drop a profile whose fields have all been unset.
    pub fn prune(&mut self, name: &str) {
        if self.profiles.get(name).is_some_and(Profile::is_empty) {
            self.profiles.remove(name);
        }
    }

    /// Number of stored profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the store has no profiles.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profiles() {
        let toml = r#"
            [default]
            auth_token = "tok-default"

            [staging]
            auth_token = "tok-staging"
            batch_url = "https://asr.staging.example.com/v2"
            generate_temp_token = true
        "#;

        let store: ProfileStore = toml::from_str(toml).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get("default").unwrap().auth_token.as_deref(),
            Some("tok-default")
        );

        let staging = store.get("staging").unwrap();
        assert_eq!(staging.auth_token.as_deref(), Some("tok-staging"));
        assert_eq!(
            staging.batch_url.as_deref(),
            Some("https://asr.staging.example.com/v2")
        );
        assert_eq!(staging.generate_temp_token, Some(true));
        assert_eq!(staging.realtime_url, None);
    }

    #[test]
    fn test_round_trip() {
        let mut store = ProfileStore::default();
        store.get_or_create("default").auth_token = Some("secret".to_string());
        store.get_or_create("eu").realtime_url = Some("wss://eu.example.com/v2".to_string());

        let toml = toml::to_string_pretty(&store).unwrap();
        let parsed: ProfileStore = toml::from_str(&toml).unwrap();

        assert_eq!(parsed, store);
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::load_from(&dir.path().join("nope.toml")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_existing_unknown_profile() {
        let mut store = ProfileStore::default();
        let err = store.get_existing("missing").unwrap_err();
        assert!(matches!(err, ProfileError::UnknownProfile(_)));
    }

    #[test]
    fn test_prune_removes_empty_profiles() {
        let mut store = ProfileStore::default();
        store.get_or_create("default").auth_token = Some("tok".to_string());

        store.get_existing("default").unwrap().auth_token = None;
        store.prune("default");

        assert!(store.is_empty());
    }
}
