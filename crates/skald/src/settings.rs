/// Connection settings for the Skald service endpoints
///
/// This module holds everything needed to reach the service: endpoint URL,
/// credentials, TLS mode and the client-side timeouts. Settings are built
/// once by the caller and are immutable for the lifetime of a session or
/// batch client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::profile::Profile;

/// The self-service real-time endpoint.
///
/// Note that the language is appended to the path when a session starts.
pub const REALTIME_SELF_SERVICE_URL: &str = "wss://rt.api.skald.io/v2";

/// The self-service batch endpoint.
pub const BATCH_SELF_SERVICE_URL: &str = "https://asr.api.skald.io/v2";

/// The management platform endpoint used for temporary token generation.
pub const MANAGEMENT_PLATFORM_URL: &str = "https://mp.api.skald.io";

/// Which endpoint family a settings object is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageMode {
    RealTime,
    Batch,
}

impl UsageMode {
    /// Default endpoint URL for this mode.
    pub fn default_url(self) -> &'static str {
        match self {
            UsageMode::RealTime => REALTIME_SELF_SERVICE_URL,
            UsageMode::Batch => BATCH_SELF_SERVICE_URL,
        }
    }
}

/// TLS behavior for client connections.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// Verify server certificates against the system trust store
    #[default]
    Regular,

    /// Use TLS but accept any certificate. For self-hosted deployments
    /// with self-signed certificates only.
    Insecure,

    /// No TLS; the endpoint must use a ws:// or http:// URL
    None,
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(SslMode::Regular),
            "insecure" => Ok(SslMode::Insecure),
            "none" => Ok(SslMode::None),
            other => Err(format!(
                "unknown ssl mode {other:?}, expected regular, insecure or none"
            )),
        }
    }
}

/// Settings for a connection to the service
///
/// # Example
/// ```
/// use skald::settings::ConnectionSettings;
///
/// let settings = ConnectionSettings::new("wss://rt.example.com/v2")
///     .with_auth_token("secret")
///     .with_message_buffer_size(256);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Endpoint URL (wss:// or https:// depending on usage)
    pub url: String,

    /// Bearer token used to authenticate
    pub auth_token: Option<String>,

    /// Exchange the auth token for a short-lived key before connecting
    pub generate_temp_token: bool,

    /// Management platform URL for temp-token generation
    pub mp_url: String,

    /// TLS behavior
    pub ssl_mode: SslMode,

    /// Budget for the transport handshake
    pub connect_timeout: Duration,

    /// How long a session may wait for server acknowledgments before
    /// giving up on sending more audio
    pub buffer_acquire_timeout: Duration,

    /// How long a closing session waits for the server's final messages
    pub drain_timeout: Duration,

    /// Number of unacknowledged audio chunks that may be in flight
    pub message_buffer_size: usize,
}

impl ConnectionSettings {
    /// Create settings for the given URL with default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            generate_temp_token: false,
            mp_url: MANAGEMENT_PLATFORM_URL.to_string(),
            ssl_mode: SslMode::default(),
            connect_timeout: Duration::from_secs(10),
            buffer_acquire_timeout: Duration::from_secs(120),
            drain_timeout: Duration::from_secs(30),
            message_buffer_size: 512,
        }
    }

    /// Create settings for the default endpoint of the given usage mode,
    /// filling gaps from a stored profile.
    ///
    /// Explicit arguments win over the profile, which wins over the
    /// built-in defaults. The profile is loaded once by the caller and
    /// passed in; this function never touches the filesystem.
    pub fn with_defaults(
        usage: UsageMode,
        auth_token: Option<String>,
        profile: Option<&Profile>,
    ) -> Self {
        let profile_url = profile.and_then(|p| match usage {
            UsageMode::RealTime => p.realtime_url.clone(),
            UsageMode::Batch => p.batch_url.clone(),
        });

        let mut settings =
            Self::new(profile_url.unwrap_or_else(|| usage.default_url().to_string()));

        settings.auth_token = auth_token.or_else(|| profile.and_then(|p| p.auth_token.clone()));
        settings.generate_temp_token = profile
            .and_then(|p| p.generate_temp_token)
            .unwrap_or(false);

        settings
    }

    /// Set the auth token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Request a temporary token before connecting
    pub fn with_temp_token(mut self) -> Self {
        self.generate_temp_token = true;
        self
    }

    /// Override the management platform URL
    pub fn with_mp_url(mut self, url: impl Into<String>) -> Self {
        self.mp_url = url.into();
        self
    }

    /// Set the TLS mode
    pub fn with_ssl_mode(mut self, mode: SslMode) -> Self {
        self.ssl_mode = mode;
        self
    }

    /// Set the handshake timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the buffer acquire timeout
    pub fn with_buffer_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.buffer_acquire_timeout = timeout;
        self
    }

    /// Set the drain timeout
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Set the number of in-flight audio chunks
    pub fn with_message_buffer_size(mut self, size: usize) -> Self {
        self.message_buffer_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = ConnectionSettings::new("wss://rt.example.com/v2");

        assert_eq!(settings.url, "wss://rt.example.com/v2");
        assert_eq!(settings.auth_token, None);
        assert!(!settings.generate_temp_token);
        assert_eq!(settings.ssl_mode, SslMode::Regular);
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.buffer_acquire_timeout, Duration::from_secs(120));
        assert_eq!(settings.message_buffer_size, 512);
    }

    #[test]
    fn test_settings_builder() {
        let settings = ConnectionSettings::new("wss://rt.example.com/v2")
            .with_auth_token("tok")
            .with_temp_token()
            .with_ssl_mode(SslMode::Insecure)
            .with_connect_timeout(Duration::from_secs(3))
            .with_message_buffer_size(64);

        assert_eq!(settings.auth_token.as_deref(), Some("tok"));
        assert!(settings.generate_temp_token);
        assert_eq!(settings.ssl_mode, SslMode::Insecure);
        assert_eq!(settings.connect_timeout, Duration::from_secs(3));
        assert_eq!(settings.message_buffer_size, 64);
    }

    #[test]
    fn test_with_defaults_uses_builtin_urls() {
        let rt = ConnectionSettings::with_defaults(UsageMode::RealTime, None, None);
        assert_eq!(rt.url, REALTIME_SELF_SERVICE_URL);

        let batch = ConnectionSettings::with_defaults(UsageMode::Batch, None, None);
        assert_eq!(batch.url, BATCH_SELF_SERVICE_URL);
    }

    #[test]
    fn test_with_defaults_profile_fills_gaps() {
        let profile = Profile {
            auth_token: Some("stored-token".to_string()),
            realtime_url: Some("wss://self-hosted:9000/v2".to_string()),
            batch_url: None,
            generate_temp_token: Some(true),
        };

        let settings =
            ConnectionSettings::with_defaults(UsageMode::RealTime, None, Some(&profile));
        assert_eq!(settings.url, "wss://self-hosted:9000/v2");
        assert_eq!(settings.auth_token.as_deref(), Some("stored-token"));
        assert!(settings.generate_temp_token);

        // Batch URL missing from the profile falls back to the default
        let settings = ConnectionSettings::with_defaults(UsageMode::Batch, None, Some(&profile));
        assert_eq!(settings.url, BATCH_SELF_SERVICE_URL);
    }

    #[test]
    fn test_with_defaults_explicit_token_wins() {
        let profile = Profile {
            auth_token: Some("stored-token".to_string()),
            ..Default::default()
        };

        let settings = ConnectionSettings::with_defaults(
            UsageMode::RealTime,
            Some("explicit".to_string()),
            Some(&profile),
        );
        assert_eq!(settings.auth_token.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_ssl_mode_from_str() {
        assert_eq!("regular".parse::<SslMode>().unwrap(), SslMode::Regular);
        assert_eq!("insecure".parse::<SslMode>().unwrap(), SslMode::Insecure);
        assert_eq!("none".parse::<SslMode>().unwrap(), SslMode::None);
        assert!("tls13".parse::<SslMode>().is_err());
    }
}
