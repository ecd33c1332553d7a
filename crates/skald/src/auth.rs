/// Temporary token generation
///
/// Customers may keep a long-lived API key out of their streaming clients
/// by exchanging it for a short-lived key right before a session starts.
/// The exchange happens against the management platform, not the
/// recognition endpoints.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::realtime::error::{RealtimeError, RealtimeResult};
use crate::settings::ConnectionSettings;

/// Lifetime requested for temporary keys, in seconds.
const TEMP_TOKEN_TTL_SECS: u32 = 60;

#[derive(Deserialize)]
struct TempKeyResponse {
    key_value: String,
}

/// Exchange the configured auth token for a short-lived key.
///
/// # Arguments
/// * `settings` - Connection settings carrying the long-lived token and
///   the management platform URL
/// * `usage` - Key type to request ("rt" or "batch")
pub(crate) async fn fetch_temp_token(
    settings: &ConnectionSettings,
    usage: &str,
) -> RealtimeResult<String> {
    let auth_token = settings
        .auth_token
        .as_deref()
        .ok_or_else(|| RealtimeError::TempToken("no auth token configured".to_string()))?;

    let endpoint = format!("{}/v1/api_keys", settings.mp_url.trim_end_matches('/'));
    debug!(endpoint = %endpoint, "Requesting temporary token");

    let sdk = crate::sdk_tag();
    let response = reqwest::Client::new()
        .post(&endpoint)
        .query(&[("type", usage), ("sdk", sdk.as_str())])
        .bearer_auth(auth_token)
        .json(&json!({ "ttl": TEMP_TOKEN_TTL_SECS }))
        .send()
        .await
        .map_err(|e| RealtimeError::TempToken(e.to_string()))?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
        return Err(RealtimeError::AuthenticationFailed);
    }
    let response = response
        .error_for_status()
        .map_err(|e| RealtimeError::TempToken(e.to_string()))?;

    let key: TempKeyResponse = response
        .json()
        .await
        .map_err(|e| RealtimeError::TempToken(e.to_string()))?;

    Ok(key.key_value)
}
