//! Integration tests for stored connection profiles

use skald::profile::{Profile, ProfileStore};
use skald::settings::{ConnectionSettings, UsageMode};

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut store = ProfileStore::default();
    store.get_or_create("default").auth_token = Some("tok".to_string());
    store.get_or_create("staging").batch_url =
        Some("https://asr.staging.example.com/v2".to_string());

    // Parent directories are created on save
    store.save_to(&path).unwrap();
    assert!(path.exists());

    let reloaded = ProfileStore::load_from(&path).unwrap();
    assert_eq!(reloaded, store);
}

#[test]
fn test_file_content_is_plain_toml_sections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut store = ProfileStore::default();
    store.get_or_create("default").auth_token = Some("secret".to_string());
    store.get_or_create("default").generate_temp_token = Some(true);
    store.save_to(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("[default]"));
    assert!(content.contains("auth_token = \"secret\""));
    assert!(content.contains("generate_temp_token = true"));
}

#[test]
fn test_invalid_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "not [valid toml").unwrap();

    assert!(ProfileStore::load_from(&path).is_err());
}

#[test]
fn test_profile_feeds_connection_settings() {
    let toml = r#"
        [default]
        auth_token = "stored"
        realtime_url = "wss://self-hosted:9000/v2"
        batch_url = "https://self-hosted:3000/v2"
    "#;
    let store: ProfileStore = toml::from_str(toml).unwrap();
    let profile: Option<&Profile> = store.get("default");

    let rt = ConnectionSettings::with_defaults(UsageMode::RealTime, None, profile);
    assert_eq!(rt.url, "wss://self-hosted:9000/v2");
    assert_eq!(rt.auth_token.as_deref(), Some("stored"));

    let batch = ConnectionSettings::with_defaults(UsageMode::Batch, None, profile);
    assert_eq!(batch.url, "https://self-hosted:3000/v2");
}

#[test]
fn test_unset_then_prune_drops_profile() {
    let mut store = ProfileStore::default();
    store.get_or_create("extra").auth_token = Some("tok".to_string());

    let profile = store.get_existing("extra").unwrap();
    profile.auth_token = None;
    store.prune("extra");

    assert!(store.get("extra").is_none());
}
