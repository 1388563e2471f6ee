use std::fs;
use std::path::PathBuf;

use armctl_core::config::{AuthKind, Config, ConfigError, DEFAULT_ARM_ENDPOINT, Profile};
use tempfile::TempDir;

/// Permission checks are not enforced for root
#[cfg(unix)]
fn is_root() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .is_some_and(|s| s.trim() == "0")
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Missing and empty files
// ---------------------------------------------------------------------------

#[test]
fn missing_file_loads_as_empty_config() {
    let path = PathBuf::from("/tmp/armctl-test-nonexistent/nested/config.toml");
    assert!(!path.exists());

    let config = Config::load_from_path(&path).unwrap();
    assert!(config.profiles.is_empty());
    assert!(config.default_profile.is_none());
}

#[test]
fn empty_file_loads_as_empty_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");

    let config = Config::load_from_path(&path).unwrap();
    assert!(config.profiles.is_empty());
}

#[test]
fn empty_config_has_no_profile_to_resolve() {
    let err = Config::default().resolve_profile(None).unwrap_err();
    match err {
        ConfigError::NoProfiles { suggestion } => assert!(suggestion.contains("profile set")),
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Malformed content
// ---------------------------------------------------------------------------

#[test]
fn corrupt_toml_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[[[broken");

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(err.to_string().contains("parse"));
}

#[test]
fn profile_without_subscription_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[profiles.broken]
location = "westeurope"
"#,
    );

    assert!(Config::load_from_path(&path).is_err());
}

#[test]
fn unknown_auth_kind_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[profiles.dev]
subscription_id = "sub"
auth = "client-secret"
"#,
    );

    assert!(Config::load_from_path(&path).is_err());
}

#[test]
fn unknown_fields_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
some_future_setting = true

[profiles.dev]
subscription_id = "sub"
colour = "blue"
"#,
    );

    let config = Config::load_from_path(&path).unwrap();
    let profile = config.get_profile("dev").unwrap();
    assert_eq!(profile.subscription_id, "sub");
    assert_eq!(profile.base_url, DEFAULT_ARM_ENDPOINT);
    assert_eq!(profile.auth, AuthKind::AzureCli);
}

// ---------------------------------------------------------------------------
// Environment expansion
// ---------------------------------------------------------------------------

#[test]
#[serial_test::serial]
fn env_default_is_used_when_variable_unset() {
    // SAFETY: serialized with the other env-mutating tests
    unsafe { std::env::remove_var("ARMCTL_TEST_BASE_URL") };

    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[profiles.local]
subscription_id = "sub"
base_url = "${ARMCTL_TEST_BASE_URL:-http://127.0.0.1:8080}"
"#,
    );

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(
        config.get_profile("local").unwrap().base_url,
        "http://127.0.0.1:8080"
    );
}

#[test]
#[serial_test::serial]
fn unset_token_variable_is_a_credential_error() {
    // SAFETY: serialized with the other env-mutating tests
    unsafe { std::env::remove_var("ARMCTL_TEST_MISSING_TOKEN") };

    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[profiles.ci]
subscription_id = "sub"
auth = "token"
access_token = "${ARMCTL_TEST_MISSING_TOKEN}"
"#,
    );

    let config = Config::load_from_path(&path).unwrap();
    let err = config.get_profile("ci").unwrap().resolve_token().unwrap_err();
    assert!(matches!(err, ConfigError::MissingToken(_)));
    assert!(err.to_string().contains("ARMCTL_TEST_MISSING_TOKEN"));
}

// ---------------------------------------------------------------------------
// Save and reload
// ---------------------------------------------------------------------------

#[test]
fn save_creates_parent_directories_and_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a").join("b").join("config.toml");

    let mut config = Config::default();
    config.set_profile(
        "prod".to_string(),
        Profile {
            location: Some("northeurope".to_string()),
            resource_group: Some("rg-prod".to_string()),
            ..Profile::new("11111111-2222-3333-4444-555555555555")
        },
    );
    config.default_profile = Some("prod".to_string());
    config.save_to_path(&path).unwrap();

    let reloaded = Config::load_from_path(&path).unwrap();
    assert_eq!(reloaded.default_profile.as_deref(), Some("prod"));
    assert_eq!(reloaded.get_profile("prod").unwrap(), config.get_profile("prod").unwrap());
}

#[test]
fn removing_default_profile_clears_default() {
    let mut config = Config::default();
    config.set_profile("a".to_string(), Profile::new("sub-a"));
    config.set_profile("b".to_string(), Profile::new("sub-b"));
    config.default_profile = Some("b".to_string());

    assert!(config.remove_profile("b").is_some());
    assert!(config.default_profile.is_none());
    assert_eq!(config.resolve_profile(None).unwrap(), "a");
}

#[cfg(unix)]
#[test]
fn unreadable_file_is_a_load_error() {
    use std::os::unix::fs::PermissionsExt;

    if is_root() {
        eprintln!("skipping test: running as root");
        return;
    }

    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "# nothing here");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));

    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn save_into_readonly_directory_is_a_save_error() {
    use std::os::unix::fs::PermissionsExt;

    if is_root() {
        eprintln!("skipping test: running as root");
        return;
    }

    let dir = TempDir::new().unwrap();
    let readonly = dir.path().join("readonly");
    fs::create_dir(&readonly).unwrap();
    fs::set_permissions(&readonly, fs::Permissions::from_mode(0o555)).unwrap();

    let err = Config::default()
        .save_to_path(&readonly.join("config.toml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Write { .. }));

    fs::set_permissions(&readonly, fs::Permissions::from_mode(0o755)).unwrap();
}
