use super::*;

use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(None, env_from(&[]));
    assert_eq!(settings.host, "127.0.0.1");
    assert_eq!(settings.port, 3001);
    assert_eq!(settings.environment, Environment::Development);
    assert_eq!(settings.default_user_id, "12345");
    assert!(settings.assistant_url.is_none());
}

#[test]
fn environment_overrides_settings_file() {
    let file = r#"
        port = 4000
        database_url = "sqlite://./file.db"
        environment = "development"
        assistant_url = "http://localhost:8000/response"
    "#;
    let settings = load_settings_from(
        Some(file),
        env_from(&[
            ("PORT", "5000"),
            ("APP_ENV", "production"),
            ("DATABASE_URL", "sqlite://./env.db"),
        ]),
    );
    assert_eq!(settings.port, 5000);
    assert_eq!(settings.database_url, "sqlite://./env.db");
    assert_eq!(settings.environment, Environment::Production);
    assert_eq!(
        settings.assistant_url.as_deref(),
        Some("http://localhost:8000/response")
    );
}

#[test]
fn prefixed_variables_win_over_plain_ones() {
    let settings = load_settings_from(
        None,
        env_from(&[("PORT", "5000"), ("APP__PORT", "6000")]),
    );
    assert_eq!(settings.port, 6000);
}

#[test]
fn invalid_values_keep_previous_setting() {
    let settings = load_settings_from(
        Some("this is not toml ="),
        env_from(&[("PORT", "not-a-port"), ("ASSISTANT_URL", "  ")]),
    );
    assert_eq!(settings.port, 3001);
    assert!(settings.assistant_url.is_none());
}

#[test]
fn only_development_exposes_error_detail() {
    assert!(Environment::parse("Development").exposes_error_detail());
    assert!(!Environment::parse("production").exposes_error_detail());
    assert!(!Environment::parse("staging").exposes_error_detail());
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[tokio::test]
async fn normalized_database_url_creates_openable_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("server.db");

    let normalized = normalize_database_url(db_path.to_string_lossy().as_ref());
    let storage = storage::Storage::new(&normalized).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );
}
