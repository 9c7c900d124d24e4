//! Configuration tests
//!
//! The template produced by `to_toml` must parse back into the same config,
//! otherwise `config --reset` would write a file the loader rejects.

use super::*;
use std::collections::HashMap;

fn no_env(_: &str) -> Option<String> {
    None
}

fn reparse(config: &Config) -> Config {
    let toml_str = config.to_toml();
    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );
    Config::layered(parsed.unwrap(), no_env)
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    assert_eq!(reparse(&config), config);
}

#[test]
fn test_config_roundtrip_custom() {
    let config = Config {
        endpoint: Some("https://gen.example.com/ui".to_string()),
        catalog: Some(PathBuf::from("catalogs/labs.toml")),
        request_timeout_secs: 30,
        auth: AuthConfig { signed_in: true },
        logging: LoggingConfig {
            level: "debug".to_string(),
            file_enabled: true,
            file_dir: PathBuf::from("/tmp/genui-logs"),
            file_rotation: LogRotation::Hourly,
            file_prefix: "ui".to_string(),
        },
    };
    assert_eq!(reparse(&config), config);
}

#[test]
fn test_default_template_documents_optional_keys() {
    let template = Config::default().to_toml();
    assert!(template.contains("# endpoint = "));
    assert!(template.contains("# catalog = "));
    assert!(template.contains("[auth]"));
    assert!(template.contains("[logging]"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    let file: FileConfig = toml::from_str(
        r#"
        endpoint = "http://file/endpoint"
        catalog = "file.toml"

        [auth]
        signed_in = false

        [logging]
        level = "warn"
        "#,
    )
    .unwrap();

    let env: HashMap<&str, &str> = HashMap::from([
        ("GENUI_ENDPOINT", "http://env/endpoint"),
        ("GENUI_SIGNED_IN", "true"),
        ("GENUI_LOG_LEVEL", "trace"),
    ]);
    let config = Config::layered(file, |key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.endpoint.as_deref(), Some("http://env/endpoint"));
    assert_eq!(config.catalog, Some(PathBuf::from("file.toml")));
    assert!(config.auth.signed_in);
    assert_eq!(config.logging.level, "trace");
}

#[test]
fn test_partial_file_uses_defaults() {
    let file: FileConfig = toml::from_str("request_timeout_secs = 5\n").unwrap();
    let config = Config::layered(file, no_env);

    assert_eq!(config.request_timeout_secs, 5);
    assert_eq!(config.logging, LoggingConfig::default());
    assert!(!config.auth.state().signed_in);
}

#[test]
fn test_empty_env_values_are_ignored() {
    let config = Config::layered(FileConfig::default(), |key| {
        (key == "GENUI_ENDPOINT").then(|| "  ".to_string())
    });
    assert_eq!(config.endpoint, None);
}

#[test]
fn test_log_rotation_parse() {
    assert_eq!(LogRotation::parse("HOURLY"), LogRotation::Hourly);
    assert_eq!(LogRotation::parse("never"), LogRotation::Never);
    assert_eq!(LogRotation::parse("weekly"), LogRotation::Daily);
}
