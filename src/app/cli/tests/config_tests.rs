//! Tests for TOML configuration loading

use crate::app::cli::config::ConfigFile;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_parse_all_keys() {
    let config = ConfigFile::parse(
        r#"
data-dir = "/srv/queues"
listen = "127.0.0.1:22133"
pid-file = "/run/stashq.pid"
client-timeout = 60
max-item-size = 65536
log-level = "debug"
log-format = "ext"
log-file = "none"
color = true
"#,
    )
    .unwrap();

    assert_eq!(config.data_dir, Some(PathBuf::from("/srv/queues")));
    assert_eq!(config.listen.as_deref(), Some("127.0.0.1:22133"));
    assert_eq!(config.pid_file, Some(PathBuf::from("/run/stashq.pid")));
    assert_eq!(config.client_timeout, Some(60));
    assert_eq!(config.max_item_size, Some(65536));
    assert_eq!(config.log_level.as_deref(), Some("debug"));
    assert_eq!(config.log_format.as_deref(), Some("ext"));
    assert_eq!(config.log_file, Some(PathBuf::from("none")));
    assert_eq!(config.color, Some(true));
}

#[test]
fn test_empty_file_is_all_defaults() {
    assert_eq!(ConfigFile::parse("").unwrap(), ConfigFile::default());
}

#[test]
fn test_unknown_key_is_rejected() {
    let err = ConfigFile::parse("data_dir = \"/srv\"\n").unwrap_err();
    assert!(err.message.starts_with("Invalid configuration"), "{}", err.message);
}

#[test]
fn test_wrong_type_is_rejected() {
    assert!(ConfigFile::parse("client-timeout = \"ten\"\n").is_err());
}

#[test]
fn test_default_path_location() {
    if let Some(path) = ConfigFile::default_path() {
        assert!(path.ends_with("Stashq/stashq.toml"));
    }
}

#[tokio::test]
async fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stashq.toml");
    std::fs::write(&path, "listen = \"127.0.0.1:9999\"\n").unwrap();

    let config = ConfigFile::discover(Some(&path)).await.unwrap();
    assert_eq!(config.listen.as_deref(), Some("127.0.0.1:9999"));
}

#[tokio::test]
async fn test_explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = ConfigFile::discover(Some(&path)).await.unwrap_err();
    assert!(err.message.contains("does not exist"), "{}", err.message);
}

#[tokio::test]
async fn test_load_reports_path_on_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "listen = \n").unwrap();

    let err = ConfigFile::load(&path).await.unwrap_err();
    assert!(err.message.contains("broken.toml"), "{}", err.message);
}
