use nexo_kernel::config::{ConfigError, ConfigLoader};
use nexo_kernel::domain::config::AppConfig;
use std::collections::HashMap;
use std::fs;
use tempfile::tempdir;

fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
    vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

#[test]
fn defaults_apply_without_file_or_environment() {
    let cfg: AppConfig = ConfigLoader::new().env_source(env(&[])).load().unwrap();
    assert_eq!(cfg.database.url, "mem://");
    assert_eq!(cfg.logging.level, "info");
}

#[test]
fn file_values_override_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nexo.toml");
    fs::write(
        &path,
        "[database]\nurl = \"memory://\"\nnamespace = \"site\"\n\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let cfg: AppConfig = ConfigLoader::new().file(&path).env_source(env(&[])).load().unwrap();
    assert_eq!(cfg.database.url, "memory://");
    assert_eq!(cfg.database.namespace, "site");
    assert_eq!(cfg.database.database, "catalog");
    assert_eq!(cfg.logging.level, "debug");
}

#[test]
fn environment_overrides_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nexo.toml");
    fs::write(&path, "[database]\nurl = \"memory://\"\n").unwrap();

    let cfg: AppConfig = ConfigLoader::new()
        .file(&path)
        .env_source(env(&[
            ("NEXO__DATABASE__URL", "ws://db:8000"),
            ("NEXO__LOGGING__JSON", "true"),
        ]))
        .load()
        .unwrap();
    assert_eq!(cfg.database.url, "ws://db:8000");
    assert!(cfg.logging.json);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = ConfigLoader::new()
        .file(dir.path().join("absent.toml"))
        .env_source(env(&[]))
        .load::<AppConfig>()
        .unwrap_err();

    assert!(matches!(err, ConfigError::Config { .. }));
    assert_eq!(err.context(), Some("Failed to build config"));
}
