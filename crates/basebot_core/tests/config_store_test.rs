//! Integration tests for config bootstrap and persistence
//!
//! Every test works in its own temporary config root with a `default/`
//! directory, the same layout the bot uses on disk.

use std::path::{Path, PathBuf};

use basebot_core::config::{ConfigKey, ConfigStore, ConfigValue, GENERAL, GeneralSettings};
use basebot_core::CoreError;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn config_root(defaults: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let default_dir = dir.path().join("default");
    std::fs::create_dir_all(&default_dir).unwrap();
    for (name, content) in defaults {
        std::fs::write(default_dir.join(format!("{name}.json")), content).unwrap();
    }
    dir
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn first_run_creates_live_files_and_notifies_once() {
    let root = config_root(&[
        (GENERAL, r##"{"TOKEN": "", "EMBED_COLOR": "#5865f2"}"##),
        ("GAMES", r#"{"enabled": true}"#),
    ]);

    let mut created: Vec<PathBuf> = Vec::new();
    let store = ConfigStore::bootstrap_with(root.path(), |p| created.push(p.to_path_buf())).unwrap();

    created.sort();
    assert_eq!(
        created,
        vec![root.path().join("GAMES.json"), root.path().join("GENERAL.json")]
    );
    assert_eq!(store.names(), vec!["GAMES".to_string(), "GENERAL".to_string()]);
    assert_eq!(
        store.value(GENERAL, "EMBED_COLOR"),
        Some(&ConfigValue::String("#5865f2".into()))
    );

    // Second start finds the files and stays quiet
    let mut calls = 0;
    ConfigStore::bootstrap_with(root.path(), |_| calls += 1).unwrap();
    assert_eq!(calls, 0);
}

#[test]
fn live_values_are_never_clobbered_by_defaults() {
    let root = config_root(&[("X", r#"{"a": 2, "b": 3}"#)]);
    std::fs::write(root.path().join("X.json"), r#"{"a": 1}"#).unwrap();

    let store = ConfigStore::bootstrap(root.path()).unwrap();

    assert_eq!(store.value("X", "a"), Some(&ConfigValue::Integer(1)));
    assert_eq!(store.value("X", "b"), Some(&ConfigValue::Integer(3)));
    assert_eq!(
        read_json(&root.path().join("X.json")),
        serde_json::json!({"a": 1, "b": 3})
    );
}

#[test]
fn bootstrap_is_idempotent() {
    let root = config_root(&[
        (GENERAL, r#"{"TOKEN": "", "OWNER_GUILD_IDS": [], "MEMBERS_INTENT": false}"#),
        ("EVENTS", r#"{"2024-01-01": "launch", "5": [1.5, "2"]}"#),
    ]);

    let first = ConfigStore::bootstrap(root.path()).unwrap();
    let general_after_first = std::fs::read_to_string(root.path().join("GENERAL.json")).unwrap();
    let events_after_first = std::fs::read_to_string(root.path().join("EVENTS.json")).unwrap();

    let second = ConfigStore::bootstrap(root.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        std::fs::read_to_string(root.path().join("GENERAL.json")).unwrap(),
        general_after_first
    );
    assert_eq!(
        std::fs::read_to_string(root.path().join("EVENTS.json")).unwrap(),
        events_after_first
    );
}

#[test]
fn keys_and_values_are_coerced_on_load() {
    let root = config_root(&[("EVENTS", r#"{"2024-01-01": "launch", "5": ["2", "true"]}"#)]);
    let store = ConfigStore::bootstrap(root.path()).unwrap();
    let events = store.category("EVENTS").unwrap();

    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert_eq!(
        events.get(ConfigKey::Date(date)),
        Some(&ConfigValue::String("launch".into()))
    );
    assert_eq!(
        events.get(5),
        Some(&ConfigValue::List(vec![
            ConfigValue::Integer(2),
            ConfigValue::Bool(true)
        ]))
    );
}

#[test]
fn non_json_files_in_defaults_are_ignored() {
    let root = config_root(&[(GENERAL, r#"{"TOKEN": ""}"#)]);
    std::fs::write(root.path().join("default").join("README.md"), "notes").unwrap();

    let store = ConfigStore::bootstrap(root.path()).unwrap();
    assert_eq!(store.names(), vec![GENERAL.to_string()]);
}

#[test]
fn broken_live_file_is_reported() {
    let root = config_root(&[(GENERAL, r#"{"TOKEN": ""}"#)]);
    std::fs::write(root.path().join("GENERAL.json"), "{ not json").unwrap();

    let err = ConfigStore::bootstrap(root.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigParse { .. }));
}

#[test]
fn rejected_assignment_leaves_store_and_file_unchanged() {
    let root = config_root(&[(GENERAL, r#"{"TOKEN": "abc"}"#)]);
    let mut store = ConfigStore::bootstrap(root.path()).unwrap();
    let before = store.clone();
    let file_before = std::fs::read_to_string(root.path().join("GENERAL.json")).unwrap();

    let err = store.set(GENERAL, "RATE", f64::INFINITY).unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedValue { .. }));
    store.save().unwrap();

    assert_eq!(store, before);
    assert_eq!(
        std::fs::read_to_string(root.path().join("GENERAL.json")).unwrap(),
        file_before
    );
}

#[test]
fn scoped_changes_persist_across_restart() {
    let root = config_root(&[(GENERAL, r#"{"TOKEN": ""}"#)]);
    let mut store = ConfigStore::bootstrap(root.path()).unwrap();

    store
        .scoped(|s| -> basebot_core::Result<()> {
            s.set(GENERAL, "TOKEN", "secret")?;
            s.set(GENERAL, "OWNER_GUILD_IDS", vec![123u64, 456u64])?;
            Ok(())
        })
        .unwrap();

    let reloaded = ConfigStore::bootstrap(root.path()).unwrap();
    let settings = GeneralSettings::from_store(&reloaded).unwrap();
    assert_eq!(settings.token, "secret");
    assert_eq!(settings.owner_guild_ids, vec![123, 456]);
}

#[test]
fn shared_store_serialises_writers() {
    let root = config_root(&[(GENERAL, r#"{"counter": 0}"#)]);
    let shared = ConfigStore::bootstrap(root.path()).unwrap().into_shared();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let mut store = shared.write();
                    let current = store.value(GENERAL, "counter").and_then(|v| v.as_i64()).unwrap();
                    store.set(GENERAL, "counter", current + 1).unwrap();
                    store.save().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(read_json(&root.path().join("GENERAL.json")), serde_json::json!({"counter": 200}));
}
