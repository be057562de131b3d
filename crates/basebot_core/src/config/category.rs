use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::coerce::coerce_object;
use super::value::{
    ConfigKey, ConfigMap, ConfigValue, IntoConfigKey, IntoConfigValue, find_wire_collision,
    map_to_json,
};
use crate::error::{ConversionError, CoreError, Result};

/// One named group of settings, persisted to `<dir>/<name>.json`
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    name: String,
    path: PathBuf,
    entries: ConfigMap,
}

impl Category {
    /// Open the category file in `dir`, creating it from `seed` if missing
    ///
    /// `on_new_file` runs once, after the new file has been written and before
    /// it is read back.
    pub fn open(
        name: &str,
        dir: &Path,
        seed: &ConfigMap,
        on_new_file: &mut dyn FnMut(&Path),
    ) -> Result<Self> {
        validate_name(name)?;
        let path = category_path(dir, name);

        if !path.exists() {
            std::fs::create_dir_all(dir).map_err(|e| CoreError::config_io(dir, "create", e))?;
            write_entries(name, &path, seed)?;
            info!("Created config file {}", path.display());
            on_new_file(&path);
        }

        let entries = read_entries(name, &path)?;
        debug!("Loaded {} keys from {}", entries.len(), path.display());

        Ok(Self {
            name: name.to_string(),
            path,
            entries,
        })
    }

    /// An empty category that has not been written yet
    pub fn empty(name: &str, dir: &Path) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            path: category_path(dir, name),
            entries: ConfigMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &ConfigMap {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get<K: IntoConfigKey>(&self, key: K) -> Option<&ConfigValue> {
        let key = key.into_config_key().ok()?;
        self.entries.get(&key)
    }

    pub fn get_mut<K: IntoConfigKey>(&mut self, key: K) -> Option<&mut ConfigValue> {
        let key = key.into_config_key().ok()?;
        self.entries.get_mut(&key)
    }

    pub fn contains_key<K: IntoConfigKey>(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ConfigKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConfigKey, &ConfigValue)> {
        self.entries.iter()
    }

    /// Assign `value` to `key`, returning the previous value
    ///
    /// Both sides are converted before anything is touched, so an unsupported
    /// key or value leaves the category unchanged.
    pub fn set<K, V>(&mut self, key: K, value: V) -> Result<Option<ConfigValue>>
    where
        K: IntoConfigKey,
        V: IntoConfigValue,
    {
        let key = key.into_config_key().map_err(|cause| CoreError::UnsupportedKey {
            category: self.name.clone(),
            cause,
        })?;
        let value = value
            .into_config_value()
            .map_err(|cause| CoreError::UnsupportedValue {
                category: self.name.clone(),
                key: key.to_wire(),
                cause,
            })?;

        let wire = key.to_wire();
        let taken = self.entries.keys().any(|k| *k != key && k.to_wire() == wire);
        if let Some(wire) = taken.then_some(wire).or_else(|| value.wire_collision()) {
            return Err(CoreError::KeyCollision {
                category: self.name.clone(),
                key: wire,
            });
        }
        Ok(self.entries.insert(key, value))
    }

    /// Assign any serializable value, stored as its JSON shape
    pub fn set_serialized<K, T>(&mut self, key: K, value: &T) -> Result<Option<ConfigValue>>
    where
        K: IntoConfigKey,
        T: Serialize + ?Sized,
    {
        let key = key.into_config_key().map_err(|cause| CoreError::UnsupportedKey {
            category: self.name.clone(),
            cause,
        })?;
        let json = serde_json::to_value(value).map_err(|e| CoreError::UnsupportedValue {
            category: self.name.clone(),
            key: key.to_wire(),
            cause: ConversionError::new(std::any::type_name::<T>(), e.to_string()),
        })?;
        self.set(key, json)
    }

    pub fn remove<K: IntoConfigKey>(&mut self, key: K) -> Option<ConfigValue> {
        let key = key.into_config_key().ok()?;
        self.entries.remove(&key)
    }

    /// Copy every entry of `defaults` whose key is missing here
    ///
    /// Existing keys are never overwritten. Returns how many keys were added.
    pub fn merge_missing(&mut self, defaults: &Category) -> usize {
        let mut added = 0;
        for (key, value) in defaults.iter() {
            if !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), value.clone());
                added += 1;
            }
        }
        added
    }

    /// Replace the backing file with the current entries
    pub fn save(&self) -> Result<()> {
        write_entries(&self.name, &self.path, &self.entries)
    }
}

impl<'a> IntoIterator for &'a Category {
    type Item = (&'a ConfigKey, &'a ConfigValue);
    type IntoIter = std::collections::btree_map::Iter<'a, ConfigKey, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Category names double as file stems
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("category names cannot be empty")
    } else if name.contains(['/', '\\']) || name == "." || name == ".." {
        Some("category names cannot contain path separators")
    } else if name.chars().any(char::is_control) {
        Some("category names cannot contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CoreError::InvalidCategoryName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

pub fn category_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

fn read_entries(name: &str, path: &Path) -> Result<ConfigMap> {
    let content =
        std::fs::read_to_string(path).map_err(|e| CoreError::config_io(path, "read", e))?;
    let json: Value = serde_json::from_str(&content).map_err(|cause| CoreError::ConfigParse {
        path: path.display().to_string(),
        cause,
    })?;

    match json {
        Value::Object(object) => {
            coerce_object(object).map_err(|cause| CoreError::UnsupportedValue {
                category: name.to_string(),
                key: "<file>".to_string(),
                cause,
            })
        }
        other => Err(CoreError::NotAMapping {
            path: path.display().to_string(),
            found: json_type_name(&other).to_string(),
        }),
    }
}

fn write_entries(name: &str, path: &Path, entries: &ConfigMap) -> Result<()> {
    if let Some(key) = find_wire_collision(entries) {
        return Err(CoreError::KeyCollision {
            category: name.to_string(),
            key,
        });
    }
    let content = serde_json::to_string_pretty(&Value::Object(map_to_json(entries)))
        .map_err(|cause| CoreError::ConfigParse {
            path: path.display().to_string(),
            cause,
        })?;
    std::fs::write(path, content).map_err(|e| CoreError::config_io(path, "write", e))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn open_in(dir: &Path, name: &str) -> Category {
        Category::open(name, dir, &ConfigMap::new(), &mut |_: &Path| {}).unwrap()
    }

    #[test]
    fn test_open_creates_file_from_seed() {
        let dir = tempfile::tempdir().unwrap();
        let mut seed = ConfigMap::new();
        seed.insert(ConfigKey::String("PREFIX".into()), ConfigValue::String("!".into()));

        let mut created = Vec::new();
        let category = Category::open("GENERAL", dir.path(), &seed, &mut |p: &Path| {
            created.push(p.to_path_buf())
        })
        .unwrap();

        assert_eq!(created, vec![dir.path().join("GENERAL.json")]);
        assert_eq!(category.get("PREFIX"), Some(&ConfigValue::String("!".into())));
    }

    #[test]
    fn test_open_existing_file_skips_callback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("GENERAL.json"), r#"{"a": "1"}"#).unwrap();

        let mut calls = 0;
        let category =
            Category::open("GENERAL", dir.path(), &ConfigMap::new(), &mut |_: &Path| calls += 1).unwrap();

        assert_eq!(calls, 0);
        assert_eq!(category.get("a"), Some(&ConfigValue::Integer(1)));
    }

    #[test]
    fn test_rejected_value_leaves_category_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut category = open_in(dir.path(), "GENERAL");
        category.set("RATE", 1.5).unwrap();

        let before = category.clone();
        let err = category.set("RATE", f64::NAN).unwrap_err();

        assert!(matches!(err, CoreError::UnsupportedValue { .. }));
        assert_eq!(category, before);
    }

    #[test]
    fn test_rejected_key_leaves_category_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut category = open_in(dir.path(), "GENERAL");

        let err = category
            .set(ConfigValue::List(vec![ConfigValue::Integer(1)]), true)
            .unwrap_err();

        assert!(matches!(err, CoreError::UnsupportedKey { .. }));
        assert!(category.is_empty());
    }

    #[test]
    fn test_set_serialized_stores_json_shape() {
        #[derive(Serialize)]
        struct Reminder {
            channel: u64,
            text: String,
        }

        let dir = tempfile::tempdir().unwrap();
        let mut category = open_in(dir.path(), "DATA");
        category
            .set_serialized(
                "reminder",
                &Reminder {
                    channel: 10,
                    text: "stand up".into(),
                },
            )
            .unwrap();

        let stored = category.get("reminder").and_then(ConfigValue::as_map).unwrap();
        assert_eq!(stored.get(&ConfigKey::String("channel".into())), Some(&ConfigValue::Integer(10)));
    }

    #[test]
    fn test_merge_missing_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut live = open_in(dir.path(), "live");
        live.set("a", 1).unwrap();

        let mut defaults = Category::empty("live", dir.path()).unwrap();
        defaults.set("a", 2).unwrap();
        defaults.set("b", 3).unwrap();

        assert_eq!(live.merge_missing(&defaults), 1);
        assert_eq!(live.get("a"), Some(&ConfigValue::Integer(1)));
        assert_eq!(live.get("b"), Some(&ConfigValue::Integer(3)));
    }

    #[test]
    fn test_save_round_trips_rich_types() {
        let dir = tempfile::tempdir().unwrap();
        let mut category = open_in(dir.path(), "events");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut by_day = BTreeMap::new();
        by_day.insert(date, "launch");
        category.set("days", by_day).unwrap();
        category.set(7, "seven").unwrap();
        category.save().unwrap();

        let reloaded = open_in(dir.path(), "events");
        assert_eq!(reloaded, category);
    }

    #[test]
    fn test_saved_file_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let mut category = open_in(dir.path(), "GENERAL");
        category.set("TOKEN", "").unwrap();
        category.save().unwrap();

        let content = std::fs::read_to_string(category.path()).unwrap();
        assert_eq!(content, "{\n  \"TOKEN\": \"\"\n}");
    }

    #[test]
    fn test_top_level_array_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "[1, 2]").unwrap();

        let err = Category::open("bad", dir.path(), &ConfigMap::new(), &mut |_: &Path| {}).unwrap_err();
        assert!(matches!(err, CoreError::NotAMapping { .. }));
    }

    #[test]
    fn test_names_with_separators_are_rejected() {
        assert!(validate_name("../escape").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("GENERAL").is_ok());
    }

    #[test]
    fn test_keys_sharing_a_wire_form_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut category = open_in(dir.path(), "GENERAL");
        category.set("1", "string key").unwrap();

        let before = category.clone();
        let err = category.set(1i64, "int key").unwrap_err();

        match err {
            CoreError::KeyCollision { category: name, key } => {
                assert_eq!(name, "GENERAL");
                assert_eq!(key, "1");
            }
            other => panic!("expected a key collision, got {other:?}"),
        }
        assert_eq!(category, before);

        category.save().unwrap();
        let reloaded = open_in(dir.path(), "GENERAL");
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_nested_collisions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut category = open_in(dir.path(), "GENERAL");

        let mut nested = ConfigMap::new();
        nested.insert(ConfigKey::String("true".into()), ConfigValue::Integer(1));
        nested.insert(ConfigKey::Bool(true), ConfigValue::Integer(2));
        let err = category.set("flags", ConfigValue::Map(nested)).unwrap_err();

        assert!(matches!(err, CoreError::KeyCollision { .. }));
        assert!(category.is_empty());
    }

    #[test]
    fn test_save_refuses_to_drop_colliding_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut category = open_in(dir.path(), "GENERAL");
        category.set("a", 1).unwrap();
        category.save().unwrap();

        let mut nested = ConfigMap::new();
        nested.insert(ConfigKey::Integer(7), ConfigValue::Null);
        nested.insert(ConfigKey::String("7".into()), ConfigValue::Null);
        *category.get_mut("a").unwrap() = ConfigValue::Map(nested);

        assert!(matches!(category.save(), Err(CoreError::KeyCollision { .. })));
        let on_disk = std::fs::read_to_string(category.path()).unwrap();
        assert!(on_disk.contains("\"a\": 1"));
    }

    #[test]
    fn test_equal_instants_in_one_file_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("EVENTS.json"),
            r#"{"2024-01-01T00:00:00Z": "a", "2024-01-01T01:00:00+01:00": "b"}"#,
        )
        .unwrap();

        let err = Category::open("EVENTS", dir.path(), &ConfigMap::new(), &mut |_: &Path| {})
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedValue { .. }));
    }
}
