use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::category::{Category, validate_name};
use super::value::{ConfigMap, ConfigValue, IntoConfigKey, IntoConfigValue};
use crate::error::{CoreError, Result};

/// Directory under the config root that holds the default files
pub const DEFAULTS_DIR: &str = "default";

/// Config store shared between the event handler and command modules
pub type SharedConfig = Arc<RwLock<ConfigStore>>;

/// All live categories of the running bot
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigStore {
    root: PathBuf,
    categories: HashMap<String, Category>,
}

impl ConfigStore {
    /// An empty store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            categories: HashMap::new(),
        }
    }

    /// Load every category that has a file in `<root>/default/`
    pub fn bootstrap(root: impl Into<PathBuf>) -> Result<Self> {
        Self::bootstrap_with(root, |_| {})
    }

    /// Like [`bootstrap`](Self::bootstrap), calling `on_new_file` for every
    /// live file that had to be created
    ///
    /// Defaults only fill keys the live file does not have yet. Each live file
    /// is rewritten after merging, and the whole store is saved once more at
    /// the end.
    pub fn bootstrap_with(
        root: impl Into<PathBuf>,
        mut on_new_file: impl FnMut(&Path),
    ) -> Result<Self> {
        let mut store = Self::new(root);
        let defaults_dir = store.defaults_dir();

        for name in scan_category_names(&defaults_dir)? {
            let defaults = Category::open(&name, &defaults_dir, &ConfigMap::new(), &mut |_: &Path| {})?;
            let mut live =
                Category::open(&name, &store.root, defaults.entries(), &mut on_new_file)?;

            let added = live.merge_missing(&defaults);
            if added > 0 {
                info!("Added {} default keys to category {}", added, name);
            }
            live.save()?;
            store.insert(&name, live)?;
        }

        store.save()?;
        info!(
            "Loaded {} config categories from {}",
            store.len(),
            store.root.display()
        );
        Ok(store)
    }

    /// Wrap the store for sharing across tasks
    pub fn into_shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn defaults_dir(&self) -> PathBuf {
        self.root.join(DEFAULTS_DIR)
    }

    /// Register a category under `name`
    ///
    /// The name has to be a valid category name and match the category's own
    /// name, since that is the file it saves to. Returns the replaced category.
    pub fn insert(&mut self, name: &str, category: Category) -> Result<Option<Category>> {
        validate_name(name)?;
        if category.name() != name {
            return Err(CoreError::InvalidCategoryName {
                name: name.to_string(),
                reason: format!(
                    "category '{}' cannot be stored under a different name",
                    category.name()
                ),
            });
        }
        Ok(self.categories.insert(name.to_string(), category))
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.categories.get_mut(name)
    }

    /// Like [`get`](Self::get) but with a descriptive error
    pub fn category(&self, name: &str) -> Result<&Category> {
        self.categories
            .get(name)
            .ok_or_else(|| self.not_found(name))
    }

    pub fn category_mut(&mut self, name: &str) -> Result<&mut Category> {
        let available = self.names();
        self.categories
            .get_mut(name)
            .ok_or_else(|| CoreError::CategoryNotFound {
                name: name.to_string(),
                available,
            })
    }

    /// Return the named category, creating an empty file for it if needed
    pub fn ensure_category(&mut self, name: &str) -> Result<&mut Category> {
        if !self.categories.contains_key(name) {
            let category = Category::open(name, &self.root, &ConfigMap::new(), &mut |_: &Path| {})?;
            self.insert(name, category)?;
        }
        self.category_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// Category names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.categories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Category)> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn remove(&mut self, name: &str) -> Option<Category> {
        self.categories.remove(name)
    }

    /// Look up `key` in `category`
    pub fn value<K: IntoConfigKey>(&self, category: &str, key: K) -> Option<&ConfigValue> {
        self.categories.get(category)?.get(key)
    }

    /// Assign `key` in an existing category
    pub fn set<K, V>(&mut self, category: &str, key: K, value: V) -> Result<Option<ConfigValue>>
    where
        K: IntoConfigKey,
        V: IntoConfigValue,
    {
        self.category_mut(category)?.set(key, value)
    }

    /// Write every category to its file
    pub fn save(&self) -> Result<()> {
        for category in self.categories.values() {
            category.save()?;
        }
        debug!("Saved {} config categories", self.categories.len());
        Ok(())
    }

    /// Borrow the store through a guard that saves it when dropped
    pub fn guard(&mut self) -> SaveGuard<'_> {
        SaveGuard {
            store: self,
            finished: false,
        }
    }

    /// Run `f` against the store and save afterwards, whether `f` failed or not
    ///
    /// An error from `f` takes precedence over an error from saving.
    pub fn scoped<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
        E: From<CoreError>,
    {
        let result = f(self);
        let saved = self.save();
        let value = result?;
        saved?;
        Ok(value)
    }

    fn not_found(&self, name: &str) -> CoreError {
        CoreError::CategoryNotFound {
            name: name.to_string(),
            available: self.names(),
        }
    }
}

/// Saves the store when it goes out of scope
///
/// Errors during the drop-time save can only be logged; call
/// [`finish`](SaveGuard::finish) to see them.
pub struct SaveGuard<'a> {
    store: &'a mut ConfigStore,
    finished: bool,
}

impl SaveGuard<'_> {
    /// Save now and report the outcome
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.store.save()
    }
}

impl Deref for SaveGuard<'_> {
    type Target = ConfigStore;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl DerefMut for SaveGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.store
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.store.save() {
            error!("Failed to save config on scope exit: {}", e);
        }
    }
}

/// Stems of the `.json` files in `dir`, sorted
fn scan_category_names(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::config_io(dir, "scan", e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::config_io(dir, "scan", e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            debug!("Skipping non-JSON file {}", path.display());
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}
