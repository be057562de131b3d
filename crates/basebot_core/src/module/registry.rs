use std::collections::BTreeMap;
use std::sync::Arc;

use super::{CommandModule, ModuleContext};
use crate::error::{CoreError, Result};

/// Builds a fresh module instance
pub type ModuleConstructor = fn(&ModuleContext) -> Arc<dyn CommandModule>;

/// Names starting with `_` are templates and never loaded automatically
pub fn is_template(name: &str) -> bool {
    name.starts_with('_')
}

/// Every module the binary was built with, by name
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    constructors: BTreeMap<String, ModuleConstructor>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.constructors.keys()).finish()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor, replacing any earlier one with the same name
    pub fn register(&mut self, name: impl Into<String>, constructor: ModuleConstructor) -> &mut Self {
        self.constructors.insert(name.into(), constructor);
        self
    }

    pub fn with(mut self, name: impl Into<String>, constructor: ModuleConstructor) -> Self {
        self.register(name, constructor);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Loadable module names, sorted, templates excluded
    pub fn available(&self) -> Vec<String> {
        self.constructors
            .keys()
            .filter(|name| !is_template(name))
            .cloned()
            .collect()
    }

    /// All registered names, templates included
    pub fn available_all(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// Build a new instance of `name`
    pub fn construct(&self, name: &str, context: &ModuleContext) -> Result<Arc<dyn CommandModule>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| CoreError::ModuleNotFound {
                name: name.to_string(),
                available: self.available(),
            })?;
        Ok(constructor(context))
    }
}
