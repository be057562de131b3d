use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{info, warn};

use super::registry::ModuleRegistry;
use super::{CommandModule, CommandSpec, ModuleContext};
use crate::error::{CoreError, Result};

/// Module host shared between the event handler and the owner commands
pub type SharedHost = Arc<tokio::sync::RwLock<ModuleHost>>;

/// A module that could not be loaded during a bulk operation
#[derive(Debug)]
pub struct LoadFailure {
    pub module: String,
    pub error: CoreError,
}

/// Tracks which modules are loaded and which module owns each command
pub struct ModuleHost {
    registry: ModuleRegistry,
    context: ModuleContext,
    loaded: BTreeMap<String, Arc<dyn CommandModule>>,
    commands: HashMap<String, String>,
}

impl std::fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHost")
            .field("registry", &self.registry)
            .field("loaded", &self.loaded.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleHost {
    pub fn new(registry: ModuleRegistry, context: ModuleContext) -> Self {
        Self {
            registry,
            context,
            loaded: BTreeMap::new(),
            commands: HashMap::new(),
        }
    }

    pub fn into_shared(self) -> SharedHost {
        Arc::new(tokio::sync::RwLock::new(self))
    }

    pub fn context(&self) -> &ModuleContext {
        &self.context
    }

    /// Modules that can be loaded, templates excluded
    pub fn available(&self) -> Vec<String> {
        self.registry.available()
    }

    /// Names of loaded modules, sorted
    pub fn loaded(&self) -> Vec<String> {
        self.loaded.keys().cloned().collect()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    pub fn module(&self, name: &str) -> Option<Arc<dyn CommandModule>> {
        self.loaded.get(name).cloned()
    }

    /// The loaded module that declared `command`
    pub fn find_command(&self, command: &str) -> Option<Arc<dyn CommandModule>> {
        let module = self.commands.get(command)?;
        self.loaded.get(module).cloned()
    }

    /// Commands of every loaded module
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.loaded.values().flat_map(|m| m.commands()).collect()
    }

    /// Construct, set up and register a module
    ///
    /// Nothing is registered unless every step succeeds.
    pub async fn load(&mut self, name: &str) -> Result<()> {
        if self.is_loaded(name) {
            return Err(CoreError::ModuleAlreadyLoaded {
                name: name.to_string(),
            });
        }

        let module = self.registry.construct(name, &self.context)?;
        let commands: Vec<String> = module.commands().into_iter().map(|c| c.name).collect();
        for command in &commands {
            if let Some(existing) = self.commands.get(command) {
                return Err(CoreError::DuplicateCommand {
                    command: command.clone(),
                    module: name.to_string(),
                    existing_module: existing.clone(),
                });
            }
        }

        module
            .setup()
            .await
            .map_err(|cause| CoreError::ModuleSetupFailed {
                name: name.to_string(),
                cause,
            })?;

        for command in commands {
            self.commands.insert(command, name.to_string());
        }
        self.loaded.insert(name.to_string(), module);
        info!("Loaded module {}", name);
        Ok(())
    }

    /// Tear down and discard a loaded module
    pub async fn unload(&mut self, name: &str) -> Result<()> {
        let module = self
            .loaded
            .remove(name)
            .ok_or_else(|| CoreError::ModuleNotLoaded {
                name: name.to_string(),
            })?;
        self.commands.retain(|_, owner| owner != name);
        module.teardown().await;
        info!("Unloaded module {}", name);
        Ok(())
    }

    /// Unload and load again with a fresh instance
    pub async fn reload(&mut self, name: &str) -> Result<()> {
        self.unload(name).await?;
        self.load(name).await
    }

    /// Load every available module that is not loaded yet
    ///
    /// Failures are logged and returned, they never stop the remaining loads.
    pub async fn load_all(&mut self) -> Vec<LoadFailure> {
        let mut failures = Vec::new();
        for name in self.available() {
            if self.is_loaded(&name) {
                continue;
            }
            if let Err(error) = self.load(&name).await {
                warn!("Failed to load module {}: {}", name, error);
                failures.push(LoadFailure { module: name, error });
            }
        }
        failures
    }

    /// Reload every available module, loading the ones that were not loaded
    pub async fn reload_all(&mut self) -> Vec<LoadFailure> {
        for name in self.available() {
            match self.unload(&name).await {
                Ok(()) | Err(CoreError::ModuleNotLoaded { .. }) => {}
                Err(error) => warn!("Failed to unload module {}: {}", name, error),
            }
        }
        self.load_all().await
    }
}
