//! Module load/unload.
//!
//! Loading registers the module's command batch atomically, attaches its
//! listeners, and runs its `on_load` hook; any failure rolls the whole
//! module back. Unloading reverses each step.

use super::Bot;
use crate::error::BotError;
use crate::module::Module;
use crate::modules::SystemModule;
use std::sync::Arc;
use tracing::{debug, warn};

impl Bot {
    /// Load one module. On any failure the registry, listener table, and
    /// module map are left exactly as before the call.
    pub async fn load_module(&self, module: Arc<dyn Module>) -> Result<(), BotError> {
        let name = module.name();
        if self.modules.read().contains_key(name) {
            return Err(BotError::ModuleLoad {
                module: name,
                source: anyhow::anyhow!("module is already loaded"),
            });
        }

        // Atomic per module: a collision rolls back the whole batch
        // inside register_all before the error reaches us.
        let registered = self.registry.register_all(name, module.commands())?;

        for spec in module.listeners() {
            self.router.add_listener(name, spec);
        }
        self.modules.write().insert(name, module.clone());
        self.router.refresh(self);

        if let Err(source) = module.on_load(&self.arc()).await {
            self.modules.write().remove(name);
            for cmd in &registered {
                self.registry.unregister(cmd);
            }
            self.router.remove_module(name);
            self.router.refresh(self);
            return Err(BotError::ModuleLoad {
                module: name,
                source,
            });
        }

        debug!(module = name, commands = registered.len(), "module loaded");
        Ok(())
    }

    /// Unload a module by name, removing its commands and listeners.
    pub async fn unload_module(&self, name: &str) -> Result<(), BotError> {
        let module = self
            .modules
            .write()
            .remove(name)
            .ok_or_else(|| BotError::ModuleNotLoaded(name.to_string()))?;

        self.registry.unregister_module(module.name());
        self.router.remove_module(module.name());
        self.router.refresh(self);

        if let Err(err) = module.on_unload(&self.arc()).await {
            warn!(module = module.name(), error = ?err, "module unload hook failed");
        }
        debug!(module = module.name(), "module unloaded");
        Ok(())
    }

    pub(crate) async fn unload_all_modules(&self) {
        let names: Vec<&'static str> = self.modules.read().keys().copied().collect();
        for name in names {
            if let Err(err) = self.unload_module(name).await {
                warn!(module = name, error = %err, "failed to unload module");
            }
        }
    }

    /// Look up a loaded module by name.
    pub fn module(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.read().get(name).cloned()
    }

    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.read().keys().copied().collect()
    }

    /// Load the modules bundled with the core.
    pub(crate) async fn load_default_modules(&self) -> Result<(), BotError> {
        self.load_module(Arc::new(SystemModule::new())).await
    }
}
