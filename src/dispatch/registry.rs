//! Command registry.
//!
//! Single source of truth for dispatch lookup. Registration happens at
//! module load; lookups happen on every inbound command. Mutations hold a
//! plain (non-async) write lock and never await, so a partially applied
//! batch is never observable from the event loop.

use crate::command::{Command, CommandSpec};
use crate::error::RegistryError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Mapping of command names and aliases to handler records.
#[derive(Default)]
pub struct CommandRegistry {
    /// Primary names and aliases all map here; aliases share the Arc of
    /// their primary entry.
    commands: RwLock<HashMap<String, Arc<Command>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one command for `module`.
    ///
    /// Fails with [`RegistryError::Duplicate`] when the primary name or
    /// any alias collides with an existing name or alias; on failure
    /// nothing is inserted.
    pub fn register(
        &self,
        module: &'static str,
        spec: CommandSpec,
    ) -> Result<Arc<Command>, RegistryError> {
        let cmd = Arc::new(Command::new(module, spec));
        let mut map = self.commands.write();

        // Check every key before inserting any, so a collision on the
        // third alias can't leave the first two behind.
        if let Some(existing) = map.get(cmd.name()) {
            return Err(RegistryError::Duplicate {
                name: cmd.name().to_string(),
                existing_module: existing.module(),
                module,
                alias: false,
            });
        }
        for alias in cmd.aliases() {
            if let Some(existing) = map.get(*alias) {
                return Err(RegistryError::Duplicate {
                    name: (*alias).to_string(),
                    existing_module: existing.module(),
                    module,
                    alias: true,
                });
            }
        }

        map.insert(cmd.name().to_string(), cmd.clone());
        for alias in cmd.aliases() {
            map.insert((*alias).to_string(), cmd.clone());
        }
        Ok(cmd)
    }

    /// Register a module's whole command batch atomically: on the first
    /// collision, every command of this batch already registered is
    /// unregistered before the error propagates.
    pub fn register_all(
        &self,
        module: &'static str,
        specs: Vec<CommandSpec>,
    ) -> Result<Vec<Arc<Command>>, RegistryError> {
        let mut registered = Vec::with_capacity(specs.len());
        for spec in specs {
            match self.register(module, spec) {
                Ok(cmd) => registered.push(cmd),
                Err(err) => {
                    for cmd in &registered {
                        self.unregister(cmd);
                    }
                    return Err(err);
                }
            }
        }
        Ok(registered)
    }

    /// Remove a command's primary name and all of its aliases.
    ///
    /// Idempotent: aliases already gone (or since taken over by another
    /// command) are skipped silently.
    pub fn unregister(&self, cmd: &Arc<Command>) {
        let mut map = self.commands.write();
        if map
            .get(cmd.name())
            .is_some_and(|existing| Arc::ptr_eq(existing, cmd))
        {
            map.remove(cmd.name());
        }
        for alias in cmd.aliases() {
            if map
                .get(*alias)
                .is_some_and(|existing| Arc::ptr_eq(existing, cmd))
            {
                map.remove(*alias);
            }
        }
    }

    /// Remove every command whose primary name maps back to `module`.
    /// Returns the number of commands removed.
    pub fn unregister_module(&self, module: &str) -> usize {
        let to_remove: Vec<Arc<Command>> = {
            let map = self.commands.read();
            map.iter()
                .filter(|(key, cmd)| key.as_str() == cmd.name() && cmd.module() == module)
                .map(|(_, cmd)| cmd.clone())
                .collect()
        };
        for cmd in &to_remove {
            self.unregister(cmd);
        }
        to_remove.len()
    }

    /// Look up a command by primary name or alias.
    pub fn get(&self, token: &str) -> Option<Arc<Command>> {
        self.commands.read().get(token).cloned()
    }

    /// Distinct registered commands (primary entries only).
    pub fn commands(&self) -> Vec<Arc<Command>> {
        self.commands
            .read()
            .iter()
            .filter(|(key, cmd)| key.as_str() == cmd.name())
            .map(|(_, cmd)| cmd.clone())
            .collect()
    }

    /// Per-command usage counts, most used first, zero-use commands
    /// omitted.
    pub fn usage_stats(&self) -> Vec<(&'static str, u64)> {
        let mut stats: Vec<_> = self
            .commands()
            .iter()
            .map(|cmd| (cmd.name(), cmd.use_count()))
            .filter(|(_, count)| *count > 0)
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1));
        stats
    }
}
