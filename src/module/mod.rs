//! Module contract.
//!
//! A module owns a set of commands and listeners plus a lifecycle.
//! Discovery is declarative: the module hands the core its
//! [`CommandSpec`]s and [`ListenerSpec`]s, and the core registers them
//! atomically at load time.

use crate::bot::Bot;
use crate::command::CommandSpec;
use crate::event::ListenerSpec;
use crate::transport::Message;
use async_trait::async_trait;
use std::sync::Arc;

/// Contract every module implements.
#[async_trait]
pub trait Module: Send + Sync {
    /// Unique module name; also the document-store key for the module's
    /// persisted state.
    fn name(&self) -> &'static str;

    /// Commands to register when the module loads. Registration is
    /// atomic per module: one collision rolls back the whole batch.
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }

    /// Event listeners to register when the module loads.
    fn listeners(&self) -> Vec<ListenerSpec> {
        Vec::new()
    }

    /// Whether invocations of this module's commands pass through the
    /// [`Module::authorize`] gate first. Commands marked `skip_auth`
    /// (the module's own authorization management) are exempt.
    fn requires_authorization(&self) -> bool {
        false
    }

    /// A disabled module keeps its registrations but skips the
    /// authorization gate; modules typically disable themselves when
    /// mandatory configuration is missing.
    fn disabled(&self) -> bool {
        false
    }

    /// Per-invocation authorization hook. `Some(false)` terminates the
    /// invocation silently; `None` and `Some(true)` allow it.
    async fn authorize(&self, bot: &Arc<Bot>, msg: &Message) -> Option<bool> {
        let _ = (bot, msg);
        None
    }

    /// Called after the module's commands and listeners are registered.
    /// An error here unloads the module again (full rollback).
    async fn on_load(&self, bot: &Arc<Bot>) -> anyhow::Result<()> {
        let _ = bot;
        Ok(())
    }

    /// Called after the module's registrations are removed.
    async fn on_unload(&self, bot: &Arc<Bot>) -> anyhow::Result<()> {
        let _ = bot;
        Ok(())
    }
}
