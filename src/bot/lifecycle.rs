//! Bot lifecycle: start, run, stop.
//!
//! `start` loads persisted prefixes, attaches the core transport
//! handlers, loads modules, and announces the lifecycle events. `stop`
//! is the reverse: stop event, transfer drain, module unload, handler
//! detach.

use super::{Bot, COMMAND_GROUP, CONVERSATION_GROUP};
use crate::dispatch::predicate;
use crate::error::{BotError, DbError};
use crate::event::Event;
use crate::transport::{Update, UpdateKind, UpdateSink};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value, json};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{info, warn};

/// How long `stop` waits for cancelled transfers to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

impl Bot {
    /// Bring the bot online: persisted prefixes, transport handlers,
    /// modules, lifecycle events. Must run before the first message.
    pub async fn start(&self) -> Result<(), BotError> {
        info!("starting");
        self.load_prefixes().await?;
        self.attach_core_handlers();
        self.load_default_modules().await?;

        let bot = self.arc();
        self.router.dispatch(&bot, &Event::Load).await;

        let now = Utc::now();
        self.mark_started(now);
        self.running.store(true, Ordering::SeqCst);
        self.router
            .dispatch(&bot, &Event::Start(now.timestamp_micros()))
            .await;

        info!(prefix = %self.prefix(), sudo_prefix = %self.sudo_prefix(), "bot is ready");
        self.router.dispatch(&bot, &Event::Started).await;
        Ok(())
    }

    /// Start, then idle until [`Bot::shutdown`] fires, then stop.
    pub async fn run(&self) -> Result<(), BotError> {
        self.start().await?;
        info!("idling");
        self.stop_token.cancelled().await;
        self.stop().await
    }

    /// Request shutdown; safe to call from signal handlers or other
    /// tasks.
    pub fn shutdown(&self) {
        self.stop_token.cancel();
    }

    /// Drain in-flight work and detach from the transport. Idempotent.
    pub async fn stop(&self) -> Result<(), BotError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!("stopping");
        self.router.dispatch(&self.arc(), &Event::Stop).await;

        let cancelled = self.transfers.cancel_all();
        if cancelled > 0 {
            info!(count = cancelled, "cancelling in-flight transfers");
        }
        if !self.transfers.wait_idle(DRAIN_TIMEOUT).await {
            warn!(remaining = self.transfers.len(), "transfers did not drain in time");
        }

        self.unload_all_modules().await;
        self.router.detach_all(self);
        for (client, id) in self.drain_core_handlers() {
            client.remove_handler(id);
        }
        self.conversations.close_all();
        info!("stopped");
        Ok(())
    }

    /// Load prefix configuration from the core document, writing the
    /// defaults back on first run.
    async fn load_prefixes(&self) -> Result<(), DbError> {
        let store = self.db.collection("core");
        let doc = store.find_one().await?;

        let mut missing = Map::new();
        for (key, default) in [("prefix", "."), ("sudoprefix", "!")] {
            let value = doc
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    missing.insert(key.to_string(), Value::String(default.to_string()));
                    default.to_string()
                });
            match key {
                "prefix" => self.set_prefix_value(&value),
                _ => self.set_sudo_prefix_value(&value),
            }
        }
        if !missing.is_empty() {
            store.find_one_and_update(Value::Object(missing), true).await?;
        }
        Ok(())
    }

    /// Change the primary prefix, persisting through the document store.
    pub async fn set_prefix(&self, value: &str) -> Result<(), DbError> {
        self.db
            .collection("core")
            .find_one_and_update(json!({ "prefix": value }), true)
            .await?;
        self.set_prefix_value(value);
        Ok(())
    }

    fn attach_core_handlers(&self) {
        let weak = self.weak();

        let id = self.client().add_handler(
            UpdateKind::Message,
            COMMAND_GROUP,
            Arc::new(OwnerCommandSink { bot: weak.clone() }),
        );
        self.track_core_handler(self.client().clone(), id);

        if let Some(bot_client) = self.bot_client() {
            let id = bot_client.add_handler(
                UpdateKind::Message,
                COMMAND_GROUP,
                Arc::new(SudoCommandSink { bot: weak.clone() }),
            );
            self.track_core_handler(bot_client.clone(), id);
        }

        let id = self.client().add_handler(
            UpdateKind::Message,
            CONVERSATION_GROUP,
            Arc::new(ConversationSink { bot: weak }),
        );
        self.track_core_handler(self.client().clone(), id);
    }
}

/// Owner commands on the primary channel: primary prefix plus the
/// outgoing-eligibility filter.
struct OwnerCommandSink {
    bot: Weak<Bot>,
}

#[async_trait]
impl UpdateSink for OwnerCommandSink {
    async fn deliver(&self, update: Update) {
        let Some(bot) = self.bot.upgrade() else {
            return;
        };
        let Update::Message(mut msg) = update else {
            return;
        };
        if !predicate::outgoing(&msg) {
            return;
        }
        let Some(segments) = predicate::match_owner(&msg, &bot.prefix()) else {
            return;
        };
        msg.segments = segments;
        let client = bot.client().clone();
        bot.on_command(client, msg).await;
    }
}

/// Elevated commands on the secondary channel: sudo prefix plus owner
/// identity. No outgoing filter - the owner talks to the service bot
/// from a regular account.
struct SudoCommandSink {
    bot: Weak<Bot>,
}

#[async_trait]
impl UpdateSink for SudoCommandSink {
    async fn deliver(&self, update: Update) {
        let Some(bot) = self.bot.upgrade() else {
            return;
        };
        let Update::Message(mut msg) = update else {
            return;
        };
        let Some(segments) = predicate::match_sudo(&msg, &bot.sudo_prefix(), bot.uid()) else {
            return;
        };
        msg.segments = segments;
        let Some(client) = bot.bot_client().cloned() else {
            return;
        };
        bot.on_command(client, msg).await;
    }
}

/// Feeds inbound messages to pending conversation waiters.
struct ConversationSink {
    bot: Weak<Bot>,
}

#[async_trait]
impl UpdateSink for ConversationSink {
    async fn deliver(&self, update: Update) {
        let Some(bot) = self.bot.upgrade() else {
            return;
        };
        let Update::Message(msg) = update else {
            return;
        };
        if msg.outgoing {
            return;
        }
        bot.conversations.deliver(&msg);
    }
}
