//! Module event router.
//!
//! Maps event classes to active listeners and keeps at most one low-level
//! transport registration per class per channel, attached lazily while at
//! least one listener exists and detached when the last one is removed.
//! This avoids paying transport-layer overhead for event classes nobody
//! consumes.

use super::{Event, EventClass, EventListener, ListenerSpec};
use crate::bot::{Bot, EVENT_GROUP};
use crate::transport::{HandlerId, Transport, Update, UpdateSink};
use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, error, trace};

#[derive(Clone)]
struct ListenerEntry {
    module: &'static str,
    listener: Arc<dyn EventListener>,
}

/// Listener tables plus the per-channel subscription state.
#[derive(Default)]
pub struct EventRouter {
    listeners: RwLock<HashMap<EventClass, Vec<ListenerEntry>>>,
    /// Active registrations on the primary channel. Mutations are
    /// critical sections: the lock is plain and registration is
    /// synchronous, so no partial update is ever observable.
    active: Mutex<HashMap<EventClass, HandlerId>>,
    /// Independent subscription table for the elevated channel.
    active_elevated: Mutex<HashMap<EventClass, HandlerId>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module listener. Activation happens separately via
    /// [`EventRouter::refresh`].
    pub fn add_listener(&self, module: &'static str, spec: ListenerSpec) {
        self.listeners
            .write()
            .entry(spec.class)
            .or_default()
            .push(ListenerEntry {
                module,
                listener: spec.listener,
            });
    }

    /// Drop every listener belonging to `module`. Returns the classes
    /// that lost listeners.
    pub fn remove_module(&self, module: &str) -> Vec<EventClass> {
        let mut affected = Vec::new();
        let mut table = self.listeners.write();
        table.retain(|class, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.module != module);
            if entries.len() != before {
                affected.push(*class);
            }
            !entries.is_empty()
        });
        affected
    }

    pub fn listener_count(&self, class: EventClass) -> usize {
        self.listeners
            .read()
            .get(&class)
            .map_or(0, |entries| entries.len())
    }

    /// Whether a low-level registration is currently active for `class`.
    pub fn is_active(&self, class: EventClass) -> bool {
        if class.elevated() {
            self.active_elevated.lock().contains_key(&class)
        } else {
            self.active.lock().contains_key(&class)
        }
    }

    /// Number of active low-level registrations across both channels.
    pub fn active_count(&self) -> usize {
        self.active.lock().len() + self.active_elevated.lock().len()
    }

    /// Reconcile every transport-backed class with its listener count:
    /// attach where listeners appeared, detach where they vanished.
    pub fn refresh(&self, bot: &Bot) {
        for class in EventClass::TRANSPORT {
            if self.listener_count(class) > 0 {
                self.activate(bot, class);
            } else {
                self.deactivate(bot, class);
            }
        }
    }

    /// Attach the low-level handler for `class` if listeners exist and no
    /// registration is active. Idempotent.
    pub fn activate(&self, bot: &Bot, class: EventClass) {
        let Some(kind) = class.update_kind() else {
            return;
        };
        let Some(client) = channel_for(bot, class) else {
            // Elevated-only class without an elevated channel.
            return;
        };
        if self.listener_count(class) == 0 {
            return;
        }

        let mut active = if class.elevated() {
            self.active_elevated.lock()
        } else {
            self.active.lock()
        };
        if active.contains_key(&class) {
            return;
        }
        let sink = Arc::new(FanoutSink { bot: bot.weak() });
        let id = client.add_handler(kind, EVENT_GROUP, sink);
        active.insert(class, id);
        debug!(event = class.name(), "event class activated");
    }

    /// Detach the low-level handler for `class` once no listeners remain.
    /// Idempotent.
    pub fn deactivate(&self, bot: &Bot, class: EventClass) {
        if self.listener_count(class) > 0 {
            return;
        }
        let Some(client) = channel_for(bot, class) else {
            return;
        };
        let mut active = if class.elevated() {
            self.active_elevated.lock()
        } else {
            self.active.lock()
        };
        if let Some(id) = active.remove(&class) {
            client.remove_handler(id);
            debug!(event = class.name(), "event class deactivated");
        }
    }

    /// Remove every active registration (shutdown path).
    pub fn detach_all(&self, bot: &Bot) {
        let drained: Vec<(EventClass, HandlerId)> = {
            let mut primary = self.active.lock();
            let mut elevated = self.active_elevated.lock();
            primary.drain().chain(elevated.drain()).collect()
        };
        for (class, id) in drained {
            if let Some(client) = channel_for(bot, class) {
                client.remove_handler(id);
            }
        }
    }

    /// Fan an event out to every listener of its class. Listener errors
    /// are logged, never propagated.
    pub async fn dispatch(&self, bot: &Arc<Bot>, event: &Event) {
        let class = event.class();
        let entries: Vec<ListenerEntry> = self
            .listeners
            .read()
            .get(&class)
            .cloned()
            .unwrap_or_default();
        if entries.is_empty() {
            return;
        }

        trace!(event = class.name(), listeners = entries.len(), "dispatching event");
        join_all(entries.iter().map(|entry| async move {
            if let Err(err) = entry.listener.on_event(bot, event).await {
                error!(
                    module = entry.module,
                    event = class.name(),
                    error = ?err,
                    "event listener failed"
                );
            }
        }))
        .await;
    }
}

fn channel_for(bot: &Bot, class: EventClass) -> Option<Arc<dyn Transport>> {
    if class.elevated() {
        bot.bot_client().cloned()
    } else {
        Some(bot.client().clone())
    }
}

/// Wraps a transport registration: every delivered update becomes an
/// event dispatched to the listeners of its class.
struct FanoutSink {
    bot: Weak<Bot>,
}

#[async_trait]
impl UpdateSink for FanoutSink {
    async fn deliver(&self, update: Update) {
        let Some(bot) = self.bot.upgrade() else {
            return;
        };
        let event = Event::from(update);
        bot.router.dispatch(&bot, &event).await;
    }
}
