//! The composed dispatcher value.
//!
//! All bot-wide state (registry, event subscription tables, prefixes,
//! transfer set) lives in one [`Bot`] value with an explicit lifecycle
//! (`start` before the first message, `stop` draining in-flight work),
//! passed around as `Arc<Bot>` rather than ambient singletons. Transport
//! sinks hold `Weak<Bot>` so the transport never keeps the bot alive.

mod conversation;
mod lifecycle;
mod modules;
mod respond;

pub use respond::{REDACTED, ResponseMode, ResponseOptions};

use crate::config::Config;
use crate::db::Database;
use crate::dispatch::CommandRegistry;
use crate::event::EventRouter;
use crate::module::Module;
use crate::transfer::TransferSet;
use crate::transport::{HandlerId, Transport, UserRef};
use chrono::{DateTime, Utc};
use conversation::ConversationTable;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock, Weak};
use tokio_util::sync::CancellationToken;

/// Transport handler-group ordering: commands run first, then
/// conversation waiters, then module event fan-out.
pub const COMMAND_GROUP: i32 = 0;
pub const CONVERSATION_GROUP: i32 = 1;
pub const EVENT_GROUP: i32 = 2;

/// Bot-wide dispatch state and collaborators.
pub struct Bot {
    /// Back-reference to the owning `Arc`, set at construction. Lets
    /// `&self` methods hand out strong/weak handles for spawned tasks
    /// and transport sinks.
    weak_self: Weak<Bot>,
    pub config: Config,
    pub db: Database,
    /// Command registry; mutated only through module load/unload.
    pub registry: CommandRegistry,
    /// Module event router and subscription tables.
    pub router: EventRouter,
    /// In-flight background transfers.
    pub transfers: TransferSet,
    client: Arc<dyn Transport>,
    bot_client: Option<Arc<dyn Transport>>,
    pub(crate) conversations: ConversationTable,
    pub(crate) modules: RwLock<HashMap<&'static str, Arc<dyn Module>>>,
    prefix: RwLock<String>,
    sudo_prefix: RwLock<String>,
    /// Core (non-router) transport registrations, detached on stop.
    core_handlers: Mutex<Vec<(Arc<dyn Transport>, HandlerId)>>,
    pub(crate) stop_token: CancellationToken,
    pub(crate) running: AtomicBool,
    started_at: OnceLock<DateTime<Utc>>,
}

impl Bot {
    /// Assemble a bot over its external collaborators. Nothing touches
    /// the transport until [`Bot::start`].
    pub fn new(
        config: Config,
        db: Database,
        client: Arc<dyn Transport>,
        bot_client: Option<Arc<dyn Transport>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak_self: weak.clone(),
            config,
            db,
            registry: CommandRegistry::new(),
            router: EventRouter::new(),
            transfers: TransferSet::new(),
            client,
            bot_client,
            conversations: ConversationTable::new(),
            modules: RwLock::new(HashMap::new()),
            prefix: RwLock::new(".".to_string()),
            sudo_prefix: RwLock::new("!".to_string()),
            core_handlers: Mutex::new(Vec::new()),
            stop_token: CancellationToken::new(),
            running: AtomicBool::new(false),
            started_at: OnceLock::new(),
        })
    }

    /// Strong handle to self.
    ///
    /// The expect is an invariant, not a reachable failure: any live
    /// `&Bot` is borrowed out of a live `Arc<Bot>`.
    pub(crate) fn arc(&self) -> Arc<Bot> {
        self.weak_self
            .upgrade()
            .expect("Bot accessed after all strong handles dropped")
    }

    pub(crate) fn weak(&self) -> Weak<Bot> {
        self.weak_self.clone()
    }

    /// Primary (user session) channel.
    pub fn client(&self) -> &Arc<dyn Transport> {
        &self.client
    }

    /// Elevated (service/bot session) channel, when configured.
    pub fn bot_client(&self) -> Option<&Arc<dyn Transport>> {
        self.bot_client.as_ref()
    }

    pub fn has_bot(&self) -> bool {
        self.bot_client.is_some()
    }

    /// The bot owner's identity: the authenticated user behind the
    /// primary channel.
    pub fn owner(&self) -> UserRef {
        self.client.identity()
    }

    pub fn uid(&self) -> i64 {
        self.client.identity().id
    }

    /// Current primary command prefix.
    pub fn prefix(&self) -> String {
        self.prefix.read().clone()
    }

    /// Current elevated command prefix.
    pub fn sudo_prefix(&self) -> String {
        self.sudo_prefix.read().clone()
    }

    pub(crate) fn set_prefix_value(&self, value: &str) {
        *self.prefix.write() = value.to_string();
    }

    pub(crate) fn set_sudo_prefix_value(&self, value: &str) {
        *self.sudo_prefix.write() = value.to_string();
    }

    pub(crate) fn track_core_handler(&self, client: Arc<dyn Transport>, id: HandlerId) {
        self.core_handlers.lock().push((client, id));
    }

    pub(crate) fn drain_core_handlers(&self) -> Vec<(Arc<dyn Transport>, HandlerId)> {
        self.core_handlers.lock().drain(..).collect()
    }

    pub(crate) fn mark_started(&self, at: DateTime<Utc>) {
        let _ = self.started_at.set(at);
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at.get().copied()
    }

    /// Time since start, `None` before the first start.
    pub fn uptime(&self) -> Option<chrono::Duration> {
        self.started_at().map(|at| Utc::now() - at)
    }
}
