//! Shared test harness.
//!
//! Provides a scripted in-memory transport plus bot assembly and message
//! builders. Each test binary pulls in the subset it needs.

#![allow(dead_code)]

pub mod modules;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use umbra::config::{BotOptions, Config, DatabaseConfig, DriveConfig, TelegramConfig};
use umbra::db::Database;
use umbra::transport::{
    ChatKind, ChatRef, Document, HandlerId, Message, ProgressFn, SendOptions, Transport, Update,
    UpdateKind, UpdateSink, UserRef,
};
use umbra::{Bot, TransportError};

/// Default test chat.
pub const CHAT: i64 = 100;
/// The bot owner's user id.
pub const OWNER_ID: i64 = 7000;

/// One observed transport side effect.
#[derive(Debug, Clone)]
pub enum Action {
    Send {
        chat: i64,
        id: i64,
        text: String,
        reply_to: Option<i64>,
    },
    Edit {
        chat: i64,
        id: i64,
        text: String,
    },
    Delete {
        chat: i64,
        id: i64,
    },
    Document {
        chat: i64,
        id: i64,
        file_name: String,
        text: String,
        caption: Option<String>,
    },
}

struct HandlerEntry {
    id: HandlerId,
    kind: UpdateKind,
    group: i32,
    sink: Arc<dyn UpdateSink>,
}

/// Scripted transport: updates are injected by the test, side effects are
/// recorded for assertion.
pub struct MockTransport {
    identity: UserRef,
    next_msg_id: AtomicI64,
    next_handler_id: AtomicU64,
    handlers: Mutex<Vec<HandlerEntry>>,
    actions: Mutex<Vec<Action>>,
    /// Current text of every known message, for NotModified detection.
    texts: Mutex<HashMap<(i64, i64), String>>,
    /// Media payloads by message id.
    media: Mutex<HashMap<i64, Bytes>>,
    /// When set, downloads block until the task is cancelled.
    pub hold_downloads: AtomicBool,
}

impl MockTransport {
    pub fn new(identity: UserRef) -> Arc<Self> {
        Arc::new(Self {
            identity,
            next_msg_id: AtomicI64::new(10_000),
            next_handler_id: AtomicU64::new(1),
            handlers: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
            texts: Mutex::new(HashMap::new()),
            media: Mutex::new(HashMap::new()),
            hold_downloads: AtomicBool::new(false),
        })
    }

    /// Deliver an update to every registered handler of its kind, in
    /// group order.
    pub async fn inject(&self, update: Update) {
        if let Update::Message(msg) = &update {
            if let Some(text) = &msg.text {
                self.texts
                    .lock()
                    .insert((msg.chat.id, msg.id), text.clone());
            }
        }
        let mut sinks: Vec<(i32, Arc<dyn UpdateSink>)> = self
            .handlers
            .lock()
            .iter()
            .filter(|h| h.kind == update.kind())
            .map(|h| (h.group, h.sink.clone()))
            .collect();
        sinks.sort_by_key(|(group, _)| *group);
        for (_, sink) in sinks {
            sink.deliver(update.clone()).await;
        }
    }

    pub fn set_media(&self, message_id: i64, payload: Bytes) {
        self.media.lock().insert(message_id, payload);
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }

    pub fn handler_count(&self, kind: UpdateKind) -> usize {
        self.handlers.lock().iter().filter(|h| h.kind == kind).count()
    }

    /// Current rendered text of a message, `None` once deleted.
    pub fn rendered(&self, chat: i64, id: i64) -> Option<String> {
        self.texts.lock().get(&(chat, id)).cloned()
    }

    /// Text of the most recent edit.
    pub fn last_edit(&self) -> Option<String> {
        self.actions
            .lock()
            .iter()
            .rev()
            .find_map(|action| match action {
                Action::Edit { text, .. } => Some(text.clone()),
                _ => None,
            })
    }

    /// All texts sent as fresh messages.
    pub fn sent_texts(&self) -> Vec<String> {
        self.actions
            .lock()
            .iter()
            .filter_map(|action| match action {
                Action::Send { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn documents(&self) -> Vec<Action> {
        self.actions
            .lock()
            .iter()
            .filter(|action| matches!(action, Action::Document { .. }))
            .cloned()
            .collect()
    }

    pub fn was_deleted(&self, chat: i64, id: i64) -> bool {
        self.actions
            .lock()
            .iter()
            .any(|action| matches!(action, Action::Delete { chat: c, id: i } if *c == chat && *i == id))
    }

    fn outbound_message(&self, chat: i64, text: Option<String>) -> Message {
        let id = self.next_msg_id.fetch_add(1, Ordering::Relaxed);
        let mut msg = Message::text(id, ChatRef { id: chat, kind: ChatKind::Private }, "");
        msg.text = text;
        msg.from = Some(self.identity.clone());
        msg.outgoing = true;
        msg
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn identity(&self) -> UserRef {
        self.identity.clone()
    }

    async fn send_message(
        &self,
        chat: i64,
        text: &str,
        options: &SendOptions,
    ) -> Result<Message, TransportError> {
        let msg = self.outbound_message(chat, Some(text.to_string()));
        self.texts.lock().insert((chat, msg.id), text.to_string());
        self.actions.lock().push(Action::Send {
            chat,
            id: msg.id,
            text: text.to_string(),
            reply_to: options.reply_to,
        });
        Ok(msg)
    }

    async fn edit_message(
        &self,
        chat: i64,
        message_id: i64,
        text: &str,
        _options: &SendOptions,
    ) -> Result<Message, TransportError> {
        {
            let mut texts = self.texts.lock();
            match texts.get(&(chat, message_id)) {
                Some(current) if current == text => return Err(TransportError::NotModified),
                Some(_) | None => {
                    texts.insert((chat, message_id), text.to_string());
                }
            }
        }
        self.actions.lock().push(Action::Edit {
            chat,
            id: message_id,
            text: text.to_string(),
        });
        let mut msg = self.outbound_message(chat, Some(text.to_string()));
        msg.id = message_id;
        Ok(msg)
    }

    async fn delete_message(&self, chat: i64, message_id: i64) -> Result<(), TransportError> {
        self.texts.lock().remove(&(chat, message_id));
        self.actions.lock().push(Action::Delete {
            chat,
            id: message_id,
        });
        Ok(())
    }

    async fn send_document(
        &self,
        chat: i64,
        document: Document,
        _options: &SendOptions,
    ) -> Result<Message, TransportError> {
        let msg = self.outbound_message(chat, None);
        self.actions.lock().push(Action::Document {
            chat,
            id: msg.id,
            file_name: document.file_name,
            text: String::from_utf8_lossy(&document.bytes).into_owned(),
            caption: document.caption,
        });
        Ok(msg)
    }

    async fn download_media(
        &self,
        message: &Message,
        progress: Option<ProgressFn>,
    ) -> Result<Bytes, TransportError> {
        if self.hold_downloads.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let payload = self
            .media
            .lock()
            .get(&message.id)
            .cloned()
            .ok_or(TransportError::NoMedia(message.id))?;
        if let Some(progress) = progress {
            let total = payload.len() as u64;
            progress(total / 2, total);
            progress(total, total);
        }
        Ok(payload)
    }

    fn add_handler(&self, kind: UpdateKind, group: i32, sink: Arc<dyn UpdateSink>) -> HandlerId {
        let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push(HandlerEntry {
            id,
            kind,
            group,
            sink,
        });
        id
    }

    fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|h| h.id != id);
        handlers.len() != before
    }
}

pub fn owner() -> UserRef {
    UserRef {
        id: OWNER_ID,
        username: Some("owner".to_string()),
        is_self: true,
        is_bot: false,
    }
}

pub fn service_bot() -> UserRef {
    UserRef {
        id: 9_900,
        username: Some("umbra_bot".to_string()),
        is_self: true,
        is_bot: true,
    }
}

/// Config with every secret slot populated, so redaction is observable.
pub fn test_config() -> Config {
    Config {
        telegram: TelegramConfig {
            api_id: 776_655,
            api_hash: "hush-hush-hash".to_string(),
            string_session: Some("sess-payload".to_string()),
            bot_token: Some("990:svc-token".to_string()),
        },
        database: DatabaseConfig {
            uri: ":memory:".to_string(),
        },
        bot: BotOptions::default(),
        drive: Some(DriveConfig {
            client_id: "drive-cid.apps".to_string(),
            client_secret: "drive-csecret".to_string(),
            folder_id: None,
            index_link: None,
        }),
    }
}

/// Assemble and start a bot over a single mock channel.
pub async fn spawn_bot() -> (Arc<Bot>, Arc<MockTransport>) {
    let client = MockTransport::new(owner());
    let db = Database::connect(":memory:").await.expect("in-memory db");
    let bot = Bot::new(test_config(), db, client.clone(), None);
    bot.start().await.expect("bot start");
    (bot, client)
}

/// Assemble and start a bot with both channels.
pub async fn spawn_bot_with_elevated() -> (Arc<Bot>, Arc<MockTransport>, Arc<MockTransport>) {
    let client = MockTransport::new(owner());
    let elevated = MockTransport::new(service_bot());
    let db = Database::connect(":memory:").await.expect("in-memory db");
    let bot = Bot::new(
        test_config(),
        db,
        client.clone(),
        Some(elevated.clone() as Arc<dyn Transport>),
    );
    bot.start().await.expect("bot start");
    (bot, client, elevated)
}

/// An owner-authored (outgoing) text message in the default chat.
pub fn owner_msg(id: i64, text: &str) -> Message {
    let mut msg = Message::text(
        id,
        ChatRef {
            id: CHAT,
            kind: ChatKind::Private,
        },
        text,
    );
    msg.from = Some(owner());
    msg.outgoing = true;
    msg
}

/// A message from someone else in the default chat.
pub fn incoming_msg(id: i64, from_id: i64, text: &str) -> Message {
    let mut msg = Message::text(
        id,
        ChatRef {
            id: CHAT,
            kind: ChatKind::Private,
        },
        text,
    );
    msg.from = Some(UserRef {
        id: from_id,
        username: None,
        is_self: false,
        is_bot: false,
    });
    msg
}
