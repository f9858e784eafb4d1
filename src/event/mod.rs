//! Named event classes and the listener contract.

mod router;

pub use router::EventRouter;

use crate::bot::Bot;
use crate::command::Command;
use crate::transport::{CallbackQuery, InlineQuery, Message, Update, UpdateKind};
use async_trait::async_trait;
use std::sync::Arc;

/// Recognized event classes.
///
/// Transport-backed classes are attached to a low-level transport handler
/// lazily (only while listeners exist); internal classes fan out inside
/// the process and never touch the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Message,
    MessageEdit,
    MessageDelete,
    ChatAction,
    /// Button-press callbacks; elevated channel only.
    CallbackQuery,
    /// Inline-search queries; elevated channel only.
    InlineQuery,
    /// Dispatched after every command invocation.
    Command,
    Load,
    Start,
    Started,
    Stop,
}

impl EventClass {
    /// Every class backed by a transport registration, in activation
    /// order.
    pub const TRANSPORT: [EventClass; 6] = [
        EventClass::Message,
        EventClass::MessageEdit,
        EventClass::MessageDelete,
        EventClass::ChatAction,
        EventClass::CallbackQuery,
        EventClass::InlineQuery,
    ];

    /// The transport update kind feeding this class, when any.
    pub fn update_kind(self) -> Option<UpdateKind> {
        match self {
            Self::Message => Some(UpdateKind::Message),
            Self::MessageEdit => Some(UpdateKind::MessageEdit),
            Self::MessageDelete => Some(UpdateKind::MessageDelete),
            Self::ChatAction => Some(UpdateKind::ChatAction),
            Self::CallbackQuery => Some(UpdateKind::CallbackQuery),
            Self::InlineQuery => Some(UpdateKind::InlineQuery),
            _ => None,
        }
    }

    /// Whether this class only makes sense on the elevated channel.
    pub fn elevated(self) -> bool {
        matches!(self, Self::CallbackQuery | Self::InlineQuery)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::MessageEdit => "message_edit",
            Self::MessageDelete => "message_delete",
            Self::ChatAction => "chat_action",
            Self::CallbackQuery => "callback_query",
            Self::InlineQuery => "inline_query",
            Self::Command => "command",
            Self::Load => "load",
            Self::Start => "start",
            Self::Started => "started",
            Self::Stop => "stop",
        }
    }
}

/// One dispatched event with its payload.
#[derive(Debug, Clone)]
pub enum Event {
    Message(Message),
    MessageEdit(Message),
    MessageDelete(Vec<i64>),
    ChatAction(Message),
    CallbackQuery(CallbackQuery),
    InlineQuery(InlineQuery),
    Command {
        command: Arc<Command>,
        message: Message,
    },
    Load,
    /// Start timestamp in microseconds since the epoch.
    Start(i64),
    Started,
    Stop,
}

impl Event {
    pub fn class(&self) -> EventClass {
        match self {
            Self::Message(_) => EventClass::Message,
            Self::MessageEdit(_) => EventClass::MessageEdit,
            Self::MessageDelete(_) => EventClass::MessageDelete,
            Self::ChatAction(_) => EventClass::ChatAction,
            Self::CallbackQuery(_) => EventClass::CallbackQuery,
            Self::InlineQuery(_) => EventClass::InlineQuery,
            Self::Command { .. } => EventClass::Command,
            Self::Load => EventClass::Load,
            Self::Start(_) => EventClass::Start,
            Self::Started => EventClass::Started,
            Self::Stop => EventClass::Stop,
        }
    }
}

impl From<Update> for Event {
    fn from(update: Update) -> Self {
        match update {
            Update::Message(m) => Self::Message(m),
            Update::MessageEdit(m) => Self::MessageEdit(m),
            Update::MessageDelete(ids) => Self::MessageDelete(ids),
            Update::ChatAction(m) => Self::ChatAction(m),
            Update::CallbackQuery(q) => Self::CallbackQuery(q),
            Update::InlineQuery(q) => Self::InlineQuery(q),
        }
    }
}

/// Implemented by modules for each event class they consume.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, bot: &Arc<Bot>, event: &Event) -> anyhow::Result<()>;
}

/// Declarative listener registration record supplied by a module.
#[derive(Clone)]
pub struct ListenerSpec {
    pub class: EventClass,
    pub listener: Arc<dyn EventListener>,
}

impl ListenerSpec {
    pub fn new(class: EventClass, listener: Arc<dyn EventListener>) -> Self {
        Self { class, listener }
    }
}
