//! Chat value types the core dispatches over.
//!
//! These are the transport trait's vocabulary, deliberately smaller than
//! any concrete chat protocol's types. A transport implementation maps its
//! native updates into these before handing them to the core.

/// A user as seen by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRef {
    pub id: i64,
    pub username: Option<String>,
    /// Whether this user is the authenticated session itself.
    pub is_self: bool,
    /// Whether this user is a bot account.
    pub is_bot: bool,
}

/// A chat as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRef {
    pub id: i64,
    pub kind: ChatKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

/// Media kinds relevant to download-file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Document,
    Audio,
    Video,
    Photo,
    Voice,
    Sticker,
}

/// An inbound or outbound chat message.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub chat: ChatRef,
    pub from: Option<UserRef>,
    pub text: Option<String>,
    /// Sent by this session toward the chat.
    pub outgoing: bool,
    /// Queued by the scheduled-messages feature rather than sent live.
    pub scheduled: bool,
    /// Sent on behalf of an inline bot.
    pub via_bot: bool,
    /// Forwarded from another chat or sender.
    pub forwarded: bool,
    /// Carries an edit timestamp.
    pub edited: bool,
    pub media: Option<MediaKind>,
    /// Original file name for media messages, when the transport knows it.
    pub file_name: Option<String>,
    pub reply_to: Option<Box<Message>>,
    /// Tokenized argument list recorded by the predicate layer. Empty
    /// until a command predicate classifies this message.
    pub segments: Vec<String>,
}

impl Message {
    /// A bare text message; tests and transports fill in the rest.
    pub fn text(id: i64, chat: ChatRef, text: impl Into<String>) -> Self {
        Self {
            id,
            chat,
            from: None,
            text: Some(text.into()),
            outgoing: false,
            scheduled: false,
            via_bot: false,
            forwarded: false,
            edited: false,
            media: None,
            file_name: None,
            reply_to: None,
            segments: Vec::new(),
        }
    }

    /// Whether this is an edited post in a broadcast channel. Those are
    /// excluded from command handling to avoid re-running commands on
    /// channel edits.
    pub fn is_edited_channel_post(&self) -> bool {
        self.edited && self.chat.kind == ChatKind::Channel
    }
}

/// A button-press callback from the elevated channel.
#[derive(Debug, Clone)]
pub struct CallbackQuery {
    pub id: String,
    pub from: UserRef,
    pub data: Option<String>,
    pub message: Option<Message>,
}

/// An inline-search query from the elevated channel.
#[derive(Debug, Clone)]
pub struct InlineQuery {
    pub id: String,
    pub from: UserRef,
    pub query: String,
}

/// One transport-level update delivered to a registered handler.
#[derive(Debug, Clone)]
pub enum Update {
    Message(Message),
    MessageEdit(Message),
    MessageDelete(Vec<i64>),
    /// Service message (join/leave/title change and similar).
    ChatAction(Message),
    CallbackQuery(CallbackQuery),
    InlineQuery(InlineQuery),
}

/// Discriminant used when registering transport handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Message,
    MessageEdit,
    MessageDelete,
    ChatAction,
    CallbackQuery,
    InlineQuery,
}

impl Update {
    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Message(_) => UpdateKind::Message,
            Self::MessageEdit(_) => UpdateKind::MessageEdit,
            Self::MessageDelete(_) => UpdateKind::MessageDelete,
            Self::ChatAction(_) => UpdateKind::ChatAction,
            Self::CallbackQuery(_) => UpdateKind::CallbackQuery,
            Self::InlineQuery(_) => UpdateKind::InlineQuery,
        }
    }
}
