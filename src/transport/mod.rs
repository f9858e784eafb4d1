//! Transport client seam.
//!
//! The dispatch core depends only on this narrow surface, never on a
//! concrete chat client. A production deployment implements [`Transport`]
//! over its protocol library; tests implement it over scripted queues.
//!
//! Handler registration is synchronous (registration tables are critical
//! sections), while delivery is asynchronous through [`UpdateSink`].

mod types;

pub use types::{
    CallbackQuery, ChatKind, ChatRef, InlineQuery, MediaKind, Message, Update, UpdateKind, UserRef,
};

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Hard per-message size limit imposed by the transport. Longer responses
/// fall back to a document attachment.
pub const MESSAGE_CHAR_LIMIT: usize = 4096;

/// Opaque handle for a registered update handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

/// Progress callback for media transfers: `(transferred, total)` bytes.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Options applied to outgoing sends and edits.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Message id to reply to.
    pub reply_to: Option<i64>,
    /// Link previews are disabled unless a caller opts in.
    pub disable_web_page_preview: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            reply_to: None,
            disable_web_page_preview: true,
        }
    }
}

/// A text payload sent as a file attachment.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub bytes: Bytes,
    pub caption: Option<String>,
}

/// Receiver side of a handler registration.
#[async_trait]
pub trait UpdateSink: Send + Sync {
    async fn deliver(&self, update: Update);
}

/// The chat client surface the core depends on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The authenticated identity behind this channel.
    fn identity(&self) -> UserRef;

    async fn send_message(
        &self,
        chat: i64,
        text: &str,
        options: &SendOptions,
    ) -> Result<Message, TransportError>;

    /// Edits must fail with [`TransportError::NotModified`] when the new
    /// content equals the current content.
    async fn edit_message(
        &self,
        chat: i64,
        message_id: i64,
        text: &str,
        options: &SendOptions,
    ) -> Result<Message, TransportError>;

    async fn delete_message(&self, chat: i64, message_id: i64) -> Result<(), TransportError>;

    async fn send_document(
        &self,
        chat: i64,
        document: Document,
        options: &SendOptions,
    ) -> Result<Message, TransportError>;

    /// Download the media attached to `message`, reporting progress
    /// through `progress` when provided.
    async fn download_media(
        &self,
        message: &Message,
        progress: Option<ProgressFn>,
    ) -> Result<Bytes, TransportError>;

    /// Register an update handler. `group` orders delivery among handlers
    /// of the same kind; lower groups run first.
    fn add_handler(&self, kind: UpdateKind, group: i32, sink: Arc<dyn UpdateSink>) -> HandlerId;

    /// Remove a previously registered handler. Returns whether a
    /// registration was actually removed.
    fn remove_handler(&self, id: HandlerId) -> bool;
}
