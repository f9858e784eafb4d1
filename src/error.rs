//! Unified error handling for umbra.
//!
//! Centralized error hierarchy for the dispatch core, with stable
//! `error_code()` labels for counters and log fields.

use thiserror::Error;

// ============================================================================
// Registry errors (module load time)
// ============================================================================

/// Errors raised while mutating the command registry.
///
/// These are the only dispatch-core errors allowed to propagate as raised
/// errors: they occur during module load, not live message handling, and
/// trigger atomic rollback of the loading module's partial registrations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command '{name}' already registered by module '{existing_module}'")]
    Duplicate {
        /// The colliding name or alias.
        name: String,
        /// Module that owns the existing registration.
        existing_module: &'static str,
        /// Module that attempted the new registration.
        module: &'static str,
        /// Whether the collision was on an alias rather than a primary name.
        alias: bool,
    },
}

impl RegistryError {
    /// Stable code for metrics/log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Duplicate { .. } => "duplicate_command",
        }
    }
}

// ============================================================================
// Transport errors (external collaborator seam)
// ============================================================================

/// Errors surfaced by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// An edit produced no content change. The dispatcher logs this at
    /// warning level and swallows it; it is never user-visible.
    #[error("message content not modified")]
    NotModified,

    #[error("message {0} not found")]
    MessageNotFound(i64),

    #[error("no media attached to message {0}")]
    NoMedia(i64),

    #[error("transport rejected request: {0}")]
    Rejected(String),

    #[error("network failure: {0}")]
    Network(String),
}

impl TransportError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotModified => "not_modified",
            Self::MessageNotFound(_) => "message_not_found",
            Self::NoMedia(_) => "no_media",
            Self::Rejected(_) => "rejected",
            Self::Network(_) => "network",
        }
    }
}

// ============================================================================
// Response composer errors
// ============================================================================

/// Errors produced by the response composer.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// An unrecognized response mode was requested. Programming error on
    /// the caller's side; propagates instead of being rendered to chat.
    #[error("unknown response mode '{0}'")]
    InvalidMode(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ResponseError {
    /// True when the underlying failure was a content-free edit.
    #[inline]
    pub fn is_noop_edit(&self) -> bool {
        matches!(self, Self::Transport(TransportError::NotModified))
    }
}

// ============================================================================
// Conversation errors (interactive follow-up waits)
// ============================================================================

/// Errors from interactive flows waiting on a follow-up message.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// The wait deadline elapsed without a response. Distinct outcome so
    /// credential-exchange flows never hang indefinitely.
    #[error("timed out waiting for a response")]
    Timeout,

    #[error("a conversation is already active in chat {0}")]
    AlreadyWaiting(i64),

    /// The bot shut down while a waiter was pending.
    #[error("conversation channel closed")]
    Closed,
}

// ============================================================================
// Document store errors
// ============================================================================

/// Document store failures.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("malformed module document: {0}")]
    Document(#[from] serde_json::Error),
}

// ============================================================================
// Configuration errors
// ============================================================================

/// Configuration loading/validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Bot lifecycle errors
// ============================================================================

/// Errors from bot assembly and lifecycle operations.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("module '{module}' failed to load: {source}")]
    ModuleLoad {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("module '{0}' is not loaded")]
    ModuleNotLoaded(String),
}

/// True when an arbitrary handler error bottoms out in a content-free edit.
///
/// Handlers report errors as `anyhow::Error`; a no-op edit may arrive
/// directly as a [`TransportError`] or wrapped in a [`ResponseError`].
pub fn is_noop_edit(err: &anyhow::Error) -> bool {
    if let Some(t) = err.downcast_ref::<TransportError>() {
        return matches!(t, TransportError::NotModified);
    }
    if let Some(r) = err.downcast_ref::<ResponseError>() {
        return r.is_noop_edit();
    }
    false
}
