//! umbra - async chat userbot dispatch core.
//!
//! Routes inbound chat messages to registered command handlers and module
//! event listeners, tracks per-invocation context, and manages cancellable
//! background transfers. The chat transport and the document store are
//! external collaborators consumed through the narrow traits in
//! [`transport`] and [`db`]; an external entry point loads [`Config`],
//! builds a transport, and drives [`Bot::run`].

pub mod bot;
pub mod command;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod logging;
pub mod module;
pub mod modules;
pub mod transfer;
pub mod transport;

pub use bot::{Bot, ResponseMode, ResponseOptions};
pub use command::{CommandHandler, CommandSpec, Context, Reply};
pub use config::Config;
pub use error::{
    BotError, ConfigError, ConversationError, DbError, RegistryError, ResponseError,
    TransportError,
};
pub use event::{Event, EventClass, EventListener, ListenerSpec};
pub use module::Module;
pub use transfer::{TransferOutcome, TransferTask};
pub use transport::Transport;
