//! Interactive follow-up waits.
//!
//! A handler mid-flow (e.g. a credential exchange) can wait for the next
//! message in a chat. One waiter per chat, and every wait carries an
//! explicit timeout with a distinct timeout outcome.

use super::Bot;
use crate::error::ConversationError;
use crate::transport::Message;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Duration;
use tokio::sync::mpsc;

pub(crate) struct ConversationTable {
    waiters: DashMap<i64, mpsc::Sender<Message>>,
}

impl ConversationTable {
    pub(crate) fn new() -> Self {
        Self {
            waiters: DashMap::new(),
        }
    }

    /// Feed an inbound message to the chat's waiter, if any. Returns
    /// whether a waiter consumed it.
    pub(crate) fn deliver(&self, msg: &Message) -> bool {
        match self.waiters.get(&msg.chat.id) {
            Some(tx) => tx.try_send(msg.clone()).is_ok(),
            None => false,
        }
    }

    /// Drop all waiters; pending waits resolve as closed.
    pub(crate) fn close_all(&self) {
        self.waiters.clear();
    }
}

impl Bot {
    /// Wait for the next inbound message in `chat`, up to `timeout`.
    ///
    /// Fails with [`ConversationError::AlreadyWaiting`] when another
    /// waiter holds the chat, and [`ConversationError::Timeout`] when the
    /// deadline passes - the wait never hangs indefinitely.
    pub async fn wait_for_response(
        &self,
        chat: i64,
        timeout: Duration,
    ) -> Result<Message, ConversationError> {
        let (tx, mut rx) = mpsc::channel(8);
        match self.conversations.waiters.entry(chat) {
            Entry::Occupied(_) => return Err(ConversationError::AlreadyWaiting(chat)),
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }
        // Frees the slot even when this future is dropped mid-wait.
        let _slot = SlotGuard {
            table: &self.conversations,
            chat,
        };

        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(msg)) => Ok(msg),
            Ok(None) => Err(ConversationError::Closed),
            Err(_) => Err(ConversationError::Timeout),
        }
    }
}

struct SlotGuard<'a> {
    table: &'a ConversationTable,
    chat: i64,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.table.waiters.remove(&self.chat);
    }
}
