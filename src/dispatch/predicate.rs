//! Message predicates.
//!
//! Pure classifiers applied to inbound messages before dispatch. They
//! never fail: any missing field is a non-match. The owner and sudo
//! predicates return the tokenized argument list (prefix stripped from
//! the command token) for the dispatcher to record on the message.

use crate::transport::Message;

/// Classify an owner-issued command on the primary channel.
///
/// Matches text messages starting with the primary prefix; non-text
/// messages never match.
pub fn match_owner(msg: &Message, prefix: &str) -> Option<Vec<String>> {
    tokenize(msg.text.as_deref()?, prefix)
}

/// Classify an elevated command on the secondary channel: the distinct
/// sudo prefix AND the sender must be the bot owner.
pub fn match_sudo(msg: &Message, sudo_prefix: &str, owner_id: i64) -> Option<Vec<String>> {
    if msg.from.as_ref()?.id != owner_id {
        return None;
    }
    tokenize(msg.text.as_deref()?, sudo_prefix)
}

fn tokenize(text: &str, prefix: &str) -> Option<Vec<String>> {
    if prefix.is_empty() || !text.starts_with(prefix) {
        return None;
    }
    let mut segments: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    let first = segments.first_mut()?;
    // The first whitespace token starts at offset 0, so it carries the
    // prefix; strip it. Slicing at prefix.len() is boundary-safe because
    // the token starts with the prefix.
    *first = first[prefix.len()..].to_string();
    Some(segments)
}

/// Classify a message as eligible for command/listener attachment on the
/// primary channel: self-authored or explicitly outgoing, and not relayed
/// content (via-bot, scheduled, forwarded, bot-authored, edited channel
/// post).
pub fn outgoing(msg: &Message) -> bool {
    if msg.via_bot || msg.scheduled || msg.forwarded {
        return false;
    }
    if msg.from.as_ref().is_some_and(|u| u.is_bot) {
        return false;
    }
    let self_authored = msg.outgoing || msg.from.as_ref().is_some_and(|u| u.is_self);
    self_authored && !msg.is_edited_channel_post()
}
