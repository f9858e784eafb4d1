//! Per-invocation execution context.
//!
//! Created once per matched message, destroyed after the handler returns
//! and the final response is sent. Owns no long-lived state.

use crate::bot::{Bot, ResponseOptions};
use crate::error::ResponseError;
use crate::transport::{Message, Transport};
use regex::Captures;
use std::sync::Arc;

/// One owned regex match: full text plus capture groups.
///
/// Owned (not borrowed from the message text) so contexts stay `'static`
/// and can cross await points freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    text: String,
    groups: Vec<Option<String>>,
}

impl PatternMatch {
    pub(crate) fn from_captures(caps: &Captures<'_>) -> Self {
        Self {
            text: caps[0].to_string(),
            groups: caps
                .iter()
                .map(|m| m.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    /// Full matched text (group 0).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Capture group by index; `None` for absent or unmatched groups.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index)?.as_deref()
    }
}

/// Invocation context passed to a command handler.
pub struct Context {
    bot: Arc<Bot>,
    /// The channel the invoking message arrived on (primary or elevated).
    pub client: Arc<dyn Transport>,
    /// The invoking message, segments recorded by the predicate layer.
    pub msg: Message,
    /// Byte offset of the end of the command token in the raw text.
    pub cmd_len: usize,
    /// Pattern matches, when the command declares a pattern.
    pub matches: Option<Vec<PatternMatch>>,
    /// The response sent so far in this invocation, for reply/repost
    /// modes to edit instead of sending again.
    pub response: Option<Message>,
    input: Option<String>,
}

impl Context {
    pub(crate) fn new(
        bot: Arc<Bot>,
        client: Arc<dyn Transport>,
        msg: Message,
        cmd_len: usize,
        matches: Option<Vec<PatternMatch>>,
    ) -> Self {
        let input = msg
            .text
            .as_deref()
            .and_then(|t| t.get(cmd_len..))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);
        Self {
            bot,
            client,
            msg,
            cmd_len,
            matches,
            response: None,
            input,
        }
    }

    pub fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }

    /// Raw text after the command token, or `None` when the command was
    /// invoked bare.
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// Tokenized arguments, command token first (prefix stripped).
    pub fn segments(&self) -> &[String] {
        &self.msg.segments
    }

    /// Respond with the default (edit) mode.
    pub async fn respond(&mut self, text: &str) -> Result<(), ResponseError> {
        self.respond_with(text, ResponseOptions::default()).await
    }

    /// Respond with explicit options, tracking the sent message so that
    /// repeated reply/repost calls edit instead of spamming the chat.
    pub async fn respond_with(
        &mut self,
        text: &str,
        mut options: ResponseOptions,
    ) -> Result<(), ResponseError> {
        if options.response.is_none() {
            options.response = self.response.take();
        }
        let sent = self
            .bot
            .respond_via(&self.client, &self.msg, text, options)
            .await?;
        self.response = Some(sent);
        Ok(())
    }
}
