//! Response composer.
//!
//! Renders handler replies under the supported response modes, redacts
//! configured secrets, and falls back to a document attachment when the
//! rendered text exceeds the transport's message-size limit.

use super::Bot;
use crate::error::ResponseError;
use crate::transport::{
    Document, MESSAGE_CHAR_LIMIT, Message, SendOptions, Transport,
};
use bytes::Bytes;
use std::str::FromStr;
use std::sync::Arc;

/// Placeholder substituted for every configured secret value.
pub const REDACTED: &str = "[CONFIDENTIAL]";

/// How a response relates to the invoking message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseMode {
    /// Rewrite the invoking message in place.
    #[default]
    Edit,
    /// Edit, wrapping the text in the error template.
    Error,
    /// Send a new message the first time, edit that same reply on
    /// subsequent calls within one invocation.
    Reply,
    /// Like reply, but also deletes the invoking message.
    Repost,
    /// Always send the text as a document attachment.
    ForceDoc,
}

impl FromStr for ResponseMode {
    type Err = ResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edit" => Ok(Self::Edit),
            "error" => Ok(Self::Error),
            "reply" => Ok(Self::Reply),
            "repost" => Ok(Self::Repost),
            "force_doc" => Ok(Self::ForceDoc),
            other => Err(ResponseError::InvalidMode(other.to_string())),
        }
    }
}

/// Options for one composer call.
#[derive(Debug, Clone, Default)]
pub struct ResponseOptions {
    pub mode: ResponseMode,
    /// Set to skip secret redaction. Callers must justify use.
    pub no_redact: bool,
    /// Original input text, used as the caption of a document fallback.
    pub input_arg: Option<String>,
    /// The response already sent in this invocation, for reply/repost
    /// modes to edit instead of sending again.
    pub response: Option<Message>,
    /// Transport-level send options; link previews default to disabled.
    pub send: SendOptions,
}

impl ResponseOptions {
    pub fn mode(mode: ResponseMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

impl Bot {
    /// Replace every configured secret value found verbatim in `text`
    /// with the [`REDACTED`] placeholder.
    pub fn redact_text(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for secret in self.config.secret_values() {
            if redacted.contains(&secret) {
                redacted = redacted.replace(&secret, REDACTED);
            }
        }
        redacted
    }

    /// Respond on the primary channel.
    pub async fn respond(
        &self,
        msg: &Message,
        text: &str,
        options: ResponseOptions,
    ) -> Result<Message, ResponseError> {
        let client = self.client().clone();
        self.respond_via(&client, msg, text, options).await
    }

    /// Respond on an explicit channel (the one the invocation arrived
    /// on).
    pub(crate) async fn respond_via(
        &self,
        client: &Arc<dyn Transport>,
        msg: &Message,
        text: &str,
        options: ResponseOptions,
    ) -> Result<Message, ResponseError> {
        let text = if options.no_redact {
            text.to_string()
        } else {
            self.redact_text(text)
        };

        if text.chars().count() > MESSAGE_CHAR_LIMIT {
            return self.send_as_document(client, msg, text, &options).await;
        }

        match options.mode {
            ResponseMode::ForceDoc => self.send_as_document(client, msg, text, &options).await,
            ResponseMode::Edit => Ok(client
                .edit_message(msg.chat.id, msg.id, &text, &options.send)
                .await?),
            ResponseMode::Error => {
                let wrapped = format!("**ERROR**: ```{text}```");
                Ok(client
                    .edit_message(msg.chat.id, msg.id, &wrapped, &options.send)
                    .await?)
            }
            ResponseMode::Reply => match &options.response {
                // Already replied; edit the existing reply to reduce spam.
                Some(prior) => Ok(client
                    .edit_message(prior.chat.id, prior.id, &text, &options.send)
                    .await?),
                None => {
                    let mut send = options.send.clone();
                    send.reply_to = Some(msg.id);
                    Ok(client.send_message(msg.chat.id, &text, &send).await?)
                }
            },
            ResponseMode::Repost => match &options.response {
                Some(prior) => Ok(client
                    .edit_message(prior.chat.id, prior.id, &text, &options.send)
                    .await?),
                None => {
                    let mut send = options.send.clone();
                    send.reply_to = Some(msg.id);
                    let sent = client.send_message(msg.chat.id, &text, &send).await?;
                    client.delete_message(msg.chat.id, msg.id).await?;
                    Ok(sent)
                }
            },
        }
    }

    /// Oversize fallback: park a placeholder on the invoking message,
    /// attach the text as a document, then remove the placeholder.
    async fn send_as_document(
        &self,
        client: &Arc<dyn Transport>,
        msg: &Message,
        text: String,
        options: &ResponseOptions,
    ) -> Result<Message, ResponseError> {
        client
            .edit_message(msg.chat.id, msg.id, "Sending output as a file.", &options.send)
            .await?;
        let document = Document {
            file_name: "output.txt".to_string(),
            bytes: Bytes::from(text.into_bytes()),
            caption: options.input_arg.clone(),
        };
        let response = client
            .send_document(msg.chat.id, document, &options.send)
            .await?;
        client.delete_message(msg.chat.id, msg.id).await?;
        Ok(response)
    }
}
