//! Command invocation pipeline.
//!
//! One invocation moves through lookup, authorization, pattern matching,
//! handler execution, and response translation in strict sequence. Errors
//! exit at well-defined points: unknown commands and declined
//! authorization terminate silently, handler failures become a redacted
//! user-visible error block, and pipeline failures outside the handler's
//! own scope are absorbed by the outermost catch.

use crate::bot::{Bot, ResponseOptions};
use crate::command::{Command, Context, PatternMatch, Reply};
use crate::error::is_noop_edit;
use crate::event::Event;
use crate::transport::{Message, Transport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Level, debug, error, span, warn};

impl Bot {
    /// Entry point for a classified command message. Never returns an
    /// error: the outermost catch reports pipeline failures back to the
    /// chat and swallows failures of that report itself.
    pub(crate) async fn on_command(&self, client: Arc<dyn Transport>, msg: Message) {
        if let Err(err) = self.dispatch_command(&client, &msg).await {
            error!(error = ?err, "error in command handler");
            let text = format!("⚠️ Error in command handler:\n```{err:#}```");
            if let Err(report) = self
                .respond_via(&client, &msg, &text, ResponseOptions::default())
                .await
            {
                error!(error = %report, "failed to report dispatch failure");
            }
        }
    }

    async fn dispatch_command(
        &self,
        client: &Arc<dyn Transport>,
        msg: &Message,
    ) -> anyhow::Result<()> {
        let Some(token) = msg.segments.first() else {
            return Ok(());
        };
        // Unknown token is silence, not an error: plenty of ordinary
        // messages start with the prefix character.
        let Some(cmd) = self.registry.get(token) else {
            return Ok(());
        };

        if !self.authorize_invocation(&cmd, msg).await {
            debug!(
                command = cmd.name(),
                module = cmd.module(),
                "authorization declined"
            );
            return Ok(());
        }

        // End of the command token in raw text: prefix + token + one
        // separator character. Sudo invocations carry the elevated
        // prefix, so measure whichever one the text actually starts
        // with.
        let prefix = self.prefix();
        let prefix_len = if msg.text.as_deref().is_some_and(|t| t.starts_with(&prefix)) {
            prefix.len()
        } else {
            self.sudo_prefix().len()
        };
        let cmd_len = prefix_len + token.len() + 1;
        let matches = collect_matches(&cmd, msg, cmd_len)?;

        cmd.record_use();
        let mut ctx = Context::new(
            self.arc(),
            client.clone(),
            msg.clone(),
            cmd_len,
            matches,
        );

        let cmd_span = span!(
            Level::DEBUG,
            "command",
            name = cmd.name(),
            module = cmd.module(),
            chat = msg.chat.id,
        );
        self.run_handler(&cmd, &mut ctx).instrument(cmd_span).await;

        // Cross-cutting command event, regardless of handler outcome.
        self.router
            .dispatch(
                &self.arc(),
                &Event::Command {
                    command: cmd.clone(),
                    message: msg.clone(),
                },
            )
            .await;
        Ok(())
    }

    /// Module-level authorization gate. `true` means proceed.
    async fn authorize_invocation(&self, cmd: &Arc<Command>, msg: &Message) -> bool {
        let Some(module) = self.module(cmd.module()) else {
            return true;
        };
        if !module.requires_authorization() || module.disabled() || cmd.skips_auth() {
            return true;
        }
        // None and true both allow the invocation.
        !matches!(module.authorize(&self.arc(), msg).await, Some(false))
    }

    /// Execute the handler and translate its outcome into a response.
    async fn run_handler(&self, cmd: &Arc<Command>, ctx: &mut Context) {
        let result = async {
            match cmd.handler().handle(ctx).await? {
                Reply::None => {}
                Reply::Text(text) => ctx.respond(&text).await?,
                Reply::DeleteAfter(text, delay_secs) => {
                    ctx.respond(&text).await?;
                    if let Some(sent) = ctx.response.clone() {
                        self.schedule_delete(ctx.client.clone(), sent, delay_secs);
                    }
                }
            }
            anyhow::Ok(())
        }
        .await;

        match result {
            Ok(()) => {}
            Err(err) if is_noop_edit(&err) => {
                warn!(
                    command = cmd.name(),
                    "command triggered a message edit with no changes"
                );
            }
            Err(err) => {
                error!(
                    command = cmd.name(),
                    module = cmd.module(),
                    error = ?err,
                    "error in command"
                );
                let input = ctx
                    .input()
                    .or(ctx.msg.text.as_deref())
                    .unwrap_or_default();
                let input_block = if input.is_empty() {
                    String::new()
                } else {
                    format!("**Input:**\n{input}\n\n")
                };
                let text = format!(
                    "{input_block}**ERROR**:\n⚠️ Failed to execute command:\n```{err:#}```"
                );
                if let Err(report) = ctx.respond(&text).await {
                    error!(error = %report, "failed to send command error response");
                }
            }
        }
    }

    /// Respond-then-delete: remove the response after the given delay.
    fn schedule_delete(&self, client: Arc<dyn Transport>, sent: Message, delay_secs: u64) {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            if let Err(err) = client.delete_message(sent.chat.id, sent.id).await {
                warn!(error = %err, message = sent.id, "failed to delete scheduled response");
            }
        });
    }
}

/// Evaluate the command's pattern, preferring the reply-target text over
/// the inline remainder. Compile failures are pipeline errors.
fn collect_matches(
    cmd: &Command,
    msg: &Message,
    cmd_len: usize,
) -> anyhow::Result<Option<Vec<PatternMatch>>> {
    let haystack: String = if let Some(reply) = &msg.reply_to {
        reply.text.clone().unwrap_or_default()
    } else {
        msg.text
            .as_deref()
            .and_then(|t| t.get(cmd_len..))
            .unwrap_or_default()
            .to_string()
    };

    match cmd.find_matches(&haystack) {
        None => Ok(None),
        Some(Ok(matches)) => Ok(Some(matches)),
        Some(Err(err)) => Err(anyhow::Error::new(err)
            .context(format!("invalid pattern for command '{}'", cmd.name()))),
    }
}
