//! System module: prefix management, liveness, and dispatch statistics.

use crate::command::{CommandHandler, CommandSpec, Context, Reply};
use crate::module::Module;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

pub struct SystemModule;

impl SystemModule {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for SystemModule {
    fn name(&self) -> &'static str {
        "System"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("prefix", "Show or change the command prefix", Arc::new(Prefix))
                .aliases(&["setprefix"])
                .usage("[new prefix]"),
            CommandSpec::new("ping", "Measure response time", Arc::new(Ping)),
            CommandSpec::new("uptime", "Time since the bot started", Arc::new(Uptime)),
            CommandSpec::new("stats", "Command usage statistics", Arc::new(Stats)),
            CommandSpec::new("abort", "Abort the transfers of a replied-to invocation", Arc::new(Abort))
                .usage("[reply to the invoking message]"),
        ]
    }
}

struct Prefix;

#[async_trait]
impl CommandHandler for Prefix {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply> {
        let new = ctx
            .input()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let bot = ctx.bot().clone();
        match new {
            Some(new) => {
                bot.set_prefix(&new).await?;
                Ok(Reply::Text(format!("Prefix set to `{new}`")))
            }
            None => Ok(Reply::Text(format!("Current prefix: `{}`", bot.prefix()))),
        }
    }
}

struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply> {
        let before = Instant::now();
        ctx.respond("Calculating response time...").await?;
        let latency = before.elapsed().as_millis();
        Ok(Reply::Text(format!("Pong!\n`{latency} ms`")))
    }
}

struct Uptime;

#[async_trait]
impl CommandHandler for Uptime {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply> {
        let reply = match ctx.bot().uptime() {
            Some(uptime) => format!("Up for `{}`", format_duration(uptime.num_seconds())),
            None => "Not started yet.".to_string(),
        };
        Ok(Reply::Text(reply))
    }
}

struct Stats;

#[async_trait]
impl CommandHandler for Stats {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply> {
        let bot = ctx.bot();
        let stats = bot.registry.usage_stats();
        if stats.is_empty() {
            return Ok(Reply::Text("No commands dispatched yet.".to_string()));
        }
        let mut out = String::from("**Command usage:**\n");
        for (name, count) in stats {
            let _ = writeln!(out, "`{name}`: {count}");
        }
        let active = bot.transfers.len();
        if active > 0 {
            let _ = writeln!(out, "\nActive transfers: {active}");
        }
        Ok(Reply::Text(out))
    }
}

struct Abort;

#[async_trait]
impl CommandHandler for Abort {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply> {
        let Some(reply) = &ctx.msg.reply_to else {
            return Ok(Reply::Text(
                "__Reply to the message that started the transfer.__".to_string(),
            ));
        };
        let cancelled = ctx.bot().transfers.cancel_for_message(reply.id);
        Ok(Reply::Text(if cancelled == 0 {
            "__No active transfer for that message.__".to_string()
        } else {
            format!("__Aborted {cancelled} transfer(s).__")
        }))
    }
}

fn format_duration(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let (days, rem) = (total_secs / 86_400, total_secs % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (mins, secs) = (rem / 60, rem % 60);

    let mut out = String::new();
    if days > 0 {
        let _ = write!(out, "{days}d ");
    }
    if hours > 0 || days > 0 {
        let _ = write!(out, "{hours}h ");
    }
    if mins > 0 || hours > 0 || days > 0 {
        let _ = write!(out, "{mins}m ");
    }
    let _ = write!(out, "{secs}s");
    out
}
