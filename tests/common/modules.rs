//! Test modules exercising the module contract end to end.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use umbra::Bot;
use umbra::command::{CommandHandler, CommandSpec, Context, Reply};
use umbra::event::{Event, EventClass, EventListener, ListenerSpec};
use umbra::module::Module;
use umbra::transfer::TransferOutcome;

// ---------------------------------------------------------------------------
// Echo: plain request/response
// ---------------------------------------------------------------------------

pub struct EchoModule;

struct Echo;

#[async_trait]
impl CommandHandler for Echo {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply> {
        let reply = ctx.input().unwrap_or("echo").to_string();
        Ok(Reply::Text(reply))
    }
}

impl Module for EchoModule {
    fn name(&self) -> &'static str {
        "Echo"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("echo", "Echo the input back", Arc::new(Echo)).aliases(&["say"])]
    }
}

// ---------------------------------------------------------------------------
// Fail: handler that errors, with a secret embedded in the error text
// ---------------------------------------------------------------------------

pub struct FailModule;

struct Boom;

#[async_trait]
impl CommandHandler for Boom {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply> {
        anyhow::bail!(
            "exploded while holding {}",
            ctx.bot().config.telegram.api_hash
        )
    }
}

impl Module for FailModule {
    fn name(&self) -> &'static str {
        "Fail"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("boom", "Always fails", Arc::new(Boom))]
    }
}

// ---------------------------------------------------------------------------
// Done: tuple-style reply with scheduled deletion
// ---------------------------------------------------------------------------

pub struct DoneModule;

struct Done;

#[async_trait]
impl CommandHandler for Done {
    async fn handle(&self, _ctx: &mut Context) -> anyhow::Result<Reply> {
        Ok(Reply::DeleteAfter("Done.".to_string(), 5))
    }
}

impl Module for DoneModule {
    fn name(&self) -> &'static str {
        "Done"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("done", "Replies then self-deletes", Arc::new(Done))]
    }
}

// ---------------------------------------------------------------------------
// Noop: handler whose edit changes nothing
// ---------------------------------------------------------------------------

pub struct NoopModule;

struct Noop;

#[async_trait]
impl CommandHandler for Noop {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply> {
        let text = ctx.msg.text.clone().unwrap_or_default();
        ctx.respond(&text).await?;
        Ok(Reply::None)
    }
}

impl Module for NoopModule {
    fn name(&self) -> &'static str {
        "Noop"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("noop", "Edits with identical content", Arc::new(Noop))]
    }
}

// ---------------------------------------------------------------------------
// Grab: pattern-matching command
// ---------------------------------------------------------------------------

pub struct GrabModule;

struct Grab;

#[async_trait]
impl CommandHandler for Grab {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply> {
        let numbers: Vec<&str> = ctx
            .matches
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|m| m.group(1))
            .collect();
        Ok(Reply::Text(format!("grabbed: {}", numbers.join(","))))
    }
}

impl Module for GrabModule {
    fn name(&self) -> &'static str {
        "Grab"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("grab", "Collect numbers from the target text", Arc::new(Grab))
                .pattern(r"(\d+)"),
        ]
    }
}

// ---------------------------------------------------------------------------
// Gate: authorization-gated module with an exempt management command
// ---------------------------------------------------------------------------

pub struct GateModule {
    pub allow: Arc<AtomicBool>,
}

struct Gated;

#[async_trait]
impl CommandHandler for Gated {
    async fn handle(&self, _ctx: &mut Context) -> anyhow::Result<Reply> {
        Ok(Reply::Text("passed the gate".to_string()))
    }
}

struct GateReset;

#[async_trait]
impl CommandHandler for GateReset {
    async fn handle(&self, _ctx: &mut Context) -> anyhow::Result<Reply> {
        Ok(Reply::Text("gate reset".to_string()))
    }
}

#[async_trait]
impl Module for GateModule {
    fn name(&self) -> &'static str {
        "Gate"
    }

    fn requires_authorization(&self) -> bool {
        true
    }

    async fn authorize(
        &self,
        _bot: &Arc<Bot>,
        _msg: &umbra::transport::Message,
    ) -> Option<bool> {
        Some(self.allow.load(Ordering::SeqCst))
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("gated", "Requires authorization", Arc::new(Gated)),
            CommandSpec::new("gatereset", "Authorization management", Arc::new(GateReset))
                .skip_auth(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Named commands: registry collision scenarios
// ---------------------------------------------------------------------------

pub struct NamedCommandsModule {
    pub module_name: &'static str,
    pub command_names: Vec<&'static str>,
}

impl Module for NamedCommandsModule {
    fn name(&self) -> &'static str {
        self.module_name
    }

    fn commands(&self) -> Vec<CommandSpec> {
        self.command_names
            .iter()
            .map(|name| CommandSpec::new(name, "test", Arc::new(Echo)))
            .collect()
    }
}

/// Module whose command declares a pattern that cannot compile,
/// exercising the dispatch pipeline's outermost catch.
pub struct BadPatternModule;

impl Module for BadPatternModule {
    fn name(&self) -> &'static str {
        "BadPattern"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("badpat", "Declares a broken pattern", Arc::new(Echo))
                .pattern(r"(unclosed"),
        ]
    }
}

/// Module whose load hook fails after registration.
pub struct FailingLoadModule;

#[async_trait]
impl Module for FailingLoadModule {
    fn name(&self) -> &'static str {
        "FailingLoad"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("flcmd", "Never dispatchable", Arc::new(Echo))]
    }

    async fn on_load(&self, _bot: &Arc<Bot>) -> anyhow::Result<()> {
        anyhow::bail!("load hook refused")
    }
}

// ---------------------------------------------------------------------------
// Event recording
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

pub struct RecorderListener(pub Arc<Recorder>);

#[async_trait]
impl EventListener for RecorderListener {
    async fn on_event(&self, _bot: &Arc<Bot>, event: &Event) -> anyhow::Result<()> {
        self.0.events.lock().push(event.class().name().to_string());
        Ok(())
    }
}

pub struct ListenerModule {
    pub module_name: &'static str,
    pub recorder: Arc<Recorder>,
    pub classes: Vec<EventClass>,
}

impl Module for ListenerModule {
    fn name(&self) -> &'static str {
        self.module_name
    }

    fn listeners(&self) -> Vec<ListenerSpec> {
        self.classes
            .iter()
            .map(|class| {
                ListenerSpec::new(
                    *class,
                    Arc::new(RecorderListener(self.recorder.clone())),
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Pull: background transfer awaited by the handler
// ---------------------------------------------------------------------------

pub struct PullModule;

struct Pull;

#[async_trait]
impl CommandHandler for Pull {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply> {
        let Some(target) = ctx.msg.reply_to.clone() else {
            return Ok(Reply::Text("__Reply to a media message.__".to_string()));
        };
        let bot = ctx.bot().clone();
        let client = ctx.client.clone();
        let task = bot.transfers.spawn(ctx.msg.id, "download", async move {
            client.download_media(&target, None).await
        });
        match task.join().await {
            TransferOutcome::Done(Ok(payload)) => {
                Ok(Reply::Text(format!("downloaded {} bytes", payload.len())))
            }
            TransferOutcome::Done(Err(err)) => Err(err.into()),
            TransferOutcome::Aborted => Ok(Reply::Text("__Transmission aborted.__".to_string())),
        }
    }
}

impl Module for PullModule {
    fn name(&self) -> &'static str {
        "Pull"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("pull", "Download the replied-to media", Arc::new(Pull))]
    }
}
