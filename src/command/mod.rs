//! Command records and the handler contract.
//!
//! Modules declare commands as [`CommandSpec`] values from their load
//! hook; the registry wraps them into [`Command`] records that carry the
//! owning module, a lazily compiled pattern, and a usage counter.

mod context;

pub use context::{Context, PatternMatch};

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// What a handler asks the dispatcher to do after it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// No reply; the handler already responded (or chose silence).
    None,
    /// Respond with this text.
    Text(String),
    /// Respond with this text, then delete the response after the delay.
    DeleteAfter(String, u64),
}

/// Implemented by a module for each of its commands.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &mut Context) -> anyhow::Result<Reply>;
}

/// Declarative registration record supplied by a module.
#[derive(Clone)]
pub struct CommandSpec {
    /// Unique primary name.
    pub name: &'static str,
    /// Alternate names, each unique across the whole registry.
    pub aliases: &'static [&'static str],
    /// Optional regex evaluated against the reply-target text or the
    /// input remainder; compiled lazily on first use.
    pub pattern: Option<&'static str>,
    /// Marks the module's own authorization-management commands, which
    /// bypass the module's `authorize` gate.
    pub skip_auth: bool,
    pub desc: &'static str,
    pub usage: Option<&'static str>,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    pub fn new(
        name: &'static str,
        desc: &'static str,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        Self {
            name,
            aliases: &[],
            pattern: None,
            skip_auth: false,
            desc,
            usage: None,
            handler,
        }
    }

    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn usage(mut self, usage: &'static str) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("pattern", &self.pattern)
            .field("skip_auth", &self.skip_auth)
            .finish_non_exhaustive()
    }
}

/// A registered command: the spec plus registry-owned bookkeeping.
pub struct Command {
    spec: CommandSpec,
    /// Owning module, for lookup and cleanup only.
    module: &'static str,
    compiled: OnceLock<Result<Regex, regex::Error>>,
    uses: AtomicU64,
}

impl Command {
    pub(crate) fn new(module: &'static str, spec: CommandSpec) -> Self {
        Self {
            spec,
            module,
            compiled: OnceLock::new(),
            uses: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        self.spec.aliases
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    pub fn desc(&self) -> &'static str {
        self.spec.desc
    }

    pub fn usage(&self) -> Option<&'static str> {
        self.spec.usage
    }

    pub fn skips_auth(&self) -> bool {
        self.spec.skip_auth
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.spec.handler
    }

    pub(crate) fn record_use(&self) {
        self.uses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn use_count(&self) -> u64 {
        self.uses.load(Ordering::Relaxed)
    }

    /// Collect all non-overlapping pattern matches in `haystack`.
    ///
    /// Returns `None` when the command declares no pattern. The regex is
    /// compiled at most once per command; a bad pattern keeps returning
    /// the same compile error without recompiling.
    pub fn find_matches(&self, haystack: &str) -> Option<Result<Vec<PatternMatch>, regex::Error>> {
        let source = self.spec.pattern?;
        let compiled = self.compiled.get_or_init(|| Regex::new(source));
        Some(match compiled {
            Ok(re) => Ok(re
                .captures_iter(haystack)
                .map(|caps| PatternMatch::from_captures(&caps))
                .collect()),
            Err(e) => Err(e.clone()),
        })
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.spec.name)
            .field("module", &self.module)
            .field("aliases", &self.spec.aliases)
            .finish_non_exhaustive()
    }
}
