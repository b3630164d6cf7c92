//! # Chime
//!
//! Typed dispatch of slash commands, prefix commands and message components
//! for chat bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  RawEvent  ┌────────────┐  CommandContext    ┌──────────────────┐
//! │   Gateway   │───────────▶│ Dispatcher │───────────────────▶│ CommandHandler   │
//! │  (your Bot) │  (mpsc)    │            │  ComponentContext  │ ComponentHandler │
//! └─────────────┘            └────────────┘───────────────────▶└──────────────────┘
//!                              │  permission check
//!                              │  cooldown check / refresh
//! ```
//!
//! - **chime-core**: event records and the [`Bot`](prelude::Bot) trait
//! - **chime-framework**: registry, typed contexts, cooldowns, dispatcher
//! - **chime-runtime**: configuration, logging, event loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chime::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut registry = MetadataRegistry::new();
//!     registry.add_command(
//!         CommandOptions::new("ping", "Check latency")
//!             .mode(InvocationMode::Both)
//!             .user_cooldown(Duration::from_secs(5)),
//!         command_fn(|_bot, ctx: CommandContext| async move {
//!             ctx.reply("Pong!").await?;
//!             Ok(())
//!         }),
//!     )?;
//!
//!     let (tx, rx) = tokio::sync::mpsc::channel(256);
//!     let bot = my_gateway::connect(tx).await?;
//!     ChimeRuntime::builder().build(bot, registry)?.run(rx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `command`: clap-parsed prefix arguments (default)
//! - `toml-config` / `yaml-config`: config file formats
//! - `json-log`: JSON log output
//! - `testing`: `RecordingBot` and event fixtures

pub use chime_core as core;
pub use chime_framework as framework;
pub use chime_runtime as runtime;

/// Everything a bot binary or handler module usually needs.
pub mod prelude {
    pub use chime_framework::prelude::*;

    pub use chime_framework::{
        CooldownTracker, DispatchError, DispatchOutcome, Dispatcher, ResolvedOption,
    };
    pub use chime_runtime::{ChimeConfig, ChimeRuntime, ConfigLoader, LoggingBuilder};
}
