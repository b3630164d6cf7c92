//! Chime Runtime - configuration, logging and the event loop.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `ChimeConfig`)
//! - Logging setup (`LoggingBuilder`)
//! - The event loop that feeds the dispatcher (`ChimeRuntime`)
//!
//! ```ignore
//! use chime_runtime::ChimeRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (tx, rx) = tokio::sync::mpsc::channel(256);
//!     let bot = connect_gateway(tx).await?;
//!
//!     let runtime = ChimeRuntime::builder().build(bot, commands())?;
//!
//!     // Run until the gateway closes the channel or Ctrl+C
//!     runtime.run(rx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ChimeConfig, ConfigError, ConfigLoader, ConfigResult};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ChimeRuntime, RuntimeBuilder, RuntimeStats};

// Re-export tracing for use by handler crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for handler code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
