//! The event loop that feeds a [`Dispatcher`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use chime_runtime::ChimeRuntime;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(256);
//! // hand `tx` to the gateway connection
//!
//! let runtime = ChimeRuntime::builder()
//!     .config_file("config/chime.toml")
//!     .build(bot, registry)?;
//! runtime.run(rx).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chime_core::{BoxedBot, RawEvent};
use chime_framework::{
    CooldownTracker, DispatchError, DispatchOutcome, Dispatcher, MetadataRegistry,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::{ChimeConfig, ConfigLoader, ConfigResult};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Counts of dispatched events by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Events taken off the channel.
    pub received: u64,
    /// Events whose handler ran successfully.
    pub executed: u64,
    /// Events no handler applied to.
    pub ignored: u64,
    /// Events answered with a permission or cooldown notice.
    pub rejected: u64,
    /// Events that ended in a [`DispatchError`].
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    executed: AtomicU64,
    ignored: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            received: self.received.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Owns a bot handle and a dispatcher and feeds events to them.
///
/// Each event is dispatched on its own task, so a slow handler does not hold
/// up the next event.
pub struct ChimeRuntime {
    config: ChimeConfig,
    bot: BoxedBot,
    dispatcher: Dispatcher,
    counters: Arc<Counters>,
    shutdown: CancellationToken,
    running: AtomicBool,
}

impl ChimeRuntime {
    /// Creates a runtime with default configuration, without touching logging.
    pub fn new(bot: BoxedBot, registry: MetadataRegistry) -> Self {
        let config = ChimeConfig::default();
        let dispatcher = Self::dispatcher_for(&config, registry);
        Self::with_dispatcher(config, bot, dispatcher)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration, initializing logging from it.
    pub fn from_config(config: &ChimeConfig, bot: BoxedBot, registry: MetadataRegistry) -> Self {
        logging::init_from_config(&config.logging);
        let dispatcher = Self::dispatcher_for(config, registry);

        info!(
            log_level = %config.logging.level,
            prefixes = ?config.dispatcher.prefixes,
            commands = dispatcher.registry().command_count(),
            components = dispatcher.registry().component_count(),
            "Runtime initialized from configuration"
        );
        Self::with_dispatcher(config.clone(), bot, dispatcher)
    }

    /// Creates a runtime around a prepared dispatcher.
    ///
    /// The dispatcher's own prefixes and cooldown tracker are used as-is;
    /// only the cooldown sweep interval is read from `config`.
    pub fn with_dispatcher(config: ChimeConfig, bot: BoxedBot, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            bot,
            dispatcher,
            counters: Arc::new(Counters::default()),
            shutdown: CancellationToken::new(),
            running: AtomicBool::new(false),
        }
    }

    fn dispatcher_for(config: &ChimeConfig, registry: MetadataRegistry) -> Dispatcher {
        Dispatcher::new(registry)
            .with_prefixes(config.dispatcher.prefixes.iter().cloned())
            .ignore_bots(config.dispatcher.ignore_bots)
    }

    pub fn config(&self) -> &ChimeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// A token that stops [`run`](Self::run) when cancelled.
    ///
    /// Cancellation is permanent; a cancelled runtime cannot be run again.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Event counts so far.
    pub fn stats(&self) -> RuntimeStats {
        self.counters.snapshot()
    }

    /// Dispatches events until the channel closes, the shutdown token is
    /// cancelled, or the process receives Ctrl+C / SIGTERM.
    pub async fn run(&self, events: mpsc::Receiver<RawEvent>) -> RuntimeResult<RuntimeStats> {
        self.run_until(events, wait_for_signal()).await
    }

    /// Like [`run`](Self::run), with `shutdown` in place of the OS signals.
    ///
    /// Events already taken off the channel are finished before returning.
    pub async fn run_until<F>(
        &self,
        mut events: mpsc::Receiver<RawEvent>,
        shutdown: F,
    ) -> RuntimeResult<RuntimeStats>
    where
        F: Future<Output = ()>,
    {
        if self.shutdown.is_cancelled() {
            return Err(RuntimeError::ShutDown);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyRunning);
        }

        info!("Chime runtime is now running");
        let sweeper = self.spawn_sweeper();
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        tasks.spawn(handle_event(
                            self.dispatcher.clone(),
                            Arc::clone(&self.bot),
                            event,
                            Arc::clone(&self.counters),
                        ));
                    }
                    None => {
                        info!("Event channel closed");
                        break;
                    }
                },
                Some(result) = tasks.join_next(), if !tasks.is_empty() => log_join(result),
            }
        }

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        debug!(in_flight = tasks.len(), "Waiting for in-flight events");
        while let Some(result) = tasks.join_next().await {
            log_join(result);
        }

        self.running.store(false, Ordering::SeqCst);
        let stats = self.stats();
        info!(?stats, "Chime runtime stopped");
        Ok(stats)
    }

    /// Starts the periodic cooldown sweep, if configured.
    fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let period = self.config.cooldown.sweep_interval()?;
        let cooldowns: CooldownTracker = self.dispatcher.cooldowns().clone();

        let task = async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = cooldowns.sweep();
                if removed > 0 {
                    debug!(removed, remaining = cooldowns.len(), "Swept expired cooldowns");
                }
            }
        };
        debug!(period_secs = period.as_secs(), "Cooldown sweep enabled");
        Some(tokio::spawn(task.instrument(info_span!("cooldown_sweep"))))
    }
}

async fn handle_event(
    dispatcher: Dispatcher,
    bot: BoxedBot,
    event: RawEvent,
    counters: Arc<Counters>,
) {
    counters.received.fetch_add(1, Ordering::Relaxed);
    match dispatcher.dispatch(bot, event).await {
        Ok(DispatchOutcome::Executed) => {
            counters.executed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(DispatchOutcome::Ignored) => {
            counters.ignored.fetch_add(1, Ordering::Relaxed);
        }
        Ok(outcome) => {
            counters.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(?outcome, "Event answered with a notice");
        }
        Err(err) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            log_dispatch_error(&err);
        }
    }
}

fn log_dispatch_error(err: &DispatchError) {
    match err {
        DispatchError::UnknownInteractionKind(kind) => {
            warn!(%kind, "Dropping event of unknown interaction kind");
        }
        DispatchError::MalformedEvent(reason) => {
            warn!(%reason, "Dropping malformed event");
        }
        DispatchError::Handler { identifier, source } => {
            error!(handler = %identifier, error = ?source, "Handler failed");
        }
        other => error!(error = %other, "Dispatch failed"),
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(err) = result
        && err.is_panic()
    {
        error!(error = %err, "Event task panicked");
    }
}

/// Waits for Ctrl+C, or SIGTERM on Unix.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`ChimeRuntime`] with loaded configuration.
///
/// ```rust,ignore
/// let runtime = ChimeRuntime::builder()
///     .config_file("config/production.toml")
///     .profile("production")
///     .build(bot, registry)?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    cooldowns: Option<CooldownTracker>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            cooldowns: None,
        }
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Uses `config` in place of the built-in defaults.
    pub fn merge(mut self, config: ChimeConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Shares a cooldown tracker, e.g. one driven by a test clock.
    pub fn cooldowns(mut self, cooldowns: CooldownTracker) -> Self {
        self.cooldowns = Some(cooldowns);
        self
    }

    /// Loads configuration, initializes logging and builds the runtime.
    pub fn build(self, bot: BoxedBot, registry: MetadataRegistry) -> ConfigResult<ChimeRuntime> {
        let config = self.config_loader.load()?;
        let mut runtime = ChimeRuntime::from_config(&config, bot, registry);
        if let Some(cooldowns) = self.cooldowns {
            runtime.dispatcher = runtime.dispatcher.with_cooldowns(cooldowns);
        }
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use chime_core::testing::{self, RecordingBot};
    use chime_core::{InteractionType, InvocationMode};
    use chime_framework::{CommandContext, CommandOptions, ManualClock, command_fn};

    use super::*;

    fn registry(hits: Arc<AtomicUsize>) -> MetadataRegistry {
        let mut registry = MetadataRegistry::new();
        registry
            .add_command(
                CommandOptions::new("ping", "Ping").mode(InvocationMode::Both),
                command_fn(move |_bot, _ctx: CommandContext| {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
            .unwrap();
        registry
            .add_command(
                CommandOptions::new("broken", "Fails"),
                command_fn(|_bot, _ctx: CommandContext| async {
                    Err(anyhow::anyhow!("boom"))
                }),
            )
            .unwrap();
        registry
    }

    fn runtime(hits: Arc<AtomicUsize>) -> ChimeRuntime {
        ChimeRuntime::new(Arc::new(RecordingBot::new()), registry(hits))
    }

    #[tokio::test]
    async fn test_runs_until_channel_closes() {
        let hits = Arc::new(AtomicUsize::new(0));
        let runtime = runtime(Arc::clone(&hits));
        let (tx, rx) = mpsc::channel(8);

        let mut ping_kind = testing::slash("ping", vec![]);
        ping_kind.kind = InteractionType::Ping;
        for event in [
            RawEvent::from(testing::slash("ping", vec![])),
            RawEvent::from(testing::message("!ping")),
            RawEvent::from(testing::message("just chatting")),
            RawEvent::from(testing::slash("broken", vec![])),
            RawEvent::from(ping_kind),
        ] {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        let stats = runtime.run_until(rx, std::future::pending()).await.unwrap();
        assert_eq!(
            stats,
            RuntimeStats {
                received: 5,
                executed: 2,
                ignored: 1,
                rejected: 0,
                failed: 2,
            }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_run() {
        let runtime = Arc::new(runtime(Arc::new(AtomicUsize::new(0))));
        let (tx, rx) = mpsc::channel(8);
        let token = runtime.shutdown_token();

        let handle = {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move { runtime.run_until(rx, std::future::pending()).await })
        };
        tx.send(testing::slash("ping", vec![]).into()).await.unwrap();
        tokio::task::yield_now().await;
        token.cancel();

        let stats = handle.await.unwrap().unwrap();
        assert!(stats.received <= 1);
        assert!(matches!(
            runtime.run_until(mpsc::channel(1).1, std::future::pending()).await,
            Err(RuntimeError::ShutDown)
        ));
        drop(tx);
    }

    #[tokio::test]
    async fn test_custom_shutdown_future() {
        let runtime = runtime(Arc::new(AtomicUsize::new(0)));
        let (_tx, rx) = mpsc::channel::<RawEvent>(8);
        let stats = tokio_test::assert_ok!(runtime.run_until(rx, async {}).await);
        assert_eq!(stats, RuntimeStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired_cooldowns() {
        let clock = Arc::new(ManualClock::new(1_000));
        let cooldowns = CooldownTracker::with_clock(clock.clone());
        cooldowns.refresh(
            chime_framework::CooldownScope::User,
            "ping",
            testing::USER_ID,
            Some(Duration::from_secs(1)),
        );
        clock.set(10_000);

        let mut config = ChimeConfig::default();
        config.cooldown.sweep_interval_secs = 1;
        let dispatcher = Dispatcher::new(registry(Arc::new(AtomicUsize::new(0))))
            .with_cooldowns(cooldowns.clone());
        let runtime =
            ChimeRuntime::with_dispatcher(config, Arc::new(RecordingBot::new()), dispatcher);

        let (_tx, rx) = mpsc::channel::<RawEvent>(8);
        runtime
            .run_until(rx, tokio::time::sleep(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(cooldowns.is_empty());
    }

    #[test]
    fn test_config_applied_to_dispatcher() {
        let mut config = ChimeConfig::default();
        config.dispatcher.prefixes = vec!["?".into(), "c!".into()];
        let dispatcher = ChimeRuntime::dispatcher_for(&config, MetadataRegistry::new());
        assert_eq!(dispatcher.prefixes(), ["?", "c!"]);
    }
}
