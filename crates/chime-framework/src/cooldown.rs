//! Per-handler cooldown tracking.
//!
//! Records are keyed by handler name, scope and subject ID and hold the
//! expiry time in Unix milliseconds. Expired records are treated as absent on
//! read; [`CooldownTracker::sweep`] removes them for long-running processes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chime_core::Id;
use parking_lot::RwLock;
use tracing::trace;

/// Source of the current time in Unix milliseconds.
pub trait Clock: Send + Sync + 'static {
    fn now_ms(&self) -> u64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Which subject a cooldown applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CooldownScope {
    User,
    Guild,
}

type Records = HashMap<String, HashMap<(CooldownScope, Id), u64>>;

/// Expiry map shared by every dispatch task.
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct CooldownTracker {
    records: Arc<RwLock<Records>>,
    clock: Arc<dyn Clock>,
}

impl CooldownTracker {
    /// Creates a tracker on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Returns the tracker's current time in Unix milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Returns the remaining cooldown in milliseconds, or 0 if clear.
    pub fn check(&self, scope: CooldownScope, handler: &str, subject: Id) -> u64 {
        let now = self.now_ms();
        self.records
            .read()
            .get(handler)
            .and_then(|subjects| subjects.get(&(scope, subject)))
            .map_or(0, |&expires_at| expires_at.saturating_sub(now))
    }

    /// Starts a cooldown of `duration` from now.
    ///
    /// `None` or a zero duration records nothing.
    pub fn refresh(
        &self,
        scope: CooldownScope,
        handler: &str,
        subject: Id,
        duration: Option<Duration>,
    ) {
        let Some(duration) = duration.filter(|d| !d.is_zero()) else {
            return;
        };
        let expires_at = self.now_ms().saturating_add(duration.as_millis() as u64);
        trace!(handler, ?scope, subject, expires_at, "Cooldown refreshed");
        self.records
            .write()
            .entry(handler.to_string())
            .or_default()
            .insert((scope, subject), expires_at);
    }

    /// Returns the larger of the user and guild cooldowns.
    pub fn remaining(&self, handler: &str, user: Id, guild: Option<Id>) -> u64 {
        let user_left = self.check(CooldownScope::User, handler, user);
        let guild_left = guild.map_or(0, |g| self.check(CooldownScope::Guild, handler, g));
        user_left.max(guild_left)
    }

    /// Removes expired records and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.now_ms();
        let mut records = self.records.write();
        let mut removed = 0;
        records.retain(|_, subjects| {
            let before = subjects.len();
            subjects.retain(|_, expires_at| *expires_at > now);
            removed += before - subjects.len();
            !subjects.is_empty()
        });
        removed
    }

    /// Returns the number of stored records, including expired ones.
    pub fn len(&self) -> usize {
        self.records.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CooldownTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CooldownTracker")
            .field("records", &self.len())
            .finish_non_exhaustive()
    }
}
