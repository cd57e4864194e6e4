//! Safepoints between dispatch steps.
//!
//! Every dispatch starts with [`SafepointManager::poll`]. The fast path is a
//! single atomic load. When an action has been submitted or the world has
//! been paused, the poll drops into the slow path, which:
//!
//! 1. Waits while another thread holds a [`PauseGuard`]
//! 2. Runs queued actions on the polling thread, in submission order
//!
//! Polling happens before any cache is touched, so an action that raises
//! (typically [`RubyError::Interrupt`]) abandons the dispatch with nothing
//! half-installed; the caller may simply retry it.

use garnet_runtime::{RubyError, RubyResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::Instant;
use tracing::debug;

/// Work to run at the next safepoint.
pub type SafepointAction = Box<dyn FnOnce() -> RubyResult<()> + Send>;

// =============================================================================
// Statistics
// =============================================================================

/// Safepoint counters.
#[derive(Debug, Default)]
pub struct SafepointStats {
    polls: AtomicU64,
    slow_polls: AtomicU64,
    actions_run: AtomicU64,
    pauses: AtomicU64,
}

impl SafepointStats {
    /// Total polls.
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    /// Polls that took the slow path.
    pub fn slow_polls(&self) -> u64 {
        self.slow_polls.load(Ordering::Relaxed)
    }

    /// Actions executed.
    pub fn actions_run(&self) -> u64 {
        self.actions_run.load(Ordering::Relaxed)
    }

    /// Pauses requested.
    pub fn pauses(&self) -> u64 {
        self.pauses.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Manager
// =============================================================================

#[derive(Default)]
struct Pending {
    actions: VecDeque<SafepointAction>,
    /// Threads currently holding a pause; they are not blocked by it.
    paused_by: Vec<ThreadId>,
}

impl Pending {
    #[inline]
    fn is_idle(&self) -> bool {
        self.actions.is_empty() && self.paused_by.is_empty()
    }
}

/// Coordinates actions and pauses across dispatching threads.
pub struct SafepointManager {
    /// Fast-path flag; mirrors `!pending.is_idle()`.
    requested: AtomicBool,
    pending: Mutex<Pending>,
    resumed: Condvar,
    stats: SafepointStats,
}

impl SafepointManager {
    pub fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            pending: Mutex::new(Pending::default()),
            resumed: Condvar::new(),
            stats: SafepointStats::default(),
        }
    }

    /// Check for pending safepoint work.
    #[inline]
    pub fn poll(&self) -> RubyResult<()> {
        self.stats.polls.fetch_add(1, Ordering::Relaxed);
        if !self.requested.load(Ordering::Acquire) {
            return Ok(());
        }
        self.poll_slow()
    }

    #[cold]
    fn poll_slow(&self) -> RubyResult<()> {
        self.stats.slow_polls.fetch_add(1, Ordering::Relaxed);
        let current = thread::current().id();

        loop {
            let action = {
                let mut pending = self.pending.lock();
                while !pending.paused_by.is_empty() && !pending.paused_by.contains(&current) {
                    self.resumed.wait(&mut pending);
                }
                let action = pending.actions.pop_front();
                self.requested.store(!pending.is_idle(), Ordering::Release);
                action
            };

            match action {
                Some(action) => {
                    self.stats.actions_run.fetch_add(1, Ordering::Relaxed);
                    action()?;
                }
                None => return Ok(()),
            }
        }
    }

    /// Queue `action` to run on the next thread that polls.
    pub fn submit<F>(&self, action: F)
    where
        F: FnOnce() -> RubyResult<()> + Send + 'static,
    {
        let mut pending = self.pending.lock();
        pending.actions.push_back(Box::new(action));
        self.requested.store(true, Ordering::Release);
    }

    /// Queue an action that interrupts the thread that runs it.
    pub fn submit_interrupt(&self, message: impl Into<String>) {
        let message = message.into();
        self.submit(move || Err(RubyError::Interrupt(message)));
    }

    /// Block other threads at their next poll until the guard is dropped.
    pub fn pause(&self) -> PauseGuard<'_> {
        let holder = thread::current().id();
        let mut pending = self.pending.lock();
        pending.paused_by.push(holder);
        self.requested.store(true, Ordering::Release);
        self.stats.pauses.fetch_add(1, Ordering::Relaxed);
        debug!(holders = pending.paused_by.len(), "safepoint pause requested");
        PauseGuard {
            manager: self,
            holder,
            started: Instant::now(),
        }
    }

    /// Check if any thread currently holds a pause.
    pub fn is_paused(&self) -> bool {
        !self.pending.lock().paused_by.is_empty()
    }

    /// Number of actions waiting to run.
    pub fn pending_actions(&self) -> usize {
        self.pending.lock().actions.len()
    }

    #[inline]
    pub fn stats(&self) -> &SafepointStats {
        &self.stats
    }

    fn release(&self, holder: ThreadId) {
        let mut pending = self.pending.lock();
        if let Some(pos) = pending.paused_by.iter().position(|t| *t == holder) {
            pending.paused_by.swap_remove(pos);
        }
        self.requested.store(!pending.is_idle(), Ordering::Release);
        if pending.paused_by.is_empty() {
            self.resumed.notify_all();
        }
    }
}

impl Default for SafepointManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps other threads paused until dropped.
pub struct PauseGuard<'a> {
    manager: &'a SafepointManager,
    holder: ThreadId,
    started: Instant,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        debug!(held_us = self.started.elapsed().as_micros() as u64, "safepoint pause released");
        self.manager.release(self.holder);
    }
}
