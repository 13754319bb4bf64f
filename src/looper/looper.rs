//! Looper: Timed message queue with a single delivery worker.
//!
//! The worker is either a dedicated thread spawned by [`Looper::start`] or the
//! thread that called `start(true)`. It repeatedly takes the earliest due
//! message off the queue and hands it to its target handler with no lock
//! held, so handlers may post (even to their own looper) from inside dispatch.

use super::clock::{deadline_after, now_us};
use super::config::LooperConfig;
use super::queue::EventQueue;
use super::thread::LooperThread;
use crate::handler::{Handler, HandlerId};
use crate::message::Message;
use crate::reply::ReplyToken;
use crate::roster::Roster;
use crate::status::{Error, Result};
use crate::sync::{lock, wait, wait_timeout};
use std::fmt;
use std::mem;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, trace};

/// Lifecycle of a looper. `Stopped` is terminal.
#[derive(Debug)]
enum RunState {
    Idle,
    Dedicated(LooperThread),
    CallerThread,
    Stopped,
}

impl RunState {
    const fn is_running(&self) -> bool {
        matches!(self, Self::Dedicated(_) | Self::CallerThread)
    }
}

struct QueueState {
    events: EventQueue<Message>,
    run_state: RunState,
}

/// State shared with the worker thread.
pub(crate) struct LooperInner {
    queue: Mutex<QueueState>,
    queue_changed: Condvar,
    max_wait: Duration,
    /// Guards every reply token of this looper.
    replies_lock: Mutex<()>,
    replies_condition: Condvar,
}

impl LooperInner {
    /// Run one loop step. Returns `false` once the looper is no longer running.
    pub(crate) fn loop_once(&self) -> bool {
        let event = {
            let mut state = lock(&self.queue);
            if !state.run_state.is_running() {
                return false;
            }

            let Some(when_us) = state.events.next_due() else {
                drop(wait(&self.queue_changed, state));
                return true;
            };

            let now = now_us();
            if when_us > now {
                let delay =
                    Duration::from_micros((when_us - now).unsigned_abs()).min(self.max_wait);
                drop(wait_timeout(&self.queue_changed, state, delay));
                return true;
            }

            state.events.pop()
        };

        if let Some(event) = event {
            event.payload.deliver();
        }
        true
    }

    fn is_running(&self) -> bool {
        lock(&self.queue).run_state.is_running()
    }

    /// Wake the worker and every requester blocked on a reply.
    fn wake_all(&self) {
        self.queue_changed.notify_all();
        let _guard = lock(&self.replies_lock);
        self.replies_condition.notify_all();
    }

    /// Guard to hold for as long as the current thread drives this looper.
    pub(crate) const fn worker_guard(&self) -> WorkerGuard<'_> {
        WorkerGuard { inner: self }
    }
}

/// Stops the looper if its worker unwinds out of a handler.
pub(crate) struct WorkerGuard<'a> {
    inner: &'a LooperInner,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        error!("handler panicked, stopping looper");
        // The worker's own handle is released outside the queue lock.
        let previous = mem::replace(&mut lock(&self.inner.queue).run_state, RunState::Stopped);
        self.inner.wake_all();
        drop(previous);
    }
}

/// A timed message queue plus the worker that drains it.
pub struct Looper {
    inner: Arc<LooperInner>,
    name: Mutex<String>,
    thread_name: String,
    roster: Arc<Roster>,
}

impl Looper {
    /// Create a looper with default configuration on the global roster.
    pub fn new() -> Arc<Self> {
        Self::with_config(LooperConfig::default())
    }

    /// Create a looper on the global roster.
    pub fn with_config(config: LooperConfig) -> Arc<Self> {
        Self::with_roster(config, Roster::global())
    }

    /// Create a looper whose handlers are registered on `roster`.
    ///
    /// Entries of loopers that no longer exist are pruned from `roster` first.
    pub fn with_roster(config: LooperConfig, roster: Arc<Roster>) -> Arc<Self> {
        roster.unregister_stale_handlers();

        let thread_name = config.worker_thread_name();
        Arc::new(Self {
            inner: Arc::new(LooperInner {
                queue: Mutex::new(QueueState {
                    events: EventQueue::new(),
                    run_state: RunState::Idle,
                }),
                queue_changed: Condvar::new(),
                max_wait: config.max_wait,
                replies_lock: Mutex::new(()),
                replies_condition: Condvar::new(),
            }),
            name: Mutex::new(config.name),
            thread_name,
            roster,
        })
    }

    /// Looper name.
    pub fn name(&self) -> String {
        lock(&self.name).clone()
    }

    /// Rename the looper. Does not rename an already running worker thread.
    pub fn set_name(&self, name: impl Into<String>) {
        *lock(&self.name) = name.into();
    }

    /// The roster this looper registers handlers on.
    pub const fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    /// Register `handler` with this looper.
    pub fn register_handler(self: &Arc<Self>, handler: &Arc<Handler>) -> Result<HandlerId> {
        self.roster.register_handler(self, handler)
    }

    /// Unregister the handler with id `id`.
    pub fn unregister_handler(&self, id: HandlerId) {
        self.roster.unregister_handler(id);
    }

    /// Start delivering messages.
    ///
    /// With `run_on_calling_thread`, the calling thread becomes the worker and
    /// this call only returns after [`stop`](Self::stop). Otherwise a dedicated
    /// thread is spawned and the call returns immediately.
    ///
    /// Fails with [`Error::InvalidOperation`] if the looper was already started.
    pub fn start(&self, run_on_calling_thread: bool) -> Result<()> {
        if run_on_calling_thread {
            {
                let mut state = lock(&self.inner.queue);
                if !matches!(state.run_state, RunState::Idle) {
                    return Err(Error::InvalidOperation);
                }
                state.run_state = RunState::CallerThread;
            }

            debug!(looper = %self.name(), "running on calling thread");
            let _worker = self.inner.worker_guard();
            while self.inner.loop_once() {}
            return Ok(());
        }

        let mut state = lock(&self.inner.queue);
        if !matches!(state.run_state, RunState::Idle) {
            return Err(Error::InvalidOperation);
        }

        // The worker blocks on the queue lock until it is released below.
        let thread = LooperThread::spawn(Arc::clone(&self.inner), self.thread_name.clone())
            .map_err(|err| {
                error!(looper = %self.name(), %err, "failed to spawn looper thread");
                Error::Unknown
            })?;
        state.run_state = RunState::Dedicated(thread);
        debug!(looper = %self.name(), "started looper thread");
        Ok(())
    }

    /// Stop delivering messages and wake everyone blocked on this looper.
    ///
    /// Repeated calls succeed. Fails with [`Error::InvalidOperation`] if the
    /// looper was never started. Messages still queued are not delivered.
    pub fn stop(&self) -> Result<()> {
        let previous = {
            let mut state = lock(&self.inner.queue);
            match &state.run_state {
                RunState::Idle => return Err(Error::InvalidOperation),
                RunState::Stopped => return Ok(()),
                RunState::Dedicated(_) | RunState::CallerThread => {}
            }
            mem::replace(&mut state.run_state, RunState::Stopped)
        };

        self.inner.wake_all();

        if let RunState::Dedicated(thread) = previous {
            thread.stop();
        }
        debug!(looper = %self.name(), "stopped");
        Ok(())
    }

    /// Whether a worker is currently attached.
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Number of messages waiting in the queue.
    pub fn pending_messages(&self) -> usize {
        lock(&self.inner.queue).events.len()
    }

    /// Queue `msg` for delivery after `delay`.
    pub(crate) fn post(&self, msg: Message, delay: Duration) {
        let when_us = deadline_after(delay);

        let mut state = lock(&self.inner.queue);
        trace!(what = msg.what(), when_us, "post");
        if state.events.insert(when_us, msg) {
            self.inner.queue_changed.notify_one();
        }
    }

    /// Allocate a reply token bound to this looper.
    pub(crate) fn create_reply_token(self: &Arc<Self>) -> Arc<ReplyToken> {
        Arc::new(ReplyToken::new(Arc::downgrade(self)))
    }

    /// Block until `token` is answered or this looper stops running.
    pub(crate) fn await_response(&self, token: &ReplyToken) -> Result<Message> {
        let mut guard = lock(&self.inner.replies_lock);
        loop {
            if let Some(reply) = token.retrieve_reply() {
                return Ok(reply);
            }
            if !self.inner.is_running() {
                return Err(Error::NotFound);
            }
            guard = wait(&self.inner.replies_condition, guard);
        }
    }

    /// Answer `token` with `reply` and wake the waiting requester.
    pub(crate) fn post_reply(&self, token: &ReplyToken, reply: Message) -> Result<()> {
        let _guard = lock(&self.inner.replies_lock);
        token.set_reply(reply)?;
        self.inner.replies_condition.notify_all();
        Ok(())
    }
}

impl Drop for Looper {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl fmt::Debug for Looper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Looper")
            .field("name", &self.name())
            .field("running", &self.is_running())
            .field("pending_messages", &self.pending_messages())
            .finish_non_exhaustive()
    }
}
