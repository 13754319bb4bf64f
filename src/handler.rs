//! Handler: The receiving end of message delivery.
//!
//! Application code implements [`MessageHandler`] and wraps it in a
//! [`Handler`], which carries the registration state (id and owning looper)
//! and delivery statistics. A handler is registered with exactly one
//! [`Looper`] at a time and receives messages one at a time on that looper's
//! worker.

use crate::looper::Looper;
use crate::message::Message;
use crate::sync::lock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Identifier assigned to a handler by a [`Roster`](crate::Roster).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct HandlerId(pub u32);

impl HandlerId {
    /// The id of a handler that is not registered anywhere.
    pub const UNBOUND: Self = Self(0);

    /// Whether this id was assigned by a roster.
    #[inline]
    pub const fn is_bound(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message dispatch entry point.
///
/// The owning looper never calls this concurrently for the same handler.
pub trait MessageHandler: Send + 'static {
    /// Handle one delivered message.
    fn on_message_received(&mut self, msg: Message);
}

impl<F> MessageHandler for F
where
    F: FnMut(Message) + Send + 'static,
{
    fn on_message_received(&mut self, msg: Message) {
        self(msg);
    }
}

#[derive(Default)]
struct Binding {
    id: HandlerId,
    looper: Weak<Looper>,
}

/// A registered (or registrable) message receiver.
pub struct Handler {
    binding: Mutex<Binding>,
    dispatch: Mutex<Box<dyn MessageHandler>>,
    verbose_stats: AtomicBool,
    message_counter: AtomicU64,
    /// Per-opcode tally, only kept while verbose stats are on.
    messages: Mutex<HashMap<u32, u64>>,
}

impl Handler {
    /// Wrap a dispatch implementation into a shareable handler.
    pub fn new(dispatch: impl MessageHandler) -> Arc<Self> {
        Arc::new(Self {
            binding: Mutex::new(Binding::default()),
            dispatch: Mutex::new(Box::new(dispatch)),
            verbose_stats: AtomicBool::new(false),
            message_counter: AtomicU64::new(0),
            messages: Mutex::new(HashMap::new()),
        })
    }

    /// Current id, [`HandlerId::UNBOUND`] when not registered.
    pub fn id(&self) -> HandlerId {
        lock(&self.binding).id
    }

    /// The looper this handler is registered with, if it is still alive.
    pub fn looper(&self) -> Option<Arc<Looper>> {
        lock(&self.binding).looper.upgrade()
    }

    pub(crate) fn binding(&self) -> (HandlerId, Weak<Looper>) {
        let binding = lock(&self.binding);
        (binding.id, binding.looper.clone())
    }

    pub(crate) fn set_binding(&self, id: HandlerId, looper: Weak<Looper>) {
        *lock(&self.binding) = Binding { id, looper };
    }

    /// Enable or disable the per-opcode delivery tally.
    pub fn set_verbose_stats(&self, enabled: bool) {
        self.verbose_stats.store(enabled, Ordering::Relaxed);
    }

    /// Total number of messages delivered to this handler.
    pub fn message_count(&self) -> u64 {
        self.message_counter.load(Ordering::Relaxed)
    }

    /// Number of messages with opcode `what` delivered while verbose stats were on.
    pub fn message_tally(&self, what: u32) -> u64 {
        lock(&self.messages).get(&what).copied().unwrap_or(0)
    }

    /// Run the dispatch method and update statistics.
    pub(crate) fn deliver_message(&self, msg: Message) {
        let what = msg.what();
        lock(&self.dispatch).on_message_received(msg);

        self.message_counter.fetch_add(1, Ordering::Relaxed);
        if self.verbose_stats.load(Ordering::Relaxed) {
            *lock(&self.messages).entry(what).or_insert(0) += 1;
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id())
            .field("message_count", &self.message_count())
            .finish_non_exhaustive()
    }
}
