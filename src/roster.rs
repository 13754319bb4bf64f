//! Roster: Registry of handler ids.
//!
//! The roster hands out handler ids and remembers which looper each handler
//! belongs to. It only keeps weak references, so it never extends the life of
//! a looper or a handler. [`Roster::global`] is the instance loopers use by
//! default; tests and embedders can construct isolated rosters instead.

use crate::handler::{Handler, HandlerId};
use crate::looper::Looper;
use crate::status::{Error, Result};
use crate::sync::lock;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use tracing::{debug, warn};

static GLOBAL: OnceLock<Arc<Roster>> = OnceLock::new();

struct HandlerInfo {
    looper: Weak<Looper>,
    handler: Weak<Handler>,
}

struct RosterState {
    handlers: BTreeMap<HandlerId, HandlerInfo>,
    next_handler_id: u32,
}

/// Snapshot of one roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Registered id.
    pub id: HandlerId,
    /// Name of the owning looper, `None` if it is gone.
    pub looper_name: Option<String>,
    /// Whether the handler is still alive.
    pub handler_alive: bool,
}

/// Handler registry.
pub struct Roster {
    state: Mutex<RosterState>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    /// Create an empty roster. Ids start at 1.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RosterState {
                handlers: BTreeMap::new(),
                next_handler_id: 1,
            }),
        }
    }

    /// The process-wide roster.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Assign the next id to `handler` and bind it to `looper`.
    ///
    /// Fails with [`Error::InvalidOperation`] if the handler already has an id.
    pub fn register_handler(
        &self,
        looper: &Arc<Looper>,
        handler: &Arc<Handler>,
    ) -> Result<HandlerId> {
        let mut state = lock(&self.state);

        if handler.id().is_bound() {
            warn!(id = %handler.id(), "a handler must only be registered once");
            return Err(Error::InvalidOperation);
        }

        let id = HandlerId(state.next_handler_id);
        state.next_handler_id += 1;
        state.handlers.insert(
            id,
            HandlerInfo {
                looper: Arc::downgrade(looper),
                handler: Arc::downgrade(handler),
            },
        );

        handler.set_binding(id, Arc::downgrade(looper));
        debug!(%id, looper = %looper.name(), "registered handler");
        Ok(id)
    }

    /// Remove `id` and reset the handler's binding if it is still alive.
    ///
    /// Unknown ids are ignored.
    pub fn unregister_handler(&self, id: HandlerId) {
        // Released after the lock, like the loopers in `unregister_stale_handlers`.
        let handler = {
            let mut state = lock(&self.state);
            let Some(info) = state.handlers.remove(&id) else {
                return;
            };
            let handler = info.handler.upgrade();
            if let Some(handler) = &handler {
                handler.set_binding(HandlerId::UNBOUND, Weak::new());
            }
            handler
        };
        debug!(%id, "unregistered handler");
        drop(handler);
    }

    /// Evict every entry whose looper is gone.
    pub fn unregister_stale_handlers(&self) {
        // Live loopers are held here until the lock is released. Dropping the
        // last reference inside the critical section would run the looper's
        // teardown (and join its worker) with the roster locked.
        let mut active_loopers: Vec<Arc<Looper>> = Vec::new();
        {
            let mut state = lock(&self.state);
            state.handlers.retain(|id, info| match info.looper.upgrade() {
                Some(looper) => {
                    active_loopers.push(looper);
                    true
                }
                None => {
                    debug!(%id, "unregistering stale handler");
                    false
                }
            });
        }
        drop(active_loopers);
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        lock(&self.state).handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entries in id order.
    pub fn entries(&self) -> Vec<RosterEntry> {
        let (raw, active_loopers): (Vec<_>, Vec<_>) = {
            let state = lock(&self.state);
            state
                .handlers
                .iter()
                .map(|(id, info)| {
                    let looper = info.looper.upgrade();
                    ((*id, info.handler.strong_count() > 0), looper)
                })
                .unzip()
        };

        raw.into_iter()
            .zip(active_loopers)
            .map(|((id, handler_alive), looper)| RosterEntry {
                id,
                looper_name: looper.map(|l| l.name()),
                handler_alive,
            })
            .collect()
    }

    /// Write a human-readable table of all entries.
    pub fn dump(&self, out: &mut impl Write) -> io::Result<()> {
        let entries = self.entries();
        writeln!(out, "{} handler(s) registered", entries.len())?;
        for entry in entries {
            writeln!(
                out,
                "  handler {:>4}  looper: {:<20}  handler: {}",
                entry.id,
                entry.looper_name.as_deref().unwrap_or("<gone>"),
                if entry.handler_alive { "alive" } else { "gone" },
            )?;
        }
        Ok(())
    }
}
