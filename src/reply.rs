//! ReplyToken: One-shot handle for a blocking request/response exchange.
//!
//! A token is created by the looper serving the request, travels inside the
//! request message, and is answered at most once by the handler through
//! [`Message::post_reply`]. The requester drains the answer exactly once.

use crate::looper::Looper;
use crate::message::Message;
use crate::status::{Error, Result};
use crate::sync::lock;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

#[derive(Default)]
struct ReplySlot {
    reply: Option<Message>,
    replied: bool,
}

/// One-shot reply handle bound to a looper.
pub struct ReplyToken {
    looper: Weak<Looper>,
    /// Only touched while the owning looper's reply lock is held.
    slot: Mutex<ReplySlot>,
}

impl ReplyToken {
    pub(crate) fn new(looper: Weak<Looper>) -> Self {
        Self {
            looper,
            slot: Mutex::new(ReplySlot::default()),
        }
    }

    /// The looper this token belongs to, if it is still alive.
    pub fn looper(&self) -> Option<Arc<Looper>> {
        self.looper.upgrade()
    }

    /// Whether a reply has been recorded. Stays `true` after retrieval.
    pub fn has_replied(&self) -> bool {
        lock(&self.slot).replied
    }

    /// Record `reply`. Fails with [`Error::AlreadyExists`] on a second call.
    pub(crate) fn set_reply(&self, reply: Message) -> Result<()> {
        let mut slot = lock(&self.slot);
        if slot.replied {
            warn!("trying to post a duplicate reply");
            return Err(Error::AlreadyExists);
        }
        slot.reply = Some(reply);
        slot.replied = true;
        Ok(())
    }

    /// Take the recorded reply, if any.
    pub(crate) fn retrieve_reply(&self) -> Option<Message> {
        let mut slot = lock(&self.slot);
        if slot.replied {
            slot.reply.take()
        } else {
            None
        }
    }
}

impl fmt::Debug for ReplyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyToken")
            .field("replied", &self.has_replied())
            .finish_non_exhaustive()
    }
}
