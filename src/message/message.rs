//! Message: An opcode plus a named property bag, bound to a target handler.

use super::item::{Item, ItemType, ItemValue, Items, Object};
use crate::handler::{Handler, HandlerId};
use crate::looper::Looper;
use crate::reply::ReplyToken;
use crate::status::{Error, Result};
use std::fmt::{self, Write as _};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::warn;

/// Reserved item name carrying the reply token of a blocking request.
pub const REPLY_TOKEN_KEY: &str = "replyID";

/// A unit of delivery.
///
/// A message is owned by whoever builds it until it is posted; posting moves
/// it into the target looper's queue and eventually into the handler's
/// dispatch method.
#[derive(Clone, Default)]
pub struct Message {
    what: u32,
    /// Id of the target at bind time. Diagnostic only.
    target: HandlerId,
    handler: Weak<Handler>,
    looper: Weak<Looper>,
    items: Items,
}

impl Message {
    /// Create a message with opcode `what`, bound to `handler`.
    pub fn new(what: u32, handler: Option<&Arc<Handler>>) -> Self {
        let mut msg = Self {
            what,
            ..Self::default()
        };
        msg.set_target(handler);
        msg
    }

    /// Set the opcode.
    #[inline]
    pub fn set_what(&mut self, what: u32) {
        self.what = what;
    }

    /// The opcode.
    #[inline]
    pub const fn what(&self) -> u32 {
        self.what
    }

    /// Handler id captured when the target was set.
    #[inline]
    pub const fn target(&self) -> HandlerId {
        self.target
    }

    /// Bind this message to `handler` and its current looper.
    ///
    /// Binding to `None` or to an unregistered handler leaves the message
    /// unbound; posting it will then fail with [`Error::NotFound`].
    pub fn set_target(&mut self, handler: Option<&Arc<Handler>>) {
        self.target = HandlerId::UNBOUND;
        self.handler = Weak::new();
        self.looper = Weak::new();

        let Some(handler) = handler else {
            warn!("configured a null handler");
            return;
        };
        let (id, looper) = handler.binding();
        if !id.is_bound() {
            warn!("configured a handler that is not registered with any looper");
            return;
        }
        self.target = id;
        self.handler = Arc::downgrade(handler);
        self.looper = looper;
    }

    /// Drop every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the message carries no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.len() == 0
    }

    /// Items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Store a 32-bit integer under `name`, replacing any previous value.
    ///
    /// # Panics
    ///
    /// Panics if `name` is new and the message already holds
    /// [`MAX_ITEMS`](super::MAX_ITEMS) items.
    pub fn set_int32(&mut self, name: &str, value: i32) {
        self.items.upsert(name, ItemValue::Int32(value));
    }

    /// Store a 64-bit integer under `name`, replacing any previous value.
    pub fn set_int64(&mut self, name: &str, value: i64) {
        self.items.upsert(name, ItemValue::Int64(value));
    }

    /// Store a string under `name`, replacing any previous value.
    pub fn set_string(&mut self, name: &str, value: impl Into<String>) {
        self.items.upsert(name, ItemValue::String(value.into()));
    }

    /// Store a shared object under `name`, replacing any previous value.
    pub fn set_object(&mut self, name: &str, value: Object) {
        self.items.upsert(name, ItemValue::Object(value));
    }

    /// Whether an item called `name` exists, whatever its type.
    pub fn contains(&self, name: &str) -> bool {
        self.items.get(name).is_some()
    }

    /// Type of the item called `name`.
    pub fn item_type(&self, name: &str) -> Option<ItemType> {
        self.items.get(name).map(ItemValue::item_type)
    }

    /// The 32-bit integer stored under `name`.
    pub fn find_int32(&self, name: &str) -> Option<i32> {
        match self.items.get(name)? {
            ItemValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// The 64-bit integer stored under `name`.
    pub fn find_int64(&self, name: &str) -> Option<i64> {
        match self.items.get(name)? {
            ItemValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// The string stored under `name`.
    pub fn find_string(&self, name: &str) -> Option<&str> {
        match self.items.get(name)? {
            ItemValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The object stored under `name`.
    pub fn find_object(&self, name: &str) -> Option<Object> {
        match self.items.get(name)? {
            ItemValue::Object(obj) => Some(Arc::clone(obj)),
            _ => None,
        }
    }

    /// The object stored under `name`, if it is a `T`.
    pub fn find_object_as<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.find_object(name)?.downcast::<T>().ok()
    }

    /// Remove the item called `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<ItemValue> {
        self.items.remove(name)
    }

    /// Independent copy with the same opcode, items and target.
    ///
    /// Strings are copied; objects are shared.
    pub fn dup(&self) -> Self {
        self.clone()
    }

    /// Upsert every item of `other` into this message, in `other`'s order.
    pub fn extend(&mut self, other: &Self) {
        for item in other.items.iter() {
            self.items.upsert(item.name(), item.value().clone());
        }
    }

    /// Queue this message on its target looper after `delay`.
    pub fn post(self, delay: Duration) -> Result<()> {
        let Some(looper) = self.looper.upgrade() else {
            warn!(target_id = %self.target, "failed to post message, target looper is gone");
            return Err(Error::NotFound);
        };
        looper.post(self, delay);
        Ok(())
    }

    /// Post this message and block until the handler replies.
    ///
    /// Fails with [`Error::NotFound`] if the message is unbound, or if the
    /// looper stops (or was never started) before a reply arrives.
    pub fn post_and_await_response(mut self) -> Result<Self> {
        let Some(looper) = self.looper.upgrade() else {
            warn!(target_id = %self.target, "failed to post message, target looper is gone");
            return Err(Error::NotFound);
        };

        let token = looper.create_reply_token();
        self.set_object(REPLY_TOKEN_KEY, Arc::clone(&token) as Object);

        looper.post(self, Duration::ZERO);
        looper.await_response(&token)
    }

    /// Take the reply token out of a message whose sender is blocked on it.
    ///
    /// Returns `None` if the sender is not waiting, or if the token was
    /// already taken.
    pub fn sender_awaits_response(&mut self) -> Option<Arc<ReplyToken>> {
        match self.items.get(REPLY_TOKEN_KEY)? {
            ItemValue::Object(obj) if obj.is::<ReplyToken>() => {}
            _ => return None,
        }
        match self.items.remove(REPLY_TOKEN_KEY)? {
            ItemValue::Object(obj) => obj.downcast::<ReplyToken>().ok(),
            _ => None,
        }
    }

    /// Answer a blocking request with this message.
    ///
    /// Fails with [`Error::NotFound`] if the token's looper is gone and with
    /// [`Error::AlreadyExists`] if the token was already answered.
    pub fn post_reply(self, token: &Arc<ReplyToken>) -> Result<()> {
        let Some(looper) = token.looper() else {
            warn!("failed to post reply, target looper is gone");
            return Err(Error::NotFound);
        };
        looper.post_reply(token, self)
    }

    /// Hand the message to its target handler. Called on the looper worker.
    pub(crate) fn deliver(self) {
        let Some(handler) = self.handler.upgrade() else {
            warn!(target_id = %self.target, "failed to deliver message, target handler is gone");
            return;
        };
        if handler.id() != self.target {
            warn!(
                target_id = %self.target,
                "failed to deliver message, target handler was unregistered"
            );
            return;
        }
        handler.deliver_message(self);
    }

    /// Multi-line dump of the opcode, target and items.
    pub fn debug_string(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        let mut s = format!("Message(what = {}", fourcc(self.what));
        if self.target.is_bound() {
            let _ = write!(s, ", target = {}", self.target);
        }
        s.push_str(") = {\n");

        for item in self.items.iter() {
            let _ = match item.value() {
                ItemValue::Int32(v) => writeln!(s, "{pad}  int32_t {} = {v}", item.name()),
                ItemValue::Int64(v) => writeln!(s, "{pad}  int64_t {} = {v}", item.name()),
                ItemValue::String(v) => writeln!(s, "{pad}  string {} = {v:?}", item.name()),
                ItemValue::Object(obj) => {
                    writeln!(s, "{pad}  object {} = {:p}", item.name(), Arc::as_ptr(obj))
                }
            };
        }

        s.push_str(&pad);
        s.push('}');
        s
    }
}

/// Render an opcode as `'abcd'` when all four bytes are printable ASCII.
fn fourcc(what: u32) -> String {
    let bytes = what.to_be_bytes();
    if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        format!("'{text}'")
    } else {
        format!("{what:#010x}")
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_string(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_find_round_trip() {
        let mut msg = Message::default();
        msg.set_int32("width", 1920);
        msg.set_int64("pts", -42);
        msg.set_string("mime", "video/avc");

        assert_eq!(msg.find_int32("width"), Some(1920));
        assert_eq!(msg.find_int64("pts"), Some(-42));
        assert_eq!(msg.find_string("mime"), Some("video/avc"));
        assert_eq!(msg.len(), 3);
    }

    #[test]
    fn test_overwrites_at_capacity() {
        let mut msg = Message::default();
        for i in 0..crate::message::MAX_ITEMS {
            msg.set_int32(&format!("k{i}"), 0);
        }
        // Existing names never take a new slot.
        msg.set_string("k0", "zero");
        assert_eq!(msg.len(), crate::message::MAX_ITEMS);
        assert_eq!(msg.find_string("k0"), Some("zero"));
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn test_setter_panics_past_capacity() {
        let mut msg = Message::new(1, None);
        for i in 0..=crate::message::MAX_ITEMS {
            msg.set_int64(&format!("k{i}"), 0);
        }
    }

    #[test]
    fn test_overwrite_changes_type() {
        let mut msg = Message::default();
        msg.set_int32("value", 1);
        msg.set_string("value", "one");

        assert_eq!(msg.len(), 1);
        assert_eq!(msg.find_int32("value"), None);
        assert_eq!(msg.find_string("value"), Some("one"));
        assert_eq!(msg.item_type("value"), Some(ItemType::String));
    }

    #[test]
    fn test_find_misses_are_silent() {
        let mut msg = Message::default();
        msg.set_int64("n", 5);
        assert_eq!(msg.find_int32("n"), None);
        assert_eq!(msg.find_int64("missing"), None);
        assert!(msg.find_object("n").is_none());
        assert!(msg.contains("n"));
        assert!(!msg.contains("missing"));
        // Misses never modify the message.
        assert_eq!(msg.find_int64("n"), Some(5));
    }

    #[test]
    fn test_object_is_shared() {
        let payload: Arc<Vec<u8>> = Arc::new(vec![1, 2, 3]);
        let mut msg = Message::default();
        msg.set_object("buf", Arc::clone(&payload) as Object);

        let found = msg.find_object_as::<Vec<u8>>("buf").unwrap();
        assert!(Arc::ptr_eq(&found, &payload));
        assert!(msg.find_object_as::<String>("buf").is_none());
    }

    #[test]
    fn test_clear_drops_objects() {
        let payload = Arc::new(7u32);
        let mut msg = Message::default();
        msg.set_object("obj", Arc::clone(&payload) as Object);
        assert_eq!(Arc::strong_count(&payload), 2);

        msg.clear();
        assert!(msg.is_empty());
        assert_eq!(Arc::strong_count(&payload), 1);
    }

    #[test]
    fn test_overwrite_releases_previous_object() {
        let payload = Arc::new(7u32);
        let mut msg = Message::default();
        msg.set_object("obj", Arc::clone(&payload) as Object);
        msg.set_int32("obj", 0);
        assert_eq!(Arc::strong_count(&payload), 1);
    }

    #[test]
    fn test_dup_is_independent() {
        let shared = Arc::new(String::from("shared"));
        let mut original = Message::new(7, None);
        original.set_int32("a", 1);
        original.set_string("s", "text");
        original.set_object("o", Arc::clone(&shared) as Object);

        let mut copy = original.dup();
        assert_eq!(copy.what(), 7);
        assert_eq!(copy.find_int32("a"), Some(1));
        assert_eq!(copy.find_string("s"), Some("text"));

        copy.set_int32("a", 2);
        copy.set_string("s", "changed");
        copy.set_int64("new", 3);
        copy.set_what(8);

        assert_eq!(original.what(), 7);
        assert_eq!(original.find_int32("a"), Some(1));
        assert_eq!(original.find_string("s"), Some("text"));
        assert!(!original.contains("new"));

        let a = original.find_object_as::<String>("o").unwrap();
        let b = copy.find_object_as::<String>("o").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_extend_upserts_in_order() {
        let mut this = Message::default();
        this.set_int32("shared", 1);
        this.set_int32("mine", 2);

        let mut other = Message::default();
        other.set_string("theirs", "x");
        other.set_int64("shared", 10);

        this.extend(&other);

        let names: Vec<&str> = this.items().map(Item::name).collect();
        assert_eq!(names, ["shared", "mine", "theirs"]);
        assert_eq!(this.find_int64("shared"), Some(10));
        assert_eq!(this.find_int32("shared"), None);
        assert_eq!(this.find_int32("mine"), Some(2));
        assert_eq!(this.find_string("theirs"), Some("x"));

        assert_eq!(other.len(), 2);
        assert!(!other.contains("mine"));
    }

    #[test]
    fn test_unbound_post_fails() {
        let msg = Message::new(1, None);
        assert_eq!(msg.target(), HandlerId::UNBOUND);
        assert_eq!(msg.post(Duration::ZERO), Err(Error::NotFound));

        let handler = Handler::new(|_msg: Message| {});
        let msg = Message::new(1, Some(&handler));
        assert_eq!(msg.post_and_await_response().err(), Some(Error::NotFound));
    }

    #[test]
    fn test_sender_awaits_response_without_token() {
        let mut msg = Message::default();
        assert!(msg.sender_awaits_response().is_none());

        msg.set_int32(REPLY_TOKEN_KEY, 3);
        assert!(msg.sender_awaits_response().is_none());
        // A foreign value under the reserved key is left alone.
        assert_eq!(msg.find_int32(REPLY_TOKEN_KEY), Some(3));
    }

    #[test]
    fn test_debug_string() {
        let mut msg = Message::new(u32::from_be_bytes(*b"ping"), None);
        msg.set_int32("count", 4);
        msg.set_string("who", "me");

        let dump = msg.debug_string(2);
        assert!(dump.starts_with("Message(what = 'ping') = {\n"));
        assert!(dump.contains("    int32_t count = 4\n"));
        assert!(dump.contains("    string who = \"me\"\n"));
        assert!(dump.ends_with("  }"));

        let numeric = Message::new(1, None);
        assert!(numeric.debug_string(0).starts_with("Message(what = 0x00000001)"));
    }
}
