//! Message: Opcode plus typed property bag, and the request/response helpers.

mod item;
#[allow(clippy::module_inception)]
mod message;

pub use item::{Item, ItemType, ItemValue, Object, MAX_ITEMS};
pub use message::{Message, REPLY_TOKEN_KEY};
