//! # Looper
//!
//! An in-process, thread-safe message-passing runtime.
//!
//! A [`Looper`] owns a queue of pending [`Message`]s ordered by due time and a
//! single worker (its own thread, or a thread you lend it) that delivers each
//! message to the [`Handler`] it targets. Messages can also be used as
//! blocking requests: the handler answers through a one-shot [`ReplyToken`].
//!
//! ## Core Concepts
//!
//! - **Deadline ordering**: messages deliver in due-time order, FIFO for ties
//! - **Weak back-references**: messages, tokens and handlers never keep a looper alive
//! - **Lock-free dispatch**: handlers run with no internal lock held
//! - **Explicit registry**: handler ids come from a [`Roster`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use looper::{Handler, Looper, Message};
//! use std::time::Duration;
//!
//! let looper = Looper::new();
//! let handler = Handler::new(|msg: Message| println!("got {}", msg.what()));
//! looper.register_handler(&handler).unwrap();
//! looper.start(false).unwrap();
//!
//! let mut msg = Message::new(1, Some(&handler));
//! msg.set_int32("value", 42);
//! msg.post(Duration::ZERO).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod handler;
pub mod looper;
pub mod message;
pub mod reply;
pub mod roster;
pub mod status;
mod sync;

// Re-exports for convenience
pub use handler::{Handler, HandlerId, MessageHandler};
pub use looper::{now_us, Looper, LooperConfig};
pub use message::{Item, ItemType, ItemValue, Message, Object, MAX_ITEMS};
pub use reply::ReplyToken;
pub use roster::{Roster, RosterEntry};
pub use status::{Error, Result, Status};
