//! Looper: Timed delivery of messages to handlers.
//!
//! # Architecture
//!
//! ```text
//!  producers                 Looper                        worker
//! ┌──────────┐  post()   ┌──────────────────┐  loop_once ┌──────────────┐
//! │ Message  │ ───────▶  │ EventQueue       │ ─────────▶ │ Handler      │
//! │ Message  │ ───────▶  │ (due-time order) │            │  dispatch    │
//! └──────────┘           └──────────────────┘            └──────────────┘
//!       ▲                        │                              │
//!       │ await_response         │ replies lock/condvar         │ post_reply
//!       └────────────────────────┴──────────────────────────────┘
//! ```

mod clock;
mod config;
#[allow(clippy::module_inception)]
mod looper;
mod queue;
mod thread;

pub use clock::now_us;
pub use config::LooperConfig;
pub use looper::Looper;
