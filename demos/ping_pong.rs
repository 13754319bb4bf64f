//! Ping pong: One looper, one handler, two opcodes and a blocking request.
//!
//! Run with `RUST_LOG=debug cargo run --example ping_pong` to see the
//! looper's own logging.

use looper::{Handler, Looper, LooperConfig, Message, MessageHandler};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const WHAT_PING: u32 = 1;
const WHAT_PONG: u32 = 2;
const WHAT_QUERY: u32 = 3;

/// Counts pings and pongs and answers queries with the totals.
#[derive(Default)]
struct Player {
    pings: i32,
    pongs: i32,
}

impl MessageHandler for Player {
    fn on_message_received(&mut self, mut msg: Message) {
        match msg.what() {
            WHAT_PING => {
                self.pings += 1;
                info!(round = ?msg.find_int32("round"), "ping");
            }
            WHAT_PONG => {
                self.pongs += 1;
                info!(round = ?msg.find_int32("round"), "pong");
            }
            WHAT_QUERY => {
                if let Some(token) = msg.sender_awaits_response() {
                    let mut reply = Message::default();
                    reply.set_int32("pings", self.pings);
                    reply.set_int32("pongs", self.pongs);
                    if let Err(err) = reply.post_reply(&token) {
                        info!(%err, "failed to answer query");
                    }
                }
            }
            other => info!(what = other, "unrecognized message"),
        }
    }
}

fn send(handler: &Arc<Handler>, round: i32) -> looper::Result<()> {
    let what = if round % 2 == 1 { WHAT_PING } else { WHAT_PONG };
    let mut msg = Message::new(what, Some(handler));
    msg.set_int32("round", round);
    msg.post(Duration::from_millis(10))
}

fn main() -> looper::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let looper = Looper::with_config(LooperConfig::default().with_name("ping-pong"));
    let player = Handler::new(Player::default());
    looper.register_handler(&player)?;
    looper.start(false)?;

    for round in 1..=6 {
        send(&player, round)?;
    }

    // Let the delayed rounds land before asking for totals.
    std::thread::sleep(Duration::from_millis(50));
    let totals = Message::new(WHAT_QUERY, Some(&player)).post_and_await_response()?;
    println!(
        "pings: {}, pongs: {}",
        totals.find_int32("pings").unwrap_or(0),
        totals.find_int32("pongs").unwrap_or(0)
    );
    println!("{totals:?}");

    let mut roster = Vec::new();
    if looper.roster().dump(&mut roster).is_ok() {
        print!("{}", String::from_utf8_lossy(&roster));
    }

    looper.stop()
}
