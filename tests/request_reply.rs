//! Blocking request/response through reply tokens.

use crossbeam_channel::unbounded;
use looper::{Error, Handler, Looper, LooperConfig, Message, ReplyToken, Roster, Status};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

const WHAT_ADD: u32 = 1;

fn new_looper(name: &str) -> Arc<Looper> {
    Looper::with_roster(
        LooperConfig::default().with_name(name),
        Arc::new(Roster::new()),
    )
}

/// Replies to `WHAT_ADD` with the sum of `a` and `b`, then reports the status
/// of a second reply on the same token.
fn adder() -> (Arc<Handler>, crossbeam_channel::Receiver<Result<(), Error>>) {
    let (tx, rx) = unbounded();
    let handler = Handler::new(move |mut msg: Message| {
        if msg.what() != WHAT_ADD {
            return;
        }
        let Some(token) = msg.sender_awaits_response() else {
            return;
        };
        // The token is consumed from the request.
        assert!(msg.sender_awaits_response().is_none());

        let a = msg.find_int32("a").unwrap_or(0);
        let b = msg.find_int32("b").unwrap_or(0);
        let mut reply = Message::default();
        reply.set_int32("sum", a + b);
        reply.post_reply(&token).unwrap();

        let _ = tx.send(Message::default().post_reply(&token));
    });
    (handler, rx)
}

#[test]
fn test_request_gets_reply() {
    let looper = new_looper("adder");
    let (handler, second) = adder();
    looper.register_handler(&handler).unwrap();
    looper.start(false).unwrap();

    let mut request = Message::new(WHAT_ADD, Some(&handler));
    request.set_int32("a", 2);
    request.set_int32("b", 40);
    let reply = request.post_and_await_response().unwrap();

    assert_eq!(reply.find_int32("sum"), Some(42));
    assert_eq!(second.recv_timeout(WAIT), Ok(Err(Error::AlreadyExists)));
    looper.stop().unwrap();
}

#[test]
fn test_concurrent_requesters() {
    let looper = new_looper("adder-many");
    let (handler, _second) = adder();
    looper.register_handler(&handler).unwrap();
    looper.start(false).unwrap();

    let requesters: Vec<_> = (0..8)
        .map(|i| {
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                let mut request = Message::new(WHAT_ADD, Some(&handler));
                request.set_int32("a", i);
                request.set_int32("b", 100);
                request.post_and_await_response().map(|r| r.find_int32("sum"))
            })
        })
        .collect();

    for (i, requester) in requesters.into_iter().enumerate() {
        let expected = i32::try_from(i).unwrap() + 100;
        assert_eq!(requester.join().unwrap(), Ok(Some(expected)));
    }
    looper.stop().unwrap();
}

#[test]
fn test_stop_unblocks_waiter() {
    let looper = new_looper("silent");
    let (token_tx, token_rx) = unbounded::<Arc<ReplyToken>>();
    let handler = Handler::new(move |mut msg: Message| {
        // Keep the token but never answer.
        if let Some(token) = msg.sender_awaits_response() {
            let _ = token_tx.send(token);
        }
    });
    looper.register_handler(&handler).unwrap();
    looper.start(false).unwrap();

    let waiter = {
        let handler = Arc::clone(&handler);
        thread::spawn(move || Message::new(7, Some(&handler)).post_and_await_response())
    };

    let token = token_rx.recv_timeout(WAIT).unwrap();
    assert!(!token.has_replied());
    looper.stop().unwrap();

    let result = waiter.join().unwrap();
    assert_eq!(result.as_ref().err(), Some(&Error::NotFound));
    assert_eq!(Status::from(&result), Status::NameNotFound);
}

#[test]
fn test_request_on_stopped_looper_fails() {
    let looper = new_looper("stopped");
    let (handler, _second) = adder();
    looper.register_handler(&handler).unwrap();
    looper.start(false).unwrap();
    looper.stop().unwrap();

    let result = Message::new(WHAT_ADD, Some(&handler)).post_and_await_response();
    assert_eq!(result.err(), Some(Error::NotFound));
}

#[test]
fn test_reply_after_looper_dropped() {
    let (token_tx, token_rx) = unbounded::<Arc<ReplyToken>>();
    let handler = Handler::new(move |mut msg: Message| {
        if let Some(token) = msg.sender_awaits_response() {
            let _ = token_tx.send(token);
        }
    });

    let looper = new_looper("short-lived");
    looper.register_handler(&handler).unwrap();
    looper.start(false).unwrap();

    let waiter = {
        let handler = Arc::clone(&handler);
        thread::spawn(move || Message::new(1, Some(&handler)).post_and_await_response())
    };
    let token = token_rx.recv_timeout(WAIT).unwrap();

    looper.stop().unwrap();
    assert_eq!(waiter.join().unwrap().err(), Some(Error::NotFound));
    drop(looper);

    assert!(token.looper().is_none());
    assert_eq!(Message::default().post_reply(&token), Err(Error::NotFound));
}

#[test]
fn test_nested_request_across_loopers() {
    let backend = new_looper("backend");
    let (adder, _second) = adder();
    backend.register_handler(&adder).unwrap();
    backend.start(false).unwrap();

    // The frontend handler makes a blocking request to the backend from
    // inside its own dispatch, then answers its caller.
    let frontend = new_looper("frontend");
    let forward_to = Arc::clone(&adder);
    let proxy = Handler::new(move |mut msg: Message| {
        let Some(token) = msg.sender_awaits_response() else {
            return;
        };
        let mut inner = Message::new(WHAT_ADD, Some(&forward_to));
        inner.extend(&msg);
        let reply = inner.post_and_await_response().unwrap();
        reply.post_reply(&token).unwrap();
    });
    frontend.register_handler(&proxy).unwrap();
    frontend.start(false).unwrap();

    let mut request = Message::new(0, Some(&proxy));
    request.set_int32("a", 20);
    request.set_int32("b", 22);
    let reply = request.post_and_await_response().unwrap();
    assert_eq!(reply.find_int32("sum"), Some(42));

    frontend.stop().unwrap();
    backend.stop().unwrap();
}

#[test]
fn test_request_to_looper_on_calling_thread() {
    let looper = new_looper("caller-thread");
    let (handler, _second) = adder();
    looper.register_handler(&handler).unwrap();

    let worker = {
        let looper = Arc::clone(&looper);
        thread::spawn(move || looper.start(true))
    };

    let mut request = Message::new(WHAT_ADD, Some(&handler));
    request.set_int32("a", 1);
    request.set_int32("b", 2);
    // Until the worker attaches the looper is idle and the request fails fast.
    let reply = loop {
        if looper.is_running() {
            break request.post_and_await_response().unwrap();
        }
        thread::yield_now();
    };
    assert_eq!(reply.find_int32("sum"), Some(3));

    looper.stop().unwrap();
    assert_eq!(worker.join().unwrap(), Ok(()));
}
