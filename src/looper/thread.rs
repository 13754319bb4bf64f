//! Looper thread: Dedicated worker that drives a looper's queue.

use super::looper::LooperInner;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// Handle to a running worker thread.
#[derive(Debug)]
pub(crate) struct LooperThread {
    /// Handle to the worker thread.
    handle: Option<JoinHandle<()>>,
    /// Exit signal. The worker also exits when this is dropped.
    exit_tx: Sender<()>,
}

impl LooperThread {
    /// Spawn a worker that runs loop steps on `inner` until told to stop.
    pub(crate) fn spawn(inner: Arc<LooperInner>, name: String) -> io::Result<Self> {
        let (exit_tx, exit_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || Self::run_loop(&inner, &exit_rx))?;

        Ok(Self {
            handle: Some(handle),
            exit_tx,
        })
    }

    /// Signal the worker to exit and wait for it, unless called from the worker itself.
    pub(crate) fn stop(mut self) {
        let _ = self.exit_tx.try_send(());
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // Stopped from inside a dispatch; the loop exits once it returns.
            return;
        }
        if handle.join().is_err() {
            debug!("looper thread panicked");
        }
    }

    /// Main worker loop.
    fn run_loop(inner: &LooperInner, exit_rx: &Receiver<()>) {
        trace!("looper thread started");
        let _worker = inner.worker_guard();
        loop {
            if !inner.loop_once() {
                break;
            }
            match exit_rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(()) | Err(TryRecvError::Disconnected) => break,
            }
        }
        trace!("looper thread exiting");
    }
}
