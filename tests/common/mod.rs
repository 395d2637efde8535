//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, Once};
use std::time::Duration;
use troupe::{ActionError, Effects};
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once. Filter with `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// What a [`Spy`] observed.
#[derive(Clone, Debug, PartialEq)]
pub enum Seen<S> {
    Enter(S),
    Exit(S, S),
    Error(String),
}

/// Sink that forwards every callback to a channel.
pub struct Spy<S> {
    tx: Mutex<Sender<Seen<S>>>,
}

impl<S> Spy<S> {
    pub fn new() -> (Self, Receiver<Seen<S>>) {
        let (tx, rx) = channel();
        (Self { tx: Mutex::new(tx) }, rx)
    }

    fn send(&self, seen: Seen<S>) {
        if let Ok(tx) = self.tx.lock() {
            let _ = tx.send(seen);
        }
    }
}

impl<S: Clone + Send> Effects<S> for Spy<S> {
    fn on_enter(&self, state: &S) {
        self.send(Seen::Enter(state.clone()));
    }

    fn on_exit(&self, from: &S, to: &S) {
        self.send(Seen::Exit(from.clone(), to.clone()));
    }

    fn on_error(&self, error: &ActionError) {
        self.send(Seen::Error(error.to_string()));
    }
}

/// Only the entry callbacks, in order.
pub fn entries<S>(rx: &Receiver<Seen<S>>) -> Vec<S> {
    rx.try_iter()
        .filter_map(|seen| match seen {
            Seen::Enter(state) => Some(state),
            _ => None,
        })
        .collect()
}

/// Wait for the next entry callback.
pub fn next_entry<S>(rx: &Receiver<Seen<S>>, timeout: Duration) -> Option<S> {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(std::time::Instant::now());
        match rx.recv_timeout(left).ok()? {
            Seen::Enter(state) => return Some(state),
            _ => continue,
        }
    }
}

pub const WAIT: Duration = Duration::from_secs(5);
