//! The layout engine boundary.
//!
//! A [`LayoutEngine`] receives the serialized engine graph and answers with a
//! JSON value: either the graph with coordinates filled in, or a string
//! describing why it could not lay the graph out. The [`Invoker`] runs an
//! engine on a worker thread and blocks the caller until the engine answers
//! or the caller's [`CancellationSignal`] fires.
//!
//! Two backends ship with the crate:
//!
//! - [`LayeredEngine`] - an in-process layered layout built on `rust-sugiyama`
//! - [`CommandEngine`] - an external program reading the request on stdin and
//!   writing the reply to stdout

mod command;
mod layered;

pub use command::CommandEngine;
pub use layered::LayeredEngine;

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, mpsc},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, trace};
use thiserror::Error;

use crate::{elk::LayoutGraph, error::LayoutError};

/// Failure reported by an engine backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineFailure {
    message: String,
}

impl EngineFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A layout engine backend.
///
/// Implementations receive the request as JSON text and return the engine's
/// reply as a JSON value. Returning `Err` signals that the engine itself broke
/// down; an engine that understood the request but refuses it should answer
/// with a JSON string instead.
pub trait LayoutEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Lays out the serialized graph `request`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineFailure`] if the engine could not produce any reply.
    fn layout(&self, request: &str) -> Result<serde_json::Value, EngineFailure>;
}

type SignalState = Arc<(Mutex<bool>, Condvar)>;

fn lock(state: &Mutex<bool>) -> MutexGuard<'_, bool> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Signal for cancelling a layout call.
///
/// The signal fires when its [`CancellationTrigger`] is used or, if one was
/// set, when its deadline passes. Clones share the same state.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    inner: SignalState,
    deadline: Option<Instant>,
}

/// Fires the [`CancellationSignal`] it was created with.
#[derive(Debug, Clone)]
pub struct CancellationTrigger {
    inner: SignalState,
}

impl CancellationSignal {
    /// Create a new cancellation signal pair (signal, trigger).
    pub fn new() -> (Self, CancellationTrigger) {
        let inner: SignalState = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Self {
            inner: Arc::clone(&inner),
            deadline: None,
        };
        (signal, CancellationTrigger { inner })
    }

    /// A signal that only fires if a deadline is added to it.
    pub fn never() -> Self {
        Self::new().0
    }

    /// Fires the signal once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Fires the signal `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Check if the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return true;
        }
        let (state, _) = &*self.inner;
        *lock(state)
    }

    /// Wait for either the signal or a timeout.
    ///
    /// Returns `true` if the signal fired, `false` if `duration` elapsed first.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let started = Instant::now();
        let (state, condvar) = &*self.inner;
        let mut cancelled = lock(state);
        loop {
            if *cancelled {
                return true;
            }
            let now = Instant::now();
            if self.deadline.is_some_and(|deadline| now >= deadline) {
                return true;
            }
            let elapsed = now.duration_since(started);
            if elapsed >= duration {
                return false;
            }
            let mut remaining = duration - elapsed;
            if let Some(deadline) = self.deadline {
                remaining = remaining.min(deadline.duration_since(now));
            }
            cancelled = condvar
                .wait_timeout(cancelled, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }
}

impl CancellationTrigger {
    /// Fires the signal and wakes everything waiting on it.
    pub fn cancel(&self) {
        let (state, condvar) = &*self.inner;
        *lock(state) = true;
        condvar.notify_all();
    }
}

/// Runs a [`LayoutEngine`] and waits for its reply.
#[derive(Clone)]
pub struct Invoker {
    engine: Arc<dyn LayoutEngine>,
    poll_interval: Duration,
}

impl Invoker {
    /// Default bound on a single wait for the engine's reply.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

    pub fn new(engine: Arc<dyn LayoutEngine>) -> Self {
        Self {
            engine,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set how long each wait for the reply lasts before the signal is checked again
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sends `graph` to the engine and returns the laid-out graph.
    ///
    /// The engine runs on its own worker thread. The caller blocks, waking at
    /// least once per poll interval to check `signal`. A cancelled call does
    /// not stop the worker; its reply is discarded when it arrives.
    ///
    /// # Errors
    ///
    /// - [`LayoutError::Serialize`] if the graph cannot be encoded, including
    ///   any NaN or infinite size or coordinate; the engine is not started.
    /// - [`LayoutError::Cancelled`] if `signal` fires before the reply arrives.
    /// - [`LayoutError::EngineFailed`] if the engine fails or its worker dies.
    /// - [`LayoutError::EngineMessage`] if the engine answers with a message.
    /// - [`LayoutError::UnexpectedResult`] if the reply is neither a graph nor
    ///   a message.
    /// - [`LayoutError::Deserialize`] if the reply looks like a graph but
    ///   cannot be decoded.
    pub fn invoke(
        &self,
        graph: &LayoutGraph,
        signal: &CancellationSignal,
    ) -> Result<LayoutGraph, LayoutError> {
        if let Some(value) = graph.non_finite_value() {
            return Err(LayoutError::Serialize(serde::ser::Error::custom(format!(
                "cannot encode {value}"
            ))));
        }
        let request = serde_json::to_string(graph).map_err(LayoutError::Serialize)?;
        info!(
            engine = self.engine.name(),
            request_bytes = request.len();
            "Invoking layout engine"
        );
        trace!(request; "Layout request");

        let (sender, receiver) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        thread::Builder::new()
            .name("trellis-layout".to_owned())
            .spawn(move || {
                let reply = engine.layout(&request);
                // The caller may have stopped listening after a cancellation
                let _ = sender.send(reply);
            })
            .map_err(|err| LayoutError::EngineFailed(format!("cannot start layout worker: {err}")))?;

        let reply = loop {
            if signal.is_cancelled() {
                debug!("Layout cancelled while waiting for the engine");
                return Err(LayoutError::Cancelled);
            }
            match receiver.recv_timeout(self.poll_interval) {
                Ok(reply) => break reply,
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(LayoutError::EngineFailed(
                        "layout worker exited without a reply".to_owned(),
                    ));
                }
            }
        };

        let value = reply.map_err(|failure| LayoutError::EngineFailed(failure.to_string()))?;
        settle(value)
    }
}

/// Interprets the engine's reply.
fn settle(value: serde_json::Value) -> Result<LayoutGraph, LayoutError> {
    match value {
        serde_json::Value::String(message) => Err(LayoutError::EngineMessage(message)),
        value @ serde_json::Value::Object(_) => {
            let graph: LayoutGraph =
                serde_json::from_value(value).map_err(LayoutError::Deserialize)?;
            debug!(nodes = graph.node_count(), edges = graph.edges.len(); "Layout engine replied");
            Ok(graph)
        }
        other => Err(LayoutError::UnexpectedResult(format!(
            "expected a graph or a message, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_trigger_fires_every_clone() {
        let (signal, trigger) = CancellationSignal::new();
        let clone = signal.clone();
        assert!(!signal.is_cancelled());

        trigger.cancel();
        assert!(signal.is_cancelled());
        assert!(clone.is_cancelled());
        assert!(clone.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_wait_timeout_expires() {
        let signal = CancellationSignal::never();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_deadline_fires() {
        let signal = CancellationSignal::never().with_deadline(Instant::now());
        assert!(signal.is_cancelled());

        let signal = CancellationSignal::never().with_timeout(Duration::from_millis(20));
        assert!(signal.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_wakes_waiter_from_another_thread() {
        let (signal, trigger) = CancellationSignal::new();
        let waiter = thread::spawn(move || signal.wait_timeout(Duration::from_secs(30)));
        thread::sleep(Duration::from_millis(10));
        trigger.cancel();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_settle_classifies_replies() {
        assert!(matches!(
            settle(json!("no layered algorithm")),
            Err(LayoutError::EngineMessage(message)) if message == "no layered algorithm"
        ));
        assert!(matches!(
            settle(json!([1, 2])),
            Err(LayoutError::UnexpectedResult(message)) if message.contains("an array")
        ));
        assert!(matches!(
            settle(json!({ "children": "nope" })),
            Err(LayoutError::Deserialize(_))
        ));

        let graph = settle(json!({
            "id": "root",
            "layoutOptions": {},
            "children": [{ "id": "a", "x": 12.0, "y": 12.0, "width": 100.0, "height": 50.0 }]
        }))
        .unwrap();
        assert_eq!(graph.children[0].x, 12.0);
    }
}
