//! Integration tests for engine invocation through the public API.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use serde_json::json;

use trellis::{
    LayoutBuilder, LayoutError, TrellisError,
    adapter::adapt,
    config::{AppConfig, CommandConfig, EngineConfig, LayoutConfig},
    diagram::{Diagram, Direction},
    engine::{CancellationSignal, EngineFailure, Invoker, LayoutEngine},
    geometry::{Point, Size},
    shape::ShapeKind,
};

/// Answers with a fixed reply after an optional delay.
struct StubEngine {
    delay: Duration,
    reply: Result<serde_json::Value, EngineFailure>,
}

impl StubEngine {
    fn replying(reply: serde_json::Value) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Ok(reply),
        }
    }
}

impl LayoutEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn layout(&self, _request: &str) -> Result<serde_json::Value, EngineFailure> {
        thread::sleep(self.delay);
        self.reply.clone()
    }
}

/// Returns the request unchanged.
struct EchoEngine;

impl LayoutEngine for EchoEngine {
    fn name(&self) -> &str {
        "echo"
    }

    fn layout(&self, request: &str) -> Result<serde_json::Value, EngineFailure> {
        serde_json::from_str(request).map_err(|err| EngineFailure::new(err.to_string()))
    }
}

/// Remembers whether it was ever asked for a layout.
#[derive(Default)]
struct RecordingEngine {
    called: AtomicBool,
}

impl LayoutEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn layout(&self, request: &str) -> Result<serde_json::Value, EngineFailure> {
        self.called.store(true, Ordering::SeqCst);
        serde_json::from_str(request).map_err(|err| EngineFailure::new(err.to_string()))
    }
}

fn sample() -> Diagram {
    let mut diagram = Diagram::new(Direction::Down);
    let a = diagram
        .add_object(Diagram::ROOT, "a", ShapeKind::Rectangle, Size::new(100.0, 50.0))
        .unwrap();
    let b = diagram
        .add_object(Diagram::ROOT, "b", ShapeKind::Rectangle, Size::new(100.0, 50.0))
        .unwrap();
    diagram.add_edge(a, b).unwrap();
    diagram
}

fn invoke(engine: impl LayoutEngine + 'static, signal: &CancellationSignal) -> Result<(), LayoutError> {
    let adapted = adapt(&sample(), &LayoutConfig::default());
    Invoker::new(Arc::new(engine))
        .invoke(adapted.graph(), signal)
        .map(|_| ())
}

#[test]
fn test_echo_engine_returns_the_request_graph() {
    let adapted = adapt(&sample(), &LayoutConfig::default());
    let result = Invoker::new(Arc::new(EchoEngine))
        .invoke(adapted.graph(), &CancellationSignal::never())
        .expect("Echo should succeed");
    assert_eq!(&result, adapted.graph());
}

#[test]
fn test_non_finite_size_is_rejected_before_the_engine_runs() {
    let mut diagram = Diagram::new(Direction::Down);
    let a = diagram
        .add_object(Diagram::ROOT, "a", ShapeKind::Rectangle, Size::new(f64::NAN, 50.0))
        .unwrap();
    let b = diagram
        .add_object(Diagram::ROOT, "b", ShapeKind::Rectangle, Size::new(100.0, f64::INFINITY))
        .unwrap();
    diagram.add_edge(a, b).unwrap();

    let engine = Arc::new(RecordingEngine::default());
    let adapted = adapt(&diagram, &LayoutConfig::default());
    let result = Invoker::new(Arc::clone(&engine) as Arc<dyn LayoutEngine>)
        .invoke(adapted.graph(), &CancellationSignal::never());

    assert!(matches!(result, Err(LayoutError::Serialize(_))), "{result:?}");
    assert!(!engine.called.load(Ordering::SeqCst));

    let err = LayoutBuilder::default()
        .with_engine(Arc::clone(&engine) as Arc<dyn LayoutEngine>)
        .layout(&mut diagram)
        .unwrap_err();
    assert!(matches!(err, TrellisError::Layout(LayoutError::Serialize(_))));
    assert!(!engine.called.load(Ordering::SeqCst));
}

#[test]
fn test_cancellation_returns_promptly() {
    let slow = StubEngine {
        delay: Duration::from_secs(5),
        reply: Ok(json!({ "id": "root" })),
    };
    let (signal, trigger) = CancellationSignal::new();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        trigger.cancel();
    });

    let started = Instant::now();
    let result = invoke(slow, &signal);
    canceller.join().unwrap();

    assert!(matches!(result, Err(LayoutError::Cancelled)), "{result:?}");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn test_deadline_cancels() {
    let slow = StubEngine {
        delay: Duration::from_secs(5),
        reply: Ok(json!({ "id": "root" })),
    };
    let signal = CancellationSignal::never().with_timeout(Duration::from_millis(20));
    assert!(matches!(invoke(slow, &signal), Err(LayoutError::Cancelled)));
}

#[test]
fn test_engine_message_is_reported() {
    let result = invoke(
        StubEngine::replying(json!("org.eclipse.elk.layered is not installed")),
        &CancellationSignal::never(),
    );
    assert!(matches!(
        result,
        Err(LayoutError::EngineMessage(message)) if message.contains("not installed")
    ));
}

#[test]
fn test_engine_failure_is_reported() {
    let failing = StubEngine {
        delay: Duration::ZERO,
        reply: Err(EngineFailure::new("worker crashed")),
    };
    let err = invoke(failing, &CancellationSignal::never()).unwrap_err();
    assert!(matches!(err, LayoutError::EngineFailed(_)));
    assert_eq!(
        err.to_string(),
        "layout engine: something went wrong: worker crashed"
    );
}

#[test]
fn test_unexpected_reply_shape() {
    for reply in [json!([]), json!(42), json!(null)] {
        let result = invoke(StubEngine::replying(reply), &CancellationSignal::never());
        assert!(matches!(result, Err(LayoutError::UnexpectedResult(_))), "{result:?}");
    }
}

#[test]
fn test_failed_layout_leaves_diagram_untouched() {
    let mut diagram = sample();
    let builder = LayoutBuilder::default().with_engine(Arc::new(StubEngine::replying(json!("nope"))));

    let err = builder.layout(&mut diagram).unwrap_err();
    assert!(matches!(
        err,
        TrellisError::Layout(LayoutError::EngineMessage(_))
    ));
    for (_, object) in diagram.objects() {
        assert_eq!(object.top_left(), Point::default());
    }
    assert!(diagram.edges()[0].route().is_empty());
}

#[test]
fn test_command_backend_needs_a_command() {
    let config: AppConfig = serde_json::from_value(json!({
        "engine": { "backend": "command" }
    }))
    .unwrap();
    let err = LayoutBuilder::new(config)
        .layout(&mut sample())
        .unwrap_err();
    assert!(matches!(err, TrellisError::Config(_)));
}

#[cfg(unix)]
#[test]
fn test_command_backend_message_reply() {
    let engine = EngineConfig::default().with_command(CommandConfig::new(
        "sh",
        vec![
            "-c".to_owned(),
            "cat > /dev/null; echo '\"no such algorithm\"'".to_owned(),
        ],
    ));
    let config = AppConfig::default().with_engine(engine);
    let err = LayoutBuilder::new(config)
        .layout(&mut sample())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to layout: layout engine error: no such algorithm"
    );
}
