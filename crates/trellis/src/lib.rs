//! Trellis - hierarchical graph layout for nested diagrams.
//!
//! Trellis positions the boxes of a nested diagram and routes the edges
//! between them by handing the diagram to a layered layout engine. The
//! pipeline has four stages:
//!
//! 1. [`adapter`] mirrors the diagram as an engine graph, growing node sizes
//!    to reserve room for ports, labels and icons.
//! 2. [`engine`] runs a [`LayoutEngine`](engine::LayoutEngine) backend on a
//!    worker thread and waits for its answer.
//! 3. [`reconcile`] writes absolute positions, sizes, label anchors and routes
//!    back onto the diagram.
//! 4. [`simplify`] removes needless S-bends and ladders from the routes.
//!
//! [`LayoutBuilder`] strings the stages together.

pub mod adapter;
pub mod config;
pub mod document;
pub mod elk;
pub mod engine;
pub mod reconcile;
pub mod simplify;

mod error;

pub use trellis_core::{diagram, geometry, identifier, label, shape};

pub use error::{LayoutError, TrellisError};

use std::sync::Arc;

use log::{debug, info, trace};

use config::{AppConfig, EngineBackend};
use diagram::Diagram;
use document::LaidOutDocument;
use engine::{CancellationSignal, CommandEngine, Invoker, LayeredEngine, LayoutEngine};

/// Builder for laying out diagrams.
///
/// # Examples
///
/// ```
/// use trellis::{LayoutBuilder, config::AppConfig, document::parse_document};
///
/// let mut diagram = parse_document(r#"{
///     "objects": [
///         { "name": "a", "width": 100, "height": 50 },
///         { "name": "b", "width": 100, "height": 50 }
///     ],
///     "edges": [{ "source": "a", "target": "b" }]
/// }"#).unwrap();
///
/// let builder = LayoutBuilder::new(AppConfig::default());
/// builder.layout(&mut diagram).expect("Failed to layout");
///
/// assert!(diagram.edges()[0].route().len() >= 2);
/// ```
#[derive(Default)]
pub struct LayoutBuilder {
    config: AppConfig,
    engine: Option<Arc<dyn LayoutEngine>>,
}

impl LayoutBuilder {
    /// Create a new layout builder with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            engine: None,
        }
    }

    /// Use `engine` instead of the backend named in the configuration.
    pub fn with_engine(mut self, engine: Arc<dyn LayoutEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Lay out `diagram` in place.
    ///
    /// The call blocks until the engine answers or the configured timeout
    /// passes.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Config`] if the configured backend cannot be
    /// built and [`TrellisError::Layout`] if the layout itself fails. The
    /// diagram is unchanged on error.
    pub fn layout(&self, diagram: &mut Diagram) -> Result<(), TrellisError> {
        let signal = match self.config.engine().timeout() {
            Some(timeout) => CancellationSignal::never().with_timeout(timeout),
            None => CancellationSignal::never(),
        };
        self.layout_with_signal(diagram, &signal)
    }

    /// Lay out `diagram` in place, giving up when `signal` fires.
    ///
    /// # Errors
    ///
    /// As for [`layout`](Self::layout); a fired signal is reported as
    /// [`LayoutError::Cancelled`].
    pub fn layout_with_signal(
        &self,
        diagram: &mut Diagram,
        signal: &CancellationSignal,
    ) -> Result<(), TrellisError> {
        let engine = self.engine()?;
        info!(
            objects = diagram.object_count(),
            edges = diagram.edges().len(),
            engine = engine.name();
            "Laying out diagram"
        );

        let adapted = adapter::adapt(diagram, self.config.layout());
        trace!(graph:? = adapted.graph(); "Adapted layout graph");

        let invoker = Invoker::new(engine).with_poll_interval(self.config.engine().poll_interval());
        let result = invoker.invoke(adapted.graph(), signal)?;

        reconcile::reconcile(diagram, &adapted, &result)?;
        debug!("Layout result applied");

        let simplify_config = self.config.simplify();
        if simplify_config.enabled() {
            simplify::simplify_routes(diagram, simplify_config.ladder_metric());
        }

        info!("Layout complete");
        Ok(())
    }

    /// Parse a JSON document, lay it out and return the result.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Document`] or [`TrellisError::Diagram`] for a
    /// bad document, otherwise as for [`layout`](Self::layout).
    pub fn layout_document(&self, source: &str) -> Result<LaidOutDocument, TrellisError> {
        let mut diagram = document::parse_document(source)?;
        self.layout(&mut diagram)?;
        Ok(LaidOutDocument::from_diagram(&diagram))
    }

    fn engine(&self) -> Result<Arc<dyn LayoutEngine>, TrellisError> {
        if let Some(engine) = &self.engine {
            return Ok(Arc::clone(engine));
        }
        let engine_config = self.config.engine();
        match engine_config.backend() {
            EngineBackend::Layered => Ok(Arc::new(LayeredEngine::new())),
            EngineBackend::Command => {
                let command = engine_config.command().ok_or_else(|| {
                    TrellisError::Config(
                        "engine backend `command` requires an [engine.command] table".to_owned(),
                    )
                })?;
                Ok(Arc::new(CommandEngine::from(command)))
            }
        }
    }
}
