//! Configuration types for Trellis layouts.
//!
//! All types implement [`serde::Deserialize`] with defaults for every field,
//! so a configuration file only needs to name the values it changes.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`LayoutConfig`] - Options forwarded to the layout engine.
//! - [`EngineConfig`] - Which engine backend runs the layout and how it is awaited.
//! - [`SimplifyConfig`] - Route simplification settings.
//!
//! # Example
//!
//! ```
//! # use trellis::config::AppConfig;
//! // Use default configuration
//! let config = AppConfig::default();
//! assert_eq!(config.layout().node_spacing(), 70);
//! assert!(config.simplify().enabled());
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Padding the engine applies inside containers unless configured otherwise.
pub const DEFAULT_PADDING: &str = "[top=50,left=50,bottom=50,right=50]";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    layout: LayoutConfig,

    #[serde(default)]
    engine: EngineConfig,

    #[serde(default)]
    simplify: SimplifyConfig,
}

impl AppConfig {
    pub fn new(layout: LayoutConfig, engine: EngineConfig, simplify: SimplifyConfig) -> Self {
        Self {
            layout,
            engine,
            simplify,
        }
    }

    /// Returns the layout configuration.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Returns the engine configuration.
    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Returns the route simplification configuration.
    pub fn simplify(&self) -> &SimplifyConfig {
        &self.simplify
    }

    /// Replaces the route simplification configuration.
    pub fn with_simplify(mut self, simplify: SimplifyConfig) -> Self {
        self.simplify = simplify;
        self
    }

    /// Replaces the engine configuration.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

/// Options forwarded to the layout engine.
///
/// Spacing values are whole units; the engine protocol carries them as
/// integers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Engine algorithm name.
    algorithm: String,

    /// Space between consecutive layers.
    node_spacing: u32,

    /// Container padding in `[top=T,left=L,bottom=B,right=R]` form.
    padding: String,

    /// Space between edges and nodes of adjacent layers.
    edge_node_spacing: u32,

    /// Size of the loop drawn for an edge from a node to itself.
    self_loop_spacing: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            algorithm: "layered".to_owned(),
            node_spacing: 70,
            padding: DEFAULT_PADDING.to_owned(),
            edge_node_spacing: 40,
            self_loop_spacing: 50,
        }
    }
}

impl LayoutConfig {
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn node_spacing(&self) -> u32 {
        self.node_spacing
    }

    pub fn padding(&self) -> &str {
        &self.padding
    }

    /// Returns true if the padding is the engine default.
    ///
    /// Only the default padding is enlarged to make room for container labels
    /// and icons; explicitly configured padding is passed through unchanged.
    pub fn has_default_padding(&self) -> bool {
        self.padding == DEFAULT_PADDING
    }

    pub fn edge_node_spacing(&self) -> u32 {
        self.edge_node_spacing
    }

    pub fn self_loop_spacing(&self) -> u32 {
        self.self_loop_spacing
    }

    pub fn with_padding(mut self, padding: impl Into<String>) -> Self {
        self.padding = padding.into();
        self
    }

    pub fn with_node_spacing(mut self, spacing: u32) -> Self {
        self.node_spacing = spacing;
        self
    }
}

/// Available engine backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineBackend {
    /// The built-in layered engine.
    #[default]
    Layered,
    /// An external program speaking the engine protocol on stdin/stdout.
    Command,
}

/// External engine program.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandConfig {
    program: String,

    #[serde(default)]
    args: Vec<String>,
}

impl CommandConfig {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Engine selection and invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    backend: EngineBackend,

    /// Required when `backend` is `command`.
    command: Option<CommandConfig>,

    /// How long the invoker waits for a reply before checking for cancellation.
    poll_interval_ms: u64,

    /// Cancel the layout if the engine has not answered within this time.
    timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: EngineBackend::Layered,
            command: None,
            poll_interval_ms: 5,
            timeout_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn backend(&self) -> EngineBackend {
        self.backend
    }

    pub fn command(&self) -> Option<&CommandConfig> {
        self.command.as_ref()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Selects the command backend running `command`.
    pub fn with_command(mut self, command: CommandConfig) -> Self {
        self.backend = EngineBackend::Command;
        self.command = Some(command);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_ms = timeout.map(|timeout| timeout.as_millis() as u64);
        self
    }
}

/// How the ladder pass scores the two segments of a candidate corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderMetric {
    /// Score both candidate segments against other edges.
    #[default]
    BothSegments,
    /// Score the first candidate segment twice against other edges, as older
    /// layouts did. Object collisions still use both segments.
    FirstSegmentTwice,
}

/// Route simplification settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimplifyConfig {
    enabled: bool,
    ladder_metric: LadderMetric,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ladder_metric: LadderMetric::default(),
        }
    }
}

impl SimplifyConfig {
    pub fn new(enabled: bool, ladder_metric: LadderMetric) -> Self {
        Self {
            enabled,
            ladder_metric,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn ladder_metric(&self) -> LadderMetric {
        self.ladder_metric
    }
}
