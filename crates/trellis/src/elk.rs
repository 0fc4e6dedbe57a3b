//! Engine-facing graph model.
//!
//! These types mirror the JSON graph format understood by ELK-style layout
//! engines. Node coordinates are relative to the parent node; edge sections
//! are relative to the node named by the edge's `container`.
//!
//! Option values are written with the engine's dotted key names. Engines are
//! free to echo options back as strings, so numeric and boolean options are
//! read leniently.

use serde::{Deserialize, Serialize};

use trellis_core::{
    diagram::Direction,
    geometry::{Insets, Point},
};

/// Engine direction names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElkDirection {
    #[default]
    Down,
    Up,
    Right,
    Left,
}

impl ElkDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Down => "DOWN",
            Self::Up => "UP",
            Self::Right => "RIGHT",
            Self::Left => "LEFT",
        }
    }

    /// Parses an engine direction, falling back to `DOWN` for anything unknown.
    pub fn parse(value: &str) -> Self {
        match value {
            "UP" => Self::Up,
            "RIGHT" => Self::Right,
            "LEFT" => Self::Left,
            _ => Self::Down,
        }
    }
}

impl From<Direction> for ElkDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Down => Self::Down,
            Direction::Up => Self::Up,
            Direction::Right => Self::Right,
            Direction::Left => Self::Left,
        }
    }
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Per-graph and per-node engine options.
///
/// Zero, `false` and empty values are omitted on the wire, except
/// `elk.direction` and `elk.spacing.nodeSelfLoop` which are always written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    #[serde(
        rename = "elk.algorithm",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub algorithm: String,

    #[serde(
        rename = "spacing.nodeNodeBetweenLayers",
        default,
        skip_serializing_if = "is_zero",
        deserialize_with = "lenient::unsigned"
    )]
    pub node_spacing: u32,

    #[serde(rename = "elk.padding", default, skip_serializing_if = "String::is_empty")]
    pub padding: String,

    #[serde(
        rename = "spacing.edgeNodeBetweenLayers",
        default,
        skip_serializing_if = "is_zero",
        deserialize_with = "lenient::unsigned"
    )]
    pub edge_node_between_layers: u32,

    #[serde(
        rename = "elk.spacing.nodeSelfLoop",
        default,
        deserialize_with = "lenient::unsigned"
    )]
    pub self_loop_spacing: u32,

    #[serde(
        rename = "elk.spacing.edgeNode",
        default,
        skip_serializing_if = "is_zero",
        deserialize_with = "lenient::unsigned"
    )]
    pub edge_node: u32,

    #[serde(
        rename = "elk.layered.nodePlacement.bk.fixedAlignment",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub fixed_alignment: String,

    #[serde(
        rename = "elk.layered.thoroughness",
        default,
        skip_serializing_if = "is_zero",
        deserialize_with = "lenient::unsigned"
    )]
    pub thoroughness: u32,

    #[serde(
        rename = "elk.layered.spacing.edgeEdgeBetweenLayers",
        default,
        skip_serializing_if = "is_zero",
        deserialize_with = "lenient::unsigned"
    )]
    pub edge_edge_between_layers: u32,

    #[serde(rename = "elk.direction", default)]
    pub direction: String,

    #[serde(
        rename = "elk.hierarchyHandling",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub hierarchy_handling: String,

    #[serde(
        rename = "elk.edgeLabels.inline",
        default,
        skip_serializing_if = "is_false",
        deserialize_with = "lenient::boolean"
    )]
    pub inline_edge_labels: bool,

    #[serde(
        rename = "elk.layered.crossingMinimization.forceNodeModelOrder",
        default,
        skip_serializing_if = "is_false",
        deserialize_with = "lenient::boolean"
    )]
    pub force_node_model_order: bool,

    #[serde(
        rename = "elk.layered.considerModelOrder.strategy",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub consider_model_order: String,

    #[serde(
        rename = "elk.nodeSize.constraints",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub node_size_constraints: String,

    #[serde(
        rename = "elk.nodeSize.minimum",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub node_size_minimum: String,
}

/// A label attached to a node or an edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutLabel {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(rename = "layoutOptions", default, skip_serializing_if = "Option::is_none")]
    pub layout_options: Option<LayoutOptions>,
}

/// A node of the engine graph. `x` and `y` are relative to the parent node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LayoutLabel>,
    #[serde(rename = "layoutOptions", default, skip_serializing_if = "Option::is_none")]
    pub layout_options: Option<LayoutOptions>,
}

impl LayoutNode {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            ..Self::default()
        }
    }

    /// Returns the node's options, or the defaults if it has none.
    pub fn options(&self) -> LayoutOptions {
        self.layout_options.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for LayoutPoint {
    fn from(point: Point) -> Self {
        Self {
            x: point.x(),
            y: point.y(),
        }
    }
}

impl From<LayoutPoint> for Point {
    fn from(point: LayoutPoint) -> Self {
        Point::new(point.x, point.y)
    }
}

/// One piece of an edge's path: start, optional bends, end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeSection {
    #[serde(rename = "startPoint")]
    pub start_point: LayoutPoint,
    #[serde(rename = "endPoint")]
    pub end_point: LayoutPoint,
    #[serde(rename = "bendPoints", default, skip_serializing_if = "Vec::is_empty")]
    pub bend_points: Vec<LayoutPoint>,
}

impl EdgeSection {
    /// All points of the section in order.
    pub fn points(&self) -> impl Iterator<Item = LayoutPoint> + '_ {
        std::iter::once(self.start_point)
            .chain(self.bend_points.iter().copied())
            .chain(std::iter::once(self.end_point))
    }
}

/// An edge of the engine graph. Sections are relative to `container`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub id: String,
    pub sources: Vec<String>,
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<EdgeSection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LayoutLabel>,
    #[serde(default)]
    pub container: String,
}

/// Child indices leading from the graph root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root_child(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

/// The root of the engine graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutGraph {
    pub id: String,
    #[serde(rename = "layoutOptions", default)]
    pub layout_options: LayoutOptions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<LayoutEdge>,
}

impl LayoutGraph {
    pub fn node_at(&self, path: &NodePath) -> Option<&LayoutNode> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = self.children.get(*first)?;
        for index in rest {
            node = node.children.get(*index)?;
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, path: &NodePath) -> Option<&mut LayoutNode> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for index in rest {
            node = node.children.get_mut(*index)?;
        }
        Some(node)
    }

    /// Searches the whole tree for a node by id.
    pub fn find_node(&self, id: &str) -> Option<&LayoutNode> {
        let mut stack: Vec<&LayoutNode> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }

    /// Total number of nodes at every depth.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&LayoutNode> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Names the first coordinate or size that is NaN or infinite.
    ///
    /// JSON has no encoding for such values; `serde_json` would silently
    /// write them as `null`.
    pub fn non_finite_value(&self) -> Option<String> {
        fn check(owner: &str, field: &str, value: f64) -> Option<String> {
            (!value.is_finite()).then(|| format!("{field} of `{owner}` is {value}"))
        }
        fn check_labels(owner: &str, labels: &[LayoutLabel]) -> Option<String> {
            labels.iter().find_map(|label| {
                check(owner, "label x", label.x)
                    .or_else(|| check(owner, "label y", label.y))
                    .or_else(|| check(owner, "label width", label.width))
                    .or_else(|| check(owner, "label height", label.height))
            })
        }

        let mut stack: Vec<&LayoutNode> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            let found = check(&node.id, "x", node.x)
                .or_else(|| check(&node.id, "y", node.y))
                .or_else(|| check(&node.id, "width", node.width))
                .or_else(|| check(&node.id, "height", node.height))
                .or_else(|| check_labels(&node.id, &node.labels));
            if found.is_some() {
                return found;
            }
            stack.extend(node.children.iter());
        }

        self.edges.iter().find_map(|edge| {
            check_labels(&edge.id, &edge.labels).or_else(|| {
                edge.sections
                    .iter()
                    .flat_map(EdgeSection::points)
                    .find_map(|point| {
                        check(&edge.id, "route x", point.x).or_else(|| check(&edge.id, "route y", point.y))
                    })
            })
        })
    }
}

/// Parses padding in `[top=T,left=L,bottom=B,right=R]` form.
///
/// Missing sides are zero. Returns `None` if the text is not a bracketed list
/// of `side=number` pairs.
///
/// # Examples
///
/// ```
/// # use trellis::elk::parse_padding;
/// let insets = parse_padding("[top=60,left=50,bottom=50,right=50]").unwrap();
/// assert_eq!(insets.top(), 60.0);
/// assert_eq!(insets.left(), 50.0);
/// assert!(parse_padding("top=60").is_none());
/// ```
pub fn parse_padding(value: &str) -> Option<Insets> {
    let inner = value.trim().strip_prefix('[')?.strip_suffix(']')?;
    let (mut top, mut right, mut bottom, mut left) = (0.0, 0.0, 0.0, 0.0);
    for pair in inner.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
        let (side, amount) = pair.split_once('=')?;
        let amount: f64 = amount.trim().parse().ok()?;
        match side.trim() {
            "top" => top = amount,
            "right" => right = amount,
            "bottom" => bottom = amount,
            "left" => left = amount,
            _ => return None,
        }
    }
    Some(Insets::new(top, right, bottom, left))
}

/// Parses a `(a, b)` vector option.
pub fn parse_vector(value: &str) -> Option<(f64, f64)> {
    let inner = value.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (a, b) = inner.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// Deserializers accepting both native JSON values and their string forms.
mod lenient {
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrText {
        Bool(bool),
        Text(String),
    }

    pub fn unsigned<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(value) => value,
            NumberOrText::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("expected a number, got `{text}`")))?,
        };
        if !value.is_finite() || value < 0.0 {
            return Err(D::Error::custom(format!("expected a non-negative number, got {value}")));
        }
        Ok(value.round() as u32)
    }

    pub fn boolean<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match BoolOrText::deserialize(deserializer)? {
            BoolOrText::Bool(value) => Ok(value),
            BoolOrText::Text(text) => match text.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(D::Error::custom(format!("expected a boolean, got `{other}`"))),
            },
        }
    }
}
