//! Builds the engine graph from a diagram.
//!
//! The adapter walks the diagram once, pre-order, and mirrors every object as
//! a [`LayoutNode`] under its parent's node. Node sizes are grown here to
//! reserve room for ports, labels and icons; the diagram itself is left
//! untouched until [`reconcile`](crate::reconcile) writes the engine's answer
//! back.

use std::collections::HashMap;

use log::{debug, trace};

use trellis_core::{
    diagram::{Diagram, ObjectIndex},
    geometry::{Bounds, Point, Size},
    identifier::Id,
    label::{LABEL_PADDING, LabelPosition, icon_size},
    shape::{Shape, ShapeKind},
};

use crate::{
    config::LayoutConfig,
    elk::{ElkDirection, LayoutEdge, LayoutGraph, LayoutLabel, LayoutNode, LayoutOptions, NodePath},
};

/// Space reserved per connection on a node with several incident edges.
pub const PORT_SPACING: f64 = 40.0;

/// Clearance between edges and nodes, also used by route simplification.
pub const EDGE_NODE_SPACING: u32 = 40;

/// Smallest side a node with reserved ports is widened to.
const MIN_PORT_SIDE: f64 = 40.0;

const THOROUGHNESS: u32 = 8;
const EDGE_EDGE_BETWEEN_LAYERS: u32 = 50;
const HIERARCHY_HANDLING: &str = "INCLUDE_CHILDREN";
const FIXED_ALIGNMENT: &str = "BALANCED";
const MODEL_ORDER_STRATEGY: &str = "NODES_AND_EDGES";
const MINIMUM_SIZE: &str = "MINIMUM_SIZE";

/// Smallest top padding of a container under the default padding.
const MIN_CONTAINER_TOP_PADDING: f64 = 50.0;

/// The engine graph together with the tables joining it to the diagram.
///
/// Both tables are keyed by the diagram's identifiers and only live for one
/// layout call.
#[derive(Debug, Clone)]
pub struct AdaptedGraph {
    graph: LayoutGraph,
    nodes: HashMap<Id, NodePath>,
    edges: HashMap<Id, usize>,
}

impl AdaptedGraph {
    pub fn graph(&self) -> &LayoutGraph {
        &self.graph
    }

    /// Path to the node mirroring the object `id`.
    pub fn node_path(&self, id: Id) -> Option<&NodePath> {
        self.nodes.get(&id)
    }

    /// Position of the edge `id` in the graph's edge list.
    pub fn edge_index(&self, id: Id) -> Option<usize> {
        self.edges.get(&id).copied()
    }

    /// The node built for the object `id`.
    pub fn node(&self, id: Id) -> Option<&LayoutNode> {
        self.graph.node_at(self.nodes.get(&id)?)
    }
}

/// Number of edges entering and leaving each object.
#[derive(Debug, Default, Clone, Copy)]
struct Degree {
    incoming: usize,
    outgoing: usize,
}

fn degrees(diagram: &Diagram) -> HashMap<ObjectIndex, Degree> {
    let mut degrees: HashMap<ObjectIndex, Degree> = HashMap::new();
    for edge in diagram.edges() {
        degrees.entry(edge.src()).or_default().outgoing += 1;
        degrees.entry(edge.dst()).or_default().incoming += 1;
    }
    degrees
}

/// Builds the engine graph for `diagram`.
///
/// # Examples
///
/// ```
/// # use trellis::{adapter::adapt, config::LayoutConfig};
/// # use trellis_core::{diagram::{Diagram, Direction}, geometry::Size, shape::ShapeKind};
/// let mut diagram = Diagram::new(Direction::Down);
/// let a = diagram.add_object(Diagram::ROOT, "a", ShapeKind::Rectangle, Size::new(100.0, 50.0)).unwrap();
/// let b = diagram.add_object(Diagram::ROOT, "b", ShapeKind::Rectangle, Size::new(100.0, 50.0)).unwrap();
/// diagram.add_edge(a, b).unwrap();
///
/// let adapted = adapt(&diagram, &LayoutConfig::default());
/// assert_eq!(adapted.graph().children.len(), 2);
/// assert_eq!(adapted.graph().edges[0].sources, vec!["a".to_owned()]);
/// ```
pub fn adapt(diagram: &Diagram, config: &LayoutConfig) -> AdaptedGraph {
    let direction = diagram.direction();
    let mut graph = LayoutGraph {
        id: Diagram::ROOT_ID.to_owned(),
        layout_options: LayoutOptions {
            thoroughness: THOROUGHNESS,
            edge_edge_between_layers: EDGE_EDGE_BETWEEN_LAYERS,
            edge_node: EDGE_NODE_SPACING,
            hierarchy_handling: HIERARCHY_HANDLING.to_owned(),
            fixed_alignment: FIXED_ALIGNMENT.to_owned(),
            consider_model_order: MODEL_ORDER_STRATEGY.to_owned(),
            algorithm: config.algorithm().to_owned(),
            node_spacing: config.node_spacing(),
            edge_node_between_layers: config.edge_node_spacing(),
            self_loop_spacing: config.self_loop_spacing(),
            direction: ElkDirection::from(direction).as_str().to_owned(),
            ..LayoutOptions::default()
        },
        children: Vec::new(),
        edges: Vec::new(),
    };

    let degrees = degrees(diagram);
    let mut nodes: HashMap<Id, NodePath> = HashMap::new();

    diagram.walk(|index, parent| {
        let object = diagram.object(index);
        let degree = degrees.get(&index).copied().unwrap_or_default();
        let node = build_node(diagram, index, degree, config);
        trace!(
            id = node.id,
            width = node.width,
            height = node.height;
            "Built layout node"
        );

        let path = match parent.and_then(|parent| nodes.get(&diagram.object(parent).id())) {
            Some(parent_path) => {
                let parent_path = parent_path.clone();
                match graph.node_at_mut(&parent_path) {
                    Some(parent_node) => {
                        parent_node.children.push(node);
                        parent_path.child(parent_node.children.len() - 1)
                    }
                    None => return,
                }
            }
            None => {
                graph.children.push(node);
                NodePath::root_child(graph.children.len() - 1)
            }
        };
        nodes.insert(object.id(), path);
    });

    let mut edges: HashMap<Id, usize> = HashMap::new();
    for edge in diagram.edges() {
        let mut layout_edge = LayoutEdge {
            id: edge.id().to_string(),
            sources: vec![diagram.object(edge.src()).id().to_string()],
            targets: vec![diagram.object(edge.dst()).id().to_string()],
            ..LayoutEdge::default()
        };
        if let Some(label) = edge.visible_label() {
            layout_edge.labels.push(LayoutLabel {
                text: label.text().to_owned(),
                width: label.width(),
                height: label.height(),
                layout_options: Some(LayoutOptions {
                    inline_edge_labels: true,
                    ..LayoutOptions::default()
                }),
                ..LayoutLabel::default()
            });
        }
        edges.insert(edge.id(), graph.edges.len());
        graph.edges.push(layout_edge);
    }

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        direction = direction.to_string();
        "Adapted diagram to layout graph"
    );

    AdaptedGraph {
        graph,
        nodes,
        edges,
    }
}

fn build_node(
    diagram: &Diagram,
    index: ObjectIndex,
    degree: Degree,
    config: &LayoutConfig,
) -> LayoutNode {
    let object = diagram.object(index);
    let mut width = object.width();
    let mut height = object.height();

    let max_degree = degree.incoming.max(degree.outgoing);
    if max_degree >= 2 {
        let reserved = (max_degree as f64 * PORT_SPACING).max(MIN_PORT_SIDE);
        if diagram.direction().is_horizontal() {
            height = height.max(reserved);
        } else {
            width = width.max(reserved);
        }
    }

    if let Some(label) = object.label() {
        if object.has_outside_bottom_label() || object.icon().is_some() {
            height += label.height() + LABEL_PADDING;
        }
        width = width.max(label.width());
    }

    let mut node = LayoutNode::new(object.id().to_string(), width, height);

    node.layout_options = Some(if diagram.is_container(index) {
        container_options(diagram, index, Size::new(width, height), config)
    } else {
        LayoutOptions::default()
    });

    if let Some(label) = object.label() {
        node.labels.push(LayoutLabel {
            text: label.text().to_owned(),
            width: label.width(),
            height: label.height(),
            ..LayoutLabel::default()
        });
    }

    node
}

fn container_options(
    diagram: &Diagram,
    index: ObjectIndex,
    size: Size,
    config: &LayoutConfig,
) -> LayoutOptions {
    let object = diagram.object(index);
    let mut options = LayoutOptions {
        force_node_model_order: true,
        thoroughness: THOROUGHNESS,
        edge_edge_between_layers: EDGE_EDGE_BETWEEN_LAYERS,
        hierarchy_handling: HIERARCHY_HANDLING.to_owned(),
        fixed_alignment: FIXED_ALIGNMENT.to_owned(),
        edge_node: EDGE_NODE_SPACING,
        consider_model_order: MODEL_ORDER_STRATEGY.to_owned(),
        // The engine reads this vector as (height, width).
        node_size_minimum: format!(
            "({}, {})",
            size.height().ceil() as i64,
            size.width().ceil() as i64
        ),
        node_spacing: config.node_spacing(),
        edge_node_between_layers: config.edge_node_spacing(),
        self_loop_spacing: config.self_loop_spacing(),
        padding: config.padding().to_owned(),
        ..LayoutOptions::default()
    };

    if object.has_fixed_size() {
        options.node_size_constraints = MINIMUM_SIZE.to_owned();
    }

    if config.has_default_padding() {
        let mut padding_top = MIN_CONTAINER_TOP_PADDING;
        if let Some(label) = object.label() {
            padding_top = padding_top.max(label.height() + LABEL_PADDING);
        }
        if object.icon().is_some() && object.shape_kind() != ShapeKind::Image {
            let content = Bounds::new_from_top_left(Point::default(), size);
            let inner = Shape::new(object.shape_kind(), content).inner_box();
            let icon = icon_size(inner, LabelPosition::InsideTopLeft);
            padding_top = padding_top.max(icon + LABEL_PADDING * 2.0);
        }
        options.padding = format!(
            "[top={},left=50,bottom=50,right=50]",
            padding_top.ceil() as i64
        );
    }

    options
}
