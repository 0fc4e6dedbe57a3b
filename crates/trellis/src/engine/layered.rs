//! Built-in layered layout engine.
//!
//! Lays out the engine graph container by container, innermost first. Inside
//! each container the children are ranked into layers with `rust-sugiyama`;
//! edges crossing container borders are lifted to the children of the
//! container that holds both ends. Containers are then sized around their
//! children. Edges get orthogonal routes relative to the lowest container
//! holding both of their ends.
//!
//! Layout happens in a flow frame: `flow` grows along the layout direction
//! and `cross` runs across it, so one code path serves all four directions.

use std::{
    collections::{HashMap, HashSet},
    panic,
};

use indexmap::IndexSet;
use log::{debug, trace};
use rust_sugiyama::configure::Config;

use trellis_core::geometry::{Bounds, Insets, Point, Size};

use super::{EngineFailure, LayoutEngine};
use crate::elk::{
    EdgeSection, ElkDirection, LayoutGraph, LayoutNode, LayoutOptions, LayoutPoint, NodePath,
    parse_padding, parse_vector,
};

const DEFAULT_NODE_SPACING: f64 = 70.0;
const DEFAULT_EDGE_NODE_SPACING: f64 = 40.0;
const DEFAULT_SELF_LOOP_SPACING: f64 = 50.0;
const DEFAULT_PADDING: f64 = 12.0;
const MINIMUM_SIZE: &str = "MINIMUM_SIZE";

/// Spacing handed to rust-sugiyama; only the resulting order is used.
const VERTEX_SPACING: f64 = 10.0;

/// Layer coordinates closer than this belong to the same layer.
const LAYER_TOLERANCE: f64 = 1e-6;

/// The built-in layered engine.
///
/// Understands the options written by [`adapt`](crate::adapter::adapt):
/// direction, layer spacing, edge-node spacing, padding, self-loop spacing
/// and the minimum-size constraint. Other options are accepted and ignored.
///
/// Requests naming unknown or duplicate nodes are refused with a message
/// reply, the way external engines report invalid graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredEngine;

impl LayeredEngine {
    pub fn new() -> Self {
        Self
    }
}

impl LayoutEngine for LayeredEngine {
    fn name(&self) -> &str {
        "layered"
    }

    fn layout(&self, request: &str) -> Result<serde_json::Value, EngineFailure> {
        let mut graph: LayoutGraph = serde_json::from_str(request)
            .map_err(|err| EngineFailure::new(format!("invalid layout request: {err}")))?;

        let mut scene = match Scene::build(&graph) {
            Ok(scene) => scene,
            Err(Refusal(message)) => {
                debug!(message; "Layered engine refused the graph");
                return Ok(serde_json::Value::String(message));
            }
        };
        scene.place()?;
        scene.route();
        scene.write_back(&mut graph);

        debug!(
            nodes = scene.nodes.len() - 1,
            edges = scene.edges.len();
            "Layered layout complete"
        );

        serde_json::to_value(&graph)
            .map_err(|err| EngineFailure::new(format!("cannot encode layout result: {err}")))
    }
}

/// A graph the engine will not lay out.
struct Refusal(String);

/// Maps between the real frame and the flow frame.
#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Flow runs along x
    horizontal: bool,
    /// Flow runs towards negative coordinates
    reversed: bool,
}

impl Frame {
    fn new(direction: ElkDirection) -> Self {
        match direction {
            ElkDirection::Down => Self {
                horizontal: false,
                reversed: false,
            },
            ElkDirection::Up => Self {
                horizontal: false,
                reversed: true,
            },
            ElkDirection::Right => Self {
                horizontal: true,
                reversed: false,
            },
            ElkDirection::Left => Self {
                horizontal: true,
                reversed: true,
            },
        }
    }

    /// Extent along the flow.
    fn main(self, size: Size) -> f64 {
        if self.horizontal {
            size.width()
        } else {
            size.height()
        }
    }

    /// Extent across the flow.
    fn cross(self, size: Size) -> f64 {
        if self.horizontal {
            size.height()
        } else {
            size.width()
        }
    }

    fn size(self, main: f64, cross: f64) -> Size {
        if self.horizontal {
            Size::new(main, cross)
        } else {
            Size::new(cross, main)
        }
    }

    fn flow(self, point: Point) -> f64 {
        let main = if self.horizontal { point.x() } else { point.y() };
        if self.reversed { -main } else { main }
    }

    fn across(self, point: Point) -> f64 {
        if self.horizontal { point.y() } else { point.x() }
    }

    fn point(self, flow: f64, across: f64) -> Point {
        let main = if self.reversed { -flow } else { flow };
        if self.horizontal {
            Point::new(main, across)
        } else {
            Point::new(across, main)
        }
    }
}

/// A box expressed in the flow frame.
#[derive(Debug, Clone, Copy)]
struct FlowBox {
    f0: f64,
    f1: f64,
    c0: f64,
    c1: f64,
}

impl FlowBox {
    fn new(frame: Frame, bounds: Bounds) -> Self {
        let a = bounds.min_point();
        let b = Point::new(bounds.max_x(), bounds.max_y());
        let (fa, fb) = (frame.flow(a), frame.flow(b));
        let (ca, cb) = (frame.across(a), frame.across(b));
        Self {
            f0: fa.min(fb),
            f1: fa.max(fb),
            c0: ca.min(cb),
            c1: ca.max(cb),
        }
    }

    fn flow_center(self) -> f64 {
        (self.f0 + self.f1) / 2.0
    }

    fn cross_center(self) -> f64 {
        (self.c0 + self.c1) / 2.0
    }
}

/// Side of a node in the flow frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Side {
    FlowStart,
    FlowEnd,
    CrossStart,
    CrossEnd,
}

impl Side {
    fn is_flow_side(self) -> bool {
        matches!(self, Self::FlowStart | Self::FlowEnd)
    }
}

#[derive(Debug, Clone)]
struct SceneNode {
    id: String,
    /// `None` for the graph root
    path: Option<NodePath>,
    parent: Option<usize>,
    children: Vec<usize>,
    size: Size,
    options: LayoutOptions,
    label_width: f64,
    /// Relative to the parent's top-left corner
    position: Point,
    absolute: Point,
}

#[derive(Debug, Clone)]
struct SceneEdge {
    /// Position in the graph's edge list
    index: usize,
    source: usize,
    target: usize,
    container: usize,
    route: Vec<Point>,
}

#[derive(Debug, Clone, Copy)]
enum Relation {
    SelfLoop,
    /// The source contains the target
    Inward,
    /// The target contains the source
    Outward,
    Forward,
    Backward,
    Sideways { towards_cross_end: bool },
}

struct Scene {
    frame: Frame,
    nodes: Vec<SceneNode>,
    edges: Vec<SceneEdge>,
    root_options: LayoutOptions,
}

impl Scene {
    const ROOT: usize = 0;

    fn build(graph: &LayoutGraph) -> Result<Self, Refusal> {
        let mut scene = Self {
            frame: Frame::new(ElkDirection::parse(&graph.layout_options.direction)),
            nodes: vec![SceneNode {
                id: graph.id.clone(),
                path: None,
                parent: None,
                children: Vec::new(),
                size: Size::default(),
                options: graph.layout_options.clone(),
                label_width: 0.0,
                position: Point::default(),
                absolute: Point::default(),
            }],
            edges: Vec::new(),
            root_options: graph.layout_options.clone(),
        };

        let mut by_id: HashMap<&str, usize> = HashMap::new();
        let mut stack: Vec<(&LayoutNode, usize, NodePath)> = graph
            .children
            .iter()
            .enumerate()
            .rev()
            .map(|(i, node)| (node, Self::ROOT, NodePath::root_child(i)))
            .collect();
        while let Some((node, parent, path)) = stack.pop() {
            let index = scene.nodes.len();
            if by_id.insert(node.id.as_str(), index).is_some() {
                return Err(Refusal(format!("duplicate node id `{}`", node.id)));
            }
            for (i, child) in node.children.iter().enumerate().rev() {
                stack.push((child, index, path.child(i)));
            }
            scene.nodes[parent].children.push(index);
            scene.nodes.push(SceneNode {
                id: node.id.clone(),
                path: Some(path),
                parent: Some(parent),
                children: Vec::new(),
                size: Size::new(node.width, node.height),
                options: node.options(),
                label_width: node.labels.iter().map(|label| label.width).fold(0.0, f64::max),
                position: Point::default(),
                absolute: Point::default(),
            });
        }

        for (index, edge) in graph.edges.iter().enumerate() {
            let endpoint = |ids: &[String], role: &str| -> Result<usize, Refusal> {
                let id = ids
                    .first()
                    .ok_or_else(|| Refusal(format!("edge `{}` has no {role}", edge.id)))?;
                by_id.get(id.as_str()).copied().ok_or_else(|| {
                    Refusal(format!("edge `{}` references unknown node `{id}`", edge.id))
                })
            };
            let source = endpoint(&edge.sources, "source")?;
            let target = endpoint(&edge.targets, "target")?;
            let container = scene.common_container(source, target);
            scene.edges.push(SceneEdge {
                index,
                source,
                target,
                container,
                route: Vec::new(),
            });
        }

        Ok(scene)
    }

    /// `node` and its ancestors, innermost first, ending at the root.
    fn chain(&self, node: usize) -> Vec<usize> {
        let mut chain = vec![node];
        let mut current = self.nodes[node].parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes[parent].parent;
        }
        chain
    }

    fn is_ancestor(&self, ancestor: usize, node: usize) -> bool {
        self.chain(node).into_iter().skip(1).any(|n| n == ancestor)
    }

    /// The deepest node that strictly contains both `a` and `b`.
    fn common_container(&self, a: usize, b: usize) -> usize {
        let b_ancestors: HashSet<usize> = self.chain(b).into_iter().skip(1).collect();
        self.chain(a)
            .into_iter()
            .skip(1)
            .find(|n| b_ancestors.contains(n))
            .unwrap_or(Self::ROOT)
    }

    /// The child of `container` holding `node`, if `container` strictly contains it.
    fn child_towards(&self, container: usize, node: usize) -> Option<usize> {
        self.chain(node)
            .into_iter()
            .find(|n| self.nodes[*n].parent == Some(container))
    }

    fn layer_spacing(&self, options: &LayoutOptions) -> f64 {
        [options.node_spacing, self.root_options.node_spacing]
            .into_iter()
            .find(|spacing| *spacing > 0)
            .map_or(DEFAULT_NODE_SPACING, f64::from)
    }

    fn node_spacing(&self, options: &LayoutOptions) -> f64 {
        [options.edge_node, self.root_options.edge_node]
            .into_iter()
            .find(|spacing| *spacing > 0)
            .map_or(DEFAULT_EDGE_NODE_SPACING, f64::from)
    }

    fn self_loop_spacing(&self) -> f64 {
        match self.root_options.self_loop_spacing {
            0 => DEFAULT_SELF_LOOP_SPACING,
            spacing => f64::from(spacing),
        }
    }

    /// Sizes and positions every node, innermost containers first.
    fn place(&mut self) -> Result<(), EngineFailure> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node].children.iter().copied());
        }

        for &node in order.iter().rev() {
            if !self.nodes[node].children.is_empty() || node == Self::ROOT {
                self.place_children(node)?;
            }
        }

        for &node in &order {
            if let Some(parent) = self.nodes[node].parent {
                self.nodes[node].absolute =
                    self.nodes[parent].absolute.add_point(self.nodes[node].position);
            }
        }
        Ok(())
    }

    fn place_children(&mut self, container: usize) -> Result<(), EngineFailure> {
        let members = self.nodes[container].children.clone();
        let local: HashMap<usize, u32> = members
            .iter()
            .enumerate()
            .map(|(i, node)| (*node, i as u32))
            .collect();

        let mut placement: IndexSet<(u32, u32)> = IndexSet::new();
        for edge in &self.edges {
            if edge.container != container || edge.source == edge.target {
                continue;
            }
            let lifted = self
                .child_towards(container, edge.source)
                .zip(self.child_towards(container, edge.target))
                .filter(|(a, b)| a != b)
                .and_then(|(a, b)| local.get(&a).copied().zip(local.get(&b).copied()));
            if let Some(pair) = lifted {
                placement.insert(pair);
            }
        }

        let components = rank(members.len(), &placement)?;
        trace!(
            container = self.nodes[container].id,
            components = components.len(),
            placement_edges = placement.len();
            "Ranked container"
        );

        let frame = self.frame;
        let options = self.nodes[container].options.clone();
        let layer_gap = self.layer_spacing(&options);
        let node_gap = self.node_spacing(&options);
        let padding = parse_padding(&options.padding).unwrap_or(Insets::uniform(DEFAULT_PADDING));

        let mut placed: Vec<(usize, f64, f64)> = Vec::with_capacity(members.len());
        let mut cross_cursor = 0.0;
        let mut content_main: f64 = 0.0;
        for layers in &components {
            let extents: Vec<(f64, f64)> = layers
                .iter()
                .map(|layer| {
                    let thickness = layer
                        .iter()
                        .map(|&id| frame.main(self.nodes[members[id as usize]].size))
                        .fold(0.0, f64::max);
                    let width: f64 = layer
                        .iter()
                        .map(|&id| frame.cross(self.nodes[members[id as usize]].size))
                        .sum::<f64>()
                        + node_gap * (layer.len().saturating_sub(1)) as f64;
                    (thickness, width)
                })
                .collect();
            let component_cross = extents.iter().map(|(_, width)| *width).fold(0.0, f64::max);

            let mut flow_cursor = 0.0;
            for (layer, (thickness, width)) in layers.iter().zip(&extents) {
                let mut cross = cross_cursor + (component_cross - width) / 2.0;
                for &id in layer {
                    let node = members[id as usize];
                    let size = self.nodes[node].size;
                    let flow = flow_cursor + (thickness - frame.main(size)) / 2.0;
                    placed.push((node, flow, cross));
                    cross += frame.cross(size) + node_gap;
                }
                flow_cursor += thickness + layer_gap;
            }
            content_main = content_main.max(flow_cursor - layer_gap);
            cross_cursor += component_cross + node_gap;
        }
        let content_cross = (cross_cursor - node_gap).max(0.0);

        for (node, flow, cross) in placed {
            let size = self.nodes[node].size;
            let main = if frame.reversed {
                content_main - flow - frame.main(size)
            } else {
                flow
            };
            let (x, y) = if frame.horizontal {
                (main, cross)
            } else {
                (cross, main)
            };
            self.nodes[node].position = Point::new(padding.left() + x, padding.top() + y);
        }

        let mut size = frame
            .size(content_main, content_cross)
            .add_padding(padding);
        if container != Self::ROOT {
            let node = &self.nodes[container];
            let minimum = node
                .options
                .node_size_constraints
                .contains(MINIMUM_SIZE)
                .then(|| parse_vector(&node.options.node_size_minimum))
                .flatten();
            if let Some((min_height, min_width)) = minimum {
                size = size.max(Size::new(min_width, min_height));
            }
            size = size.max(Size::new(node.label_width, 0.0));
        }
        self.nodes[container].size = size;
        Ok(())
    }

    fn bounds(&self, node: usize) -> Bounds {
        Bounds::new_from_top_left(self.nodes[node].absolute, self.nodes[node].size)
    }

    fn relation(&self, edge: &SceneEdge) -> Relation {
        if edge.source == edge.target {
            return Relation::SelfLoop;
        }
        if self.is_ancestor(edge.source, edge.target) {
            return Relation::Inward;
        }
        if self.is_ancestor(edge.target, edge.source) {
            return Relation::Outward;
        }
        let source = FlowBox::new(self.frame, self.bounds(edge.source));
        let target = FlowBox::new(self.frame, self.bounds(edge.target));
        if target.f0 >= source.f1 {
            Relation::Forward
        } else if target.f1 <= source.f0 {
            Relation::Backward
        } else {
            Relation::Sideways {
                towards_cross_end: target.cross_center() >= source.cross_center(),
            }
        }
    }

    /// Builds an orthogonal route for every edge.
    fn route(&mut self) {
        let frame = self.frame;
        let relations: Vec<Relation> = self.edges.iter().map(|edge| self.relation(edge)).collect();

        // Ports: (node, side) -> (ordering key, edge, is source)
        let mut ports: HashMap<(usize, Side), Vec<(f64, usize, bool)>> = HashMap::new();
        for (i, (edge, relation)) in self.edges.iter().zip(&relations).enumerate() {
            let source = FlowBox::new(frame, self.bounds(edge.source));
            let target = FlowBox::new(frame, self.bounds(edge.target));
            let sides = match relation {
                Relation::Forward => Some((Side::FlowEnd, Side::FlowStart)),
                Relation::Backward => Some((Side::FlowStart, Side::FlowEnd)),
                Relation::Sideways { towards_cross_end } => Some(if *towards_cross_end {
                    (Side::CrossEnd, Side::CrossStart)
                } else {
                    (Side::CrossStart, Side::CrossEnd)
                }),
                Relation::SelfLoop | Relation::Inward | Relation::Outward => None,
            };
            if let Some((source_side, target_side)) = sides {
                let key = |side: Side, other: FlowBox| {
                    if side.is_flow_side() {
                        other.cross_center()
                    } else {
                        other.flow_center()
                    }
                };
                ports
                    .entry((edge.source, source_side))
                    .or_default()
                    .push((key(source_side, target), i, true));
                ports
                    .entry((edge.target, target_side))
                    .or_default()
                    .push((key(target_side, source), i, false));
            }
        }

        // Edge -> (source port, target port), as the coordinate along the side
        let mut assigned: HashMap<(usize, bool), f64> = HashMap::new();
        for ((node, side), mut entries) in ports {
            entries.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let bounds = FlowBox::new(frame, self.bounds(node));
            let (start, end) = if side.is_flow_side() {
                (bounds.c0, bounds.c1)
            } else {
                (bounds.f0, bounds.f1)
            };
            let count = entries.len() as f64;
            for (slot, (_, edge, is_source)) in entries.into_iter().enumerate() {
                let along = start + (end - start) * (slot as f64 + 1.0) / (count + 1.0);
                assigned.insert((edge, is_source), along);
            }
        }

        let loop_spacing = self.self_loop_spacing() / 2.0;
        let mut loops: HashMap<usize, usize> = HashMap::new();
        for i in 0..self.edges.len() {
            let (source_node, target_node) = (self.edges[i].source, self.edges[i].target);
            let source = FlowBox::new(frame, self.bounds(source_node));
            let target = FlowBox::new(frame, self.bounds(target_node));
            let port = |is_source: bool| assigned.get(&(i, is_source)).copied();

            let flow_points: Vec<(f64, f64)> = match relations[i] {
                Relation::SelfLoop => {
                    let count = loops.entry(source_node).or_default();
                    *count += 1;
                    let reach = source.c1 + loop_spacing * *count as f64;
                    let height = source.f1 - source.f0;
                    let (fa, fb) = (source.f0 + height / 3.0, source.f1 - height / 3.0);
                    vec![(fa, source.c1), (fa, reach), (fb, reach), (fb, source.c1)]
                }
                Relation::Inward => {
                    let c = target.cross_center();
                    vec![(source.f0, c), (target.f0, c)]
                }
                Relation::Outward => {
                    let c = source.cross_center();
                    vec![(source.f1, c), (target.f1, c)]
                }
                Relation::Forward | Relation::Backward => {
                    let forward = matches!(relations[i], Relation::Forward);
                    let (from, to) = if forward {
                        (source.f1, target.f0)
                    } else {
                        (source.f0, target.f1)
                    };
                    let ps = port(true).unwrap_or(source.cross_center());
                    let pt = port(false).unwrap_or(target.cross_center());
                    if ps == pt {
                        vec![(from, ps), (to, pt)]
                    } else {
                        let mid = (from + to) / 2.0;
                        vec![(from, ps), (mid, ps), (mid, pt), (to, pt)]
                    }
                }
                Relation::Sideways { towards_cross_end } => {
                    let (from, to) = if towards_cross_end {
                        (source.c1, target.c0)
                    } else {
                        (source.c0, target.c1)
                    };
                    let ps = port(true).unwrap_or(source.flow_center());
                    let pt = port(false).unwrap_or(target.flow_center());
                    if ps == pt {
                        vec![(ps, from), (pt, to)]
                    } else {
                        let mid = (from + to) / 2.0;
                        vec![(ps, from), (ps, mid), (pt, mid), (pt, to)]
                    }
                }
            };

            self.edges[i].route = flow_points
                .into_iter()
                .map(|(flow, across)| frame.point(flow, across))
                .collect();
        }
    }

    fn write_back(&self, graph: &mut LayoutGraph) {
        for node in &self.nodes {
            let Some(path) = &node.path else { continue };
            if let Some(layout_node) = graph.node_at_mut(path) {
                layout_node.x = node.position.x();
                layout_node.y = node.position.y();
                layout_node.width = node.size.width();
                layout_node.height = node.size.height();
                for label in &mut layout_node.labels {
                    label.x = (node.size.width() - label.width) / 2.0;
                    label.y = if node.children.is_empty() {
                        (node.size.height() - label.height) / 2.0
                    } else {
                        0.0
                    };
                }
            }
        }

        for edge in &self.edges {
            let container = &self.nodes[edge.container];
            let origin = container.absolute;
            let points: Vec<LayoutPoint> = edge
                .route
                .iter()
                .map(|point| LayoutPoint::from(point.sub_point(origin)))
                .collect();
            let Some(layout_edge) = graph.edges.get_mut(edge.index) else {
                continue;
            };
            if points.len() < 2 {
                continue;
            }

            let middle = points.len() / 2;
            let anchor = Point::from(points[middle - 1]).midpoint(Point::from(points[middle]));
            for label in &mut layout_edge.labels {
                label.x = anchor.x() - label.width / 2.0;
                label.y = anchor.y() - label.height / 2.0;
            }

            layout_edge.sections = vec![EdgeSection {
                start_point: points[0],
                end_point: points[points.len() - 1],
                bend_points: points[1..points.len() - 1].to_vec(),
            }];
            layout_edge.container = container.id.clone();
        }
    }
}

/// Ranks `count` nodes into layers.
///
/// Returns one entry per connected component, each a list of layers in flow
/// order holding local node ids in cross order. Components are ordered by
/// their lowest node id, so unconnected nodes keep their model order.
fn rank(count: usize, edges: &IndexSet<(u32, u32)>) -> Result<Vec<Vec<Vec<u32>>>, EngineFailure> {
    let mut components: Vec<Vec<Vec<u32>>> = Vec::new();
    let mut ranked = vec![false; count];

    if !edges.is_empty() {
        let edge_list: Vec<(u32, u32)> = edges.iter().copied().collect();
        let config = Config {
            minimum_length: 1,
            vertex_spacing: VERTEX_SPACING,
            ..Default::default()
        };
        let results = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            rust_sugiyama::from_edges(&edge_list, &config)
        }))
        .map_err(|err| {
            let message = if let Some(message) = err.downcast_ref::<String>() {
                message.clone()
            } else if let Some(message) = err.downcast_ref::<&str>() {
                (*message).to_owned()
            } else {
                "unknown error".to_owned()
            };
            EngineFailure::new(format!("rust-sugiyama panicked: {message}"))
        })?;

        for (coords, _, _) in &results {
            let positions: Vec<(u32, f64, f64)> = coords
                .iter()
                .filter_map(|&(id, (x, y))| {
                    let id = u32::try_from(id).ok().filter(|id| (*id as usize) < count)?;
                    Some((id, x as f64, y as f64))
                })
                .collect();
            if positions.is_empty() {
                continue;
            }
            for (id, _, _) in &positions {
                ranked[*id as usize] = true;
            }
            components.push(layers_from_positions(positions, &edge_list));
        }
    }

    for (id, _) in ranked.iter().enumerate().filter(|(_, ranked)| !**ranked) {
        components.push(vec![vec![id as u32]]);
    }

    components.sort_by_key(|layers| layers.iter().flatten().copied().min().unwrap_or(u32::MAX));
    Ok(components)
}

/// Groups ranked positions into layers.
///
/// Layers run in the direction most edges point; nodes within a layer are
/// ordered by their cross coordinate.
fn layers_from_positions(mut positions: Vec<(u32, f64, f64)>, edges: &[(u32, u32)]) -> Vec<Vec<u32>> {
    let level: HashMap<u32, f64> = positions.iter().map(|&(id, _, y)| (id, y)).collect();
    let (mut forward, mut backward) = (0usize, 0usize);
    for (a, b) in edges {
        if let (Some(ya), Some(yb)) = (level.get(a), level.get(b)) {
            if ya < yb {
                forward += 1;
            } else if ya > yb {
                backward += 1;
            }
        }
    }
    let sign = if backward > forward { -1.0 } else { 1.0 };

    positions.sort_by(|a, b| (sign * a.2).total_cmp(&(sign * b.2)).then(a.1.total_cmp(&b.1)));

    let mut layers: Vec<Vec<u32>> = Vec::new();
    let mut current: Option<f64> = None;
    for (id, _, y) in positions {
        let key = sign * y;
        match (current, layers.last_mut()) {
            (Some(level), Some(layer)) if (key - level).abs() < LAYER_TOLERANCE => layer.push(id),
            _ => {
                layers.push(vec![id]);
                current = Some(key);
            }
        }
    }
    layers
}
