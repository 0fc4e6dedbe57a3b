//! Maps the engine's answer back onto the diagram.
//!
//! Reconciliation runs in two phases. The first resolves every object and
//! edge against the laid-out graph and computes absolute placements and
//! routes without touching the diagram. Only when every lookup succeeded does
//! the second phase commit the results, so a failed call leaves the diagram
//! exactly as it was.

use std::collections::HashMap;

use log::{debug, trace};

use trellis_core::{
    diagram::{Diagram, EdgeIndex, ObjectIndex},
    geometry::{Bounds, Point, Size},
    label::{LABEL_PADDING, LabelPosition},
    shape::Shape,
};

use crate::{
    adapter::AdaptedGraph,
    elk::{LayoutEdge, LayoutGraph, LayoutNode},
    error::LayoutError,
};

/// Where an object ends up, computed before anything is committed.
#[derive(Debug, Clone, Copy)]
struct Placement {
    top_left: Point,
    size: Size,
    label_position: Option<LabelPosition>,
    icon_position: Option<LabelPosition>,
}

impl Placement {
    fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.top_left, self.size)
    }
}

#[derive(Debug, Clone)]
struct Routed {
    edge: EdgeIndex,
    route: Vec<Point>,
    label_position: Option<LabelPosition>,
}

/// Writes the laid-out `result` back onto `diagram`.
///
/// `adapted` must be the graph the engine was given for this diagram; its
/// tables locate each object's node and each edge in `result`. Nodes and
/// edges the engine moved are still found by id.
///
/// # Errors
///
/// Returns [`LayoutError::Reconcile`] if an object or edge has no counterpart
/// in `result`, an edge names an unknown container, or an edge has fewer than
/// two route points. The diagram is not modified in that case.
pub fn reconcile(
    diagram: &mut Diagram,
    adapted: &AdaptedGraph,
    result: &LayoutGraph,
) -> Result<(), LayoutError> {
    let mut order: Vec<(ObjectIndex, Option<ObjectIndex>)> = Vec::with_capacity(diagram.object_count());
    diagram.walk(|index, parent| order.push((index, parent)));

    let mut placements: HashMap<ObjectIndex, Placement> = HashMap::with_capacity(order.len());
    for (index, parent) in order {
        let node = find_node(diagram, adapted, result, index)?;
        let origin = match parent {
            Some(parent) => placements
                .get(&parent)
                .map(|placement| placement.top_left)
                .ok_or_else(|| {
                    LayoutError::Reconcile(format!(
                        "parent of `{}` was not placed",
                        diagram.object(index).id()
                    ))
                })?,
            None => Point::default(),
        };
        let placement = place(diagram, index, node, origin);
        trace!(
            id = diagram.object(index).id().to_string(),
            x = placement.top_left.x(),
            y = placement.top_left.y(),
            width = placement.size.width(),
            height = placement.size.height();
            "Placed object"
        );
        placements.insert(index, placement);
    }

    let mut routed: Vec<Routed> = Vec::with_capacity(diagram.edges().len());
    for index in diagram.edge_indices() {
        let edge = diagram.edge(index);
        let layout_edge = find_edge(adapted, result, diagram, index)?;

        let offset = container_origin(diagram, &placements, &layout_edge.container)?;
        let mut route: Vec<Point> = layout_edge
            .sections
            .iter()
            .flat_map(|section| section.points())
            .map(|point| Point::from(point).add_point(offset))
            .collect();
        if route.len() < 2 {
            return Err(LayoutError::Reconcile(format!(
                "edge `{}` has {} route point(s), expected at least 2",
                edge.id(),
                route.len()
            )));
        }

        let shape_of = |object: ObjectIndex| {
            placements
                .get(&object)
                .map(|placement| Shape::new(diagram.object(object).shape_kind(), placement.bounds()))
        };
        let (Some(source), Some(target)) = (shape_of(edge.src()), shape_of(edge.dst())) else {
            return Err(LayoutError::Reconcile(format!(
                "endpoints of edge `{}` were not placed",
                edge.id()
            )));
        };

        let last = route.len() - 1;
        route[0] = source.trace_to_border(route[0], route[1]);
        route[last] = target.trace_to_border(route[last], route[last - 1]);

        routed.push(Routed {
            edge: index,
            route,
            label_position: edge
                .visible_label()
                .map(|_| LabelPosition::InsideMiddleCenter),
        });
    }

    let (objects, edges) = (placements.len(), routed.len());
    for (index, placement) in placements {
        let object = diagram.object_mut(index);
        object.set_top_left(placement.top_left);
        object.set_size(placement.size);
        object.set_label_position(placement.label_position);
        object.set_icon_position(placement.icon_position);
    }
    for Routed {
        edge,
        route,
        label_position,
    } in routed
    {
        let edge = diagram.edge_mut(edge);
        edge.set_route(route);
        edge.set_label_position(label_position);
    }

    debug!(objects, edges; "Reconciled layout result");
    Ok(())
}

fn find_node<'a>(
    diagram: &Diagram,
    adapted: &AdaptedGraph,
    result: &'a LayoutGraph,
    index: ObjectIndex,
) -> Result<&'a LayoutNode, LayoutError> {
    let id = diagram.object(index).id();
    let name = id.to_string();
    adapted
        .node_path(id)
        .and_then(|path| result.node_at(path))
        .filter(|node| node.id == name)
        .or_else(|| result.find_node(&name))
        .ok_or_else(|| LayoutError::Reconcile(format!("no layout for object `{name}`")))
}

fn find_edge<'a>(
    adapted: &AdaptedGraph,
    result: &'a LayoutGraph,
    diagram: &Diagram,
    index: EdgeIndex,
) -> Result<&'a LayoutEdge, LayoutError> {
    let id = diagram.edge(index).id();
    let name = id.to_string();
    adapted
        .edge_index(id)
        .and_then(|position| result.edges.get(position))
        .filter(|edge| edge.id == name)
        .or_else(|| result.edges.iter().find(|edge| edge.id == name))
        .ok_or_else(|| LayoutError::Reconcile(format!("no layout for edge `{name}`")))
}

/// Absolute top-left of the node an edge's sections are relative to.
///
/// An empty container is read as the root.
fn container_origin(
    diagram: &Diagram,
    placements: &HashMap<ObjectIndex, Placement>,
    container: &str,
) -> Result<Point, LayoutError> {
    if container.is_empty() || container == Diagram::ROOT_ID {
        return Ok(Point::default());
    }
    diagram
        .find(container)
        .and_then(|index| placements.get(&index))
        .map(|placement| placement.top_left)
        .ok_or_else(|| LayoutError::Reconcile(format!("unknown edge container `{container}`")))
}

/// Computes an object's absolute placement and anchors from its node.
fn place(diagram: &Diagram, index: ObjectIndex, node: &LayoutNode, origin: Point) -> Placement {
    let object = diagram.object(index);
    let is_container = diagram.is_container(index);
    let mut size = Size::new(node.width, node.height);

    let mut label_position = object.label().map(|label| {
        if is_container {
            LabelPosition::InsideTopCenter
        } else if object.has_outside_bottom_label() {
            size = Size::new(size.width(), size.height() - label.height() - LABEL_PADDING);
            LabelPosition::OutsideBottomCenter
        } else if object.icon().is_some() {
            LabelPosition::InsideTopCenter
        } else {
            LabelPosition::InsideMiddleCenter
        }
    });

    let icon_position = object.icon().map(|_| {
        if is_container {
            if label_position.is_some() {
                label_position = Some(LabelPosition::InsideTopRight);
            }
            LabelPosition::InsideTopLeft
        } else {
            LabelPosition::InsideMiddleCenter
        }
    });

    Placement {
        top_left: origin.add_point(Point::new(node.x, node.y)),
        size,
        label_position,
        icon_position,
    }
}
