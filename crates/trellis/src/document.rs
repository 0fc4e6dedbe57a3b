//! JSON diagram documents.
//!
//! A document describes the object tree with measured sizes and labels, plus
//! the edges between objects addressed by their dotted paths:
//!
//! ```json
//! {
//!   "direction": "right",
//!   "objects": [
//!     { "name": "network", "label": { "text": "Network", "width": 60, "height": 16 },
//!       "children": [{ "name": "tower", "shape": "hexagon", "width": 100, "height": 60 }] },
//!     { "name": "user", "shape": "person", "width": 60, "height": 80 }
//!   ],
//!   "edges": [{ "source": "user", "target": "network.tower" }]
//! }
//! ```
//!
//! After layout the diagram is written back out as a [`LaidOutDocument`].

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use trellis_core::{
    diagram::{Diagram, DiagramError, Direction, ObjectIndex},
    geometry::Size,
    label::{Label, LabelPosition},
    shape::ShapeKind,
};

use crate::{elk::LayoutPoint, error::TrellisError};

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    objects: Vec<RawObject>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    name: String,
    #[serde(default)]
    shape: ShapeKind,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
    #[serde(default)]
    label: Option<Label>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    fixed_width: Option<f64>,
    #[serde(default)]
    fixed_height: Option<f64>,
    #[serde(default)]
    children: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    source: String,
    target: String,
    #[serde(default)]
    label: Option<Label>,
}

fn parse_direction(value: &str) -> Direction {
    match value.to_ascii_lowercase().as_str() {
        "down" => Direction::Down,
        "up" => Direction::Up,
        "right" => Direction::Right,
        "left" => Direction::Left,
        other => {
            warn!(direction = other; "Unknown direction, laying out downwards");
            Direction::Down
        }
    }
}

/// Parses a JSON diagram document.
///
/// # Errors
///
/// Returns [`TrellisError::Document`] for malformed JSON, and
/// [`TrellisError::Diagram`] for duplicate or invalid object names and edges
/// naming unknown objects.
///
/// # Examples
///
/// ```
/// # use trellis::document::parse_document;
/// let diagram = parse_document(r#"{
///     "objects": [
///         { "name": "a", "width": 100, "height": 50 },
///         { "name": "b", "width": 100, "height": 50 }
///     ],
///     "edges": [{ "source": "a", "target": "b" }]
/// }"#).unwrap();
///
/// assert_eq!(diagram.object_count(), 2);
/// assert_eq!(diagram.edges().len(), 1);
/// ```
pub fn parse_document(src: &str) -> Result<Diagram, TrellisError> {
    let raw: RawDocument =
        serde_json::from_str(src).map_err(|err| TrellisError::new_document_error(err, src))?;

    let direction = raw
        .direction
        .as_deref()
        .map(parse_direction)
        .unwrap_or_default();
    let mut diagram = Diagram::new(direction);

    let mut stack: Vec<(ObjectIndex, &RawObject)> =
        raw.objects.iter().rev().map(|object| (Diagram::ROOT, object)).collect();
    while let Some((parent, object)) = stack.pop() {
        let size = Size::new(
            object.fixed_width.unwrap_or(object.width),
            object.fixed_height.unwrap_or(object.height),
        );
        let index = diagram.add_object(parent, &object.name, object.shape, size)?;
        let added = diagram.object_mut(index);
        if let Some(label) = &object.label {
            added.set_label(label.clone());
        }
        if let Some(icon) = &object.icon {
            added.set_icon(icon.as_str());
        }
        if let Some(width) = object.fixed_width {
            added.set_fixed_width(width);
        }
        if let Some(height) = object.fixed_height {
            added.set_fixed_height(height);
        }
        stack.extend(object.children.iter().rev().map(|child| (index, child)));
    }

    for edge in &raw.edges {
        let endpoint = |path: &str| {
            diagram
                .find(path)
                .ok_or_else(|| DiagramError::UnknownObject(path.to_owned()))
        };
        let (src, dst) = (endpoint(&edge.source)?, endpoint(&edge.target)?);
        let index = diagram.add_edge(src, dst)?;
        if let Some(label) = &edge.label {
            diagram.edge_mut(index).set_label(label.clone());
        }
    }

    debug!(
        objects = diagram.object_count(),
        edges = diagram.edges().len(),
        direction = direction.to_string();
        "Parsed diagram document"
    );
    Ok(diagram)
}

/// An object with its final absolute placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaidOutObject {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_position: Option<LabelPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_position: Option<LabelPosition>,
}

/// An edge with its final absolute route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaidOutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub route: Vec<LayoutPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_position: Option<LabelPosition>,
}

/// The serializable result of a layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaidOutDocument {
    pub direction: Direction,
    pub objects: Vec<LaidOutObject>,
    pub edges: Vec<LaidOutEdge>,
}

impl LaidOutDocument {
    /// Captures the current placements and routes of `diagram`.
    pub fn from_diagram(diagram: &Diagram) -> Self {
        let mut objects = Vec::with_capacity(diagram.object_count());
        diagram.walk(|index, _| {
            let object = diagram.object(index);
            let top_left = object.top_left();
            objects.push(LaidOutObject {
                id: object.id().to_string(),
                x: top_left.x(),
                y: top_left.y(),
                width: object.width(),
                height: object.height(),
                label_position: object.label_position(),
                icon_position: object.icon_position(),
            });
        });

        let edges = diagram
            .edges()
            .iter()
            .map(|edge| LaidOutEdge {
                id: edge.id().to_string(),
                source: diagram.object(edge.src()).id().to_string(),
                target: diagram.object(edge.dst()).id().to_string(),
                route: edge.route().iter().copied().map(LayoutPoint::from).collect(),
                label_position: edge.label_position(),
            })
            .collect();

        Self {
            direction: diagram.direction(),
            objects,
            edges,
        }
    }

    pub fn object(&self, id: &str) -> Option<&LaidOutObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    /// Renders the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Io`] if serialization fails.
    pub fn to_json(&self) -> Result<String, TrellisError> {
        serde_json::to_string_pretty(self).map_err(|err| TrellisError::Io(err.into()))
    }
}

#[cfg(test)]
mod tests {
    use trellis_core::geometry::Point;

    use super::*;

    #[test]
    fn test_nested_objects_and_edges() {
        let diagram = parse_document(
            r#"{
                "direction": "right",
                "objects": [
                    { "name": "network", "label": { "text": "Network", "width": 60, "height": 16 },
                      "children": [
                        { "name": "tower", "shape": "hexagon", "width": 100, "height": 60 }
                      ] },
                    { "name": "user", "shape": "person", "width": 60, "height": 80,
                      "icon": "user.svg", "fixed_width": 90 }
                ],
                "edges": [{ "source": "user", "target": "network.tower",
                            "label": { "text": "calls", "width": 30, "height": 12 } }]
            }"#,
        )
        .unwrap();

        assert_eq!(diagram.direction(), Direction::Right);
        let tower = diagram.find("network.tower").unwrap();
        assert_eq!(diagram.object(tower).shape_kind(), ShapeKind::Hexagon);
        let network = diagram.find("network").unwrap();
        assert!(diagram.is_container(network));

        let user = diagram.object(diagram.find("user").unwrap());
        assert_eq!(user.width(), 90.0);
        assert!(user.has_fixed_size());
        assert_eq!(user.icon(), Some("user.svg"));

        let edge = &diagram.edges()[0];
        assert_eq!(edge.id(), "(user -> network.tower)[0]");
        assert_eq!(edge.visible_label().map(Label::text), Some("calls"));
    }

    #[test]
    fn test_unknown_direction_falls_back_to_down() {
        let diagram = parse_document(r#"{ "direction": "sideways", "objects": [] }"#).unwrap();
        assert_eq!(diagram.direction(), Direction::Down);
    }

    #[test]
    fn test_unknown_edge_endpoint() {
        let err = parse_document(
            r#"{ "objects": [{ "name": "a", "width": 1, "height": 1 }],
                 "edges": [{ "source": "a", "target": "b" }] }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TrellisError::Diagram(DiagramError::UnknownObject(path)) if path == "b"
        ));
    }

    #[test]
    fn test_top_level_root_object_is_rejected() {
        let err = parse_document(
            r#"{ "objects": [{ "name": "root", "children": [
                    { "name": "a", "width": 100, "height": 50 },
                    { "name": "b", "width": 100, "height": 50 }
                 ] }],
                 "edges": [{ "source": "root.a", "target": "root.b" }] }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TrellisError::Diagram(DiagramError::InvalidName(name)) if name == "root"
        ));
    }

    #[test]
    fn test_malformed_json_keeps_position() {
        let src = "{\n  \"objects\": [\n    { \"name\": 3 }\n  ]\n}";
        match parse_document(src).unwrap_err() {
            TrellisError::Document { err, .. } => assert_eq!(err.line(), 3),
            other => panic!("Expected Document error, got {other:?}"),
        }
    }

    #[test]
    fn test_laid_out_document_lists_everything() {
        let mut diagram = parse_document(
            r#"{ "objects": [
                    { "name": "a", "width": 10, "height": 10 },
                    { "name": "b", "width": 10, "height": 10 }
                 ],
                 "edges": [{ "source": "a", "target": "b" }] }"#,
        )
        .unwrap();
        let a = diagram.find("a").unwrap();
        diagram.object_mut(a).set_top_left(Point::new(12.0, 12.0));
        diagram
            .edge_mut(diagram.edge_indices().next().unwrap())
            .set_route(vec![Point::new(17.0, 22.0), Point::new(17.0, 100.0)]);

        let document = LaidOutDocument::from_diagram(&diagram);
        assert_eq!(document.object("a").map(|a| a.x), Some(12.0));
        assert_eq!(document.edges[0].source, "a");
        assert_eq!(document.edges[0].route.len(), 2);

        let json: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();
        assert_eq!(json["direction"], "down");
        assert!(json["objects"][0].get("label_position").is_none());
    }
}
