//! The nested object tree and its edges.
//!
//! A [`Diagram`] is an arena: objects live in one vector and refer to each
//! other through [`ObjectIndex`]. Index 0 is always the graph root, which is
//! never laid out itself. Every object is addressed by its qualified path
//! (`network.cell.tower`) and the path is unique across the whole diagram.

use std::{collections::HashMap, fmt};

use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
    label::{Label, LabelPosition},
    shape::{Shape, ShapeKind},
};

/// Errors raised while building a diagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiagramError {
    #[error("object `{0}` is defined more than once")]
    DuplicateId(String),

    #[error("unknown object `{0}`")]
    UnknownObject(String),

    #[error("invalid object name `{0}`")]
    InvalidName(String),
}

/// Main flow direction of the layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Down,
    Up,
    Right,
    Left,
}

impl Direction {
    /// Returns true when ranks advance along the x axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Right | Self::Left)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Down => "down",
            Self::Up => "up",
            Self::Right => "right",
            Self::Left => "left",
        };
        f.write_str(name)
    }
}

/// Position of an object inside a [`Diagram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIndex(usize);

impl ObjectIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Position of an edge inside a [`Diagram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeIndex(usize);

impl EdgeIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A box in the diagram, possibly containing other boxes.
#[derive(Debug, Clone)]
pub struct DiagramObject {
    id: Id,
    shape: ShapeKind,
    top_left: Point,
    width: f64,
    height: f64,
    label: Option<Label>,
    icon: Option<String>,
    fixed_width: Option<f64>,
    fixed_height: Option<f64>,
    label_position: Option<LabelPosition>,
    icon_position: Option<LabelPosition>,
}

impl DiagramObject {
    fn new(id: Id, shape: ShapeKind, size: Size) -> Self {
        Self {
            id,
            shape,
            top_left: Point::default(),
            width: size.width(),
            height: size.height(),
            label: None,
            icon: None,
            fixed_width: None,
            fixed_height: None,
            label_position: None,
            icon_position: None,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn shape_kind(&self) -> ShapeKind {
        self.shape
    }

    /// Absolute position of the top-left corner.
    pub fn top_left(&self) -> Point {
        self.top_left
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Absolute bounding box.
    pub fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.top_left, self.size())
    }

    /// The object's shape at its current box.
    pub fn shape(&self) -> Shape {
        Shape::new(self.shape, self.bounds())
    }

    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn fixed_width(&self) -> Option<f64> {
        self.fixed_width
    }

    pub fn fixed_height(&self) -> Option<f64> {
        self.fixed_height
    }

    /// Returns true if the user pinned either dimension.
    pub fn has_fixed_size(&self) -> bool {
        self.fixed_width.is_some() || self.fixed_height.is_some()
    }

    pub fn has_outside_bottom_label(&self) -> bool {
        self.shape.has_outside_bottom_label()
    }

    pub fn label_position(&self) -> Option<LabelPosition> {
        self.label_position
    }

    pub fn icon_position(&self) -> Option<LabelPosition> {
        self.icon_position
    }

    pub fn set_label(&mut self, label: Label) {
        self.label = Some(label);
    }

    pub fn set_icon(&mut self, icon: impl Into<String>) {
        self.icon = Some(icon.into());
    }

    pub fn set_fixed_width(&mut self, width: f64) {
        self.fixed_width = Some(width);
    }

    pub fn set_fixed_height(&mut self, height: f64) {
        self.fixed_height = Some(height);
    }

    pub fn set_top_left(&mut self, top_left: Point) {
        self.top_left = top_left;
    }

    pub fn set_size(&mut self, size: Size) {
        self.width = size.width();
        self.height = size.height();
    }

    pub fn set_label_position(&mut self, position: Option<LabelPosition>) {
        self.label_position = position;
    }

    pub fn set_icon_position(&mut self, position: Option<LabelPosition>) {
        self.icon_position = position;
    }
}

/// A connector between two objects.
#[derive(Debug, Clone)]
pub struct DiagramEdge {
    id: Id,
    src: ObjectIndex,
    dst: ObjectIndex,
    label: Option<Label>,
    route: Vec<Point>,
    label_position: Option<LabelPosition>,
}

impl DiagramEdge {
    pub fn id(&self) -> Id {
        self.id
    }

    pub fn src(&self) -> ObjectIndex {
        self.src
    }

    pub fn dst(&self) -> ObjectIndex {
        self.dst
    }

    pub fn is_self_loop(&self) -> bool {
        self.src == self.dst
    }

    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    /// Returns the label only when its text is non-empty.
    pub fn visible_label(&self) -> Option<&Label> {
        self.label.as_ref().filter(|label| !label.text().is_empty())
    }

    /// Ordered absolute points of the drawn path.
    pub fn route(&self) -> &[Point] {
        &self.route
    }

    pub fn label_position(&self) -> Option<LabelPosition> {
        self.label_position
    }

    pub fn set_label(&mut self, label: Label) {
        self.label = Some(label);
    }

    pub fn set_route(&mut self, route: Vec<Point>) {
        self.route = route;
    }

    pub fn set_label_position(&mut self, position: Option<LabelPosition>) {
        self.label_position = position;
    }
}

/// A nested diagram: an object tree plus the edges between its objects.
///
/// # Examples
///
/// ```
/// # use trellis_core::diagram::{Diagram, Direction};
/// # use trellis_core::geometry::Size;
/// # use trellis_core::shape::ShapeKind;
/// let mut diagram = Diagram::new(Direction::Down);
/// let network = diagram
///     .add_object(Diagram::ROOT, "network", ShapeKind::Rectangle, Size::new(0.0, 0.0))
///     .unwrap();
/// let tower = diagram
///     .add_object(network, "tower", ShapeKind::Rectangle, Size::new(100.0, 50.0))
///     .unwrap();
///
/// assert_eq!(diagram.object(tower).id(), "network.tower");
/// assert!(diagram.is_container(network));
/// ```
#[derive(Debug, Clone)]
pub struct Diagram {
    direction: Direction,
    objects: Vec<DiagramObject>,
    parents: Vec<Option<ObjectIndex>>,
    children: Vec<Vec<ObjectIndex>>,
    edges: Vec<DiagramEdge>,
    index: HashMap<Id, ObjectIndex>,
}

impl Diagram {
    /// The graph root. It owns the top-level objects and is never laid out.
    pub const ROOT: ObjectIndex = ObjectIndex(0);

    /// Identifier the root is known by on the engine side.
    pub const ROOT_ID: &'static str = "root";

    pub fn new(direction: Direction) -> Self {
        let root = DiagramObject::new(Id::new(Self::ROOT_ID), ShapeKind::Rectangle, Size::default());
        Self {
            direction,
            objects: vec![root],
            parents: vec![None],
            children: vec![Vec::new()],
            edges: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Adds an object named `name` under `parent`.
    ///
    /// The object's id is the parent's qualified path joined with `name`;
    /// objects under the root are identified by `name` alone.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::InvalidName`] for an empty name, one that
    /// contains the path separator or a top-level object named
    /// [`ROOT_ID`](Self::ROOT_ID), and [`DiagramError::DuplicateId`] when the
    /// qualified path is already taken.
    pub fn add_object(
        &mut self,
        parent: ObjectIndex,
        name: &str,
        shape: ShapeKind,
        size: Size,
    ) -> Result<ObjectIndex, DiagramError> {
        if name.is_empty() || name.contains(crate::identifier::PATH_SEPARATOR) {
            return Err(DiagramError::InvalidName(name.to_owned()));
        }
        if parent == Self::ROOT && name == Self::ROOT_ID {
            return Err(DiagramError::InvalidName(name.to_owned()));
        }
        if parent.0 >= self.objects.len() {
            return Err(DiagramError::UnknownObject(format!("#{}", parent.0)));
        }
        let id = if parent == Self::ROOT {
            Id::new(name)
        } else {
            self.objects[parent.0].id.create_nested(name)
        };
        if self.index.contains_key(&id) {
            return Err(DiagramError::DuplicateId(id.to_string()));
        }

        let index = ObjectIndex(self.objects.len());
        self.objects.push(DiagramObject::new(id, shape, size));
        self.parents.push(Some(parent));
        self.children.push(Vec::new());
        self.children[parent.0].push(index);
        self.index.insert(id, index);
        trace!(id = id.to_string(), parent = parent.0; "Added object");
        Ok(index)
    }

    /// Adds an edge from `src` to `dst`.
    ///
    /// Edge ids take the form `(<src> -> <dst>)[<n>]` where `n` counts the
    /// edges already connecting the same pair.
    pub fn add_edge(&mut self, src: ObjectIndex, dst: ObjectIndex) -> Result<EdgeIndex, DiagramError> {
        for endpoint in [src, dst] {
            if endpoint == Self::ROOT || endpoint.0 >= self.objects.len() {
                return Err(DiagramError::UnknownObject(format!("#{}", endpoint.0)));
            }
        }
        let duplicates = self
            .edges
            .iter()
            .filter(|edge| edge.src == src && edge.dst == dst)
            .count();
        let id = Id::new(&format!(
            "({} -> {})[{duplicates}]",
            self.objects[src.0].id, self.objects[dst.0].id
        ));
        let index = EdgeIndex(self.edges.len());
        self.edges.push(DiagramEdge {
            id,
            src,
            dst,
            label: None,
            route: Vec::new(),
            label_position: None,
        });
        Ok(index)
    }

    /// Looks up an object by qualified path.
    pub fn find(&self, path: &str) -> Option<ObjectIndex> {
        self.index.get(&Id::new(path)).copied()
    }

    /// Looks up an object by id.
    pub fn find_id(&self, id: Id) -> Option<ObjectIndex> {
        self.index.get(&id).copied()
    }

    pub fn object(&self, index: ObjectIndex) -> &DiagramObject {
        &self.objects[index.0]
    }

    pub fn object_mut(&mut self, index: ObjectIndex) -> &mut DiagramObject {
        &mut self.objects[index.0]
    }

    pub fn edge(&self, index: EdgeIndex) -> &DiagramEdge {
        &self.edges[index.0]
    }

    pub fn edge_mut(&mut self, index: EdgeIndex) -> &mut DiagramEdge {
        &mut self.edges[index.0]
    }

    pub fn edges(&self) -> &[DiagramEdge] {
        &self.edges
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> + use<> {
        (0..self.edges.len()).map(EdgeIndex)
    }

    /// Every object except the root, in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectIndex, &DiagramObject)> {
        self.objects
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, object)| (ObjectIndex(i), object))
    }

    /// Number of objects, root excluded.
    pub fn object_count(&self) -> usize {
        self.objects.len() - 1
    }

    pub fn children(&self, index: ObjectIndex) -> &[ObjectIndex] {
        &self.children[index.0]
    }

    pub fn parent(&self, index: ObjectIndex) -> Option<ObjectIndex> {
        self.parents[index.0]
    }

    pub fn is_container(&self, index: ObjectIndex) -> bool {
        !self.children[index.0].is_empty()
    }

    /// Number of ancestors between the object and the root.
    pub fn depth(&self, index: ObjectIndex) -> usize {
        let mut depth = 0;
        let mut current = self.parents[index.0];
        while let Some(parent) = current {
            if parent == Self::ROOT {
                break;
            }
            depth += 1;
            current = self.parents[parent.0];
        }
        depth
    }

    /// Pre-order depth-first walk over every object except the root.
    ///
    /// `visit` receives the object and its parent, with `None` standing for
    /// the graph root. Children are visited in insertion order, so two walks
    /// over an unchanged diagram see the same sequence.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(ObjectIndex, Option<ObjectIndex>),
    {
        let mut stack: Vec<ObjectIndex> = self.children[Self::ROOT.0].iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            let parent = self.parents[index.0].filter(|parent| *parent != Self::ROOT);
            visit(index, parent);
            stack.extend(self.children[index.0].iter().rev().copied());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> Size {
        Size::new(100.0, 50.0)
    }

    #[test]
    fn test_nested_ids() {
        let mut diagram = Diagram::new(Direction::Down);
        let a = diagram
            .add_object(Diagram::ROOT, "a", ShapeKind::Rectangle, leaf())
            .unwrap();
        let b = diagram.add_object(a, "b", ShapeKind::Oval, leaf()).unwrap();
        let c = diagram.add_object(b, "c", ShapeKind::Circle, leaf()).unwrap();

        assert_eq!(diagram.object(c).id(), "a.b.c");
        assert_eq!(diagram.find("a.b"), Some(b));
        assert_eq!(diagram.find_id(diagram.object(c).id()), Some(c));
        assert_eq!(diagram.depth(c), 2);
        assert_eq!(diagram.depth(a), 0);
    }

    #[test]
    fn test_duplicate_and_invalid_names() {
        let mut diagram = Diagram::new(Direction::Down);
        diagram
            .add_object(Diagram::ROOT, "a", ShapeKind::Rectangle, leaf())
            .unwrap();

        assert_eq!(
            diagram.add_object(Diagram::ROOT, "a", ShapeKind::Rectangle, leaf()),
            Err(DiagramError::DuplicateId("a".to_owned()))
        );
        assert!(matches!(
            diagram.add_object(Diagram::ROOT, "x.y", ShapeKind::Rectangle, leaf()),
            Err(DiagramError::InvalidName(_))
        ));
        assert!(matches!(
            diagram.add_object(Diagram::ROOT, "", ShapeKind::Rectangle, leaf()),
            Err(DiagramError::InvalidName(_))
        ));
    }

    #[test]
    fn test_root_name_is_reserved_at_the_top_level() {
        let mut diagram = Diagram::new(Direction::Down);
        assert_eq!(
            diagram.add_object(Diagram::ROOT, Diagram::ROOT_ID, ShapeKind::Rectangle, leaf()),
            Err(DiagramError::InvalidName("root".to_owned()))
        );

        let group = diagram
            .add_object(Diagram::ROOT, "group", ShapeKind::Rectangle, leaf())
            .unwrap();
        let nested = diagram
            .add_object(group, Diagram::ROOT_ID, ShapeKind::Rectangle, leaf())
            .unwrap();
        assert_eq!(diagram.object(nested).id(), "group.root");
    }

    #[test]
    fn test_edge_ids_count_duplicates() {
        let mut diagram = Diagram::new(Direction::Down);
        let a = diagram
            .add_object(Diagram::ROOT, "a", ShapeKind::Rectangle, leaf())
            .unwrap();
        let b = diagram
            .add_object(Diagram::ROOT, "b", ShapeKind::Rectangle, leaf())
            .unwrap();

        let first = diagram.add_edge(a, b).unwrap();
        let second = diagram.add_edge(a, b).unwrap();
        let back = diagram.add_edge(b, a).unwrap();

        assert_eq!(diagram.edge(first).id(), "(a -> b)[0]");
        assert_eq!(diagram.edge(second).id(), "(a -> b)[1]");
        assert_eq!(diagram.edge(back).id(), "(b -> a)[0]");
        assert!(diagram.add_edge(Diagram::ROOT, a).is_err());
    }

    #[test]
    fn test_walk_is_pre_order_with_root_as_none() {
        let mut diagram = Diagram::new(Direction::Down);
        let a = diagram
            .add_object(Diagram::ROOT, "a", ShapeKind::Rectangle, leaf())
            .unwrap();
        let a1 = diagram.add_object(a, "one", ShapeKind::Rectangle, leaf()).unwrap();
        let a2 = diagram.add_object(a, "two", ShapeKind::Rectangle, leaf()).unwrap();
        let b = diagram
            .add_object(Diagram::ROOT, "b", ShapeKind::Rectangle, leaf())
            .unwrap();
        let a1x = diagram.add_object(a1, "x", ShapeKind::Rectangle, leaf()).unwrap();

        let mut visited = Vec::new();
        diagram.walk(|object, parent| visited.push((object, parent)));

        assert_eq!(
            visited,
            vec![
                (a, None),
                (a1, Some(a)),
                (a1x, Some(a1)),
                (a2, Some(a)),
                (b, None),
            ]
        );
    }

    #[test]
    fn test_visible_label_requires_text() {
        let mut diagram = Diagram::new(Direction::Right);
        let a = diagram
            .add_object(Diagram::ROOT, "a", ShapeKind::Rectangle, leaf())
            .unwrap();
        let edge = diagram.add_edge(a, a).unwrap();
        assert!(diagram.edge(edge).is_self_loop());

        diagram.edge_mut(edge).set_label(Label::new("", 0.0, 0.0));
        assert!(diagram.edge(edge).visible_label().is_none());
        diagram.edge_mut(edge).set_label(Label::new("calls", 30.0, 16.0));
        assert!(diagram.edge(edge).visible_label().is_some());
    }
}
