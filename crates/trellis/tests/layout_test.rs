//! Integration tests for the full layout pipeline.

use float_cmp::approx_eq;
use proptest::prelude::*;

use trellis::{
    LayoutBuilder,
    adapter::adapt,
    config::{AppConfig, LayoutConfig},
    diagram::{Diagram, Direction, ObjectIndex},
    geometry::{Bounds, Point, Size},
    label::{Label, LabelPosition},
    reconcile::reconcile,
    shape::ShapeKind,
};

const BORDER_TOLERANCE: f64 = 0.5;

fn add(diagram: &mut Diagram, parent: ObjectIndex, name: &str, shape: ShapeKind, size: Size) -> ObjectIndex {
    diagram
        .add_object(parent, name, shape, size)
        .expect("Failed to add object")
}

fn overlaps(a: Bounds, b: Bounds) -> bool {
    a.min_x() < b.max_x() && b.min_x() < a.max_x() && a.min_y() < b.max_y() && b.min_y() < a.max_y()
}

fn assert_endpoints_on_borders(diagram: &Diagram) {
    for edge in diagram.edges() {
        let route = edge.route();
        assert!(route.len() >= 2, "{} has route {route:?}", edge.id());
        let source = diagram.object(edge.src()).shape();
        let target = diagram.object(edge.dst()).shape();
        let (first, last) = (route[0], route[route.len() - 1]);
        assert!(
            source.is_on_border(first, BORDER_TOLERANCE),
            "{}: {first:?} is not on the border of {:?}",
            edge.id(),
            source
        );
        assert!(
            target.is_on_border(last, BORDER_TOLERANCE),
            "{}: {last:?} is not on the border of {:?}",
            edge.id(),
            target
        );
    }
}

#[test]
fn test_two_boxes_flow_down() {
    let mut diagram = Diagram::new(Direction::Down);
    let a = add(&mut diagram, Diagram::ROOT, "a", ShapeKind::Rectangle, Size::new(100.0, 50.0));
    let b = add(&mut diagram, Diagram::ROOT, "b", ShapeKind::Rectangle, Size::new(100.0, 50.0));
    diagram.object_mut(b).set_top_left(Point::new(300.0, 200.0));
    diagram.object_mut(a).set_label(Label::new("A", 10.0, 16.0));
    diagram.object_mut(b).set_label(Label::new("B", 10.0, 16.0));
    diagram.add_edge(a, b).unwrap();

    LayoutBuilder::default()
        .layout(&mut diagram)
        .expect("Failed to layout");

    let (a, b) = (diagram.object(a), diagram.object(b));
    assert!(!overlaps(a.bounds(), b.bounds()));
    assert!(b.bounds().min_y() >= a.bounds().max_y());
    assert_eq!(a.label_position(), Some(LabelPosition::InsideMiddleCenter));
    assert_eq!(b.label_position(), Some(LabelPosition::InsideMiddleCenter));
    assert_eq!(a.icon_position(), None);
    assert_endpoints_on_borders(&diagram);
}

#[test]
fn test_nested_children_stay_inside_their_containers() {
    let mut diagram = Diagram::new(Direction::Right);
    let cloud = add(&mut diagram, Diagram::ROOT, "cloud", ShapeKind::Rectangle, Size::default());
    let region = add(&mut diagram, cloud, "region", ShapeKind::Rectangle, Size::default());
    let api = add(&mut diagram, region, "api", ShapeKind::Hexagon, Size::new(120.0, 60.0));
    let db = add(&mut diagram, region, "db", ShapeKind::Cylinder, Size::new(80.0, 80.0));
    let user = add(&mut diagram, Diagram::ROOT, "user", ShapeKind::Person, Size::new(60.0, 80.0));
    diagram.object_mut(cloud).set_label(Label::new("Cloud", 50.0, 16.0));
    diagram.object_mut(user).set_label(Label::new("User", 30.0, 16.0));
    diagram.add_edge(user, api).unwrap();
    diagram.add_edge(api, db).unwrap();

    LayoutBuilder::default()
        .layout(&mut diagram)
        .expect("Failed to layout");

    for (index, object) in diagram.objects() {
        if let Some(parent) = diagram.parent(index).filter(|parent| *parent != Diagram::ROOT) {
            let outer = diagram.object(parent).bounds();
            let inner = object.bounds();
            assert!(
                inner.min_x() >= outer.min_x() - 1e-6
                    && inner.min_y() >= outer.min_y() - 1e-6
                    && inner.max_x() <= outer.max_x() + 1e-6
                    && inner.max_y() <= outer.max_y() + 1e-6,
                "{} escapes {}",
                object.id(),
                diagram.object(parent).id()
            );
        }
    }
    assert!(!overlaps(
        diagram.object(api).bounds(),
        diagram.object(db).bounds()
    ));
    assert_eq!(
        diagram.object(cloud).label_position(),
        Some(LabelPosition::InsideTopCenter)
    );
    assert_eq!(
        diagram.object(user).label_position(),
        Some(LabelPosition::OutsideBottomCenter)
    );
    assert_endpoints_on_borders(&diagram);
}

#[test]
fn test_ports_are_reserved_across_the_flow() {
    for direction in [Direction::Down, Direction::Right] {
        let mut diagram = Diagram::new(direction);
        let hub = add(&mut diagram, Diagram::ROOT, "hub", ShapeKind::Rectangle, Size::new(50.0, 30.0));
        for name in ["a", "b", "c"] {
            let leaf = add(&mut diagram, Diagram::ROOT, name, ShapeKind::Rectangle, Size::new(50.0, 30.0));
            diagram.add_edge(hub, leaf).unwrap();
        }

        LayoutBuilder::default()
            .layout(&mut diagram)
            .expect("Failed to layout");

        let hub = diagram.object(hub);
        let across = if direction.is_horizontal() {
            hub.height()
        } else {
            hub.width()
        };
        assert!(across >= 3.0 * 40.0, "{direction}: {across}");

        let mut starts: Vec<Point> = diagram.edges().iter().map(|edge| edge.route()[0]).collect();
        starts.dedup();
        assert_eq!(starts.len(), 3, "{direction}: edges share a port");
    }
}

#[test]
fn test_routes_end_on_curved_borders() {
    let mut diagram = Diagram::new(Direction::Down);
    let diamond = add(&mut diagram, Diagram::ROOT, "decide", ShapeKind::Diamond, Size::new(120.0, 80.0));
    let yes = add(&mut diagram, Diagram::ROOT, "yes", ShapeKind::Oval, Size::new(100.0, 60.0));
    let no = add(&mut diagram, Diagram::ROOT, "no", ShapeKind::Circle, Size::new(60.0, 60.0));
    diagram.add_edge(diamond, yes).unwrap();
    diagram.add_edge(diamond, no).unwrap();
    diagram.add_edge(no, yes).unwrap();

    LayoutBuilder::default()
        .layout(&mut diagram)
        .expect("Failed to layout");

    assert_endpoints_on_borders(&diagram);
}

#[test]
fn test_edges_into_children_of_curved_containers_start_on_the_outline() {
    for (direction, shape) in [
        (Direction::Down, ShapeKind::Diamond),
        (Direction::Right, ShapeKind::Diamond),
        (Direction::Down, ShapeKind::Oval),
    ] {
        let mut diagram = Diagram::new(direction);
        let group = add(&mut diagram, Diagram::ROOT, "group", shape, Size::default());
        let first = add(&mut diagram, group, "first", ShapeKind::Rectangle, Size::new(80.0, 40.0));
        let second = add(&mut diagram, group, "second", ShapeKind::Rectangle, Size::new(80.0, 40.0));
        diagram.add_edge(group, first).unwrap();
        diagram.add_edge(first, second).unwrap();

        LayoutBuilder::default()
            .layout(&mut diagram)
            .expect("Failed to layout");

        assert_endpoints_on_borders(&diagram);
    }
}

#[test]
fn test_self_loop_survives_layout() {
    let mut diagram = Diagram::new(Direction::Down);
    let a = add(&mut diagram, Diagram::ROOT, "a", ShapeKind::Rectangle, Size::new(100.0, 60.0));
    diagram.add_edge(a, a).unwrap();

    LayoutBuilder::default()
        .layout(&mut diagram)
        .expect("Failed to layout");

    let route = diagram.edges()[0].route();
    assert_eq!(route.len(), 4);
    assert!(route[1].x() > diagram.object(a).bounds().max_x());
}

#[test]
fn test_layout_document_round_trip() {
    let document = LayoutBuilder::new(AppConfig::default())
        .layout_document(
            r#"{
                "direction": "left",
                "objects": [
                    { "name": "a", "width": 100, "height": 50 },
                    { "name": "b", "width": 100, "height": 50 }
                ],
                "edges": [{ "source": "a", "target": "b",
                            "label": { "text": "uses", "width": 30, "height": 12 } }]
            }"#,
        )
        .expect("Failed to layout document");

    let (a, b) = (document.object("a").unwrap(), document.object("b").unwrap());
    assert!(b.x + b.width <= a.x);
    assert_eq!(
        document.edges[0].label_position,
        Some(LabelPosition::InsideMiddleCenter)
    );
}

fn nested_chain(depth: usize) -> (Diagram, Vec<ObjectIndex>) {
    let mut diagram = Diagram::new(Direction::Down);
    let mut chain = Vec::with_capacity(depth);
    let mut parent = Diagram::ROOT;
    for level in 0..depth {
        parent = add(
            &mut diagram,
            parent,
            &format!("level{level}"),
            ShapeKind::Rectangle,
            Size::new(10.0, 10.0),
        );
        chain.push(parent);
    }
    (diagram, chain)
}

proptest! {
    #[test]
    fn relative_offsets_accumulate_at_any_depth(
        offsets in prop::collection::vec((0.0f64..500.0, 0.0f64..500.0), 1..8)
    ) {
        let (mut diagram, chain) = nested_chain(offsets.len());
        let adapted = adapt(&diagram, &LayoutConfig::default());

        let mut result = adapted.graph().clone();
        let mut level = &mut result.children;
        for (x, y) in &offsets {
            let node = &mut level[0];
            node.x = *x;
            node.y = *y;
            level = &mut node.children;
        }

        reconcile(&mut diagram, &adapted, &result).unwrap();

        let mut expected = Point::default();
        for (index, (x, y)) in chain.iter().zip(&offsets) {
            expected = expected.add_point(Point::new(*x, *y));
            let actual = diagram.object(*index).top_left();
            prop_assert!(approx_eq!(f64, actual.x(), expected.x(), epsilon = 1e-9));
            prop_assert!(approx_eq!(f64, actual.y(), expected.y(), epsilon = 1e-9));
        }
    }
}
