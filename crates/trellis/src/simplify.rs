//! Post-layout route clean-up.
//!
//! Engines tend to leave two kinds of needless bends in orthogonal routes:
//! S-bends right where an edge leaves or enters a shape, and ladders, where a
//! route zig-zags down a staircase that a single corner would cover. Both are
//! removed here, but only when the shorter route collides with no more
//! objects and crosses or runs along no more edges than before.
//!
//! Self-loops are never touched.

use log::{debug, trace};

use trellis_core::{
    diagram::{Diagram, EdgeIndex},
    geometry::{Point, Segment},
};

use crate::{adapter::EDGE_NODE_SPACING, config::LadderMetric};

/// Distance a replacement endpoint keeps from the corners of its shape.
const ENDPOINT_MARGIN: f64 = 10.0;

/// Clearance around objects when counting collisions.
const OBJECT_CLEARANCE: f64 = EDGE_NODE_SPACING as f64;

/// Parallel segments closer than this run along each other.
const OVERLAP_GAP: f64 = OBJECT_CLEARANCE / 2.0;

/// Parallel segments closer than this are drawn on top of each other.
const CLOSE_OVERLAP_GAP: f64 = OBJECT_CLEARANCE / 4.0;

/// How badly a stretch of route interferes with the rest of the diagram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Interference {
    objects: usize,
    crossings: usize,
    overlaps: usize,
    close_overlaps: usize,
}

impl Interference {
    fn add(self, other: Self) -> Self {
        Self {
            objects: self.objects + other.objects,
            crossings: self.crossings + other.crossings,
            overlaps: self.overlaps + other.overlaps,
            close_overlaps: self.close_overlaps + other.close_overlaps,
        }
    }

    /// True if any count is higher than in `before`.
    fn is_worse_than(self, before: Self) -> bool {
        self.objects > before.objects
            || self.crossings > before.crossings
            || self.overlaps > before.overlaps
            || self.close_overlaps > before.close_overlaps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Source,
    Target,
}

/// Removes S-bends and ladders from every edge route in `diagram`.
///
/// Endpoint S-bends are handled first, on the source end of every edge and
/// then on the target end. Each edge then gets at most one ladder removed.
/// Changes are committed as they are found, so later candidates are judged
/// against the already simplified routes.
pub fn simplify_routes(diagram: &mut Diagram, metric: LadderMetric) {
    let mut s_bends = 0;
    for end in [End::Source, End::Target] {
        for index in diagram.edge_indices() {
            if let Some(route) = remove_s_bend(diagram, index, end) {
                diagram.edge_mut(index).set_route(route);
                s_bends += 1;
            }
        }
    }

    let mut ladders = 0;
    for index in diagram.edge_indices() {
        if let Some(route) = remove_ladder(diagram, index, metric) {
            diagram.edge_mut(index).set_route(route);
            ladders += 1;
        }
    }

    debug!(s_bends, ladders; "Simplified edge routes");
}

fn remove_s_bend(diagram: &Diagram, index: EdgeIndex, end: End) -> Option<Vec<Point>> {
    let edge = diagram.edge(index);
    let route = edge.route();
    if edge.is_self_loop() || route.len() < 4 {
        return None;
    }

    let last = route.len() - 1;
    let (start, corner, bend, object) = match end {
        End::Source => (route[0], route[1], route[2], edge.src()),
        End::Target => (route[last], route[last - 1], route[last - 2], edge.dst()),
    };
    let shape = diagram.object(object).shape();
    let bounds = shape.bounds();

    let horizontal = start.y() == corner.y();
    let within = if horizontal {
        bounds.min_y() + ENDPOINT_MARGIN < bend.y() && bend.y() < bounds.max_y() - ENDPOINT_MARGIN
    } else {
        bounds.min_x() + ENDPOINT_MARGIN < bend.x() && bend.x() < bounds.max_x() - ENDPOINT_MARGIN
    };
    if !within {
        return None;
    }

    let candidate = if horizontal {
        Point::new(start.x(), bend.y())
    } else {
        Point::new(bend.x(), start.y())
    };
    let candidate = shape.trace_to_border(candidate, bend);

    let before = interference(diagram, index, Segment::new(start, corner));
    let after = interference(diagram, index, Segment::new(candidate, bend));
    let accepted = !after.is_worse_than(before);
    trace!(
        edge = edge.id().to_string(),
        end:?,
        accepted;
        "S-bend candidate"
    );
    if !accepted {
        return None;
    }

    Some(match end {
        End::Source => std::iter::once(candidate)
            .chain(route[3..].iter().copied())
            .collect(),
        End::Target => route[..last - 2]
            .iter()
            .copied()
            .chain(std::iter::once(candidate))
            .collect(),
    })
}

fn remove_ladder(diagram: &Diagram, index: EdgeIndex, metric: LadderMetric) -> Option<Vec<Point>> {
    let edge = diagram.edge(index);
    let route = edge.route();
    if edge.is_self_loop() || route.len() < 6 {
        return None;
    }

    for i in 1..route.len() - 3 {
        let (before, start, corner, end, after) =
            (route[i - 1], route[i], route[i + 1], route[i + 2], route[i + 3]);

        let candidate = if start.x() == corner.x() {
            // Vertical run, then horizontal
            let staircase = (start.x() > before.x()) == (end.x() > corner.x())
                && (corner.y() > start.y()) == (after.y() > end.y());
            if !staircase {
                continue;
            }
            Point::new(end.x(), start.y())
        } else if start.y() == corner.y() {
            let staircase = (start.y() > before.y()) == (end.y() > corner.y())
                && (corner.x() > start.x()) == (after.x() > end.x());
            if !staircase {
                continue;
            }
            Point::new(start.x(), end.y())
        } else {
            continue;
        };

        let old_first = Segment::new(start, corner);
        let old_second = Segment::new(corner, end);
        let new_first = Segment::new(start, candidate);
        let new_second = Segment::new(candidate, end);

        let before_counts = interference(diagram, index, old_first)
            .add(interference(diagram, index, old_second));
        let objects_after = object_hits(diagram, new_first) + object_hits(diagram, new_second);
        let edges_after = match metric {
            LadderMetric::BothSegments => {
                edge_hits(diagram, index, new_first).add(edge_hits(diagram, index, new_second))
            }
            LadderMetric::FirstSegmentTwice => {
                let first = edge_hits(diagram, index, new_first);
                first.add(first)
            }
        };
        let after_counts = Interference {
            objects: objects_after,
            ..edges_after
        };

        let accepted = !after_counts.is_worse_than(before_counts);
        trace!(
            edge = edge.id().to_string(),
            at = i,
            accepted;
            "Ladder candidate"
        );
        if accepted {
            return Some(
                route[..i]
                    .iter()
                    .copied()
                    .chain(std::iter::once(candidate))
                    .chain(route[i + 3..].iter().copied())
                    .collect(),
            );
        }
    }
    None
}

fn interference(diagram: &Diagram, edge: EdgeIndex, segment: Segment) -> Interference {
    Interference {
        objects: object_hits(diagram, segment),
        ..edge_hits(diagram, edge, segment)
    }
}

/// Number of objects whose clearance area `segment` passes through.
fn object_hits(diagram: &Diagram, segment: Segment) -> usize {
    diagram
        .objects()
        .filter(|(_, object)| object.bounds().intersects_segment(&segment, OBJECT_CLEARANCE))
        .count()
}

/// Crossings and overlaps of `segment` with every edge other than `edge`.
fn edge_hits(diagram: &Diagram, edge: EdgeIndex, segment: Segment) -> Interference {
    let horizontal = segment.is_horizontal();
    let mut hits = Interference::default();

    for other in diagram.edge_indices().filter(|other| *other != edge) {
        for pair in diagram.edge(other).route().windows(2) {
            let other_segment = Segment::new(pair[0], pair[1]);
            if other_segment.is_horizontal() == horizontal {
                if !segment.overlaps(other_segment, horizontal, 0.0) {
                    continue;
                }
                let gap = if horizontal {
                    (segment.start().y() - other_segment.start().y()).abs()
                } else {
                    (segment.start().x() - other_segment.start().x()).abs()
                };
                if gap < OVERLAP_GAP {
                    hits.overlaps += 1;
                    if gap < CLOSE_OVERLAP_GAP {
                        hits.close_overlaps += 1;
                    }
                }
            } else if segment.intersects(other_segment) {
                hits.crossings += 1;
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use trellis_core::{diagram::Direction, geometry::Size, shape::ShapeKind};

    use super::*;

    fn place(diagram: &mut Diagram, name: &str, x: f64, y: f64, width: f64, height: f64) {
        let index = diagram
            .add_object(Diagram::ROOT, name, ShapeKind::Rectangle, Size::new(width, height))
            .unwrap();
        diagram.object_mut(index).set_top_left(Point::new(x, y));
    }

    fn connect(diagram: &mut Diagram, src: &str, dst: &str, route: &[(f64, f64)]) -> EdgeIndex {
        let (src, dst) = (diagram.find(src).unwrap(), diagram.find(dst).unwrap());
        let index = diagram.add_edge(src, dst).unwrap();
        diagram
            .edge_mut(index)
            .set_route(route.iter().map(|&(x, y)| Point::new(x, y)).collect());
        index
    }

    fn points(route: &[(f64, f64)]) -> Vec<Point> {
        route.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    const S_BEND: [(f64, f64); 4] = [(100.0, 20.0), (200.0, 20.0), (200.0, 60.0), (400.0, 60.0)];

    const STAIRCASE: [(f64, f64); 6] = [
        (50.0, 100.0),
        (50.0, 150.0),
        (150.0, 150.0),
        (150.0, 250.0),
        (250.0, 250.0),
        (250.0, 300.0),
    ];

    fn s_bend_diagram() -> Diagram {
        let mut diagram = Diagram::new(Direction::Right);
        place(&mut diagram, "a", 0.0, 0.0, 100.0, 100.0);
        place(&mut diagram, "b", 400.0, 10.0, 100.0, 100.0);
        diagram
    }

    fn staircase_diagram() -> Diagram {
        let mut diagram = Diagram::new(Direction::Down);
        place(&mut diagram, "a", 0.0, 50.0, 100.0, 50.0);
        place(&mut diagram, "b", 200.0, 300.0, 100.0, 50.0);
        diagram
    }

    #[test]
    fn test_s_bend_at_source_is_straightened() {
        let mut diagram = s_bend_diagram();
        let edge = connect(&mut diagram, "a", "b", &S_BEND);

        simplify_routes(&mut diagram, LadderMetric::default());

        assert_eq!(
            diagram.edge(edge).route(),
            points(&[(100.0, 60.0), (400.0, 60.0)]).as_slice()
        );
    }

    #[test]
    fn test_s_bend_kept_when_fix_hits_an_object() {
        let mut diagram = s_bend_diagram();
        place(&mut diagram, "c", 120.0, 75.0, 40.0, 40.0);
        let edge = connect(&mut diagram, "a", "b", &S_BEND);

        simplify_routes(&mut diagram, LadderMetric::default());

        assert_eq!(diagram.edge(edge).route(), points(&S_BEND).as_slice());
    }

    #[test]
    fn test_s_bend_at_target_is_straightened() {
        let mut diagram = Diagram::new(Direction::Right);
        place(&mut diagram, "a", 0.0, 0.0, 100.0, 100.0);
        place(&mut diagram, "b", 400.0, 0.0, 100.0, 200.0);
        // The source bend sits too close to the bottom of `a` to be moved
        let edge = connect(
            &mut diagram,
            "a",
            "b",
            &[
                (100.0, 50.0),
                (200.0, 50.0),
                (200.0, 95.0),
                (320.0, 95.0),
                (320.0, 40.0),
                (400.0, 40.0),
            ],
        );

        simplify_routes(&mut diagram, LadderMetric::default());

        assert_eq!(
            diagram.edge(edge).route(),
            points(&[(100.0, 50.0), (200.0, 50.0), (200.0, 95.0), (400.0, 95.0)]).as_slice()
        );
    }

    #[test]
    fn test_staircase_collapses_to_one_corner() {
        let mut diagram = staircase_diagram();
        let edge = connect(&mut diagram, "a", "b", &STAIRCASE);

        simplify_routes(&mut diagram, LadderMetric::default());

        assert_eq!(
            diagram.edge(edge).route(),
            points(&[(50.0, 100.0), (50.0, 250.0), (250.0, 250.0), (250.0, 300.0)]).as_slice()
        );
    }

    #[test]
    fn test_turning_back_is_not_a_ladder() {
        let mut diagram = Diagram::new(Direction::Down);
        place(&mut diagram, "a", 0.0, 50.0, 100.0, 50.0);
        place(&mut diagram, "b", 0.0, 300.0, 100.0, 50.0);
        let route = [
            (50.0, 100.0),
            (50.0, 150.0),
            (150.0, 150.0),
            (150.0, 250.0),
            (50.0, 250.0),
            (50.0, 300.0),
        ];
        let edge = connect(&mut diagram, "a", "b", &route);

        simplify_routes(&mut diagram, LadderMetric::default());

        assert_eq!(diagram.edge(edge).route(), points(&route).as_slice());
    }

    #[test]
    fn test_self_loops_are_left_alone() {
        let mut diagram = staircase_diagram();
        let edge = connect(&mut diagram, "a", "a", &STAIRCASE);

        simplify_routes(&mut diagram, LadderMetric::default());

        assert_eq!(diagram.edge(edge).route(), points(&STAIRCASE).as_slice());
    }

    #[test]
    fn test_ladder_metrics_disagree_on_a_crossing_second_segment() {
        let build = || {
            let mut diagram = staircase_diagram();
            place(&mut diagram, "c", 75.0, 180.0, 50.0, 20.0);
            place(&mut diagram, "d", 75.0, 300.0, 50.0, 20.0);
            let edge = connect(&mut diagram, "a", "b", &STAIRCASE);
            connect(&mut diagram, "c", "d", &[(100.0, 200.0), (100.0, 300.0)]);
            (diagram, edge)
        };

        let (mut both, edge) = build();
        simplify_routes(&mut both, LadderMetric::BothSegments);
        assert_eq!(
            both.edge(edge).route(),
            points(&[(50.0, 100.0), (50.0, 150.0), (250.0, 150.0), (250.0, 300.0)]).as_slice()
        );

        let (mut twice, edge) = build();
        simplify_routes(&mut twice, LadderMetric::FirstSegmentTwice);
        assert_eq!(
            twice.edge(edge).route(),
            points(&[(50.0, 100.0), (50.0, 250.0), (250.0, 250.0), (250.0, 300.0)]).as_slice()
        );
    }

    #[test]
    fn test_parallel_neighbours_count_as_overlaps() {
        let mut diagram = Diagram::new(Direction::Down);
        place(&mut diagram, "a", 0.0, 0.0, 10.0, 10.0);
        place(&mut diagram, "b", 0.0, 500.0, 10.0, 10.0);
        let near = connect(&mut diagram, "a", "b", &[(0.0, 100.0), (200.0, 100.0)]);
        connect(&mut diagram, "a", "b", &[(50.0, 105.0), (300.0, 105.0)]);
        connect(&mut diagram, "a", "b", &[(50.0, 115.0), (300.0, 115.0)]);
        connect(&mut diagram, "a", "b", &[(100.0, 0.0), (100.0, 400.0)]);

        let segment = Segment::new(Point::new(0.0, 100.0), Point::new(200.0, 100.0));
        let hits = edge_hits(&diagram, near, segment);
        assert_eq!(
            hits,
            Interference {
                objects: 0,
                crossings: 1,
                overlaps: 2,
                close_overlaps: 1,
            }
        );
    }
}
