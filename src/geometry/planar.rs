//! Planar geometry tests used by the drawing modes.
//!
//! Everything here operates either on raw `[lng, lat]` pairs treated as a
//! plane (good enough at drawing scale) or on Web-Mercator projected
//! coordinates where screen-space behavior matters (the clockwise test).

use super::spherical::lng_lat_to_web_mercator;
use super::Position;

fn orientation(p: Position, q: Position, r: Position) -> f64 {
    (q[0] - p[0]) * (r[1] - p[1]) - (q[1] - p[1]) * (r[0] - p[0])
}

fn on_segment(p: Position, q: Position, r: Position) -> bool {
    q[0] <= p[0].max(r[0])
        && q[0] >= p[0].min(r[0])
        && q[1] <= p[1].max(r[1])
        && q[1] >= p[1].min(r[1])
}

/// True when segment `a1→a2` intersects segment `b1→b2`.
///
/// Handles both proper crossings and collinear overlap. Segments that merely
/// share an endpoint are treated as intersecting by this primitive; callers
/// that walk adjacent segments (like [`self_intersects`]) skip those pairs.
pub fn segments_intersect(a1: Position, a2: Position, b1: Position, b2: Position) -> bool {
    let o1 = orientation(a1, a2, b1);
    let o2 = orientation(a1, a2, b2);
    let o3 = orientation(b1, b2, a1);
    let o4 = orientation(b1, b2, a2);

    if (o1 > 0.0) != (o2 > 0.0)
        && (o3 > 0.0) != (o4 > 0.0)
        && o1 != 0.0
        && o2 != 0.0
        && o3 != 0.0
        && o4 != 0.0
    {
        return true;
    }

    // Collinear cases: an endpoint of one segment lies on the other.
    (o1 == 0.0 && on_segment(a1, b1, a2))
        || (o2 == 0.0 && on_segment(a1, b2, a2))
        || (o3 == 0.0 && on_segment(b1, a1, b2))
        || (o4 == 0.0 && on_segment(b1, a2, b2))
}

/// Tests whether any two non-adjacent segments of a line or ring cross.
///
/// A `true` result vetoes the pending geometry update when the owning mode
/// disallows self-intersection. Segment pairs that share an endpoint
/// (adjacent segments, and the first/last pair of a closed ring) are skipped.
pub fn self_intersects(coords: &[Position]) -> bool {
    if coords.len() < 4 {
        return false;
    }
    let segment_count = coords.len() - 1;
    for i in 0..segment_count {
        for j in (i + 2)..segment_count {
            let (a1, a2) = (coords[i], coords[i + 1]);
            let (b1, b2) = (coords[j], coords[j + 1]);
            // Shared endpoints are ring closure or degenerate vertices, not
            // self-intersections.
            if a1 == b1 || a1 == b2 || a2 == b1 || a2 == b2 {
                continue;
            }
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

fn ray_casts_into_ring(point: Position, ring: &[Position]) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);
        let crosses = (yi > point[1]) != (yj > point[1])
            && point[0] < (xj - xi) * (point[1] - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Ray-casting point-in-polygon test over possibly multi-ring polygons.
///
/// The first ring is the outer boundary; subsequent rings are holes and
/// subtract from the result.
pub fn point_in_polygon(point: Position, rings: &[Vec<Position>]) -> bool {
    let Some(outer) = rings.first() else {
        return false;
    };
    if !ray_casts_into_ring(point, outer) {
        return false;
    }
    for hole in &rings[1..] {
        if ray_casts_into_ring(point, hole) {
            return false;
        }
    }
    true
}

/// Determines rotation direction of `a → b` around `center` in Web-Mercator
/// space.
///
/// Returns `true` for clockwise. A zero cross product (collinear points)
/// resolves to clockwise by convention, so the sector mode always has a
/// direction to hold.
pub fn is_clockwise_web_mercator(center: Position, a: Position, b: Position) -> bool {
    let c = lng_lat_to_web_mercator(center[0], center[1]);
    let pa = lng_lat_to_web_mercator(a[0], a[1]);
    let pb = lng_lat_to_web_mercator(b[0], b[1]);
    let cross = (pa.0 - c.0) * (pb.1 - c.1) - (pa.1 - c.1) * (pb.0 - c.0);
    cross <= 0.0
}

/// Euclidean distance between two screen-space points.
pub fn euclidean_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Distance from screen-space point `p` to the segment `a→b`.
///
/// Used by select-mode line hit testing, where every segment of a projected
/// linestring is measured against the pointer.
pub fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return euclidean_distance(p, a);
    }
    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / length_sq).clamp(0.0, 1.0);
    euclidean_distance(p, (a.0 + t * dx, a.1 + t * dy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_segments_intersect() {
        assert!(segments_intersect(
            [0.0, 0.0],
            [2.0, 2.0],
            [0.0, 2.0],
            [2.0, 0.0]
        ));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        assert!(!segments_intersect(
            [0.0, 0.0],
            [2.0, 0.0],
            [0.0, 1.0],
            [2.0, 1.0]
        ));
    }

    #[test]
    fn collinear_overlapping_segments_intersect() {
        assert!(segments_intersect(
            [0.0, 0.0],
            [3.0, 0.0],
            [1.0, 0.0],
            [4.0, 0.0]
        ));
    }

    #[test]
    fn bowtie_line_self_intersects() {
        // Crosses itself between segment 0 and segment 2.
        let coords = [[0.0, 0.0], [2.0, 2.0], [2.0, 0.0], [0.0, 2.0]];
        assert!(self_intersects(&coords));
    }

    #[test]
    fn simple_ring_does_not_self_intersect() {
        let coords = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]];
        assert!(!self_intersects(&coords));
    }

    #[test]
    fn point_in_polygon_respects_holes() {
        let rings = vec![
            vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
            vec![[1.0, 1.0], [3.0, 1.0], [3.0, 3.0], [1.0, 3.0], [1.0, 1.0]],
        ];
        assert!(point_in_polygon([0.5, 0.5], &rings));
        assert!(!point_in_polygon([2.0, 2.0], &rings)); // inside the hole
        assert!(!point_in_polygon([5.0, 5.0], &rings)); // outside entirely
    }

    #[test]
    fn clockwise_test_detects_direction() {
        let center = [0.0, 0.0];
        assert!(is_clockwise_web_mercator(center, [0.0, 1.0], [1.0, 0.0]));
        assert!(!is_clockwise_web_mercator(center, [1.0, 0.0], [0.0, 1.0]));
    }

    #[test]
    fn clockwise_test_resolves_ties_to_clockwise() {
        // Collinear points produce a zero cross product.
        assert!(is_clockwise_web_mercator([0.0, 0.0], [1.0, 1.0], [2.0, 2.0]));
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let distance = distance_to_segment((5.0, 1.0), (0.0, 0.0), (2.0, 0.0));
        assert!((distance - euclidean_distance((5.0, 1.0), (2.0, 0.0))).abs() < 1e-9);

        let perpendicular = distance_to_segment((1.0, 3.0), (0.0, 0.0), (2.0, 0.0));
        assert!((perpendicular - 3.0).abs() < 1e-9);
    }
}
