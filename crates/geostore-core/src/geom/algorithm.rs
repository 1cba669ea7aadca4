//! Planar spatial predicates and measures.
//!
//! Geometries are decomposed into points, line strings and polygons, and the
//! predicates are evaluated pairwise on the components in the XY plane. The
//! same routines back client-side predicate evaluation and the spatial
//! functions registered with SQLite, so both agree on edge cases such as
//! touching boundaries.

use super::{Coord, Geometry};

const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Inside,
    Boundary,
    Outside,
}

#[derive(Clone, Copy)]
struct Pt {
    x: f64,
    y: f64,
}

enum Part<'a> {
    Point(Pt),
    Line(&'a [Coord]),
    Polygon(&'a [Vec<Coord>]),
}

fn pt(c: &Coord) -> Pt {
    Pt { x: c.x, y: c.y }
}

fn parts(geometry: &Geometry) -> Vec<Part<'_>> {
    let mut out = Vec::new();
    collect_parts(geometry, &mut out);
    out
}

fn collect_parts<'a>(geometry: &'a Geometry, out: &mut Vec<Part<'a>>) {
    match geometry {
        Geometry::Point(c) => out.push(Part::Point(pt(c))),
        Geometry::MultiPoint(cs) => out.extend(cs.iter().map(|c| Part::Point(pt(c)))),
        Geometry::LineString(cs) => push_line(cs, out),
        Geometry::MultiLineString(lines) => {
            for line in lines {
                push_line(line, out);
            }
        }
        Geometry::Polygon(rings) => push_polygon(rings, out),
        Geometry::MultiPolygon(polygons) => {
            for rings in polygons {
                push_polygon(rings, out);
            }
        }
        Geometry::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_parts(geometry, out);
            }
        }
    }
}

fn push_line<'a>(cs: &'a [Coord], out: &mut Vec<Part<'a>>) {
    match cs.len() {
        0 => {}
        1 => out.push(Part::Point(pt(&cs[0]))),
        _ => out.push(Part::Line(cs)),
    }
}

fn push_polygon<'a>(rings: &'a [Vec<Coord>], out: &mut Vec<Part<'a>>) {
    if rings.first().is_some_and(|shell| !shell.is_empty()) {
        out.push(Part::Polygon(rings));
    }
}

fn segments(cs: &[Coord]) -> impl Iterator<Item = (Pt, Pt)> + '_ {
    cs.windows(2).map(|w| (pt(&w[0]), pt(&w[1])))
}

fn ring_segments(rings: &[Vec<Coord>]) -> impl Iterator<Item = (Pt, Pt)> + '_ {
    rings.iter().flat_map(|ring| segments(ring))
}

fn cross(o: Pt, a: Pt, b: Pt) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn orientation(o: Pt, a: Pt, b: Pt) -> i8 {
    let c = cross(o, a, b);
    let scale = (a.x - o.x).abs() + (a.y - o.y).abs() + (b.x - o.x).abs() + (b.y - o.y).abs();
    if c.abs() <= EPSILON * scale.max(1.0) {
        0
    } else if c > 0.0 {
        1
    } else {
        -1
    }
}

fn within_box(p: Pt, a: Pt, b: Pt) -> bool {
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

fn point_on_segment(p: Pt, a: Pt, b: Pt) -> bool {
    orientation(a, b, p) == 0 && within_box(p, a, b)
}

fn same_point(a: Pt, b: Pt) -> bool {
    (a.x - b.x).abs() <= EPSILON && (a.y - b.y).abs() <= EPSILON
}

fn segments_intersect(a: Pt, b: Pt, c: Pt, d: Pt) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if o1 != o2 && o3 != o4 && o1 != 0 && o2 != 0 && o3 != 0 && o4 != 0 {
        return true;
    }

    point_on_segment(c, a, b)
        || point_on_segment(d, a, b)
        || point_on_segment(a, c, d)
        || point_on_segment(b, c, d)
}

/// Segments cross at a single point interior to both.
fn segments_cross(a: Pt, b: Pt, c: Pt, d: Pt) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);
    o1 * o2 < 0 && o3 * o4 < 0
}

fn locate_in_ring(p: Pt, ring: &[Coord]) -> Location {
    let mut inside = false;
    for (a, b) in segments(ring) {
        if point_on_segment(p, a, b) {
            return Location::Boundary;
        }
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    if inside {
        Location::Inside
    } else {
        Location::Outside
    }
}

fn locate_in_polygon(p: Pt, rings: &[Vec<Coord>]) -> Location {
    let Some((shell, holes)) = rings.split_first() else {
        return Location::Outside;
    };

    match locate_in_ring(p, shell) {
        Location::Inside => {}
        other => return other,
    }

    for hole in holes {
        match locate_in_ring(p, hole) {
            Location::Inside => return Location::Outside,
            Location::Boundary => return Location::Boundary,
            Location::Outside => {}
        }
    }

    Location::Inside
}

fn point_on_line(p: Pt, line: &[Coord]) -> bool {
    segments(line).any(|(a, b)| point_on_segment(p, a, b))
}

fn parts_intersect(a: &Part<'_>, b: &Part<'_>) -> bool {
    match (a, b) {
        (Part::Point(p), Part::Point(q)) => same_point(*p, *q),
        (Part::Point(p), Part::Line(l)) | (Part::Line(l), Part::Point(p)) => point_on_line(*p, l),
        (Part::Point(p), Part::Polygon(r)) | (Part::Polygon(r), Part::Point(p)) => {
            locate_in_polygon(*p, r) != Location::Outside
        }
        (Part::Line(l), Part::Line(m)) => {
            segments(l).any(|(a, b)| segments(m).any(|(c, d)| segments_intersect(a, b, c, d)))
        }
        (Part::Line(l), Part::Polygon(r)) | (Part::Polygon(r), Part::Line(l)) => {
            locate_in_polygon(pt(&l[0]), r) != Location::Outside
                || segments(l)
                    .any(|(a, b)| ring_segments(r).any(|(c, d)| segments_intersect(a, b, c, d)))
        }
        (Part::Polygon(r), Part::Polygon(s)) => {
            ring_segments(r).any(|(a, b)| ring_segments(s).any(|(c, d)| segments_intersect(a, b, c, d)))
                || locate_in_polygon(pt(&r[0][0]), s) != Location::Outside
                || locate_in_polygon(pt(&s[0][0]), r) != Location::Outside
        }
    }
}

/// Returns `true` if the geometries share at least one point.
pub fn intersects(a: &Geometry, b: &Geometry) -> bool {
    let (pa, pb) = (parts(a), parts(b));
    pa.iter().any(|x| pb.iter().any(|y| parts_intersect(x, y)))
}

/// Returns `true` if the geometries share no point.
pub fn disjoint(a: &Geometry, b: &Geometry) -> bool {
    !intersects(a, b)
}

/// Returns `true` if the line lies within the closed polygon.
fn line_covered_by_polygon(line: &[Coord], rings: &[Vec<Coord>]) -> bool {
    line.iter()
        .all(|c| locate_in_polygon(pt(c), rings) != Location::Outside)
        && segments(line).all(|(a, b)| {
            let mid = Pt {
                x: (a.x + b.x) / 2.0,
                y: (a.y + b.y) / 2.0,
            };
            locate_in_polygon(mid, rings) != Location::Outside
                && !ring_segments(rings).any(|(c, d)| segments_cross(a, b, c, d))
        })
}

fn segment_covered_by_line(a: Pt, b: Pt, line: &[Coord]) -> bool {
    segments(line).any(|(c, d)| point_on_segment(a, c, d) && point_on_segment(b, c, d))
}

fn part_covered_by(part: &Part<'_>, container: &[Part<'_>]) -> bool {
    container.iter().any(|outer| match (part, outer) {
        (Part::Point(p), Part::Point(q)) => same_point(*p, *q),
        (Part::Point(p), Part::Line(l)) => point_on_line(*p, l),
        (Part::Point(p), Part::Polygon(r)) => locate_in_polygon(*p, r) != Location::Outside,
        (Part::Line(l), Part::Line(m)) => segments(l).all(|(a, b)| segment_covered_by_line(a, b, m)),
        (Part::Line(l), Part::Polygon(r)) => line_covered_by_polygon(l, r),
        (Part::Polygon(r), Part::Polygon(s)) => {
            line_covered_by_polygon(&r[0], s)
                // A hole of the container must not poke into the contained shell
                && s[1..].iter().all(|hole| {
                    hole.iter()
                        .all(|c| locate_in_ring(pt(c), &r[0]) != Location::Inside)
                })
        }
        _ => false,
    })
}

fn part_touches_interior(part: &Part<'_>, container: &[Part<'_>]) -> bool {
    container.iter().any(|outer| match (part, outer) {
        (Part::Point(p), Part::Polygon(r)) => locate_in_polygon(*p, r) == Location::Inside,
        (Part::Line(l), Part::Polygon(r)) => segments(l).any(|(a, b)| {
            let mid = Pt {
                x: (a.x + b.x) / 2.0,
                y: (a.y + b.y) / 2.0,
            };
            locate_in_polygon(mid, r) == Location::Inside
                || locate_in_polygon(a, r) == Location::Inside
        }),
        (Part::Polygon(_), Part::Polygon(_)) => true,
        (Part::Point(p), Part::Line(l)) => {
            // The end points of a line are its boundary
            point_on_line(*p, l) && !same_point(*p, pt(&l[0])) && !same_point(*p, pt(&l[l.len() - 1]))
        }
        (Part::Point(p), Part::Point(q)) => same_point(*p, *q),
        (Part::Line(_), Part::Line(_)) => true,
        _ => false,
    })
}

/// Returns `true` if every point of `b` lies in `a` and the interiors meet.
pub fn contains(a: &Geometry, b: &Geometry) -> bool {
    let (pa, pb) = (parts(a), parts(b));
    if pa.is_empty() || pb.is_empty() {
        return false;
    }
    pb.iter().all(|part| part_covered_by(part, &pa))
        && pb.iter().any(|part| part_touches_interior(part, &pa))
}

/// Returns `true` if `a` lies in `b`.
pub fn within(a: &Geometry, b: &Geometry) -> bool {
    contains(b, a)
}

/// Returns `true` if the geometries cover the same points.
pub fn equals(a: &Geometry, b: &Geometry) -> bool {
    let (pa, pb) = (parts(a), parts(b));
    if pa.is_empty() || pb.is_empty() {
        return pa.is_empty() && pb.is_empty();
    }
    pa.iter().all(|part| part_covered_by(part, &pb)) && pb.iter().all(|part| part_covered_by(part, &pa))
}

fn distance_pt(p: Pt, q: Pt) -> f64 {
    (p.x - q.x).hypot(p.y - q.y)
}

fn distance_pt_segment(p: Pt, a: Pt, b: Pt) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return distance_pt(p, a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    distance_pt(
        p,
        Pt {
            x: a.x + t * dx,
            y: a.y + t * dy,
        },
    )
}

fn distance_segments(a: Pt, b: Pt, c: Pt, d: Pt) -> f64 {
    if segments_intersect(a, b, c, d) {
        return 0.0;
    }
    distance_pt_segment(a, c, d)
        .min(distance_pt_segment(b, c, d))
        .min(distance_pt_segment(c, a, b))
        .min(distance_pt_segment(d, a, b))
}

fn edges<'a>(part: &'a Part<'a>) -> Box<dyn Iterator<Item = (Pt, Pt)> + 'a> {
    match part {
        Part::Point(p) => Box::new(std::iter::once((*p, *p))),
        Part::Line(l) => Box::new(segments(l)),
        Part::Polygon(r) => Box::new(ring_segments(r)),
    }
}

/// Minimum planar distance between the geometries, or `None` if either is
/// empty.
pub fn distance(a: &Geometry, b: &Geometry) -> Option<f64> {
    let (pa, pb) = (parts(a), parts(b));
    if pa.is_empty() || pb.is_empty() {
        return None;
    }

    let mut best = f64::INFINITY;
    for x in &pa {
        for y in &pb {
            if parts_intersect(x, y) {
                return Some(0.0);
            }
            for (p, q) in edges(x) {
                for (r, s) in edges(y) {
                    best = best.min(distance_segments(p, q, r, s));
                }
            }
        }
    }
    Some(best)
}

/// Returns `true` if the geometries are within `max` of each other.
pub fn dwithin(a: &Geometry, b: &Geometry, max: f64) -> bool {
    distance(a, b).is_some_and(|d| d <= max)
}

fn ring_area(ring: &[Coord]) -> f64 {
    let sum: f64 = ring.windows(2).map(|w| w[0].x * w[1].y - w[1].x * w[0].y).sum();
    (sum / 2.0).abs()
}

/// Planar area. Zero for points and lines.
pub fn area(geometry: &Geometry) -> f64 {
    parts(geometry)
        .iter()
        .map(|part| match part {
            Part::Polygon(rings) => {
                let (shell, holes) = rings.split_first().map_or((0.0, 0.0), |(shell, holes)| {
                    (ring_area(shell), holes.iter().map(|h| ring_area(h)).sum::<f64>())
                });
                shell - holes
            }
            _ => 0.0,
        })
        .sum()
}
