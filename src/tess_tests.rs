//! End-to-end scenarios and property tests for the tessellator.

use crate::math::{point, rect, Point, Rect};
use crate::{FillRule, Polygon, TessellationMode, Tessellator};

fn tessellate(
    contours: &[&[Point]],
    rule: FillRule,
    mode: TessellationMode,
    bounds: &Rect,
) -> Polygon {
    let polygon = Polygon::from_contours(contours, false);
    let mut tess = Tessellator::new();
    tess.set_mode(mode);
    tess.set_fill_rule(rule);
    match tess.make(&polygon, bounds) {
        Some(output) => output.clone(),
        None => Polygon::new(),
    }
}

/// Shoelace sum; inside faces produced by the sweep wind negatively in
/// the y-down coordinate system.
fn signed_area(contour: &[Point]) -> f32 {
    let mut doubled = 0.0;
    for i in 0..contour.len() {
        let a = contour[i];
        let b = contour[(i + 1) % contour.len()];
        doubled += a.x * b.y - b.x * a.y;
    }
    doubled * 0.5
}

fn area(contour: &[Point]) -> f32 {
    signed_area(contour).abs()
}

fn total_area(output: &Polygon) -> f32 {
    output.contours().map(area).sum()
}

fn triangles_of(output: &Polygon) -> Vec<[Point; 3]> {
    output
        .contours()
        .map(|contour| {
            assert_eq!(contour.len(), 3, "not a triangle: {:?}", contour);
            [contour[0], contour[1], contour[2]]
        })
        .collect()
}

fn point_in_triangle(p: Point, tri: &[Point; 3]) -> bool {
    let sign = |a: Point, b: Point| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let d0 = sign(tri[0], tri[1]);
    let d1 = sign(tri[1], tri[2]);
    let d2 = sign(tri[2], tri[0]);
    let has_neg = d0 < 0.0 || d1 < 0.0 || d2 < 0.0;
    let has_pos = d0 > 0.0 || d1 > 0.0 || d2 > 0.0;
    !(has_neg && has_pos)
}

/// Winding number of `p` with respect to a set of closed contours.
fn winding_number(contours: &[&[Point]], p: Point) -> i32 {
    let mut winding = 0;
    for contour in contours {
        for i in 0..contour.len() - 1 {
            let a = contour[i];
            let b = contour[i + 1];
            if a.y <= p.y && b.y > p.y {
                if (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) > 0.0 {
                    winding -= 1;
                }
            } else if b.y <= p.y && a.y > p.y {
                if (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) < 0.0 {
                    winding += 1;
                }
            }
        }
    }
    winding
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let len2 = ab.x * ab.x + ab.y * ab.y;
    if len2 == 0.0 {
        return (p - a).length();
    }
    let t = ((p.x - a.x) * ab.x + (p.y - a.y) * ab.y) / len2;
    let t = t.max(0.0).min(1.0);
    (p - point(a.x + ab.x * t, a.y + ab.y * t)).length()
}

fn near_any_edge(p: Point, contours: &[&[Point]], tolerance: f32) -> bool {
    contours.iter().any(|contour| {
        (0..contour.len() - 1)
            .any(|i| distance_to_segment(p, contour[i], contour[i + 1]) < tolerance)
    })
}

/// Small deterministic generator for the Monte-Carlo checks.
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as f32) / ((1u64 << 31) as f32)
    }

    fn point_in(&mut self, bounds: &Rect) -> Point {
        point(
            bounds.origin.x + bounds.size.width * self.next_f32(),
            bounds.origin.y + bounds.size.height * self.next_f32(),
        )
    }
}

fn square() -> Vec<Point> {
    vec![
        point(0.0, 0.0),
        point(1.0, 0.0),
        point(1.0, 1.0),
        point(0.0, 1.0),
        point(0.0, 0.0),
    ]
}

fn bowtie() -> Vec<Point> {
    vec![
        point(0.0, 0.0),
        point(1.0, 1.0),
        point(1.0, 0.0),
        point(0.0, 1.0),
        point(0.0, 0.0),
    ]
}

fn annulus() -> (Vec<Point>, Vec<Point>) {
    let outer = vec![
        point(0.0, 0.0),
        point(4.0, 0.0),
        point(4.0, 4.0),
        point(0.0, 4.0),
        point(0.0, 0.0),
    ];
    let inner = vec![
        point(1.0, 1.0),
        point(1.0, 3.0),
        point(3.0, 3.0),
        point(3.0, 1.0),
        point(1.0, 1.0),
    ];
    (outer, inner)
}

#[test]
fn unit_square_triangulation() {
    let square = square();
    let output = tessellate(
        &[&square],
        FillRule::NonZero,
        TessellationMode::Triangulation,
        &rect(0.0, 0.0, 1.0, 1.0),
    );

    let triangles = triangles_of(&output);
    assert_eq!(triangles.len(), 2);
    assert!((total_area(&output) - 1.0).abs() < 1e-6);

    // The union is exactly the square: every triangle vertex is a
    // square corner.
    for triangle in &triangles {
        for vertex in triangle {
            assert!(square.contains(vertex), "unexpected vertex {:?}", vertex);
        }
    }
}

#[test]
fn bowtie_intersection() {
    let bowtie = bowtie();
    let output = tessellate(
        &[&bowtie],
        FillRule::EvenOdd,
        TessellationMode::Triangulation,
        &rect(0.0, 0.0, 1.0, 1.0),
    );

    let triangles = triangles_of(&output);
    assert_eq!(triangles.len(), 2);
    assert!((total_area(&output) - 0.5).abs() < 1e-5);

    // The self-intersection vertex shows up in the output.
    let center = point(0.5, 0.5);
    let hits = output
        .points
        .iter()
        .filter(|p| (**p - center).length() < 1e-5)
        .count();
    assert!(hits >= 2, "the two triangles should meet at (0.5, 0.5)");
}

#[test]
fn annulus_convex_pieces() {
    let (outer, inner) = annulus();
    let bounds = rect(0.0, 0.0, 4.0, 4.0);
    let output = tessellate(
        &[&outer, &inner],
        FillRule::NonZero,
        TessellationMode::Convex,
        &bounds,
    );

    assert!((total_area(&output) - 12.0).abs() < 1e-4);

    // Every piece turns consistently.
    for contour in output.contours() {
        assert_consistent_turning(contour);
    }

    // The pieces cover the annulus once and only once.
    let mut rng = Lcg::new(42);
    let contours: Vec<&[Point]> = output.contours().collect();
    for _ in 0..10_000 {
        let p = rng.point_in(&bounds);
        if near_any_edge(p, &[&outer, &inner], 1e-2) || near_any_edge(p, &contours, 1e-2) {
            continue;
        }
        let expected = winding_number(&[&outer, &inner], p) != 0;
        let coverage = contours
            .iter()
            .filter(|piece| {
                // Convex containment: on the inner side of every edge.
                let mut inside = true;
                for i in 0..piece.len() {
                    let a = piece[i];
                    let b = piece[(i + 1) % piece.len()];
                    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
                    if cross > 0.0 {
                        inside = false;
                        break;
                    }
                }
                inside
            })
            .count();
        assert_eq!(
            coverage,
            if expected { 1 } else { 0 },
            "wrong coverage at {:?}",
            p
        );
    }
}

fn assert_consistent_turning(contour: &[Point]) {
    let len = contour.len();
    assert!(len >= 3);
    let mut signs = 0;
    for i in 0..len {
        let a = contour[i];
        let b = contour[(i + 1) % len];
        let c = contour[(i + 2) % len];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross > 0.0 {
            signs |= 1;
        } else if cross < 0.0 {
            signs |= 2;
        }
    }
    assert!(signs == 1 || signs == 2, "mixed turning in {:?}", contour);
}

#[test]
fn degenerate_contour_is_dropped() {
    let contour = [point(0.0, 0.0), point(1.0, 0.0), point(1.0, 0.0), point(0.0, 0.0)];
    for &mode in &[
        TessellationMode::Convex,
        TessellationMode::Monotone,
        TessellationMode::Triangulation,
    ] {
        let output = tessellate(
            &[&contour],
            FillRule::NonZero,
            mode,
            &rect(0.0, 0.0, 1.0, 1.0),
        );
        assert_eq!(output.total, 0);
    }
}

#[test]
fn coincident_triangles() {
    let triangle = [point(0.0, 0.0), point(1.0, 0.0), point(0.0, 1.0), point(0.0, 0.0)];
    let bounds = rect(0.0, 0.0, 1.0, 1.0);

    // Two superimposed copies wind twice: present under NonZero, gone
    // under EvenOdd.
    let non_zero = tessellate(
        &[&triangle, &triangle],
        FillRule::NonZero,
        TessellationMode::Triangulation,
        &bounds,
    );
    assert!((total_area(&non_zero) - 0.5).abs() < 1e-5);

    let even_odd = tessellate(
        &[&triangle, &triangle],
        FillRule::EvenOdd,
        TessellationMode::Triangulation,
        &bounds,
    );
    assert_eq!(even_odd.total, 0);
}

#[test]
fn staircase_is_already_monotone() {
    // Five steps down to the right; the whole region is horizontally
    // monotone, so the monotone pass must leave it in one piece.
    let staircase = [
        point(0.0, 0.0),
        point(1.0, 0.0),
        point(1.0, 1.0),
        point(2.0, 1.0),
        point(2.0, 2.0),
        point(3.0, 2.0),
        point(3.0, 3.0),
        point(4.0, 3.0),
        point(4.0, 4.0),
        point(5.0, 4.0),
        point(5.0, 5.0),
        point(0.0, 5.0),
        point(0.0, 0.0),
    ];
    let output = tessellate(
        &[&staircase],
        FillRule::NonZero,
        TessellationMode::Monotone,
        &rect(0.0, 0.0, 5.0, 5.0),
    );

    assert_eq!(output.contours().count(), 1);
    for contour in output.contours() {
        assert_horizontally_monotone(contour);
    }
    assert!((total_area(&output) - 15.0).abs() < 1e-4);
}

/// A contour is horizontally monotone when walking it meets at most
/// one local minimum and one local maximum in sweep order.
fn assert_horizontally_monotone(contour: &[Point]) {
    use crate::geom::point_le;

    let len = contour.len();
    let mut changes = 0;
    for i in 0..len {
        let a = contour[i];
        let b = contour[(i + 1) % len];
        let c = contour[(i + 2) % len];
        if a == b || b == c {
            continue;
        }
        let down_in = point_le(a, b);
        let down_out = point_le(b, c);
        if down_in != down_out {
            changes += 1;
        }
    }
    assert!(changes <= 2, "contour is not monotone: {:?}", contour);
}

#[test]
fn monotone_output_is_monotone() {
    let (outer, inner) = annulus();
    let output = tessellate(
        &[&outer, &inner],
        FillRule::NonZero,
        TessellationMode::Monotone,
        &rect(0.0, 0.0, 4.0, 4.0),
    );

    assert!(output.total > 0);
    for contour in output.contours() {
        assert_horizontally_monotone(contour);
    }
    assert!((total_area(&output) - 12.0).abs() < 1e-4);
}

#[test]
fn triangulation_output_shape() {
    let (outer, inner) = annulus();
    let output = tessellate(
        &[&outer, &inner],
        FillRule::NonZero,
        TessellationMode::Triangulation,
        &rect(0.0, 0.0, 4.0, 4.0),
    );

    for contour in output.contours() {
        assert_eq!(contour.len(), 3);
        // Inside faces all wind the same way (negative shoelace in the
        // y-down coordinate system).
        assert!(signed_area(contour) < 0.0, "flipped triangle {:?}", contour);
    }
    assert!((total_area(&output) - 12.0).abs() < 1e-4);
}

#[test]
fn auto_closed_duplicates_the_first_point() {
    let square = square();
    let polygon = Polygon::from_contours(&[&square], false);
    let mut tess = Tessellator::new();
    tess.set_mode(TessellationMode::Triangulation);
    tess.set_fill_rule(FillRule::NonZero);
    tess.set_auto_closed(true);

    let output = tess.make(&polygon, &rect(0.0, 0.0, 1.0, 1.0)).unwrap();
    for contour in output.contours() {
        assert_eq!(contour.len(), 4);
        assert_eq!(contour[0], contour[3]);
    }
}

#[test]
fn fill_rules_match_scanline_winding() {
    let bowtie = bowtie();
    let bounds = rect(0.0, 0.0, 1.0, 1.0);
    for &rule in &[FillRule::EvenOdd, FillRule::NonZero] {
        let output = tessellate(&[&bowtie], rule, TessellationMode::Triangulation, &bounds);
        let triangles = triangles_of(&output);

        let mut rng = Lcg::new(7);
        let mut checked = 0;
        for _ in 0..20_000 {
            let p = rng.point_in(&bounds);
            if near_any_edge(p, &[&bowtie], 5e-3) {
                continue;
            }
            let winding = winding_number(&[&bowtie], p);
            let expected = match rule {
                FillRule::EvenOdd => winding % 2 != 0,
                FillRule::NonZero => winding != 0,
            };
            let covered = triangles.iter().any(|tri| point_in_triangle(p, tri));
            assert_eq!(covered, expected, "rule {:?} disagrees at {:?}", rule, p);
            checked += 1;
        }
        assert!(checked >= 10_000);
    }
}

#[test]
fn sweep_is_deterministic() {
    let (outer, inner) = annulus();
    let bounds = rect(0.0, 0.0, 4.0, 4.0);
    let first = tessellate(
        &[&outer, &inner],
        FillRule::NonZero,
        TessellationMode::Triangulation,
        &bounds,
    );
    let second = tessellate(
        &[&outer, &inner],
        FillRule::NonZero,
        TessellationMode::Triangulation,
        &bounds,
    );
    assert_eq!(first, second);
}

fn normalized_triangles(output: &Polygon) -> Vec<Vec<(u32, u32)>> {
    let mut triangles: Vec<Vec<(u32, u32)>> = triangles_of(output)
        .iter()
        .map(|tri| {
            let mut t: Vec<(u32, u32)> = tri
                .iter()
                .map(|p| (p.x.to_bits(), p.y.to_bits()))
                .collect();
            t.sort();
            t
        })
        .collect();
    triangles.sort();
    triangles
}

#[test]
fn triangulation_is_idempotent() {
    let square = square();
    let bounds = rect(0.0, 0.0, 1.0, 1.0);
    let first = tessellate(
        &[&square],
        FillRule::NonZero,
        TessellationMode::Triangulation,
        &bounds,
    );

    // Feed the triangles back in as one polygon.
    let contours: Vec<&[Point]> = first.contours().collect();
    let mut closed: Vec<Vec<Point>> = Vec::new();
    for contour in &contours {
        let mut points = contour.to_vec();
        points.push(points[0]);
        closed.push(points);
    }
    let closed_refs: Vec<&[Point]> = closed.iter().map(|c| &c[..]).collect();
    let second = tessellate(
        &closed_refs,
        FillRule::NonZero,
        TessellationMode::Triangulation,
        &bounds,
    );

    assert_eq!(normalized_triangles(&first), normalized_triangles(&second));
}

#[test]
fn winding_is_conserved_after_mesh_construction() {
    let (outer, inner) = annulus();
    let polygon = Polygon::from_contours(&[&outer, &inner], false);

    let mut tess = Tessellator::new();
    assert!(tess.mesh_make(polygon.contours()));

    let mut sum = 0;
    for edge in tess.mesh.edge_ids() {
        sum += tess.mesh.edge_data(edge).winding + tess.mesh.edge_data(edge.sym()).winding;
    }
    assert_eq!(sum, 0);
}

#[test]
fn convex_fast_path_passthrough() {
    let square = square();
    let polygon = Polygon::from_contours(&[&square], true);
    let mut tess = Tessellator::new();
    tess.set_mode(TessellationMode::Convex);

    let output = tess.make(&polygon, &rect(0.0, 0.0, 1.0, 1.0)).unwrap();
    assert_eq!(output, &polygon);
}

#[test]
fn convex_fast_path_triangulation() {
    let pentagon = [
        point(2.0, 0.0),
        point(4.0, 1.5),
        point(3.0, 4.0),
        point(1.0, 4.0),
        point(0.0, 1.5),
        point(2.0, 0.0),
    ];
    let polygon = Polygon::from_contours(&[&pentagon], true);
    let mut tess = Tessellator::new();
    tess.set_mode(TessellationMode::Triangulation);

    let output = tess.make(&polygon, &rect(0.0, 0.0, 4.0, 4.0)).unwrap();
    let triangles = triangles_of(output);
    assert_eq!(triangles.len(), 3);
    assert!((total_area(output) - area(&pentagon[..5])).abs() < 1e-4);
    assert!(output.convex);
}

#[test]
fn empty_input() {
    let mut tess = Tessellator::new();
    let polygon = Polygon::new();
    assert!(tess.make(&polygon, &rect(0.0, 0.0, 1.0, 1.0)).is_none());
}
