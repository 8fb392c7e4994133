//! The tessellator driver: owns the mesh, the sweep state and the
//! output buffers, and sequences the pipeline stages.

use crate::active_region::{ActiveRegions, RegionId};
use crate::event_queue::EventQueue;
use crate::geom;
use crate::math::{Point, Rect};
use crate::mesh::{
    EdgeId, EventMask, FaceId, InsertionOrder, Mesh, MeshEvent, MeshListener, MeshPayloads,
    VertexId,
};
use crate::{FillRule, Options, Polygon, TessellationMode};

/// Per-half-edge sweep state.
#[derive(Clone, Debug, Default)]
pub(crate) struct EdgeAttributes {
    /// Winding contribution of this half-edge: crossing it from right
    /// to left adds this amount to the winding number.
    pub winding: i32,
    /// The active region bounded on the left by this edge, while the
    /// sweep line crosses it.
    pub region: Option<RegionId>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct FaceAttributes {
    pub inside: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct VertexAttributes {
    pub point: Point,
}

impl Default for VertexAttributes {
    fn default() -> Self {
        VertexAttributes {
            point: Point::new(0.0, 0.0),
        }
    }
}

pub(crate) type TessMesh = Mesh<EdgeAttributes, FaceAttributes, VertexAttributes>;

/// The one listener the core installs: carries `winding` across edge
/// splits and `inside` across face splits so that mesh surgery never
/// loses sweep state.
struct AttributePropagator;

impl MeshListener<EdgeAttributes, FaceAttributes, VertexAttributes> for AttributePropagator {
    fn on_mesh_event(
        &mut self,
        event: MeshEvent,
        payloads: &mut MeshPayloads<EdgeAttributes, FaceAttributes, VertexAttributes>,
    ) {
        match event {
            MeshEvent::EdgeSplit(org, dst) => {
                payloads.edge_mut(dst).winding = payloads.edge(org).winding;
                payloads.edge_mut(dst.sym()).winding = payloads.edge(org.sym()).winding;
            }
            MeshEvent::FaceSplit(org, dst) => {
                payloads.face_mut(dst).inside = payloads.face(org).inside;
            }
            _ => debug_assert!(false, "unobserved mesh event: {:?}", event),
        }
    }
}

/// The polygon tessellator.
///
/// A tessellator is reusable: its mesh pools and output buffers survive
/// across [`make`](Tessellator::make) calls and are reset on entry. One
/// instance must not be used concurrently.
pub struct Tessellator {
    pub(crate) mode: TessellationMode,
    pub(crate) rule: FillRule,
    pub(crate) auto_closed: bool,
    pub(crate) log: bool,

    pub(crate) mesh: TessMesh,
    /// The sweep event currently being processed.
    pub(crate) event: VertexId,
    pub(crate) event_queue: EventQueue,
    pub(crate) active_regions: ActiveRegions,

    output: Polygon,
}

impl Tessellator {
    pub fn new() -> Self {
        let mut mesh = TessMesh::new();

        // New edges, faces and vertices land at the head of their lists
        // so that a pass walking a list never revisits what it has just
        // created.
        mesh.set_edge_order(InsertionOrder::InsertHead);
        mesh.set_face_order(InsertionOrder::InsertHead);
        mesh.set_vertex_order(InsertionOrder::InsertHead);

        mesh.set_listener(
            Box::new(AttributePropagator),
            EventMask::EDGE_SPLIT | EventMask::FACE_SPLIT,
        );

        Tessellator {
            mode: TessellationMode::Convex,
            rule: FillRule::EvenOdd,
            auto_closed: false,
            log: false,
            mesh,
            event: VertexId::INVALID,
            event_queue: EventQueue::new(),
            active_regions: ActiveRegions::new(),
            output: Polygon::new(),
        }
    }

    pub fn with_options(options: &Options) -> Self {
        let mut tessellator = Self::new();
        tessellator.set_options(options);
        tessellator
    }

    pub fn mode(&self) -> TessellationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TessellationMode) {
        self.mode = mode;
    }

    pub fn fill_rule(&self) -> FillRule {
        self.rule
    }

    pub fn set_fill_rule(&mut self, rule: FillRule) {
        self.rule = rule;
    }

    pub fn auto_closed(&self) -> bool {
        self.auto_closed
    }

    pub fn set_auto_closed(&mut self, auto_closed: bool) {
        self.auto_closed = auto_closed;
    }

    pub fn set_options(&mut self, options: &Options) {
        self.mode = options.mode;
        self.rule = options.fill_rule;
        self.auto_closed = options.auto_closed;
    }

    /// Enable or disable sweep logging (debug builds only).
    pub fn set_logging(&mut self, is_enabled: bool) {
        self.log = is_enabled;
    }

    /// Tessellates a polygon.
    ///
    /// `bounds` is the polygon's bounding rectangle and must have a
    /// positive size. Returns `None` when the result is empty; when the
    /// input is convex and the mode does not require triangles, the
    /// input polygon is passed through untouched.
    pub fn make<'a>(&'a mut self, polygon: &'a Polygon, bounds: &Rect) -> Option<&'a Polygon> {
        assert!(
            bounds.size.width > 0.0 && bounds.size.height > 0.0,
            "tessellation bounds must have a positive size"
        );
        if polygon.points.is_empty() || polygon.counts.is_empty() {
            return None;
        }

        // Convex input is already monotone and convex.
        if polygon.convex
            && (self.mode == TessellationMode::Convex || self.mode == TessellationMode::Monotone)
        {
            return Some(polygon);
        }

        self.output.clear();

        if polygon.convex {
            // Triangulating each convex contour separately skips the
            // whole sweep.
            for contour in polygon.contours() {
                self.make_from_convex(contour);
            }
        } else {
            self.make_from_concave(polygon, bounds);
        }

        if self.output.total > 0 {
            self.output.counts.push(0);
            self.output.convex = self.mode == TessellationMode::Convex
                || self.mode == TessellationMode::Triangulation;
            Some(&self.output)
        } else {
            None
        }
    }

    fn make_from_convex(&mut self, contour: &[Point]) {
        debug_assert!(self.mode == TessellationMode::Triangulation);

        if !self.mesh_make(std::iter::once(contour)) {
            return;
        }

        debug_assert_eq!(self.mesh.face_count(), 2);

        // For a convex contour every chord lies inside it, so either
        // face triangulates to the same triangles; the head face is as
        // good as any.
        let face = self.mesh.face_head();
        if face.is_valid() {
            self.set_inside(face, true);
        }

        self.triangulation_make();
        self.result_append();
    }

    fn make_from_concave(&mut self, polygon: &Polygon, bounds: &Rect) {
        debug_assert!(!polygon.convex);

        if !self.mesh_make(polygon.contours()) {
            return;
        }

        self.monotone_make(bounds);

        if self.mode == TessellationMode::Convex || self.mode == TessellationMode::Triangulation {
            self.triangulation_make();
            if self.mode == TessellationMode::Convex {
                self.convex_make();
            }
        }

        self.result_append();
    }

    /// Loads closed contours into the (cleared) mesh. Each input edge
    /// starts with a winding of +1 along the contour direction and -1
    /// against it.
    pub(crate) fn mesh_make<'a>(&mut self, contours: impl Iterator<Item = &'a [Point]>) -> bool {
        self.mesh.clear();

        for contour in contours {
            let count = contour.len();
            // Degenerate contours are dropped here if trivially small;
            // zero-length edges go away in the sweep's first pass.
            if count < 3 {
                continue;
            }

            let mut edge = EdgeId::INVALID;
            let mut edge_first = EdgeId::INVALID;
            for (index, &position) in contour.iter().enumerate() {
                if index == 0 {
                    debug_assert!(
                        position == contour[count - 1],
                        "contour of {} points is not closed",
                        count
                    );
                    continue;
                }

                let edge_new = if index + 1 == count {
                    // Close the contour back onto the first edge.
                    let closing = self.mesh.connect(edge, edge_first);
                    self.set_inside(self.mesh.lface(closing), false);
                    self.set_inside(self.mesh.rface(closing), false);
                    closing
                } else if edge_first.is_valid() {
                    self.mesh.append(edge)
                } else {
                    let first = self.mesh.make_edge();
                    edge_first = first;
                    first
                };

                self.set_winding(edge_new, 1);
                self.set_winding(edge_new.sym(), -1);
                self.set_region_of(edge_new, None);
                self.set_region_of(edge_new.sym(), None);
                self.set_point(self.mesh.dst(edge_new), position);

                edge = edge_new;
            }
        }

        #[cfg(debug_assertions)]
        {
            if !self.mesh.is_empty() {
                self.mesh.check();
            }
        }
        !self.mesh.is_empty()
    }

    /// Creates a free-standing mesh edge between two points, with no
    /// winding. Used for the sweep's sentinel edges.
    pub(crate) fn make_mesh_edge(&mut self, org: Point, dst: Point) -> EdgeId {
        let edge = self.mesh.make_edge();
        self.set_winding(edge, 0);
        self.set_winding(edge.sym(), 0);
        self.set_region_of(edge, None);
        self.set_region_of(edge.sym(), None);
        self.set_inside(self.mesh.lface(edge), false);
        self.set_point(self.mesh.org(edge), org);
        self.set_point(self.mesh.dst(edge), dst);
        edge
    }

    /// Walks the finished mesh and appends every inside face's boundary
    /// to the output polygon.
    pub(crate) fn result_append(&mut self) {
        let mut face = self.mesh.face_head();
        while face.is_valid() {
            if self.inside(face) {
                let head = self.mesh.face_edge(face);
                let start = self.output.points.len();
                let mut edge = head;
                let mut count: u16 = 0;
                loop {
                    let position = self.point(self.mesh.org(edge));
                    self.output.points.push(position);
                    count += 1;
                    edge = self.mesh.lnext(edge);
                    if edge == head {
                        break;
                    }
                }

                if count > 2 {
                    if self.auto_closed {
                        let first = self.output.points[start];
                        self.output.points.push(first);
                        count += 1;
                    }
                    self.output.counts.push(count);
                    self.output.total += count as usize;
                } else {
                    self.output.points.truncate(start);
                }
            }
            face = self.mesh.face_next_in_list(face);
        }
    }

    // Sweep-state accessors over the mesh payloads.

    #[inline]
    pub(crate) fn point(&self, v: VertexId) -> Point {
        self.mesh.vertex_data(v).point
    }

    #[inline]
    pub(crate) fn set_point(&mut self, v: VertexId, point: Point) {
        self.mesh.vertex_data_mut(v).point = point;
    }

    #[inline]
    pub(crate) fn winding(&self, e: EdgeId) -> i32 {
        self.mesh.edge_data(e).winding
    }

    #[inline]
    pub(crate) fn set_winding(&mut self, e: EdgeId, winding: i32) {
        self.mesh.edge_data_mut(e).winding = winding;
    }

    /// Folds `other`'s winding into `e` when the two edges are merged
    /// into one.
    pub(crate) fn merge_winding(&mut self, e: EdgeId, other: EdgeId) {
        let winding = self.winding(other);
        self.mesh.edge_data_mut(e).winding += winding;
        let winding_sym = self.winding(other.sym());
        self.mesh.edge_data_mut(e.sym()).winding += winding_sym;
    }

    #[inline]
    pub(crate) fn region_of(&self, e: EdgeId) -> Option<RegionId> {
        self.mesh.edge_data(e).region
    }

    #[inline]
    pub(crate) fn set_region_of(&mut self, e: EdgeId, region: Option<RegionId>) {
        self.mesh.edge_data_mut(e).region = region;
    }

    #[inline]
    pub(crate) fn inside(&self, f: FaceId) -> bool {
        self.mesh.face_data(f).inside
    }

    #[inline]
    pub(crate) fn set_inside(&mut self, f: FaceId, inside: bool) {
        self.mesh.face_data_mut(f).inside = inside;
    }

    #[inline]
    pub(crate) fn winding_is_inside(&self, winding: i32) -> bool {
        self.rule.is_in(winding)
    }

    // Vertex-level geometry predicates.

    #[inline]
    pub(crate) fn vertex_eq(&self, a: VertexId, b: VertexId) -> bool {
        self.point(a) == self.point(b)
    }

    #[inline]
    pub(crate) fn vertex_leq(&self, a: VertexId, b: VertexId) -> bool {
        geom::point_leq(self.point(a), self.point(b))
    }

    #[inline]
    pub(crate) fn vertex_le(&self, a: VertexId, b: VertexId) -> bool {
        geom::point_le(self.point(a), self.point(b))
    }

    #[inline]
    pub(crate) fn vertex_in_top_or_horizontal(&self, a: VertexId, b: VertexId) -> bool {
        geom::in_top_or_horizontal(self.point(a), self.point(b))
    }

    #[inline]
    pub(crate) fn vertex_on_edge(&self, v: VertexId, upper: VertexId, lower: VertexId) -> bool {
        geom::on_segment(self.point(v), self.point(upper), self.point(lower))
    }

    #[inline]
    pub(crate) fn vertex_is_ccw(&self, a: VertexId, b: VertexId, c: VertexId) -> bool {
        geom::is_ccw(self.point(a), self.point(b), self.point(c))
    }

    #[inline]
    pub(crate) fn vertex_in_edge_left(&self, v: VertexId, upper: VertexId, lower: VertexId) -> bool {
        geom::in_segment_left(self.point(v), self.point(upper), self.point(lower))
    }

    #[inline]
    pub(crate) fn vertex_on_edge_or_left(
        &self,
        v: VertexId,
        upper: VertexId,
        lower: VertexId,
    ) -> bool {
        geom::on_segment_or_left(self.point(v), self.point(upper), self.point(lower))
    }

    #[inline]
    pub(crate) fn vertex_in_edge_right(
        &self,
        v: VertexId,
        upper: VertexId,
        lower: VertexId,
    ) -> bool {
        geom::in_segment_right(self.point(v), self.point(upper), self.point(lower))
    }

    #[inline]
    pub(crate) fn vertex_on_edge_or_right(
        &self,
        v: VertexId,
        upper: VertexId,
        lower: VertexId,
    ) -> bool {
        geom::on_segment_or_right(self.point(v), self.point(upper), self.point(lower))
    }

    /// The edge's destination is above its origin in sweep order.
    #[inline]
    pub(crate) fn edge_go_up(&self, e: EdgeId) -> bool {
        geom::in_top_or_hleft(self.point(self.mesh.dst(e)), self.point(self.mesh.org(e)))
    }

    /// The edge's origin is above its destination in sweep order.
    #[inline]
    pub(crate) fn edge_go_down(&self, e: EdgeId) -> bool {
        geom::in_top_or_hleft(self.point(self.mesh.org(e)), self.point(self.mesh.dst(e)))
    }
}

impl Default for Tessellator {
    fn default() -> Self {
        Self::new()
    }
}
