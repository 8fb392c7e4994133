//! The sweep-line state machine.
//!
//! Turns the input mesh into one whose inside faces are all horizontally
//! monotone, with correct insideness marks and winding numbers and no
//! remaining self-intersections:
//!
//! 1. drop degenerate edges and contours,
//! 2. queue every vertex as an event and set up the sentinel regions,
//! 3. sweep the events in `(y, x)` order, maintaining the active-region
//!    list, computing intersections and windings,
//! 4. repair the numerical-error cases the intersection computation can
//!    introduce (region order violations, drifted intersections),
//! 5. reset inside faces that degenerated to two edges.

use crate::active_region::{ActiveRegion, RegionId};
use crate::geom;
use crate::geom::SegmentIntersection;
use crate::math::{point, Point, Rect};
use crate::mesh::{EdgeId, VertexId};
use crate::tessellator::Tessellator;

#[cfg(debug_assertions)]
macro_rules! tess_log {
    ($obj:ident, $fmt:expr) => (
        if $obj.log {
            println!($fmt);
        }
    );
    ($obj:ident, $fmt:expr, $($arg:tt)*) => (
        if $obj.log {
            println!($fmt, $($arg)*);
        }
    );
}

#[cfg(not(debug_assertions))]
macro_rules! tess_log {
    ($obj:ident, $fmt:expr) => {};
    ($obj:ident, $fmt:expr, $($arg:tt)*) => {};
}

impl Tessellator {
    /// Runs the whole sweep. Afterwards every face carries a correct
    /// inside mark and the inside subgraph of the mesh is horizontally
    /// monotone.
    pub(crate) fn monotone_make(&mut self, bounds: &Rect) {
        tess_log!(self, "monotone: bounds: {:?}", bounds);

        self.remove_degenerate_edges();

        if !self.build_event_queue() {
            return;
        }
        if !self.build_active_regions(bounds) {
            return;
        }

        while let Some(event) = self.event_queue.pop() {
            // Merge every vertex at exactly the same position into this
            // event's ring: cheaper than sweeping them one at a time,
            // and required for certain degenerate cases. Safe because
            // zero-length edges are gone.
            loop {
                let next = match self.event_queue.peek() {
                    Some(next) => next,
                    None => break,
                };
                if self.point(next) != self.point(event) {
                    break;
                }
                self.event_queue.pop();
                tess_log!(self, "event: merge: {:?}", self.point(event));
                self.mesh
                    .splice(self.mesh.vertex_edge(event), self.mesh.vertex_edge(next));
            }

            self.sweep_event(event);
        }

        self.remove_degenerate_faces();

        #[cfg(debug_assertions)]
        self.mesh.check();
    }

    fn build_event_queue(&mut self) -> bool {
        self.event_queue.clear();

        let mesh = &self.mesh;
        let queue = &mut self.event_queue;
        let mut vertex = mesh.vertex_head();
        while vertex.is_valid() {
            queue.insert(mesh.vertex_data(vertex).point, vertex);
            vertex = mesh.vertex_next_in_list(vertex);
        }
        !queue.is_empty()
    }

    fn build_active_regions(&mut self, bounds: &Rect) -> bool {
        debug_assert!(bounds.size.width > 0.0 && bounds.size.height > 0.0);
        self.active_regions.clear();

        // Two sentinel regions just outside the bounds; their edges can
        // never interact with real input features.
        let xb = bounds.origin.x - 1.0;
        let yb = bounds.origin.y - 1.0;
        let xe = bounds.origin.x + bounds.size.width + 1.0;
        let ye = bounds.origin.y + bounds.size.height + 1.0;
        self.insert_bounds_region(xb, ye, yb);
        self.insert_bounds_region(xe, ye, yb);

        !self.active_regions.is_empty()
    }

    fn insert_bounds_region(&mut self, x: f32, y_org: f32, y_dst: f32) {
        let edge = self.make_mesh_edge(point(x, y_org), point(x, y_dst));

        // Ordered insertion needs a well-defined current event.
        self.event = self.mesh.dst(edge);

        let region = ActiveRegion {
            edge,
            winding: 0,
            inside: false,
            dirty: false,
            bounds: true,
            fixedge: false,
        };
        self.active_regions.insert(&mut self.mesh, region);
    }

    #[inline]
    fn region_edge(&self, region: RegionId) -> EdgeId {
        self.active_regions.get(region).edge
    }

    #[inline]
    fn region_left_of(&self, region: RegionId) -> RegionId {
        self.active_regions
            .left(region)
            .expect("active region without a left neighbor")
    }

    #[inline]
    fn region_right_of(&self, region: RegionId) -> RegionId {
        self.active_regions
            .right(region)
            .expect("active region without a right neighbor")
    }

    /// Drops zero-length edges and contours that collapsed to fewer
    /// than three edges.
    fn remove_degenerate_edges(&mut self) {
        let mut edge = self.mesh.edge_head();
        while edge.is_valid() {
            let mut edge_next = self.mesh.edge_next_in_list(edge);
            let mut edge_lnext = self.mesh.lnext(edge);

            if self.vertex_eq(self.mesh.org(edge), self.mesh.dst(edge))
                && self.mesh.lnext(edge_lnext) != edge
            {
                tess_log!(self, "remove degenerate edge: {:?}", edge);
                self.mesh.remove(edge);
                edge = edge_lnext;
                edge_lnext = self.mesh.lnext(edge);
            }

            if self.mesh.lnext(edge_lnext) == edge {
                tess_log!(self, "remove degenerate contour at {:?}", edge);
                // One or two edges left in this contour.
                if edge_lnext != edge {
                    if edge_next.is_valid()
                        && (edge_lnext == edge_next || edge_lnext == edge_next.sym())
                    {
                        edge_next = self.mesh.edge_next_in_list(edge_next);
                    }
                    self.mesh.delete(edge_lnext);
                }
                if edge_next.is_valid() && (edge == edge_next || edge == edge_next.sym()) {
                    edge_next = self.mesh.edge_next_in_list(edge_next);
                }
                self.mesh.delete(edge);
            }

            edge = edge_next;
        }
    }

    /// An inside face with only two edges can be produced when the
    /// sweep splices already-processed edges back together; reset it to
    /// outside.
    fn remove_degenerate_faces(&mut self) {
        let mut face = self.mesh.face_head();
        while face.is_valid() {
            let edge = self.mesh.face_edge(face);
            debug_assert!(self.mesh.lnext(edge) != edge);

            if self.inside(face) && self.mesh.lnext(self.mesh.lnext(edge)) == edge {
                tess_log!(self, "reset degenerate face {:?}", face);
                self.set_inside(face, false);
            }
            face = self.mesh.face_next_in_list(face);
        }
    }

    /// Processes one event vertex at the sweep line.
    fn sweep_event(&mut self, event: VertexId) {
        #[cfg(debug_assertions)]
        self.active_regions.check(&self.mesh);

        self.event = event;
        tess_log!(self, "sweep event: {:?} at {:?}", event, self.point(event));

        // Any edge at this event with a region back-pointer is an
        // up-going edge terminating here: its lower endpoint was
        // processed earlier.
        let edge = self.mesh.vertex_edge(event);
        let mut scan = edge;
        let mut region = None;
        loop {
            if let Some(found) = self.region_of(scan) {
                region = Some(found);
                break;
            }
            scan = self.mesh.onext(scan);
            if scan == edge {
                break;
            }
        }

        if let Some(region) = region {
            // Some regions close at this event: finish them, then hand
            // the down-going edges (if any) to the next stage.
            let region_left = self.find_left_top_region(region);
            let region_first = self.region_right_of(region_left);
            let edge_first = self.region_edge(region_first);
            let edge_last = self.finish_top_regions(region_first, None);

            if self.mesh.onext(edge_first) == edge_last {
                self.connect_bottom_event(region_left, edge_first, edge_last);
            } else {
                let edge_head = self.mesh.onext(edge_first);
                self.insert_down_going_edges(
                    region_left,
                    edge_head,
                    edge_last,
                    Some(edge_first),
                    true,
                );
            }
        } else {
            // All edges are new and go down: a fresh top vertex.
            self.connect_top_event(event);
        }
    }

    /// Finds the region left of the leftmost region whose edge starts
    /// at the current event; replaces a temporary left edge with a real
    /// connection on the way.
    fn find_left_top_region(&mut self, region: RegionId) -> RegionId {
        let org = self.mesh.org(self.region_edge(region));

        let mut region_left = region;
        loop {
            region_left = self.region_left_of(region_left);
            if self.mesh.org(self.region_edge(region_left)) != org {
                break;
            }
        }

        if self.active_regions.get(region_left).fixedge {
            tess_log!(self, "fix the left edge: {:?}", self.region_edge(region_left));

            // Connect the event to the temporary edge, then substitute
            // the new edge for it.
            let region_first = self.region_right_of(region_left);
            let edge_new = self.mesh.connect(
                self.mesh.lprev(self.region_edge(region_first)),
                self.region_edge(region_left).sym(),
            );
            self.fix_region_edge(region_left, edge_new);
            region_left = self.region_left_of(region_left);
        }
        region_left
    }

    /// Finds the region left of the leftmost region whose edge ends at
    /// the same destination as `region`'s edge.
    fn find_left_bottom_region(&self, region: RegionId) -> RegionId {
        let dst = self.mesh.dst(self.region_edge(region));

        let mut region_left = region;
        loop {
            region_left = self.region_left_of(region_left);
            if self.mesh.dst(self.region_edge(region_left)) != dst {
                break;
            }
        }
        region_left
    }

    /// Replaces the temporary edge of a fixable region by a real one.
    fn fix_region_edge(&mut self, region: RegionId, edge: EdgeId) {
        debug_assert!(self.active_regions.get(region).fixedge);
        tess_log!(self, "fix a temporary edge: {:?} => {:?}", region, edge);

        self.mesh.delete(self.region_edge(region));

        let r = self.active_regions.get_mut(region);
        r.edge = edge;
        r.fixedge = false;
        self.set_region_of(edge, Some(region));
    }

    fn insert_region_at_right(&mut self, region_left: RegionId, edge_new: EdgeId) -> RegionId {
        let region = ActiveRegion {
            edge: edge_new,
            winding: 0,
            inside: false,
            dirty: false,
            bounds: false,
            fixedge: false,
        };
        self.active_regions
            .insert_after(&mut self.mesh, region_left, region)
    }

    /// Inserts the down-going edges in the onext range `[head, tail)`
    /// (the full ring when `head == tail`) as new active regions, and
    /// updates winding numbers and mesh connectivity.
    ///
    /// All the edges must leave the current event. `edge_left_top` must
    /// be given when the event has up-going edges already processed.
    fn insert_down_going_edges(
        &mut self,
        region_left: RegionId,
        edge_head: EdgeId,
        edge_tail: EdgeId,
        edge_left_top: Option<EdgeId>,
        fix_dirty_regions: bool,
    ) {
        // Insert a region per edge; the edge is stored reversed so the
        // region's edge goes up.
        let mut edge = edge_head;
        loop {
            debug_assert!(self.edge_go_down(edge), "not a down-going edge: {:?}", edge);
            tess_log!(self, "insert down-going edge: {:?}", edge);
            self.insert_region_at_right(region_left, edge.sym());
            edge = self.mesh.onext(edge);
            if edge == edge_tail {
                break;
            }
        }

        let edge_left_top = match edge_left_top {
            Some(edge) => edge,
            None => {
                let region_new_leftmost = self.region_right_of(region_left);
                self.mesh.lnext(self.region_edge(region_new_leftmost))
            }
        };

        let mut is_first = true;
        let mut region_prev = region_left;
        let mut edge_prev = edge_left_top;
        let mut region_new;
        let mut edge_new;
        loop {
            region_new = self.region_right_of(region_prev);
            edge_new = self.region_edge(region_new).sym();

            // The origins of all the down-going edges must coincide.
            if self.mesh.org(edge_new) != self.mesh.org(edge_prev) {
                break;
            }

            /* Join the two edges if they are disjoint in the ring while
             * sharing the origin:
             *
             *     . . . . org . . . .          . . . . org . . . .
             *          .                =>          .   .
             *       .      org . . .             .       . . . .
             *    .           .                .           .
             *  edge_prev      edge_new      edge_prev      edge_new
             */
            if self.mesh.onext(edge_prev) != edge_new {
                tess_log!(self, "join down-going edges with the same origin");
                self.mesh.splice(self.mesh.oprev(edge_new), edge_new);
                self.mesh.splice(edge_prev, edge_new);
            }
            debug_assert!(self.mesh.onext(edge_prev) == edge_new);

            // region_new.winding = region_prev.winding + region_new.edge.winding
            //                                        => - edge_new.winding
            let winding = self.active_regions.get(region_prev).winding - self.winding(edge_new);
            let inside = self.winding_is_inside(winding);
            {
                let region = self.active_regions.get_mut(region_new);
                region.winding = winding;
                region.inside = inside;
            }

            // Re-examined for intersections below.
            self.active_regions.get_mut(region_prev).dirty = true;

            // Coalesce two new edges with the same slope before any
            // intersection computation; the survivor takes the combined
            // winding.
            if !is_first && self.fix_region_order_at_bottom(region_prev) {
                self.merge_winding(edge_new, edge_prev);
                self.active_regions.remove(&mut self.mesh, region_prev);
                self.mesh.delete(edge_prev);
            }

            is_first = false;
            edge_prev = edge_new;
            region_prev = region_new;
        }

        self.active_regions.get_mut(region_prev).dirty = true;
        debug_assert!(
            self.active_regions.get(region_new).winding
                == self.active_regions.get(region_prev).winding - self.winding(edge_new)
        );

        if fix_dirty_regions {
            self.fix_all_dirty_regions(region_prev);
        }
    }

    /// Finishes one region closing at the current event: its face takes
    /// the region's insideness and the region leaves the active list.
    fn finish_top_region(&mut self, region: RegionId) {
        tess_log!(self, "finish region: {:?}", region);

        let edge = self.region_edge(region);
        let face = self.mesh.rface(edge);
        let inside = self.active_regions.get(region).inside;
        self.set_inside(face, inside);

        /* Park the face edge at the bottommost right edge; the
         * triangulator finds the extremes of the face faster that way.
         *
         *     .      .
         *    .       .
         *      .   . right => face.edge
         * left   .
         */
        let parked = self.mesh.oprev(edge);
        self.mesh.set_face_edge(face, parked);

        self.active_regions.remove(&mut self.mesh, region);
    }

    /// Finishes all top regions of the current event, walking right
    /// from `region_head` up to `region_tail` (or as far as regions
    /// keep ending at the event when `None`). Adjacent up-going edges
    /// that share the event without being ring-adjacent are spliced
    /// together; a dangling temporary edge is replaced by a real
    /// connection to the event. Returns the last edge.
    fn finish_top_regions(
        &mut self,
        region_head: RegionId,
        region_tail: Option<RegionId>,
    ) -> EdgeId {
        let mut region = region_head;
        let mut edge = self.region_edge(region);

        while Some(region) != region_tail {
            // Once a region closes here, its temporary mark is moot.
            self.active_regions.get_mut(region).fixedge = false;

            let region_next = self.region_right_of(region);
            let mut edge_next = self.region_edge(region_next);

            if self.mesh.org(edge_next) != self.mesh.org(edge) {
                if !self.active_regions.get(region_next).fixedge {
                    self.finish_top_region(region);
                    break;
                }

                // The temporary edge ends away from the event: connect
                // a real edge to the event and substitute it.
                tess_log!(self, "fix the top edge: {:?}", edge_next);
                let edge_new = self
                    .mesh
                    .connect(edge_next, self.mesh.oprev(edge))
                    .sym();
                self.fix_region_edge(region_next, edge_new);
                edge_next = edge_new;
            }

            // Make the two up-going edges adjacent in the event's ring;
            // this closes degenerate faces left by earlier fixes.
            if self.mesh.onext(edge_next) != edge {
                tess_log!(self, "join up-going edges with the same origin");
                self.mesh.splice(self.mesh.oprev(edge_next), edge_next);
                self.mesh.splice(self.mesh.oprev(edge), edge_next);
            }
            debug_assert!(self.mesh.onext(edge_next) == edge);

            self.finish_top_region(region);

            // The next region's edge may have been substituted above.
            edge = self.region_edge(region_next);
            region = region_next;
        }

        edge
    }

    /// Connects a fresh top vertex to the processed portion of the
    /// mesh.
    fn connect_top_event(&mut self, event: VertexId) {
        tess_log!(self, "connect top event: {:?}", self.point(event));

        let edge_event = self.mesh.vertex_edge(event);
        let edge_event_up = edge_event.sym();

        // The up-going half straddles the event, so this finds the
        // region containing it.
        let region_left = self
            .active_regions
            .find(&self.mesh, edge_event_up)
            .expect("no active region contains the event");
        let region_right = self.region_right_of(region_left);
        let edge_left = self.region_edge(region_left);
        let edge_right = self.region_edge(region_right);

        // The event may lie exactly on the left edge.
        if self.vertex_on_edge(event, self.mesh.dst(edge_left), self.mesh.org(edge_left)) {
            self.connect_top_event_degenerate(region_left, event);
            return;
        }

        let region_lower = if self
            .vertex_in_top_or_horizontal(self.mesh.dst(edge_left), self.mesh.dst(edge_right))
        {
            region_right
        } else {
            region_left
        };

        if self.active_regions.get(region_left).inside
            || self.active_regions.get(region_lower).fixedge
        {
            /* The containing region is inside: keep it monotone by
             * splitting it, connecting the event up to the lower of the
             * two bounding destinations.
             *
             * . . . . . . . . .      . . . . . . . . .
             * .     inside    .      . .             .
             * .               .  =>  .   .           .
             * .     e . . --- . ---- . --- e . . --- . --- sweep line
             * .     .   .     .      .     .   .     .
             * .     . . .     .      .     . . .     .
             * . . . . . . . . .      . . . . . . . . .
             */
            tess_log!(self, "split the region: {:?}", region_left);
            let edge_new = if region_lower == region_left {
                self.mesh
                    .connect(self.mesh.dnext(edge_left), edge_event)
                    .sym()
            } else {
                self.mesh.connect(edge_event_up, self.mesh.lnext(edge_right))
            };

            if self.active_regions.get(region_lower).fixedge {
                // The connection the temporary edge was waiting for.
                self.fix_region_edge(region_lower, edge_new);
            } else {
                let region_new = self.insert_region_at_right(region_left, edge_new);
                debug_assert!(self.active_regions.in_left(&self.mesh, region_left, region_new));
                debug_assert!(self.active_regions.in_left(&self.mesh, region_new, region_right));

                let winding =
                    self.active_regions.get(region_left).winding + self.winding(edge_new);
                let inside = self.winding_is_inside(winding);
                let region = self.active_regions.get_mut(region_new);
                region.winding = winding;
                region.inside = inside;

                tess_log!(self, "insert edge: {:?} to region: {:?}", edge_new, region_new);
            }

            // Re-sweep so the down-going edges are inserted in a normal
            // pass against the split region.
            self.sweep_event(event);
        } else {
            // The containing region is outside: the new edges just go
            // in.
            self.insert_down_going_edges(region_left, edge_event, edge_event, None, true);
        }
    }

    /// The event lies exactly on an already-processed edge or vertex of
    /// the left bounding edge.
    fn connect_top_event_degenerate(&mut self, region: RegionId, event: VertexId) {
        tess_log!(self, "connect degenerate top event: {:?}", self.point(event));

        let edge = self.region_edge(region);

        if self.vertex_eq(self.mesh.org(edge), event) {
            // On the origin, which is an unprocessed vertex (a finished
            // origin would have closed this region): only merge the
            // rings and wait for that vertex's own event.
            tess_log!(self, "merge the event into the origin of {:?}", edge);
            self.mesh.splice(edge, self.mesh.vertex_edge(event));
            return;
        }

        if self.vertex_eq(self.mesh.dst(edge), event) {
            // On the destination, already processed: merge the new
            // down-going edges into that vertex's ring.
            tess_log!(self, "merge the event into the destination of {:?}", edge);

            let region_left = self.find_left_bottom_region(region);
            let region_first = self.region_right_of(region_left);
            let mut edge_first = self.region_edge(region_first).sym();
            let edge_left_top = self.mesh.oprev(edge_first);

            // Real down-going edges arrive now, so a temporary edge
            // ending here has no job left.
            if self.active_regions.get(region).fixedge {
                tess_log!(self, "drop the fixable edge: {:?}", edge);
                debug_assert!(edge_first != edge_left_top);
                self.active_regions.remove(&mut self.mesh, region_first);
                self.mesh.delete(edge_first);
                edge_first = self.mesh.onext(edge_left_top);
            }

            // Merge so the ring order becomes
            // edge_left_top -> new down-going edges -> edge_first.
            self.mesh
                .splice(self.mesh.vertex_edge(event), edge_left_top);
            debug_assert!(self.mesh.org(edge_left_top) == event);
            debug_assert!(self.mesh.onext(edge_left_top) != edge_first);

            let left_top = if self.edge_go_up(edge_left_top) {
                Some(edge_left_top)
            } else {
                None
            };
            let edge_head = self.mesh.onext(edge_left_top);
            self.insert_down_going_edges(region_left, edge_head, edge_first, left_top, true);
            return;
        }

        // Strictly in the edge's interior: split it at the event and
        // merge the event into the ring, then process the event again
        // with an up-going edge present.
        tess_log!(self, "merge the event into the body of {:?}", edge);
        let edge_new = self.mesh.split(edge.sym());
        debug_assert!(edge_new == self.mesh.onext(edge));

        if self.active_regions.get(region).fixedge {
            // The piece below the event would be a second temporary
            // edge; the real down-going edges cover it.
            tess_log!(self, "drop the split piece of the fixable edge: {:?}", edge);
            self.mesh.delete(edge_new);
            self.active_regions.get_mut(region).fixedge = false;
        }

        self.mesh.splice(self.mesh.vertex_edge(event), edge);
        debug_assert!(self.mesh.org(edge) == event);
        self.sweep_event(event);
    }

    /// Connects a bottom event: the event has up-going edges but no
    /// down-going ones, so two live regions are about to merge into
    /// one.
    ///
    /// If the merged region were inside, it would no longer be
    /// monotone, so a temporary down-going edge is patched in toward
    /// the topmost unseen vertex of either chain and marked `fixedge`;
    /// it is replaced as soon as the sweep learns the real connection.
    fn connect_bottom_event(
        &mut self,
        region_left: RegionId,
        edge_first: EdgeId,
        edge_last: EdgeId,
    ) {
        tess_log!(self, "connect bottom event: {:?}", self.point(self.event));

        let region_right = self.region_right_of(region_left);
        let edge_left = self.region_edge(region_left);
        let edge_right = self.region_edge(region_right);

        // Surface any crossing of the two bounding edges strictly above
        // the event before merging.
        if self.mesh.dst(edge_left) != self.mesh.dst(edge_right) {
            tess_log!(self, "fix intersection of {:?} x {:?}", edge_left, edge_right);
            self.fix_region_intersection(region_left);
        }

        let event = self.event;
        let mut region_left = region_left;
        let mut edge_first = edge_first;
        let mut edge_last = edge_last;
        let mut is_degenerate = false;

        // The left edge may pass exactly through the event (or coincide
        // with an intersection vertex computed just above).
        if self.vertex_eq(event, self.mesh.org(edge_left)) {
            debug_assert!(event != self.mesh.org(edge_left));
            tess_log!(self, "merge the event into the origin of {:?}", edge_left);

            // That origin may be a pending intersection event.
            self.event_queue.remove(self.mesh.org(edge_left));
            self.mesh.splice(edge_first, self.mesh.oprev(edge_left));
            debug_assert!(self.mesh.org(edge_left) == event);
            debug_assert!(self.mesh.org(edge_first) == event);

            region_left = self.find_left_top_region(region_left);
            let region_first = self.region_right_of(region_left);
            edge_first = self.region_edge(region_first);
            self.finish_top_regions(region_first, Some(region_right));
            is_degenerate = true;
        }

        // Symmetric case on the right edge.
        if self.vertex_eq(event, self.mesh.org(edge_right)) {
            debug_assert!(event != self.mesh.org(edge_right));
            tess_log!(self, "merge the event into the origin of {:?}", edge_right);

            self.event_queue.remove(self.mesh.org(edge_right));
            self.mesh.splice(self.mesh.oprev(edge_last), edge_right);
            debug_assert!(self.mesh.org(edge_first) == event);
            debug_assert!(self.mesh.org(edge_right) == event);

            edge_last = self.finish_top_regions(region_right, None);
            is_degenerate = true;
        }

        if is_degenerate {
            let edge_head = self.mesh.onext(edge_first);
            self.insert_down_going_edges(region_left, edge_head, edge_last, Some(edge_first), true);
            return;
        }

        debug_assert!(self.mesh.lprev(edge_first) == edge_last.sym());

        /* Patch a temporary edge from the event down to the topmost of
         * the two neighbor origins.
         *
         *         .         .         .         .         .
         *          .      .   *       .       .   *      *
         *           .       e ----- . --------- e ----- * -- sweep line
         *            .      *      .     or     * face *
         * edge_new -- . - *  face .              *   *
         *              *         .                 *
         */
        let target = if self
            .vertex_in_top_or_horizontal(self.mesh.org(edge_left), self.mesh.org(edge_right))
        {
            self.mesh.oprev(edge_left)
        } else {
            edge_right
        };
        let edge_new = self.mesh.connect(edge_last.sym(), target);
        debug_assert!(self.mesh.onext(edge_new) == edge_last);

        // Delay the dirty fixing until the new region carries its
        // temporary mark.
        self.insert_down_going_edges(region_left, edge_new, edge_last, Some(edge_first), false);

        let region_new = self
            .region_of(edge_new.sym())
            .expect("the patched edge has no region");
        self.active_regions.get_mut(region_new).fixedge = true;

        self.fix_all_dirty_regions(region_new);
        tess_log!(self, "patched a temporary edge: {:?}", edge_new.sym());
    }

    /// Repairs the region order when splitting an edge has moved a
    /// destination to the wrong side of its neighbor. Produces one
    /// degenerate two-edge face that the caller's pipeline cleans up.
    fn fix_region_order_at_top(&mut self, region_left: RegionId) -> bool {
        let region_right = self.region_right_of(region_left);
        let edge_left = self.region_edge(region_left);
        let edge_right = self.region_edge(region_right);
        let edge_left_dst = self.mesh.dst(edge_left);
        let edge_right_dst = self.mesh.dst(edge_right);

        debug_assert!(!self.vertex_eq(edge_left_dst, edge_right_dst));

        if self.vertex_le(edge_right_dst, edge_left_dst) {
            // Order is fine while the left destination stays left of
            // the right edge.
            if self.vertex_in_edge_left(edge_left_dst, edge_right_dst, self.mesh.org(edge_right)) {
                return false;
            }

            self.active_regions.get_mut(region_left).dirty = true;
            self.active_regions.get_mut(region_right).dirty = true;

            // Split the right edge and splice the left destination into
            // it, so both edges end at the left destination.
            let edge_new = self.mesh.split(edge_right);
            self.mesh.splice(edge_left.sym(), edge_new);

            debug_assert!(self.mesh.org(edge_new) == edge_left_dst);
            debug_assert!(self.mesh.dst(edge_left) == edge_left_dst);
            debug_assert!(self.mesh.dst(edge_right) == edge_left_dst);

            // Only region_left's insideness is known to be valid here.
            let inside = self.active_regions.get(region_left).inside;
            self.set_inside(self.mesh.lface(edge_new), inside);
        } else {
            if self.vertex_in_edge_right(edge_right_dst, edge_left_dst, self.mesh.org(edge_left)) {
                return false;
            }

            let region_left2 = self.region_left_of(region_left);
            self.active_regions.get_mut(region_left).dirty = true;
            self.active_regions.get_mut(region_left2).dirty = true;

            let edge_new = self.mesh.split(edge_left);
            self.mesh.splice(self.mesh.lnext(edge_right), edge_left.sym());

            debug_assert!(self.mesh.org(edge_new) == edge_right_dst);
            debug_assert!(self.mesh.dst(edge_left) == edge_right_dst);
            debug_assert!(self.mesh.dst(edge_right) == edge_right_dst);

            let inside = self.active_regions.get(region_left).inside;
            self.set_inside(self.mesh.rface(edge_new), inside);
        }

        tess_log!(self, "fixed the top order for region: {:?}", region_left);
        true
    }

    /// Splices down-going edges with (nearly) the same bottom endpoint
    /// so their origins coincide. Returns true when the two edges now
    /// share both endpoints, in which case the caller collapses the
    /// degenerate two-edge loop.
    fn fix_region_order_at_bottom(&mut self, region_left: RegionId) -> bool {
        let region_right = self.region_right_of(region_left);
        let edge_left = self.region_edge(region_left);
        let edge_right = self.region_edge(region_right);
        let edge_left_org = self.mesh.org(edge_left);
        let edge_right_org = self.mesh.org(edge_right);

        if self.vertex_leq(edge_left_org, edge_right_org) {
            if self.vertex_in_edge_left(
                edge_left_org,
                self.mesh.dst(edge_right),
                edge_right_org,
            ) {
                return false;
            }

            if !self.vertex_eq(edge_left_org, edge_right_org) {
                self.active_regions.get_mut(region_left).dirty = true;
                self.active_regions.get_mut(region_right).dirty = true;

                // Split the right edge and pull its origin up onto the
                // left origin.
                self.mesh.split(edge_right.sym());
                self.mesh.splice(self.mesh.oprev(edge_left), edge_right);

                debug_assert!(self.mesh.org(edge_left) == edge_left_org);
                debug_assert!(self.mesh.org(edge_right) == edge_left_org);
            } else if edge_left_org != edge_right_org {
                // Same position, distinct vertices: collapse them and
                // drop the obsolete event.
                tess_log!(self, "splice and remove the event vertex: {:?}", edge_left_org);
                self.event_queue.remove(edge_left_org);
                self.mesh
                    .splice(edge_right, self.mesh.oprev(edge_left));
            } else {
                // Already sharing the origin; report whether the edges
                // coincide entirely so one of them can be removed.
                return self.mesh.dst(edge_left) == self.mesh.dst(edge_right);
            }
        } else {
            if self.vertex_in_edge_right(
                edge_right_org,
                self.mesh.dst(edge_left),
                edge_left_org,
            ) {
                return false;
            }

            let region_left2 = self.region_left_of(region_left);
            self.active_regions.get_mut(region_left).dirty = true;
            self.active_regions.get_mut(region_left2).dirty = true;

            let edge_new = self.mesh.split(edge_left.sym());
            debug_assert!(edge_new == self.mesh.oprev(edge_left));
            self.mesh.splice(edge_right, edge_new);

            debug_assert!(self.mesh.org(edge_left) == edge_right_org);
            debug_assert!(self.mesh.org(edge_right) == edge_right_org);
        }

        tess_log!(self, "fixed the bottom order for region: {:?}", region_left);
        true
    }

    /// Finds and patches the intersection of a region's two bounding
    /// edges. Returns true when the fix re-entered
    /// `insert_down_going_edges` (regions may have moved and the caller
    /// must restart).
    fn fix_region_intersection(&mut self, region_left: RegionId) -> bool {
        let event = self.event;
        let region_right = self.region_right_of(region_left);
        let edge_left = self.region_edge(region_left);
        let edge_right = self.region_edge(region_right);
        let edge_left_org = self.mesh.org(edge_left);
        let edge_left_dst = self.mesh.dst(edge_left);
        let edge_right_org = self.mesh.org(edge_right);
        let edge_right_dst = self.mesh.dst(edge_right);

        debug_assert!(!self.vertex_eq(edge_left_dst, edge_right_dst));
        debug_assert!(self.vertex_on_edge_or_right(event, edge_left_dst, edge_left_org));
        debug_assert!(self.vertex_on_edge_or_left(event, edge_right_dst, edge_right_org));
        debug_assert!(event != edge_left_org && event != edge_right_org);
        debug_assert!(
            !self.active_regions.get(region_left).fixedge
                && !self.active_regions.get(region_right).fixedge
        );

        // Nothing to do when the bottom endpoints coincide.
        if edge_left_org == edge_right_org {
            return false;
        }

        let left_org = self.point(edge_left_org);
        let left_dst = self.point(edge_left_dst);
        let right_org = self.point(edge_right_org);
        let right_dst = self.point(edge_right_dst);

        // Cheap rejection: disjoint x ranges.
        let edge_left_max_x = left_org.x.max(left_dst.x);
        let edge_right_min_x = right_org.x.min(right_dst.x);
        if edge_left_max_x < edge_right_min_x {
            return false;
        }

        // Cheap rejection: one edge entirely on the outer side of the
        // other's span.
        if geom::in_top_or_horizontal(left_org, right_org) {
            if geom::in_segment_left(left_org, right_dst, right_org) {
                return false;
            }
        } else if geom::in_segment_right(right_org, left_dst, left_org) {
            return false;
        }

        let mut intersection =
            match geom::segment_intersection(left_org, left_dst, right_org, right_dst) {
                SegmentIntersection::Point(p) => p,
                SegmentIntersection::NearParallel => {
                    // Nearly identical slopes: the ordering fix covers
                    // it.
                    self.fix_region_order_at_bottom(region_left);
                    return false;
                }
                SegmentIntersection::None => return false,
            };

        tess_log!(
            self,
            "intersection: {:?} x {:?} => {:?}",
            edge_left,
            edge_right,
            intersection
        );
        debug_assert!(intersection.x >= edge_right_min_x);
        debug_assert!(intersection.x <= edge_left_max_x);
        debug_assert!(intersection.y >= left_dst.y.max(right_dst.y));
        debug_assert!(intersection.y <= left_org.y.min(right_org.y));

        let event_point = self.point(event);

        // An intersection that drifted above the sweep line would never
        // be processed: clamp it back to the event, or to the upper
        // origin's height when an edge is nearly horizontal.
        if geom::in_top_or_hleft(intersection, event_point) {
            tess_log!(self, "clamp the intersection to the event: {:?}", event_point);
            if geom::near_zero(intersection.x - event_point.x) {
                intersection = event_point;
            } else {
                intersection.y = left_org.y.min(right_org.y);
            }
        }

        // Same for an intersection that drifted below the topmost of
        // the two origins.
        let upper = if geom::in_top_or_horizontal(left_org, right_org) {
            left_org
        } else {
            right_org
        };
        if geom::in_top_or_hleft(upper, intersection) {
            tess_log!(self, "clamp the intersection to the topmost origin: {:?}", upper);
            if geom::near_zero(intersection.x - upper.x) {
                intersection = upper;
            } else {
                intersection.y = upper.y;
            }
        }

        // Intersecting exactly at a bottom endpoint is an ordering
        // problem, not a crossing.
        if intersection == left_org || intersection == right_org {
            tess_log!(self, "intersection at an origin: splice the edges");
            self.fix_region_order_at_bottom(region_left);
            return false;
        }

        // The event ending up on the wrong side of a destination
        // relative to the intersection is one of four numerical-error
        // cases with dedicated repairs.
        if (event_point != left_dst
            && geom::on_segment_or_left(event_point, left_dst, intersection))
            || (event_point != right_dst
                && geom::on_segment_or_right(event_point, right_dst, intersection))
        {
            return self.fix_region_intersection_errors(region_left, region_right, intersection);
        }

        /* The general case: split both edges, splice the splits into a
         * shared intersection vertex and queue it as a new event.
         *
         * edge_left
         *       .
         *         .    region_left    . edge_right
         *           .              .
         *             .  event  . ------- sweep line
         *               .    .
         *                 x ------- intersection (queued)
         *              .     .
         *           .          .
         */
        self.mesh.split(edge_left.sym());
        self.mesh.split(edge_right.sym());
        self.mesh.splice(self.mesh.oprev(edge_left), edge_right);
        debug_assert!(self.mesh.org(edge_left) == self.mesh.org(edge_right));

        self.set_point(self.mesh.org(edge_right), intersection);
        tess_log!(self, "insert the new intersection: {:?}", intersection);
        self.event_queue.insert(intersection, self.mesh.org(edge_right));

        let region_left2 = self.region_left_of(region_left);
        self.active_regions.get_mut(region_left).dirty = true;
        self.active_regions.get_mut(region_right).dirty = true;
        self.active_regions.get_mut(region_left2).dirty = true;

        false
    }

    /// The four numerical-error cases of the intersection computation,
    /// where the computed point lands on the wrong side of the event.
    /// Returns true when the repair re-entered
    /// `insert_down_going_edges`.
    fn fix_region_intersection_errors(
        &mut self,
        region_left: RegionId,
        region_right: RegionId,
        intersection: Point,
    ) -> bool {
        let event = self.event;
        let edge_left = self.region_edge(region_left);
        let edge_right = self.region_edge(region_right);
        let edge_left_dst = self.mesh.dst(edge_left);
        let edge_right_dst = self.mesh.dst(edge_right);

        // Case 1: the event is the right edge's destination. Split the
        // left edge at the event, making the event the real
        // intersection, then finish the newly exposed top regions and
        // insert the split-off piece as a down-going edge.
        if event == edge_right_dst {
            tess_log!(self, "fix intersection error: at the right destination");

            let edge_new = self.mesh.split(edge_left.sym());
            self.mesh.splice(self.mesh.lnext(edge_right), edge_new);
            debug_assert!(self.mesh.org(edge_new) == event);
            debug_assert!(self.mesh.org(edge_left) == event);
            debug_assert!(self.mesh.dst(edge_right) == event);

            let region_left = self.find_left_top_region(region_left);
            let region_first = self.region_right_of(region_left);
            let edge_left_top = self.region_edge(region_first);
            self.finish_top_regions(region_first, Some(region_right));

            debug_assert!(self.mesh.onext(edge_left_top) == edge_new);
            let edge_tail = self.mesh.onext(edge_new);
            self.insert_down_going_edges(region_left, edge_new, edge_tail, Some(edge_left_top), true);

            // All dirty regions are fixed and regions may be gone:
            // return straight out of the recursion.
            return true;
        }

        // Case 2: symmetric, the event is the left edge's destination.
        if event == edge_left_dst {
            tess_log!(self, "fix intersection error: at the left destination");

            let edge_new = self.mesh.split(edge_right.sym());
            debug_assert!(self.mesh.onext(edge_new) == edge_right);
            self.mesh.splice(edge_left.sym(), edge_right);
            debug_assert!(self.mesh.org(edge_new) == event);
            debug_assert!(self.mesh.org(edge_right) == event);
            debug_assert!(self.mesh.dst(edge_left) == event);

            // The old left region's face may have been merged away by
            // the splice; re-finish it through a patched region so its
            // winding and insideness come out right.
            let region_patch = region_left;
            let region_left = self.find_left_bottom_region(region_left);
            self.active_regions.get_mut(region_patch).edge = self.mesh.onext(edge_right);
            self.finish_top_regions(region_patch, None);

            debug_assert!(self.mesh.onext(edge_left.sym()) == edge_new);
            let edge_tail = self.mesh.onext(edge_new);
            self.insert_down_going_edges(region_left, edge_left.sym(), edge_tail, None, true);
            return true;
        }

        let event_point = self.point(event);

        // Case 3: the event sits on or left of the left destination
        // relative to the intersection. Split the left edge and replace
        // the intersection by the event; connect_bottom_event will
        // splice things back together.
        if geom::on_segment_or_left(event_point, self.point(edge_left_dst), intersection) {
            tess_log!(self, "fix intersection error: left of the event");

            let region_left2 = self.region_left_of(region_left);
            self.active_regions.get_mut(region_left).dirty = true;
            self.active_regions.get_mut(region_left2).dirty = true;

            self.mesh.split(edge_left.sym());
            self.set_point(self.mesh.org(edge_left), event_point);
        }

        // Case 4: symmetric, on or right of the right destination.
        if geom::on_segment_or_right(event_point, self.point(edge_right_dst), intersection) {
            tess_log!(self, "fix intersection error: right of the event");

            self.active_regions.get_mut(region_left).dirty = true;
            self.active_regions.get_mut(region_right).dirty = true;

            self.mesh.split(edge_right.sym());
            self.set_point(self.mesh.org(edge_right), event_point);
        }

        // The rest is handled by connect_bottom_event.
        false
    }

    /// Fixes every dirty region, walking outward-in until none remain;
    /// fixing can dirty further regions, which are picked up on the
    /// way.
    fn fix_all_dirty_regions(&mut self, region_left: RegionId) {
        let mut region_left = region_left;
        let mut region_right = self.region_right_of(region_left);

        loop {
            // Start from the rightmost dirty region; repairs may dirty
            // regions on either side.
            while self.active_regions.get(region_right).dirty {
                region_left = region_right;
                region_right = self.region_right_of(region_right);
            }
            if !self.active_regions.get(region_left).dirty {
                region_right = region_left;
                region_left = match self.active_regions.left(region_left) {
                    Some(left) if self.active_regions.get(left).dirty => left,
                    _ => return,
                };
            }

            self.active_regions.get_mut(region_left).dirty = false;
            let mut edge_left = self.region_edge(region_left);
            let mut edge_right = self.region_edge(region_right);
            tess_log!(self, "fix dirty regions: {:?} | {:?}", region_left, region_right);

            // Top order first: a previous split may have pushed a
            // destination across its neighbor.
            if self.mesh.dst(edge_left) != self.mesh.dst(edge_right)
                && self.fix_region_order_at_top(region_left)
            {
                // The fix may have made a temporary edge superfluous.
                if self.active_regions.get(region_left).fixedge {
                    tess_log!(self, "remove the left fixable edge: {:?}", edge_left);
                    self.active_regions.remove(&mut self.mesh, region_left);
                    self.mesh.delete(edge_left);
                    region_left = self.region_left_of(region_right);
                    edge_left = self.region_edge(region_left);
                } else if self.active_regions.get(region_right).fixedge {
                    tess_log!(self, "remove the right fixable edge: {:?}", edge_right);
                    self.active_regions.remove(&mut self.mesh, region_right);
                    self.mesh.delete(edge_right);
                    region_right = self.region_right_of(region_left);
                    edge_right = self.region_edge(region_right);
                }
            }

            if self.mesh.org(edge_left) != self.mesh.org(edge_right) {
                // The intersection computation requires the event to
                // lie between two real edges touching a destination;
                // everything else goes through the bottom-order fix.
                if self.mesh.dst(edge_left) != self.mesh.dst(edge_right)
                    && !self.active_regions.get(region_left).fixedge
                    && !self.active_regions.get(region_right).fixedge
                    && (self.event == self.mesh.dst(edge_left)
                        || self.event == self.mesh.dst(edge_right))
                {
                    if self.fix_region_intersection(region_left) {
                        // Fixed recursively; regions may be gone.
                        return;
                    }
                } else {
                    self.fix_region_order_at_bottom(region_left);
                }
            }

            // A two-edge degenerate loop can come out of the bottom
            // fix: merge the windings onto the survivor and drop the
            // other edge.
            if self.mesh.org(edge_left) == self.mesh.org(edge_right)
                && self.mesh.dst(edge_left) == self.mesh.dst(edge_right)
            {
                tess_log!(self, "collapse the degenerate two-edge loop at {:?}", edge_left);
                self.merge_winding(edge_right, edge_left);
                self.active_regions.remove(&mut self.mesh, region_left);
                self.mesh.delete(edge_left);
                region_left = self.region_left_of(region_right);
            }
        }
    }
}
