//! Triangulation of the monotone faces.
//!
//! Each inside face is walked from its uppermost left edge; two chains
//! descend from there and the lagging chain is connected back across
//! the face until only a triangle remains. The walk runs
//! counter-clockwise from the bottom because the sweep parks every
//! finished face's edge at its bottommost right edge, which makes the
//! extremes cheap to find.

use crate::mesh::FaceId;
use crate::tessellator::Tessellator;

impl Tessellator {
    /// Triangulates every inside face.
    pub(crate) fn triangulation_make(&mut self) {
        debug_assert!(
            self.mesh.face_order() == crate::mesh::InsertionOrder::InsertHead,
            "new faces must land at the head of the face list"
        );

        let mut face = self.mesh.face_head();
        while face.is_valid() {
            // Faces created while triangulating land at the head of the
            // list, behind the cursor, so they are not revisited.
            let next = self.mesh.face_next_in_list(face);
            if self.inside(face) {
                self.triangulate_face(face);
            }
            face = next;
        }

        #[cfg(debug_assertions)]
        self.mesh.check();
    }

    /* Triangulates one monotone face.
     *
     *        1                          1
     *      .   .  right               . ` .
     *    .       2                  . ` ` 2
     *  .       .          =>      . ` ` .
     * 3      .                   3 ` ` .
     *  .    4       left          . ` 4
     *   .    .                     . ` .
     *    5    .                     5 ` .
     *      .   .                      . `.
     *        .  .                       . .
     *          . 6                        6
     */
    fn triangulate_face(&mut self, face: FaceId) {
        let mut edge = self.mesh.face_edge(face);
        debug_assert!(
            self.mesh.lnext(edge) != edge && self.mesh.lnext(self.mesh.lnext(edge)) != edge,
            "a face needs at least three edges to triangulate"
        );

        // Walking ccw from the bottom, up/down flip: find the
        // bottommost left edge (the uppermost left edge of the ccw
        // walk).
        let mut left = edge;
        while self.edge_go_up(left) {
            left = self.mesh.lprev(left);
        }
        while self.edge_go_down(left) {
            left = self.mesh.lnext(left);
        }

        let mut right = self.mesh.lprev(left);

        while self.mesh.lnext(left) != right {
            if !self.vertex_in_top_or_horizontal(self.mesh.dst(left), self.mesh.org(right)) {
                /* The right chain lags: connect left-chain vertices
                 * while they keep the fan convex (or sit on the wrong
                 * side of the chord, which would flip a triangle).
                 */
                while self.mesh.lnext(right) != left
                    && (self.edge_go_down(self.mesh.lprev(left))
                        || self.vertex_on_edge_or_right(
                            self.mesh.org(left),
                            self.mesh.dst(left),
                            self.mesh.org(self.mesh.lprev(left)),
                        ))
                {
                    let lprev = self.mesh.lprev(left);
                    edge = self.mesh.connect(left, lprev);
                    left = edge.sym();
                }
                left = self.mesh.lnext(left);
            } else {
                // Symmetric: the left chain lags.
                while self.mesh.lnext(right) != left
                    && (self.edge_go_up(self.mesh.lnext(right))
                        || self.vertex_on_edge_or_left(
                            self.mesh.dst(right),
                            self.mesh.org(right),
                            self.mesh.dst(self.mesh.lnext(right)),
                        ))
                {
                    let lnext = self.mesh.lnext(right);
                    edge = self.mesh.connect(lnext, right);
                    right = edge.sym();
                }
                right = self.mesh.lprev(right);
            }
        }

        debug_assert!(self.mesh.lnext(right) != left);

        // Fan-triangulate whatever wedge remains.
        while self.mesh.lnext(self.mesh.lnext(right)) != left {
            let lnext = self.mesh.lnext(right);
            edge = self.mesh.connect(lnext, right);
            right = edge.sym();
        }
    }
}
