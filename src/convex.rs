//! Merging triangles back into convex polygons.
//!
//! Second pass over the inside faces: a shared edge between two inside
//! faces is deleted when the merged polygon stays convex at both of its
//! endpoints. The CCW test is not reliable for almost-degenerate
//! triangles, so some legal merges may be skipped; that is an accepted
//! accuracy/robustness trade-off.

use crate::mesh::{EdgeId, FaceId};
use crate::tessellator::Tessellator;

impl Tessellator {
    /// Merges adjacent inside faces wherever the union stays convex.
    pub(crate) fn convex_make(&mut self) {
        let mut face = self.mesh.face_head();
        while face.is_valid() {
            if self.inside(face) {
                self.convex_merge_face(face);
            }
            // The current face survives merging (its neighbors are the
            // ones deleted), so its list link stays valid.
            face = self.mesh.face_next_in_list(face);
        }

        #[cfg(debug_assertions)]
        self.mesh.check();
    }

    /* Walks the face boundary, merging across any edge whose opposite
     * face is inside while the result stays convex:
     *
     *       a
     *       . .
     *       .   .
     *       .     .
     *       .  face .
     *       .   edge ->.
     *     b . . . . . . . d
     *         . edge_sym.
     *           .       .
     *             .     .
     *          face_sym .
     *                 . .
     *                   c
     *
     * merged when is_ccw(a, b, c) and is_ccw(c, d, a).
     */
    fn convex_merge_face(&mut self, face: FaceId) {
        let start = self.mesh.face_edge(face);
        let vertex_first = self.mesh.org(start);

        let mut edge = start;
        loop {
            let mut edge_next = self.mesh.lnext(edge);
            let edge_sym = edge.sym();
            let face_sym = self.mesh.lface(edge_sym);

            let mut merged = false;
            if self.inside(face_sym) {
                if self.merge_is_convex(edge, edge_sym) {
                    // The next boundary edge comes from the absorbed
                    // face.
                    edge_next = self.mesh.lnext(edge_sym);
                    self.mesh.delete(edge_sym);
                    merged = true;
                }
            }

            if !merged && self.mesh.org(self.mesh.lnext(edge)) == vertex_first {
                break;
            }
            edge = edge_next;
        }
    }

    fn merge_is_convex(&self, edge: EdgeId, edge_sym: EdgeId) -> bool {
        self.vertex_is_ccw(
            self.mesh.org(self.mesh.lprev(edge)),
            self.mesh.org(edge),
            self.mesh.dst(self.mesh.lnext(edge_sym)),
        ) && self.vertex_is_ccw(
            self.mesh.org(self.mesh.lprev(edge_sym)),
            self.mesh.org(edge_sym),
            self.mesh.dst(self.mesh.lnext(edge)),
        )
    }
}
