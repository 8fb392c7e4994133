//! The sweep's active-region list.
//!
//! A region is one interval of the sweep line strictly between two
//! polygon edges that currently cross it. Regions are kept in
//! left-to-right order in a doubly-linked list backed by a slot pool;
//! a `RegionId` is a stable handle to a region's position. Insertion
//! scans linearly from a hint, which is near O(1) in practice because
//! the sweep always starts from a neighbor of the current event.

use std::fmt;

use crate::geom;
use crate::math::Point;
use crate::mesh::{EdgeId, INVALID_INDEX};
use crate::tessellator::TessMesh;

/// Handle to an active region's position in the list.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RegionId(u32);

impl fmt::Debug for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// One interval of the sweep line.
///
/// ```text
///  /.\                                     .              /.\
///   .                 .                   .   .            .
///   .               .   .                .       .         .
///   .  region1    .       .             .           .      .
///   .           .           .  region3 .                   .
///   . ------- . - region2 --- . ---- event --------------- . --- sweep line
///   .       .                   .     .                    .
///   .    edge2                edge3   .    region4         . region5
/// edge1                             edge4                edge5
/// (bound)                                               (bound)
/// ```
#[derive(Clone, Debug)]
pub(crate) struct ActiveRegion {
    /// The left-bounding edge, always oriented upward.
    pub edge: EdgeId,
    /// The winding number of the interval.
    pub winding: i32,
    /// Derived from `winding` through the fill rule.
    pub inside: bool,
    /// The region order around it needs re-examination.
    pub dirty: bool,
    /// One of the two outer sentinels.
    pub bounds: bool,
    /// The edge is synthetic and awaiting replacement, see the sweep's
    /// bottom-event connection.
    pub fixedge: bool,
}

struct Slot {
    region: ActiveRegion,
    prev: u32,
    next: u32,
    live: bool,
}

pub(crate) struct ActiveRegions {
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: u32,
    tail: u32,
    len: usize,
}

#[inline]
fn point_of(mesh: &TessMesh, vertex: crate::mesh::VertexId) -> Point {
    mesh.vertex_data(vertex).point
}

#[inline]
fn edge_go_up(mesh: &TessMesh, e: EdgeId) -> bool {
    geom::in_top_or_hleft(point_of(mesh, mesh.dst(e)), point_of(mesh, mesh.org(e)))
}

/// The left-to-right comparator between two regions' up-going edges.
pub(crate) fn region_leq(mesh: &TessMesh, ledge: EdgeId, redge: EdgeId) -> bool {
    debug_assert!(edge_go_up(mesh, ledge), "left edge must go up: {:?}", ledge);
    debug_assert!(edge_go_up(mesh, redge), "right edge must go up: {:?}", redge);

    let ledge_org = point_of(mesh, mesh.org(ledge));
    let ledge_dst = point_of(mesh, mesh.dst(ledge));
    let redge_org = point_of(mesh, mesh.org(redge));
    let redge_dst = point_of(mesh, mesh.dst(redge));

    if mesh.dst(ledge) == mesh.dst(redge) {
        if mesh.org(ledge) == mesh.org(redge) {
            // Fully coincident.
            return true;
        }
        if geom::in_top_or_hleft_or_eq(ledge_org, redge_org) {
            // The left origin is upper: order by its side of the right
            // edge.
            geom::on_segment_or_left(ledge_org, redge_dst, redge_org)
        } else {
            geom::on_segment_or_right(redge_org, ledge_dst, ledge_org)
        }
    } else if geom::in_top_or_hleft_or_eq(ledge_dst, redge_dst) {
        // The left destination is upper: order by the right destination's
        // side of the left edge.
        geom::on_segment_or_right(redge_dst, ledge_dst, ledge_org)
    } else {
        geom::on_segment_or_left(ledge_dst, redge_dst, redge_org)
    }
}

impl ActiveRegions {
    pub fn new() -> Self {
        ActiveRegions {
            slots: Vec::new(),
            free: Vec::new(),
            head: INVALID_INDEX,
            tail: INVALID_INDEX,
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = INVALID_INDEX;
        self.tail = INVALID_INDEX;
        self.len = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, region: RegionId) -> &ActiveRegion {
        debug_assert!(self.slots[region.0 as usize].live);
        &self.slots[region.0 as usize].region
    }

    #[inline]
    pub fn get_mut(&mut self, region: RegionId) -> &mut ActiveRegion {
        debug_assert!(self.slots[region.0 as usize].live);
        &mut self.slots[region.0 as usize].region
    }

    /// The neighbor on the left, unless this is the leftmost region.
    pub fn left(&self, region: RegionId) -> Option<RegionId> {
        match self.slots[region.0 as usize].prev {
            INVALID_INDEX => None,
            prev => Some(RegionId(prev)),
        }
    }

    /// The neighbor on the right, unless this is the rightmost region.
    pub fn right(&self, region: RegionId) -> Option<RegionId> {
        match self.slots[region.0 as usize].next {
            INVALID_INDEX => None,
            next => Some(RegionId(next)),
        }
    }

    /// `region1` orders left of (or equal to) `region2`.
    pub fn in_left(&self, mesh: &TessMesh, region1: RegionId, region2: RegionId) -> bool {
        region_leq(mesh, self.get(region1).edge, self.get(region2).edge)
    }

    /// Inserts in ascending order, scanning from the leftmost region.
    pub fn insert(&mut self, mesh: &mut TessMesh, region: ActiveRegion) -> RegionId {
        let start = self.head;
        self.insert_from(mesh, start, region)
    }

    /// Inserts in ascending order, scanning from `prev`. `prev` must
    /// order left of the new region.
    pub fn insert_after(
        &mut self,
        mesh: &mut TessMesh,
        prev: RegionId,
        region: ActiveRegion,
    ) -> RegionId {
        debug_assert!(region_leq(mesh, self.get(prev).edge, region.edge));
        self.insert_from(mesh, prev.0, region)
    }

    fn insert_from(&mut self, mesh: &mut TessMesh, start: u32, region: ActiveRegion) -> RegionId {
        debug_assert!(edge_go_up(mesh, region.edge));

        // Find the first region ordering strictly after the new one and
        // insert just before it.
        let mut cursor = start;
        while cursor != INVALID_INDEX {
            let slot = &self.slots[cursor as usize];
            if !region_leq(mesh, slot.region.edge, region.edge) {
                break;
            }
            cursor = slot.next;
        }

        let edge = region.edge;
        let index = self.alloc(region);
        self.link_before(index, cursor);

        mesh.edge_data_mut(edge).region = Some(RegionId(index));
        RegionId(index)
    }

    /// The region whose interval is immediately to the left of the
    /// given up-going edge, scanning from the right.
    pub fn find(&self, mesh: &TessMesh, edge: EdgeId) -> Option<RegionId> {
        debug_assert!(edge_go_up(mesh, edge));

        let mut cursor = self.tail;
        while cursor != INVALID_INDEX {
            let slot = &self.slots[cursor as usize];
            if region_leq(mesh, slot.region.edge, edge) {
                return Some(RegionId(cursor));
            }
            cursor = slot.prev;
        }
        None
    }

    /// Removes a region, clearing the back-link on its edge first.
    pub fn remove(&mut self, mesh: &mut TessMesh, region: RegionId) {
        let edge = self.get(region).edge;

        // A fixable edge is synthetic and must not carry real winding
        // when its region goes away.
        debug_assert!(!self.get(region).fixedge || mesh.edge_data(edge).winding == 0);

        mesh.edge_data_mut(edge).region = None;
        self.unlink(region.0);
    }

    fn alloc(&mut self, region: ActiveRegion) -> u32 {
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Slot {
                    region,
                    prev: INVALID_INDEX,
                    next: INVALID_INDEX,
                    live: true,
                };
                index
            }
            None => {
                self.slots.push(Slot {
                    region,
                    prev: INVALID_INDEX,
                    next: INVALID_INDEX,
                    live: true,
                });
                (self.slots.len() - 1) as u32
            }
        }
    }

    fn link_before(&mut self, index: u32, before: u32) {
        let prev = match before {
            INVALID_INDEX => self.tail,
            _ => self.slots[before as usize].prev,
        };

        self.slots[index as usize].prev = prev;
        self.slots[index as usize].next = before;
        if prev != INVALID_INDEX {
            self.slots[prev as usize].next = index;
        } else {
            self.head = index;
        }
        if before != INVALID_INDEX {
            self.slots[before as usize].prev = index;
        } else {
            self.tail = index;
        }
        self.len += 1;
    }

    fn unlink(&mut self, index: u32) {
        let (prev, next) = {
            let slot = &self.slots[index as usize];
            (slot.prev, slot.next)
        };
        if prev != INVALID_INDEX {
            self.slots[prev as usize].next = next;
        } else {
            self.head = next;
        }
        if next != INVALID_INDEX {
            self.slots[next as usize].prev = prev;
        } else {
            self.tail = prev;
        }
        self.slots[index as usize].live = false;
        self.free.push(index);
        self.len -= 1;
    }

    /// Debug check: neighbors are strictly ordered and every edge goes
    /// up.
    #[cfg(debug_assertions)]
    pub fn check(&self, mesh: &TessMesh) {
        let mut cursor = self.head;
        let mut prev: Option<u32> = None;
        while cursor != INVALID_INDEX {
            let slot = &self.slots[cursor as usize];
            if let Some(prev) = prev {
                assert!(
                    region_leq(mesh, self.slots[prev as usize].region.edge, slot.region.edge),
                    "active region order violated between {:?} and {:?}",
                    self.slots[prev as usize].region.edge,
                    slot.region.edge,
                );
            }
            assert!(edge_go_up(mesh, slot.region.edge));
            prev = Some(cursor);
            cursor = slot.next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::point;
    use crate::tessellator::Tessellator;

    fn up_edge(tess: &mut Tessellator, org: Point, dst: Point) -> EdgeId {
        tess.make_mesh_edge(org, dst)
    }

    fn region(edge: EdgeId) -> ActiveRegion {
        ActiveRegion {
            edge,
            winding: 0,
            inside: false,
            dirty: false,
            bounds: false,
            fixedge: false,
        }
    }

    #[test]
    fn ordered_insertion_and_neighbors() {
        let mut tess = Tessellator::new();
        let e0 = up_edge(&mut tess, point(0.0, 2.0), point(0.0, 0.0));
        let e1 = up_edge(&mut tess, point(1.0, 2.0), point(1.0, 0.0));
        let e2 = up_edge(&mut tess, point(2.0, 2.0), point(2.0, 0.0));

        let mut regions = ActiveRegions::new();
        let r2 = regions.insert(&mut tess.mesh, region(e2));
        let r0 = regions.insert(&mut tess.mesh, region(e0));
        let r1 = regions.insert(&mut tess.mesh, region(e1));

        assert_eq!(regions.left(r1), Some(r0));
        assert_eq!(regions.right(r1), Some(r2));
        assert_eq!(regions.left(r0), None);
        assert_eq!(regions.right(r2), None);
        assert!(regions.in_left(&tess.mesh, r0, r1));
        #[cfg(debug_assertions)]
        regions.check(&tess.mesh);
    }

    #[test]
    fn find_returns_the_region_on_the_left() {
        let mut tess = Tessellator::new();
        let e0 = up_edge(&mut tess, point(0.0, 2.0), point(0.0, 0.0));
        let e2 = up_edge(&mut tess, point(2.0, 2.0), point(2.0, 0.0));
        let probe = up_edge(&mut tess, point(1.0, 2.0), point(1.0, 0.0));

        let mut regions = ActiveRegions::new();
        let r0 = regions.insert(&mut tess.mesh, region(e0));
        let _r2 = regions.insert(&mut tess.mesh, region(e2));

        assert_eq!(regions.find(&tess.mesh, probe), Some(r0));
    }

    #[test]
    fn remove_clears_the_edge_back_link() {
        let mut tess = Tessellator::new();
        let e0 = up_edge(&mut tess, point(0.0, 2.0), point(0.0, 0.0));

        let mut regions = ActiveRegions::new();
        let r0 = regions.insert(&mut tess.mesh, region(e0));
        assert_eq!(tess.region_of(e0), Some(r0));

        regions.remove(&mut tess.mesh, r0);
        assert_eq!(tess.region_of(e0), None);
        assert!(regions.is_empty());
    }
}
