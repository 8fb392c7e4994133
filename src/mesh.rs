//! A half-edge mesh (doubly connected edge list).
//!
//! Like the quad-edge data structure but without `rot`/`invrot`: each
//! undirected edge is a pair of oppositely oriented half-edges carrying
//! per-side origin and face references. The mesh is generic over the
//! user payloads attached to edges, faces and vertices.
//!
//! ```text
//!              .                                            .
//!              . edge.dst                                   .
//! .............D.............                 ..............D.............
//!              .                              edge.lnext    . edge.dnext
//!              .       edge.rface                           .
//! edge.lface  /.\                                          /.\
//!              . edge                                       . edge
//!              .                                            .
//! .............O.............                 ..............O.............
//!              . edge.org                     edge.onext    . edge.rnext
//! ```
//!
//! All references are plain indices into growable slot pools; the two
//! half-edges of a pair live in the same slot so that `sym` is an index
//! flip and a pair is freed atomically. Each pool keeps an intrusive
//! insertion-order list; whether new entities land at the head or the
//! tail of that list is a settable property, which the sweep uses to
//! keep freshly created faces out of the pass it is currently running.

use std::fmt;
use std::ops::BitOr;

pub(crate) const INVALID_INDEX: u32 = u32::MAX;

/// Iteration guard for orbit walks over possibly corrupted meshes.
const MAX_LOOP_ITERATIONS: usize = 8192;

/// A half-edge reference.
///
/// The two half-edges of a pair differ in the lowest bit, so `sym` is
/// a plain index flip and survives any mesh surgery.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EdgeId(pub(crate) u32);

/// A vertex reference.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexId(pub(crate) u32);

/// A face reference.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FaceId(pub(crate) u32);

impl EdgeId {
    pub const INVALID: EdgeId = EdgeId(INVALID_INDEX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// The same edge, opposite direction.
    #[inline]
    pub fn sym(self) -> EdgeId {
        debug_assert!(self.is_valid());
        EdgeId(self.0 ^ 1)
    }

    #[inline]
    fn pair(self) -> u32 {
        self.0 >> 1
    }

    #[inline]
    fn side(self) -> usize {
        (self.0 & 1) as usize
    }
}

impl VertexId {
    pub const INVALID: VertexId = VertexId(INVALID_INDEX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl FaceId {
    pub const INVALID: FaceId = FaceId(INVALID_INDEX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "e{}.{}", self.pair(), self.side())
    }
}

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Debug for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Where newly created entities land in a pool's iteration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InsertionOrder {
    InsertHead,
    InsertTail,
}

/// The mesh events a listener can observe.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MeshEvent {
    EdgeInit(EdgeId),
    EdgeExit(EdgeId),
    /// `split(org) => (org, dst)`; listeners may copy attributes from
    /// the old half-edge pair onto the new one.
    EdgeSplit(EdgeId, EdgeId),
    FaceInit(FaceId),
    FaceExit(FaceId),
    /// `merge(org, dst) => dst`.
    FaceMerge(FaceId, FaceId),
    /// `split(org) => (org, dst)`.
    FaceSplit(FaceId, FaceId),
    VertexInit(VertexId),
    VertexExit(VertexId),
}

impl MeshEvent {
    pub fn mask(&self) -> EventMask {
        match self {
            MeshEvent::EdgeInit(..) => EventMask::EDGE_INIT,
            MeshEvent::EdgeExit(..) => EventMask::EDGE_EXIT,
            MeshEvent::EdgeSplit(..) => EventMask::EDGE_SPLIT,
            MeshEvent::FaceInit(..) => EventMask::FACE_INIT,
            MeshEvent::FaceExit(..) => EventMask::FACE_EXIT,
            MeshEvent::FaceMerge(..) => EventMask::FACE_MERGE,
            MeshEvent::FaceSplit(..) => EventMask::FACE_SPLIT,
            MeshEvent::VertexInit(..) => EventMask::VERTEX_INIT,
            MeshEvent::VertexExit(..) => EventMask::VERTEX_EXIT,
        }
    }
}

/// A bit set of observed mesh events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventMask(pub u32);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const EDGE_INIT: EventMask = EventMask(1 << 0);
    pub const EDGE_EXIT: EventMask = EventMask(1 << 1);
    pub const EDGE_SPLIT: EventMask = EventMask(1 << 2);
    pub const FACE_INIT: EventMask = EventMask(1 << 3);
    pub const FACE_EXIT: EventMask = EventMask(1 << 4);
    pub const FACE_MERGE: EventMask = EventMask(1 << 5);
    pub const FACE_SPLIT: EventMask = EventMask(1 << 6);
    pub const VERTEX_INIT: EventMask = EventMask(1 << 7);
    pub const VERTEX_EXIT: EventMask = EventMask(1 << 8);
    pub const ALL: EventMask = EventMask((1 << 9) - 1);

    #[inline]
    pub fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, other: EventMask) -> EventMask {
        EventMask(self.0 | other.0)
    }
}

/// Observes mesh events.
///
/// A listener must not mutate the mesh structurally: it only gets access
/// to the user payloads, which it may read and write freely.
pub trait MeshListener<E, F, V> {
    fn on_mesh_event(&mut self, event: MeshEvent, payloads: &mut MeshPayloads<E, F, V>);
}

/// Payload access handed to a listener while an event is dispatched.
pub struct MeshPayloads<'l, E, F, V> {
    edges: &'l mut Pool<EdgePair<E>>,
    faces: &'l mut Pool<FaceRecord<F>>,
    vertices: &'l mut Pool<VertexRecord<V>>,
}

impl<'l, E: Default, F: Default, V: Default> MeshPayloads<'l, E, F, V> {
    pub fn edge(&self, e: EdgeId) -> &E {
        &self.edges.get(e.pair()).halves[e.side()].data
    }

    pub fn edge_mut(&mut self, e: EdgeId) -> &mut E {
        &mut self.edges.get_mut(e.pair()).halves[e.side()].data
    }

    pub fn face(&self, f: FaceId) -> &F {
        &self.faces.get(f.0).data
    }

    pub fn face_mut(&mut self, f: FaceId) -> &mut F {
        &mut self.faces.get_mut(f.0).data
    }

    pub fn vertex(&self, v: VertexId) -> &V {
        &self.vertices.get(v.0).data
    }

    pub fn vertex_mut(&mut self, v: VertexId) -> &mut V {
        &mut self.vertices.get_mut(v.0).data
    }
}

struct HalfEdge<E> {
    /// The next edge counter-clockwise around the origin.
    onext: EdgeId,
    /// The next edge counter-clockwise around the left face.
    lnext: EdgeId,
    org: VertexId,
    lface: FaceId,
    data: E,
}

impl<E: Default> Default for HalfEdge<E> {
    fn default() -> Self {
        HalfEdge {
            onext: EdgeId::INVALID,
            lnext: EdgeId::INVALID,
            org: VertexId::INVALID,
            lface: FaceId::INVALID,
            data: E::default(),
        }
    }
}

#[derive(Default)]
struct EdgePair<E> {
    halves: [HalfEdge<E>; 2],
}

struct VertexRecord<V> {
    /// An arbitrary edge leaving this vertex.
    edge: EdgeId,
    data: V,
}

impl<V: Default> Default for VertexRecord<V> {
    fn default() -> Self {
        VertexRecord {
            edge: EdgeId::INVALID,
            data: V::default(),
        }
    }
}

struct FaceRecord<F> {
    /// An arbitrary edge with this face on its left.
    edge: EdgeId,
    data: F,
}

impl<F: Default> Default for FaceRecord<F> {
    fn default() -> Self {
        FaceRecord {
            edge: EdgeId::INVALID,
            data: F::default(),
        }
    }
}

struct Slot<T> {
    item: T,
    prev: u32,
    next: u32,
    uid: u32,
    live: bool,
}

/// A growable pool of slots with an intrusive insertion-order list.
///
/// Freed slots go back to a free list and are recycled by later
/// allocations; clearing resets the pool without giving up its storage.
struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: u32,
    tail: u32,
    len: usize,
    order: InsertionOrder,
    next_uid: u32,
}

impl<T: Default> Pool<T> {
    fn new() -> Self {
        Pool {
            slots: Vec::new(),
            free: Vec::new(),
            head: INVALID_INDEX,
            tail: INVALID_INDEX,
            len: 0,
            order: InsertionOrder::InsertTail,
            next_uid: 1,
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = INVALID_INDEX;
        self.tail = INVALID_INDEX;
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }

    fn alloc(&mut self) -> u32 {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Slot {
                    item: T::default(),
                    prev: INVALID_INDEX,
                    next: INVALID_INDEX,
                    uid: 0,
                    live: true,
                };
                index
            }
            None => {
                self.slots.push(Slot {
                    item: T::default(),
                    prev: INVALID_INDEX,
                    next: INVALID_INDEX,
                    uid: 0,
                    live: true,
                });
                (self.slots.len() - 1) as u32
            }
        };

        self.slots[index as usize].uid = self.next_uid;
        self.next_uid += 1;

        match self.order {
            InsertionOrder::InsertHead => {
                self.slots[index as usize].next = self.head;
                if self.head != INVALID_INDEX {
                    self.slots[self.head as usize].prev = index;
                } else {
                    self.tail = index;
                }
                self.head = index;
            }
            InsertionOrder::InsertTail => {
                self.slots[index as usize].prev = self.tail;
                if self.tail != INVALID_INDEX {
                    self.slots[self.tail as usize].next = index;
                } else {
                    self.head = index;
                }
                self.tail = index;
            }
        }

        self.len += 1;
        index
    }

    fn release(&mut self, index: u32) {
        debug_assert!(self.slots[index as usize].live);
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

    #[inline]
    fn get(&self, index: u32) -> &T {
        debug_assert!(self.slots[index as usize].live);
        &self.slots[index as usize].item
    }

    #[inline]
    fn get_mut(&mut self, index: u32) -> &mut T {
        debug_assert!(self.slots[index as usize].live);
        &mut self.slots[index as usize].item
    }

    #[inline]
    fn uid(&self, index: u32) -> u32 {
        self.slots[index as usize].uid
    }

    #[inline]
    fn first(&self) -> u32 {
        self.head
    }

    #[inline]
    fn next(&self, index: u32) -> u32 {
        self.slots[index as usize].next
    }
}

/// The mesh itself.
///
/// `E`, `F` and `V` are the user payloads carried by half-edges, faces
/// and vertices.
pub struct Mesh<E, F, V> {
    edges: Pool<EdgePair<E>>,
    faces: Pool<FaceRecord<F>>,
    vertices: Pool<VertexRecord<V>>,
    listener: Option<Box<dyn MeshListener<E, F, V>>>,
    listener_mask: EventMask,
}

impl<E: Default, F: Default, V: Default> Mesh<E, F, V> {
    pub fn new() -> Self {
        Mesh {
            edges: Pool::new(),
            faces: Pool::new(),
            vertices: Pool::new(),
            listener: None,
            listener_mask: EventMask::NONE,
        }
    }

    pub fn clear(&mut self) {
        self.edges.clear();
        self.faces.clear();
        self.vertices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.edges.len() == 0 && self.faces.len() == 0 && self.vertices.len() == 0
    }

    pub fn set_listener(&mut self, listener: Box<dyn MeshListener<E, F, V>>, mask: EventMask) {
        self.listener = Some(listener);
        self.listener_mask = mask;
    }

    pub fn listen_to(&mut self, mask: EventMask) {
        self.listener_mask = self.listener_mask | mask;
    }

    pub fn edge_order(&self) -> InsertionOrder {
        self.edges.order
    }

    pub fn set_edge_order(&mut self, order: InsertionOrder) {
        self.edges.order = order;
    }

    pub fn face_order(&self) -> InsertionOrder {
        self.faces.order
    }

    pub fn set_face_order(&mut self, order: InsertionOrder) {
        self.faces.order = order;
    }

    pub fn vertex_order(&self) -> InsertionOrder {
        self.vertices.order
    }

    pub fn set_vertex_order(&mut self, order: InsertionOrder) {
        self.vertices.order = order;
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    // Topology accessors.

    #[inline]
    fn half(&self, e: EdgeId) -> &HalfEdge<E> {
        &self.edges.get(e.pair()).halves[e.side()]
    }

    #[inline]
    fn half_mut(&mut self, e: EdgeId) -> &mut HalfEdge<E> {
        &mut self.edges.get_mut(e.pair()).halves[e.side()]
    }

    #[inline]
    pub fn org(&self, e: EdgeId) -> VertexId {
        self.half(e).org
    }

    #[inline]
    pub fn dst(&self, e: EdgeId) -> VertexId {
        self.half(e.sym()).org
    }

    #[inline]
    pub fn lface(&self, e: EdgeId) -> FaceId {
        self.half(e).lface
    }

    #[inline]
    pub fn rface(&self, e: EdgeId) -> FaceId {
        self.half(e.sym()).lface
    }

    #[inline]
    pub fn onext(&self, e: EdgeId) -> EdgeId {
        self.half(e).onext
    }

    #[inline]
    pub fn lnext(&self, e: EdgeId) -> EdgeId {
        self.half(e).lnext
    }

    /// The previous edge clockwise around the origin.
    #[inline]
    pub fn oprev(&self, e: EdgeId) -> EdgeId {
        self.lnext(e.sym())
    }

    /// The previous edge clockwise around the left face.
    #[inline]
    pub fn lprev(&self, e: EdgeId) -> EdgeId {
        self.onext(e).sym()
    }

    /// The next edge counter-clockwise around the right face.
    #[inline]
    pub fn rnext(&self, e: EdgeId) -> EdgeId {
        self.oprev(e).sym()
    }

    /// The previous edge clockwise around the right face.
    #[inline]
    pub fn rprev(&self, e: EdgeId) -> EdgeId {
        self.onext(e.sym())
    }

    /// The next edge counter-clockwise around the destination.
    #[inline]
    pub fn dnext(&self, e: EdgeId) -> EdgeId {
        self.rprev(e).sym()
    }

    /// The previous edge clockwise around the destination.
    #[inline]
    pub fn dprev(&self, e: EdgeId) -> EdgeId {
        self.lnext(e).sym()
    }

    #[inline]
    pub fn vertex_edge(&self, v: VertexId) -> EdgeId {
        self.vertices.get(v.0).edge
    }

    #[inline]
    pub fn face_edge(&self, f: FaceId) -> EdgeId {
        self.faces.get(f.0).edge
    }

    pub fn is_isolated(&self, e: EdgeId) -> bool {
        let sym = e.sym();
        self.onext(e) == e
            && self.onext(sym) == sym
            && self.lnext(e) == sym
            && self.lnext(sym) == e
    }

    pub fn is_isolated_loop(&self, e: EdgeId) -> bool {
        let sym = e.sym();
        self.onext(e) == sym
            && self.onext(sym) == e
            && self.lnext(e) == e
            && self.lnext(sym) == sym
    }

    // Payload accessors.

    #[inline]
    pub fn edge_data(&self, e: EdgeId) -> &E {
        &self.half(e).data
    }

    #[inline]
    pub fn edge_data_mut(&mut self, e: EdgeId) -> &mut E {
        &mut self.half_mut(e).data
    }

    #[inline]
    pub fn face_data(&self, f: FaceId) -> &F {
        &self.faces.get(f.0).data
    }

    #[inline]
    pub fn face_data_mut(&mut self, f: FaceId) -> &mut F {
        &mut self.faces.get_mut(f.0).data
    }

    #[inline]
    pub fn vertex_data(&self, v: VertexId) -> &V {
        &self.vertices.get(v.0).data
    }

    #[inline]
    pub fn vertex_data_mut(&mut self, v: VertexId) -> &mut V {
        &mut self.vertices.get_mut(v.0).data
    }

    // Stable ids, for diagnostics only.

    pub fn edge_uid(&self, e: EdgeId) -> u32 {
        self.edges.uid(e.pair())
    }

    pub fn face_uid(&self, f: FaceId) -> u32 {
        self.faces.uid(f.0)
    }

    pub fn vertex_uid(&self, v: VertexId) -> u32 {
        self.vertices.uid(v.0)
    }

    // Iteration, in insertion order. The `*_head`/`*_next_in_list`
    // accessors walk the same lists manually, which stays valid while
    // entities are created or destroyed between steps.

    pub fn edge_head(&self) -> EdgeId {
        match self.edges.first() {
            INVALID_INDEX => EdgeId::INVALID,
            pair => EdgeId(pair << 1),
        }
    }

    pub fn edge_next_in_list(&self, e: EdgeId) -> EdgeId {
        match self.edges.next(e.pair()) {
            INVALID_INDEX => EdgeId::INVALID,
            pair => EdgeId(pair << 1),
        }
    }

    pub fn face_head(&self) -> FaceId {
        match self.faces.first() {
            INVALID_INDEX => FaceId::INVALID,
            index => FaceId(index),
        }
    }

    pub fn face_next_in_list(&self, f: FaceId) -> FaceId {
        match self.faces.next(f.0) {
            INVALID_INDEX => FaceId::INVALID,
            index => FaceId(index),
        }
    }

    pub fn vertex_head(&self) -> VertexId {
        match self.vertices.first() {
            INVALID_INDEX => VertexId::INVALID,
            index => VertexId(index),
        }
    }

    pub fn vertex_next_in_list(&self, v: VertexId) -> VertexId {
        match self.vertices.next(v.0) {
            INVALID_INDEX => VertexId::INVALID,
            index => VertexId(index),
        }
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        let first = self.vertex_head();
        std::iter::successors(
            if first.is_valid() { Some(first) } else { None },
            move |&v| {
                let next = self.vertex_next_in_list(v);
                if next.is_valid() {
                    Some(next)
                } else {
                    None
                }
            },
        )
    }

    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        let first = self.face_head();
        std::iter::successors(
            if first.is_valid() { Some(first) } else { None },
            move |&f| {
                let next = self.face_next_in_list(f);
                if next.is_valid() {
                    Some(next)
                } else {
                    None
                }
            },
        )
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        let first = self.edge_head();
        std::iter::successors(
            if first.is_valid() { Some(first) } else { None },
            move |&e| {
                let next = self.edge_next_in_list(e);
                if next.is_valid() {
                    Some(next)
                } else {
                    None
                }
            },
        )
    }

    // Internal link setters. Setting an origin, a destination or a face
    // also refreshes the representative edge of the target entity.

    #[inline]
    fn set_onext(&mut self, e: EdgeId, val: EdgeId) {
        self.half_mut(e).onext = val;
    }

    #[inline]
    fn set_lnext(&mut self, e: EdgeId, val: EdgeId) {
        self.half_mut(e).lnext = val;
    }

    #[inline]
    fn set_oprev(&mut self, e: EdgeId, val: EdgeId) {
        self.half_mut(e.sym()).lnext = val;
    }

    #[inline]
    fn set_org(&mut self, e: EdgeId, val: VertexId) {
        self.half_mut(e).org = val;
        if val.is_valid() {
            self.vertices.get_mut(val.0).edge = e;
        }
    }

    #[inline]
    fn set_dst(&mut self, e: EdgeId, val: VertexId) {
        self.set_org(e.sym(), val);
    }

    #[inline]
    fn set_lface(&mut self, e: EdgeId, val: FaceId) {
        self.half_mut(e).lface = val;
        if val.is_valid() {
            self.faces.get_mut(val.0).edge = e;
        }
    }

    #[inline]
    fn set_rface(&mut self, e: EdgeId, val: FaceId) {
        self.set_lface(e.sym(), val);
    }

    #[inline]
    pub(crate) fn set_vertex_edge(&mut self, v: VertexId, e: EdgeId) {
        debug_assert!(self.org(e) == v);
        self.vertices.get_mut(v.0).edge = e;
    }

    #[inline]
    pub(crate) fn set_face_edge(&mut self, f: FaceId, e: EdgeId) {
        debug_assert!(self.lface(e) == f);
        self.faces.get_mut(f.0).edge = e;
    }

    fn post(&mut self, event: MeshEvent) {
        if !self.listener_mask.contains(event.mask()) {
            return;
        }
        if let Some(listener) = self.listener.as_mut() {
            let mut payloads = MeshPayloads {
                edges: &mut self.edges,
                faces: &mut self.faces,
                vertices: &mut self.vertices,
            };
            listener.on_mesh_event(event, &mut payloads);
        }
    }

    // Entity lifecycle.

    fn make_vertex(&mut self) -> VertexId {
        let vertex = VertexId(self.vertices.alloc());
        self.post(MeshEvent::VertexInit(vertex));
        vertex
    }

    fn make_face(&mut self) -> FaceId {
        let face = FaceId(self.faces.alloc());
        self.post(MeshEvent::FaceInit(face));
        face
    }

    /// Allocates a fresh half-edge pair wired as an isolated edge or an
    /// isolated loop; origins and faces are left unset.
    fn alloc_edge_pair(&mut self, is_loop: bool) -> EdgeId {
        let edge = EdgeId(self.edges.alloc() << 1);
        let sym = edge.sym();
        if is_loop {
            self.set_onext(edge, sym);
            self.set_onext(sym, edge);
            self.set_lnext(edge, edge);
            self.set_lnext(sym, sym);
        } else {
            self.set_onext(edge, edge);
            self.set_onext(sym, sym);
            self.set_lnext(edge, sym);
            self.set_lnext(sym, edge);
        }
        self.post(MeshEvent::EdgeInit(edge));
        edge
    }

    fn kill_vertex(&mut self, vertex: VertexId) {
        self.post(MeshEvent::VertexExit(vertex));
        self.vertices.release(vertex.0);
    }

    fn kill_face(&mut self, face: FaceId) {
        self.post(MeshEvent::FaceExit(face));
        self.faces.release(face.0);
    }

    fn kill_edge(&mut self, edge: EdgeId) {
        self.post(MeshEvent::EdgeExit(edge));
        self.edges.release(edge.pair());
    }

    /// Sets the left face of every edge in the left orbit of `edge`.
    fn save_face_at_orbit(&mut self, edge: EdgeId, lface: FaceId) {
        let mut scan = edge;
        loop {
            self.set_lface(scan, lface);
            scan = self.lnext(scan);
            if scan == edge {
                break;
            }
        }
    }

    /// Sets the origin of every edge in the origin orbit of `edge`.
    fn save_vertex_at_orbit(&mut self, edge: EdgeId, org: VertexId) {
        let mut scan = edge;
        loop {
            self.set_org(scan, org);
            scan = self.onext(scan);
            if scan == edge {
                break;
            }
        }
    }

    fn make_vertex_at_orbit(&mut self, edge: EdgeId) -> VertexId {
        let vertex = self.make_vertex();
        self.save_vertex_at_orbit(edge, vertex);
        vertex
    }

    fn make_face_at_orbit(&mut self, edge: EdgeId) -> FaceId {
        let face = self.make_face();
        self.save_face_at_orbit(edge, face);
        face
    }

    fn kill_vertex_at_orbit(&mut self, vertex: VertexId, org_new: VertexId) {
        self.save_vertex_at_orbit(self.vertex_edge(vertex), org_new);
        self.kill_vertex(vertex);
    }

    fn kill_face_at_orbit(&mut self, face: FaceId, face_new: FaceId) {
        self.save_face_at_orbit(self.face_edge(face), face_new);
        self.kill_face(face);
    }

    fn kill_isolated_edge(&mut self, edge: EdgeId) -> bool {
        if self.is_isolated(edge) {
            debug_assert!(self.org(edge) != self.dst(edge));
            debug_assert!(self.lface(edge) == self.rface(edge));
            self.kill_vertex(self.org(edge));
            self.kill_vertex(self.dst(edge));
            self.kill_face(self.lface(edge));
            self.kill_edge(edge);
            true
        } else if self.is_isolated_loop(edge) {
            debug_assert!(self.org(edge) == self.dst(edge));
            debug_assert!(self.lface(edge) != self.rface(edge));
            self.kill_vertex(self.org(edge));
            self.kill_face(self.lface(edge));
            self.kill_face(self.rface(edge));
            self.kill_edge(edge);
            true
        } else {
            false
        }
    }

    /// The Guibas-Stolfi splice primitive on the raw links: swaps the
    /// `onext` of the two edges and patches the two `oprev` links
    /// accordingly.
    fn splice_edge(&mut self, a: EdgeId, b: EdgeId) {
        debug_assert!(a != b);
        let x = self.onext(a);
        let y = self.onext(b);
        self.set_onext(a, y);
        self.set_onext(b, x);
        self.set_oprev(x, b);
        self.set_oprev(y, a);
    }

    // Operations.

    /// Creates an isolated edge `O -> D` with two fresh vertices and a
    /// single face shared on both sides.
    pub fn make_edge(&mut self) -> EdgeId {
        let org = self.make_vertex();
        let dst = self.make_vertex();
        let face = self.make_face();
        let edge = self.alloc_edge_pair(false);
        let edge_sym = edge.sym();

        self.set_org(edge, org);
        self.set_lface(edge, face);
        self.set_org(edge_sym, dst);
        self.set_lface(edge_sym, face);
        edge
    }

    /// Creates a self-loop edge at a single fresh vertex, with two
    /// distinct fresh faces on either side. `is_ccw` selects the
    /// orientation of the returned half-edge relative to the loop.
    pub fn make_loop_edge(&mut self, is_ccw: bool) -> EdgeId {
        let vertex = self.make_vertex();
        let lface = self.make_face();
        let rface = self.make_face();
        let edge = self.alloc_edge_pair(true);
        let edge = if is_ccw { edge } else { edge.sym() };

        self.set_org(edge, vertex);
        self.set_org(edge.sym(), vertex);
        self.set_lface(edge, lface);
        self.set_lface(edge.sym(), rface);
        edge
    }

    /// Splices the origin rings of the two edges, and independently
    /// their left-face rings: distinct rings are merged, a shared ring
    /// is broken in two.
    ///
    /// This is the attribute-maintaining version of the primitive: the
    /// vertex and face collections are updated (one vertex/face is
    /// destroyed on a merge, created on a split) and the corresponding
    /// events are posted.
    pub fn splice(&mut self, edge_org: EdgeId, edge_dst: EdgeId) {
        if edge_org == edge_dst {
            return;
        }

        let mut joining_vertices = false;
        if self.org(edge_org) != self.org(edge_dst) {
            joining_vertices = true;
            self.kill_vertex_at_orbit(self.org(edge_dst), self.org(edge_org));
        }

        let mut joining_faces = false;
        if self.lface(edge_org) != self.lface(edge_dst) {
            joining_faces = true;
            self.post(MeshEvent::FaceMerge(self.lface(edge_dst), self.lface(edge_org)));
            self.kill_face_at_orbit(self.lface(edge_dst), self.lface(edge_org));
        }

        self.splice_edge(edge_dst, edge_org);

        if !joining_vertices {
            // The ring was broken in two: the part around edge_dst gets
            // a fresh vertex.
            self.make_vertex_at_orbit(edge_dst);
            self.set_vertex_edge(self.org(edge_org), edge_org);
        }
        if !joining_faces {
            let face_new = self.make_face_at_orbit(edge_dst);
            self.post(MeshEvent::FaceSplit(self.lface(edge_org), face_new));
            self.set_face_edge(self.lface(edge_org), edge_org);
        }
    }

    /// Inserts a fresh vertex in the middle of `edge_org` and returns
    /// the new edge from that vertex to the old destination. Both new
    /// half-edges share the faces of `edge_org`.
    pub fn split(&mut self, edge_org: EdgeId) -> EdgeId {
        let edge_new;
        let edge_org_dprev = self.dprev(edge_org);
        if edge_org_dprev != edge_org {
            // The general case: insert a new edge before the
            // destination and flip it into place.
            let edge_new_sym = self.insert(edge_org_dprev, edge_org.sym());
            edge_new = edge_new_sym.sym();
        } else {
            // The destination has no other edges: append past it and
            // splice the new pair into the middle.
            let edge_new_sym = self.append(edge_org);
            edge_new = edge_new_sym.sym();

            let edge_org_sym = edge_org.sym();
            self.splice_edge(edge_org_sym, edge_new_sym);
            self.splice_edge(edge_org_sym, edge_new);

            self.set_dst(edge_org, self.org(edge_new));
            self.set_vertex_edge(self.dst(edge_new), edge_new_sym);
            self.set_lface(edge_new, self.lface(edge_org));
            self.set_lface(edge_new_sym, self.lface(edge_org_sym));
        }

        debug_assert!(self.dst(edge_org) == self.org(edge_new));
        self.post(MeshEvent::EdgeSplit(edge_org, edge_new));
        edge_new
    }

    /// Adds a new edge starting at `edge_org.dst`, sharing its left
    /// face. Returns the new edge; a fresh vertex is created at its
    /// destination.
    pub fn append(&mut self, edge_org: EdgeId) -> EdgeId {
        let edge_new = self.alloc_edge_pair(false);
        let edge_sym_new = edge_new.sym();

        self.splice_edge(edge_new, self.lnext(edge_org));
        self.set_org(edge_new, self.dst(edge_org));
        self.set_lface(edge_new, self.lface(edge_org));
        self.set_lface(edge_sym_new, self.lface(edge_org));
        self.make_vertex_at_orbit(edge_sym_new);
        edge_new
    }

    /// Inserts a new edge leaving `edge_org.dst` toward the ring of
    /// `edge_dst`; a fresh vertex is produced at its destination and the
    /// ring of `edge_dst` is moved onto it.
    pub fn insert(&mut self, edge_org: EdgeId, edge_dst: EdgeId) -> EdgeId {
        let edge_new = self.alloc_edge_pair(true);
        let edge_sym_new = edge_new.sym();

        self.splice_edge(edge_dst, edge_new);
        self.splice_edge(edge_org.sym(), edge_sym_new);

        self.set_org(edge_new, self.dst(edge_org));
        self.set_lface(edge_new, self.lface(edge_dst));
        self.set_rface(edge_new, self.rface(edge_org));
        self.make_vertex_at_orbit(edge_sym_new);
        edge_new
    }

    /// Removes an edge, the inverse of `insert`: the destination vertex
    /// is destroyed and the surrounding rings are reconnected. Handles
    /// isolated edges, isolated loops and single-vertex collapses.
    pub fn remove(&mut self, edge_del: EdgeId) {
        if self.kill_isolated_edge(edge_del) {
            return;
        }

        let mut edge_del = edge_del;
        let mut edge_dst = self.lnext(edge_del);
        let mut edge_sym_org = self.oprev(edge_del);
        let mut edge_sym = edge_del.sym();

        if edge_dst == edge_sym {
            // The destination vertex is isolated.
            edge_dst = edge_sym_org;
        } else if edge_sym_org == edge_del {
            // The origin vertex is isolated: remove the reversed edge.
            std::mem::swap(&mut edge_del, &mut edge_sym);
            edge_sym_org = edge_dst;
        }

        self.kill_vertex_at_orbit(self.dst(edge_del), self.org(edge_sym_org));

        self.splice_edge(edge_sym_org, edge_sym);
        self.splice_edge(edge_dst, edge_del);

        // The old representative edges may just have been detached.
        self.set_vertex_edge(self.org(edge_sym_org), edge_sym_org);
        self.set_face_edge(self.lface(edge_sym_org), edge_sym_org);
        self.set_face_edge(self.lface(edge_dst), edge_dst);

        self.kill_edge(edge_del);
    }

    /// Adds a new edge from `edge_org.dst` to `edge_dst.org` such that
    /// `edge_new.lface == edge_org.lface` afterwards; splits the face in
    /// two when both arguments share it, merges the two faces otherwise.
    pub fn connect(&mut self, edge_org: EdgeId, edge_dst: EdgeId) -> EdgeId {
        let edge_new = self.alloc_edge_pair(false);
        let edge_sym_new = edge_new.sym();

        let mut joining_faces = false;
        if self.lface(edge_org) != self.lface(edge_dst) {
            joining_faces = true;
            self.post(MeshEvent::FaceMerge(self.lface(edge_dst), self.lface(edge_org)));
            self.kill_face_at_orbit(self.lface(edge_dst), self.lface(edge_org));
        }

        self.splice_edge(edge_new, self.lnext(edge_org));
        self.splice_edge(edge_sym_new, edge_dst);

        self.set_org(edge_new, self.dst(edge_org));
        self.set_org(edge_sym_new, self.org(edge_dst));
        self.set_lface(edge_sym_new, self.lface(edge_org));

        if !joining_faces {
            let face_old = self.lface(edge_org);
            let face_new = self.make_face_at_orbit(edge_new);
            self.post(MeshEvent::FaceSplit(face_old, face_new));
        } else {
            self.set_lface(edge_new, self.lface(edge_org));
        }
        edge_new
    }

    /// Deletes an edge, the inverse of `connect`: merges its two faces
    /// when they are distinct, splits the shared face otherwise.
    pub fn delete(&mut self, edge_del: EdgeId) {
        let mut joining_faces = false;
        if self.lface(edge_del) != self.rface(edge_del) {
            joining_faces = true;
            self.post(MeshEvent::FaceMerge(self.lface(edge_del), self.rface(edge_del)));
            self.kill_face_at_orbit(self.lface(edge_del), self.rface(edge_del));
        }

        if self.onext(edge_del) == edge_del {
            self.kill_vertex_at_orbit(self.org(edge_del), VertexId::INVALID);
        } else {
            // The old representative edges may become invalid below.
            self.set_face_edge(self.rface(edge_del), self.oprev(edge_del));
            self.set_vertex_edge(self.org(edge_del), self.onext(edge_del));

            self.splice_edge(edge_del, self.oprev(edge_del));

            if !joining_faces {
                let face_old = self.lface(edge_del);
                let face_new = self.make_face_at_orbit(edge_del);
                self.post(MeshEvent::FaceSplit(face_old, face_new));
            }
        }

        let edge_sym = edge_del.sym();
        if self.onext(edge_sym) == edge_sym {
            // The other endpoint is isolated now.
            self.kill_vertex_at_orbit(self.org(edge_sym), VertexId::INVALID);
            self.kill_face_at_orbit(self.lface(edge_sym), FaceId::INVALID);
        } else {
            self.set_face_edge(self.lface(edge_del), self.oprev(edge_sym));
            self.set_vertex_edge(self.org(edge_sym), self.onext(edge_sym));

            self.splice_edge(edge_sym, self.oprev(edge_sym));
        }

        self.kill_edge(edge_del);
    }

    /// Validates the structural invariants, walking every orbit.
    pub fn check(&self) {
        let edge_invariants = |e: EdgeId| {
            assert!(e.sym() != e);
            assert!(e.sym().sym() == e);
            assert!(self.org(e).is_valid());
            assert!(self.dst(e).is_valid());
            assert!(self.lface(e).is_valid());
            assert!(self.onext(self.lnext(e)).sym() == e);
            assert!(self.lnext(self.onext(e).sym()) == e);
        };

        for e in self.edge_ids() {
            edge_invariants(e);
            edge_invariants(e.sym());
        }

        for f in self.face_ids() {
            let head = self.face_edge(f);
            let mut e = head;
            let mut iterations = 0;
            loop {
                edge_invariants(e);
                assert!(self.lface(e) == f);
                e = self.lnext(e);
                iterations += 1;
                assert!(iterations < MAX_LOOP_ITERATIONS);
                if e == head {
                    break;
                }
            }
        }

        for v in self.vertex_ids() {
            let head = self.vertex_edge(v);
            let mut e = head;
            let mut iterations = 0;
            loop {
                edge_invariants(e);
                assert!(self.org(e) == v);
                e = self.onext(e);
                iterations += 1;
                assert!(iterations < MAX_LOOP_ITERATIONS);
                if e == head {
                    break;
                }
            }
        }
    }
}

impl<E: Default, F: Default, V: Default> Default for Mesh<E, F, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestMesh = Mesh<i32, (), ()>;

    #[test]
    fn make_edge_invariants() {
        let mut mesh = TestMesh::new();
        let e = mesh.make_edge();

        assert_eq!(mesh.vertex_count(), 2);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 1);
        assert!(mesh.is_isolated(e));
        assert!(mesh.org(e) != mesh.dst(e));
        assert!(mesh.lface(e) == mesh.rface(e));
        mesh.check();
    }

    #[test]
    fn make_loop_edge_invariants() {
        let mut mesh = TestMesh::new();
        let e = mesh.make_loop_edge(false);

        assert_eq!(mesh.vertex_count(), 1);
        assert_eq!(mesh.face_count(), 2);
        assert!(mesh.is_isolated_loop(e));
        assert!(mesh.org(e) == mesh.dst(e));
        assert!(mesh.lface(e) != mesh.rface(e));
        mesh.check();
    }

    fn make_triangle(mesh: &mut TestMesh) -> (EdgeId, EdgeId, EdgeId) {
        let e0 = mesh.make_edge();
        let e1 = mesh.append(e0);
        let e2 = mesh.connect(e1, e0);
        (e0, e1, e2)
    }

    #[test]
    fn triangle_topology() {
        let mut mesh = TestMesh::new();
        let (e0, e1, e2) = make_triangle(&mut mesh);

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.edge_count(), 3);
        assert_eq!(mesh.lnext(e0), e1);
        assert_eq!(mesh.lnext(e1), e2);
        assert_eq!(mesh.lnext(e2), e0);
        assert!(mesh.lface(e2) != mesh.rface(e2));
        mesh.check();
    }

    #[test]
    fn delete_is_inverse_of_connect() {
        let mut mesh = TestMesh::new();
        let (_, _, e2) = make_triangle(&mut mesh);

        mesh.delete(e2);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 2);
        mesh.check();
    }

    #[test]
    fn remove_is_inverse_of_insert() {
        let mut mesh = TestMesh::new();
        let (e0, e1, _) = make_triangle(&mut mesh);

        let e3 = mesh.insert(e0, e1);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.edge_count(), 4);
        mesh.check();

        mesh.remove(e3);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.edge_count(), 3);
        mesh.check();
    }

    #[test]
    fn split_keeps_ids_stable() {
        let mut mesh = TestMesh::new();
        let (e0, _, _) = make_triangle(&mut mesh);

        let uid_before = mesh.edge_uid(e0);
        let old_dst = mesh.dst(e0);
        let e_new = mesh.split(e0);

        assert_eq!(mesh.edge_uid(e0), uid_before);
        assert!(mesh.edge_uid(e_new) != uid_before);
        assert_eq!(mesh.dst(e0), mesh.org(e_new));
        assert_eq!(mesh.dst(e_new), old_dst);
        assert!(mesh.lface(e_new) == mesh.lface(e0));
        assert!(mesh.rface(e_new) == mesh.rface(e0));
        mesh.check();
    }

    #[test]
    fn splice_merges_then_splits_vertices() {
        let mut mesh = TestMesh::new();
        let a = mesh.make_edge();
        let b = mesh.make_edge();
        assert_eq!(mesh.vertex_count(), 4);

        // Distinct origins: merge.
        mesh.splice(a, b);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.org(a), mesh.org(b));
        mesh.check();

        // Shared origin: split the ring again.
        mesh.splice(a, b);
        assert_eq!(mesh.vertex_count(), 4);
        assert!(mesh.org(a) != mesh.org(b));
        mesh.check();
    }

    #[test]
    fn insertion_order_is_settable() {
        let mut mesh = TestMesh::new();
        mesh.set_vertex_order(InsertionOrder::InsertTail);
        let e0 = mesh.make_edge();
        mesh.set_vertex_order(InsertionOrder::InsertHead);
        let e1 = mesh.make_edge();

        // Head insertion puts the newest vertex (the destination of e1,
        // allocated last) first; tail insertion left e0's destination last.
        let order: Vec<VertexId> = mesh.vertex_ids().collect();
        assert_eq!(order[0], mesh.dst(e1));
        assert_eq!(order[order.len() - 1], mesh.dst(e0));
    }

    struct WindingPropagator;

    impl MeshListener<i32, (), ()> for WindingPropagator {
        fn on_mesh_event(&mut self, event: MeshEvent, payloads: &mut MeshPayloads<i32, (), ()>) {
            if let MeshEvent::EdgeSplit(org, dst) = event {
                *payloads.edge_mut(dst) = *payloads.edge(org);
                *payloads.edge_mut(dst.sym()) = *payloads.edge(org.sym());
            }
        }
    }

    #[test]
    fn listener_propagates_payloads_across_split() {
        let mut mesh = TestMesh::new();
        mesh.set_listener(Box::new(WindingPropagator), EventMask::EDGE_SPLIT);

        let (e0, _, _) = make_triangle(&mut mesh);
        *mesh.edge_data_mut(e0) = 7;
        *mesh.edge_data_mut(e0.sym()) = -7;

        let e_new = mesh.split(e0);
        assert_eq!(*mesh.edge_data(e_new), 7);
        assert_eq!(*mesh.edge_data(e_new.sym()), -7);
    }
}
