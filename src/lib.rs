#![deny(bare_trait_objects)]
#![deny(unconditional_recursion)]
#![allow(dead_code)]
#![allow(clippy::float_cmp)]
#![allow(clippy::too_many_arguments)]

//! Tessellation of arbitrary 2D polygons.
//!
//! Given a closed polygon (possibly self-intersecting, with multiple
//! contours and either fill rule), the [`Tessellator`](struct.Tessellator.html)
//! produces an equivalent set of simple regions — monotone pieces, convex
//! pieces or a plain triangle set — suitable for a GPU or scanline
//! rasterizer.
//!
//! The algorithm is libtess2-flavored, with a horizontal sweep line:
//!
//! 1. build a half-edge mesh (DCEL) from the input polygon,
//! 2. sweep the mesh into horizontally monotone regions, computing edge
//!    intersections and winding numbers along the way,
//! 3. triangulate each monotone region,
//! 4. optionally merge the triangles back into convex polygons.
//!
//! Differences from stock libtess2 worth knowing about:
//!
//! - the sweep is horizontal and works directly on the input coordinates
//!   (no projection step, the input is 2D already),
//! - several intersection cases with numerical errors are repaired
//!   instead of aborting, so the sweep is stable on degenerate input,
//! - the convex merging pass does not count vertices per region, it
//!   walks face boundaries, which makes it cheaper.
//!
//! ## Example
//!
//! ```
//! use polytess::math::{point, rect};
//! use polytess::{FillRule, Polygon, Tessellator, TessellationMode};
//!
//! let square = Polygon::from_contours(
//!     &[&[
//!         point(0.0, 0.0),
//!         point(1.0, 0.0),
//!         point(1.0, 1.0),
//!         point(0.0, 1.0),
//!         point(0.0, 0.0),
//!     ][..]],
//!     false,
//! );
//!
//! let mut tess = Tessellator::new();
//! tess.set_mode(TessellationMode::Triangulation);
//! tess.set_fill_rule(FillRule::NonZero);
//!
//! let output = tess.make(&square, &rect(0.0, 0.0, 1.0, 1.0)).unwrap();
//! assert_eq!(output.counts[..output.counts.len() - 1], [3, 3]);
//! ```

#[cfg(feature = "serialization")]
#[macro_use]
pub extern crate serde;

mod active_region;
mod convex;
mod event_queue;
mod geom;
pub mod mesh;
mod monotone;
mod tessellator;
mod triangulation;

#[cfg(test)]
mod tess_tests;

pub use crate::tessellator::Tessellator;

pub mod math {
    //! f32 aliases of the euclid types used everywhere in this crate.

    pub use euclid;

    /// Alias for `euclid::default::Point2D<f32>`.
    pub type Point = euclid::default::Point2D<f32>;

    /// Alias for `euclid::default::Vector2D<f32>`.
    pub type Vector = euclid::default::Vector2D<f32>;

    /// Alias for `euclid::default::Size2D<f32>`.
    pub type Size = euclid::default::Size2D<f32>;

    /// Alias for `euclid::default::Rect<f32>`.
    pub type Rect = euclid::default::Rect<f32>;

    /// Shorthand for `Point::new(x, y)`.
    #[inline]
    pub fn point(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    /// Shorthand for `Vector::new(x, y)`.
    #[inline]
    pub fn vector(x: f32, y: f32) -> Vector {
        Vector::new(x, y)
    }

    /// Shorthand for `Size::new(w, h)`.
    #[inline]
    pub fn size(w: f32, h: f32) -> Size {
        Size::new(w, h)
    }

    /// Shorthand for `Rect::new(point(x, y), size(w, h))`.
    #[inline]
    pub fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect {
            origin: point(x, y),
            size: size(w, h),
        }
    }
}

use crate::math::Point;

/// The fill rule used to derive the insideness of a region from its
/// winding number.
///
/// See the [SVG specification](https://www.w3.org/TR/SVG/painting.html#FillRuleProperty).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum FillRule {
    /// The odd (a.k.a. even-odd) rule.
    EvenOdd,
    /// The non-zero rule.
    NonZero,
}

impl FillRule {
    #[inline]
    pub fn is_in(self, winding_number: i32) -> bool {
        match self {
            FillRule::EvenOdd => winding_number % 2 != 0,
            FillRule::NonZero => winding_number != 0,
        }
    }

    #[inline]
    pub fn is_out(self, winding_number: i32) -> bool {
        !self.is_in(winding_number)
    }
}

impl Default for FillRule {
    fn default() -> Self {
        FillRule::EvenOdd
    }
}

/// How far down the pipeline the tessellator goes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum TessellationMode {
    /// Decompose into convex polygons (monotone pass, triangulation,
    /// then convex merging).
    Convex,
    /// Stop after the monotone pass.
    Monotone,
    /// Stop after triangulating the monotone regions.
    Triangulation,
}

impl Default for TessellationMode {
    fn default() -> Self {
        TessellationMode::Convex
    }
}

/// Parameters for the tessellator.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub struct Options {
    /// What the output should be decomposed into.
    ///
    /// Default value: `TessellationMode::Convex`.
    pub mode: TessellationMode,

    /// The fill rule.
    ///
    /// Default value: `EvenOdd`.
    pub fill_rule: FillRule,

    /// Whether each output contour duplicates its first point at the end.
    ///
    /// Default value: `false`.
    pub auto_closed: bool,
}

impl Options {
    pub const DEFAULT: Self = Options {
        mode: TessellationMode::Convex,
        fill_rule: FillRule::EvenOdd,
        auto_closed: false,
    };

    #[inline]
    pub fn even_odd() -> Self {
        Self::DEFAULT
    }

    #[inline]
    pub fn non_zero() -> Self {
        Self::DEFAULT.with_fill_rule(FillRule::NonZero)
    }

    #[inline]
    pub const fn with_mode(mut self, mode: TessellationMode) -> Self {
        self.mode = mode;
        self
    }

    #[inline]
    pub const fn with_fill_rule(mut self, rule: FillRule) -> Self {
        self.fill_rule = rule;
        self
    }

    #[inline]
    pub const fn with_auto_closed(mut self, auto_closed: bool) -> Self {
        self.auto_closed = auto_closed;
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A polygon as a flat point buffer plus per-contour vertex counts.
///
/// This is both the input and the output shape of the tessellator. The
/// `counts` buffer is zero-terminated; `points` is indexed by the prefix
/// sums of `counts`. Input contours are expected to be closed (first
/// point equal to the last) and to contain at least three distinct
/// vertices; degenerate contours are silently dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    pub points: Vec<Point>,
    pub counts: Vec<u16>,
    pub total: usize,
    pub convex: bool,
}

impl Polygon {
    pub fn new() -> Self {
        Polygon {
            points: Vec::new(),
            counts: Vec::new(),
            total: 0,
            convex: false,
        }
    }

    /// Builds a polygon from a set of closed contours.
    pub fn from_contours(contours: &[&[Point]], convex: bool) -> Self {
        let mut polygon = Polygon::new();
        polygon.convex = convex;
        for contour in contours {
            debug_assert!(contour.len() <= u16::MAX as usize);
            polygon.points.extend_from_slice(contour);
            polygon.counts.push(contour.len() as u16);
            polygon.total += contour.len();
        }
        polygon.counts.push(0);
        polygon
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Iterates over the contours as point slices.
    pub fn contours(&self) -> impl Iterator<Item = &[Point]> + '_ {
        let mut offset = 0;
        self.counts
            .iter()
            .take_while(|&&count| count != 0)
            .map(move |&count| {
                let contour = &self.points[offset..offset + count as usize];
                offset += count as usize;
                contour
            })
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
        self.counts.clear();
        self.total = 0;
        self.convex = false;
    }
}

#[test]
fn polygon_contours() {
    use crate::math::point;

    let polygon = Polygon::from_contours(
        &[
            &[point(0.0, 0.0), point(1.0, 0.0), point(0.0, 0.0)][..],
            &[point(2.0, 0.0), point(3.0, 0.0), point(2.0, 0.0)][..],
        ],
        false,
    );

    assert_eq!(polygon.total, 6);
    assert_eq!(polygon.counts, [3, 3, 0]);
    assert_eq!(polygon.contours().count(), 2);
}

#[test]
fn fill_rules() {
    assert!(FillRule::EvenOdd.is_in(1));
    assert!(FillRule::EvenOdd.is_in(-1));
    assert!(FillRule::EvenOdd.is_out(2));
    assert!(FillRule::NonZero.is_in(2));
    assert!(FillRule::NonZero.is_out(0));
}
