use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

/// Component type of a [`Rect`]: integer pixels or real document units.
pub trait Scalar:
    Copy
    + Debug
    + Default
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    const ZERO: Self;
    const TWO: Self;
}

impl Scalar for i32 {
    const ZERO: Self = 0;
    const TWO: Self = 2;
}

impl Scalar for f64 {
    const ZERO: Self = 0.0;
    const TWO: Self = 2.0;
}

fn max<T: Scalar>(a: T, b: T) -> T {
    if a > b {
        a
    } else {
        b
    }
}

fn min<T: Scalar>(a: T, b: T) -> T {
    if a < b {
        a
    } else {
        b
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
///
/// Width and height may be negative while a rubber band is being dragged; use
/// [`Rect::normalized`] before handing such a rectangle to any set operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rect<T> {
    pub x: T,
    pub y: T,
    pub width: T,
    pub height: T,
}

/// Pixels on the drawing surface, origin at the top-left of the window.
pub type ScreenRect = Rect<i32>;

/// Document units (1/72 inch).
pub type DocRect = Rect<f64>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl<T: Scalar> Rect<T> {
    pub const fn new(x: T, y: T, width: T, height: T) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> T {
        self.x + self.width
    }

    pub fn bottom(&self) -> T {
        self.y + self.height
    }

    /// True when any component is negative. An empty intersection is
    /// reported this way.
    pub fn is_invalid(&self) -> bool {
        self.x < T::ZERO || self.y < T::ZERO || self.width < T::ZERO || self.height < T::ZERO
    }

    /// True when the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        !(self.width > T::ZERO && self.height > T::ZERO)
    }

    /// Same region with non-negative extents.
    pub fn normalized(&self) -> Self {
        let mut r = *self;
        if r.width < T::ZERO {
            r.width = -r.width;
            r.x = r.x - r.width;
        }
        if r.height < T::ZERO {
            r.height = -r.height;
            r.y = r.y - r.height;
        }
        r
    }

    pub fn padded(&self, p: T) -> Self {
        Self {
            x: self.x - p,
            y: self.y - p,
            width: self.width + T::TWO * p,
            height: self.height + T::TWO * p,
        }
    }

    pub fn translate(&self, dx: T, dy: T) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Edge-inclusive containment test.
    pub fn contains(&self, px: T, py: T) -> bool {
        px >= self.x && py >= self.y && px <= self.right() && py <= self.bottom()
    }
}

/// Overlap of `a` and `b`. When they do not overlap at least one extent of
/// the result is negative (or zero when they merely touch).
pub fn intersect<T: Scalar>(a: &Rect<T>, b: &Rect<T>) -> Rect<T> {
    let x1 = max(a.x, b.x);
    let x2 = min(a.right(), b.right());
    let y1 = max(a.y, b.y);
    let y2 = min(a.bottom(), b.bottom());
    Rect::new(x1, y1, x2 - x1, y2 - y1)
}

/// Covers `a \ b` with at most four strips: top, bottom, left, right.
///
/// Left and right strips span the band shared by both rectangles. When the
/// rectangles do not overlap, `a` is returned unchanged.
pub fn subtract<T: Scalar>(a: &Rect<T>, b: &Rect<T>) -> Vec<Rect<T>> {
    let overlap = intersect(a, b);
    if overlap.is_empty() {
        return vec![*a];
    }

    let mut strips = Vec::with_capacity(4);

    if a.y < b.y {
        strips.push(Rect::new(a.x, a.y, a.width, b.y - a.y));
    }
    if a.bottom() > b.bottom() {
        strips.push(Rect::new(a.x, b.bottom(), a.width, a.bottom() - b.bottom()));
    }
    if a.x < b.x {
        strips.push(Rect::new(a.x, overlap.y, b.x - a.x, overlap.height));
    }
    if a.right() > b.right() {
        strips.push(Rect::new(
            b.right(),
            overlap.y,
            a.right() - b.right(),
            overlap.height,
        ));
    }

    strips
}
