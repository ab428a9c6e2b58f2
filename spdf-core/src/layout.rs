use crate::document::PageBox;
use crate::geometry::{DocRect, ScreenRect};

/// Resolution at which one document unit equals one pixel.
pub const POINTS_PER_INCH: f64 = 72.0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    /// The whole page (or magnified region) is visible.
    #[default]
    FitPage,
    /// Page width matches the viewport; the page scrolls vertically.
    FitWidth,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn clockwise(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    pub fn counter_clockwise(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg270,
            Rotation::Deg90 => Rotation::Deg0,
            Rotation::Deg180 => Rotation::Deg90,
            Rotation::Deg270 => Rotation::Deg180,
        }
    }

    /// Whether `self` and `other` differ by an odd multiple of 90 degrees.
    pub fn is_quarter_turn_from(self, other: Rotation) -> bool {
        (self.degrees() - other.degrees()).abs() % 180 != 0
    }
}

/// Vertical placement rule used when a `FitWidth` page is taller than the
/// viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAnchor {
    /// Place the page top at `offset` (0 or negative) pixels.
    Top { offset: i32 },
    /// Align the page bottom with the viewport bottom.
    Bottom,
}

impl Default for ScrollAnchor {
    fn default() -> Self {
        ScrollAnchor::Top { offset: 0 }
    }
}

/// Output of [`configure`] for one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPlacement {
    pub dpi: f64,
    /// Where the rendered image sits on the surface.
    pub dest: ScreenRect,
    /// Region of the page to rasterize, in output pixels at `dpi`.
    pub crop: ScreenRect,
}

/// Derives resolution, placement and crop for a page shown in `viewport`.
///
/// Pure: the result depends only on the arguments.
pub fn configure(
    viewport: ScreenRect,
    fit: FitMode,
    anchor: ScrollAnchor,
    page: &PageBox,
    magnify: Option<DocRect>,
    rotation: Rotation,
) -> RenderPlacement {
    let (mut x0, mut y0) = (page.x, page.y);
    let (mut width, mut height) = page.oriented_size(rotation);

    if let Some(m) = magnify {
        x0 = m.x;
        y0 = m.y;
        width = m.width;
        height = m.height;
    }

    let view_w = f64::from(viewport.width);
    let view_h = f64::from(viewport.height);
    let view_ratio = view_w / view_h;
    let content_ratio = width / height;

    let (x, y, w, h, dpi);
    match fit {
        FitMode::FitPage if view_ratio > content_ratio => {
            h = viewport.height;
            dpi = view_h * POINTS_PER_INCH / height;
            w = (width * dpi / POINTS_PER_INCH) as i32;
            x = (viewport.width - w) / 2;
            y = 0;
        }
        FitMode::FitPage => {
            w = viewport.width;
            dpi = view_w * POINTS_PER_INCH / width;
            h = (height * dpi / POINTS_PER_INCH) as i32;
            x = 0;
            y = (viewport.height - h) / 2;
        }
        FitMode::FitWidth => {
            w = viewport.width;
            dpi = view_w * POINTS_PER_INCH / width;
            h = (height * dpi / POINTS_PER_INCH) as i32;
            x = 0;
            y = if view_ratio <= content_ratio {
                (viewport.height - h) / 2
            } else {
                match anchor {
                    ScrollAnchor::Top { offset } => offset,
                    ScrollAnchor::Bottom => viewport.height - h,
                }
            };
        }
    }

    let scale = dpi / POINTS_PER_INCH;
    RenderPlacement {
        dpi,
        dest: ScreenRect::new(x, y, w, h),
        crop: ScreenRect::new(
            (x0 * scale) as i32,
            (y0 * scale) as i32,
            (width * scale) as i32,
            (height * scale) as i32,
        ),
    }
}
