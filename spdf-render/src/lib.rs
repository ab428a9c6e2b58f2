//! Document backend built on pdfium.
//!
//! Pixel and rectangle conversions that do not need the pdfium library are
//! kept free functions so they can be exercised without it.

use anyhow::{anyhow, Result};
use image::{imageops, RgbaImage};
use spdf_core::layout::POINTS_PER_INCH;
use spdf_core::{intersect, DocRect, RenderImage, ScreenRect};

#[cfg(feature = "pdf")]
mod pdfium;

#[cfg(feature = "pdf")]
pub use pdfium::PdfiumProvider;

/// Part of a page that one rasterization actually produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderWindow {
    /// Output pixels per document unit.
    pub scale: f32,
    /// Requested crop clamped to the page, in output pixels.
    pub window: ScreenRect,
}

impl RenderWindow {
    /// `shown_width` and `shown_height` are the page size in document units
    /// with the view rotation applied.
    pub fn plan(shown_width: f64, shown_height: f64, dpi: f64, crop: ScreenRect) -> Self {
        let scale = dpi / POINTS_PER_INCH;
        let page = ScreenRect::new(
            0,
            0,
            (shown_width * scale).round() as i32,
            (shown_height * scale).round() as i32,
        );
        Self {
            scale: scale as f32,
            window: intersect(&crop.normalized(), &page),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// Cuts `crop` out of an RGBA bitmap. The crop is clamped to the bitmap
/// bounds.
pub fn crop_pixels(width: u32, height: u32, pixels: Vec<u8>, crop: ScreenRect) -> Result<RenderImage> {
    let full = RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("bitmap buffer does not match {}x{}", width, height))?;

    let x = (crop.x.max(0) as u32).min(width);
    let y = (crop.y.max(0) as u32).min(height);
    let w = (crop.width.max(0) as u32).min(width - x);
    let h = (crop.height.max(0) as u32).min(height - y);

    if (x, y, w, h) == (0, 0, width, height) {
        return Ok(RenderImage {
            width,
            height,
            pixels: full.into_raw(),
        });
    }

    let cropped = imageops::crop_imm(&full, x, y, w, h).to_image();
    Ok(RenderImage {
        width: cropped.width(),
        height: cropped.height(),
        pixels: cropped.into_raw(),
    })
}

/// Edges of a box in native page space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl NativeBox {
    /// Same box with the origin moved to the top-left of a page `page_height`
    /// units tall.
    pub fn to_top_left(self, page_height: f32) -> DocRect {
        DocRect::new(
            f64::from(self.left),
            f64::from(page_height - self.top),
            f64::from(self.right - self.left),
            f64::from(self.top - self.bottom),
        )
    }

    /// Native-space rectangle anchored at the bottom-left corner.
    pub fn to_native_rect(self) -> DocRect {
        DocRect::new(
            f64::from(self.left),
            f64::from(self.bottom),
            f64::from(self.right - self.left),
            f64::from(self.top - self.bottom),
        )
    }

    /// Inverse of [`NativeBox::to_top_left`].
    pub fn from_top_left(rect: &DocRect, page_height: f32) -> Self {
        let r = rect.normalized();
        Self {
            left: r.x as f32,
            right: r.right() as f32,
            top: page_height - r.y as f32,
            bottom: page_height - r.bottom() as f32,
        }
    }
}

/// Smallest box covering every segment of one search hit.
pub fn union_boxes(boxes: impl IntoIterator<Item = NativeBox>) -> Option<NativeBox> {
    boxes.into_iter().reduce(|a, b| NativeBox {
        left: a.left.min(b.left),
        bottom: a.bottom.min(b.bottom),
        right: a.right.max(b.right),
        top: a.top.max(b.top),
    })
}
