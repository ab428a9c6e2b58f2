use anyhow::Result;

use crate::document::RenderImage;
use crate::geometry::{ScreenPoint, ScreenRect};

/// How a filled rectangle is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    /// Invert whatever is already on the surface.
    Highlight,
    /// Solid status bar background.
    StatusBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMetrics {
    /// Full height of one line of text.
    pub height: i32,
    /// Distance from the baseline to the bottom of the line.
    pub descent: i32,
}

/// One primitive drawing step. Ordered lists of these are produced by the
/// repaint planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOp {
    Clear(ScreenRect),
    /// Copy `dest.width` x `dest.height` pixels starting at `src` in the
    /// page bitmap to `dest`.
    Blit { src: ScreenPoint, dest: ScreenRect },
    Fill { rect: ScreenRect, paint: Paint },
    /// `origin` is the left end of the baseline.
    Text { origin: ScreenPoint, text: String },
}

pub trait Surface {
    fn clear_rect(&mut self, rect: ScreenRect) -> Result<()>;
    fn blit(&mut self, image: &RenderImage, src: ScreenPoint, dest: ScreenRect) -> Result<()>;
    fn fill_rect(&mut self, rect: ScreenRect, paint: Paint) -> Result<()>;
    fn draw_text(&mut self, origin: ScreenPoint, text: &str) -> Result<()>;
    fn line_metrics(&self) -> LineMetrics;
    /// Flush everything drawn since the last call.
    fn present(&mut self) -> Result<()>;
}

/// Runs `op` against `surface`. Blits are skipped when there is no bitmap.
pub fn execute<S: Surface + ?Sized>(
    surface: &mut S,
    image: Option<&RenderImage>,
    op: &DrawOp,
) -> Result<()> {
    match op {
        DrawOp::Clear(rect) => surface.clear_rect(*rect),
        DrawOp::Blit { src, dest } => match image {
            Some(image) => surface.blit(image, *src, *dest),
            None => Ok(()),
        },
        DrawOp::Fill { rect, paint } => surface.fill_rect(*rect, *paint),
        DrawOp::Text { origin, text } => surface.draw_text(*origin, text),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSurface;
    use super::*;

    #[test]
    fn blit_without_bitmap_is_skipped() {
        let mut surface = RecordingSurface::default();
        let op = DrawOp::Blit {
            src: ScreenPoint::new(0, 0),
            dest: ScreenRect::new(0, 0, 10, 10),
        };
        execute(&mut surface, None, &op).unwrap();
        assert!(surface.calls.is_empty());

        let image = RenderImage::filled(10, 10, [0, 0, 0, 255]);
        execute(&mut surface, Some(&image), &op).unwrap();
        assert_eq!(surface.calls.len(), 1);
        assert!(surface.calls[0].starts_with("blit 10x10"));
    }

    #[test]
    fn ops_dispatch_to_matching_calls() {
        let mut surface = RecordingSurface::default();
        let ops = [
            DrawOp::Clear(ScreenRect::new(0, 0, 1, 1)),
            DrawOp::Fill {
                rect: ScreenRect::new(0, 0, 2, 2),
                paint: Paint::StatusBar,
            },
            DrawOp::Text {
                origin: ScreenPoint::new(1, 2),
                text: "page 1/3".into(),
            },
        ];
        for op in &ops {
            execute(&mut surface, None, op).unwrap();
        }
        assert!(surface.calls[0].starts_with("clear"));
        assert!(surface.calls[1].starts_with("fill StatusBar"));
        assert!(surface.calls[2].ends_with("page 1/3"));
    }
}
