use std::io::Write;

use anyhow::Result;
use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use spdf_core::{
    intersect, Config, LineMetrics, Paint, RenderImage, Rgb, ScreenPoint, ScreenRect, Surface,
};
use tracing::trace;

use crate::input::CellSize;
use crate::KittyRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb,
    pub status_background: Rgb,
    pub status_foreground: Rgb,
}

impl From<&Config> for Palette {
    fn from(config: &Config) -> Self {
        Self {
            background: config.background,
            status_background: config.status_background,
            status_foreground: config.status_foreground,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextRun {
    column: u16,
    row: u16,
    text: String,
}

/// Pixel canvas covering the whole terminal window.
///
/// Drawing only touches the canvas; `present` ships it to the terminal as a
/// single kitty image. Text is printed as terminal cells on top of the image.
pub struct KittySurface<W: Write> {
    renderer: KittyRenderer<W>,
    palette: Palette,
    cell: CellSize,
    canvas: RenderImage,
    texts: Vec<TextRun>,
    stale_rows: Vec<u16>,
}

impl<W: Write> KittySurface<W> {
    pub fn new(writer: W, palette: Palette, cell: CellSize, width: u32, height: u32) -> Self {
        Self {
            renderer: KittyRenderer::new(writer),
            palette,
            cell,
            canvas: blank(width, height, palette.background),
            texts: Vec::new(),
            stale_rows: Vec::new(),
        }
    }

    /// Replaces the canvas with a blank one of the new size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.canvas.width, self.canvas.height) {
            self.canvas = blank(width, height, self.palette.background);
        }
    }

    pub fn canvas(&self) -> &RenderImage {
        &self.canvas
    }

    pub fn renderer(&mut self) -> &mut KittyRenderer<W> {
        &mut self.renderer
    }

    fn bounds(&self) -> ScreenRect {
        ScreenRect::new(0, 0, self.canvas.width as i32, self.canvas.height as i32)
    }

    fn paint_rect(&mut self, rect: ScreenRect, mut f: impl FnMut(&mut [u8])) {
        let area = intersect(&rect, &self.bounds());
        if area.is_empty() {
            return;
        }
        let stride = self.canvas.width as usize * 4;
        for y in area.y..area.bottom() {
            let start = y as usize * stride + area.x as usize * 4;
            let end = start + area.width as usize * 4;
            self.canvas.pixels[start..end]
                .chunks_exact_mut(4)
                .for_each(&mut f);
        }
    }

    /// Drops text runs whose cell row overlaps `rect`.
    fn forget_text(&mut self, rect: ScreenRect) {
        let cell_h = i32::from(self.cell.height);
        let stale = &mut self.stale_rows;
        self.texts.retain(|run| {
            let top = i32::from(run.row) * cell_h;
            let covered = top < rect.bottom() && rect.y < top + cell_h;
            if covered {
                stale.push(run.row);
            }
            !covered
        });
    }
}

impl<W: Write> Surface for KittySurface<W> {
    fn clear_rect(&mut self, rect: ScreenRect) -> Result<()> {
        let [r, g, b] = self.palette.background;
        self.paint_rect(rect, |px| px.copy_from_slice(&[r, g, b, 255]));
        self.forget_text(rect);
        Ok(())
    }

    fn blit(&mut self, image: &RenderImage, src: ScreenPoint, dest: ScreenRect) -> Result<()> {
        // Keep the copy inside both the canvas and the source bitmap.
        let source = ScreenRect::new(
            dest.x - src.x,
            dest.y - src.y,
            image.width as i32,
            image.height as i32,
        );
        let area = intersect(&intersect(&dest, &self.bounds()), &source);
        if area.is_empty() {
            return Ok(());
        }

        let dst_stride = self.canvas.width as usize * 4;
        let src_stride = image.width as usize * 4;
        let row_len = area.width as usize * 4;
        for y in area.y..area.bottom() {
            let from = (y - source.y) as usize * src_stride + (area.x - source.x) as usize * 4;
            let to = y as usize * dst_stride + area.x as usize * 4;
            self.canvas.pixels[to..to + row_len]
                .copy_from_slice(&image.pixels[from..from + row_len]);
        }
        Ok(())
    }

    fn fill_rect(&mut self, rect: ScreenRect, paint: Paint) -> Result<()> {
        match paint {
            Paint::Highlight => self.paint_rect(rect, |px| {
                px[0] = 255 - px[0];
                px[1] = 255 - px[1];
                px[2] = 255 - px[2];
            }),
            Paint::StatusBar => {
                let [r, g, b] = self.palette.status_background;
                self.paint_rect(rect, |px| px.copy_from_slice(&[r, g, b, 255]));
                self.forget_text(rect);
            }
        }
        Ok(())
    }

    fn draw_text(&mut self, origin: ScreenPoint, text: &str) -> Result<()> {
        // The baseline sits inside the cell row that should hold the text.
        let column = (origin.x.max(0) / i32::from(self.cell.width)) as u16;
        let row = ((origin.y - 1).max(0) / i32::from(self.cell.height)) as u16;
        self.texts.retain(|run| run.row != row);
        self.texts.push(TextRun {
            column,
            row,
            text: text.to_owned(),
        });
        Ok(())
    }

    fn line_metrics(&self) -> LineMetrics {
        let height = i32::from(self.cell.height);
        LineMetrics {
            height,
            descent: height / 4,
        }
    }

    fn present(&mut self) -> Result<()> {
        trace!(
            width = self.canvas.width,
            height = self.canvas.height,
            texts = self.texts.len(),
            "presenting frame"
        );
        self.renderer.begin_sync_update()?;

        let writer = self.renderer.writer();
        for row in self.stale_rows.drain(..) {
            queue!(writer, cursor::MoveTo(0, row), Clear(ClearType::CurrentLine))?;
        }
        queue!(writer, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&self.canvas)?;

        let [fr, fg, fb] = self.palette.status_foreground;
        let [br, bg, bb] = self.palette.status_background;
        let writer = self.renderer.writer();
        for run in &self.texts {
            queue!(
                writer,
                cursor::MoveTo(run.column, run.row),
                SetForegroundColor(Color::Rgb { r: fr, g: fg, b: fb }),
                SetBackgroundColor(Color::Rgb { r: br, g: bg, b: bb }),
                Print(&run.text),
                ResetColor
            )?;
        }

        self.renderer.end_sync_update()
    }
}

fn blank(width: u32, height: u32, background: Rgb) -> RenderImage {
    let [r, g, b] = background;
    RenderImage::filled(width, height, [r, g, b, 255])
}
