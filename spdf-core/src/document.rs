use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, instrument};

use crate::error::ViewerError;
use crate::geometry::{DocRect, ScreenRect};
use crate::layout::Rotation;

#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub page_count: usize,
    pub metadata: DocumentMetadata,
}

impl DocumentInfo {
    /// Title from the metadata, falling back to the file name.
    pub fn display_title(&self) -> String {
        self.metadata
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| {
                self.path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| self.path.display().to_string())
            })
    }
}

/// Intrinsic page box in document units plus the rotation the page carries
/// on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: Rotation,
}

impl PageBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            rotation: Rotation::Deg0,
        }
    }

    /// Width and height as displayed under `rotation`.
    pub fn oriented_size(&self, rotation: Rotation) -> (f64, f64) {
        if self.rotation.is_quarter_turn_from(rotation) {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Maps `rect` on the page as shown under `rotation` back to the page's
    /// own top-left space.
    pub fn unrotate_rect(&self, rect: &DocRect, rotation: Rotation) -> DocRect {
        let r = rect.normalized();
        match self.turn(rotation) {
            Rotation::Deg0 => r,
            Rotation::Deg90 => DocRect::new(r.y, self.height - r.right(), r.height, r.width),
            Rotation::Deg180 => self.half_turn(&r),
            Rotation::Deg270 => DocRect::new(self.width - r.bottom(), r.x, r.height, r.width),
        }
    }

    /// Inverse of [`PageBox::unrotate_rect`].
    pub fn rotate_rect(&self, rect: &DocRect, rotation: Rotation) -> DocRect {
        let r = rect.normalized();
        match self.turn(rotation) {
            Rotation::Deg0 => r,
            Rotation::Deg90 => DocRect::new(self.height - r.bottom(), r.x, r.height, r.width),
            Rotation::Deg180 => self.half_turn(&r),
            Rotation::Deg270 => DocRect::new(r.y, self.width - r.right(), r.height, r.width),
        }
    }

    /// Clockwise turn from the page's own orientation to `rotation`.
    fn turn(&self, rotation: Rotation) -> Rotation {
        match (rotation.degrees() - self.rotation.degrees()).rem_euclid(360) {
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    fn half_turn(&self, r: &DocRect) -> DocRect {
        DocRect::new(
            self.width - r.right(),
            self.height - r.bottom(),
            r.width,
            r.height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: usize,
    pub dpi: f64,
    pub rotation: Rotation,
    /// Sub-rectangle of the page to return, in output pixels at `dpi`.
    pub crop: ScreenRect,
}

/// RGBA8 pixels, row-major, no padding.
#[derive(Debug, Clone)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderImage {
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// An in-document link. `rect` uses the native document convention: origin
/// at the bottom-left corner of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDefinition {
    pub rect: DocRect,
    pub target_page: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    pub text: String,
    pub case_sensitive: bool,
    pub whole_word: bool,
}

pub trait DocumentBackend: Send + Sync {
    fn info(&self) -> &DocumentInfo;
    fn page_box(&self, page_index: usize) -> Result<PageBox>;
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage>;
    fn page_links(&self, page_index: usize) -> Result<Vec<LinkDefinition>>;
    /// Every occurrence of `query` on the page, top-left origin.
    fn find_text(&self, page_index: usize, query: &TextQuery) -> Result<Vec<DocRect>>;
    /// Text inside `rect`, given on the unrotated page with a top-left origin.
    fn extract_text(&self, page_index: usize, rect: DocRect) -> Result<String>;
}

#[async_trait::async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Arc<dyn DocumentBackend>>;
}

/// Opens `path`, reporting any failure as [`ViewerError::DocumentOpen`].
///
/// A document without pages cannot be displayed and is rejected the same way.
#[instrument(skip(provider))]
pub async fn open_document<P: DocumentProvider + ?Sized>(
    provider: &P,
    path: &Path,
) -> Result<Arc<dyn DocumentBackend>> {
    let backend = provider
        .open(path)
        .await
        .map_err(|err| ViewerError::DocumentOpen {
            path: path.to_path_buf(),
            reason: format!("{:#}", err),
        })?;

    let page_count = backend.info().page_count;
    if page_count == 0 {
        return Err(ViewerError::DocumentOpen {
            path: path.to_path_buf(),
            reason: "document has no pages".into(),
        }
        .into());
    }

    info!(page_count, "document opened");
    Ok(backend)
}
