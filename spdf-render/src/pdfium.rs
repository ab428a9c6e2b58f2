use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use spdf_core::{
    DocRect, DocumentBackend, DocumentInfo, DocumentMetadata, DocumentProvider, LinkDefinition,
    PageBox, RenderImage, RenderRequest, Rotation, ScreenRect, TextQuery,
};
use tracing::{debug, instrument, warn};

use crate::{crop_pixels, union_boxes, NativeBox, RenderWindow};

pub struct PdfiumProvider {
    pdfium: Arc<Pdfium>,
}

impl PdfiumProvider {
    pub fn new() -> Result<Self> {
        let pdfium = match bind_pdfium_from_build_hint() {
            Some(pdfium) => pdfium,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
        })
    }
}

#[async_trait]
impl DocumentProvider for PdfiumProvider {
    async fn open(&self, path: &Path) -> Result<Arc<dyn DocumentBackend>> {
        let absolute = path
            .canonicalize()
            .with_context(|| format!("failed to resolve path for {:?}", path))?;
        let info = build_document_info(&self.pdfium, &absolute)?;
        Ok(Arc::new(PdfiumDocument::new(
            Arc::clone(&self.pdfium),
            absolute,
            info,
        )))
    }
}

struct PdfiumDocument {
    // Declared before `pdfium` so it is dropped first.
    document: Mutex<Option<PdfDocument<'static>>>,
    pdfium: Arc<Pdfium>,
    path: PathBuf,
    info: DocumentInfo,
}

impl PdfiumDocument {
    fn new(pdfium: Arc<Pdfium>, path: PathBuf, info: DocumentInfo) -> Self {
        Self {
            document: Mutex::new(None),
            pdfium,
            path,
            info,
        }
    }

    fn load(&self) -> Result<PdfDocument<'static>> {
        let document = self
            .pdfium
            .load_pdf_from_file(&self.path, None)
            .with_context(|| format!("failed to open {:?}", self.path))?;
        // SAFETY: the document borrows the bindings held by `self.pdfium`, which
        // outlive it because `self.document` is declared first and dropped first.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
        Ok(document)
    }

    fn with_page<R, F>(&self, page_index: usize, f: F) -> Result<R>
    where
        F: FnOnce(&PdfPage<'_>) -> Result<R>,
    {
        let mut guard = self.document.lock();
        if guard.is_none() {
            *guard = Some(self.load()?);
        }
        let Some(document) = guard.as_ref() else {
            return Err(anyhow!("document {:?} is not loaded", self.path));
        };

        let index: PdfPageIndex = page_index
            .try_into()
            .map_err(|_| anyhow!("page {} is out of supported range", page_index))?;
        let page = document
            .pages()
            .get(index)
            .with_context(|| format!("page {} out of range", page_index))?;
        f(&page)
    }
}

impl DocumentBackend for PdfiumDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    fn page_box(&self, page_index: usize) -> Result<PageBox> {
        // pdfium reports the size with the page's own rotation applied.
        self.with_page(page_index, |page| {
            Ok(PageBox::new(
                f64::from(page.width().value),
                f64::from(page.height().value),
            ))
        })
    }

    #[instrument(skip(self))]
    fn render_page(&self, request: RenderRequest) -> Result<RenderImage> {
        let rendered = self.with_page(request.page_index, |page| {
            let (shown_width, shown_height) =
                PageBox::new(f64::from(page.width().value), f64::from(page.height().value))
                    .oriented_size(request.rotation);
            let plan = RenderWindow::plan(shown_width, shown_height, request.dpi, request.crop);
            if plan.is_empty() {
                return Ok(None);
            }

            // Shift the page so the window lands at the bitmap origin; the
            // bitmap itself only covers the window.
            let window = plan.window;
            let config = PdfRenderConfig::new()
                .scale_page_by_factor(plan.scale)
                .rotate(render_rotation(request.rotation), true)
                .translate(
                    PdfPoints::new(-(window.x as f32)),
                    PdfPoints::new(-(window.y as f32)),
                )
                .context("failed to position render window")?;
            let mut bitmap = PdfBitmap::empty(
                window.width,
                window.height,
                PdfBitmapFormat::BGRA,
                self.pdfium.bindings(),
            )
            .with_context(|| {
                format!(
                    "failed to allocate {}x{} bitmap",
                    window.width, window.height
                )
            })?;
            page.render_into_bitmap_with_config(&mut bitmap, &config)
                .with_context(|| format!("failed to render page {}", request.page_index))?;

            let image = bitmap.as_image().to_rgba8();
            Ok(Some((window, image.width(), image.height(), image.into_raw())))
        })?;

        let Some((window, width, height, pixels)) = rendered else {
            return Ok(RenderImage::filled(0, 0, [0; 4]));
        };
        debug!(?window, width, height, "rasterized page window");
        crop_pixels(
            width,
            height,
            pixels,
            ScreenRect::new(0, 0, window.width, window.height),
        )
    }

    fn page_links(&self, page_index: usize) -> Result<Vec<LinkDefinition>> {
        self.with_page(page_index, |page| {
            let mut definitions = Vec::new();
            for link in page.links().iter() {
                let rect = match link.rect() {
                    Ok(rect) => rect,
                    Err(err) => {
                        warn!(
                            ?err,
                            page = page_index,
                            path = %self.path.display(),
                            "failed to resolve link rectangle"
                        );
                        continue;
                    }
                };
                let Some(target_page) = link_target(&link) else {
                    continue;
                };
                definitions.push(LinkDefinition {
                    rect: native_box(&rect).to_native_rect(),
                    target_page,
                });
            }
            Ok(definitions)
        })
    }

    fn find_text(&self, page_index: usize, query: &TextQuery) -> Result<Vec<DocRect>> {
        if query.text.is_empty() {
            return Ok(Vec::new());
        }
        self.with_page(page_index, |page| {
            let page_height = page.height().value;
            let text = page
                .text()
                .with_context(|| format!("failed to extract text for page {}", page_index))?;
            let options = PdfSearchOptions::new()
                .match_case(query.case_sensitive)
                .match_whole_word(query.whole_word);
            let search = text
                .search(&query.text, &options)
                .with_context(|| format!("failed to perform search on page {}", page_index))?;

            let mut hits = Vec::new();
            while let Some(segments) = search.find_next() {
                let bounds = segments.iter().map(|segment| native_box(&segment.bounds()));
                if let Some(hit) = union_boxes(bounds) {
                    hits.push(hit.to_top_left(page_height));
                }
            }
            Ok(hits)
        })
    }

    fn extract_text(&self, page_index: usize, rect: DocRect) -> Result<String> {
        self.with_page(page_index, |page| {
            let area = NativeBox::from_top_left(&rect, page.height().value);
            let text = page
                .text()
                .with_context(|| format!("failed to extract text for page {}", page_index))?;
            Ok(text.inside_rect(PdfRect::new_from_values(
                area.bottom,
                area.left,
                area.top,
                area.right,
            )))
        })
    }
}

fn native_box(rect: &PdfRect) -> NativeBox {
    NativeBox {
        left: rect.left().value,
        bottom: rect.bottom().value,
        right: rect.right().value,
        top: rect.top().value,
    }
}

fn render_rotation(rotation: Rotation) -> PdfPageRenderRotation {
    match rotation {
        Rotation::Deg0 => PdfPageRenderRotation::None,
        Rotation::Deg90 => PdfPageRenderRotation::Degrees90,
        Rotation::Deg180 => PdfPageRenderRotation::Degrees180,
        Rotation::Deg270 => PdfPageRenderRotation::Degrees270,
    }
}

/// Destination page of an in-document link. Other actions are ignored.
fn link_target(link: &PdfLink<'_>) -> Option<usize> {
    if let Some(action) = link.action() {
        if matches!(
            action.action_type(),
            PdfActionType::GoToDestinationInSameDocument
        ) {
            let page = action
                .as_local_destination_action()
                .and_then(|local| local.destination().ok())
                .and_then(|destination| destination.page_index().ok());
            if let Some(page) = page {
                return Some(page as usize);
            }
        }
    }

    link.destination()
        .and_then(|destination| destination.page_index().ok())
        .map(|page| page as usize)
}

fn build_document_info(pdfium: &Pdfium, path: &Path) -> Result<DocumentInfo> {
    let document = pdfium
        .load_pdf_from_file(path, None)
        .with_context(|| format!("failed to open {:?}", path))?;
    let page_count = usize::try_from(document.pages().len()).unwrap_or_default();
    let metadata = document.metadata();

    let title = metadata
        .get(PdfDocumentMetadataTagType::Title)
        .map(|t| t.value().to_owned());
    let author = metadata
        .get(PdfDocumentMetadataTagType::Author)
        .map(|t| t.value().to_owned());

    Ok(DocumentInfo {
        path: path.to_path_buf(),
        page_count,
        metadata: DocumentMetadata { title, author },
    })
}

fn bind_pdfium_from_build_hint() -> Option<Pdfium> {
    match option_env!("SPDF_PDFIUM_LIBRARY_PATH") {
        Some(path) if !path.is_empty() => match Pdfium::bind_to_library(path) {
            Ok(bindings) => Some(Pdfium::new(bindings)),
            Err(err) => {
                warn!(%path, %err, "failed to load pdfium from build-provided path");
                None
            }
        },
        _ => None,
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    let local_err = match Pdfium::bind_to_library(&local) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => err,
    };

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|err| {
            anyhow!(
                "failed to bind to a pdfium library; ensure it is installed ({}: {}, system: {})",
                local.display(),
                local_err,
                err
            )
        })
}
