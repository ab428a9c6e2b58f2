use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::coords::{CoordConverter, YAxis};
use crate::damage::{plan_repaint, StatusLine};
use crate::document::{DocumentBackend, PageBox, RenderImage, RenderRequest};
use crate::error::ViewerError;
use crate::event::{Button, Effect, InputEvent, SelectionTarget};
use crate::geometry::{subtract, DocRect, ScreenRect};
use crate::history::NavigationHistory;
use crate::keymap::{Action, Key, Keymap, Modifiers};
use crate::layout::{configure, FitMode, RenderPlacement, Rotation, ScrollAnchor};
use crate::prompt::{PromptKind, PromptMode, StatusPrompt};
use crate::search::{self, SearchQuery, SearchState};
use crate::surface::{DrawOp, LineMetrics};

/// Everything that decides how the current page is laid out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Zero-based page index.
    pub page: usize,
    pub fit: FitMode,
    pub rotation: Rotation,
    /// Document-space region shown instead of the whole page.
    pub magnify: Option<DocRect>,
    /// Applied by the next rasterization, then reset to the top.
    pub anchor: ScrollAnchor,
}

/// Rasterized page together with the placement it was produced for.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub image: RenderImage,
    pub placement: RenderPlacement,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    None,
    /// Rubber band being dragged; extents may be negative.
    Dragging { screen: ScreenRect },
    Committed { document: DocRect },
    SearchHit { document: DocRect },
}

impl Selection {
    pub fn document(&self) -> Option<DocRect> {
        match self {
            Selection::Committed { document } | Selection::SearchHit { document } => {
                Some(*document)
            }
            _ => None,
        }
    }
}

/// Interaction state of one open document.
///
/// Every input goes through [`Session::handle`], which mutates the state and
/// returns the effects the host has to carry out.
pub struct Session {
    backend: Arc<dyn DocumentBackend>,
    config: Config,
    keymap: Keymap,
    metrics: LineMetrics,
    viewport: ScreenRect,
    status_bar: ScreenRect,
    view: ViewState,
    page_box: PageBox,
    placement: ScreenRect,
    painted: ScreenRect,
    image: Option<PageImage>,
    selection: Selection,
    prompt: StatusPrompt,
    search: SearchState,
    history: NavigationHistory,
    pre_magnify_offset: i32,
}

impl Session {
    /// Starts on `page` (zero-based). The viewport is empty until the first
    /// `GeometryChanged` event.
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        config: Config,
        metrics: LineMetrics,
        page: usize,
    ) -> Result<Self> {
        let page_box = load_page_box(backend.as_ref(), page)?;
        Ok(Self {
            backend,
            config,
            keymap: Keymap::default(),
            metrics,
            viewport: ScreenRect::default(),
            status_bar: ScreenRect::default(),
            view: ViewState {
                page,
                fit: FitMode::FitPage,
                rotation: Rotation::Deg0,
                magnify: None,
                anchor: ScrollAnchor::default(),
            },
            page_box,
            placement: ScreenRect::default(),
            painted: ScreenRect::default(),
            image: None,
            selection: Selection::None,
            prompt: StatusPrompt::default(),
            search: SearchState::default(),
            history: NavigationHistory::default(),
            pre_magnify_offset: 0,
        })
    }

    pub fn with_keymap(mut self, keymap: Keymap) -> Self {
        self.keymap = keymap;
        self
    }

    pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
        &self.backend
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn page_count(&self) -> usize {
        self.backend.info().page_count
    }

    pub fn viewport(&self) -> ScreenRect {
        self.viewport
    }

    pub fn status_bar(&self) -> ScreenRect {
        self.status_bar
    }

    pub fn placement(&self) -> ScreenRect {
        self.placement
    }

    pub fn page_image(&self) -> Option<&PageImage> {
        self.image.as_ref()
    }

    /// Bitmap used by `DrawOp::Blit`.
    pub fn image(&self) -> Option<&RenderImage> {
        self.image.as_ref().map(|p| &p.image)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn prompt(&self) -> &StatusPrompt {
        &self.prompt
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn handle(&mut self, event: InputEvent) -> Result<Vec<Effect>> {
        match event {
            InputEvent::Expose(damage) => self.on_expose(damage),
            InputEvent::GeometryChanged(rect) => Ok(self.on_geometry_changed(rect)),
            InputEvent::KeyPress {
                key,
                modifiers,
                text,
            } => self.on_key(key, modifiers, text),
            InputEvent::ButtonPress { button, x, y } => self.on_button_press(button, x, y),
            InputEvent::ButtonRelease { button, x, y } => self.on_button_release(button, x, y),
            InputEvent::PointerMotion { x, y } => Ok(self.on_motion(x, y)),
            InputEvent::ClientClose => Ok(vec![Effect::Quit]),
        }
    }

    /// Swaps in a freshly opened copy of the document.
    pub fn reload(&mut self, backend: Arc<dyn DocumentBackend>) -> Result<Vec<Effect>> {
        self.backend = backend;
        let page = if self.view.page >= self.page_count() {
            0
        } else {
            self.view.page
        };
        info!(page, page_count = self.page_count(), "document reloaded");
        self.navigate(page)
    }

    fn on_expose(&mut self, damage: ScreenRect) -> Result<Vec<Effect>> {
        if self.viewport.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_image()?;

        let highlight = self.highlight();
        let status_text = self.prompt.display_text();
        let status = status_text.as_deref().map(|text| StatusLine {
            bar: self.status_bar,
            text,
            descent: self.metrics.descent,
        });

        let ops = plan_repaint(self.painted, self.placement, damage, highlight, status);
        self.painted = self.placement;
        Ok(ops.into_iter().map(Effect::Draw).collect())
    }

    fn on_geometry_changed(&mut self, rect: ScreenRect) -> Vec<Effect> {
        if rect.width == self.viewport.width && rect.height == self.viewport.height {
            return Vec::new();
        }
        debug!(width = rect.width, height = rect.height, "viewport resized");

        self.viewport = ScreenRect::new(0, 0, rect.width, rect.height);
        self.image = None;
        let line = self.metrics.height + 2;
        self.status_bar = ScreenRect::new(0, self.viewport.height - line, self.viewport.width, line);

        vec![
            Effect::Draw(DrawOp::Clear(self.viewport)),
            Effect::Damage(self.viewport),
        ]
    }

    fn on_key(&mut self, key: Key, modifiers: Modifiers, text: Option<String>) -> Result<Vec<Effect>> {
        if self.prompt.is_active() {
            return self.on_prompt_key(key, text);
        }
        match self.keymap.lookup(&key, modifiers) {
            Some(action) => self.apply(action),
            None => Ok(Vec::new()),
        }
    }

    /// Runs one shortcut action.
    pub fn apply(&mut self, action: Action) -> Result<Vec<Effect>> {
        debug!(?action, page = self.view.page, "action");
        let last_page = self.page_count().saturating_sub(1);
        let fit_page = self.view.fit == FitMode::FitPage;

        match action {
            Action::Quit => Ok(vec![Effect::Quit]),
            Action::NextPage => self.next_page(),
            Action::PrevPage => self.prev_page(false),
            Action::PageDown if fit_page => self.next_page(),
            Action::PageUp if fit_page => self.prev_page(false),
            Action::FirstPage => self.navigate(0),
            Action::LastPage => self.navigate(last_page),
            Action::FitPage | Action::FitWidth => {
                let fit = if action == Action::FitPage {
                    FitMode::FitPage
                } else {
                    FitMode::FitWidth
                };
                if self.view.fit == fit {
                    return Ok(Vec::new());
                }
                self.view.fit = fit;
                Ok(self.force_render())
            }
            Action::ScrollDown if !fit_page => Ok(self.scroll(-self.config.scroll.arrow)),
            Action::ScrollUp if !fit_page => Ok(self.scroll(self.config.scroll.arrow)),
            Action::PageDown => {
                let effects = self.scroll(-self.config.scroll.page);
                if effects.is_empty() {
                    self.next_page()
                } else {
                    Ok(effects)
                }
            }
            Action::PageUp => {
                let effects = self.scroll(self.config.scroll.page);
                if effects.is_empty() {
                    self.prev_page(true)
                } else {
                    Ok(effects)
                }
            }
            Action::ScrollDown | Action::ScrollUp => Ok(Vec::new()),
            Action::Back => match self.history.pop() {
                Some(entry) if entry.page < self.page_count() => {
                    self.view.anchor = ScrollAnchor::Top {
                        offset: entry.offset,
                    };
                    self.navigate(entry.page)
                }
                _ => Ok(Vec::new()),
            },
            Action::Reload => Ok(vec![Effect::Reload]),
            Action::Copy => Ok(self.claim_selection(SelectionTarget::Clipboard)),
            Action::GotoPage => {
                let label = format!("goto page [1, {}]: ", self.page_count());
                Ok(self.open_prompt(PromptKind::GotoPage, label))
            }
            Action::Search => Ok(self.open_prompt(PromptKind::Search, "search: ".into())),
            Action::PageIndicator => {
                let label = format!("page {}/{}", self.view.page + 1, self.page_count());
                Ok(self.open_prompt(PromptKind::PageIndicator, label))
            }
            Action::Magnify => Ok(self.magnify()),
            Action::RotateCw | Action::RotateCcw => {
                self.view.rotation = if action == Action::RotateCw {
                    self.view.rotation.clockwise()
                } else {
                    self.view.rotation.counter_clockwise()
                };
                Ok(self.force_render())
            }
        }
    }

    fn on_prompt_key(&mut self, key: Key, text: Option<String>) -> Result<Vec<Effect>> {
        match key {
            Key::Escape => {
                self.prompt.close();
                self.search.reset();
                let mut effects = self.clear_status_bar();
                if self.view.magnify.take().is_some() {
                    self.view.anchor = ScrollAnchor::Top {
                        offset: self.pre_magnify_offset,
                    };
                    effects.extend(self.force_render());
                }
                Ok(effects)
            }
            Key::Backspace => {
                if !self.prompt.backspace() {
                    return Ok(Vec::new());
                }
                if self.prompt.kind() == Some(PromptKind::Search) {
                    self.search.reset();
                }
                Ok(self.clear_status_bar())
            }
            Key::Enter => match self.prompt.kind() {
                Some(PromptKind::GotoPage) => self.submit_goto(),
                Some(PromptKind::Search) => self.run_search(),
                _ => Ok(Vec::new()),
            },
            _ => {
                let printable = text
                    .filter(|t| t.chars().next().is_some_and(|c| !c.is_control()));
                match printable {
                    Some(t) if self.prompt.push_str(&t) => {
                        if self.prompt.kind() == Some(PromptKind::Search) {
                            self.search.reset();
                        }
                        Ok(vec![Effect::Damage(self.status_bar)])
                    }
                    _ => Ok(Vec::new()),
                }
            }
        }
    }

    fn on_button_press(&mut self, button: Button, x: i32, y: i32) -> Result<Vec<Effect>> {
        let magnified = self.view.magnify.is_some();
        let fit_page = self.view.fit == FitMode::FitPage;

        match button {
            Button::WheelUp if fit_page => {
                if magnified {
                    Ok(Vec::new())
                } else {
                    self.prev_page(true)
                }
            }
            Button::WheelDown if fit_page => {
                if magnified {
                    Ok(Vec::new())
                } else {
                    self.next_page()
                }
            }
            Button::WheelUp => {
                let effects = self.scroll(self.config.scroll.mouse);
                if effects.is_empty() && !magnified {
                    self.prev_page(true)
                } else {
                    Ok(effects)
                }
            }
            Button::WheelDown => {
                let effects = self.scroll(-self.config.scroll.mouse);
                if effects.is_empty() && !magnified {
                    self.next_page()
                } else {
                    Ok(effects)
                }
            }
            Button::Primary if !magnified && self.placement.contains(x, y) => {
                if let Some(target) = self.link_target(x, y)? {
                    self.history.push(self.view.page, self.placement.y);
                    return self.navigate(target);
                }
                let mut effects = Vec::new();
                if let Some(old) = self.highlight() {
                    effects.push(Effect::Damage(
                        old.normalized().padded(self.config.selection_padding),
                    ));
                }
                self.selection = Selection::Dragging {
                    screen: ScreenRect::new(x, y, 0, 0),
                };
                Ok(effects)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn on_button_release(&mut self, button: Button, x: i32, y: i32) -> Result<Vec<Effect>> {
        let Selection::Dragging { screen } = self.selection else {
            return Ok(Vec::new());
        };
        if button != Button::Primary {
            return Ok(Vec::new());
        }

        let band = ScreenRect::new(screen.x, screen.y, x - screen.x, y - screen.y).normalized();
        if band.is_empty() {
            self.selection = Selection::None;
            return Ok(Vec::new());
        }

        let document = self.converter(YAxis::TopDown).to_pdf(&band);
        debug!(?document, "selection committed");
        self.selection = Selection::Committed { document };
        Ok(self.claim_selection(SelectionTarget::Primary))
    }

    fn on_motion(&mut self, x: i32, y: i32) -> Vec<Effect> {
        let Selection::Dragging { screen } = self.selection else {
            return Vec::new();
        };

        let old = screen.normalized();
        let updated = ScreenRect::new(screen.x, screen.y, x - screen.x, y - screen.y);
        self.selection = Selection::Dragging { screen: updated };
        let new = updated.normalized();

        subtract(&old, &new)
            .into_iter()
            .chain(subtract(&new, &old))
            .filter(|r| !r.is_empty())
            .map(Effect::Damage)
            .collect()
    }

    /// Screen rectangle currently drawn inverted, if any.
    fn highlight(&self) -> Option<ScreenRect> {
        match self.selection {
            Selection::None => None,
            Selection::Dragging { screen } => Some(screen.normalized()),
            Selection::Committed { document } | Selection::SearchHit { document } => {
                Some(self.converter(YAxis::TopDown).to_screen(&document))
            }
        }
    }

    fn converter(&self, axis: YAxis) -> CoordConverter {
        CoordConverter::new(&self.page_box, self.placement, axis, self.view.rotation)
    }

    #[instrument(skip(self), fields(page = self.view.page))]
    fn ensure_image(&mut self) -> Result<()> {
        if self.image.is_some() {
            return Ok(());
        }

        let placement = configure(
            self.viewport,
            self.view.fit,
            self.view.anchor,
            &self.page_box,
            self.view.magnify,
            self.view.rotation,
        );
        self.view.anchor = ScrollAnchor::default();

        let request = RenderRequest {
            page_index: self.view.page,
            dpi: placement.dpi,
            rotation: self.view.rotation,
            crop: placement.crop,
        };
        let image = self
            .backend
            .render_page(request)
            .with_context(|| format!("failed to render page {}", self.view.page + 1))?;
        debug!(
            dpi = placement.dpi,
            width = image.width,
            height = image.height,
            "page rasterized"
        );

        self.placement = placement.dest;
        self.image = Some(PageImage { image, placement });
        Ok(())
    }

    fn force_render(&mut self) -> Vec<Effect> {
        self.image = None;
        vec![Effect::Damage(self.viewport)]
    }

    fn navigate(&mut self, page: usize) -> Result<Vec<Effect>> {
        self.page_box = load_page_box(self.backend.as_ref(), page)?;
        self.view.page = page;
        self.selection = Selection::None;
        self.search.reset();
        debug!(page, "page changed");
        Ok(self.force_render())
    }

    fn next_page(&mut self) -> Result<Vec<Effect>> {
        if self.view.page + 1 < self.page_count() {
            self.navigate(self.view.page + 1)
        } else {
            Ok(Vec::new())
        }
    }

    /// `from_below` shows the previous page scrolled to its bottom.
    fn prev_page(&mut self, from_below: bool) -> Result<Vec<Effect>> {
        if self.view.page == 0 {
            return Ok(Vec::new());
        }
        if from_below {
            self.view.anchor = ScrollAnchor::Bottom;
        }
        self.navigate(self.view.page - 1)
    }

    /// Vertical displacement for a scroll of `fraction` of the page height,
    /// keeping the page edge inside the viewport. Positive moves the page
    /// down.
    fn scroll_delta(&self, fraction: f64) -> i32 {
        if self.placement.height < self.viewport.height {
            return 0;
        }
        let step = (f64::from(self.placement.height) * fraction) as i32;
        if step > 0 {
            step.min(-self.placement.y)
        } else {
            -(-step).min(self.placement.height - self.viewport.height + self.placement.y)
        }
    }

    /// Moves the page without re-rasterizing. Empty when nothing moved.
    fn scroll(&mut self, fraction: f64) -> Vec<Effect> {
        if self.view.fit != FitMode::FitWidth {
            return Vec::new();
        }
        let delta = self.scroll_delta(fraction);
        if delta == 0 {
            return Vec::new();
        }
        self.placement.y += delta;
        vec![Effect::Damage(self.viewport)]
    }

    fn link_target(&self, x: i32, y: i32) -> Result<Option<usize>> {
        let links = self
            .backend
            .page_links(self.view.page)
            .with_context(|| format!("failed to read links of page {}", self.view.page + 1))?;
        if links.is_empty() {
            return Ok(None);
        }

        let cc = self.converter(YAxis::BottomUp);
        let (px, py) = (cc.to_pdf_x(x), cc.to_pdf_y(y));
        let target = links
            .iter()
            .find(|link| link.rect.normalized().contains(px, py))
            .map(|link| link.target_page)
            .filter(|&target| target != self.view.page && target < self.page_count());
        if let Some(target) = target {
            debug!(from = self.view.page, to = target, "following link");
        }
        Ok(target)
    }

    fn claim_selection(&self, target: SelectionTarget) -> Vec<Effect> {
        let Some(document) = self.selection.document().filter(|d| !d.is_empty()) else {
            return Vec::new();
        };
        let area = self.page_box.unrotate_rect(&document, self.view.rotation);
        match self.backend.extract_text(self.view.page, area) {
            Ok(text) => vec![Effect::SetSelection { target, text }],
            Err(err) => {
                warn!(error = %err, "failed to extract selected text");
                Vec::new()
            }
        }
    }

    fn magnify(&mut self) -> Vec<Effect> {
        let Some(region) = self.selection.document().filter(|d| !d.is_empty()) else {
            return Vec::new();
        };
        debug!(?region, "magnify");
        self.view.magnify = Some(region);
        self.selection = Selection::None;
        self.prompt.open(PromptKind::Magnify, "magnify");
        self.pre_magnify_offset = self.placement.y;
        self.placement.y = 0;
        self.force_render()
    }

    fn open_prompt(&mut self, kind: PromptKind, label: String) -> Vec<Effect> {
        self.prompt.open(kind, label);
        vec![Effect::Damage(self.status_bar)]
    }

    fn clear_status_bar(&self) -> Vec<Effect> {
        vec![
            Effect::Draw(DrawOp::Clear(self.status_bar)),
            Effect::Damage(self.status_bar),
        ]
    }

    fn submit_goto(&mut self) -> Result<Vec<Effect>> {
        let page = match self.prompt.value().parse::<usize>() {
            Ok(page) if (1..=self.page_count()).contains(&page) => page,
            _ => return Ok(Vec::new()),
        };
        self.prompt.close();
        let mut effects = self.clear_status_bar();
        effects.extend(self.navigate(page - 1)?);
        Ok(effects)
    }

    fn run_search(&mut self) -> Result<Vec<Effect>> {
        let padding = self.config.selection_padding;
        let mut effects = Vec::new();
        if let Some(old) = self.highlight() {
            effects.push(Effect::Damage(old.normalized().padded(padding)));
        }

        let found = match SearchQuery::parse(self.prompt.value()) {
            Some(query) => {
                let resume = self.search.resume_point(self.view.page);
                search::find(self.backend.as_ref(), &query, self.view.page, resume)?
            }
            None => None,
        };

        match found {
            Some(hit) => {
                if hit.page != self.view.page {
                    effects.extend(self.navigate(hit.page)?);
                    self.ensure_image()?;
                }
                let document = self.page_box.rotate_rect(&hit.rect, self.view.rotation);
                self.selection = Selection::SearchHit { document };
            }
            None => self.selection = Selection::None,
        }
        self.search.record(found);

        if let Some(new) = self.highlight() {
            effects.push(Effect::Damage(new.normalized().padded(padding)));
        }
        Ok(effects)
    }

    /// Current prompt mode; convenience for hosts.
    pub fn prompt_mode(&self) -> PromptMode {
        self.prompt.mode()
    }
}

fn load_page_box(backend: &dyn DocumentBackend, page: usize) -> Result<PageBox> {
    let page_count = backend.info().page_count;
    if page >= page_count {
        return Err(ViewerError::PageCreation { page, page_count }.into());
    }
    backend
        .page_box(page)
        .with_context(|| format!("failed to load page {}", page + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::testing::FakeBackend;

    const METRICS: LineMetrics = LineMetrics {
        height: 16,
        descent: 4,
    };

    fn session_on(backend: FakeBackend, page: usize, width: i32, height: i32) -> Session {
        let mut session =
            Session::new(Arc::new(backend), Config::default(), METRICS, page).unwrap();
        let viewport = ScreenRect::new(0, 0, width, height);
        session
            .handle(InputEvent::GeometryChanged(viewport))
            .unwrap();
        session.handle(InputEvent::Expose(viewport)).unwrap();
        session
    }

    fn press(session: &mut Session, key: Key) -> Vec<Effect> {
        session
            .handle(InputEvent::key(key, Modifiers::empty()))
            .unwrap()
    }

    fn type_text(session: &mut Session, text: &str) {
        for c in text.chars() {
            press(session, Key::Char(c));
        }
    }

    fn expose_all(session: &mut Session) -> Vec<Effect> {
        let viewport = session.viewport();
        session.handle(InputEvent::Expose(viewport)).unwrap()
    }

    fn button(session: &mut Session, pressed: bool, x: i32, y: i32) -> Vec<Effect> {
        let event = if pressed {
            InputEvent::ButtonPress {
                button: Button::Primary,
                x,
                y,
            }
        } else {
            InputEvent::ButtonRelease {
                button: Button::Primary,
                x,
                y,
            }
        };
        session.handle(event).unwrap()
    }

    fn covered(rects: &[ScreenRect], x: i32, y: i32) -> bool {
        rects
            .iter()
            .any(|r| x >= r.x && x < r.right() && y >= r.y && y < r.bottom())
    }

    #[test]
    fn first_expose_fits_page_to_viewport() {
        let session = session_on(FakeBackend::new(3, 300.0, 400.0), 0, 600, 800);
        assert_eq!(session.placement(), ScreenRect::new(0, 0, 600, 800));
        let page = session.page_image().unwrap();
        assert_eq!(page.placement.dpi, 144.0);
        assert_eq!((page.image.width, page.image.height), (600, 800));
    }

    #[test]
    fn expose_before_geometry_draws_nothing() {
        let mut session = Session::new(
            Arc::new(FakeBackend::new(1, 300.0, 400.0)),
            Config::default(),
            METRICS,
            0,
        )
        .unwrap();
        let effects = session
            .handle(InputEvent::Expose(ScreenRect::new(0, 0, 10, 10)))
            .unwrap();
        assert!(effects.is_empty());
        assert!(session.image().is_none());
    }

    #[test]
    fn initial_page_out_of_range_is_fatal() {
        let result = Session::new(
            Arc::new(FakeBackend::new(2, 300.0, 400.0)),
            Config::default(),
            METRICS,
            5,
        );
        let err = match result {
            Ok(_) => panic!("page 5 should not exist"),
            Err(err) => err,
        };
        assert!(matches!(
            err.downcast_ref::<ViewerError>(),
            Some(ViewerError::PageCreation {
                page: 5,
                page_count: 2
            })
        ));
    }

    #[test]
    fn geometry_change_recomputes_status_bar_and_drops_bitmap() {
        let mut session = session_on(FakeBackend::new(1, 300.0, 400.0), 0, 600, 800);
        assert_eq!(session.status_bar(), ScreenRect::new(0, 782, 600, 18));

        let same = session
            .handle(InputEvent::GeometryChanged(ScreenRect::new(0, 0, 600, 800)))
            .unwrap();
        assert!(same.is_empty());
        assert!(session.image().is_some());

        let effects = session
            .handle(InputEvent::GeometryChanged(ScreenRect::new(0, 0, 400, 300)))
            .unwrap();
        assert_eq!(effects[0], Effect::Draw(DrawOp::Clear(ScreenRect::new(0, 0, 400, 300))));
        assert!(session.image().is_none());
        assert_eq!(session.status_bar(), ScreenRect::new(0, 282, 400, 18));
    }

    #[test]
    fn fit_width_page_scroll_is_clamped_then_advances() {
        let mut session = session_on(FakeBackend::new(2, 250.0, 1000.0), 0, 500, 800);
        press(&mut session, Key::Char('w'));
        assert!(session.image().is_none());
        expose_all(&mut session);
        assert_eq!(session.placement(), ScreenRect::new(0, 0, 500, 2000));
        assert_eq!(session.page_image().unwrap().placement.dpi, 144.0);

        let effects = press(&mut session, Key::PageDown);
        assert_eq!(effects, vec![Effect::Damage(ScreenRect::new(0, 0, 500, 800))]);
        assert_eq!(session.placement().y, -600);
        assert!(session.image().is_some());

        press(&mut session, Key::PageDown);
        assert_eq!(session.placement().y, -1200);

        press(&mut session, Key::PageDown);
        assert_eq!(session.view().page, 1);
        assert!(session.image().is_none());
    }

    #[test]
    fn arrow_scroll_uses_small_step_and_stops_at_top() {
        let mut session = session_on(FakeBackend::new(1, 250.0, 1000.0), 0, 500, 800);
        press(&mut session, Key::Char('w'));
        expose_all(&mut session);

        press(&mut session, Key::Down);
        assert_eq!(session.placement().y, -20);
        press(&mut session, Key::Up);
        assert_eq!(session.placement().y, 0);
        assert!(press(&mut session, Key::Up).is_empty());
    }

    #[test]
    fn scroll_keys_do_nothing_in_fit_page() {
        let mut session = session_on(FakeBackend::new(1, 250.0, 1000.0), 0, 500, 800);
        assert!(press(&mut session, Key::Down).is_empty());
        assert_eq!(session.placement().y, 0);
    }

    #[test]
    fn page_up_at_top_shows_previous_page_from_bottom() {
        let mut session = session_on(FakeBackend::new(2, 250.0, 1000.0), 1, 500, 800);
        press(&mut session, Key::Char('w'));
        expose_all(&mut session);
        assert_eq!(session.placement().y, 0);

        press(&mut session, Key::PageUp);
        assert_eq!(session.view().page, 0);
        assert_eq!(session.view().anchor, ScrollAnchor::Bottom);
        expose_all(&mut session);
        assert_eq!(session.placement().y, -1200);
        assert_eq!(session.view().anchor, ScrollAnchor::default());
    }

    #[test]
    fn fit_page_page_keys_and_wheel_navigate() {
        let mut session = session_on(FakeBackend::new(3, 300.0, 400.0), 0, 600, 800);
        press(&mut session, Key::PageDown);
        assert_eq!(session.view().page, 1);
        session
            .handle(InputEvent::ButtonPress {
                button: Button::WheelDown,
                x: 0,
                y: 0,
            })
            .unwrap();
        assert_eq!(session.view().page, 2);
        assert!(press(&mut session, Key::PageDown).is_empty());
        assert_eq!(session.view().page, 2);

        session
            .handle(InputEvent::key(Key::Home, Modifiers::CONTROL))
            .unwrap();
        assert_eq!(session.view().page, 0);
        assert!(press(&mut session, Key::PageUp).is_empty());
    }

    #[test]
    fn dragging_damages_exactly_the_symmetric_difference() {
        let mut session = session_on(FakeBackend::new(1, 300.0, 400.0), 0, 600, 800);
        assert!(button(&mut session, true, 10, 10).is_empty());

        let first = session.handle(InputEvent::PointerMotion { x: 60, y: 30 }).unwrap();
        assert_eq!(first, vec![Effect::Damage(ScreenRect::new(10, 10, 50, 20))]);

        let effects = session
            .handle(InputEvent::PointerMotion { x: 100, y: 50 })
            .unwrap();
        let damaged: Vec<ScreenRect> = effects
            .iter()
            .map(|e| match e {
                Effect::Damage(r) => *r,
                other => panic!("unexpected effect {:?}", other),
            })
            .collect();

        let old = ScreenRect::new(10, 10, 50, 20);
        let new = ScreenRect::new(10, 10, 90, 40);
        for y in 0..80 {
            for x in 0..120 {
                let in_old = covered(&[old], x, y);
                let in_new = covered(&[new], x, y);
                assert_eq!(covered(&damaged, x, y), in_old != in_new, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn release_commits_selection_and_claims_primary() {
        let backend = FakeBackend::new(1, 300.0, 400.0).with_text("hello");
        let mut session = session_on(backend, 0, 600, 800);
        button(&mut session, true, 100, 100);
        session
            .handle(InputEvent::PointerMotion { x: 300, y: 200 })
            .unwrap();
        let effects = button(&mut session, false, 300, 200);

        assert_eq!(
            *session.selection(),
            Selection::Committed {
                document: DocRect::new(50.0, 50.0, 100.0, 50.0)
            }
        );
        assert_eq!(
            effects,
            vec![Effect::SetSelection {
                target: SelectionTarget::Primary,
                text: "hello".into(),
            }]
        );

        let copy = session
            .handle(InputEvent::key(Key::Char('c'), Modifiers::CONTROL))
            .unwrap();
        assert_eq!(
            copy,
            vec![Effect::SetSelection {
                target: SelectionTarget::Clipboard,
                text: "hello".into(),
            }]
        );
    }

    #[test]
    fn rotated_selection_is_extracted_from_the_unrotated_page() {
        let backend = FakeBackend::new(1, 300.0, 400.0).with_text("turned");
        let extracted = Arc::clone(&backend.extracted);
        let mut session = session_on(backend, 0, 800, 600);
        press(&mut session, Key::Char(']'));
        assert_eq!(session.view().rotation, Rotation::Deg90);
        expose_all(&mut session);
        assert_eq!(session.placement(), ScreenRect::new(0, 0, 800, 600));

        button(&mut session, true, 600, 100);
        let effects = button(&mut session, false, 780, 200);
        assert_eq!(
            *session.selection(),
            Selection::Committed {
                document: DocRect::new(300.0, 50.0, 90.0, 50.0)
            }
        );
        assert_eq!(
            effects,
            vec![Effect::SetSelection {
                target: SelectionTarget::Primary,
                text: "turned".into(),
            }]
        );
        assert_eq!(
            *extracted.lock().unwrap(),
            vec![DocRect::new(50.0, 10.0, 50.0, 90.0)]
        );
    }

    #[test]
    fn rubber_band_past_the_page_edge_only_inverts_the_page() {
        let mut session = session_on(FakeBackend::new(1, 300.0, 400.0), 0, 1000, 800);
        let page = session.placement();
        let (x, y) = (page.right() - 100, page.y + 100);
        button(&mut session, true, x, y);

        let mut lit = Vec::new();
        for (mx, my) in [(page.right() + 100, y + 100), (page.right() - 50, y + 100)] {
            let damage = session
                .handle(InputEvent::PointerMotion { x: mx, y: my })
                .unwrap();
            for effect in damage {
                let Effect::Damage(rect) = &effect else {
                    panic!("unexpected effect {:?}", effect);
                };
                for op in session.handle(InputEvent::Expose(*rect)).unwrap() {
                    if let Effect::Draw(DrawOp::Fill {
                        rect,
                        paint: crate::surface::Paint::Highlight,
                    }) = op
                    {
                        lit.push(rect);
                    }
                }
            }
        }

        assert!(!lit.is_empty());
        for rect in lit {
            assert_eq!(crate::geometry::intersect(&rect, &page), rect);
        }
    }

    #[test]
    fn committed_highlight_is_painted_on_expose() {
        let mut session = session_on(FakeBackend::new(1, 300.0, 400.0), 0, 600, 800);
        button(&mut session, true, 100, 100);
        button(&mut session, false, 300, 200);

        let effects = expose_all(&mut session);
        assert!(effects.contains(&Effect::Draw(DrawOp::Fill {
            rect: ScreenRect::new(100, 100, 200, 100),
            paint: crate::surface::Paint::Highlight,
        })));
    }

    #[test]
    fn empty_release_commits_nothing() {
        let mut session = session_on(FakeBackend::new(1, 300.0, 400.0).with_text("x"), 0, 600, 800);
        button(&mut session, true, 100, 100);
        let effects = button(&mut session, false, 100, 140);
        assert!(effects.is_empty());
        assert_eq!(*session.selection(), Selection::None);
    }

    #[test]
    fn press_outside_page_does_not_select() {
        let mut session = session_on(FakeBackend::new(1, 300.0, 400.0), 0, 1000, 800);
        // Page sits at x = 200..800.
        button(&mut session, true, 50, 50);
        assert_eq!(*session.selection(), Selection::None);
    }

    #[test]
    fn following_a_link_records_history_and_back_returns() {
        let backend = FakeBackend::new(5, 300.0, 400.0).with_link(
            0,
            DocRect::new(40.0, 340.0, 20.0, 20.0),
            3,
        );
        let mut session = session_on(backend, 0, 600, 800);

        let effects = button(&mut session, true, 100, 100);
        assert_eq!(effects, vec![Effect::Damage(ScreenRect::new(0, 0, 600, 800))]);
        assert_eq!(session.view().page, 3);
        assert_eq!(session.history().len(), 1);
        assert_eq!(*session.selection(), Selection::None);

        expose_all(&mut session);
        press(&mut session, Key::Char('b'));
        assert_eq!(session.view().page, 0);
        assert!(session.history().is_empty());
        assert!(press(&mut session, Key::Char('b')).is_empty());
    }

    #[test]
    fn click_beside_link_starts_selection() {
        let backend = FakeBackend::new(5, 300.0, 400.0).with_link(
            0,
            DocRect::new(40.0, 340.0, 20.0, 20.0),
            3,
        );
        let mut session = session_on(backend, 0, 600, 800);
        button(&mut session, true, 400, 400);
        assert_eq!(session.view().page, 0);
        assert!(matches!(session.selection(), Selection::Dragging { .. }));
    }

    #[test]
    fn backward_case_insensitive_search_lands_on_earlier_page() {
        let backend = FakeBackend::new(3, 300.0, 400.0).with_hit(
            0,
            "foo",
            DocRect::new(30.0, 40.0, 60.0, 10.0),
        );
        let mut session = session_on(backend, 1, 600, 800);

        press(&mut session, Key::Char('s'));
        assert_eq!(session.prompt().kind(), Some(PromptKind::Search));
        type_text(&mut session, "foo~?");
        assert_eq!(session.prompt().value(), "foo~?");
        press(&mut session, Key::Enter);

        assert_eq!(session.view().page, 0);
        assert!(session.search().is_active());
        assert_eq!(
            *session.selection(),
            Selection::SearchHit {
                document: DocRect::new(30.0, 40.0, 60.0, 10.0)
            }
        );
        assert!(session.image().is_some());
        assert_eq!(session.prompt().mode(), PromptMode::Input);
    }

    #[test]
    fn failed_search_clears_highlight_and_continuation() {
        let backend = FakeBackend::new(2, 300.0, 400.0).with_hit(
            0,
            "foo",
            DocRect::new(30.0, 40.0, 60.0, 10.0),
        );
        let mut session = session_on(backend, 0, 600, 800);
        press(&mut session, Key::Char('/'));
        type_text(&mut session, "foo");
        press(&mut session, Key::Enter);
        assert!(session.search().is_active());

        press(&mut session, Key::Enter);
        assert!(!session.search().is_active());
        assert_eq!(*session.selection(), Selection::None);
    }

    #[test]
    fn shortcuts_are_ignored_while_prompt_is_open() {
        let mut session = session_on(FakeBackend::new(3, 300.0, 400.0), 0, 600, 800);
        press(&mut session, Key::Char('s'));
        let effects = press(&mut session, Key::Char('q'));
        assert_eq!(effects, vec![Effect::Damage(session.status_bar())]);
        assert_eq!(session.prompt().value(), "q");

        let effects = press(&mut session, Key::Escape);
        assert!(!session.prompt().is_active());
        assert_eq!(effects[0], Effect::Draw(DrawOp::Clear(session.status_bar())));
        assert_eq!(press(&mut session, Key::Char('q')), vec![Effect::Quit]);
    }

    #[test]
    fn goto_prompt_validates_page_number() {
        let mut session = session_on(FakeBackend::new(3, 300.0, 400.0), 0, 600, 800);
        press(&mut session, Key::Char('g'));
        let status = expose_all(&mut session);
        assert!(status.contains(&Effect::Draw(DrawOp::Text {
            origin: crate::geometry::ScreenPoint::new(1, 795),
            text: "goto page [1, 3]: _".into(),
        })));

        type_text(&mut session, "9");
        press(&mut session, Key::Enter);
        assert!(session.prompt().is_active());
        assert_eq!(session.view().page, 0);

        press(&mut session, Key::Backspace);
        type_text(&mut session, "3");
        press(&mut session, Key::Enter);
        assert!(!session.prompt().is_active());
        assert_eq!(session.view().page, 2);
    }

    #[test]
    fn page_indicator_is_display_only() {
        let mut session = session_on(FakeBackend::new(4, 300.0, 400.0), 1, 600, 800);
        press(&mut session, Key::Char('p'));
        assert_eq!(session.prompt_mode(), PromptMode::Display);
        assert_eq!(session.prompt().display_text().as_deref(), Some("page 2/4"));
        assert!(press(&mut session, Key::Char('x')).is_empty());
    }

    #[test]
    fn magnify_and_escape_restore_view() {
        let mut session = session_on(FakeBackend::new(1, 250.0, 1000.0), 0, 500, 800);
        press(&mut session, Key::Char('w'));
        expose_all(&mut session);
        press(&mut session, Key::PageDown);
        assert_eq!(session.placement().y, -600);

        assert!(press(&mut session, Key::Char('m')).is_empty());

        button(&mut session, true, 100, 100);
        button(&mut session, false, 200, 300);
        press(&mut session, Key::Char('m'));
        assert!(session.view().magnify.is_some());
        assert_eq!(*session.selection(), Selection::None);
        assert_eq!(session.prompt().kind(), Some(PromptKind::Magnify));
        assert!(session.image().is_none());

        expose_all(&mut session);
        assert_eq!(session.placement().x, 0);

        press(&mut session, Key::Escape);
        assert!(session.view().magnify.is_none());
        assert_eq!(session.view().anchor, ScrollAnchor::Top { offset: -600 });
        expose_all(&mut session);
        assert_eq!(session.placement().y, -600);
    }

    #[test]
    fn rotation_wraps_and_rerenders() {
        let mut session = session_on(FakeBackend::new(1, 300.0, 400.0), 0, 800, 600);
        press(&mut session, Key::Char('['));
        assert_eq!(session.view().rotation, Rotation::Deg270);
        expose_all(&mut session);
        assert_eq!(session.placement(), ScreenRect::new(0, 0, 800, 600));

        press(&mut session, Key::Char(']'));
        assert_eq!(session.view().rotation, Rotation::Deg0);
        assert!(session.image().is_none());
    }

    #[test]
    fn selecting_current_fit_mode_is_noop() {
        let mut session = session_on(FakeBackend::new(1, 300.0, 400.0), 0, 600, 800);
        assert!(press(&mut session, Key::Char('z')).is_empty());
        assert!(session.image().is_some());
    }

    #[test]
    fn reload_returns_to_first_page_when_current_is_gone() {
        let mut session = session_on(FakeBackend::new(5, 300.0, 400.0), 4, 600, 800);
        assert_eq!(press(&mut session, Key::Char('r')), vec![Effect::Reload]);

        session
            .reload(Arc::new(FakeBackend::new(2, 300.0, 400.0)))
            .unwrap();
        assert_eq!(session.view().page, 0);
        assert_eq!(session.page_count(), 2);
        assert!(session.image().is_none());
    }

    #[test]
    fn client_close_quits() {
        let mut session = session_on(FakeBackend::new(1, 300.0, 400.0), 0, 600, 800);
        assert_eq!(
            session.handle(InputEvent::ClientClose).unwrap(),
            vec![Effect::Quit]
        );
    }
}
