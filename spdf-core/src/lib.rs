//! Viewport engine of the spdf document viewer.
//!
//! The session decides which part of a page is visible and at what
//! resolution, maps between screen pixels and document units, and plans the
//! minimal set of draw operations after every change. Rasterization and
//! display live behind [`DocumentBackend`] and [`Surface`].

pub mod config;
pub mod coords;
pub mod damage;
pub mod document;
pub mod error;
pub mod event;
pub mod geometry;
pub mod history;
pub mod keymap;
pub mod layout;
pub mod prompt;
pub mod search;
pub mod session;
pub mod surface;

pub use config::{Config, Rgb, ScrollConfig};
pub use coords::{CoordConverter, YAxis};
pub use damage::{plan_repaint, StatusLine};
pub use document::{
    open_document, DocumentBackend, DocumentInfo, DocumentMetadata, DocumentProvider,
    LinkDefinition, PageBox, RenderImage, RenderRequest, TextQuery,
};
pub use error::ViewerError;
pub use event::{Button, Effect, InputEvent, SelectionTarget};
pub use geometry::{intersect, subtract, DocRect, Rect, ScreenPoint, ScreenRect};
pub use history::NavigationHistory;
pub use keymap::{Action, Key, Keymap, ModifierMatch, Modifiers, Shortcut};
pub use layout::{configure, FitMode, RenderPlacement, Rotation, ScrollAnchor};
pub use prompt::{PromptKind, PromptMode, StatusPrompt};
pub use search::{SearchQuery, SearchState};
pub use session::{PageImage, Selection, Session, ViewState};
pub use surface::{DrawOp, LineMetrics, Paint, Surface};
