use std::path::PathBuf;

use thiserror::Error;

/// Failures that end the viewer. They travel inside `anyhow::Error` and can
/// be recovered with `downcast_ref`.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("cannot open document {path:?}: {reason}")]
    DocumentOpen { path: PathBuf, reason: String },
    #[error("page {page} does not exist (document has {page_count} pages)")]
    PageCreation { page: usize, page_count: usize },
    #[error("display setup failed: {0}")]
    DisplaySetup(String),
}
