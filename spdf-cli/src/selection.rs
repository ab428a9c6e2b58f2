use arboard::Clipboard;
use spdf_core::SelectionTarget;
use tracing::{debug, warn};

/// Owns the system clipboard handle. The handle is kept for the whole run
/// because on X11 the contents disappear with it.
#[derive(Default)]
pub struct SelectionOwner {
    clipboard: Option<Clipboard>,
}

impl SelectionOwner {
    /// Claims `target` with `text`. Failures are logged and otherwise ignored.
    pub fn claim(&mut self, target: SelectionTarget, text: &str) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(err) => {
                    warn!(%err, "clipboard unavailable");
                    return;
                }
            }
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            return;
        };

        let result = match target {
            SelectionTarget::Clipboard => clipboard.set_text(text),
            SelectionTarget::Primary => set_primary(clipboard, text),
        };
        match result {
            Ok(()) => debug!(?target, len = text.len(), "selection claimed"),
            Err(err) => warn!(?target, %err, "failed to set selection"),
        }
    }
}

#[cfg(target_os = "linux")]
fn set_primary(clipboard: &mut Clipboard, text: &str) -> Result<(), arboard::Error> {
    use arboard::{LinuxClipboardKind, SetExtLinux};

    clipboard
        .set()
        .clipboard(LinuxClipboardKind::Primary)
        .text(text)
}

// Platforms without a primary selection fall back to the clipboard.
#[cfg(not(target_os = "linux"))]
fn set_primary(clipboard: &mut Clipboard, text: &str) -> Result<(), arboard::Error> {
    clipboard.set_text(text)
}
