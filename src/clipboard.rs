use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

/// Publishes a payload to the clipboard. An unavailable clipboard degrades
/// the copy to a no-op with a warning rather than failing the run; returns
/// whether the payload was actually published.
pub fn publish_payload(clipboard: &impl Clipboard, payload: &str) -> bool {
    match clipboard.set_text(payload) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Clipboard unavailable, copy skipped");
            false
        }
    }
}

/// Trait defining the clipboard operations required by the library
pub trait Clipboard {
    /// Read the current clipboard text
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be opened or holds no text
    fn get_text(&self) -> Result<String>;

    /// Replace the clipboard contents with the given text
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be opened or written
    fn set_text(&self, text: &str) -> Result<()>;
}

/// Clipboard implementation backed by the OS clipboard via `arboard`
pub struct SystemClipboard;

impl SystemClipboard {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard for SystemClipboard {
    #[instrument(skip(self))]
    fn get_text(&self) -> Result<String> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| Error::ClipboardError(e.to_string()))?;
        let text = clipboard
            .get_text()
            .map_err(|e| Error::ClipboardError(e.to_string()))?;

        debug!(text_length = text.len(), "Clipboard text retrieved");
        Ok(text)
    }

    #[instrument(skip(self, text), fields(text_length = text.len()))]
    fn set_text(&self, text: &str) -> Result<()> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| Error::ClipboardError(e.to_string()))?;
        clipboard
            .set_text(text.to_owned())
            .map_err(|e| Error::ClipboardError(e.to_string()))?;

        debug!("Clipboard text published");
        Ok(())
    }
}
