//! Clipboard port used by backends to serve `copy_to_clipboard`.

use crate::{Error, Result};
use std::sync::{Arc, Mutex};

pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> Result<()>;
}

impl<T: Clipboard + ?Sized> Clipboard for Arc<T> {
    fn set_text(&self, text: &str) -> Result<()> {
        (**self).set_text(text)
    }
}

#[derive(Default)]
pub struct NoopClipboard;

impl Clipboard for NoopClipboard {
    fn set_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Keeps the last written text; handy for tests and headless runs.
#[derive(Default)]
pub struct MemoryClipboard {
    last: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_text(&self) -> Option<String> {
        self.last.lock().ok().and_then(|g| g.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        let mut last = self
            .last
            .lock()
            .map_err(|_| Error::Clipboard("poisoned".into()))?;
        *last = Some(text.to_string());
        Ok(())
    }
}

#[cfg(feature = "clipboard")]
#[derive(Default)]
pub struct ArboardClipboard;

#[cfg(feature = "clipboard")]
impl ArboardClipboard {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "clipboard")]
impl Clipboard for ArboardClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        let mut cb = arboard::Clipboard::new().map_err(|e| Error::Clipboard(e.to_string()))?;
        cb.set_text(text.to_string())
            .map_err(|e| Error::Clipboard(e.to_string()))?;
        Ok(())
    }
}
