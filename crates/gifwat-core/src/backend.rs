//! Backend command port and a minimal in-memory implementation.

use crate::clipboard::{Clipboard, NoopClipboard};
use crate::{gen_id, Error, Gif, Result};
use std::sync::RwLock;

/// The command surface the interaction core consumes. Implementations own
/// persistence and the clipboard write; the core only sees success/failure.
pub trait Backend: Send + Sync {
    fn get_gifs(&self) -> Result<Vec<Gif>>;
    fn add_gif(&self, url: &str, tags: &[String]) -> Result<()>;
    fn update_gif_tags(&self, id: &str, tags: &[String]) -> Result<()>;
    fn delete_gif(&self, id: &str) -> Result<()>;
    fn copy_to_clipboard(&self, text: &str) -> Result<()>;
}

pub struct MemBackend {
    inner: RwLock<Vec<Gif>>,
    clipboard: Box<dyn Clipboard>,
}

impl Default for MemBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemBackend {
    pub fn new() -> Self {
        Self::with_clipboard(Box::new(NoopClipboard))
    }

    pub fn with_clipboard(clipboard: Box<dyn Clipboard>) -> Self {
        Self {
            inner: RwLock::new(Vec::new()),
            clipboard,
        }
    }

    pub fn seeded(gifs: Vec<Gif>) -> Self {
        let b = Self::new();
        if let Ok(mut v) = b.inner.write() {
            *v = gifs;
        }
        b
    }

    fn poisoned() -> Error {
        Error::Backend("store lock poisoned".into())
    }
}

impl Backend for MemBackend {
    fn get_gifs(&self) -> Result<Vec<Gif>> {
        let v = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(v.clone())
    }

    fn add_gif(&self, url: &str, tags: &[String]) -> Result<()> {
        if url.trim().is_empty() {
            return Err(Error::EmptyUrl);
        }
        let gif = Gif::new(gen_id(), url, tags.to_vec());
        let mut v = self.inner.write().map_err(|_| Self::poisoned())?;
        v.insert(0, gif);
        Ok(())
    }

    fn update_gif_tags(&self, id: &str, tags: &[String]) -> Result<()> {
        let mut v = self.inner.write().map_err(|_| Self::poisoned())?;
        match v.iter_mut().find(|g| g.id == id) {
            Some(g) => {
                g.tags = tags.to_vec();
                Ok(())
            }
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    fn delete_gif(&self, id: &str) -> Result<()> {
        let mut v = self.inner.write().map_err(|_| Self::poisoned())?;
        let before = v.len();
        v.retain(|g| g.id != id);
        if v.len() == before {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        self.clipboard.set_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use std::sync::Arc;

    #[test]
    fn add_inserts_newest_first() {
        let b = MemBackend::new();
        b.add_gif("https://a.example/one.gif", &[]).unwrap();
        b.add_gif("https://a.example/two.gif", &["two".into()]).unwrap();
        let all = b.get_gifs().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].url, "https://a.example/two.gif");
        assert_eq!(all[0].tags, vec!["two".to_string()]);
    }

    #[test]
    fn delete_unknown_id_fails() {
        let b = MemBackend::new();
        assert!(matches!(b.delete_gif("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn update_tags_replaces_tags() {
        let b = MemBackend::new();
        b.add_gif("https://a.example/x.gif", &["old".into()]).unwrap();
        let id = b.get_gifs().unwrap()[0].id.clone();
        b.update_gif_tags(&id, &["new".into(), "tags".into()]).unwrap();
        assert_eq!(b.get_gifs().unwrap()[0].tags, vec!["new", "tags"]);
    }

    #[test]
    fn copy_goes_through_clipboard() {
        let cb = Arc::new(MemoryClipboard::new());
        let b = MemBackend::with_clipboard(Box::new(cb.clone()));
        b.copy_to_clipboard("https://a.example/x.gif").unwrap();
        assert_eq!(cb.last_text().as_deref(), Some("https://a.example/x.gif"));
    }
}
