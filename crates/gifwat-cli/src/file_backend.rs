//! JSON-file backend: the host-side collaborator behind the core's command port.

use gifwat_core::clipboard::Clipboard;
use gifwat_core::{gen_id, Backend, Error, Gif, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Library {
    #[serde(default)]
    gifs: Vec<Gif>,
}

pub struct JsonFileBackend {
    path: PathBuf,
    lock: Mutex<()>,
    clipboard: Box<dyn Clipboard>,
}

impl JsonFileBackend {
    pub fn new<P: AsRef<Path>>(path: P, clipboard: Box<dyn Clipboard>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
            clipboard,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Library> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(Library::default()),
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Library::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, lib: &Library) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        // write-then-rename so a crash never leaves a truncated library
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(lib)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Library) -> Result<()>,
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::Backend("library lock poisoned".into()))?;
        let mut lib = self.read()?;
        f(&mut lib)?;
        self.write(&lib)
    }
}

impl Backend for JsonFileBackend {
    fn get_gifs(&self) -> Result<Vec<Gif>> {
        Ok(self.read()?.gifs)
    }

    fn add_gif(&self, url: &str, tags: &[String]) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::EmptyUrl);
        }
        self.mutate(|lib| {
            lib.gifs.insert(0, Gif::new(gen_id(), url, tags.to_vec()));
            Ok(())
        })
    }

    fn update_gif_tags(&self, id: &str, tags: &[String]) -> Result<()> {
        self.mutate(|lib| match lib.gifs.iter_mut().find(|g| g.id == id) {
            Some(g) => {
                g.tags = tags.to_vec();
                Ok(())
            }
            None => Err(Error::NotFound(id.to_string())),
        })
    }

    fn delete_gif(&self, id: &str) -> Result<()> {
        self.mutate(|lib| {
            let before = lib.gifs.len();
            lib.gifs.retain(|g| g.id != id);
            if lib.gifs.len() == before {
                return Err(Error::NotFound(id.to_string()));
            }
            Ok(())
        })
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        self.clipboard.set_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gifwat_core::clipboard::NoopClipboard;
    use tempfile::tempdir;

    #[test]
    fn persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("gifs.json");
        let a = JsonFileBackend::new(&path, Box::new(NoopClipboard));
        a.add_gif("https://x.example/1.gif", &["one".into()]).unwrap();
        a.add_gif("https://x.example/2.gif", &[]).unwrap();

        let b = JsonFileBackend::new(&path, Box::new(NoopClipboard));
        let gifs = b.get_gifs().unwrap();
        assert_eq!(gifs.len(), 2);
        assert_eq!(gifs[0].url, "https://x.example/2.gif");
        assert_ne!(gifs[0].id, gifs[1].id);
    }

    #[test]
    fn missing_file_is_an_empty_library() {
        let dir = tempdir().unwrap();
        let b = JsonFileBackend::new(dir.path().join("none.json"), Box::new(NoopClipboard));
        assert!(b.get_gifs().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_surfaces_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gifs.json");
        std::fs::write(&path, "{ not json").unwrap();
        let b = JsonFileBackend::new(&path, Box::new(NoopClipboard));
        assert!(matches!(b.get_gifs(), Err(Error::Json(_))));
        assert!(b.add_gif("https://x.example/1.gif", &[]).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn delete_and_retag() {
        let dir = tempdir().unwrap();
        let b = JsonFileBackend::new(dir.path().join("gifs.json"), Box::new(NoopClipboard));
        b.add_gif("https://x.example/1.gif", &[]).unwrap();
        let id = b.get_gifs().unwrap()[0].id.clone();
        b.update_gif_tags(&id, &["a".into(), "b".into()]).unwrap();
        assert_eq!(b.get_gifs().unwrap()[0].tags, vec!["a", "b"]);
        b.delete_gif(&id).unwrap();
        assert!(b.get_gifs().unwrap().is_empty());
        assert!(matches!(b.delete_gif(&id), Err(Error::NotFound(_))));
    }
}
