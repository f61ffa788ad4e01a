//! The authoritative in-memory collection and the backend command protocol.
//!
//! Every backend round-trip is a [`Request`] carrying a monotonically
//! increasing ticket. Requests may complete in any order; the store applies
//! their [`Reply`]s as they arrive. Mutations are never applied locally:
//! a successful add/update/delete yields a fresh `get_gifs` request instead.

use crate::backend::Backend;
use crate::{Error, Gif, GifId};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetGifs,
    AddGif { url: String, tags: Vec<String> },
    UpdateGifTags { id: GifId, tags: Vec<String> },
    DeleteGif { id: GifId },
    CopyToClipboard { id: GifId, text: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetGifs => "get_gifs",
            Command::AddGif { .. } => "add_gif",
            Command::UpdateGifTags { .. } => "update_gif_tags",
            Command::DeleteGif { .. } => "delete_gif",
            Command::CopyToClipboard { .. } => "copy_to_clipboard",
        }
    }

    fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::AddGif { .. } | Command::UpdateGifTags { .. } | Command::DeleteGif { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub ticket: u64,
    pub command: Command,
}

#[derive(Debug)]
pub struct Reply {
    pub ticket: u64,
    pub command: Command,
    pub result: crate::Result<Option<Vec<Gif>>>,
}

/// Run one request against a backend. Hosts call this from wherever their
/// commands execute (worker thread, inline in tests).
pub fn execute(backend: &dyn Backend, req: Request) -> Reply {
    let result = match &req.command {
        Command::GetGifs => backend.get_gifs().map(Some),
        Command::AddGif { url, tags } => backend.add_gif(url, tags).map(|_| None),
        Command::UpdateGifTags { id, tags } => backend.update_gif_tags(id, tags).map(|_| None),
        Command::DeleteGif { id } => backend.delete_gif(id).map(|_| None),
        Command::CopyToClipboard { text, .. } => backend.copy_to_clipboard(text).map(|_| None),
    };
    Reply {
        ticket: req.ticket,
        command: req.command,
        result,
    }
}

/// What applying a reply did to the store.
#[derive(Debug)]
pub enum Applied {
    /// The list was replaced by a fresh snapshot
    Reloaded,
    /// A load response older than the last applied one; dropped
    Stale,
    /// A mutation succeeded; issue the contained resync load
    Mutated {
        ticket: u64,
        command: Command,
        resync: Request,
    },
    /// The clipboard write succeeded
    Copied { id: GifId, ticket: u64 },
    /// The command failed; nothing changed
    Failed {
        ticket: u64,
        command: Command,
        error: Error,
    },
}

#[derive(Debug, Default)]
pub struct GifCollectionStore {
    gifs: Vec<Gif>,
    next_ticket: u64,
    applied_load: Option<u64>,
    in_flight_loads: usize,
}

impl GifCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gifs(&self) -> &[Gif] {
        &self.gifs
    }

    pub fn get(&self, id: &str) -> Option<&Gif> {
        self.gifs.iter().find(|g| g.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight_loads > 0
    }

    pub fn request(&mut self, command: Command) -> Request {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        if command == Command::GetGifs {
            self.in_flight_loads += 1;
        }
        Request { ticket, command }
    }

    pub fn load(&mut self) -> Request {
        self.request(Command::GetGifs)
    }

    /// Callers tokenize and trim first; an empty url never reaches the backend.
    pub fn add(&mut self, url: &str, tags: Vec<String>) -> Option<Request> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        Some(self.request(Command::AddGif {
            url: url.to_string(),
            tags,
        }))
    }

    pub fn update_tags(&mut self, id: &str, tags: Vec<String>) -> Request {
        self.request(Command::UpdateGifTags {
            id: id.to_string(),
            tags,
        })
    }

    pub fn remove(&mut self, id: &str) -> Request {
        self.request(Command::DeleteGif { id: id.to_string() })
    }

    pub fn copy(&mut self, gif: &Gif) -> Request {
        self.request(Command::CopyToClipboard {
            id: gif.id.clone(),
            text: gif.url.clone(),
        })
    }

    pub fn apply(&mut self, reply: Reply) -> Applied {
        let Reply {
            ticket,
            command,
            result,
        } = reply;
        if command == Command::GetGifs {
            self.in_flight_loads = self.in_flight_loads.saturating_sub(1);
        }
        let payload = match result {
            Ok(p) => p,
            Err(error) => {
                tracing::warn!(command = command.name(), ticket, %error, "backend command failed");
                return Applied::Failed {
                    ticket,
                    command,
                    error,
                };
            }
        };
        match command {
            Command::GetGifs => {
                if self.applied_load.is_some_and(|applied| ticket < applied) {
                    tracing::debug!(ticket, "dropping stale get_gifs response");
                    return Applied::Stale;
                }
                self.applied_load = Some(ticket);
                self.replace(payload.unwrap_or_default());
                Applied::Reloaded
            }
            Command::CopyToClipboard { id, .. } => Applied::Copied { id, ticket },
            command => {
                debug_assert!(command.is_mutation());
                let resync = self.load();
                Applied::Mutated {
                    ticket,
                    command,
                    resync,
                }
            }
        }
    }

    /// Execute a request and everything it triggers, synchronously.
    pub fn run_blocking(&mut self, backend: &dyn Backend, req: Request) -> crate::Result<()> {
        let mut next = Some(req);
        while let Some(req) = next.take() {
            match self.apply(execute(backend, req)) {
                Applied::Mutated { resync, .. } => next = Some(resync),
                Applied::Failed { error, .. } => return Err(error),
                _ => {}
            }
        }
        Ok(())
    }

    fn replace(&mut self, gifs: Vec<Gif>) {
        let mut seen = HashSet::new();
        let before = gifs.len();
        self.gifs = gifs.into_iter().filter(|g| seen.insert(g.id.clone())).collect();
        if self.gifs.len() != before {
            tracing::warn!(dropped = before - self.gifs.len(), "backend returned duplicate ids");
        }
    }
}
