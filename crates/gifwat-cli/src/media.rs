//! Terminal stand-in for a browser's media pipeline.
//!
//! A terminal cannot paint a GIF, so "loading" means checking that the
//! resource is usable: local files are opened and their first frame decoded;
//! remote urls are accepted once they name a host. Nothing is cached, so
//! every attempt checks the attempt's plain url.

use gifwat_core::image_load::LoadAttempt;
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Loaded,
    Failed(String),
}

pub trait MediaProbe: Send + Sync {
    fn probe(&self, attempt: &LoadAttempt) -> ProbeOutcome;
}

#[derive(Default)]
pub struct LocalGifProbe;

fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if url.contains("://") {
        return None;
    }
    Some(PathBuf::from(url))
}

fn decode_first_frame(path: &PathBuf) -> Result<(), String> {
    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let decoder = GifDecoder::new(BufReader::new(file)).map_err(|e| e.to_string())?;
    match decoder.into_frames().next() {
        Some(Ok(_)) => Ok(()),
        Some(Err(e)) => Err(e.to_string()),
        None => Err("no frames".into()),
    }
}

impl MediaProbe for LocalGifProbe {
    fn probe(&self, attempt: &LoadAttempt) -> ProbeOutcome {
        let url = attempt.url.as_str();
        if let Some(path) = local_path(url) {
            return match decode_first_frame(&path) {
                Ok(()) => ProbeOutcome::Loaded,
                Err(e) => ProbeOutcome::Failed(e),
            };
        }
        let host = url
            .split_once("://")
            .map(|(_, rest)| rest.split(['/', '?', '#']).next().unwrap_or(""))
            .unwrap_or("");
        if host.is_empty() {
            ProbeOutcome::Failed(format!("no host in {url}"))
        } else {
            ProbeOutcome::Loaded
        }
    }
}
