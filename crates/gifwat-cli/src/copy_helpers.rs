use gifwat_core::clipboard::{ArboardClipboard, Clipboard};
use gifwat_core::{Error, Result};
use std::process::{Command, Stdio};

#[cfg(target_os = "linux")]
const FALLBACK_TOOLS: &[(&str, &[&str])] = &[("xclip", &["-selection", "clipboard"]), ("xsel", &["-b"])];
#[cfg(target_os = "macos")]
const FALLBACK_TOOLS: &[(&str, &[&str])] = &[("pbcopy", &[])];
#[cfg(target_os = "windows")]
const FALLBACK_TOOLS: &[(&str, &[&str])] = &[("clip", &[])];
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const FALLBACK_TOOLS: &[(&str, &[&str])] = &[];

/// Pipe `input` into a clipboard utility. Ok(false) when the tool is missing or fails.
fn try_prog(prog: &str, args: &[&str], input: &str) -> Result<bool> {
    let mut child = match Command::new(prog)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(c) => c,
        Err(_) => return Ok(false),
    };
    if let Some(mut stdin) = child.stdin.take() {
        use std::io::Write as _;
        let _ = stdin.write_all(input.as_bytes());
    }
    let status = child.wait()?;
    Ok(status.success())
}

pub fn copy_text(text: &str, force_wl_copy: bool) -> Result<()> {
    if cfg!(target_os = "linux")
        && (force_wl_copy || std::env::var_os("WAYLAND_DISPLAY").is_some())
        && try_prog("wl-copy", &[], text)?
    {
        return Ok(());
    }
    // system clipboard fallback
    let cb = ArboardClipboard::new();
    if let Err(e1) = cb.set_text(text) {
        tracing::debug!(error = %e1, "arboard failed; trying clipboard utilities");
        for (prog, args) in FALLBACK_TOOLS {
            if try_prog(prog, args, text)? {
                return Ok(());
            }
        }
        return Err(e1);
    }
    Ok(())
}

/// Clipboard port for the host backend, with command-line fallbacks.
pub struct SystemClipboard {
    force_wl_copy: bool,
}

impl SystemClipboard {
    pub fn new(force_wl_copy: bool) -> Self {
        Self { force_wl_copy }
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        copy_text(text, self.force_wl_copy).map_err(|e| match e {
            Error::Clipboard(_) => e,
            other => Error::Clipboard(other.to_string()),
        })
    }
}
