//! Clipboard integration utilities.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};

/// Destination for copied template scripts.
pub trait ClipboardBackend {
    fn copy(&mut self, text: &str) -> Result<()>;
}

/// System clipboard with fallbacks to platform copy commands for headless sessions.
pub struct Clipboard {
    primary: Option<arboard::Clipboard>,
}

impl Clipboard {
    /// Attempt to initialize the system clipboard. When unavailable we fall back to shell-based
    /// clipboard utilities.
    pub fn new() -> Self {
        let primary = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(err) => {
                tracing::debug!(error = %err, "system clipboard unavailable, using fallbacks");
                None
            }
        };
        Self { primary }
    }
}

impl ClipboardBackend for Clipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        if let Some(primary) = self.primary.as_mut()
            && primary.set_text(text.to_owned()).is_ok()
        {
            return Ok(());
        }

        self.primary = None;
        fallback_copy(text)
    }
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process clipboard that records the last copied text; shareable between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently copied text.
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .ok()
            .and_then(|contents| contents.clone())
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| anyhow!("memory clipboard lock poisoned"))?;
        *contents = Some(text.to_owned());
        Ok(())
    }
}

fn fallback_copy(text: &str) -> Result<()> {
    for command in fallback_commands() {
        match try_command_copy(command, text) {
            Ok(()) => return Ok(()),
            Err(err) => tracing::debug!(command = ?command, error = %err, "clipboard fallback failed"),
        }
    }

    Err(anyhow!(
        "failed to copy text to clipboard using available backends"
    ))
}

fn try_command_copy(command: &[&str], text: &str) -> Result<()> {
    let (program, args) = command
        .split_first()
        .context("clipboard command missing program")?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn clipboard command: {program}"))?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(text.as_bytes())
            .context("failed to write clipboard contents")?;
    }

    let status = child
        .wait()
        .with_context(|| format!("clipboard command did not exit cleanly: {program}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("clipboard command exited with status {status}"))
    }
}

#[cfg(target_os = "macos")]
fn fallback_commands() -> Vec<&'static [&'static str]> {
    vec![&["pbcopy"]]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn fallback_commands() -> Vec<&'static [&'static str]> {
    vec![
        &["wl-copy"],
        &["xclip", "-selection", "clipboard"],
        &["xsel", "--clipboard", "--input"],
    ]
}

#[cfg(target_os = "windows")]
fn fallback_commands() -> Vec<&'static [&'static str]> {
    vec![&["powershell.exe", "-NoProfile", "-Command", "Set-Clipboard"]]
}

#[cfg(not(any(unix, target_os = "windows")))]
fn fallback_commands() -> Vec<&'static [&'static str]> {
    Vec::new()
}
