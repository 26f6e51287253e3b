//! System clipboard integration
//!
//! Copies composed prompts to the system clipboard. When no clipboard is
//! available, or stdout is piped, the text goes to stdout instead.

use anyhow::{Context, Result};
use copypasta::{ClipboardContext, ClipboardProvider};
use is_terminal::IsTerminal;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyTarget {
    Clipboard,
    Stdout,
}

pub struct Clipboard {
    context: Option<ClipboardContext>,
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard {
    pub fn new() -> Self {
        // Headless sessions have no clipboard; that is not an error
        let context = ClipboardContext::new().ok();
        Self { context }
    }

    /// Copy to the clipboard when stdout is a terminal, else write to stdout
    pub fn deliver(&mut self, content: &str) -> Result<CopyTarget> {
        if io::stdout().is_terminal() {
            self.copy_to_clipboard(content)
        } else {
            write_to_stdout(content)?;
            Ok(CopyTarget::Stdout)
        }
    }

    pub fn copy_to_clipboard(&mut self, content: &str) -> Result<CopyTarget> {
        match self.context.as_mut() {
            Some(ctx) => {
                ctx.set_contents(content.to_string())
                    .map_err(|e| anyhow::anyhow!("Failed to copy to clipboard: {}", e))?;
                Ok(CopyTarget::Clipboard)
            }
            None => {
                println!("{}", content);
                Ok(CopyTarget::Stdout)
            }
        }
    }
}

fn write_to_stdout(content: &str) -> Result<()> {
    let mut stdout = io::stdout();
    stdout
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    stdout.flush()?;
    Ok(())
}
