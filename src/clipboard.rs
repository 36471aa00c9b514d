//! Copy to the system clipboard, with an OSC 52 escape for remote terminals.

use std::env;
use std::io::{self, Write};

use arboard::Clipboard;
use base64::{Engine as _, engine::general_purpose};
use crossterm::{execute, style::Print};

pub fn is_ssh_session() -> bool {
    env::var_os("SSH_CONNECTION").is_some() || env::var_os("SSH_TTY").is_some()
}

pub fn in_tmux() -> bool {
    env::var_os("TMUX").is_some() || env::var_os("TERM").is_some_and(|t| t.to_string_lossy().starts_with("tmux"))
}

fn osc52_sequence(text: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{}\x07", encoded)
}

fn tmux_passthrough(seq: &str) -> String {
    let escaped = seq.replace('\x1b', "\x1b\x1b");
    format!("\x1bPtmux;{}\x1b\\", escaped)
}

fn emit_osc52<W: Write>(w: &mut W, text: &str) -> io::Result<()> {
    let seq = osc52_sequence(text);
    let out = if in_tmux() { tmux_passthrough(&seq) } else { seq };
    execute!(w, Print(out))?;
    w.flush()
}

fn try_set_system_clipboard(text: &str) -> Result<(), String> {
    let mut cb = Clipboard::new().map_err(|e| e.to_string())?;
    cb.set_text(text.to_string()).map_err(|e| e.to_string())
}

/// Copy `text` and return the status line to show.
pub fn copy<W: Write>(w: &mut W, text: &str) -> String {
    let osc52_result = emit_osc52(w, text);
    let is_ssh = is_ssh_session();
    let system_result = if is_ssh { Ok(()) } else { try_set_system_clipboard(text) };

    match (osc52_result, system_result) {
        (Ok(_), Ok(_)) if is_ssh => {
            if in_tmux() {
                "Copied (OSC52/tmux)".to_string()
            } else {
                "Copied (OSC52)".to_string()
            }
        }
        (Ok(_), Ok(_)) => format!("Copied {}", text),
        (Ok(_), Err(e)) => format!("Copied (OSC52); clipboard error: {}", e),
        (Err(e), Ok(_)) => format!("Clipboard set; OSC52 error: {}", e),
        (Err(e1), Err(e2)) => {
            tracing::warn!("copy failed: {}; {}", e1, e2);
            format!("Copy failed: {}; {}", e1, e2)
        }
    }
}
