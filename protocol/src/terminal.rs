use serde::Deserialize;
use serde::Serialize;

/// Frames exchanged on the terminal channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminalFrame {
    /// Keystrokes travelling to the pty.
    Input { data: String },
    /// Raw pty output travelling to the client.
    Output { data: String },
    Resize { cols: u16, rows: u16 },
}

impl TerminalFrame {
    pub fn input(data: impl Into<String>) -> Self {
        TerminalFrame::Input { data: data.into() }
    }

    pub fn resize(size: TerminalSize) -> Self {
        TerminalFrame::Resize {
            cols: size.cols,
            rows: size.rows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}
