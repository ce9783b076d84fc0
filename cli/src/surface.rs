use std::io::Write;

use studio_core::terminal::TerminalSurface;
use studio_protocol::terminal::TerminalSize;
use tracing::debug;

/// Renders terminal output straight to this process's stdout.
pub(crate) struct StdoutSurface {
    size: TerminalSize,
    fallback: TerminalSize,
}

impl StdoutSurface {
    pub(crate) fn new(fallback: TerminalSize) -> Self {
        Self {
            size: fallback,
            fallback,
        }
    }
}

impl TerminalSurface for StdoutSurface {
    fn write(&mut self, data: &str) {
        let mut stdout = std::io::stdout();
        if let Err(err) = stdout.write_all(data.as_bytes()).and_then(|()| stdout.flush()) {
            debug!("failed to write terminal output: {err}");
        }
    }

    fn fit(&mut self) -> TerminalSize {
        self.size = match crossterm::terminal::size() {
            Ok((cols, rows)) if cols > 0 && rows > 0 => TerminalSize { cols, rows },
            _ => self.fallback,
        };
        self.size
    }

    fn size(&self) -> TerminalSize {
        self.size
    }
}
