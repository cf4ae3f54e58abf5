//! Observed output of the supervised tool, and where it goes.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Stdout,
    Stderr,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Stdout => write!(f, "stdout"),
            Origin::Stderr => write!(f, "stderr"),
        }
    }
}

/// One decoded line of tool output, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub text: String,
    pub origin: Origin,
}

impl OutputLine {
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }

    pub fn stdout(text: impl Into<String>) -> Self {
        Self::new(text, Origin::Stdout)
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self::new(text, Origin::Stderr)
    }
}

/// Receives tool output as it is observed, line by line.
///
/// Sinks are called from several listener tasks at once. Lines of one origin arrive in the order
/// the tool wrote them; nothing is promised about the order between origins.
pub trait OutputSink: Send + Sync {
    fn on_line(&self, line: &OutputLine);

    /// Called after `response` was written to the tool's input because of output on `origin`.
    fn on_response(&self, _origin: Origin, _response: &str) {}
}

pub type SharedSink = Arc<dyn OutputSink>;

/// Echoes every line to our own stdout or stderr, matching the line's origin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioSink;

impl OutputSink for StdioSink {
    fn on_line(&self, line: &OutputLine) {
        let written = match line.origin {
            Origin::Stdout => writeln!(io::stdout().lock(), "{}", line.text),
            Origin::Stderr => writeln!(io::stderr().lock(), "{}", line.text),
        };
        if let Err(error) = written {
            tracing::trace!(?error, "failed to echo tool output");
        }
    }
}

/// Emits every line as a `tracing` event under the `yup::tool` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn on_line(&self, line: &OutputLine) {
        tracing::info!(target: "yup::tool", origin = %line.origin, "{}", line.text);
    }

    fn on_response(&self, origin: Origin, response: &str) {
        tracing::info!(target: "yup::tool", %origin, response, "answered prompt");
    }
}
