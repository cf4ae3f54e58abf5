//! Answering everything, blindly, through the host shell.
//!
//! The tool's input is saturated with affirmatives before it asks anything. There is no feedback
//! loop: a prompt expecting a different answer still gets `y`. This is an escape hatch for tools
//! whose prompts the classifier cannot recognize, not a correctness-bearing strategy.
//!
//! Quoting is deliberately narrow. On Windows, tokens containing a space are wrapped in double
//! quotes; elsewhere, tokens containing a single quote are. No other shell metacharacters are
//! escaped, so arguments that are not under the caller's control belong with
//! [Smart](super::Smart) instead.

use std::borrow::Cow;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Child;
use tracing::Instrument;
use yup_utils::shutdown::ShutdownManager;

use super::{
    forward_lines, stop_listeners, take_pipe, ConfirmationStrategy, StrategyKind, Supervised,
};
use crate::command::ExternalCommand;
use crate::lines::LineReader;
use crate::output::{Origin, SharedSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFamily {
    /// `cmd /c`, fed by `echo y`.
    Windows,
    /// `sh -lc`, fed by `yes`.
    Posix,
}

impl ShellFamily {
    pub fn host() -> Self {
        if cfg!(windows) {
            ShellFamily::Windows
        } else {
            ShellFamily::Posix
        }
    }

    fn affirmative_source(self) -> &'static str {
        match self {
            ShellFamily::Windows => "echo y",
            ShellFamily::Posix => "yes",
        }
    }

    fn quote(self, token: &str) -> Cow<'_, str> {
        let needs_quotes = match self {
            ShellFamily::Windows => token.contains(' '),
            ShellFamily::Posix => token.contains('\''),
        };
        if needs_quotes {
            Cow::Owned(format!("\"{token}\""))
        } else {
            Cow::Borrowed(token)
        }
    }

    fn interpreter(self, line: &str) -> tokio::process::Command {
        match self {
            ShellFamily::Windows => {
                let mut cmd = std::process::Command::new("cmd");
                cmd.arg("/c");
                // cmd.exe does its own parsing of the command line; hand it over verbatim.
                #[cfg(windows)]
                {
                    use std::os::windows::process::CommandExt;
                    cmd.raw_arg(format!("\"{line}\""));
                }
                #[cfg(not(windows))]
                cmd.arg(line);
                cmd.into()
            }
            ShellFamily::Posix => {
                let mut cmd = tokio::process::Command::new("sh");
                cmd.arg("-lc").arg(line);
                cmd
            }
        }
    }
}

/// The one-line shell program piping the affirmative source into `command`.
pub fn compose_shell_line(family: ShellFamily, command: &ExternalCommand) -> String {
    let executable = command.executable().to_string_lossy();

    let mut line = String::new();
    line.push_str(family.affirmative_source());
    line.push_str(" | ");
    line.push_str(&family.quote(&executable));
    for arg in command.arguments() {
        line.push(' ');
        line.push_str(&family.quote(arg));
    }
    line
}

#[derive(Debug, Clone)]
pub struct BruteForce {
    family: ShellFamily,
    drain_grace: Duration,
}

impl BruteForce {
    pub fn new(family: ShellFamily, drain_grace: Duration) -> Self {
        Self {
            family,
            drain_grace,
        }
    }

    pub fn family(&self) -> ShellFamily {
        self.family
    }
}

#[async_trait]
impl ConfirmationStrategy for BruteForce {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BruteForce
    }

    fn prepare(&self, command: &ExternalCommand) -> tokio::process::Command {
        let line = compose_shell_line(self.family, command);
        tracing::debug!(shell_line = %line, "composed brute-force shell line");

        let mut cmd = self.family.interpreter(&line);
        // The pipe inside the shell line feeds the tool; the shell itself reads nothing.
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }

    async fn supervise(&self, mut child: Child, sink: SharedSink) -> io::Result<Supervised> {
        let child_stdout = take_pipe(child.stdout.take(), "stdout")?;
        let child_stderr = take_pipe(child.stderr.take(), "stderr")?;

        let mut shutdown = ShutdownManager::default();
        let listeners = vec![
            tokio::spawn(
                forward_lines(
                    LineReader::new(child_stdout, Origin::Stdout),
                    sink.clone(),
                    shutdown.add_receiver(),
                )
                .in_current_span(),
            ),
            tokio::spawn(
                forward_lines(
                    LineReader::new(child_stderr, Origin::Stderr),
                    sink,
                    shutdown.add_receiver(),
                )
                .in_current_span(),
            ),
        ];

        let status = child.wait().await;
        stop_listeners(listeners, &mut shutdown, self.drain_grace, "output").await;

        Ok(Supervised {
            status: status?,
            responses_sent: 0,
        })
    }
}
