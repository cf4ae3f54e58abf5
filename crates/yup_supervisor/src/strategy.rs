//! Policies deciding whether, and how, the tool's confirmation prompts are answered.

use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::io::AsyncRead;
use tokio::process::Child;
use tokio::task::JoinHandle;
use yup_utils::shutdown::{ShutdownManager, ShutdownReceiver};
use yup_utils::timeout_future::WithTimeout;

use crate::command::ExternalCommand;
use crate::lines::LineReader;
use crate::output::SharedSink;

mod brute_force;
mod passive;
mod smart;

pub use brute_force::{compose_shell_line, BruteForce, ShellFamily};
pub use passive::Passive;
pub use smart::Smart;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// The tool runs in the foreground on our own standard streams; nothing is answered.
    Passive,
    /// An endless stream of affirmatives is piped into the tool through the host shell.
    BruteForce,
    /// Output is classified line by line and only detected prompts are answered.
    Smart,
}

impl StrategyKind {
    /// BruteForce needs both flags; auto-confirm alone means Smart, and without auto-confirm
    /// the brute-force flag is ignored.
    pub fn select(auto_confirm: bool, force_brute_force: bool) -> Self {
        match (auto_confirm, force_brute_force) {
            (false, _) => StrategyKind::Passive,
            (true, true) => StrategyKind::BruteForce,
            (true, false) => StrategyKind::Smart,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Passive => write!(f, "passive"),
            StrategyKind::BruteForce => write!(f, "brute-force"),
            StrategyKind::Smart => write!(f, "smart"),
        }
    }
}

/// What a strategy reports once the child has exited and every listener has stopped.
#[derive(Debug)]
pub struct Supervised {
    pub status: ExitStatus,
    pub responses_sent: usize,
}

#[async_trait]
pub trait ConfirmationStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// The process to spawn for `command`, with its standard streams wired for this strategy.
    fn prepare(&self, command: &ExternalCommand) -> tokio::process::Command;

    /// Attaches to the spawned child and waits for it to exit.
    ///
    /// Must not return while any listener it started is still running.
    async fn supervise(&self, child: Child, sink: SharedSink) -> io::Result<Supervised>;
}

pub type ConfirmationStrategyBox = Box<dyn ConfirmationStrategy>;

/// Takes a pipe `prepare` asked for, failing if the child was spawned without it.
pub(crate) fn take_pipe<T>(pipe: Option<T>, name: &'static str) -> io::Result<T> {
    pipe.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::BrokenPipe,
            format!("child was spawned without a piped {name}"),
        )
    })
}

/// Copies every line of `lines` to `sink` until end of stream or shutdown.
pub(crate) async fn forward_lines<R>(
    mut lines: LineReader<R>,
    sink: SharedSink,
    mut shutdown: ShutdownReceiver,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.recv_shutdown() => break,
            line = lines.next_line() => line?,
        };
        match line {
            Some(line) => sink.on_line(&line),
            None => break,
        }
    }
    Ok(())
}

/// Waits up to `grace` for `listeners` to finish on their own, then signals `shutdown` and waits
/// for the rest.
///
/// Listener failures are logged, not returned: losing some output must not mask the tool's exit
/// status.
pub(crate) async fn stop_listeners(
    listeners: Vec<JoinHandle<io::Result<()>>>,
    shutdown: &mut ShutdownManager,
    grace: Duration,
    group: &'static str,
) {
    let mut all = join_all(listeners);

    let results = match (&mut all).with_timeout(grace).wait().await {
        Some(results) => results,
        None => {
            tracing::debug!(
                group,
                ?grace,
                "listeners still attached after exit, cancelling them"
            );
            let signalled = shutdown.shutdown();
            tracing::trace!(group, signalled, "sent shutdown");
            all.await
        }
    };
    // Anything still waiting on the signal must see it, even if every listener ended by itself.
    shutdown.shutdown();

    for result in results {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::warn!(group, %error, "listener failed reading tool output"),
            Err(error) => tracing::error!(group, %error, "listener task did not complete"),
        }
    }
}
