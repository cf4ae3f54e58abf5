use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Child;

use super::{ConfirmationStrategy, StrategyKind, Supervised};
use crate::command::ExternalCommand;
use crate::output::SharedSink;

/// Runs the tool as an ordinary foreground process.
///
/// All three standard streams are inherited, so a human at the terminal answers any prompt. The
/// sink never sees a line: there is nothing to observe.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passive;

#[async_trait]
impl ConfirmationStrategy for Passive {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Passive
    }

    fn prepare(&self, command: &ExternalCommand) -> tokio::process::Command {
        let mut cmd = command.to_direct();
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd
    }

    async fn supervise(&self, mut child: Child, _sink: SharedSink) -> io::Result<Supervised> {
        let status = child.wait().await?;
        Ok(Supervised {
            status,
            responses_sent: 0,
        })
    }
}
