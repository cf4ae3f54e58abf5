//! Answering only the prompts the classifier recognizes.
//!
//! Three listeners run while the tool is alive:
//!
//! - one per output channel, forwarding each line to the sink, classifying it, and answering
//!   through the shared [ResponseInjector];
//! - one over the [multiplexed](crate::multiplex) view of both channels, which only checks the
//!   explicit-affirmation rule.
//!
//! Channel listeners hand each line to the merged listener after they are done answering it.
//! When the tool exits, its input is closed first, then the channel listeners are drained and
//! stopped, then the merged listener.

use std::io;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::Instrument;
use yup_utils::log_assert;
use yup_utils::shutdown::{ShutdownManager, ShutdownReceiver};

use super::{stop_listeners, take_pipe, ConfirmationStrategy, StrategyKind, Supervised};
use crate::classify::LineClassifier;
use crate::command::ExternalCommand;
use crate::inject::ResponseInjector;
use crate::lines::{LineReader, ReadEvent};
use crate::multiplex::{multiplex, receiver_stream};
use crate::output::{Origin, OutputLine, SharedSink};

/// Lines a channel listener may run ahead of the merged listener.
const TAP_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct Smart {
    classifier: Arc<LineClassifier>,
    prompt_idle: Option<Duration>,
    drain_grace: Duration,
}

impl Smart {
    pub fn new(
        classifier: Arc<LineClassifier>,
        prompt_idle: Option<Duration>,
        drain_grace: Duration,
    ) -> Self {
        Self {
            classifier,
            prompt_idle,
            drain_grace,
        }
    }
}

#[async_trait]
impl ConfirmationStrategy for Smart {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Smart
    }

    fn prepare(&self, command: &ExternalCommand) -> tokio::process::Command {
        let mut cmd = command.to_direct();
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }

    async fn supervise(&self, mut child: Child, sink: SharedSink) -> io::Result<Supervised> {
        // Taken before waiting: `Child::wait` would otherwise close stdin on our behalf.
        let child_stdin = take_pipe(child.stdin.take(), "stdin")?;
        let child_stdout = take_pipe(child.stdout.take(), "stdout")?;
        let child_stderr = take_pipe(child.stderr.take(), "stderr")?;

        let responder = Responder::new(ResponseInjector::new(child_stdin), sink.clone());

        let (stdout_tap, stdout_tapped) = mpsc::channel(TAP_CAPACITY);
        let (stderr_tap, stderr_tapped) = mpsc::channel(TAP_CAPACITY);

        let mut merged_shutdown = ShutdownManager::default();
        let merged = tokio::spawn(
            listen_merged(
                multiplex(
                    receiver_stream(stdout_tapped),
                    receiver_stream(stderr_tapped),
                ),
                self.classifier.clone(),
                responder.clone(),
                merged_shutdown.add_receiver(),
            )
            .in_current_span(),
        );

        let mut output_shutdown = ShutdownManager::default();
        let outputs = vec![
            tokio::spawn(
                ChannelListener {
                    lines: LineReader::new(child_stdout, Origin::Stdout),
                    classifier: self.classifier.clone(),
                    responder: responder.clone(),
                    prompt_idle: self.prompt_idle,
                    tap: stdout_tap,
                }
                .run(output_shutdown.add_receiver())
                .in_current_span(),
            ),
            tokio::spawn(
                ChannelListener {
                    lines: LineReader::new(child_stderr, Origin::Stderr),
                    classifier: self.classifier.clone(),
                    responder: responder.clone(),
                    prompt_idle: self.prompt_idle,
                    tap: stderr_tap,
                }
                .run(output_shutdown.add_receiver())
                .in_current_span(),
            ),
        ];

        let status = child.wait().await;

        let closed_here = responder.injector.close().await;
        log_assert!(closed_here, "tool input was closed before the tool exited");

        stop_listeners(outputs, &mut output_shutdown, self.drain_grace, "output").await;
        stop_listeners(
            vec![merged],
            &mut merged_shutdown,
            self.drain_grace,
            "merged",
        )
        .await;

        Ok(Supervised {
            status: status?,
            responses_sent: responder.sent(),
        })
    }
}

/// Writes responses and accounts for them. Shared by every listener of one child.
struct Responder<W> {
    injector: ResponseInjector<W>,
    sink: SharedSink,
    sent: Arc<AtomicUsize>,
}

impl<W> Clone for Responder<W> {
    fn clone(&self) -> Self {
        Self {
            injector: self.injector.clone(),
            sink: self.sink.clone(),
            sent: self.sent.clone(),
        }
    }
}

impl<W> Responder<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn new(injector: ResponseInjector<W>, sink: SharedSink) -> Self {
        Self {
            injector,
            sink,
            sent: Arc::new(AtomicUsize::new(0)),
        }
    }

    async fn answer(&self, origin: Origin, response: &str) {
        match self.injector.send(response).await {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::SeqCst);
                tracing::info!(%origin, response, "answered confirmation prompt");
                self.sink.on_response(origin, response);
            }
            Err(error) => {
                tracing::trace!(%origin, response, %error, "response not delivered");
            }
        }
    }

    fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

struct ChannelListener<R, W> {
    lines: LineReader<R>,
    classifier: Arc<LineClassifier>,
    responder: Responder<W>,
    prompt_idle: Option<Duration>,
    tap: mpsc::Sender<String>,
}

impl<R, W> ChannelListener<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send,
{
    async fn run(self, mut shutdown: ShutdownReceiver) -> io::Result<()> {
        let Self {
            mut lines,
            classifier,
            responder,
            prompt_idle,
            tap,
        } = self;
        let origin = lines.origin();
        // Set once a stalled fragment was answered, cleared when that fragment completes.
        let mut fragment_answered = false;

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.recv_shutdown() => break,
                event = lines.next_event(prompt_idle) => event?,
            };

            match event {
                ReadEvent::Stalled(fragment) => {
                    tracing::debug!(%origin, fragment = %fragment.text, "output stalled mid-line");
                    if !fragment_answered {
                        fragment_answered =
                            answer_prompt(&classifier, &responder, &fragment).await;
                    }
                }
                ReadEvent::Line(line) => {
                    responder.sink.on_line(&line);
                    if std::mem::take(&mut fragment_answered) {
                        continue;
                    }
                    answer_prompt(&classifier, &responder, &line).await;
                    // The merged listener has gone away only if it failed; nothing to hand on to.
                    let _ = tap.send(line.text).await;
                }
                ReadEvent::Closed => break,
            }
        }
        Ok(())
    }
}

/// Sends every response `line` calls for. Returns whether it was recognized as a prompt.
async fn answer_prompt<W>(
    classifier: &LineClassifier,
    responder: &Responder<W>,
    line: &OutputLine,
) -> bool
where
    W: AsyncWrite + Unpin + Send,
{
    let verdict = classifier.classify(&line.text);
    for response in verdict.responses() {
        responder.answer(line.origin, response).await;
    }
    verdict.is_prompt()
}

async fn listen_merged<S, W>(
    merged: S,
    classifier: Arc<LineClassifier>,
    responder: Responder<W>,
    mut shutdown: ShutdownReceiver,
) -> io::Result<()>
where
    S: Stream<Item = OutputLine>,
    W: AsyncWrite + Unpin + Send,
{
    tokio::pin!(merged);

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.recv_shutdown() => break,
            line = merged.next() => line,
        };
        let Some(line) = line else { break };

        if let Some(response) = classifier.explicit_affirmation(&line.text) {
            responder.answer(line.origin, response).await;
        }
    }
    Ok(())
}
