//! Merging the stdout and stderr line sequences of a child into one.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Fuse, Stream, StreamExt};
use pin_project_lite::pin_project;

use crate::output::{Origin, OutputLine};

pin_project! {
    /// Lines from two sources, yielded in the order they become available.
    ///
    /// Each source line is yielded exactly once. Nothing is buffered beyond the line currently
    /// being handed out, and the two sources are polled alternately first so a busy source cannot
    /// starve the other. Dropping a [Multiplexed] drops both sources.
    #[must_use = "streams do nothing unless polled"]
    pub struct Multiplexed<O, E> {
        #[pin]
        stdout: Fuse<O>,
        #[pin]
        stderr: Fuse<E>,
        stdout_first: bool,
    }
}

pub fn multiplex<O, E>(stdout: O, stderr: E) -> Multiplexed<O, E>
where
    O: Stream<Item = String>,
    E: Stream<Item = String>,
{
    Multiplexed {
        stdout: stdout.fuse(),
        stderr: stderr.fuse(),
        stdout_first: true,
    }
}

impl<O, E> Stream for Multiplexed<O, E>
where
    O: Stream<Item = String>,
    E: Stream<Item = String>,
{
    type Item = OutputLine;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<OutputLine>> {
        let mut this = self.project();

        let stdout_first = *this.stdout_first;
        *this.stdout_first = !stdout_first;

        let order = if stdout_first {
            [Origin::Stdout, Origin::Stderr]
        } else {
            [Origin::Stderr, Origin::Stdout]
        };

        let mut all_done = true;
        for origin in order {
            let polled = match origin {
                Origin::Stdout => this.stdout.as_mut().poll_next(cx),
                Origin::Stderr => this.stderr.as_mut().poll_next(cx),
            };
            match polled {
                Poll::Ready(Some(text)) => return Poll::Ready(Some(OutputLine::new(text, origin))),
                Poll::Ready(None) => {}
                Poll::Pending => all_done = false,
            }
        }

        if all_done {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (out_lo, out_hi) = self.stdout.size_hint();
        let (err_lo, err_hi) = self.stderr.size_hint();
        let hi = match (out_hi, err_hi) {
            (Some(a), Some(b)) => a.checked_add(b),
            _ => None,
        };
        (out_lo.saturating_add(err_lo), hi)
    }
}

/// Adapts a channel receiver into a [Stream], closing the receiver when the stream is dropped.
pub fn receiver_stream<T>(
    mut rx: tokio::sync::mpsc::Receiver<T>,
) -> impl Stream<Item = T> + Unpin {
    futures::stream::poll_fn(move |cx| rx.poll_recv(cx))
}
