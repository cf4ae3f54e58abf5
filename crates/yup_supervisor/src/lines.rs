//! Decoding a child pipe into [OutputLine]s.

use std::future::pending;
use std::time::Duration;

use tokio::io::{self, AsyncBufReadExt, AsyncRead, BufReader};

use crate::output::{Origin, OutputLine};

#[derive(Debug, PartialEq, Eq)]
pub enum ReadEvent {
    /// A complete line, terminator stripped.
    Line(OutputLine),
    /// An unterminated fragment that has seen no new bytes for the idle period. Reported again
    /// only once it has grown; the same bytes later arrive again as part of a [ReadEvent::Line].
    Stalled(OutputLine),
    /// End of stream. Any trailing unterminated fragment was already yielded as a line.
    Closed,
}

pub struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    origin: Origin,
    /// Length of `buf` when it was last reported stalled.
    stalled_len: usize,
}

enum Chunk {
    /// Bytes up to and including a newline.
    Terminated(usize),
    /// Bytes with no newline among them.
    Partial(usize),
    Eof,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(pipe: R, origin: Origin) -> Self {
        Self {
            reader: BufReader::new(pipe),
            buf: Vec::new(),
            origin,
            stalled_len: 0,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Reads the next complete line, or [None] at end of stream.
    pub async fn next_line(&mut self) -> io::Result<Option<OutputLine>> {
        loop {
            match self.next_event(None).await? {
                ReadEvent::Line(line) => return Ok(Some(line)),
                ReadEvent::Closed => return Ok(None),
                // Never produced without an idle period.
                ReadEvent::Stalled(_) => continue,
            }
        }
    }

    /// Reads the next event. With `stall_after` set, an unterminated fragment that has seen no
    /// new bytes for that long is reported as [ReadEvent::Stalled]. The idle period restarts with
    /// every chunk received, and a fragment that grows after being reported can stall again.
    pub async fn next_event(&mut self, stall_after: Option<Duration>) -> io::Result<ReadEvent> {
        loop {
            let armed = stall_after.filter(|_| self.buf.len() > self.stalled_len);
            let idle = async move {
                match armed {
                    Some(period) => tokio::time::sleep(period).await,
                    None => pending().await,
                }
            };

            // `fill_buf` is cancel safe: losing the race against the idle timer consumes nothing.
            let read = tokio::select! {
                available = self.reader.fill_buf() => {
                    let available = available?;
                    let chunk = match available.iter().position(|&b| b == b'\n') {
                        Some(end) => Chunk::Terminated(end + 1),
                        None if available.is_empty() => Chunk::Eof,
                        None => Chunk::Partial(available.len()),
                    };
                    let len = match chunk {
                        Chunk::Terminated(len) | Chunk::Partial(len) => len,
                        Chunk::Eof => 0,
                    };
                    self.buf.extend_from_slice(&available[..len]);
                    Some(chunk)
                }
                _ = idle => None,
            };

            match read {
                Some(Chunk::Eof) if self.buf.is_empty() => return Ok(ReadEvent::Closed),
                Some(Chunk::Partial(len)) => {
                    self.reader.consume(len);
                    continue;
                }
                Some(chunk) => {
                    // Either a full line, or the unterminated tail right before end of stream.
                    if let Chunk::Terminated(len) = chunk {
                        self.reader.consume(len);
                    }
                    self.stalled_len = 0;
                    let raw = std::mem::take(&mut self.buf);
                    return Ok(ReadEvent::Line(self.decode(raw)));
                }
                None => {
                    self.stalled_len = self.buf.len();
                    let fragment = self.decode(self.buf.clone());
                    return Ok(ReadEvent::Stalled(fragment));
                }
            }
        }
    }

    fn decode(&self, mut raw: Vec<u8>) -> OutputLine {
        if raw.last() == Some(&b'\n') {
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
        }
        let text = match String::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => {
                tracing::trace!(
                    origin = %self.origin,
                    error = %e.utf8_error(),
                    "tool output is not valid UTF-8, decoding lossily"
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        OutputLine::new(text, self.origin)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;

    use super::{LineReader, ReadEvent};
    use crate::output::{Origin, OutputLine};

    #[tokio::test]
    async fn splits_and_normalizes_terminators() {
        let input: &[u8] = b"first\r\nsecond\n\nlast without newline";
        let mut reader = LineReader::new(input, Origin::Stdout);

        let mut lines = vec![];
        while let Some(line) = reader.next_line().await.unwrap() {
            lines.push(line.text);
        }
        assert_eq!(lines, ["first", "second", "", "last without newline"]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_fatal() {
        let input: &[u8] = b"ok\n\xff\xfe broken\nafter\n";
        let mut reader = LineReader::new(input, Origin::Stderr);

        assert_eq!(
            reader.next_line().await.unwrap(),
            Some(OutputLine::stderr("ok"))
        );
        let broken = reader.next_line().await.unwrap().unwrap();
        assert!(broken.text.contains('\u{FFFD}'));
        assert!(broken.text.ends_with(" broken"));
        assert_eq!(
            reader.next_line().await.unwrap(),
            Some(OutputLine::stderr("after"))
        );
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stalled_fragment_reported_once() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = LineReader::new(rx, Origin::Stdout);
        let stall = Some(Duration::from_millis(20));

        tx.write_all(b"Proceed? [y/N] ").await.unwrap();
        assert_eq!(
            reader.next_event(stall).await.unwrap(),
            ReadEvent::Stalled(OutputLine::stdout("Proceed? [y/N] "))
        );

        tx.write_all(b"y\n").await.unwrap();
        assert_eq!(
            reader.next_event(stall).await.unwrap(),
            ReadEvent::Line(OutputLine::stdout("Proceed? [y/N] y"))
        );

        drop(tx);
        assert_eq!(reader.next_event(stall).await.unwrap(), ReadEvent::Closed);
    }

    #[tokio::test]
    async fn grown_fragment_stalls_again() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = LineReader::new(rx, Origin::Stdout);
        let stall = Some(Duration::from_millis(20));

        tx.write_all(b"Checking assets... ").await.unwrap();
        assert_eq!(
            reader.next_event(stall).await.unwrap(),
            ReadEvent::Stalled(OutputLine::stdout("Checking assets... "))
        );

        tx.write_all(b"Proceed? [y/N] ").await.unwrap();
        assert_eq!(
            reader.next_event(stall).await.unwrap(),
            ReadEvent::Stalled(OutputLine::stdout("Checking assets... Proceed? [y/N] "))
        );

        tx.write_all(b"y\n").await.unwrap();
        assert_eq!(
            reader.next_event(stall).await.unwrap(),
            ReadEvent::Line(OutputLine::stdout("Checking assets... Proceed? [y/N] y"))
        );
    }

    #[tokio::test]
    async fn idle_period_restarts_with_each_chunk() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = LineReader::new(rx, Origin::Stdout);

        let writer = tokio::spawn(async move {
            for piece in ["Pro", "ceed", "? [y/N] "] {
                tx.write_all(piece.as_bytes()).await.unwrap();
                tokio::time::sleep(Duration::from_millis(60)).await;
            }
            tx
        });

        assert_eq!(
            reader
                .next_event(Some(Duration::from_millis(100)))
                .await
                .unwrap(),
            ReadEvent::Stalled(OutputLine::stdout("Proceed? [y/N] "))
        );
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn idle_without_fragment_is_not_a_stall() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = LineReader::new(rx, Origin::Stdout);

        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.write_all(b"done\n").await.unwrap();
        });

        assert_eq!(
            reader
                .next_event(Some(Duration::from_millis(5)))
                .await
                .unwrap(),
            ReadEvent::Line(OutputLine::stdout("done"))
        );
        writer.await.unwrap();
    }
}
