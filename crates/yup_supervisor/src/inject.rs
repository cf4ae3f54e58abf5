//! Writing answers to the tool's standard input.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::ChildStdin;
use tokio::sync::Mutex;

const LINE_TERMINATOR: &str = "\n";

#[derive(Debug, Error)]
pub enum InjectionError {
    /// The input channel was already closed; the tool has exited.
    #[error("tool input is closed")]
    Closed,
    #[error("failed to write to tool input: {0}")]
    Io(#[from] io::Error),
}

/// Shared handle to the tool's standard input.
///
/// Any number of listeners may hold a clone and [send](Self::send) concurrently. Writes are
/// serialized, so each response lands as a whole line. Once [close](Self::close) has run, every
/// later `send` fails with [InjectionError::Closed].
pub struct ResponseInjector<W = ChildStdin> {
    input: Arc<Mutex<Option<W>>>,
}

impl<W> Clone for ResponseInjector<W> {
    fn clone(&self) -> Self {
        Self {
            input: Arc::clone(&self.input),
        }
    }
}

impl<W> ResponseInjector<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: W) -> Self {
        Self {
            input: Arc::new(Mutex::new(Some(input))),
        }
    }

    /// An injector whose input is already closed, for children spawned without piped stdin.
    pub fn closed() -> Self {
        Self {
            input: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn send(&self, response: &str) -> Result<(), InjectionError> {
        let mut input = self.input.lock().await;
        let input = input.as_mut().ok_or(InjectionError::Closed)?;

        let mut line = String::with_capacity(response.len() + LINE_TERMINATOR.len());
        line.push_str(response);
        line.push_str(LINE_TERMINATOR);

        input.write_all(line.as_bytes()).await?;
        input.flush().await?;
        Ok(())
    }

    /// Closes the input channel. Returns `false` if it was already closed.
    pub async fn close(&self) -> bool {
        let taken = self.input.lock().await.take();
        match taken {
            Some(mut input) => {
                if let Err(error) = input.shutdown().await {
                    // The tool is gone; nothing reads from the other end anymore.
                    tracing::trace!(?error, "shutting down tool input failed");
                }
                true
            }
            None => false,
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.input.lock().await.is_none()
    }
}
