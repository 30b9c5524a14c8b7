//! Console publisher: one payload per line.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use super::Publisher;
use crate::error::PublishError;

/// Writes each payload followed by a newline to `W`.
///
/// Topic and key are not written; the output is the payload stream itself.
#[derive(Debug)]
pub struct LinePublisher<W = Stdout> {
    out: Mutex<W>,
}

/// [`LinePublisher`] on the process stdout.
pub type StdoutPublisher = LinePublisher<Stdout>;

impl LinePublisher<Stdout> {
    /// Publisher writing to stdout.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> LinePublisher<W> {
    /// Publisher writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> Publisher for LinePublisher<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn publish(&self, _topic: &str, _key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let mut out = self.out.lock().await;
        let io = |e: std::io::Error| PublishError::Transport(e.to_string());
        out.write_all(payload).await.map_err(io)?;
        out.write_all(b"\n").await.map_err(io)?;
        out.flush().await.map_err(io)
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_one_line_per_payload() {
        let p = LinePublisher::new(Vec::<u8>::new());
        p.publish("raw-tweets", "nyc", br#"{"id":1}"#).await.unwrap();
        p.publish("raw-tweets", "nyc", br#"{"id":2}"#).await.unwrap();

        assert_eq!(p.into_inner(), b"{\"id\":1}\n{\"id\":2}\n");
    }
}
