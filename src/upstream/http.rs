//! # HTTP filter-stream client.
//!
//! Opens one long-lived `POST` per region:
//!
//! ```text
//! POST {endpoint}
//! Authorization: Bearer <token>
//! Content-Type: application/x-www-form-urlencoded
//!
//! locations=<west,south,east,north>&stall_warnings=true
//! ```
//!
//! The response body is read as newline-delimited JSON and framed into
//! [`StreamMessage`]s by [`frame_lines`]. Dropping the returned stream closes
//! the connection.

use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tracing::debug;

use super::{StreamMessage, Subscription, Upstream};
use crate::error::SubscriptionError;
use crate::regions::Region;

/// Longest response body kept in a [`SubscriptionError::Rejected`].
const MAX_ERROR_BODY: usize = 512;

/// Longest stream line accepted before the subscription fails.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Upstream client speaking the filter-stream HTTP protocol.
#[derive(Clone, Debug)]
pub struct HttpUpstream {
    client: reqwest::Client,
    endpoint: String,
    bearer: String,
}

impl HttpUpstream {
    /// Creates a client for `endpoint` authenticated with `bearer`.
    pub fn new(
        endpoint: impl Into<String>,
        bearer: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            bearer: bearer.into(),
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn open(&self, region: &Region) -> Result<Subscription, SubscriptionError> {
        let locations = region.bbox.filter();
        debug!(region = %region.id, %locations, "opening filter stream");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.bearer)
            .form(&[("locations", locations.as_str()), ("stall_warnings", "true")])
            .send()
            .await
            .map_err(|e| SubscriptionError::Connect(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SubscriptionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(frame_lines(resp.bytes_stream()).boxed())
    }
}

struct LineReader<S> {
    inner: Pin<Box<S>>,
    buf: Vec<u8>,
    // bytes of `buf` already known to hold no newline
    scanned: usize,
    done: bool,
}

/// Splits a chunked byte stream into classified lines.
///
/// A transport error is yielded once and ends the stream. A trailing line
/// without a newline is classified when the body ends. A line longer than
/// [`MAX_LINE_BYTES`] yields [`SubscriptionError::Decode`] and ends the stream.
pub fn frame_lines<S, B, E>(
    chunks: S,
) -> impl Stream<Item = Result<StreamMessage, SubscriptionError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let reader = LineReader {
        inner: Box::pin(chunks),
        buf: Vec::new(),
        scanned: 0,
        done: false,
    };

    futures::stream::unfold(reader, |mut r| async move {
        loop {
            if let Some(off) = r.buf[r.scanned..].iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = r.buf.drain(..=r.scanned + off).collect();
                r.scanned = 0;
                return Some((StreamMessage::from_line(&line), r));
            }
            r.scanned = r.buf.len();
            if r.buf.len() > MAX_LINE_BYTES {
                r.done = true;
                r.buf.clear();
                r.scanned = 0;
                let err = SubscriptionError::Decode(format!("line exceeds {MAX_LINE_BYTES} bytes"));
                return Some((Err(err), r));
            }
            if r.done {
                if r.buf.is_empty() {
                    return None;
                }
                let line = std::mem::take(&mut r.buf);
                r.scanned = 0;
                return Some((StreamMessage::from_line(&line), r));
            }
            match r.inner.next().await {
                Some(Ok(chunk)) => r.buf.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    r.done = true;
                    r.buf.clear();
                    r.scanned = 0;
                    return Some((Err(SubscriptionError::Transport(e.to_string())), r));
                }
                None => r.done = true,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::ControlMessage;

    fn chunks(parts: &[&str]) -> Vec<Result<Vec<u8>, String>> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    #[tokio::test]
    async fn lines_split_across_chunks_are_reassembled() {
        let input = chunks(&["{\"id_str\":\"1\",\"te", "xt\":\"a\"}\r\n\r\n{\"id_str\":\"2\"}"]);
        let out: Vec<_> = frame_lines(futures::stream::iter(input)).collect().await;

        assert_eq!(out.len(), 3);
        assert!(matches!(&out[0], Ok(StreamMessage::Post(p)) if p.id() == Some("1")));
        assert_eq!(
            out[1].as_ref().ok(),
            Some(&StreamMessage::Control(ControlMessage::KeepAlive))
        );
        assert!(matches!(&out[2], Ok(StreamMessage::Post(p)) if p.id() == Some("2")));
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let input: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"{\"id_str\":\"1\"}\n{\"id_s".to_vec()),
            Err("connection reset".into()),
            Ok(b"tr\":\"2\"}\n".to_vec()),
        ];
        let out: Vec<_> = frame_lines(futures::stream::iter(input)).collect().await;

        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(matches!(&out[1], Err(SubscriptionError::Transport(m)) if m == "connection reset"));
    }

    #[tokio::test]
    async fn overlong_line_fails_with_decode_error() {
        let chunk = vec![b'x'; MAX_LINE_BYTES / 4];
        let input: Vec<Result<Vec<u8>, String>> = std::iter::repeat(chunk)
            .take(5)
            .map(Ok)
            .chain(std::iter::once(Ok(b"\n{\"id_str\":\"9\"}\n".to_vec())))
            .collect();
        let out: Vec<_> = frame_lines(futures::stream::iter(input)).collect().await;

        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Err(SubscriptionError::Decode(m)) if m.contains("exceeds")));
    }

    #[tokio::test]
    async fn many_small_chunks_frame_one_line() {
        let mut parts: Vec<Result<Vec<u8>, String>> =
            br#"{"id_str":"77","text":"slow"}"#.iter().map(|b| Ok(vec![*b])).collect();
        parts.push(Ok(b"\n".to_vec()));
        let out: Vec<_> = frame_lines(futures::stream::iter(parts)).collect().await;

        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Ok(StreamMessage::Post(p)) if p.id() == Some("77")));
    }
}
