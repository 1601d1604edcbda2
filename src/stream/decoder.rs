//! Incremental decoder for blank-line delimited event streams.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::StreamConfig;
use crate::error::AppError;

/// Splits an event stream into payloads, tolerating arbitrary chunk boundaries.
///
/// Events are separated by a blank line. Inside an event, every line that
/// starts with the data prefix contributes to the payload; several such lines
/// are joined with `\n`. Once the done sentinel is seen the decoder stops and
/// ignores any further input.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    prefix: String,
    sentinel: String,
    /// Text of the event currently being received.
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    done: bool,
}

impl FrameDecoder {
    /// Creates a decoder for the given payload prefix and done sentinel.
    pub fn new(prefix: impl Into<String>, sentinel: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sentinel: sentinel.into(),
            buffer: String::new(),
            pending: Vec::new(),
            done: false,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.data_prefix.clone(), config.done_sentinel.clone())
    }

    /// Whether the done sentinel has been received.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds a text chunk, returning every payload completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        if self.done {
            return Vec::new();
        }

        self.buffer.push_str(chunk);
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut payloads = Vec::new();
        while let Some(boundary) = self.buffer.find("\n\n") {
            let event: String = self.buffer.drain(..boundary + 2).collect();
            if self.accept(&event, &mut payloads) {
                break;
            }
        }
        payloads
    }

    /// Feeds a byte chunk; incomplete UTF-8 sequences wait for the next chunk.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid_len = err.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_len]));
                    match err.error_len() {
                        Some(bad_len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_len + bad_len);
                        }
                        None => {
                            // Sequence continues in the next chunk
                            self.pending.drain(..valid_len);
                            break;
                        }
                    }
                }
            }
        }

        self.push(&text)
    }

    /// Flushes a trailing event that was never closed by a blank line.
    pub fn finish(&mut self) -> Vec<String> {
        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            self.buffer.push_str(&rest);
        }

        let mut payloads = Vec::new();
        if self.done {
            return payloads;
        }

        let event = std::mem::take(&mut self.buffer).replace("\r\n", "\n");
        if !event.trim().is_empty() {
            self.accept(&event, &mut payloads);
        }
        payloads
    }

    /// Collects the payload of one event. Returns true when the stream ended.
    fn accept(&mut self, event: &str, payloads: &mut Vec<String>) -> bool {
        let Some(payload) = self.event_payload(event) else {
            return false;
        };

        if payload.trim() == self.sentinel {
            tracing::debug!("Received end-of-stream sentinel");
            self.done = true;
            self.buffer.clear();
            self.pending.clear();
            return true;
        }

        payloads.push(payload);
        false
    }

    fn event_payload(&self, event: &str) -> Option<String> {
        let lines: Vec<&str> = event
            .lines()
            .filter_map(|line| line.strip_prefix(self.prefix.as_str()))
            .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Decodes a chunked byte stream into event payloads.
///
/// The returned stream is lazy and finite: it ends after the done sentinel,
/// after the input ends, or after the first transport error.
pub fn decode_events<S>(chunks: S, config: &StreamConfig) -> impl Stream<Item = Result<String, AppError>>
where
    S: Stream<Item = std::io::Result<Bytes>>,
{
    let mut decoder = FrameDecoder::from_config(config);

    async_stream::try_stream! {
        futures::pin_mut!(chunks);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            for payload in decoder.push_bytes(&chunk) {
                yield payload;
            }
            if decoder.is_done() {
                return;
            }
        }
        for payload in decoder.finish() {
            yield payload;
        }
    }
}

/// Reads an async reader as a stream of byte chunks.
pub fn read_chunks<R>(mut reader: R, capacity: usize) -> impl Stream<Item = std::io::Result<Bytes>>
where
    R: AsyncRead + Unpin,
{
    async_stream::try_stream! {
        loop {
            let mut buf = BytesMut::with_capacity(capacity.max(1));
            let read = reader.read_buf(&mut buf).await?;
            if read == 0 {
                break;
            }
            yield buf.freeze();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn decoder() -> FrameDecoder {
        FrameDecoder::new("data:", "[DONE]")
    }

    const SAMPLE: &str = "data: {\"delta\":\"a\"}\n\ndata: {\"delta\":\"b\"}\n\ndata: [DONE]\n\n";

    #[test]
    fn test_single_chunk() {
        let mut dec = decoder();
        let payloads = dec.push(SAMPLE);
        assert_eq!(payloads, vec!["{\"delta\":\"a\"}", "{\"delta\":\"b\"}"]);
        assert!(dec.is_done());
    }

    #[test]
    fn test_every_chunk_boundary() {
        for split in 0..SAMPLE.len() {
            let mut dec = decoder();
            let mut payloads = dec.push(&SAMPLE[..split]);
            payloads.extend(dec.push(&SAMPLE[split..]));
            assert_eq!(payloads.len(), 2, "split at {}", split);
            assert!(dec.is_done());
        }
    }

    #[test]
    fn test_multiline_payload_joined() {
        let mut dec = decoder();
        let payloads = dec.push("data: first\ndata: second\n\n");
        assert_eq!(payloads, vec!["first\nsecond"]);
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let mut dec = decoder();
        let payloads = dec.push(": keep-alive\n\nevent: ping\nid: 3\ndata: x\n\n");
        assert_eq!(payloads, vec!["x"]);
    }

    #[test]
    fn test_done_stops_processing() {
        let mut dec = decoder();
        let payloads = dec.push("data: [DONE]\n\ndata: late\n\n");
        assert!(payloads.is_empty());
        assert!(dec.push("data: later\n\n").is_empty());
        assert!(dec.finish().is_empty());
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut dec = decoder();
        let mut payloads = dec.push("data: a\r");
        payloads.extend(dec.push("\n\r\n"));
        assert_eq!(payloads, vec!["a"]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let bytes = "data: héllo\n\n".as_bytes();
        // Split inside the two-byte 'é'
        let cut = "data: h".len() + 1;
        let mut dec = decoder();
        let mut payloads = dec.push_bytes(&bytes[..cut]);
        assert!(payloads.is_empty());
        payloads.extend(dec.push_bytes(&bytes[cut..]));
        assert_eq!(payloads, vec!["héllo"]);
    }

    #[test]
    fn test_finish_flushes_trailing_event() {
        let mut dec = decoder();
        assert!(dec.push("data: tail").is_empty());
        assert_eq!(dec.finish(), vec!["tail"]);
    }

    #[tokio::test]
    async fn test_decode_events_stream() {
        let chunks = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"data: one\n")),
            Ok(Bytes::from_static(b"\ndata: two\n\ndata: [DO")),
            Ok(Bytes::from_static(b"NE]\n\ndata: ignored\n\n")),
        ]);
        let payloads: Vec<String> = decode_events(chunks, &StreamConfig::default())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_decode_events_transport_error() {
        let chunks = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"data: two\n\n")),
        ]);
        let results: Vec<Result<String, AppError>> =
            decode_events(chunks, &StreamConfig::default()).collect().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), "one");
        assert!(matches!(results[1], Err(AppError::Transport(_))));
    }

    #[tokio::test]
    async fn test_read_chunks_from_reader() {
        let reader = std::io::Cursor::new(b"data: x\n\n".to_vec());
        let chunks: Vec<Bytes> = read_chunks(reader, 4).try_collect().await.unwrap();
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(joined, b"data: x\n\n");
        assert!(!chunks.is_empty());
    }
}
