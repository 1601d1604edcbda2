//! Model stream decoding.
//!
//! - `decoder` - blank-line delimited event framing over text or byte chunks
//! - `payload` - interpretation of one event payload (delta, message or error)

mod decoder;
mod payload;

pub use decoder::{decode_events, read_chunks, FrameDecoder};
pub use payload::decode_payload;

use futures::{Stream, StreamExt};

use crate::error::AppError;

/// Maps a stream of raw payloads to the text pieces they carry.
///
/// Payloads without text are dropped. The first error (transport or an error
/// field in a payload) is yielded and ends the stream.
pub fn text_deltas<S>(payloads: S) -> impl Stream<Item = Result<String, AppError>>
where
    S: Stream<Item = Result<String, AppError>>,
{
    async_stream::try_stream! {
        futures::pin_mut!(payloads);
        while let Some(payload) = payloads.next().await {
            let payload = payload?;
            if let Some(text) = decode_payload(&payload)? {
                yield text;
            }
        }
    }
}
