use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Splits an incrementally received byte body into newline-terminated JSON
/// records.
///
/// Text after the last `\n` is held until more bytes arrive. Whatever is still
/// held when the body ends is dropped, not flushed.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: String,
    // Trailing bytes of a UTF-8 sequence cut by a chunk boundary.
    partial_utf8: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the records it completed, in order.
    /// Records that are not valid JSON are logged and skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.decode_text(chunk);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let remainder = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, remainder);

        complete.split('\n').filter_map(parse_record).collect()
    }

    /// Text held back because no newline has followed it yet.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    fn decode_text(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.partial_utf8);
        bytes.extend_from_slice(chunk);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    // from_utf8 already validated this prefix.
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[invalid..];
                        }
                        None => {
                            self.partial_utf8 = tail.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn parse_record(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str(line) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, record = line, "skipping malformed stream record");
            None
        }
    }
}

/// Turns a response body into a lazy stream of JSON records.
///
/// The body is owned by the returned stream and dropped as soon as the stream
/// finishes, errors, or is itself dropped. A body error is yielded once and
/// ends the stream.
pub fn decode_records<S, E>(body: S) -> impl Stream<Item = Result<Value, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    let state = DecodeState {
        body,
        decoder: LineDecoder::new(),
        ready: VecDeque::new(),
    };

    futures::stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            if let Some(record) = state.ready.pop_front() {
                return Some((Ok(record), Some(state)));
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let records = state.decoder.push(&chunk);
                    state.ready.extend(records);
                }
                Some(Err(err)) => return Some((Err(err), None)),
                None => {
                    let dropped = state.decoder.pending().trim();
                    if !dropped.is_empty() {
                        debug!(bytes = dropped.len(), "discarding unterminated trailing record");
                    }
                    return None;
                }
            }
        }
    })
}

struct DecodeState<S> {
    body: S,
    decoder: LineDecoder,
    ready: VecDeque<Value>,
}
