//! Incremental decoding of streamed generation responses.
//!
//! `streamGenerateContent` answers with a sequence of JSON objects. Depending
//! on the request it is framed as a JSON array, one object per line, or as
//! server-sent events:
//! ```text
//! [{"candidates": [...]}
//! ,{"candidates": [...]}
//! ]
//!
//! data: {"candidates": [...]}
//! ```
//! Network chunks do not line up with object boundaries, so bytes are fed
//! through a [`JsonObjectFramer`] which only yields complete top-level
//! objects. Brackets, commas, whitespace and SSE field lines between objects
//! are skipped; any other text there fails the stream.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, Stream, StreamExt};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::client::ClientError;
use crate::decode::{decode_json_bytes, decode_message};
use crate::http::ByteStream;
use crate::model::GenerateContentResponse;

/// Splits a byte stream into complete top-level JSON objects.
///
/// Scanning works on raw bytes: UTF-8 continuation bytes never collide with
/// the ASCII structural characters, so a chunk may end anywhere, including
/// inside a multi-byte character.
///
/// Between objects only whitespace, `[`, `,`, `]` and SSE field lines are
/// accepted. Anything else is reported as a decode error carrying the
/// offending text.
#[derive(Debug, Default)]
pub struct JsonObjectFramer {
    buffer: Vec<u8>,
    stray: Vec<u8>,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

const SSE_FIELDS: [&str; 3] = ["event:", "id:", "retry:"];

impl JsonObjectFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every object it completes, in order.
    ///
    /// Scanning stops at the first unexpected text between objects, which is
    /// returned as the last entry.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Vec<u8>, ClientError>> {
        let mut frames = Vec::new();

        for &byte in chunk {
            if self.depth == 0 {
                let checked = match byte {
                    b'{' => self.take_stray(true).map(|()| {
                        self.buffer.clear();
                        self.buffer.push(byte);
                        self.depth = 1;
                    }),
                    b'\n' | b'\r' => self.take_stray(false),
                    b'[' | b',' | b']' if self.stray.is_empty() => Ok(()),
                    _ if byte.is_ascii_whitespace() && self.stray.is_empty() => Ok(()),
                    _ => {
                        self.stray.push(byte);
                        Ok(())
                    }
                };
                if let Err(e) = checked {
                    frames.push(Err(e));
                    return frames;
                }
                continue;
            }

            self.buffer.push(byte);

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        frames.push(Ok(std::mem::take(&mut self.buffer)));
                    }
                }
                _ => {}
            }
        }

        frames
    }

    /// True when nothing is partially buffered.
    pub fn is_idle(&self) -> bool {
        self.depth == 0 && self.stray.is_empty()
    }

    /// Signal end of input. A partially received object, or trailing text
    /// that is not framing, is a decode error.
    pub fn finish(&mut self) -> Result<(), ClientError> {
        if self.depth == 0 {
            return self.take_stray(false);
        }
        let partial = std::mem::take(&mut self.buffer);
        *self = Self::default();
        decode_json_bytes::<IgnoredAny>(&partial).map(|_| ())
    }

    /// Check the text collected since the last object or line break.
    ///
    /// Right before an object only an SSE `data:` prefix may precede it. At a
    /// line break any SSE field or comment line is accepted.
    fn take_stray(&mut self, before_object: bool) -> Result<(), ClientError> {
        let stray = std::mem::take(&mut self.stray);
        let text = String::from_utf8_lossy(&stray);
        let field = text.trim();

        let accepted = field.is_empty()
            || field == "data:"
            || (!before_object
                && (field.starts_with(':')
                    || SSE_FIELDS.iter().any(|name| field.starts_with(name))));
        if accepted {
            return Ok(());
        }

        // Stray text never contains `{`, so it cannot parse as an object.
        match decode_json_bytes::<Map<String, Value>>(&stray) {
            Err(e) => Err(e),
            Ok(_) => Err(ClientError::unexpected(format!(
                "Unexpected text in streamed response: {text}"
            ))),
        }
    }
}

type BoxedItems<T> = Pin<Box<dyn Stream<Item = Result<T, ClientError>> + Send>>;

/// Ordered, cancellable stream of messages decoded from a streamed body.
///
/// The stream ends after the transport signals end-of-body, after the first
/// error (which is yielded as the last item), or once cancelled.
pub struct JsonStream<T> {
    inner: BoxedItems<T>,
    cancel: CancellationToken,
}

/// Stream of `streamGenerateContent` chunks.
pub type GenerateStream = JsonStream<GenerateContentResponse>;

struct DecodeState<T> {
    body: ByteStream,
    framer: JsonObjectFramer,
    pending: VecDeque<Result<Vec<u8>, ClientError>>,
    cancel: CancellationToken,
    done: bool,
    _message: PhantomData<fn() -> T>,
}

impl<T> JsonStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Decode `body` as a sequence of JSON objects.
    pub fn new(body: ByteStream, cancel: CancellationToken) -> Self {
        let state: DecodeState<T> = DecodeState {
            body,
            framer: JsonObjectFramer::new(),
            pending: VecDeque::new(),
            cancel: cancel.clone(),
            done: false,
            _message: PhantomData,
        };

        let inner = stream::unfold(state, |mut state| async move {
            loop {
                if state.cancel.is_cancelled() {
                    tracing::warn!("Gemini stream cancelled");
                    return None;
                }

                if let Some(frame) = state.pending.pop_front() {
                    let decoded = frame.and_then(|message| {
                        tracing::trace!("Decoding streamed message ({} bytes)", message.len());
                        decode_message::<T>(&message)
                    });
                    if decoded.is_err() {
                        state.done = true;
                        state.pending.clear();
                    }
                    return Some((decoded, state));
                }

                if state.done {
                    return None;
                }

                let next = tokio::select! {
                    _ = state.cancel.cancelled() => continue,
                    next = state.body.next() => next,
                };

                match next {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.framer.push(&chunk));
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((Err(e), state));
                    }
                    None => {
                        state.done = true;
                        if let Err(e) = state.framer.finish() {
                            return Some((Err(e), state));
                        }
                    }
                }
            }
        });

        Self {
            inner: inner.boxed(),
            cancel,
        }
    }

    /// A stream whose only item is `error`.
    pub fn failed(error: ClientError, cancel: CancellationToken) -> Self {
        Self {
            inner: stream::once(async move { Err(error) }).boxed(),
            cancel,
        }
    }

    /// Deliver every message to `sink` in arrival order.
    ///
    /// Resolves once the stream ends, or with the first error.
    pub async fn for_each_message<F>(mut self, mut sink: F) -> Result<(), ClientError>
    where
        F: FnMut(T),
    {
        while let Some(message) = self.next().await {
            sink(message?);
        }
        Ok(())
    }
}

impl<T> JsonStream<T> {
    /// Stop reading. No further items are delivered; the body, and with it the
    /// connection, is dropped on the next poll.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<T> Stream for JsonStream<T> {
    type Item = Result<T, ClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<T> std::fmt::Debug for JsonStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
