//! Streaming delta contracts and in-memory stream utilities.
//!
//! ```rust
//! use pprovider::{BoxedDeltaStream, StreamDelta, VecDeltaStream};
//!
//! let stream = VecDeltaStream::new(vec![Ok(StreamDelta::text("hello"))]);
//! let _boxed: BoxedDeltaStream = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::{FinishReason, VendorError};

/// One incremental fragment of a streamed response.
///
/// Constructors keep the invariant `is_final == finish.is_some()`; a stream
/// terminates at its first final delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDelta {
    pub text: String,
    pub is_final: bool,
    pub finish: Option<FinishReason>,
}

impl StreamDelta {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            finish: None,
        }
    }

    pub fn finish(reason: FinishReason) -> Self {
        Self {
            text: String::new(),
            is_final: true,
            finish: Some(reason),
        }
    }

    pub fn finish_with_text(text: impl Into<String>, reason: FinishReason) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            finish: Some(reason),
        }
    }
}

/// Delta stream contract.
///
/// Invariants for consumers:
/// - Deltas are emitted in the order the vendor produced them.
/// - Non-final deltas may appear zero or more times.
/// - At most one final delta appears and, when present, it is the last item.
/// - An `Err` item is terminal; deltas already yielded stay delivered.
/// - Once the stream yields `None`, it must not yield additional items.
pub trait ChatDeltaStream: Stream<Item = Result<StreamDelta, VendorError>> + Send {}

impl<T> ChatDeltaStream for T where T: Stream<Item = Result<StreamDelta, VendorError>> + Send {}

pub type BoxedDeltaStream = Pin<Box<dyn ChatDeltaStream + 'static>>;

#[derive(Debug)]
pub struct VecDeltaStream {
    deltas: VecDeque<Result<StreamDelta, VendorError>>,
}

impl VecDeltaStream {
    pub fn new(deltas: Vec<Result<StreamDelta, VendorError>>) -> Self {
        Self {
            deltas: deltas.into(),
        }
    }
}

impl Stream for VecDeltaStream {
    type Item = Result<StreamDelta, VendorError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<StreamDelta, VendorError>>> {
        Poll::Ready(self.deltas.pop_front())
    }
}
