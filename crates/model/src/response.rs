use std::fmt::{self, Display, Formatter};
use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A streaming response from the model provider.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Attempts to pull out the next chunk from the response.
    ///
    /// # Return value
    ///
    /// - `Poll::Pending` means that this response is still waiting for
    ///   the next chunk. Implementations will ensure that the current
    ///   task will be notified when the next chunk may be ready.
    /// - `Poll::Ready(Ok(Some(chunk)))` means the response has a chunk
    ///   to deliver, and may produce further chunks on subsequent calls.
    /// - `Poll::Ready(Ok(None))` means the stream is exhausted.
    /// - `Poll::Ready(Err(error))` means the transport failed. No more
    ///   chunks will be produced after an error.
    ///
    /// Calling this method after exhaustion should always return `None`.
    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<StreamChunk>, Self::Error>>;
}

/// One incremental unit of a streamed reply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamChunk {
    /// The text fragment, possibly empty.
    pub text: String,
    /// Set when the model reports why it stopped generating.
    pub finish_reason: Option<FinishReason>,
}

impl StreamChunk {
    /// Creates a chunk carrying only text.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            finish_reason: None,
        }
    }

    /// Attaches a finish reason to the chunk.
    #[inline]
    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }
}

/// The terminal status code attached to a stream.
///
/// The code is kept verbatim since providers add new values over time.
/// Only [`FinishReason::STOP`] denotes a clean completion; every other
/// code means the reply was cut off.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinishReason(String);

impl FinishReason {
    /// The code of a clean completion.
    pub const STOP: &'static str = "STOP";

    /// Creates a finish reason from a raw code.
    #[inline]
    pub fn new<S: Into<String>>(code: S) -> Self {
        Self(code.into())
    }

    /// A clean completion.
    #[inline]
    pub fn stop() -> Self {
        Self::new(Self::STOP)
    }

    /// Returns the raw code.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the model finished its reply on its own.
    #[inline]
    pub fn is_stop(&self) -> bool {
        self.0 == Self::STOP
    }
}

impl Display for FinishReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
