//! Accumulation of streamed chunks into the active reply.

use luau_forge_model::{FinishReason, StreamChunk};

/// Shown in place of the reply when a fresh send fails before any text
/// arrived.
pub const ERROR_NOTICE: &str = "Sorry, something went wrong. Please try again.";
/// Appended to a reply whose stream failed after some text arrived.
pub const ERROR_TRAILER: &str =
    "\n\n---\n*An error occurred while generating the response.*";
/// Appended to a reply whose continuation stream failed.
pub const CONTINUE_ERROR_TRAILER: &str =
    "\n\n---\n*An error occurred while trying to continue.*";

/// Tracks one stream while its chunks are appended to a reply.
///
/// The reply text itself lives in the transcript; the accumulator only
/// remembers what this particular stream contributed and how it ended.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    finish_reason: Option<FinishReason>,
    received: String,
    failed: bool,
}

impl StreamAccumulator {
    /// Appends the chunk text to `target` and records its finish reason.
    ///
    /// A chunk without a finish reason keeps the one seen before.
    pub fn push(&mut self, target: &mut String, chunk: StreamChunk) {
        target.push_str(&chunk.text);
        self.received.push_str(&chunk.text);
        if let Some(reason) = chunk.finish_reason {
            trace!("stream reported finish reason {reason}");
            self.finish_reason = Some(reason);
        }
    }

    /// Marks the stream as broken and writes the error note into `target`.
    ///
    /// An empty `target` is replaced by [`ERROR_NOTICE`]; otherwise
    /// `trailer` is appended so the partial text stays visible.
    pub fn fail(&mut self, target: &mut String, trailer: &str) {
        self.failed = true;
        if target.is_empty() {
            target.push_str(ERROR_NOTICE);
        } else {
            target.push_str(trailer);
        }
    }

    /// Returns whether this stream has appended any text so far.
    #[inline]
    pub fn has_received_text(&self) -> bool {
        !self.received.is_empty()
    }

    /// Consumes the accumulator after the stream ended.
    pub fn finish(self) -> StreamOutcome {
        StreamOutcome {
            finish_reason: self.finish_reason,
            failed: self.failed,
            received: self.received,
        }
    }
}

/// How a stream ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamOutcome {
    /// The last finish reason reported by the stream.
    pub finish_reason: Option<FinishReason>,
    /// Whether the stream broke with a transport error.
    pub failed: bool,
    /// Text appended by this stream alone, without error notes.
    pub received: String,
}

impl StreamOutcome {
    /// A stream is clean only if it did not fail and ended with `STOP`.
    /// Running out of chunks without any finish reason is an interruption.
    #[inline]
    pub fn is_clean(&self) -> bool {
        !self.failed
            && self
                .finish_reason
                .as_ref()
                .is_some_and(FinishReason::is_stop)
    }
}
