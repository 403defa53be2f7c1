use luau_forge_model::{FinishReason, StreamChunk};
use serde::{Deserialize, Serialize};

/// The preset response for an assistant step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Chunks in this response, delivered in order.
    pub chunks: Vec<StreamChunk>,
    /// If set, the stream breaks with a transport error after delivering
    /// this many chunks. `Some(0)` fails before the first chunk.
    pub fail_after: Option<usize>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified chunks.
    #[inline]
    pub fn with_chunks(chunks: impl Into<Vec<StreamChunk>>) -> Self {
        Self {
            chunks: chunks.into(),
            fail_after: None,
        }
    }

    /// Creates a response that streams `texts` and ends with `reason`
    /// attached to the last chunk. `None` leaves the stream without any
    /// finish reason.
    pub fn with_texts<I, S>(texts: I, reason: Option<FinishReason>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chunks: Vec<_> =
            texts.into_iter().map(StreamChunk::text).collect();
        if let Some(reason) = reason {
            match chunks.last_mut() {
                Some(last) => last.finish_reason = Some(reason),
                None => chunks
                    .push(StreamChunk::default().with_finish_reason(reason)),
            }
        }
        Self::with_chunks(chunks)
    }

    /// Creates a response that streams `texts` and finishes cleanly.
    #[inline]
    pub fn completed<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_texts(texts, Some(FinishReason::stop()))
    }

    /// Breaks the stream after `count` chunks.
    #[inline]
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }
}
