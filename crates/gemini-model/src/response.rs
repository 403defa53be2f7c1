use std::pin::Pin;
use std::task::{Context, Poll, ready};

use luau_forge_model::{ErrorKind, FinishReason, ModelResponse, StreamChunk};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Sse;
use crate::proto::GenerateContentChunk;

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextChunk = Result<(Option<StreamChunk>, Sse), Error>;

pin_project! {
    pub struct GeminiResponse {
        next_chunk_fut: Option<PinnedFuture<NextChunk>>,
    }
}

impl GeminiResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        Self {
            next_chunk_fut: Some(Box::pin(next_chunk(sse))),
        }
    }
}

impl ModelResponse for GeminiResponse {
    type Error = crate::Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<StreamChunk>, Self::Error>> {
        let this = self.project();
        let Some(next_chunk_fut) = this.next_chunk_fut else {
            return Poll::Ready(Ok(None));
        };
        let (chunk, sse) = match ready!(next_chunk_fut.as_mut().poll(cx)) {
            Ok((Some(chunk), sse)) => (chunk, sse),
            Ok((None, _)) => {
                *this.next_chunk_fut = None;
                return Poll::Ready(Ok(None));
            }
            Err(err) => {
                *this.next_chunk_fut = None;
                return Poll::Ready(Err(err));
            }
        };

        // The stream may still have more data to pull, create a new future
        // for the next chunk.
        *this.next_chunk_fut = Some(Box::pin(next_chunk(sse)));

        Poll::Ready(Ok(Some(chunk)))
    }
}

async fn next_chunk(mut sse: Sse) -> NextChunk {
    loop {
        let sse_event = match sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => return Ok((None, sse)),
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");

        let chunk = serde_json::from_str::<GenerateContentChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;

        if chunk.candidates.is_empty() {
            if let Some(reason) = chunk
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.block_reason.as_deref())
            {
                return Err(Error::new(
                    format!("prompt blocked: {reason}"),
                    ErrorKind::Moderated,
                ));
            }
        }

        let text = chunk.text();
        let finish_reason = chunk.finish_reason().map(FinishReason::new);
        // Usage-only events carry nothing the caller cares about.
        if text.is_empty() && finish_reason.is_none() {
            continue;
        }
        return Ok((
            Some(StreamChunk {
                text,
                finish_reason,
            }),
            sse,
        ));
    }
}
