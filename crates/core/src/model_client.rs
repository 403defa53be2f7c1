use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use luau_forge_model::{
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    StreamChunk,
};
use tracing::Instrument;

type SendRequestResult = Result<(), Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type ChunkFn = Box<dyn Fn(StreamChunk) + Send + 'static>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, ChunkFn) -> BoxedSendRequestFuture + Send + Sync
>;

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_chunk| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("sending {} messages", req.messages.len());
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_chunk).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and feeds every received chunk to `on_chunk`, in
    /// order. Resolves once the stream is exhausted or broken.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// chunks when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_chunk: impl Fn(StreamChunk) + Send + 'static,
    ) -> Result<(), Box<dyn ModelProviderError>> {
        (self.handler_fn)(req, Box::new(on_chunk)).await
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_chunk: ChunkFn,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("request failed: {err}");
            return Err(Box::new(err));
        }
    };

    trace!("start receiving chunks");

    let mut pinned_resp = pin!(resp);
    let mut count = 0usize;
    loop {
        let chunk_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_chunk(cx)).await;
        let chunk = match chunk_or_err {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(err) => {
                error!("stream broke after {count} chunks: {err}");
                return Err(Box::new(err));
            }
        };
        trace!("got a chunk: {chunk:?}");
        count += 1;
        on_chunk(chunk);
    }

    trace!("finished a request with {count} chunks");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use luau_forge_model::{ErrorKind, FinishReason, ModelMessage};
    use luau_forge_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            system_instruction: None,
            messages: vec![ModelMessage::user_text("Hi")],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        model_provider
            .add_turn(PresetResponse::completed(["How ", "are ", "you?"]));

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let received = Arc::new(Mutex::new(Vec::new()));
            model_client
                .send_request(request(), {
                    let received = Arc::clone(&received);
                    move |chunk| received.lock().unwrap().push(chunk)
                })
                .await
                .unwrap();

            let received = received.lock().unwrap();
            let text: String =
                received.iter().map(|c| c.text.as_str()).collect();
            assert_eq!(text, "How are you?");
            assert_eq!(
                received.last().unwrap().finish_reason,
                Some(FinishReason::stop())
            );
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let err = model_client
            .send_request(request(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    }
}
