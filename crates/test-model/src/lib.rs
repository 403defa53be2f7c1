//! A local fake model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use luau_forge_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    StreamChunk,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    step: Option<PresetResponse>,
    chunk_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<StreamChunk>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        let Some(preset) = &this.step else {
            return Poll::Ready(Err(Error {
                message: "not enough steps",
                kind: ErrorKind::RateLimitExceeded,
            }));
        };

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            if preset.fail_after == Some(this.chunk_idx) {
                // The stream is dead after the failure.
                this.step = None;
                return Poll::Ready(Err(Error {
                    message: "connection reset",
                    kind: ErrorKind::Other,
                }));
            }

            let chunk = preset.chunks.get(this.chunk_idx).cloned();
            if chunk.is_some() {
                this.chunk_idx += 1;
            }
            return Poll::Ready(Ok(chunk));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_chunk(cx)
    }
}

#[derive(Clone)]
enum ConversationStep {
    UserInput,
    AssistantResponse(PresetResponse),
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the conversation script, which
/// is how the model should respond to a request. The step is selected by the
/// number of history messages in the request, so a request carrying `n`
/// messages plays the step at index `n`. If there is no assistant step at
/// that index, the response fails on its first poll.
///
/// Every request is recorded and can be inspected with
/// [`TestModelProvider::requests`].
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    conversation_script: Vec<ConversationStep>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.conversation_script
            .push(ConversationStep::AssistantResponse(preset));
    }

    #[inline]
    pub fn add_user_input_step(&mut self) {
        self.conversation_script.push(ConversationStep::UserInput);
    }

    /// Adds a user step followed by an assistant step.
    #[inline]
    pub fn add_turn(&mut self, preset: PresetResponse) {
        self.add_user_input_step();
        self.add_assistant_response_step(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req.clone());
        }

        let step = match self.conversation_script.get(req.messages.len()) {
            Some(ConversationStep::AssistantResponse(preset)) => {
                Some(preset.clone())
            }
            _ => None,
        };
        let resp = TestModelResponse {
            step,
            chunk_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        };
        ready(Ok(resp))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use luau_forge_model::{FinishReason, ModelMessage, ModelRequest};

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> Result<(String, Option<FinishReason>), Error> {
        let mut resp = pin!(resp);
        let mut text = String::new();
        let mut finish_reason = None;
        while let Some(chunk) =
            poll_fn(|cx| resp.as_mut().poll_next_chunk(cx)).await?
        {
            text.push_str(&chunk.text);
            if chunk.finish_reason.is_some() {
                finish_reason = chunk.finish_reason;
            }
        }
        Ok((text, finish_reason))
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_turn(PresetResponse::completed(["Hello, ", "world!"]));
        provider.add_turn(PresetResponse::with_texts(
            ["Sure, ", "let me take a "],
            Some(FinishReason::new("MAX_TOKENS")),
        ));

        let mut req = ModelRequest {
            system_instruction: Some("Be brief.".to_owned()),
            messages: vec![ModelMessage::user_text("Hi")],
        };
        let resp = provider.send_request(&req).await.unwrap();
        let (text, reason) = collect_response(resp).await.unwrap();
        assert_eq!(text, "Hello, world!");
        assert!(reason.unwrap().is_stop());

        req.messages.push(ModelMessage::Model(text));
        req.messages.push(ModelMessage::user_text("Check my script"));
        let resp = provider.send_request(&req).await.unwrap();
        let (text, reason) = collect_response(resp).await.unwrap();
        assert_eq!(text, "Sure, let me take a ");
        assert_eq!(reason.unwrap().as_str(), "MAX_TOKENS");

        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_mid_stream() {
        let mut provider = TestModelProvider::default();
        provider.add_turn(
            PresetResponse::completed(["one ", "two ", "three"])
                .failing_after(2),
        );

        let req = ModelRequest {
            system_instruction: None,
            messages: vec![ModelMessage::user_text("Count")],
        };
        let resp = provider.send_request(&req).await.unwrap();
        let mut resp = pin!(resp);
        let mut received = Vec::new();
        let err = loop {
            match poll_fn(|cx| resp.as_mut().poll_next_chunk(cx)).await {
                Ok(Some(chunk)) => received.push(chunk.text),
                Ok(None) => panic!("stream should have failed"),
                Err(err) => break err,
            }
        };
        assert_eq!(received, vec!["one ", "two "]);
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_missing_step() {
        let provider = TestModelProvider::default();
        let req = ModelRequest {
            system_instruction: None,
            messages: vec![ModelMessage::user_text("Hi")],
        };
        let resp = provider.send_request(&req).await.unwrap();
        let err = collect_response(resp).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    }
}
