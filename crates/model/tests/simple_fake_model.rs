use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use luau_forge_model::{
    ErrorKind, FinishReason, ModelMessage, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, StreamChunk,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct EchoError(ErrorKind);

impl Display for EchoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for EchoError {}

impl ModelProviderError for EchoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the prompt word by word, and stops early when a word budget is
/// reached.
#[derive(Debug)]
struct EchoResponse {
    words: VecDeque<String>,
    budget: usize,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl EchoResponse {
    fn new(input: &str, budget: usize) -> Self {
        let words = format!("You said {input}")
            .split(' ')
            .map(ToString::to_string)
            .collect();
        Self {
            words,
            budget,
            sleep: None,
        }
    }
}

impl ModelResponse for EchoResponse {
    type Error = EchoError;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<StreamChunk>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            let Some(mut word) = this.words.pop_front() else {
                return Poll::Ready(Ok(None));
            };
            this.budget = this.budget.saturating_sub(1);
            let chunk = if this.words.is_empty() {
                StreamChunk::text(word).with_finish_reason(FinishReason::stop())
            } else if this.budget == 0 {
                this.words.clear();
                word.push(' ');
                StreamChunk::text(word)
                    .with_finish_reason(FinishReason::new("MAX_TOKENS"))
            } else {
                word.push(' ');
                StreamChunk::text(word)
            };
            return Poll::Ready(Ok(Some(chunk)));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_chunk(cx)
    }
}

struct EchoProvider {
    budget: usize,
}

impl ModelProvider for EchoProvider {
    type Error = EchoError;
    type Response = EchoResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = match req.messages.last() {
            Some(ModelMessage::User(content)) => {
                Ok(EchoResponse::new(&content.text, self.budget))
            }
            _ => Err(EchoError(ErrorKind::Other)),
        };
        ready(result)
    }
}

async fn collect(resp: EchoResponse) -> (String, Option<FinishReason>) {
    let mut resp = std::pin::pin!(resp);
    let mut text = String::new();
    let mut finish_reason = None;
    while let Some(chunk) =
        std::future::poll_fn(|cx| resp.as_mut().poll_next_chunk(cx))
            .await
            .unwrap()
    {
        text.push_str(&chunk.text);
        if chunk.finish_reason.is_some() {
            finish_reason = chunk.finish_reason;
        }
    }
    (text, finish_reason)
}

#[tokio::test]
async fn test_completion() {
    let provider = EchoProvider { budget: 100 };
    let req = ModelRequest {
        system_instruction: None,
        messages: vec![ModelMessage::user_text("Good morning")],
    };
    let resp = provider.send_request(&req).await.unwrap();
    let (text, finish_reason) = collect(resp).await;

    assert_eq!(text, "You said Good morning");
    assert!(finish_reason.unwrap().is_stop());
}

#[tokio::test]
async fn test_cut_off() {
    let provider = EchoProvider { budget: 2 };
    let req = ModelRequest {
        system_instruction: None,
        messages: vec![ModelMessage::user_text("Good morning")],
    };
    let resp = provider.send_request(&req).await.unwrap();
    let (text, finish_reason) = collect(resp).await;

    assert_eq!(text, "You said ");
    let finish_reason = finish_reason.unwrap();
    assert!(!finish_reason.is_stop());
    assert_eq!(finish_reason.as_str(), "MAX_TOKENS");
}

#[tokio::test]
async fn test_error() {
    let provider = EchoProvider { budget: 100 };
    let req = ModelRequest::default();
    let err = provider.send_request(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
}
