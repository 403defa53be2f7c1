use std::fmt::{self, Debug};

use luau_forge_actor::{Actor, Message};
use luau_forge_model::{ModelProviderError, StreamChunk, UserContent};
use tracing::Instrument;

use super::builder::EventFn;
use crate::accumulator::{
    CONTINUE_ERROR_TRAILER, ERROR_TRAILER, StreamAccumulator,
};
use crate::controller::{Stage, StageEvent, transition};
use crate::conversation::{Conversation, Role, TranscriptMessage};
use crate::error::SessionError;
use crate::markup::{ParsedMessage, parse_message};
use crate::model_client::ModelClient;

/// Progress reported by a [`Session`](super::Session).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The reply being written changed. Carries its full text and the
    /// segments parsed from it.
    ReplyUpdated {
        /// Raw text of the reply.
        text: String,
        /// The text parsed into segments.
        parsed: ParsedMessage,
    },
    /// The suggestion list was replaced or cleared.
    SuggestionsChanged(Vec<String>),
    /// The session moved to another stage.
    StageChanged(Stage),
}

/// A copy of the session state at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The current stage.
    pub stage: Stage,
    /// The whole transcript, greeting included.
    pub messages: Vec<TranscriptMessage>,
    /// Follow-up prompts offered after the last reply.
    pub suggestions: Vec<String>,
}

impl SessionSnapshot {
    /// Whether the last reply was cut off and may be continued.
    #[inline]
    pub fn is_continuable(&self) -> bool {
        self.stage.is_continuable()
    }

    /// Returns the last assistant message, if any.
    pub fn last_reply(&self) -> Option<&TranscriptMessage> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamKind {
    Fresh,
    Continuation,
}

struct ActiveStream {
    id: u64,
    kind: StreamKind,
    accumulator: StreamAccumulator,
}

pub(crate) struct SessionState {
    model_client: Option<ModelClient>,
    system_instruction: Option<String>,
    conversation: Conversation,
    stage: Stage,
    suggestions: Vec<String>,
    stream: Option<ActiveStream>,
    next_stream_id: u64,

    on_event: Option<EventFn>,
}

impl SessionState {
    pub(crate) fn new(
        model_client: ModelClient,
        system_instruction: Option<String>,
        greeting: Option<String>,
        on_event: Option<EventFn>,
    ) -> Self {
        let mut conversation = Conversation::default();
        if let Some(greeting) = greeting {
            conversation.push_greeting(greeting);
        }
        Self {
            model_client: Some(model_client),
            system_instruction,
            conversation,
            stage: Stage::Idle,
            suggestions: Vec::new(),
            stream: None,
            next_stream_id: 1,
            on_event,
        }
    }

    pub(crate) fn start_send(
        &mut self,
        display: String,
        content: UserContent,
        handle: &Actor<Self>,
    ) -> Result<(), SessionError> {
        let next_stage = transition(self.stage, StageEvent::Send)?;
        let model_client =
            self.model_client.take().ok_or(SessionError::Busy)?;

        self.conversation.begin_exchange(display, content);
        self.start_stream(
            next_stage,
            StreamKind::Fresh,
            model_client,
            handle,
        );
        Ok(())
    }

    pub(crate) fn start_continuation(
        &mut self,
        handle: &Actor<Self>,
    ) -> Result<(), SessionError> {
        let next_stage = transition(self.stage, StageEvent::Continue)?;
        let model_client =
            self.model_client.take().ok_or(SessionError::Busy)?;

        if self.conversation.begin_continuation() {
            self.reply_updated();
        }
        self.start_stream(
            next_stage,
            StreamKind::Continuation,
            model_client,
            handle,
        );
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            stage: self.stage,
            messages: self.conversation.messages().to_vec(),
            suggestions: self.suggestions.clone(),
        }
    }

    fn start_stream(
        &mut self,
        next_stage: Stage,
        kind: StreamKind,
        model_client: ModelClient,
        handle: &Actor<Self>,
    ) {
        // Both are cleared before the request goes out.
        self.set_stage(next_stage);
        self.set_suggestions(Vec::new());

        let stream_id = self.next_stream_id;
        self.next_stream_id += 1;
        self.stream = Some(ActiveStream {
            id: stream_id,
            kind,
            accumulator: StreamAccumulator::default(),
        });

        let request = self
            .conversation
            .build_request(self.system_instruction.as_deref());
        let handle = handle.clone();
        tokio::spawn(
            async move {
                let result = model_client
                    .send_request(request, {
                        let handle = handle.clone();
                        move |chunk| {
                            let msg = ChunkReceived { stream_id, chunk };
                            handle.send(msg).ok();
                        }
                    })
                    .await;
                handle
                    .send(StreamFinished {
                        stream_id,
                        model_client,
                        result,
                    })
                    .ok();
            }
            .instrument(debug_span!("stream", id = stream_id, ?kind)),
        );
    }

    fn set_stage(&mut self, stage: Stage) {
        if self.stage == stage {
            return;
        }
        debug!("stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
        self.emit(SessionEvent::StageChanged(stage));
    }

    fn set_suggestions(&mut self, suggestions: Vec<String>) {
        if self.suggestions == suggestions {
            return;
        }
        self.suggestions = suggestions.clone();
        self.emit(SessionEvent::SuggestionsChanged(suggestions));
    }

    /// Re-parses the reply after it changed.
    fn reply_updated(&mut self) {
        let Some(text) = self.conversation.reply_mut().cloned() else {
            return;
        };
        let parsed = parse_message(&text);
        if let Some(suggestions) = &parsed.suggestions {
            self.set_suggestions(suggestions.clone());
        }
        self.emit(SessionEvent::ReplyUpdated { text, parsed });
    }

    #[inline]
    fn emit(&self, event: SessionEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }
}

#[derive(Debug)]
struct ChunkReceived {
    stream_id: u64,
    chunk: StreamChunk,
}

impl Message<SessionState> for ChunkReceived {
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        let Some(stream) = state
            .stream
            .as_mut()
            .filter(|stream| stream.id == self.stream_id)
        else {
            warn!("dropping a chunk of stale stream {}", self.stream_id);
            return;
        };
        let Some(reply) = state.conversation.reply_mut() else {
            error!("no reply message to append to");
            return;
        };
        stream.accumulator.push(reply, self.chunk);
        state.reply_updated();
    }
}

struct StreamFinished {
    stream_id: u64,
    model_client: ModelClient,
    result: Result<(), Box<dyn ModelProviderError>>,
}

impl Debug for StreamFinished {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamFinished")
            .field("stream_id", &self.stream_id)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl Message<SessionState> for StreamFinished {
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        state.model_client = Some(self.model_client);

        let Some(ActiveStream {
            id,
            kind,
            mut accumulator,
        }) = state.stream.take_if(|stream| stream.id == self.stream_id)
        else {
            warn!("stale stream {} finished", self.stream_id);
            return;
        };

        if let Err(err) = &self.result {
            warn!("stream {id} failed: {err}");
            let trailer = match kind {
                StreamKind::Fresh => ERROR_TRAILER,
                StreamKind::Continuation => CONTINUE_ERROR_TRAILER,
            };
            if let Some(reply) = state.conversation.reply_mut() {
                accumulator.fail(reply, trailer);
            }
            state.reply_updated();
        }

        let outcome = accumulator.finish();
        let clean = outcome.is_clean();
        debug!(
            "stream {id} ended, finish reason: {:?}, clean: {clean}",
            outcome.finish_reason
        );
        state.conversation.finish_exchange(outcome.received);

        match transition(state.stage, StageEvent::StreamEnded { clean }) {
            Ok(stage) => state.set_stage(stage),
            Err(err) => error!("internal state is inconsistent: {err}"),
        }
    }
}
