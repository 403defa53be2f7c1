mod builder;
mod state;
#[cfg(test)]
mod tests;

use luau_forge_actor::Actor;
use luau_forge_model::{InlineImage, UserContent};

use crate::conversation::suggestion_prompt;
use crate::error::SessionError;
pub use builder::SessionBuilder;
pub use state::{SessionEvent, SessionSnapshot};
use state::SessionState;

/// A chat session with one model.
///
/// The session runs as an actor: user actions and streamed chunks are all
/// messages handled one at a time on the session task, so the reply being
/// written has exactly one writer. Operations return as soon as the action
/// is accepted; progress is reported through the callback registered with
/// [`SessionBuilder::on_event`].
///
/// Dropping the session stops it, abandoning any active stream.
pub struct Session {
    handle: Actor<SessionState>,
}

impl Session {
    /// Sends a user message, optionally with one image.
    ///
    /// Fails with [`SessionError::Busy`] while a reply is streaming and
    /// with [`SessionError::EmptyInput`] if `text` is blank.
    pub async fn send_message(
        &self,
        text: impl Into<String>,
        image: Option<InlineImage>,
    ) -> Result<(), SessionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let content = UserContent {
            text: text.clone(),
            image,
        };
        self.handle
            .ask(move |state, handle| state.start_send(text, content, handle))
            .await?
    }

    /// Sends a suggested follow-up. The transcript shows the suggestion
    /// itself while the model receives a prompt built around it.
    pub async fn send_suggestion(
        &self,
        suggestion: impl Into<String>,
    ) -> Result<(), SessionError> {
        let suggestion = suggestion.into();
        let content = UserContent {
            text: suggestion_prompt(&suggestion),
            image: None,
        };
        self.handle
            .ask(move |state, handle| {
                state.start_send(suggestion, content, handle)
            })
            .await?
    }

    /// Resumes the last reply after it was cut off. The continued text is
    /// appended to the same assistant message.
    pub async fn continue_generation(&self) -> Result<(), SessionError> {
        self.handle
            .ask(|state, handle| state.start_continuation(handle))
            .await?
    }

    /// Returns a copy of the current session state.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        Ok(self.handle.ask(|state, _| state.snapshot()).await?)
    }
}

impl Session {
    fn spawn_from_builder(builder: SessionBuilder) -> Self {
        let SessionBuilder {
            model_client,
            system_instruction,
            greeting,
            on_event,
        } = builder;

        let state = SessionState::new(
            model_client,
            system_instruction,
            greeting,
            on_event,
        );
        Self {
            handle: Actor::spawn(state, Some("session")),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.handle.try_kill();
    }
}
