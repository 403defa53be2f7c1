use luau_forge_model::ModelProvider;

use super::{Session, SessionEvent};
use crate::model_client::ModelClient;

pub(crate) type EventFn = Box<dyn Fn(SessionEvent) + Send + Sync>;

/// [`Session`] builder.
pub struct SessionBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) system_instruction: Option<String>,
    pub(crate) greeting: Option<String>,
    pub(crate) on_event: Option<EventFn>,
}

impl SessionBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_instruction: None,
            greeting: None,
            on_event: None,
        }
    }

    /// Sets the instruction sent with every request.
    #[inline]
    pub fn with_system_instruction(
        mut self,
        instruction: impl Into<String>,
    ) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Opens the transcript with an assistant message that is never sent
    /// to the model.
    #[inline]
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    /// Attaches a callback invoked on the session task for every
    /// [`SessionEvent`]. It must not block.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(SessionEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(on_event));
        self
    }

    /// Builds the session. Must be called within a tokio runtime.
    #[inline]
    pub fn build(self) -> Session {
        Session::spawn_from_builder(self)
    }
}
