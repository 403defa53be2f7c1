use luau_forge_core::{SessionError, SessionEvent, SessionSnapshot};
use luau_forge_model::{InlineImage, ModelProvider};

/// Instruction sent with every request.
pub const SYSTEM_INSTRUCTION: &str = include_str!("./system_prompt.md");

/// The first message of every session. It is only shown, never sent.
pub const GREETING: &str = "Hello! I'm your Roblox scripting partner. I \
    write, review and version Luau scripts so they stay bug-free and \
    efficient. What are we building today? 🚀";

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    inner: luau_forge_core::SessionBuilder,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let inner = luau_forge_core::SessionBuilder::with_model_provider(
            provider,
        )
        .with_system_instruction(SYSTEM_INSTRUCTION)
        .with_greeting(GREETING);
        Self { inner }
    }

    /// Attaches a callback to be invoked on every session event.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(SessionEvent) + Send + Sync + 'static,
    ) -> Self {
        self.inner = self.inner.on_event(on_event);
        self
    }

    /// Builds a new session.
    #[inline]
    pub fn build(self) -> Session {
        Session {
            inner: self.inner.build(),
        }
    }
}

/// A chat session, like a window that displays messages and has an input
/// box.
///
/// It is a thin wrapper around [`luau_forge_core::Session`] configured as
/// a Luau scripting assistant.
pub struct Session {
    inner: luau_forge_core::Session,
}

impl Session {
    /// Sends a message to the session.
    #[inline]
    pub async fn send_message(
        &self,
        message: &str,
        image: Option<InlineImage>,
    ) -> Result<(), SessionError> {
        self.inner.send_message(message, image).await
    }

    /// Sends one of the suggestions offered after the last reply.
    #[inline]
    pub async fn send_suggestion(
        &self,
        suggestion: &str,
    ) -> Result<(), SessionError> {
        self.inner.send_suggestion(suggestion).await
    }

    /// Resumes a reply that was cut off.
    #[inline]
    pub async fn continue_generation(&self) -> Result<(), SessionError> {
        self.inner.continue_generation().await
    }

    /// Returns the current transcript, stage and suggestions.
    #[inline]
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.inner.snapshot().await
    }
}
