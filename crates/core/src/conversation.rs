//! Conversation-related types.
//!
//! A conversation is kept twice: once as the transcript shown to the user,
//! where a continued reply stays a single assistant message, and once as
//! the model history, where every request and every streamed reply is its
//! own turn.

use luau_forge_model::{ModelMessage, ModelRequest, UserContent};

use crate::markup::{ParsedMessage, parse_message};

/// Asks the model to resume a cut-off reply.
pub const CONTINUE_PROMPT: &str = "Please continue generating the previous \
    response from exactly where you left off. Do not repeat any part of the \
    previous message or add any introductory phrases. Just provide the rest \
    of the text.";

/// Builds the prompt sent to the model when a suggestion is picked.
pub fn suggestion_prompt(suggestion: &str) -> String {
    format!(
        "Amazing, let's do this: \"{suggestion}\". Remember the code we've \
         discussed so far and integrate this new feature."
    )
}

/// Author of a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The person chatting.
    User,
    /// The model.
    Assistant,
}

/// One message of the transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptMessage {
    /// Who wrote the message.
    pub role: Role,
    /// The full raw text, markers included.
    pub text: String,
}

impl TranscriptMessage {
    /// Parses the text into displayable segments.
    #[inline]
    pub fn parse(&self) -> ParsedMessage {
        parse_message(&self.text)
    }
}

/// Represents a conversation.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    messages: Vec<TranscriptMessage>,
    history: Vec<ModelMessage>,
    /// Whether the model answered any part of the current reply.
    answered: bool,
    /// The request of the current exchange, if it got no answer at all.
    unanswered: Option<UserContent>,
}

impl Conversation {
    /// Adds an assistant message that is shown but never sent to the model.
    pub fn push_greeting(&mut self, text: impl Into<String>) {
        self.messages.push(TranscriptMessage {
            role: Role::Assistant,
            text: text.into(),
        });
    }

    /// Starts a new exchange: `display` is shown in the transcript while
    /// `content` is what the model receives. An empty assistant message is
    /// opened for the reply.
    pub fn begin_exchange(&mut self, display: String, content: UserContent) {
        self.messages.push(TranscriptMessage {
            role: Role::User,
            text: display,
        });
        self.messages.push(TranscriptMessage {
            role: Role::Assistant,
            text: String::new(),
        });
        self.history.push(ModelMessage::User(content));
        self.answered = false;
        self.unanswered = None;
    }

    /// Starts resuming the last reply. Only the model history grows; the
    /// continued text lands in the existing assistant message.
    ///
    /// If the model never answered the current exchange, its request is
    /// sent again instead and the error notice in the reply is cleared.
    /// Returns `true` in that case.
    pub fn begin_continuation(&mut self) -> bool {
        let Some(content) = self.unanswered.take() else {
            self.history.push(ModelMessage::user_text(CONTINUE_PROMPT));
            return false;
        };
        if let Some(reply) = self.reply_mut() {
            reply.clear();
        }
        self.history.push(ModelMessage::User(content));
        true
    }

    /// Returns the text of the reply being written, if the last message is
    /// from the assistant.
    pub fn reply_mut(&mut self) -> Option<&mut String> {
        self.messages
            .last_mut()
            .filter(|message| message.role == Role::Assistant)
            .map(|message| &mut message.text)
    }

    /// Closes the current exchange in the model history.
    ///
    /// `received` is the text the last stream produced. If it is empty the
    /// request that started the stream is dropped from the history, so the
    /// model never sees a user turn without an answer.
    pub fn finish_exchange(&mut self, received: String) {
        if !received.is_empty() {
            self.history.push(ModelMessage::Model(received));
            self.answered = true;
            return;
        }
        if let Some(ModelMessage::User(content)) = self.history.last() {
            if !self.answered {
                self.unanswered = Some(content.clone());
            }
            self.history.pop();
        }
    }

    /// Builds a request carrying the whole model history.
    pub fn build_request(
        &self,
        system_instruction: Option<&str>,
    ) -> ModelRequest {
        ModelRequest {
            system_instruction: system_instruction.map(ToOwned::to_owned),
            messages: self.history.clone(),
        }
    }

    /// Returns the transcript.
    #[inline]
    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    /// Returns the turns the model has seen so far.
    #[inline]
    pub fn history(&self) -> &[ModelMessage] {
        &self.history
    }
}
