use serde::{Deserialize, Serialize};

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// Instructions that frame every turn of the conversation.
    pub system_instruction: Option<String>,
    /// The conversation so far, oldest first. The last message is the one
    /// the model should answer.
    pub messages: Vec<ModelMessage>,
}

/// A complete message in the conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// A user turn.
    User(UserContent),
    /// A model turn, as text.
    Model(String),
}

impl ModelMessage {
    /// Creates a text-only user message.
    #[inline]
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        ModelMessage::User(UserContent {
            text: text.into(),
            image: None,
        })
    }
}

/// What the user sent in one turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserContent {
    /// The prompt text.
    pub text: String,
    /// An optional image attached to the prompt.
    pub image: Option<InlineImage>,
}

/// An image embedded in the request body.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InlineImage {
    /// Base64 encoded image bytes.
    pub data: String,
    /// The MIME type of the image, like `image/png`.
    pub mime_type: String,
}

impl std::fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineImage")
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}
