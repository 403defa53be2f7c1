use luau_forge_model::{InlineImage, ModelMessage, ModelRequest};
use serde::{Deserialize, Serialize};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentChunk {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentChunk {
    /// Concatenated answer text of the first candidate. Thought parts are
    /// not part of the answer and are skipped.
    pub fn text(&self) -> String {
        let Some(content) = self
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
        else {
            return String::new();
        };
        content
            .parts
            .iter()
            .filter(|part| !part.thought.unwrap_or(false))
            .filter_map(|part| part.text.as_deref())
            .collect()
    }

    #[inline]
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
    }
}

// ---------------------------------
// Types shared by both directions
// ---------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

// -----------
// Conversions
// -----------

pub fn create_request(req: &ModelRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: req.system_instruction.as_ref().map(|text| {
            Content {
                role: None,
                parts: vec![text_part(text)],
            }
        }),
        contents: req.messages.iter().map(create_content).collect(),
    }
}

fn create_content(msg: &ModelMessage) -> Content {
    match msg {
        ModelMessage::User(content) => {
            let mut parts = vec![text_part(&content.text)];
            if let Some(image) = &content.image {
                parts.push(image_part(image));
            }
            Content {
                role: Some("user".to_owned()),
                parts,
            }
        }
        ModelMessage::Model(text) => Content {
            role: Some("model".to_owned()),
            parts: vec![text_part(text)],
        },
    }
}

#[inline]
fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_owned()),
        ..Default::default()
    }
}

#[inline]
fn image_part(image: &InlineImage) -> Part {
    Part {
        inline_data: Some(Blob {
            mime_type: image.mime_type.clone(),
            data: image.data.clone(),
        }),
        ..Default::default()
    }
}
