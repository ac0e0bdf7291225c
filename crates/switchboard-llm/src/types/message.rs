use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
}

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Message content
    pub content: Content,
}

impl Message {
    /// Plain-text user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
        }
    }

    /// Plain-text assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
        }
    }

    /// Plain-text system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(text.into()),
        }
    }
}

/// Message content, either plain text or structured parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text content
    Text(String),
    /// Array of content parts (text, images)
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Extract text content, joining parts if necessary
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// View the content as a list of parts
    pub fn parts(&self) -> Vec<ContentPart> {
        match self {
            Self::Text(text) => vec![ContentPart::Text { text: text.clone() }],
            Self::Parts(parts) => parts.clone(),
        }
    }

    /// Append a part, promoting plain text to a part list first
    pub fn push(&mut self, part: ContentPart) {
        match self {
            Self::Text(text) => {
                let mut parts = Vec::with_capacity(2);
                if !text.is_empty() {
                    parts.push(ContentPart::Text {
                        text: std::mem::take(text),
                    });
                }
                parts.push(part);
                *self = Self::Parts(parts);
            }
            Self::Parts(parts) => parts.push(part),
        }
    }
}

/// Individual part within a multipart message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content block
    Text {
        /// The text string
        text: String,
    },
    /// Inline image
    Image {
        /// MIME type such as `image/png`
        mime_type: String,
        /// Base64-encoded image bytes
        data: String,
    },
}

impl ContentPart {
    /// Build an image part from raw bytes
    pub fn image(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::Image {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// `data:` URI for image parts
    pub fn data_uri(&self) -> Option<String> {
        match self {
            Self::Image { mime_type, data } => Some(format!("data:{mime_type};base64,{data}")),
            Self::Text { .. } => None,
        }
    }
}
