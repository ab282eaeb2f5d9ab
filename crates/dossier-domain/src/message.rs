//! Chat-style request model for language-model backends

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// System instructions
    System,
    /// End-user input
    User,
    /// Prior model output
    Assistant,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One part of a message body
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    /// Plain text
    Text(String),
    /// Inline image, base64-encoded
    Image {
        /// MIME type, e.g. `image/png`
        mime_type: String,
        /// Base64 payload without the data-URI prefix
        data: String,
    },
}

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Message author
    pub role: Role,
    /// Ordered content parts
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    /// Single-part user text message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    /// Single-part system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    /// Append an inline image part
    pub fn with_image(mut self, mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        self.parts.push(ContentPart::Image {
            mime_type: mime_type.into(),
            data: data.into(),
        });
        self
    }

    /// Concatenated text of every text part
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether the message carries any image part
    pub fn has_image(&self) -> bool {
        self.parts.iter().any(|part| matches!(part, ContentPart::Image { .. }))
    }
}

/// Structured-output constraint forwarded to the backend where supported
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseConstraint {
    /// Free-form completion
    #[default]
    None,

    /// Response must be a JSON document matching the schema
    JsonSchema {
        /// Schema name reported to the backend
        name: String,
        /// JSON schema document, serialized
        schema: String,
    },

    /// Response must be one of the listed values
    Enum {
        /// Field carrying the chosen value
        field: String,
        /// Allowed values
        values: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_text() {
        let message = ChatMessage::user("hello");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.text(), "hello");
        assert!(!message.has_image());
    }

    #[test]
    fn test_image_part_excluded_from_text() {
        let message = ChatMessage::user("transcribe").with_image("image/png", "AAAA");
        assert!(message.has_image());
        assert_eq!(message.text(), "transcribe");
        assert_eq!(message.parts.len(), 2);
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
