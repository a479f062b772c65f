//! Building request payloads from the shapes callers pass in.

use crate::client::ClientError;
use crate::model::{
    BatchEmbedContentsRequest, Content, EmbedContentRequest, GenerateContentRequest,
    GenerationConfig, Part, SafetySetting,
};

/// What to send as the conversation.
///
/// Conversions exist from the common shapes, so call sites can pass a
/// `&str`, a `Vec<String>`/`Vec<&str>` or a fully structured `Vec<Content>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    /// A single user message.
    Text(String),
    /// Several text parts of one user message, kept in order.
    Texts(Vec<String>),
    /// Caller-built conversation, sent unchanged.
    Contents(Vec<Content>),
}

impl Prompt {
    /// Reject empty input before anything is sent.
    pub fn validate(&self) -> Result<(), ClientError> {
        match self {
            Prompt::Text(message) => require_text(message, "Message"),
            Prompt::Texts(messages) => {
                if messages.is_empty() {
                    return Err(invalid("Messages cannot be empty."));
                }
                messages
                    .iter()
                    .try_for_each(|message| require_text(message, "Message"))
            }
            Prompt::Contents(contents) => {
                if contents.is_empty() {
                    return Err(invalid("Messages cannot be empty."));
                }
                if contents.iter().any(|content| content.parts.is_empty()) {
                    return Err(invalid("Content parts cannot be empty."));
                }
                Ok(())
            }
        }
    }

    /// Canonical `contents` array for this prompt.
    pub fn into_contents(self) -> Vec<Content> {
        match self {
            Prompt::Text(message) => vec![Content::user(vec![Part::text(message)])],
            Prompt::Texts(messages) => vec![Content::user(
                messages.into_iter().map(Part::text).collect(),
            )],
            Prompt::Contents(contents) => contents,
        }
    }
}

impl From<String> for Prompt {
    fn from(message: String) -> Self {
        Prompt::Text(message)
    }
}

impl From<&str> for Prompt {
    fn from(message: &str) -> Self {
        Prompt::Text(message.to_string())
    }
}

impl From<&String> for Prompt {
    fn from(message: &String) -> Self {
        Prompt::Text(message.clone())
    }
}

impl From<Vec<String>> for Prompt {
    fn from(messages: Vec<String>) -> Self {
        Prompt::Texts(messages)
    }
}

impl From<Vec<&str>> for Prompt {
    fn from(messages: Vec<&str>) -> Self {
        Prompt::Texts(messages.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Prompt {
    fn from(messages: &[&str]) -> Self {
        Prompt::Texts(messages.iter().map(|m| m.to_string()).collect())
    }
}

impl From<Vec<Content>> for Prompt {
    fn from(contents: Vec<Content>) -> Self {
        Prompt::Contents(contents)
    }
}

impl From<Content> for Prompt {
    fn from(content: Content) -> Self {
        Prompt::Contents(vec![content])
    }
}

/// Build a generation request. Config and safety settings are attached unchanged.
pub fn build_generate_request(
    prompt: Prompt,
    generation_config: Option<GenerationConfig>,
    safety_settings: Vec<SafetySetting>,
) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: prompt.into_contents(),
        generation_config,
        safety_settings,
    }
}

/// Build an image prompt: the text part followed by the inline image.
pub fn build_image_request(
    message: impl Into<String>,
    base64_image: impl Into<String>,
    mime_type: &str,
    generation_config: Option<GenerationConfig>,
    safety_settings: Vec<SafetySetting>,
) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(vec![
            Part::text(message),
            Part::inline_data(mime_type, base64_image),
        ])],
        generation_config,
        safety_settings,
    }
}

/// Build a single embedding request for `model`.
pub fn build_embed_request(model: &str, prompt: Prompt) -> EmbedContentRequest {
    let parts = prompt
        .into_contents()
        .into_iter()
        .flat_map(|content| content.parts)
        .collect();
    EmbedContentRequest {
        model: qualified_model_name(model),
        content: Content::new(None, parts),
    }
}

/// Build a batch embedding request with one item per message, in order.
pub fn build_batch_embed_request<I, S>(model: &str, messages: I) -> BatchEmbedContentsRequest
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let model = qualified_model_name(model);
    BatchEmbedContentsRequest {
        requests: messages
            .into_iter()
            .map(|message| EmbedContentRequest {
                model: model.clone(),
                content: Content::new(None, vec![Part::text(message)]),
            })
            .collect(),
    }
}

/// Model id without the `models/` prefix, for use in URL paths.
pub fn bare_model_name(model: &str) -> &str {
    let model = model.trim();
    model.strip_prefix("models/").unwrap_or(model)
}

/// Model name in the `models/<id>` form the embedding API expects in bodies.
pub fn qualified_model_name(model: &str) -> String {
    format!("models/{}", bare_model_name(model))
}

pub(crate) fn require_text(value: &str, what: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(invalid(&format!("{what} cannot be empty.")));
    }
    Ok(())
}

fn invalid(message: &str) -> ClientError {
    ClientError::InvalidArgument(message.to_string())
}
