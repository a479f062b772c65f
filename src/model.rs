//! Wire data models for Gemini requests and responses.
//!
//! Field names follow the REST API's camelCase spelling exactly. Optional
//! fields are omitted from serialized requests when absent, and collection
//! fields on responses default to empty when the API leaves them out.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::client::ClientError;

/// Author of a conversation turn.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Option<Role>, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// A user turn with the given parts.
    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Some(Role::User), parts)
    }

    /// A model turn with the given parts.
    pub fn model(parts: Vec<Part>) -> Self {
        Self::new(Some(Role::Model), parts)
    }

    /// Concatenated text of every text part, in order.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }
}

/// A unit of content: either text or inline binary data.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Inline data part. `data` must already be base64 encoded.
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::InlineData { .. } => None,
        }
    }
}

/// Base64 inline payload used for image prompts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Sampling parameters. Ranges are validated by the service, not locally.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = Some(stop_sequences);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// Blocking threshold for one harm category, e.g.
/// `HARM_CATEGORY_HARASSMENT` / `BLOCK_ONLY_HIGH`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            threshold: threshold.into(),
        }
    }
}

/// Request body of `generateContent`, `streamGenerateContent` and `countTokens`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
}

/// Why a candidate stopped generating.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    FinishReasonUnspecified,
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Language,
    Blocklist,
    ProhibitedContent,
    Spii,
    #[serde(other)]
    Other,
}

/// Probability that a piece of content falls into a harm category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafetyRating {
    pub category: String,
    pub probability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

/// Token accounting attached to generation responses.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates_token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<u32>,
}

/// Response of `generateContent`, and of each `streamGenerateContent` chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, or `None` when there is no candidate content.
    pub fn text(&self) -> Option<String> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(Content::text)
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    pub total_tokens: u32,
}

/// Request body of `embedContent`, also used as one item of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedContentRequest {
    /// Fully qualified model name, `models/<id>`.
    pub model: String,
    pub content: Content,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchEmbedContentsRequest {
    pub requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContentEmbedding {
    #[serde(default)]
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedContentResponse {
    pub embedding: ContentEmbedding,
}

/// Batch embedding result; `embeddings[i]` belongs to input `i`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BatchEmbedContentsResponse {
    #[serde(default)]
    pub embeddings: Vec<ContentEmbedding>,
}

/// Static metadata describing a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_token_limit: u32,
    #[serde(default)]
    pub output_token_limit: u32,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl ModelInfo {
    pub fn supports(&self, method: &str) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|supported| supported == method)
    }
}

/// Result of listing models. `models` is empty, never absent, when none exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Image formats accepted by image prompts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ImageMimeType {
    Jpg,
    Jpeg,
    Png,
    Webp,
    Heic,
    Heif,
}

impl ImageMimeType {
    pub const ALL: [ImageMimeType; 6] = [
        ImageMimeType::Jpg,
        ImageMimeType::Jpeg,
        ImageMimeType::Png,
        ImageMimeType::Webp,
        ImageMimeType::Heic,
        ImageMimeType::Heif,
    ];

    /// Canonical MIME string sent in `inlineData.mimeType`.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageMimeType::Jpg => "image/jpg",
            ImageMimeType::Jpeg => "image/jpeg",
            ImageMimeType::Png => "image/png",
            ImageMimeType::Webp => "image/webp",
            ImageMimeType::Heic => "image/heic",
            ImageMimeType::Heif => "image/heif",
        }
    }
}

impl fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal conversion, in declaration order.
impl TryFrom<i32> for ImageMimeType {
    type Error = ClientError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| ClientError::InvalidArgument(format!("Invalid image mime type: {value}")))
    }
}

/// Accepts either an extension (`png`) or a MIME string (`image/png`).
impl FromStr for ImageMimeType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let name = normalized.strip_prefix("image/").unwrap_or(&normalized);
        match name {
            "jpg" => Ok(ImageMimeType::Jpg),
            "jpeg" => Ok(ImageMimeType::Jpeg),
            "png" => Ok(ImageMimeType::Png),
            "webp" => Ok(ImageMimeType::Webp),
            "heic" => Ok(ImageMimeType::Heic),
            "heif" => Ok(ImageMimeType::Heif),
            _ => Err(ClientError::InvalidArgument(format!(
                "Invalid image mime type: {s}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn populated_response() -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content::model(vec![Part::text("Paris")])),
                finish_reason: Some(FinishReason::Stop),
                index: Some(0),
                safety_ratings: vec![SafetyRating {
                    category: "HARM_CATEGORY_HARASSMENT".to_string(),
                    probability: "NEGLIGIBLE".to_string(),
                    blocked: None,
                }],
            }],
            prompt_feedback: Some(PromptFeedback {
                block_reason: None,
                safety_ratings: vec![SafetyRating {
                    category: "HARM_CATEGORY_HATE_SPEECH".to_string(),
                    probability: "LOW".to_string(),
                    blocked: Some(false),
                }],
            }),
            usage_metadata: Some(UsageMetadata {
                prompt_token_count: Some(4),
                candidates_token_count: Some(1),
                total_token_count: Some(5),
            }),
        }
    }

    #[test]
    fn test_response_round_trip_populated() {
        let response = populated_response();
        let encoded = serde_json::to_string(&response).unwrap();
        let decoded: GenerateContentResponse = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.candidates, response.candidates);
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_response_round_trip_empty() {
        let response = GenerateContentResponse::default();
        let encoded = serde_json::to_string(&response).unwrap();
        assert_eq!(encoded, r#"{"candidates":[]}"#);
        let decoded: GenerateContentResponse = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.candidates.is_empty());
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_response_uses_camel_case_field_names() {
        let value = serde_json::to_value(populated_response()).unwrap();
        let candidate = &value["candidates"][0];
        assert_eq!(candidate["finishReason"], "STOP");
        assert!(candidate["safetyRatings"].is_array());
        assert!(value["promptFeedback"]["safetyRatings"].is_array());
        assert_eq!(value["usageMetadata"]["totalTokenCount"], 5);
    }

    #[test]
    fn test_response_decodes_api_payload() {
        let payload = json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello"}, {"text": " world"}], "role": "model"},
                "finishReason": "MAX_TOKENS",
                "index": 0,
                "safetyRatings": [{"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "probability": "NEGLIGIBLE"}]
            }],
            "promptFeedback": {"safetyRatings": []}
        });

        let response: GenerateContentResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello world"));
        assert_eq!(response.candidates[0].finish_reason, Some(FinishReason::MaxTokens));
        assert_eq!(response.candidates[0].safety_ratings.len(), 1);
    }

    #[test]
    fn test_unknown_finish_reason_maps_to_other() {
        let candidate: Candidate =
            serde_json::from_value(json!({"finishReason": "SOMETHING_NEW"})).unwrap();
        assert_eq!(candidate.finish_reason, Some(FinishReason::Other));
        assert!(candidate.content.is_none());
    }

    #[test]
    fn test_request_omits_absent_optionals() {
        let request = GenerateContentRequest {
            contents: vec![Content::new(None, vec![Part::text("hi")])],
            generation_config: None,
            safety_settings: Vec::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"contents": [{"parts": [{"text": "hi"}]}]}));
    }

    #[test]
    fn test_request_serializes_config_and_safety() {
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text("hi")])],
            generation_config: Some(
                GenerationConfig::new()
                    .with_temperature(0.5)
                    .with_top_k(40)
                    .with_max_output_tokens(64)
                    .with_stop_sequences(vec!["END".to_string()]),
            ),
            safety_settings: vec![SafetySetting::new(
                "HARM_CATEGORY_HARASSMENT",
                "BLOCK_ONLY_HIGH",
            )],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["generationConfig"]["temperature"], 0.5);
        assert_eq!(value["generationConfig"]["topK"], 40);
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 64);
        assert_eq!(value["generationConfig"]["stopSequences"][0], "END");
        assert!(value["generationConfig"].get("topP").is_none());
        assert_eq!(value["safetySettings"][0]["threshold"], "BLOCK_ONLY_HIGH");
    }

    #[test]
    fn test_inline_data_part_wire_shape() {
        let part = Part::inline_data("image/png", "AAAA");
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(
            value,
            json!({"inlineData": {"mimeType": "image/png", "data": "AAAA"}})
        );
        let decoded: Part = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, part);
        assert_eq!(decoded.as_text(), None);
    }

    #[test]
    fn test_model_list_defaults_to_empty() {
        let list: ModelList = serde_json::from_str(r#"{"models":[]}"#).unwrap();
        assert!(list.models.is_empty());
        let list: ModelList = serde_json::from_str("{}").unwrap();
        assert!(list.models.is_empty());
    }

    #[test]
    fn test_model_info_decodes() {
        let info: ModelInfo = serde_json::from_value(json!({
            "name": "models/gemini-pro",
            "version": "001",
            "displayName": "Gemini Pro",
            "description": "The best model",
            "inputTokenLimit": 30720,
            "outputTokenLimit": 2048,
            "supportedGenerationMethods": ["generateContent", "countTokens"],
            "temperature": 0.9,
            "topP": 1.0,
            "topK": 1
        }))
        .unwrap();
        assert_eq!(info.display_name, "Gemini Pro");
        assert_eq!(info.input_token_limit, 30720);
        assert!(info.supports("countTokens"));
        assert!(!info.supports("embedContent"));
        assert_eq!(info.top_k, Some(1));
    }

    #[test]
    fn test_mime_mapping_is_exhaustive() {
        let expected = [
            "image/jpg",
            "image/jpeg",
            "image/png",
            "image/webp",
            "image/heic",
            "image/heif",
        ];
        for (mime, expected) in ImageMimeType::ALL.iter().zip(expected) {
            assert_eq!(mime.as_str(), expected);
            assert_eq!(mime.to_string(), expected);
            assert_eq!(expected.parse::<ImageMimeType>().unwrap(), *mime);
        }
    }

    #[test]
    fn test_mime_ordinal_conversion() {
        for (index, mime) in ImageMimeType::ALL.iter().enumerate() {
            assert_eq!(ImageMimeType::try_from(index as i32).unwrap(), *mime);
        }
        assert!(ImageMimeType::try_from(6).unwrap_err().is_invalid_argument());
        assert!(ImageMimeType::try_from(-1).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_mime_parse_rejects_unknown() {
        assert_eq!("PNG".parse::<ImageMimeType>().unwrap(), ImageMimeType::Png);
        assert!("image/gif"
            .parse::<ImageMimeType>()
            .unwrap_err()
            .is_invalid_argument());
    }
}
