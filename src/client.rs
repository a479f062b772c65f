//! The Gemini client and its error type.

use std::sync::Arc;

use base64::prelude::*;
use bytes::Bytes;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::decode::decode_response;
use crate::http::{redact, ReqwestTransport, Transport};
use crate::model::{
    BatchEmbedContentsResponse, CountTokensResponse, EmbedContentResponse,
    GenerateContentResponse, GenerationConfig, ImageMimeType, ModelInfo, ModelList,
    SafetySetting,
};
use crate::options::{GeminiConfig, TransportOptions};
use crate::request::{
    bare_model_name, build_batch_embed_request, build_embed_request, build_generate_request,
    build_image_request, require_text, Prompt,
};
use crate::stream::GenerateStream;

/// Errors that can occur during client operations.
///
/// `InvalidArgument` and `Config` are always returned before any network
/// access. Anything without a more specific variant is reported as
/// `Unexpected`, with the cause available through
/// [`std::error::Error::source`].
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request failed with status {status}: {body}")]
    RemoteCall { status: u16, body: String },

    #[error("JSON parse error: {source}")]
    Decode {
        content: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected error occurred: {source}")]
    Unexpected {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ClientError {
    pub fn unexpected(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ClientError::Unexpected {
            source: source.into(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ClientError::InvalidArgument(_))
    }

    /// Raw response body of a failed remote call.
    pub fn remote_body(&self) -> Option<&str> {
        match self {
            ClientError::RemoteCall { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::unexpected(e)
    }
}

/// Client for the Gemini generative-language REST API.
///
/// Every method issues at most one HTTP request. The client holds no mutable
/// state, so it can be cloned and shared freely across tasks.
///
/// # Example
/// ```no_run
/// use gemini_sdk::{GeminiClient, GeminiConfig};
///
/// # async fn run() -> Result<(), gemini_sdk::ClientError> {
/// let client = GeminiClient::new(GeminiConfig::new("my-api-key"))?;
/// let response = client.text_prompt("Write a haiku about Rust").await?;
/// println!("{}", response.text().unwrap_or_default());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client using the default `reqwest` transport.
    pub fn new(config: GeminiConfig) -> Result<Self, ClientError> {
        Self::with_options(config, &TransportOptions::default())
    }

    /// Create a client whose `reqwest` transport is built from `transport_options`.
    pub fn with_options(
        config: GeminiConfig,
        transport_options: &TransportOptions,
    ) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(transport_options)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client on top of any [`Transport`].
    pub fn with_transport(config: GeminiConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Create a client configured from the environment, see [`GeminiConfig::from_env`].
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Generate a response to a prompt.
    ///
    /// `prompt` may be a single message, a list of messages (sent as the parts
    /// of one user turn), or a list of [`Content`](crate::model::Content).
    pub async fn text_prompt(
        &self,
        prompt: impl Into<Prompt>,
    ) -> Result<GenerateContentResponse, ClientError> {
        self.text_prompt_with(prompt, None, Vec::new()).await
    }

    /// [`text_prompt`](Self::text_prompt) with generation config and safety settings.
    pub async fn text_prompt_with(
        &self,
        prompt: impl Into<Prompt>,
        generation_config: Option<GenerationConfig>,
        safety_settings: Vec<SafetySetting>,
    ) -> Result<GenerateContentResponse, ClientError> {
        let prompt = prompt.into();
        prompt.validate()?;

        let url = self.endpoint(&self.config.text_base_url, ":generateContent")?;
        let request = build_generate_request(prompt, generation_config, safety_settings);
        self.post_json("generateContent", &url, &request).await
    }

    /// Stream a response as it is generated.
    ///
    /// Only input validation fails the call itself. Remote and transport
    /// failures are delivered as the final item of the returned stream.
    pub async fn stream_text_prompt(
        &self,
        prompt: impl Into<Prompt>,
    ) -> Result<GenerateStream, ClientError> {
        self.stream_text_prompt_with(prompt, None, Vec::new()).await
    }

    /// [`stream_text_prompt`](Self::stream_text_prompt) with generation config and safety settings.
    pub async fn stream_text_prompt_with(
        &self,
        prompt: impl Into<Prompt>,
        generation_config: Option<GenerationConfig>,
        safety_settings: Vec<SafetySetting>,
    ) -> Result<GenerateStream, ClientError> {
        self.stream_text_prompt_with_cancel(
            prompt,
            generation_config,
            safety_settings,
            CancellationToken::new(),
        )
        .await
    }

    /// Stream a response, stopping as soon as `cancel` fires.
    pub async fn stream_text_prompt_with_cancel(
        &self,
        prompt: impl Into<Prompt>,
        generation_config: Option<GenerationConfig>,
        safety_settings: Vec<SafetySetting>,
        cancel: CancellationToken,
    ) -> Result<GenerateStream, ClientError> {
        let prompt = prompt.into();
        prompt.validate()?;

        let url = self.endpoint(&self.config.text_base_url, ":streamGenerateContent")?;
        let request = build_generate_request(prompt, generation_config, safety_settings);
        let body = to_body(&request)?;

        tracing::debug!("Sending streamGenerateContent request to {}", redact(&url));

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!("Gemini stream cancelled before the response arrived");
                let empty = futures::stream::empty::<Result<Bytes, ClientError>>().boxed();
                return Ok(GenerateStream::new(empty, cancel.clone()));
            }
            response = self.transport.post_streamed(&url, &body) => response,
        };

        match response {
            Ok(response) if response.is_success() => Ok(GenerateStream::new(response.body, cancel)),
            Ok(response) => {
                let status = response.status;
                let (body, read_error) = response.into_partial_text().await;
                if let Some(e) = read_error {
                    tracing::warn!(
                        "Failed to read Gemini error body (status {}), keeping {} bytes: {}",
                        status,
                        body.len(),
                        e
                    );
                }
                tracing::error!("Gemini API error (status {}): {}", status, body);
                Ok(GenerateStream::failed(
                    ClientError::RemoteCall { status, body },
                    cancel,
                ))
            }
            Err(e) => {
                tracing::error!("Failed to send request to Gemini: {}", e);
                Ok(GenerateStream::failed(e, cancel))
            }
        }
    }

    /// Stream a response into `sink`, one call per chunk in arrival order.
    ///
    /// Resolves once the stream ends, or with the first error.
    pub async fn stream_text_prompt_into<F>(
        &self,
        prompt: impl Into<Prompt>,
        generation_config: Option<GenerationConfig>,
        safety_settings: Vec<SafetySetting>,
        sink: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(GenerateContentResponse),
    {
        self.stream_text_prompt_with(prompt, generation_config, safety_settings)
            .await?
            .for_each_message(sink)
            .await
    }

    /// Ask about an image given as raw bytes.
    pub async fn image_prompt(
        &self,
        message: &str,
        image: &[u8],
        mime_type: ImageMimeType,
    ) -> Result<GenerateContentResponse, ClientError> {
        require_text(message, "Message")?;
        if image.is_empty() {
            return Err(ClientError::InvalidArgument(
                "Image cannot be empty.".to_string(),
            ));
        }
        self.send_image_prompt(message, BASE64_STANDARD.encode(image), mime_type)
            .await
    }

    /// Ask about an image that is already base64 encoded.
    pub async fn image_prompt_base64(
        &self,
        message: &str,
        base64_image: &str,
        mime_type: ImageMimeType,
    ) -> Result<GenerateContentResponse, ClientError> {
        require_text(message, "Message")?;
        require_text(base64_image, "Image")?;
        self.send_image_prompt(message, base64_image.trim().to_string(), mime_type)
            .await
    }

    async fn send_image_prompt(
        &self,
        message: &str,
        base64_image: String,
        mime_type: ImageMimeType,
    ) -> Result<GenerateContentResponse, ClientError> {
        let url = self.endpoint(&self.config.image_base_url, ":generateContent")?;
        let request = build_image_request(message, base64_image, mime_type.as_str(), None, Vec::new());
        self.post_json("generateContent", &url, &request).await
    }

    /// Count the tokens a prompt would consume.
    pub async fn count_tokens(
        &self,
        prompt: impl Into<Prompt>,
    ) -> Result<CountTokensResponse, ClientError> {
        let prompt = prompt.into();
        prompt.validate()?;

        let url = self.endpoint(&self.config.text_base_url, ":countTokens")?;
        let request = build_generate_request(prompt, None, Vec::new());
        self.post_json("countTokens", &url, &request).await
    }

    /// Fetch the metadata of one model, e.g. `gemini-pro` or `models/gemini-pro`.
    pub async fn get_model(&self, name: &str) -> Result<ModelInfo, ClientError> {
        require_text(name, "Model name")?;
        let url = self.endpoint(
            &self.config.model_base_url,
            &format!("/{}", bare_model_name(name)),
        )?;
        self.get_json("getModel", &url).await
    }

    /// List the available models (first page).
    pub async fn get_models(&self) -> Result<ModelList, ClientError> {
        self.get_models_page(None, None).await
    }

    /// List one page of models. Pass the previous page's
    /// [`next_page_token`](ModelList::next_page_token) to continue.
    pub async fn get_models_page(
        &self,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<ModelList, ClientError> {
        let url = self.endpoint(&self.config.model_base_url, "")?;
        let mut url = reqwest::Url::parse(&url)
            .map_err(|e| ClientError::Config(format!("Invalid model base URL: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(page_size) = page_size {
                query.append_pair("pageSize", &page_size.to_string());
            }
            if let Some(page_token) = page_token.filter(|token| !token.trim().is_empty()) {
                query.append_pair("pageToken", page_token);
            }
        }
        self.get_json("listModels", url.as_str()).await
    }

    /// List every model, following page tokens until the last page.
    pub async fn get_all_models(&self) -> Result<Vec<ModelInfo>, ClientError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.get_models_page(None, page_token.as_deref()).await?;
            models.extend(page.models);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(models),
            }
        }
    }

    /// Embed one prompt with `model`, e.g. `embedding-001`.
    pub async fn embed_content(
        &self,
        model: &str,
        prompt: impl Into<Prompt>,
    ) -> Result<EmbedContentResponse, ClientError> {
        require_text(model, "Model name")?;
        let prompt = prompt.into();
        prompt.validate()?;

        let url = self.endpoint(
            &self.config.embedding_base_url,
            &format!("/{}:embedContent", bare_model_name(model)),
        )?;
        let request = build_embed_request(model, prompt);
        self.post_json("embedContent", &url, &request).await
    }

    /// Embed several messages in one call. `embeddings[i]` belongs to `messages[i]`.
    pub async fn batch_embed_contents<I, S>(
        &self,
        model: &str,
        messages: I,
    ) -> Result<BatchEmbedContentsResponse, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        require_text(model, "Model name")?;
        let messages: Vec<String> = messages.into_iter().map(Into::into).collect();
        Prompt::Texts(messages.clone()).validate()?;

        let url = self.endpoint(
            &self.config.embedding_base_url,
            &format!("/{}:batchEmbedContents", bare_model_name(model)),
        )?;
        let request = build_batch_embed_request(model, messages);
        let expected = request.requests.len();

        let response: BatchEmbedContentsResponse =
            self.post_json("batchEmbedContents", &url, &request).await?;

        if response.embeddings.len() != expected {
            return Err(ClientError::unexpected(format!(
                "Expected {} embeddings, got {}",
                expected,
                response.embeddings.len()
            )));
        }
        Ok(response)
    }

    fn endpoint(&self, base_url: &str, suffix: &str) -> Result<String, ClientError> {
        if self.config.api_key.is_empty() {
            return Err(ClientError::Config("API key is required".to_string()));
        }
        Ok(format!(
            "{}{}?key={}",
            base_url,
            suffix,
            self.config.api_key.expose_secret()
        ))
    }

    async fn post_json<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        request: &Req,
    ) -> Result<Resp, ClientError> {
        let body = to_body(request)?;
        tracing::debug!("Sending {} request to {}", operation, redact(url));

        let response = self.transport.post(url, &body).await.map_err(|e| {
            tracing::error!("Failed to send request to Gemini: {}", e);
            e
        })?;
        decode_response(response)
    }

    async fn get_json<Resp: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
    ) -> Result<Resp, ClientError> {
        tracing::debug!("Sending {} request to {}", operation, redact(url));

        let response = self.transport.get(url).await.map_err(|e| {
            tracing::error!("Failed to send request to Gemini: {}", e);
            e
        })?;
        decode_response(response)
    }
}

fn to_body<T: Serialize>(request: &T) -> Result<Value, ClientError> {
    serde_json::to_value(request).map_err(ClientError::unexpected)
}
