//! # gemini-sdk - Client for the Gemini generative-language API
//!
//! A small async client wrapping the Gemini REST API with typed request and
//! response models.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Text, multi-part and multi-turn prompts through one [`Prompt`] type
//! - Image prompts from raw bytes or base64
//! - Token counting, single and batch embeddings, model lookup and listing
//! - Streaming generation as an ordered, cancellable [`Stream`](futures::Stream)
//! - Pluggable HTTP [`Transport`](http::Transport), `reqwest` by default
//!
//! ## Errors
//!
//! Every call returns [`ClientError`]. Bad input is reported as
//! `InvalidArgument` before anything is sent; a non-success HTTP status is a
//! `RemoteCall` carrying the raw response body.
//!
//! ## Example
//! ```no_run
//! use futures::StreamExt;
//! use gemini_sdk::model::GenerationConfig;
//! use gemini_sdk::{GeminiClient, GeminiConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GeminiClient::new(GeminiConfig::new("your-api-key"))?;
//!
//!     let response = client.text_prompt("Hello!").await?;
//!     println!("{:?}", response.text());
//!
//!     let mut stream = client
//!         .stream_text_prompt_with(
//!             vec!["Write a poem", "about the sea"],
//!             Some(GenerationConfig::new().with_temperature(0.9)),
//!             Vec::new(),
//!         )
//!         .await?;
//!     while let Some(chunk) = stream.next().await {
//!         print!("{}", chunk?.text().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod decode;
pub mod http;
pub mod model;
pub mod options;
pub mod request;
pub mod stream;

// Re-exports for convenience
pub use client::{ClientError, GeminiClient};
pub use model::{Content, GenerateContentResponse, ImageMimeType, Part};
pub use options::{GeminiConfig, TransportOptions};
pub use request::Prompt;
pub use stream::GenerateStream;
pub use tokio_util::sync::CancellationToken;
