//! HTTP transport used by the client.
//!
//! The client only needs a small capability set (`get`, `post`,
//! `post_streamed`, `put`, `delete`), expressed by the [`Transport`] trait.
//! [`ReqwestTransport`] is the default implementation; tests substitute
//! their own.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use crate::client::ClientError;
use crate::options::TransportOptions;

/// Body of a streamed response, delivered in network-sized chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }
}

/// A response whose body is still being read.
pub struct StreamedResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl StreamedResponse {
    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }

    /// Drain the remaining body into a string, for error diagnostics.
    pub async fn into_text(self) -> Result<String, ClientError> {
        match self.into_partial_text().await {
            (text, None) => Ok(text),
            (_, Some(e)) => Err(e),
        }
    }

    /// Like [`into_text`](Self::into_text), but keeps whatever arrived before
    /// a read failure and hands the failure back alongside it.
    pub async fn into_partial_text(mut self) -> (String, Option<ClientError>) {
        let mut buffer = Vec::new();
        let mut failure = None;
        while let Some(chunk) = self.body.next().await {
            match chunk {
                Ok(chunk) => buffer.extend_from_slice(&chunk),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        (String::from_utf8_lossy(&buffer).into_owned(), failure)
    }
}

impl std::fmt::Debug for StreamedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamedResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Capabilities the client needs from an HTTP stack.
///
/// Implementations return non-success statuses as ordinary responses; only
/// failures to complete the exchange (connection, TLS, I/O) are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, ClientError>;

    async fn post(&self, url: &str, body: &Value) -> Result<HttpResponse, ClientError>;

    /// Send a POST and return as soon as the status line and headers arrive.
    async fn post_streamed(&self, url: &str, body: &Value)
        -> Result<StreamedResponse, ClientError>;

    async fn put(&self, url: &str, body: &Value) -> Result<HttpResponse, ClientError>;

    async fn delete(&self, url: &str) -> Result<HttpResponse, ClientError>;
}

/// Build a configured HTTP client from transport options.
///
/// This applies common configuration like timeouts and proxies.
///
/// # Example
/// ```ignore
/// let client = build_http_client(&transport_options)?;
/// ```
pub fn build_http_client(transport_options: &TransportOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = transport_options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &transport_options.proxy {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => tracing::warn!("Ignoring invalid proxy URL {}: {}", proxy_url, e),
        }
    }

    builder.build()
}

/// Add extra headers to a request if specified in transport options.
///
/// # Example
/// ```ignore
/// let mut req = client.post(url);
/// req = add_extra_headers(req, &transport_options.extra_headers);
/// ```
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// URL without its query string, safe to log since the API key lives there.
pub(crate) fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    extra_headers: Option<HashMap<String, String>>,
}

impl ReqwestTransport {
    pub fn new(transport_options: &TransportOptions) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_http_client(transport_options)?,
            extra_headers: transport_options.extra_headers.clone(),
        })
    }

    /// Wrap an existing `reqwest` client, sharing its connection pool.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            extra_headers: None,
        }
    }

    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        add_extra_headers(request, &self.extra_headers)
    }

    fn with_json(&self, request: RequestBuilder, body: &Value) -> RequestBuilder {
        self.prepare(request)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
    }

    async fn read(request: RequestBuilder) -> Result<HttpResponse, ClientError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::with_client(Client::new())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, ClientError> {
        Self::read(self.prepare(self.client.get(url))).await
    }

    async fn post(&self, url: &str, body: &Value) -> Result<HttpResponse, ClientError> {
        Self::read(self.with_json(self.client.post(url), body)).await
    }

    async fn post_streamed(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<StreamedResponse, ClientError> {
        let response = self.with_json(self.client.post(url), body).send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed();
        Ok(StreamedResponse { status, body })
    }

    async fn put(&self, url: &str, body: &Value) -> Result<HttpResponse, ClientError> {
        Self::read(self.with_json(self.client.put(url), body)).await
    }

    async fn delete(&self, url: &str) -> Result<HttpResponse, ClientError> {
        Self::read(self.prepare(self.client.delete(url))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_http_client() {
        let transport_options = TransportOptions {
            timeout: Some(Duration::from_secs(30)),
            proxy: None,
            extra_headers: None,
        };

        let client = build_http_client(&transport_options);
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let transport_options = TransportOptions {
            timeout: None,
            proxy: Some("http://proxy.example.com:8080".to_string()),
            extra_headers: None,
        };

        let client = build_http_client(&transport_options);
        assert!(client.is_ok());
    }

    #[test]
    fn test_redact_strips_query() {
        assert_eq!(
            redact("https://host/v1/models/gemini-pro:generateContent?key=secret"),
            "https://host/v1/models/gemini-pro:generateContent"
        );
        assert_eq!(redact("https://host/models"), "https://host/models");
    }

    #[tokio::test]
    async fn test_post_sends_json_and_extra_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("x-trace", "abc"))
            .and(body_json(json!({"hello": "world"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let options = TransportOptions::new().with_header("x-trace".to_string(), "abc".to_string());
        let transport = ReqwestTransport::new(&options).unwrap();

        let response = transport
            .post(&format!("{}/echo", server.uri()), &json!({"hello": "world"}))
            .await
            .unwrap();

        assert_eq!(response, HttpResponse::new(200, "ok"));
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::default();
        let response = transport
            .get(&format!("{}/missing", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.body, "nope");
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_put_and_delete() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/item"))
            .and(body_json(json!({"v": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_string("put"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/item"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::default();
        let url = format!("{}/item", server.uri());

        assert_eq!(transport.put(&url, &json!({"v": 1})).await.unwrap().body, "put");
        assert_eq!(transport.delete(&url).await.unwrap().status, 204);
    }

    #[tokio::test]
    async fn test_post_streamed_exposes_body_bytes() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[{\"a\":1}]"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::default();
        let response = transport
            .post_streamed(&format!("{}/stream", server.uri()), &json!({}))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.into_text().await.unwrap(), "[{\"a\":1}]");
    }

    #[tokio::test]
    async fn test_partial_text_keeps_bytes_read_before_failure() {
        let chunks: Vec<Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from_static(b"{\"error\":")),
            Err(ClientError::unexpected("connection reset")),
            Ok(Bytes::from_static(b"never read")),
        ];
        let response = StreamedResponse {
            status: 500,
            body: futures::stream::iter(chunks).boxed(),
        };

        let (text, failure) = response.into_partial_text().await;
        assert_eq!(text, "{\"error\":");
        assert!(matches!(failure, Some(ClientError::Unexpected { .. })));
    }

    #[tokio::test]
    async fn test_connection_failure_is_unexpected() {
        let transport = ReqwestTransport::default();
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let err = transport.get("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, ClientError::Unexpected { .. }));
    }
}
