//! Signed request sender
//!
//! Builds a SigV4-signed HTTP request and performs exactly one round trip.
//! Credentials are resolved before any network activity, so a missing
//! credential surfaces as [`Error::Auth`] without touching the wire.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::auth::{CredentialChain, ProvideCredentials, Signer};
use crate::config::Config;
use crate::error::Error;
use crate::Result;

/// Ordered body chunks as they arrive from the transport.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>>>;

/// HTTP methods the sender accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(Error::Transport(format!("Unsupported HTTP method: {other}"))),
        }
    }
}

/// Everything needed to sign and send one request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub body: Option<Vec<u8>>,
    pub headers: HashMap<String, String>,
    /// Service name in the signing scope
    pub service: String,
    /// Region in the signing scope
    pub region: String,
}

impl OutboundRequest {
    pub fn new(method: HttpMethod, url: Url, service: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            url,
            method,
            body: None,
            headers: HashMap::new(),
            service: service.into(),
            region: region.into(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Transport-level response: status, headers and the streaming body.
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: ChunkStream,
}

impl RawResponse {
    /// Build a response from in-memory chunks.
    pub fn from_chunks(status: u16, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: stream::iter(chunks.into_iter().map(Ok)).boxed(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into a lossy string (used for error reporting).
    pub async fn text_lossy(self) -> Result<String> {
        let mut bytes = Vec::new();
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Request sender trait - the network seam.
#[async_trait]
pub trait RequestSender: Send + Sync {
    /// Sign and send a request, returning the streaming response.
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse>;
}

/// Sender that signs with SigV4 and transmits with reqwest.
pub struct SigV4Sender {
    client: Client,
    credentials: Box<dyn ProvideCredentials>,
}

impl SigV4Sender {
    /// Create a sender with a credential source and request deadline.
    pub fn new(credentials: impl ProvideCredentials + 'static, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials: Box::new(credentials),
        })
    }

    /// Default credential chain and the configured timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            CredentialChain::default_chain(config.profile.as_deref()),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl RequestSender for SigV4Sender {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse> {
        let credentials = self.credentials.resolve()?;

        let body = request.body.unwrap_or_default();
        let signer = Signer::new(&credentials, &request.region, &request.service);
        let signed = signer.sign(
            request.method.as_str(),
            &request.url,
            &request.headers,
            &body,
            Utc::now(),
        )?;

        debug!(
            "Signed {} {} for {}/{}",
            request.method, request.url, request.region, request.service
        );

        let mut builder = self
            .client
            .request(request.method.to_reqwest(), request.url.clone());
        for (name, value) in &signed.headers {
            // reqwest derives Host from the URL
            if name != "host" {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        info!("Agent runtime responded with HTTP {}", status);

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(Error::from))
            .boxed();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Canned reply for [`FakeSender`].
#[cfg(test)]
pub enum FakeReply {
    Chunks(u16, Vec<Vec<u8>>),
    Fail(String),
}

/// Fake sender for testing - replays canned responses and records requests.
#[cfg(test)]
pub struct FakeSender {
    replies: std::sync::Mutex<std::collections::VecDeque<FakeReply>>,
    pub requests: std::sync::Mutex<Vec<OutboundRequest>>,
}

#[cfg(test)]
impl FakeSender {
    pub fn new(replies: Vec<FakeReply>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A single 200 response made of the given chunks.
    pub fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self::new(vec![FakeReply::Chunks(200, chunks)])
    }
}

#[cfg(test)]
#[async_trait]
impl RequestSender for FakeSender {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(FakeReply::Chunks(status, chunks)) => Ok(RawResponse::from_chunks(status, chunks)),
            Some(FakeReply::Fail(message)) => Err(Error::Transport(message)),
            None => Err(Error::Transport("No more fake responses".to_string())),
        }
    }
}
