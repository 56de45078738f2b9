//! HTTP transport
//!
//! The client builds a fully signed [`HttpRequest`] and hands it to a
//! [`Transport`]. [`ReqwestTransport`] is the production implementation;
//! tests substitute their own to observe requests without touching the
//! network.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::error::{LbcError, LbcResult};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP verb of an API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVerb {
    Get,
    #[default]
    Post,
}

impl HttpVerb {
    /// Exactly `"GET"` is a GET, anything else is submitted as a POST
    pub fn parse(verb: &str) -> Self {
        if verb == "GET" {
            Self::Get
        } else {
            Self::Post
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl FromStr for HttpVerb {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for HttpVerb {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request ready to go on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub verb: HttpVerb,
    /// Absolute URL, query string included for GET
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Form-encoded body, `None` for GET
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response: status and body text, unparsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Only connection-level failures are errors here;
    /// any response that arrives, whatever its status, is returned.
    async fn send(&self, request: HttpRequest) -> LbcResult<HttpResponse>;
}

/// [`Transport`] backed by a `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> LbcResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LbcError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    pub fn from_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> LbcResult<HttpResponse> {
        let mut builder = match request.verb {
            HttpVerb::Get => self.http_client.get(&request.url),
            HttpVerb::Post => self.http_client.post(&request.url),
        };

        let has_content_type = request.header(CONTENT_TYPE.as_str()).is_some();
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            if !has_content_type {
                builder = builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE);
            }
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}
