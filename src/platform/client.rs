//! HTTP transport used by the decoders and providers
//!
//! Decoders never touch reqwest directly: they describe a request as an
//! [`HttpRequest`] and hand it to a [`Transport`] (blocking) or
//! [`AsyncTransport`] (async). That keeps the extraction logic identical in
//! both modes and lets tests substitute canned responses.

use crate::error::ResolveError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Desktop Chrome, accepted by every supported host
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Transport-independent description of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            params: Vec::new(),
            form: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a query parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Add an `application/x-www-form-urlencoded` body field
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Buffered response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after redirects
    pub url: String,
    pub body: String,
    pub cookies: BTreeMap<String, String>,
}

impl HttpResponse {
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            body: body.into(),
            cookies: BTreeMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ResolveError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Turn a non-2xx status into [`ResolveError::RemoteUnavailable`]
    pub fn ensure_success(self) -> Result<Self, ResolveError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ResolveError::RemoteUnavailable {
                status: self.status,
                url: self.url,
                reason: format!("HTTP status {}", self.status),
            })
        }
    }
}

/// Blocking transport
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ResolveError>;
}

/// Async transport
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ResolveError>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: Option<String>,
    /// Proxy URL
    pub proxy_url: Option<String>,
    /// Default Accept-Language header
    pub accept_language: String,
    /// Force HTTP/1.1 only (disable HTTP/2)
    pub http1_only: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            proxy_url: None,
            accept_language: "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            http1_only: false,
        }
    }
}

impl HttpClientConfig {
    fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    fn proxy(&self) -> Result<Option<reqwest::Proxy>, ResolveError> {
        match &self.proxy_url {
            Some(proxy_url) => Ok(Some(reqwest::Proxy::all(proxy_url)?)),
            None => Ok(None),
        }
    }

    /// Headers sent with every request, fixed when the client is built
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        if let Ok(language) = HeaderValue::from_str(&self.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, language);
        }
        headers
    }
}

/// Per-request headers; they override the defaults for this request only
fn header_map(request: &HttpRequest) -> Result<HeaderMap, ResolveError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ResolveError::extraction(request.url.clone(), format!("valid header name {:?}", name))
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            ResolveError::extraction(request.url.clone(), format!("valid value for header {}", name))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Async reqwest-backed transport
#[derive(Debug, Clone)]
pub struct AsyncHttpClient {
    client: reqwest::Client,
    config: HttpClientConfig,
}

impl AsyncHttpClient {
    /// Create a client with default configuration
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self, ResolveError> {
        let mut builder = reqwest::ClientBuilder::new()
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .default_headers(config.default_headers())
            .user_agent(config.user_agent());

        if config.http1_only {
            builder = builder.http1_only();
        }
        if let Some(proxy) = config.proxy()? {
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Get client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ResolveError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(header_map(request)?);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let cookies = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            url,
            body,
            cookies,
        })
    }
}

#[async_trait]
impl AsyncTransport for AsyncHttpClient {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ResolveError> {
        debug!("{} {}", request.method.as_str(), request.url);
        let response = self.send(request).await?;
        if !response.is_success() {
            warn!("HTTP request failed with status: {}", response.status);
        }
        Ok(response)
    }
}

/// Blocking reqwest-backed transport.
///
/// Must not be constructed or used from inside an async runtime.
#[derive(Debug, Clone)]
pub struct BlockingHttpClient {
    client: reqwest::blocking::Client,
    config: HttpClientConfig,
}

impl BlockingHttpClient {
    /// Create a client with default configuration
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self, ResolveError> {
        let mut builder = reqwest::blocking::ClientBuilder::new()
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .default_headers(config.default_headers())
            .user_agent(config.user_agent());

        if config.http1_only {
            builder = builder.http1_only();
        }
        if let Some(proxy) = config.proxy()? {
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Get client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ResolveError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(header_map(request)?);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let cookies = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let body = response.text()?;

        Ok(HttpResponse {
            status,
            url,
            body,
            cookies,
        })
    }
}

impl Transport for BlockingHttpClient {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ResolveError> {
        debug!("{} {}", request.method.as_str(), request.url);
        let response = self.send(request)?;
        if !response.is_success() {
            warn!("HTTP request failed with status: {}", response.status);
        }
        Ok(response)
    }
}
