//! Canned-response transport for unit tests

use crate::error::ResolveError;
use crate::platform::client::{AsyncTransport, HttpRequest, HttpResponse, Method, Transport};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves registered responses by method and URL, counting every call.
///
/// Unregistered URLs answer 404 so a decoder under test sees the same shape
/// of failure a real host would give.
#[derive(Debug, Default)]
pub struct StubTransport {
    routes: Vec<(Method, String, HttpResponse)>,
    calls: AtomicUsize,
    log: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: Method, url: &str, status: u16, body: &str) -> Self {
        self.routes
            .push((method, url.to_string(), HttpResponse::new(status, url, body)));
        self
    }

    pub fn get(self, url: &str, body: &str) -> Self {
        self.route(Method::Get, url, 200, body)
    }

    pub fn post(self, url: &str, body: &str) -> Self {
        self.route(Method::Post, url, 200, body)
    }

    /// Number of requests served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request seen, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn respond(&self, request: &HttpRequest) -> HttpResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.log.lock() {
            log.push(request.clone());
        }

        self.routes
            .iter()
            .find(|(method, url, _)| *method == request.method && *url == request.url)
            .map(|(_, _, response)| response.clone())
            .unwrap_or_else(|| HttpResponse::new(404, request.url.clone(), "Not Found"))
    }
}

impl Transport for StubTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ResolveError> {
        Ok(self.respond(request))
    }
}

#[async_trait]
impl AsyncTransport for StubTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ResolveError> {
        Ok(self.respond(request))
    }
}
