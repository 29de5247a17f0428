//! Caller-owned handles bundling a transport with the decoder registry
//!
//! A session is built once and cloned into every pipeline stage and decoder
//! call; nothing in the crate keeps a process-wide client.

use crate::core::video::Video;
use crate::decoders::Registry;
use crate::error::ResolveError;
use crate::platform::client::{
    AsyncHttpClient, AsyncTransport, BlockingHttpClient, HttpClientConfig, Transport,
};
use std::sync::Arc;
use tracing::debug;

/// Blocking session
#[derive(Clone)]
pub struct Session {
    http: Arc<dyn Transport>,
    registry: Arc<Registry>,
}

impl Session {
    /// reqwest blocking client plus the built-in decoders
    pub fn new(config: HttpClientConfig) -> Result<Self, ResolveError> {
        Ok(Self::with_transport(
            Arc::new(BlockingHttpClient::with_config(config)?),
            Arc::new(Registry::builtin()),
        ))
    }

    pub fn with_transport(http: Arc<dyn Transport>, registry: Arc<Registry>) -> Self {
        Self { http, registry }
    }

    pub fn http(&self) -> &dyn Transport {
        self.http.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Videos behind an embed URL.
    ///
    /// URLs no decoder claims are treated as direct media links.
    pub fn resolve_videos(&self, url: &str) -> Result<Vec<Video>, ResolveError> {
        match self.registry.resolve(url) {
            Some(decoder) => decoder.parse(self.http(), url),
            None => {
                debug!("No decoder for {}, using it as a direct link", url);
                Ok(vec![Video::direct(url)])
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Async session
#[derive(Clone)]
pub struct AsyncSession {
    http: Arc<dyn AsyncTransport>,
    registry: Arc<Registry>,
}

impl AsyncSession {
    /// reqwest async client plus the built-in decoders
    pub fn new(config: HttpClientConfig) -> Result<Self, ResolveError> {
        Ok(Self::with_transport(
            Arc::new(AsyncHttpClient::with_config(config)?),
            Arc::new(Registry::builtin()),
        ))
    }

    pub fn with_transport(http: Arc<dyn AsyncTransport>, registry: Arc<Registry>) -> Self {
        Self { http, registry }
    }

    pub fn http(&self) -> &dyn AsyncTransport {
        self.http.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Videos behind an embed URL.
    ///
    /// URLs no decoder claims are treated as direct media links.
    pub async fn resolve_videos(&self, url: &str) -> Result<Vec<Video>, ResolveError> {
        match self.registry.resolve(url) {
            Some(decoder) => decoder.parse_async(self.http(), url).await,
            None => {
                debug!("No decoder for {}, using it as a direct link", url);
                Ok(vec![Video::direct(url)])
            }
        }
    }
}

impl std::fmt::Debug for AsyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSession")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
