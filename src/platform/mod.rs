//! HTTP transport, sessions and the deobfuscation primitives decoders share

pub mod cipher;
pub mod client;
pub mod packer;
pub mod session;

pub use client::{
    AsyncHttpClient, AsyncTransport, BlockingHttpClient, HttpClientConfig, HttpRequest,
    HttpResponse, Method, Transport,
};
pub use session::{AsyncSession, Session};
