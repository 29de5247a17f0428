//! Utility functions for vidresolve

pub mod mime;
pub mod url;

#[cfg(test)]
pub mod testing;

pub use mime::*;
pub use url::*;
