//! Core functionality for vidresolve

pub mod pipeline;
pub mod video;
pub mod walk;

pub use pipeline::*;
pub use video::*;
pub use walk::*;
