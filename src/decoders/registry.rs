//! Ordered decoder table and URL dispatch

use super::{
    AniboomDecoder, CsstDecoder, Decoder, FilemoonDecoder, KodikDecoder, Mp4uploadDecoder,
    SibnetDecoder, UppodDecoder,
};
use crate::error::ResolveError;
use tracing::{debug, warn};

/// Routes embed URLs to host decoders.
///
/// Decoders are checked in registration order. First match wins.
pub struct Registry {
    decoders: Vec<Box<dyn Decoder>>,
    overlaps: Vec<(&'static str, &'static str)>,
}

impl Registry {
    /// A registry with no decoders
    pub fn empty() -> Self {
        Self {
            decoders: Vec::new(),
            overlaps: Vec::new(),
        }
    }

    /// All built-in decoders in their fixed order
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .register(KodikDecoder::new())
            .register(AniboomDecoder::new())
            .register(SibnetDecoder::new())
            .register(CsstDecoder::new())
            .register(Mp4uploadDecoder::new())
            .register(FilemoonDecoder::new())
            .register(UppodDecoder::new());
        registry
    }

    /// Append a decoder.
    ///
    /// Patterns that claim each other's sample URLs are logged and recorded
    /// in [`Registry::overlaps`]; the decoder is registered regardless and
    /// the earlier one keeps precedence.
    pub fn register<D: Decoder + 'static>(&mut self, decoder: D) -> &mut Self {
        for existing in &self.decoders {
            let claims_new = decoder.samples().iter().any(|url| existing.matches(url));
            let claimed_by_new = existing.samples().iter().any(|url| decoder.matches(url));
            if claims_new || claimed_by_new {
                warn!(
                    "Decoder {} overlaps with already registered {}",
                    decoder.name(),
                    existing.name()
                );
                self.overlaps.push((existing.name(), decoder.name()));
            }
        }

        debug!("Registered decoder: {}", decoder.name());
        self.decoders.push(Box::new(decoder));
        self
    }

    /// First decoder whose pattern matches the URL
    pub fn resolve(&self, url: &str) -> Option<&dyn Decoder> {
        let decoder = self.decoders.iter().find(|d| d.matches(url))?;
        debug!("Matched decoder: {}", decoder.name());
        Some(decoder.as_ref())
    }

    /// Like [`Registry::resolve`], for callers that cannot fall back to a direct link
    pub fn require(&self, url: &str) -> Result<&dyn Decoder, ResolveError> {
        self.resolve(url)
            .ok_or_else(|| ResolveError::NoDecoder(url.to_string()))
    }

    /// Decoder names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    /// `(registered earlier, registered later)` pairs with overlapping patterns
    pub fn overlaps(&self) -> &[(&'static str, &'static str)] {
        &self.overlaps
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("decoders", &self.names())
            .field("overlaps", &self.overlaps)
            .finish()
    }
}
