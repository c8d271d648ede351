mod plain_text;

pub use plain_text::PlainTextExtractor;

use vault_core::TextExtractor;

/// Default extractor set: a plain-text extractor covering every required
/// extension. Additional extractors can be prepended/appended by callers
/// that need richer content-type handling.
pub fn default_extractors() -> Vec<Box<dyn TextExtractor>> {
    vec![Box::new(PlainTextExtractor::default())]
}
