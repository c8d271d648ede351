use async_trait::async_trait;
use vault_core::{Result, TextExtraction, TextExtractor, VaultError};

const SUPPORTED: &[&str] = &[
    "txt", "md", "markdown", "csv", "json", "xml", "html", "htm", "log", "ini", "cfg", "yaml",
    "yml",
];

/// Reads the whole file as UTF-8 and yields a single extraction containing
/// the entire body. Required default coverage for the plain-text-shaped
/// extension set.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn supports(&self, ext: &str) -> bool {
        SUPPORTED.contains(&ext.to_lowercase().as_str())
    }

    async fn extract_path(&self, path: &std::path::Path) -> Result<Vec<TextExtraction>> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| VaultError::InputNotFound(format!("{}: {e}", path.display())))?;
        let content_type = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("text/plain")
            .to_string();
        self.extract_bytes(&bytes, &content_type).await
    }

    async fn extract_bytes(&self, bytes: &[u8], content_type: &str) -> Result<Vec<TextExtraction>> {
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| VaultError::Extraction(format!("invalid UTF-8: {e}")))?;
        Ok(vec![TextExtraction {
            text,
            content_type: content_type.to_string(),
            page_number: None,
            source_location: None,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_is_case_insensitive() {
        let extractor = PlainTextExtractor;
        assert!(extractor.supports("MD"));
        assert!(extractor.supports("txt"));
        assert!(!extractor.supports("pdf"));
    }

    #[tokio::test]
    async fn extract_bytes_yields_one_record_with_full_body() {
        let extractor = PlainTextExtractor;
        let extractions = extractor
            .extract_bytes(b"hello world", "text/plain")
            .await
            .unwrap();
        assert_eq!(extractions.len(), 1);
        assert_eq!(extractions[0].text, "hello world");
    }

    #[tokio::test]
    async fn extract_bytes_rejects_invalid_utf8() {
        let extractor = PlainTextExtractor;
        let err = extractor.extract_bytes(&[0xff, 0xfe, 0xfd], "text/plain").await;
        assert!(err.is_err());
    }
}
