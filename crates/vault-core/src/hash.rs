use sha2::{Digest, Sha256};

/// `SHA-256(utf8(text))`, lower-hex. Used as `Chunk::content_hash`.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)
}

/// `SHA-256` of raw file bytes, lower-hex. Used as `SourceFile::hash`.
pub fn file_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// Deterministic chunk id: first 16 bytes of `SHA-256(source_id + ":" + content_hash)`,
/// formatted as a canonical UUID. Identical `(source_id, content_hash)` always
/// yields an identical id.
pub fn deterministic_chunk_id(source_id: &str, content_hash: &str) -> uuid::Uuid {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b":");
    hasher.update(content_hash.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("world"));
    }

    #[test]
    fn content_hash_matches_known_vector() {
        // echo -n hello | sha256sum
        assert_eq!(
            content_hash("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn chunk_id_is_pure_function_of_source_and_hash() {
        let a = deterministic_chunk_id("src-1", "abc123");
        let b = deterministic_chunk_id("src-1", "abc123");
        let c = deterministic_chunk_id("src-1", "abc124");
        let d = deterministic_chunk_id("src-2", "abc123");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}
