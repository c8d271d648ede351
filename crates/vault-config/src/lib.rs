//! TOML-backed configuration for vaultkeep, following the load-or-default,
//! error-on-malformed-file pattern.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid exclude pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Semantic-chunker tuning knobs, mirrored 1:1 onto the chunker's options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub similarity_threshold: f32,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub delimiters: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            min_chunk_size: 100,
            max_chunk_size: 1000,
            delimiters: vec![
                ".".into(),
                "!".into(),
                "?".into(),
                "。".into(),
                "！".into(),
                "？".into(),
                "\n\n".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub data_path: PathBuf,
    pub embedding_dimension: usize,
    pub debounce_delay_ms: u64,
    pub lock_timeout_seconds: u64,
    pub max_retries: u32,
    pub allowed_extensions: Option<Vec<String>>,
    pub exclude_patterns: Vec<String>,
    pub embedding_sync_interval_secs: u64,
    pub embedding_batch_size: usize,
    pub chunking: ChunkingConfig,
    pub webdav_bind_addr: String,
    pub onnx_model_path: Option<PathBuf>,
    pub onnx_tokenizer_path: Option<PathBuf>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            embedding_dimension: 1024,
            debounce_delay_ms: 1000,
            lock_timeout_seconds: 300,
            max_retries: 3,
            allowed_extensions: None,
            exclude_patterns: vec![
                ".git".into(),
                ".vs".into(),
                "node_modules".into(),
                "bin".into(),
                "obj".into(),
            ],
            embedding_sync_interval_secs: 30,
            embedding_batch_size: 50,
            chunking: ChunkingConfig::default(),
            webdav_bind_addr: "127.0.0.1:8484".into(),
            onnx_model_path: None,
            onnx_tokenizer_path: None,
        }
    }
}

fn default_data_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vaultkeep")
}

impl VaultConfig {
    /// Load configuration from `path` if given, else from `<cwd>/vault.toml`
    /// if present, else fall back to defaults. A missing file is not an
    /// error; a present-but-malformed file is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidate = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("vault.toml"));

        if !candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&candidate).map_err(|source| ConfigError::Read {
            path: candidate.clone(),
            source,
        })?;

        let config: VaultConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: candidate.clone(),
            source,
        })?;

        tracing::info!(path = %candidate.display(), "loaded config");
        Ok(config)
    }

    /// Compile `exclude_patterns` into a matcher. Exclusion matches any path
    /// segment, case-insensitively.
    pub fn exclude_matcher(&self) -> Result<ExcludeMatcher> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_patterns {
            let glob = Glob::new(&format!("**/{pattern}/**")).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| ConfigError::Pattern {
            pattern: "<compiled set>".into(),
            source,
        })?;
        Ok(ExcludeMatcher { set })
    }

    /// Whether the given extension (no leading dot) is allowed by
    /// `allowed_extensions`. `None` means "all extensions".
    pub fn extension_allowed(&self, ext: &str) -> bool {
        match &self.allowed_extensions {
            None => true,
            Some(allowed) => {
                let set: HashSet<&str> = allowed.iter().map(|s| s.as_str()).collect();
                set.contains(ext)
            }
        }
    }
}

pub struct ExcludeMatcher {
    set: GlobSet,
}

impl ExcludeMatcher {
    pub fn is_excluded(&self, path: &str) -> bool {
        self.set.is_match(path.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_nonexistent_file_returns_defaults() {
        let config = VaultConfig::load(Some(Path::new("/nonexistent/path/vault.toml"))).unwrap();
        assert_eq!(config, VaultConfig::default());
    }

    #[test]
    fn load_with_invalid_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        let result = VaultConfig::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_with_valid_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.toml");
        std::fs::write(
            &path,
            r#"
            embedding_dimension = 768
            max_retries = 5
            "#,
        )
        .unwrap();
        let config = VaultConfig::load(Some(&path)).unwrap();
        assert_eq!(config.embedding_dimension, 768);
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn exclude_matcher_matches_any_segment() {
        let config = VaultConfig::default();
        let matcher = config.exclude_matcher().unwrap();
        assert!(matcher.is_excluded("repo/node_modules/pkg/index.js"));
        assert!(matcher.is_excluded("repo/.git/HEAD"));
        assert!(!matcher.is_excluded("repo/src/main.rs"));
    }
}
