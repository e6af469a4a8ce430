//! Repository configuration stored at `.grove/config.json`

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::compress::{self, Codec, ZstdCodec};
use crate::content::{self, SizePolicy};
use crate::error::Result;
use crate::hash::HashAlgorithm;

/// File name of the configuration inside the repository directory
pub const CONFIG_FILE: &str = "config.json";

/// Per-repository settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Author recorded on commits and reflog entries
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    /// Hash used for object ids
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    /// zstd level for blob payloads
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    /// Files up to this size (bytes) are read fully into memory
    #[serde(default = "default_small_file_threshold")]
    pub small_file_threshold: u64,
    /// Files above this size (bytes) cannot be staged
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_compression_level() -> i32 {
    compress::DEFAULT_LEVEL
}

fn default_small_file_threshold() -> u64 {
    content::DEFAULT_SMALL_THRESHOLD
}

fn default_max_file_size() -> u64 {
    content::DEFAULT_MAX_SIZE
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            author_name: String::new(),
            author_email: String::new(),
            hash_algorithm: HashAlgorithm::default(),
            compression_level: default_compression_level(),
            small_file_threshold: default_small_file_threshold(),
            max_file_size: default_max_file_size(),
        }
    }
}

impl RepoConfig {
    /// Load the config from a repository directory, falling back to defaults
    pub fn load(repo_dir: &Path) -> Result<Self> {
        let config_path = repo_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&config_path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save the config to a repository directory
    pub fn save(&self, repo_dir: &Path) -> Result<()> {
        fs::create_dir_all(repo_dir)?;
        let config_path = repo_dir.join(CONFIG_FILE);
        let tmp_path = config_path.with_extension("tmp");
        let data = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, &config_path)?;
        Ok(())
    }

    pub fn size_policy(&self) -> SizePolicy {
        SizePolicy {
            small_threshold: self.small_file_threshold,
            max_size: self.max_file_size,
        }
    }

    pub fn codec(&self) -> Box<dyn Codec> {
        Box::new(ZstdCodec::new(self.compression_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = RepoConfig::load(tmp.path()).unwrap();
        assert_eq!(config, RepoConfig::default());
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha1);
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let config = RepoConfig {
            author_name: "Ada".into(),
            author_email: "ada@example.com".into(),
            hash_algorithm: HashAlgorithm::Sha256,
            ..RepoConfig::default()
        };
        config.save(tmp.path()).unwrap();
        assert_eq!(RepoConfig::load(tmp.path()).unwrap(), config);
        assert!(!tmp.path().join("config.tmp").exists());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), r#"{"author_name": "Bo"}"#).unwrap();
        let config = RepoConfig::load(tmp.path()).unwrap();
        assert_eq!(config.author_name, "Bo");
        assert_eq!(config.compression_level, compress::DEFAULT_LEVEL);
        assert_eq!(config.max_file_size, content::DEFAULT_MAX_SIZE);
    }
}
