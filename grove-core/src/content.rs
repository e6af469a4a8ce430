//! Size-threshold read policy for worktree files
//!
//! Small files are read fully into memory; larger files are streamed
//! through the hasher or codec in fixed-size chunks so peak memory stays
//! bounded. Files above the hard limit are rejected.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::compress::Codec;
use crate::error::{GroveError, Result};
use crate::hash::ContentHasher;
use crate::object::ObjectId;

/// Files below this size are read in one go
pub const DEFAULT_SMALL_THRESHOLD: u64 = 32 * 1024;
/// Files of this size or larger are unsupported
pub const DEFAULT_MAX_SIZE: u64 = 512 * 1024 * 1024;

/// How a file's bytes are fed to the hasher or codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    InMemory,
    Streaming,
}

/// Size thresholds selecting a [`ReadStrategy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePolicy {
    pub small_threshold: u64,
    pub max_size: u64,
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            small_threshold: DEFAULT_SMALL_THRESHOLD,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl SizePolicy {
    pub fn classify(&self, path: &Path, size: u64) -> Result<ReadStrategy> {
        if size < self.small_threshold {
            Ok(ReadStrategy::InMemory)
        } else if size < self.max_size {
            Ok(ReadStrategy::Streaming)
        } else {
            Err(GroveError::UnsupportedFileSize {
                path: path.to_path_buf(),
                size,
                limit: self.max_size,
            })
        }
    }
}

/// Hashes and compresses worktree files according to a [`SizePolicy`]
pub struct ContentReader<'a> {
    hasher: &'a dyn ContentHasher,
    codec: &'a dyn Codec,
    policy: SizePolicy,
}

impl<'a> ContentReader<'a> {
    pub fn new(hasher: &'a dyn ContentHasher, codec: &'a dyn Codec, policy: SizePolicy) -> Self {
        Self {
            hasher,
            codec,
            policy,
        }
    }

    /// Hash the raw content of a file
    pub fn hash_file(&self, path: &Path) -> Result<ObjectId> {
        let (file, strategy) = self.open(path)?;
        match strategy {
            ReadStrategy::InMemory => {
                drop(file);
                Ok(self.hasher.hash_bytes(&std::fs::read(path)?))
            }
            ReadStrategy::Streaming => {
                let mut reader = BufReader::new(file);
                Ok(self.hasher.hash_reader(&mut reader)?)
            }
        }
    }

    /// Compress the content of a file, returning `(compressed, raw_size)`
    pub fn compress_file(&self, path: &Path) -> Result<(Vec<u8>, u64)> {
        let (file, strategy) = self.open(path)?;
        let size = file.metadata()?.len();
        let compressed = match strategy {
            ReadStrategy::InMemory => {
                drop(file);
                self.codec.compress_bytes(&std::fs::read(path)?)?
            }
            ReadStrategy::Streaming => {
                let mut reader = BufReader::new(file);
                self.codec.compress(&mut reader)?
            }
        };
        Ok((compressed, size))
    }

    fn open(&self, path: &Path) -> Result<(File, ReadStrategy)> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let strategy = self.policy.classify(path, size)?;
        Ok((file, strategy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::ZstdCodec;
    use crate::hash::Sha1Hasher;
    use tempfile::TempDir;

    fn policy() -> SizePolicy {
        SizePolicy {
            small_threshold: 8,
            max_size: 64,
        }
    }

    #[test]
    fn test_classify_thresholds() {
        let p = policy();
        let path = Path::new("f");
        assert_eq!(p.classify(path, 0).unwrap(), ReadStrategy::InMemory);
        assert_eq!(p.classify(path, 7).unwrap(), ReadStrategy::InMemory);
        assert_eq!(p.classify(path, 8).unwrap(), ReadStrategy::Streaming);
        assert_eq!(p.classify(path, 63).unwrap(), ReadStrategy::Streaming);
        assert!(matches!(
            p.classify(path, 64),
            Err(GroveError::UnsupportedFileSize { size: 64, limit: 64, .. })
        ));
        assert!(p.classify(path, 65).is_err());
    }

    #[test]
    fn test_streamed_hash_matches_in_memory() {
        let tmp = TempDir::new().unwrap();
        let small = tmp.path().join("small");
        let medium = tmp.path().join("medium");
        std::fs::write(&small, b"tiny").unwrap();
        std::fs::write(&medium, b"0123456789abcdefghij").unwrap();

        let codec = ZstdCodec::default();
        let reader = ContentReader::new(&Sha1Hasher, &codec, policy());

        assert_eq!(reader.hash_file(&small).unwrap(), Sha1Hasher.hash_bytes(b"tiny"));
        assert_eq!(
            reader.hash_file(&medium).unwrap(),
            Sha1Hasher.hash_bytes(b"0123456789abcdefghij")
        );

        let (compressed, size) = reader.compress_file(&medium).unwrap();
        assert_eq!(size, 20);
        assert_eq!(codec.decompress(&compressed).unwrap(), b"0123456789abcdefghij");
    }

    #[test]
    fn test_oversized_file_rejected() {
        let tmp = TempDir::new().unwrap();
        let big = tmp.path().join("big");
        std::fs::write(&big, vec![1u8; 100]).unwrap();

        let codec = ZstdCodec::default();
        let reader = ContentReader::new(&Sha1Hasher, &codec, policy());
        assert!(matches!(
            reader.hash_file(&big),
            Err(GroveError::UnsupportedFileSize { .. })
        ));
        assert!(matches!(
            reader.compress_file(&big),
            Err(GroveError::UnsupportedFileSize { .. })
        ));
    }
}
