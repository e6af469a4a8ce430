//! Content hashing
//!
//! The hash function is a capability injected into the repository; object
//! ids are the hex digest it produces.

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::io::{self, Read};

use crate::object::ObjectId;

const READ_CHUNK: usize = 64 * 1024;

/// Hash function used to derive object ids
pub trait ContentHasher {
    /// Hash an in-memory buffer
    fn hash_bytes(&self, data: &[u8]) -> ObjectId;

    /// Hash a stream until EOF without buffering it whole
    fn hash_reader(&self, reader: &mut dyn Read) -> io::Result<ObjectId>;
}

fn digest_reader<D: Digest>(reader: &mut dyn Read) -> io::Result<ObjectId> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(ObjectId::from_digest(&hasher.finalize()))
}

/// SHA-1 hasher (40 hex characters)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Hasher;

impl ContentHasher for Sha1Hasher {
    fn hash_bytes(&self, data: &[u8]) -> ObjectId {
        ObjectId::from_digest(&Sha1::digest(data))
    }

    fn hash_reader(&self, reader: &mut dyn Read) -> io::Result<ObjectId> {
        digest_reader::<Sha1>(reader)
    }
}

/// SHA-256 hasher (64 hex characters)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hash_bytes(&self, data: &[u8]) -> ObjectId {
        ObjectId::from_digest(&Sha256::digest(data))
    }

    fn hash_reader(&self, reader: &mut dyn Read) -> io::Result<ObjectId> {
        digest_reader::<Sha256>(reader)
    }
}

/// Configurable hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    pub fn hasher(&self) -> Box<dyn ContentHasher> {
        match self {
            HashAlgorithm::Sha1 => Box::new(Sha1Hasher),
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher),
        }
    }
}
