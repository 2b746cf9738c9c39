//! Content-address hash algorithms

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Hash algorithms usable in a datashards URN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgo {
    /// SHA-256 applied twice: `sha256(sha256(content))`.
    Sha256d,
}

impl HashAlgo {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "sha256d" => Ok(HashAlgo::Sha256d),
            other => Err(Error::UnknownHash(other.to_owned())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgo::Sha256d => "sha256d",
        }
    }

    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgo::Sha256d => 32,
        }
    }

    pub fn digest(&self, content: &[u8]) -> Vec<u8> {
        match self {
            HashAlgo::Sha256d => {
                let once = Sha256::digest(content);
                Sha256::digest(once).to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_token_is_rejected() {
        assert!(matches!(
            HashAlgo::parse("sha256"),
            Err(Error::UnknownHash(_))
        ));
    }

    #[test]
    fn token_roundtrip() {
        assert_eq!(HashAlgo::parse("sha256d").unwrap().as_str(), "sha256d");
    }

    #[test]
    fn doubled_hash_differs_from_single() {
        let content = b"hello world";
        let single = Sha256::digest(content).to_vec();
        let doubled = HashAlgo::Sha256d.digest(content);
        assert_ne!(single, doubled);
        assert_eq!(doubled.len(), HashAlgo::Sha256d.digest_len());
        assert_eq!(doubled, Sha256::digest(single).to_vec());
    }
}
