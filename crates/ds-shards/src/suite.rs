//! Suite registry
//!
//! A suite names one bundle of algorithm choices. Suite `0p` binds AES-CTR
//! for shard payloads, SHA-256 for IV mixing and signature digests, and
//! SHA-256d for content addresses. Every place a suite token is decoded must
//! reject unknown tokens.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::hash::HashAlgo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    /// The `0p` protocol-zero suite.
    ProtoZero,
}

impl Suite {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "0p" => Ok(Suite::ProtoZero),
            other => Err(Error::UnknownSuite(other.to_owned())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Suite::ProtoZero => "0p",
        }
    }

    /// The hash algorithm used for this suite's content addresses.
    pub fn urn_hash(&self) -> HashAlgo {
        match self {
            Suite::ProtoZero => HashAlgo::Sha256d,
        }
    }

    /// Block size of the suite's cipher; also the IV length.
    pub fn block_size(&self) -> usize {
        match self {
            Suite::ProtoZero => 16,
        }
    }

    /// Hashes raw IV material before truncation to the block size.
    pub fn iv_digest(&self, material: &[u8]) -> Vec<u8> {
        match self {
            Suite::ProtoZero => Sha256::digest(material).to_vec(),
        }
    }

    /// Digest applied to a message prior to signing or verifying it.
    pub fn signature_digest(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Suite::ProtoZero => Sha256::digest(message).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip() {
        assert_eq!(Suite::parse("0p").unwrap(), Suite::ProtoZero);
        assert_eq!(Suite::ProtoZero.as_str(), "0p");
    }

    #[test]
    fn unknown_token_is_rejected() {
        assert!(matches!(Suite::parse("1p"), Err(Error::UnknownSuite(_))));
        assert!(matches!(Suite::parse(""), Err(Error::UnknownSuite(_))));
    }

    #[test]
    fn proto_zero_bindings() {
        assert_eq!(Suite::ProtoZero.urn_hash(), HashAlgo::Sha256d);
        assert_eq!(Suite::ProtoZero.block_size(), 16);
        assert_eq!(Suite::ProtoZero.iv_digest(b"x").len(), 32);
    }
}
