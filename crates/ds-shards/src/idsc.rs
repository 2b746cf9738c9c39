//! Immutable datashard capabilities
//!
//! An IDSC is a URN plus the symmetric key that decrypts the addressed
//! content: `idsc:<suite>.<base64url digest>.<base64url key>`. Handing one
//! out grants both location and access.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::error::{Error, Result};
use crate::keys::SymmetricKey;
use crate::suite::Suite;
use crate::urn::Urn;

#[derive(Debug, Clone)]
pub struct Idsc {
    suite: Suite,
    digest: Vec<u8>,
    key: SymmetricKey,
}

impl Idsc {
    /// Addresses `ciphertext` under the suite's content hash and pairs the
    /// address with the key it was encrypted with.
    pub fn new(suite: Suite, ciphertext: &[u8], key: SymmetricKey) -> Self {
        Self {
            suite,
            digest: suite.urn_hash().digest(ciphertext),
            key,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return Err(Error::MalformedAddress(
                "idsc: expecting 2 parts".to_owned(),
            ));
        }
        if parts[0] != "idsc" {
            return Err(Error::MalformedAddress(
                "idsc: not prefixed with 'idsc'".to_owned(),
            ));
        }
        let fields: Vec<&str> = parts[1].split('.').collect();
        if fields.len() != 3 {
            return Err(Error::MalformedAddress(
                "idsc: expecting 3 fields".to_owned(),
            ));
        }
        let suite = Suite::parse(fields[0])?;
        let digest = URL_SAFE_NO_PAD
            .decode(fields[1])
            .map_err(|e| Error::MalformedAddress(format!("idsc digest: {e}")))?;
        let key = URL_SAFE_NO_PAD
            .decode(fields[2])
            .map_err(|e| Error::MalformedAddress(format!("idsc key: {e}")))?;
        Ok(Self {
            suite,
            digest,
            key: SymmetricKey::new(key),
        })
    }

    /// The key-less address: same digest, no decryption capability.
    pub fn urn(&self) -> Urn {
        Urn::from_digest(self.suite.urn_hash(), self.digest.clone())
    }

    pub fn suite(&self) -> Suite {
        self.suite
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.key
    }
}

impl std::fmt::Display for Idsc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "idsc:{}.{}.{}",
            self.suite.as_str(),
            URL_SAFE_NO_PAD.encode(&self.digest),
            URL_SAFE_NO_PAD.encode(self.key.as_bytes())
        )
    }
}
