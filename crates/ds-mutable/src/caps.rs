//! Mutable datashard capability strings
//!
//! Grammar (informally):
//!
//! ```text
//! mdsc:<access>.<suite>.<kd-digest>.<kd-key>[.<access-key>][/<n>[/<sub-digest>]]
//! ```
//!
//! `<access>` is `v`, `r` or `w`. The verify form has four dot-separated
//! fields; read and write forms have five, the last carrying the access key.
//! An optional version suffix hangs off the final field: `/<n>` with an
//! optional `/<sub-digest>`; the renderer always emits the trailing slash
//! after `<n>`, with the sub-digest appended only when present.
//!
//! Access level and field count must agree: `mdsc:r` with four fields is
//! malformed, as is `mdsc:v` with five.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use ds_shards::{Suite, SymmetricKey, Urn};

use crate::error::{Error, Result};

/// Optional version pin on a capability: a revision number and an optional
/// digest of the revision it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapVersion {
    pub n: u64,
    /// Empty when the capability names a revision number alone.
    pub digest: Vec<u8>,
}

impl CapVersion {
    fn parse(tokens: &[&str]) -> Result<Option<Self>> {
        if tokens.len() > 2 {
            return Err(Error::MalformedCap("too many version segments".to_owned()));
        }
        let Some(first) = tokens.first() else {
            return Ok(None);
        };
        let n: u64 = first
            .parse()
            .map_err(|_| Error::MalformedCap(format!("bad version number {first:?}")))?;
        let digest = match tokens.get(1) {
            Some(d) => URL_SAFE_NO_PAD
                .decode(d)
                .map_err(|e| Error::MalformedCap(format!("bad version digest: {e}")))?,
            None => Vec::new(),
        };
        Ok(Some(Self { n, digest }))
    }
}

/// The verifiable core every capability tier shares: which key-data shard
/// anchors the mutable object, and the key that decrypts it.
#[derive(Debug, Clone)]
pub struct VerifyCap {
    suite: Suite,
    key_data_digest: Vec<u8>,
    key_data_key: SymmetricKey,
    version: Option<CapVersion>,
}

impl VerifyCap {
    pub fn suite(&self) -> Suite {
        self.suite
    }

    pub fn key_data_digest(&self) -> &[u8] {
        &self.key_data_digest
    }

    pub fn key_data_key(&self) -> &SymmetricKey {
        &self.key_data_key
    }

    pub fn version(&self) -> Option<&CapVersion> {
        self.version.as_ref()
    }

    /// URN of the key-data shard this capability anchors to.
    pub fn key_data_urn(&self) -> Urn {
        Urn::from_digest(self.suite.urn_hash(), self.key_data_digest.clone())
    }

    fn base_string(&self, access: char) -> String {
        format!(
            "mdsc:{access}.{}.{}.{}",
            self.suite.as_str(),
            URL_SAFE_NO_PAD.encode(&self.key_data_digest),
            URL_SAFE_NO_PAD.encode(self.key_data_key.as_bytes()),
        )
    }

    fn version_suffix(&self) -> String {
        match &self.version {
            None => String::new(),
            Some(v) if v.digest.is_empty() => format!("/{}/", v.n),
            Some(v) => format!("/{}/{}", v.n, URL_SAFE_NO_PAD.encode(&v.digest)),
        }
    }
}

impl std::fmt::Display for VerifyCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.base_string('v'), self.version_suffix())
    }
}

/// Verify capability plus the symmetric key that decrypts revisions.
#[derive(Debug, Clone)]
pub struct ReadCap {
    verify: VerifyCap,
    read_key: SymmetricKey,
}

impl ReadCap {
    pub fn verify_cap(&self) -> VerifyCap {
        self.verify.clone()
    }

    pub fn read_key(&self) -> &SymmetricKey {
        &self.read_key
    }

    pub fn suite(&self) -> Suite {
        self.verify.suite()
    }

    pub fn version(&self) -> Option<&CapVersion> {
        self.verify.version()
    }

    pub fn key_data_urn(&self) -> Urn {
        self.verify.key_data_urn()
    }
}

impl std::fmt::Display for ReadCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}{}",
            self.verify.base_string('r'),
            URL_SAFE_NO_PAD.encode(self.read_key.as_bytes()),
            self.verify.version_suffix()
        )
    }
}

/// Verify capability plus the write key. Demotes to [`ReadCap`] by hashing
/// the write key.
#[derive(Debug, Clone)]
pub struct WriteCap {
    verify: VerifyCap,
    write_key: SymmetricKey,
}

impl WriteCap {
    pub fn read_cap(&self) -> ReadCap {
        ReadCap {
            verify: self.verify.clone(),
            read_key: derive_read_key(&self.write_key),
        }
    }

    pub fn verify_cap(&self) -> VerifyCap {
        self.verify.clone()
    }

    pub fn write_key(&self) -> &SymmetricKey {
        &self.write_key
    }

    pub fn suite(&self) -> Suite {
        self.verify.suite()
    }

    pub fn version(&self) -> Option<&CapVersion> {
        self.verify.version()
    }

    pub fn key_data_urn(&self) -> Urn {
        self.verify.key_data_urn()
    }
}

impl std::fmt::Display for WriteCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}{}",
            self.verify.base_string('w'),
            URL_SAFE_NO_PAD.encode(self.write_key.as_bytes()),
            self.verify.version_suffix()
        )
    }
}

/// The read key is derived from the write key, never stored beside it.
pub(crate) fn derive_read_key(write_key: &SymmetricKey) -> SymmetricKey {
    SymmetricKey::new(Sha256::digest(write_key.as_bytes()).to_vec())
}

/// Result of parsing an mdsc string: one of the three capability tiers.
#[derive(Debug, Clone)]
pub enum Cap {
    Verify(VerifyCap),
    Read(ReadCap),
    Write(WriteCap),
}

impl std::fmt::Display for Cap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cap::Verify(c) => c.fmt(f),
            Cap::Read(c) => c.fmt(f),
            Cap::Write(c) => c.fmt(f),
        }
    }
}

/// Parses a mutable datashard identifier into its capability.
pub fn parse_mdsc(s: &str) -> Result<Cap> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err(Error::MalformedCap("expecting 2 parts".to_owned()));
    }
    if parts[0] != "mdsc" {
        return Err(Error::MalformedCap("not prefixed with 'mdsc'".to_owned()));
    }
    let fields: Vec<&str> = parts[1].split('.').collect();
    if fields.len() < 4 || fields.len() > 5 {
        return Err(Error::MalformedCap(format!(
            "expecting 4 or 5 fields, got {}",
            fields.len()
        )));
    }

    let access = fields[0];
    let suite = Suite::parse(fields[1])?;
    let key_data_digest = URL_SAFE_NO_PAD
        .decode(fields[2])
        .map_err(|e| Error::MalformedCap(format!("bad key-data digest: {e}")))?;

    match (access, fields.len()) {
        ("v", 4) => {
            // The version suffix hangs off the fourth field.
            let tokens: Vec<&str> = fields[3].split('/').collect();
            let key_data_key = decode_key(tokens[0])?;
            Ok(Cap::Verify(VerifyCap {
                suite,
                key_data_digest,
                key_data_key,
                version: CapVersion::parse(&tokens[1..])?,
            }))
        }
        (access @ ("r" | "w"), 5) => {
            let key_data_key = decode_key(fields[3])?;
            let tokens: Vec<&str> = fields[4].split('/').collect();
            let access_key = decode_key(tokens[0])?;
            let verify = VerifyCap {
                suite,
                key_data_digest,
                key_data_key,
                version: CapVersion::parse(&tokens[1..])?,
            };
            if access == "r" {
                Ok(Cap::Read(ReadCap {
                    verify,
                    read_key: access_key,
                }))
            } else {
                Ok(Cap::Write(WriteCap {
                    verify,
                    write_key: access_key,
                }))
            }
        }
        ("v" | "r" | "w", _) => Err(Error::MalformedCap(
            "access level does not match field count".to_owned(),
        )),
        (other, _) => Err(Error::MalformedCap(format!(
            "unknown access level {other:?}"
        ))),
    }
}

fn decode_key(field: &str) -> Result<SymmetricKey> {
    URL_SAFE_NO_PAD
        .decode(field)
        .map(SymmetricKey::new)
        .map_err(|e| Error::MalformedCap(format!("bad key field: {e}")))
}
