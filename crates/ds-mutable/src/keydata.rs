//! Key-data envelope
//!
//! A mutable datashard is anchored by an RSA keypair stored as an immutable
//! shard. On the wire the envelope pairs the public key with the private key
//! encrypted at rest:
//!
//! ```text
//! ["keydata",
//!  ["rsa-pcks1-sha256", {n: <int>, e: <int>}],
//!  ["rsa-pcks1-sha256", <encrypted private blob>]]
//! ```
//!
//! The blob is the encoded private-key mapping (`d, dp, dq, e, n, p, q,
//! qInv`) passed through AES-CTR with a zero IV under the wrap key. The zero
//! IV is acceptable only because each wrap key encrypts exactly one blob;
//! reusing a wrap key for a second, different plaintext would leak the XOR of
//! the two.

use ds_codec::{decode, encode, Value};
use ds_shards::crypt::apply_ctr;
use ds_shards::{Suite, SymmetricKey};
use num_bigint_dig::{BigInt, BigUint};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{Error, Result};

const TAG_KEYDATA: &str = "keydata";
// Historical spelling; wire-visible, so it stays.
const KEY_NOTE: &str = "rsa-pcks1-sha256";

/// Envelope with the private half still encrypted. Enough to verify.
#[derive(Debug, Clone)]
pub struct EncryptedKeyData {
    public: RsaPublicKey,
    enc_private: Vec<u8>,
}

impl EncryptedKeyData {
    pub fn new(public: RsaPublicKey, enc_private: Vec<u8>) -> Self {
        Self {
            public,
            enc_private,
        }
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self> {
        let (public, enc_private) = parse_outer(bytes)?;
        Ok(Self {
            public,
            enc_private,
        })
    }

    pub fn marshal(&self) -> Vec<u8> {
        encode_outer(&self.public, &self.enc_private)
    }
}

/// Envelope with the private half available. Enough to sign new revisions.
#[derive(Clone)]
pub struct DecryptedKeyData {
    public: RsaPublicKey,
    private: RsaPrivateKey,
    wrap_key: SymmetricKey,
    suite: Suite,
}

impl DecryptedKeyData {
    /// Wraps an existing keypair. The wrap key must be fresh for this
    /// envelope; see the module note on the zero IV.
    pub fn new(mut private: RsaPrivateKey, wrap_key: SymmetricKey, suite: Suite) -> Result<Self> {
        private
            .precompute()
            .map_err(|e| Error::CryptoFailure(format!("precomputing CRT values: {e}")))?;
        Ok(Self {
            public: private.to_public_key(),
            private,
            wrap_key,
            suite,
        })
    }

    /// Decodes an envelope and decrypts its private half with `wrap_key`.
    pub fn unmarshal(bytes: &[u8], wrap_key: SymmetricKey, suite: Suite) -> Result<Self> {
        let (public, enc_private) = parse_outer(bytes)?;
        let blob = wrap_cipher(&enc_private, &wrap_key, suite)?;
        let dict = decode(&blob)?;

        let n = field_uint(&dict, "n")?;
        let e = field_uint(&dict, "e")?;
        let d = field_uint(&dict, "d")?;
        let p = field_uint(&dict, "p")?;
        let q = field_uint(&dict, "q")?;
        // Present on the wire; recomputed below rather than trusted.
        field_uint(&dict, "dp")?;
        field_uint(&dict, "dq")?;
        field_int(&dict, "qInv")?;

        let mut private = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| Error::CryptoFailure(format!("assembling private key: {e}")))?;
        private
            .precompute()
            .map_err(|e| Error::CryptoFailure(format!("precomputing CRT values: {e}")))?;
        Ok(Self {
            public,
            private,
            wrap_key,
            suite,
        })
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn suite(&self) -> Suite {
        self.suite
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        let primes = self.private.primes();
        if primes.len() != 2 {
            return Err(Error::UnsupportedKeyShape(format!(
                "cannot serialize {} primes",
                primes.len()
            )));
        }
        let dp = self
            .private
            .dp()
            .ok_or_else(|| Error::CryptoFailure("missing precomputed dp".to_owned()))?;
        let dq = self
            .private
            .dq()
            .ok_or_else(|| Error::CryptoFailure("missing precomputed dq".to_owned()))?;
        let qinv = self
            .private
            .qinv()
            .ok_or_else(|| Error::CryptoFailure("missing precomputed qInv".to_owned()))?;

        let private_dict = Value::Dict(vec![
            pair("d", self.private.d()),
            pair("dp", dp),
            pair("dq", dq),
            pair("e", self.private.e()),
            pair("n", self.private.n()),
            pair("p", &primes[0]),
            pair("q", &primes[1]),
            ("qInv".into(), Value::Big(qinv.clone())),
        ]);
        let blob = wrap_cipher(&encode(&private_dict), &self.wrap_key, self.suite)?;
        Ok(encode_outer(&self.public, &blob))
    }
}

impl std::fmt::Debug for DecryptedKeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedKeyData")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .field("wrap_key", &self.wrap_key)
            .field("suite", &self.suite)
            .finish()
    }
}

fn pair(name: &str, value: &BigUint) -> (Value, Value) {
    (name.into(), Value::Big(BigInt::from(value.clone())))
}

/// The at-rest cipher for the private blob: AES-CTR, zero IV, single-use
/// wrap key. Symmetric, so it both encrypts and decrypts.
fn wrap_cipher(data: &[u8], key: &SymmetricKey, suite: Suite) -> Result<Vec<u8>> {
    let iv = vec![0u8; suite.block_size()];
    Ok(apply_ctr(suite, key, &iv, data)?)
}

fn encode_outer(public: &RsaPublicKey, enc_private: &[u8]) -> Vec<u8> {
    let value = Value::List(vec![
        Value::from(TAG_KEYDATA),
        Value::List(vec![
            Value::from(KEY_NOTE),
            Value::Dict(vec![pair("n", public.n()), pair("e", public.e())]),
        ]),
        Value::List(vec![Value::from(KEY_NOTE), Value::from(enc_private)]),
    ]);
    encode(&value)
}

fn parse_outer(bytes: &[u8]) -> Result<(RsaPublicKey, Vec<u8>)> {
    let value = decode(bytes)?;
    let items = value
        .as_list()
        .ok_or_else(|| Error::DecodeMismatch("keydata is not a sequence".to_owned()))?;
    if items.len() != 3 {
        return Err(Error::DecodeMismatch(format!(
            "keydata has {} elements, expected 3",
            items.len()
        )));
    }
    if items[0].as_text() != Some(TAG_KEYDATA) {
        return Err(Error::DecodeMismatch("keydata tag mismatch".to_owned()));
    }

    let public_items = tagged_pair(&items[1], "public key")?;
    let dict = &public_items[1];
    let n = field_uint(dict, "n")?;
    let e = field_uint(dict, "e")?;
    let public = RsaPublicKey::new(n, e)
        .map_err(|err| Error::CryptoFailure(format!("assembling public key: {err}")))?;

    let private_items = tagged_pair(&items[2], "encrypted private key")?;
    let blob = private_items[1]
        .as_bytes()
        .ok_or_else(|| Error::DecodeMismatch("encrypted private key is not bytes".to_owned()))?;
    Ok((public, blob.to_vec()))
}

/// `["rsa-pcks1-sha256", <payload>]` sub-lists inside the envelope.
fn tagged_pair<'a>(value: &'a Value, what: &str) -> Result<&'a [Value]> {
    let items = value
        .as_list()
        .ok_or_else(|| Error::DecodeMismatch(format!("{what} is not a sequence")))?;
    if items.len() != 2 {
        return Err(Error::DecodeMismatch(format!(
            "{what} has {} elements, expected 2",
            items.len()
        )));
    }
    if items[0].as_text() != Some(KEY_NOTE) {
        return Err(Error::DecodeMismatch(format!("{what} has an unknown type")));
    }
    Ok(items)
}

fn field_int(dict: &Value, name: &str) -> Result<BigInt> {
    dict.dict_get(name)
        .and_then(Value::to_big)
        .ok_or_else(|| Error::DecodeMismatch(format!("key component {name:?} missing or not an integer")))
}

fn field_uint(dict: &Value, name: &str) -> Result<BigUint> {
    field_int(dict, name)?
        .to_biguint()
        .ok_or_else(|| Error::DecodeMismatch(format!("key component {name:?} is negative")))
}
