//! Signed, append-only revision log
//!
//! Each revision hides the URN of an immutable tree root under the read key
//! (AES-CTR with a fresh random IV) and is signed under the key-data keypair
//! over the canonical encoding of the revision tuple. The log only ever
//! grows; existing entries are never rewritten.
//!
//! Wire form:
//!
//! ```text
//! ["history"]                                         (empty)
//! ["history", [["rev-sig", <revision>, <sig>], ...]]
//! <revision> = ["revision", <n>, <iv>, <encrypted urn>]
//! ```
//!
//! The three access tiers mirror the capability hierarchy:
//! [`HistoryVerifyOnly`] checks signatures, [`HistoryReadOnly`] additionally
//! decrypts revisions, and [`History`] appends new ones. Verification is
//! per-index: a bad signature on one revision does not condemn the rest, and
//! what to do about it is the caller's policy.

use ds_codec::{decode, encode, Value};
use ds_shards::crypt::apply_ctr;
use ds_shards::{PublicShard, Suite, SymmetricKey, Urn};
use rand::RngCore;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::Sha256;
use tracing::debug;

use crate::error::{Error, Result};
use crate::keydata::DecryptedKeyData;

const TAG_HISTORY: &str = "history";
const TAG_REV_SIG: &str = "rev-sig";
const TAG_REVISION: &str = "revision";

/// One pointer in the log: a sequence number, the IV used to encrypt the
/// target URN, and the encrypted URN bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    n: i64,
    iv: Vec<u8>,
    enc_loc: Vec<u8>,
}

impl Revision {
    pub fn n(&self) -> i64 {
        self.n
    }

    fn to_value(&self) -> Value {
        Value::List(vec![
            Value::from(TAG_REVISION),
            Value::Int(self.n),
            Value::from(self.iv.as_slice()),
            Value::from(self.enc_loc.as_slice()),
        ])
    }

    /// The canonical bytes a revision signature binds to.
    fn signing_bytes(&self) -> Vec<u8> {
        encode(&self.to_value())
    }

    fn from_value(value: &Value) -> Result<Self> {
        let items = value
            .as_list()
            .ok_or_else(|| Error::DecodeMismatch("revision is not a sequence".to_owned()))?;
        if items.len() != 4 {
            return Err(Error::DecodeMismatch(format!(
                "revision has {} elements, expected 4",
                items.len()
            )));
        }
        if items[0].as_text() != Some(TAG_REVISION) {
            return Err(Error::DecodeMismatch("revision tag mismatch".to_owned()));
        }
        let n = items[1]
            .as_int()
            .ok_or_else(|| Error::DecodeMismatch("revision number is not an integer".to_owned()))?;
        let iv = items[2]
            .as_bytes()
            .ok_or_else(|| Error::DecodeMismatch("revision IV is not bytes".to_owned()))?;
        let enc_loc = items[3]
            .as_bytes()
            .ok_or_else(|| Error::DecodeMismatch("revision location is not bytes".to_owned()))?;
        Ok(Self {
            n,
            iv: iv.to_vec(),
            enc_loc: enc_loc.to_vec(),
        })
    }
}

/// A revision plus its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevSig {
    rev: Revision,
    sig: Vec<u8>,
}

impl RevSig {
    pub fn revision(&self) -> &Revision {
        &self.rev
    }

    fn to_value(&self) -> Value {
        Value::List(vec![
            Value::from(TAG_REV_SIG),
            self.rev.to_value(),
            Value::from(self.sig.as_slice()),
        ])
    }

    fn from_value(value: &Value) -> Result<Self> {
        let items = value
            .as_list()
            .ok_or_else(|| Error::DecodeMismatch("rev-sig is not a sequence".to_owned()))?;
        if items.len() != 3 {
            return Err(Error::DecodeMismatch(format!(
                "rev-sig has {} elements, expected 3",
                items.len()
            )));
        }
        if items[0].as_text() != Some(TAG_REV_SIG) {
            return Err(Error::DecodeMismatch("rev-sig tag mismatch".to_owned()));
        }
        let rev = Revision::from_value(&items[1])?;
        let sig = items[2]
            .as_bytes()
            .ok_or_else(|| Error::DecodeMismatch("rev-sig signature is not bytes".to_owned()))?;
        Ok(Self {
            rev,
            sig: sig.to_vec(),
        })
    }
}

/// History tier that can check revision signatures against the key-data
/// public key, but cannot see where revisions point.
#[derive(Debug, Clone)]
pub struct HistoryVerifyOnly {
    revsigs: Vec<RevSig>,
    public: RsaPublicKey,
    suite: Suite,
}

impl HistoryVerifyOnly {
    pub fn new(suite: Suite, public: RsaPublicKey) -> Self {
        Self {
            revsigs: Vec::new(),
            public,
            suite,
        }
    }

    pub fn len(&self) -> usize {
        self.revsigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revsigs.is_empty()
    }

    pub fn revisions(&self) -> &[RevSig] {
        &self.revsigs
    }

    /// Checks the signature of revision `i`.
    ///
    /// Panics if `i` is out of bounds, like slice indexing.
    pub fn verify(&self, i: usize) -> Result<()> {
        let revsig = &self.revsigs[i];
        let digest = self.suite.signature_digest(&revsig.rev.signing_bytes());
        self.public
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &revsig.sig)
            .map_err(|_| Error::SignatureInvalid)
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut items = vec![Value::from(TAG_HISTORY)];
        if !self.revsigs.is_empty() {
            items.push(Value::List(
                self.revsigs.iter().map(RevSig::to_value).collect(),
            ));
        }
        encode(&Value::List(items))
    }

    /// Replaces this log's entries with the decoded ones.
    pub fn unmarshal(&mut self, bytes: &[u8]) -> Result<()> {
        let value = decode(bytes)?;
        let items = value
            .as_list()
            .ok_or_else(|| Error::DecodeMismatch("history is not a sequence".to_owned()))?;
        if items.first().and_then(Value::as_text) != Some(TAG_HISTORY) {
            return Err(Error::DecodeMismatch("history tag mismatch".to_owned()));
        }
        match items.len() {
            1 => {
                self.revsigs = Vec::new();
                Ok(())
            }
            2 => {
                let entries = items[1].as_list().ok_or_else(|| {
                    Error::DecodeMismatch("history entries are not a sequence".to_owned())
                })?;
                self.revsigs = entries
                    .iter()
                    .map(RevSig::from_value)
                    .collect::<Result<_>>()?;
                Ok(())
            }
            n => Err(Error::DecodeMismatch(format!(
                "history has {n} elements, expected 1 or 2"
            ))),
        }
    }
}

/// History tier that can also decrypt revision pointers.
#[derive(Debug, Clone)]
pub struct HistoryReadOnly {
    verify_only: HistoryVerifyOnly,
    read_key: SymmetricKey,
}

impl HistoryReadOnly {
    pub fn new(suite: Suite, public: RsaPublicKey, read_key: SymmetricKey) -> Self {
        Self {
            verify_only: HistoryVerifyOnly::new(suite, public),
            read_key,
        }
    }

    pub fn len(&self) -> usize {
        self.verify_only.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verify_only.is_empty()
    }

    pub fn verify(&self, i: usize) -> Result<()> {
        self.verify_only.verify(i)
    }

    pub fn marshal(&self) -> Vec<u8> {
        self.verify_only.marshal()
    }

    pub fn unmarshal(&mut self, bytes: &[u8]) -> Result<()> {
        self.verify_only.unmarshal(bytes)
    }

    /// Decrypts revision `i` and parses the URN it points at.
    ///
    /// Panics if `i` is out of bounds, like slice indexing.
    pub fn read_urn(&self, i: usize) -> Result<Urn> {
        let rev = &self.verify_only.revsigs[i].rev;
        let plain = apply_ctr(
            self.verify_only.suite,
            &self.read_key,
            &rev.iv,
            &rev.enc_loc,
        )?;
        let text = String::from_utf8(plain)
            .map_err(|_| Error::DecodeMismatch("decrypted revision is not UTF-8".to_owned()))?;
        Ok(Urn::parse(&text)?)
    }
}

/// The full history: verify, read, and append.
///
/// Constructed from a [`DecryptedKeyData`], so the private half needed to
/// sign appends is present by construction.
#[derive(Debug, Clone)]
pub struct History {
    read_only: HistoryReadOnly,
    key_data: DecryptedKeyData,
}

impl History {
    pub fn new(key_data: DecryptedKeyData, read_key: SymmetricKey) -> Self {
        Self {
            read_only: HistoryReadOnly::new(
                key_data.suite(),
                key_data.public_key().clone(),
                read_key,
            ),
            key_data,
        }
    }

    pub fn len(&self) -> usize {
        self.read_only.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_only.is_empty()
    }

    pub fn verify(&self, i: usize) -> Result<()> {
        self.read_only.verify(i)
    }

    pub fn read_urn(&self, i: usize) -> Result<Urn> {
        self.read_only.read_urn(i)
    }

    pub fn marshal(&self) -> Vec<u8> {
        self.read_only.marshal()
    }

    pub fn unmarshal(&mut self, bytes: &[u8]) -> Result<()> {
        self.read_only.unmarshal(bytes)
    }

    /// Appends a revision pointing at `shard`, signed under the key-data
    /// private key.
    pub fn write(&mut self, shard: &PublicShard) -> Result<()> {
        let suite = self.key_data.suite();
        let n = self.len() as i64;
        let (iv, enc_loc) = encrypt_urn(
            shard.address.to_string().as_bytes(),
            &self.read_only.read_key,
            suite,
        )?;
        let rev = Revision { n, iv, enc_loc };

        let digest = suite.signature_digest(&rev.signing_bytes());
        let sig = self
            .key_data
            .private_key()
            .sign_with_rng(&mut rand::thread_rng(), Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| Error::CryptoFailure(format!("signing revision: {e}")))?;

        self.read_only.verify_only.revsigs.push(RevSig { rev, sig });
        debug!(n, "appended history revision");
        Ok(())
    }
}

/// Encrypts a URN's textual form under the read key with a fresh random IV.
fn encrypt_urn(plain: &[u8], key: &SymmetricKey, suite: Suite) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut iv = vec![0u8; suite.block_size()];
    rand::thread_rng().fill_bytes(&mut iv);
    let enc = apply_ctr(suite, key, &iv, plain)?;
    Ok((iv, enc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keydata::tests::{test_rsa_key, test_wrap_key};

    const REV_SIG_BYTES_1: &[u8] =
        b"[7\"history[[7\"rev-sig[8\"revisioni0e2:123:333]4:sig1][7\"rev-sig[8\"revisioni1e4:12345:11111]4:sig2]]]";
    const REV_SIG_BYTES_2: &[u8] =
        b"[7\"history[[7\"rev-sig[8\"revisioni0e2:123:333]4:sig1][7\"rev-sig[8\"revisioni1e4:12345:11111]4:sig2][7\"rev-sig[8\"revisioni2e7:12344448:11111111]10:signature3]]]";

    const DYN_LOCS: [&str; 3] = [
        "urn:sha256d:7gfqd3hDTf56FEb9i_x9_cxwgVwjUNDwldJtC9v1T8o",
        "urn:sha256d:fwFIj8TIXaeiViqbH252V5L0mY3EOb5pPXhQg-Xci1c",
        "urn:sha256d:E7XwTkJO2ufGW7cCc9qk5rNJPh2xTbxxDN0HMQHiP4s",
    ];

    fn fixed_revsigs() -> Vec<RevSig> {
        vec![
            RevSig {
                rev: Revision {
                    n: 0,
                    iv: vec![49, 50],
                    enc_loc: vec![51, 51, 51],
                },
                sig: b"sig1".to_vec(),
            },
            RevSig {
                rev: Revision {
                    n: 1,
                    iv: vec![49, 50, 51, 52],
                    enc_loc: vec![49, 49, 49, 49, 49],
                },
                sig: b"sig2".to_vec(),
            },
        ]
    }

    fn test_read_key() -> SymmetricKey {
        SymmetricKey::new((0u8..32).collect())
    }

    fn verify_only() -> HistoryVerifyOnly {
        HistoryVerifyOnly::new(Suite::ProtoZero, test_rsa_key().to_public_key())
    }

    /// A populated read tier whose revisions point at `DYN_LOCS`, mirroring
    /// the dynamic fixture of the original test suite.
    fn dynamic_read_only() -> HistoryReadOnly {
        let mut h = HistoryReadOnly::new(
            Suite::ProtoZero,
            test_rsa_key().to_public_key(),
            test_read_key(),
        );
        for (i, loc) in DYN_LOCS.iter().enumerate() {
            let (iv, enc_loc) =
                encrypt_urn(loc.as_bytes(), &test_read_key(), Suite::ProtoZero).unwrap();
            let rev = Revision {
                n: i as i64,
                iv,
                enc_loc,
            };
            let digest = Suite::ProtoZero.signature_digest(&rev.signing_bytes());
            let sig = test_rsa_key()
                .sign_with_rng(
                    &mut rand::thread_rng(),
                    Pkcs1v15Sign::new::<Sha256>(),
                    &digest,
                )
                .unwrap();
            h.verify_only.revsigs.push(RevSig { rev, sig });
        }
        h
    }

    fn dynamic_history() -> History {
        let key_data = DecryptedKeyData::new(
            test_rsa_key().clone(),
            test_wrap_key(),
            Suite::ProtoZero,
        )
        .unwrap();
        let mut h = History::new(key_data, test_read_key());
        h.read_only = dynamic_read_only();
        h
    }

    #[test]
    fn marshal_empty() {
        assert_eq!(verify_only().marshal(), b"[7\"history]");
    }

    #[test]
    fn marshal_fixed_revsigs() {
        let mut h = verify_only();
        h.revsigs = fixed_revsigs();
        assert_eq!(h.marshal(), REV_SIG_BYTES_1);
    }

    #[test]
    fn unmarshal_empty() {
        let mut h = verify_only();
        h.revsigs = fixed_revsigs();
        h.unmarshal(b"[7\"history]").unwrap();
        assert!(h.is_empty());
    }

    #[test]
    fn unmarshal_fixed_revsigs() {
        let mut h = verify_only();
        h.unmarshal(REV_SIG_BYTES_1).unwrap();
        assert_eq!(h.revsigs, fixed_revsigs());

        h.unmarshal(REV_SIG_BYTES_2).unwrap();
        assert_eq!(h.len(), 3);
        assert_eq!(h.revsigs[2].rev.n, 2);
        assert_eq!(h.revsigs[2].sig, b"signature3");
    }

    #[test]
    fn marshal_unmarshal_is_identity() {
        for bytes in [b"[7\"history]".as_slice(), REV_SIG_BYTES_1, REV_SIG_BYTES_2] {
            let mut h = verify_only();
            h.unmarshal(bytes).unwrap();
            assert_eq!(h.marshal(), bytes);
        }
    }

    #[test]
    fn unmarshal_rejects_wrong_shapes() {
        let mut h = verify_only();
        assert!(h.unmarshal(b"[5\"wrong]").is_err());
        assert!(h.unmarshal(b"i3e").is_err());
        assert!(h.unmarshal(b"[7\"history[]7:trailer]").is_err());
    }

    #[test]
    fn verify_all_dynamic_revisions() {
        let h = dynamic_read_only();
        for i in 0..h.len() {
            h.verify(i).unwrap();
        }
    }

    #[test]
    fn verify_rejects_tampering() {
        let mut h = dynamic_read_only();
        // Flip one bit of the signature.
        h.verify_only.revsigs[1].sig[0] ^= 1;
        assert!(matches!(h.verify(1), Err(Error::SignatureInvalid)));
        // And separately, one bit of the signed revision.
        let mut h = dynamic_read_only();
        h.verify_only.revsigs[2].rev.enc_loc[0] ^= 1;
        assert!(matches!(h.verify(2), Err(Error::SignatureInvalid)));
        // A bad entry does not condemn its neighbors.
        h.verify(0).unwrap();
    }

    #[test]
    fn read_urn_roundtrips_dynamic_revisions() {
        let h = dynamic_read_only();
        for (i, loc) in DYN_LOCS.iter().enumerate() {
            assert_eq!(h.read_urn(i).unwrap().to_string(), *loc);
        }
    }

    #[test]
    fn write_appends_verifiable_readable_revision() {
        let mut h = dynamic_history();
        assert_eq!(h.len(), 3);

        let address = Urn::parse(
            "urn:sha256d:X74UbU3NoLTA_Nupi8DhaJ_oQpQ95KFukMAkJJotKgo",
        )
        .unwrap();
        let shard = PublicShard {
            content: vec![0u8; 16],
            address: address.clone(),
        };
        h.write(&shard).unwrap();

        assert_eq!(h.len(), 4);
        assert_eq!(h.read_only.verify_only.revsigs[3].rev.n, 3);
        h.verify(3).unwrap();
        assert_eq!(h.read_urn(3).unwrap(), address);
        // Earlier entries are untouched.
        for i in 0..3 {
            h.verify(i).unwrap();
            assert_eq!(h.read_urn(i).unwrap().to_string(), DYN_LOCS[i]);
        }
    }

    #[test]
    fn write_into_empty_history() {
        let key_data = DecryptedKeyData::new(
            test_rsa_key().clone(),
            test_wrap_key(),
            Suite::ProtoZero,
        )
        .unwrap();
        let mut h = History::new(key_data, test_read_key());
        let shard = PublicShard {
            content: vec![],
            address: Urn::parse(DYN_LOCS[0]).unwrap(),
        };
        h.write(&shard).unwrap();
        assert_eq!(h.len(), 1);
        h.verify(0).unwrap();
        assert_eq!(h.read_urn(0).unwrap().to_string(), DYN_LOCS[0]);
    }

    #[test]
    fn unmarshal_write_marshal() {
        let mut h = dynamic_history();
        h.unmarshal(REV_SIG_BYTES_1).unwrap();
        let shard = PublicShard {
            content: vec![],
            address: Urn::parse(DYN_LOCS[2]).unwrap(),
        };
        h.write(&shard).unwrap();
        assert_eq!(h.len(), 3);
        // The marshaled form decodes back to the same log.
        let bytes = h.marshal();
        let mut back = verify_only();
        back.unmarshal(&bytes).unwrap();
        assert_eq!(back.revsigs, h.read_only.verify_only.revsigs);
    }

    #[test]
    fn fresh_ivs_per_write() {
        let mut h = dynamic_history();
        let shard = PublicShard {
            content: vec![],
            address: Urn::parse(DYN_LOCS[0]).unwrap(),
        };
        h.write(&shard).unwrap();
        h.write(&shard).unwrap();
        let revs = &h.read_only.verify_only.revsigs;
        let a = &revs[revs.len() - 2].rev;
        let b = &revs[revs.len() - 1].rev;
        // Same target URN, but fresh IVs make the ciphertexts differ.
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.enc_loc, b.enc_loc);
    }
}
