//! Per-shard CTR encryption with deterministic derived IVs
//!
//! IV derivation:
//!
//! ```text
//! material = role prefix ++ little_endian_u64(ctr) ++ key
//! iv       = suite.iv_digest(material)[..block_size]
//! ```
//!
//! The full material is hashed before truncation. `ctr` is the shard's index
//! among its siblings, and the role prefix separates a tree's root
//! (`entry-point`) from every other shard (`content`). Encryption and
//! decryption are the same keystream XOR, so identical `(key, role, ctr)`
//! always regenerate the identical IV. This is what makes shard production
//! convergent: the same plaintext under the same key yields the same bytes
//! at the same address.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::{Aes128, Aes192, Aes256};
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::idsc::Idsc;
use crate::keys::SymmetricKey;
use crate::shard::PrivateShard;
use crate::suite::Suite;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes192Ctr = ctr::Ctr128BE<Aes192>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Domain-separation role for IV derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IvRole {
    /// The shard a reader starts from: the root of a tree.
    EntryPoint,
    /// Every other shard.
    Content,
}

impl IvRole {
    fn prefix(&self) -> &'static [u8] {
        match self {
            IvRole::EntryPoint => b"entry-point",
            IvRole::Content => b"content",
        }
    }
}

pub(crate) fn derive_iv(suite: Suite, role: IvRole, ctr: u64, key: &SymmetricKey) -> Vec<u8> {
    let mut material =
        Vec::with_capacity(role.prefix().len() + std::mem::size_of::<u64>() + key.len());
    material.extend_from_slice(role.prefix());
    material.extend_from_slice(&ctr.to_le_bytes());
    material.extend_from_slice(key.as_bytes());
    let mut digest = suite.iv_digest(&material);
    material.zeroize();
    digest.truncate(suite.block_size());
    digest
}

/// Applies the suite's CTR keystream to `data`. Symmetric: the same call
/// encrypts and decrypts.
pub fn apply_ctr(suite: Suite, key: &SymmetricKey, iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let Suite::ProtoZero = suite;
    let mut buf = data.to_vec();
    let keyed = match key.len() {
        16 => Aes128Ctr::new_from_slices(key.as_bytes(), iv)
            .map(|mut c| c.apply_keystream(&mut buf)),
        24 => Aes192Ctr::new_from_slices(key.as_bytes(), iv)
            .map(|mut c| c.apply_keystream(&mut buf)),
        32 => Aes256Ctr::new_from_slices(key.as_bytes(), iv)
            .map(|mut c| c.apply_keystream(&mut buf)),
        n => {
            return Err(Error::CryptoFailure(format!(
                "invalid AES key size: {n} bytes"
            )))
        }
    };
    keyed.map_err(|e| Error::CryptoFailure(format!("keying CTR cipher: {e}")))?;
    Ok(buf)
}

/// Encrypts one framed chunk and addresses the resulting ciphertext.
pub(crate) fn encrypt_chunk(
    plain: &[u8],
    key: &SymmetricKey,
    suite: Suite,
    ctr: u64,
    role: IvRole,
) -> Result<PrivateShard> {
    let iv = derive_iv(suite, role, ctr, key);
    let content = apply_ctr(suite, key, &iv, plain)?;
    let address = Idsc::new(suite, &content, key.clone());
    Ok(PrivateShard { content, address })
}

/// Decrypts one shard's ciphertext.
pub(crate) fn decrypt_chunk(
    ciphertext: &[u8],
    key: &SymmetricKey,
    suite: Suite,
    ctr: u64,
    role: IvRole,
) -> Result<Vec<u8>> {
    let iv = derive_iv(suite, role, ctr, key);
    apply_ctr(suite, key, &iv, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key32() -> SymmetricKey {
        SymmetricKey::new(vec![0u8; 32])
    }

    #[test]
    fn iv_is_deterministic_and_truncated() {
        let a = derive_iv(Suite::ProtoZero, IvRole::Content, 3, &key32());
        let b = derive_iv(Suite::ProtoZero, IvRole::Content, 3, &key32());
        assert_eq!(a, b);
        assert_eq!(a.len(), Suite::ProtoZero.block_size());
    }

    #[test]
    fn iv_separates_roles_counters_and_keys() {
        let base = derive_iv(Suite::ProtoZero, IvRole::Content, 0, &key32());
        let entry = derive_iv(Suite::ProtoZero, IvRole::EntryPoint, 0, &key32());
        let next = derive_iv(Suite::ProtoZero, IvRole::Content, 1, &key32());
        let other_key = derive_iv(
            Suite::ProtoZero,
            IvRole::Content,
            0,
            &SymmetricKey::new(vec![1u8; 32]),
        );
        assert_ne!(base, entry);
        assert_ne!(base, next);
        assert_ne!(base, other_key);
    }

    #[test]
    fn counter_is_little_endian() {
        // Wire-visible: the counter's least significant byte comes first in
        // the IV material.
        let mut material = Vec::new();
        material.extend_from_slice(b"content");
        material.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0]);
        material.extend_from_slice(&[0u8; 32]);
        let mut expected = Suite::ProtoZero.iv_digest(&material);
        expected.truncate(16);
        assert_eq!(
            derive_iv(Suite::ProtoZero, IvRole::Content, 1, &key32()),
            expected
        );
    }

    #[test]
    fn ctr_roundtrips_for_all_key_sizes() {
        let plain = b"shard plaintext bytes";
        for size in [16usize, 24, 32] {
            let key = SymmetricKey::new(vec![0x42u8; size]);
            let iv = derive_iv(Suite::ProtoZero, IvRole::Content, 0, &key);
            let ciphertext = apply_ctr(Suite::ProtoZero, &key, &iv, plain).unwrap();
            assert_ne!(&ciphertext, plain);
            let back = apply_ctr(Suite::ProtoZero, &key, &iv, &ciphertext).unwrap();
            assert_eq!(&back, plain);
        }
    }

    #[test]
    fn ctr_rejects_bad_key_sizes() {
        let key = SymmetricKey::new(vec![0u8; 15]);
        let iv = vec![0u8; 16];
        assert!(matches!(
            apply_ctr(Suite::ProtoZero, &key, &iv, b"data"),
            Err(Error::CryptoFailure(_))
        ));
    }

    #[test]
    fn encrypt_chunk_is_convergent() {
        let a = encrypt_chunk(b"same bytes", &key32(), Suite::ProtoZero, 0, IvRole::Content)
            .unwrap();
        let b = encrypt_chunk(b"same bytes", &key32(), Suite::ProtoZero, 0, IvRole::Content)
            .unwrap();
        assert_eq!(a.content, b.content);
        assert_eq!(a.address.to_string(), b.address.to_string());
    }

    #[test]
    fn roles_produce_distinct_ciphertext() {
        let entry =
            encrypt_chunk(b"payload", &key32(), Suite::ProtoZero, 0, IvRole::EntryPoint).unwrap();
        let content =
            encrypt_chunk(b"payload", &key32(), Suite::ProtoZero, 0, IvRole::Content).unwrap();
        assert_ne!(entry.content, content.content);
    }
}
