//! ds-shards: immutable content as trees of fixed-size encrypted shards
//!
//! Pipeline: plaintext → frame into 32 KiB records → AES-CTR each record with
//! a deterministic derived IV → address each ciphertext by its SHA-256d hash
//! → describe the addresses in a manifest → repeat until a single root shard
//! remains.
//!
//! Writing is [`tree::encrypt`]; it returns every shard of the tree plus the
//! index of the root. Reading starts from the root with [`tree::decrypt`],
//! which either yields the content directly or a list of URNs to fetch; the
//! caller fetches those shards (in order) and continues with
//! [`tree::decrypt_fetched`] until the step is complete. The library never
//! performs I/O itself; shard transport and storage belong to the caller.
//!
//! Everything here is synchronous and pure: the only ambient resource is the
//! process RNG, and this crate does not even use that (deterministic IVs mean
//! the same plaintext and key always produce the same shards).

pub mod crypt;
pub mod error;
pub mod framing;
pub mod hash;
pub mod idsc;
pub mod keys;
pub mod shard;
pub mod suite;
pub mod tree;
pub mod urn;

pub use error::{Error, Result};
pub use hash::HashAlgo;
pub use idsc::Idsc;
pub use keys::SymmetricKey;
pub use shard::{PrivateShard, PublicShard};
pub use suite::Suite;
pub use tree::{decrypt, decrypt_fetched, encrypt, ReadStep};
pub use urn::Urn;

/// Size of every stored shard, in bytes.
pub const SHARD_SIZE: usize = 32 * 1024;
