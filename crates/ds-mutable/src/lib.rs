//! ds-mutable: mutable references over immutable shard trees
//!
//! A mutable datashard is a level of indirection: an asymmetric keypair
//! (serialized as a key-data envelope, itself stored as an immutable shard)
//! signs an append-only history of revisions, each revision hiding the URN of
//! one immutable tree root under a symmetric read key. Holders of a
//! capability string can, depending on its access level, verify the history
//! (`v`), locate and decrypt revisions (`r`), or append new ones (`w`).
//!
//! The access levels demote: a write capability yields the read capability
//! (the read key is the SHA-256 of the write key), and both yield the verify
//! capability. The same tiering shows up on the history type itself:
//! [`HistoryVerifyOnly`] ⊂ [`HistoryReadOnly`] ⊂ [`History`], where only the
//! last can append: it is constructed from a decrypted key-data envelope,
//! so holding one implies holding the private key.

pub mod caps;
pub mod error;
pub mod history;
pub mod keydata;

pub use caps::{parse_mdsc, Cap, CapVersion, ReadCap, VerifyCap, WriteCap};
pub use error::{Error, Result};
pub use history::{History, HistoryReadOnly, HistoryVerifyOnly, RevSig, Revision};
pub use keydata::{DecryptedKeyData, EncryptedKeyData};
