//! Shard value types

use crate::idsc::Idsc;
use crate::urn::Urn;

/// Encrypted shard content together with its IDSC. Sharing a `PrivateShard`
/// grants access to the decrypted content.
#[derive(Debug, Clone)]
pub struct PrivateShard {
    /// Encrypted shard bytes.
    pub content: Vec<u8>,
    /// Address and key. Sharing this also shares the symmetric key.
    pub address: Idsc,
}

impl PrivateShard {
    /// A shareable form of this shard: the same ciphertext, addressed by its
    /// key-less URN.
    pub fn to_public(&self) -> PublicShard {
        PublicShard {
            content: self.content.clone(),
            address: self.address.urn(),
        }
    }
}

/// Encrypted shard content lacking the symmetric key. Freely shareable:
/// holders can locate and relay the content but not decrypt it.
#[derive(Debug, Clone)]
pub struct PublicShard {
    /// Encrypted shard bytes.
    pub content: Vec<u8>,
    /// The key-less URN address.
    pub address: Urn,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SymmetricKey;
    use crate::suite::Suite;

    #[test]
    fn public_projection_keeps_content_and_address() {
        let content = vec![0xA5u8; 48];
        let shard = PrivateShard {
            address: Idsc::new(Suite::ProtoZero, &content, SymmetricKey::new(vec![1u8; 32])),
            content,
        };
        let public = shard.to_public();
        assert_eq!(public.content, shard.content);
        assert_eq!(public.address, shard.address.urn());
        // The public form's textual address carries no key material.
        assert!(public.address.to_string().starts_with("urn:sha256d:"));
    }
}
