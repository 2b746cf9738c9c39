use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    #[error("unknown datashards suite {0:?}")]
    UnknownSuite(String),

    #[error("unknown datashards hash {0:?}")]
    UnknownHash(String),

    #[error("record shape mismatch: {0}")]
    DecodeMismatch(String),

    #[error("decrypting yielded {got} of {want} bytes")]
    Truncated { got: usize, want: usize },

    #[error("fetched shard {index} unexpectedly decoded as a manifest")]
    UnexpectedManifestAtLeaf { index: usize },

    #[error("framed shard encoded to {got} bytes, expected {want}")]
    FramingOverflow { got: usize, want: usize },

    #[error("cipher failure: {0}")]
    CryptoFailure(String),

    #[error(transparent)]
    Codec(#[from] ds_codec::Error),
}
