use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed capability: {0}")]
    MalformedCap(String),

    #[error("unsupported key shape: {0}")]
    UnsupportedKeyShape(String),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("record shape mismatch: {0}")]
    DecodeMismatch(String),

    #[error("cipher failure: {0}")]
    CryptoFailure(String),

    #[error(transparent)]
    Shard(#[from] ds_shards::Error),

    #[error(transparent)]
    Codec(#[from] ds_codec::Error),
}
