use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },

    #[error("length prefix overflows or exceeds remaining input")]
    LengthOverflow,

    #[error("malformed integer atom")]
    MalformedInteger,

    #[error("text atom is not valid UTF-8")]
    InvalidUtf8,

    #[error("nesting exceeds {0} levels")]
    DepthExceeded(usize),
}
