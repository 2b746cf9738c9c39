//! Chunker + framer
//!
//! Wraps content in a typed record and splits it into shard payloads that
//! encode to exactly [`SHARD_SIZE`] bytes. Two record shapes exist on the
//! wire:
//!
//! ```text
//! ["raw", <payload>]
//! ["manifest", <shard size>, <total content length>, <urn concatenation>]
//! ```
//!
//! Every shard of a level carries the same header with a slice of the level's
//! content as payload. Full shards encode byte-exact to the shard size; the
//! final shard encodes short and is zero-padded up to it. The payload
//! capacity accounts for both the encoded header and the payload atom's own
//! length prefix, so the byte-exact property is checked, not assumed; a
//! mismatch is [`Error::FramingOverflow`].

use ds_codec::{encode, Value};

use crate::error::{Error, Result};
use crate::urn::Urn;
use crate::SHARD_SIZE;

const TAG_RAW: &str = "raw";
const TAG_MANIFEST: &str = "manifest";

/// Record header shared by every shard of one tree level.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Header {
    Raw,
    /// `content_len` is the sum of the raw payload lengths of the level the
    /// manifest describes, i.e. its direct children.
    Manifest { content_len: i64 },
}

impl Header {
    fn values(&self) -> Vec<Value> {
        match self {
            Header::Raw => vec![Value::from(TAG_RAW)],
            Header::Manifest { content_len } => vec![
                Value::from(TAG_MANIFEST),
                Value::Int(SHARD_SIZE as i64),
                Value::Int(*content_len),
            ],
        }
    }
}

/// One framed shard plaintext plus the number of content bytes it carries.
#[derive(Debug, Clone)]
pub(crate) struct FramedChunk {
    /// Exactly [`SHARD_SIZE`] bytes: the encoded record, zero-padded for the
    /// final chunk of a level.
    pub bytes: Vec<u8>,
    /// Length of the payload slice inside the record.
    pub payload_len: usize,
}

/// Encodes a single record without padding, regardless of size.
pub(crate) fn encode_record(header: &Header, payload: &[u8]) -> Vec<u8> {
    let mut items = header.values();
    items.push(Value::from(payload));
    encode(&Value::List(items))
}

/// Splits `content` into framed shards under the given header.
pub(crate) fn frame(header: &Header, content: &[u8]) -> Result<Vec<FramedChunk>> {
    let overhead = encode(&Value::List(header.values())).len();
    let capacity = payload_capacity(overhead)?;

    let mut chunks = Vec::with_capacity(content.len() / capacity + 1);
    let mut rest = content;
    while rest.len() > capacity {
        let (payload, tail) = rest.split_at(capacity);
        let bytes = encode_record(header, payload);
        if bytes.len() != SHARD_SIZE {
            return Err(Error::FramingOverflow {
                got: bytes.len(),
                want: SHARD_SIZE,
            });
        }
        chunks.push(FramedChunk {
            bytes,
            payload_len: capacity,
        });
        rest = tail;
    }

    let mut bytes = encode_record(header, rest);
    if bytes.len() > SHARD_SIZE {
        return Err(Error::FramingOverflow {
            got: bytes.len(),
            want: SHARD_SIZE,
        });
    }
    bytes.resize(SHARD_SIZE, 0);
    chunks.push(FramedChunk {
        bytes,
        payload_len: rest.len(),
    });
    Ok(chunks)
}

/// The unique payload length N such that `header + prefix(N) + N` encodes to
/// exactly [`SHARD_SIZE`] bytes, where `prefix(N)` is the payload atom's
/// decimal length prefix plus its delimiter.
fn payload_capacity(overhead: usize) -> Result<usize> {
    for digits in 1..=9 {
        let Some(n) = SHARD_SIZE.checked_sub(overhead + digits + 1) else {
            break;
        };
        if decimal_digits(n) == digits {
            return Ok(n);
        }
    }
    // Header alone leaves no room for a payload atom.
    Err(Error::FramingOverflow {
        got: overhead,
        want: SHARD_SIZE,
    })
}

fn decimal_digits(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// A decoded shard plaintext.
#[derive(Debug)]
pub(crate) enum Record {
    Raw(Vec<u8>),
    Manifest { content_len: i64, urns: Vec<Urn> },
}

/// Decodes one record from a shard plaintext. Trailing zero padding after the
/// record is ignored by the codec.
pub(crate) fn decode_record(bytes: &[u8]) -> Result<Record> {
    let value = ds_codec::decode(bytes)?;
    let items = value
        .as_list()
        .ok_or_else(|| Error::DecodeMismatch("record is not a sequence".to_owned()))?;
    let tag = items
        .first()
        .and_then(Value::as_text)
        .ok_or_else(|| Error::DecodeMismatch("record tag is not a string".to_owned()))?;
    match tag {
        TAG_RAW => {
            if items.len() != 2 {
                return Err(Error::DecodeMismatch(format!(
                    "raw record has {} elements, expected 2",
                    items.len()
                )));
            }
            let payload = items[1]
                .as_bytes()
                .ok_or_else(|| Error::DecodeMismatch("raw payload is not bytes".to_owned()))?;
            Ok(Record::Raw(payload.to_vec()))
        }
        TAG_MANIFEST => {
            if items.len() != 4 {
                return Err(Error::DecodeMismatch(format!(
                    "manifest record has {} elements, expected 4",
                    items.len()
                )));
            }
            items[1]
                .as_int()
                .ok_or_else(|| Error::DecodeMismatch("manifest shard size is not an integer".to_owned()))?;
            let content_len = items[2].as_int().ok_or_else(|| {
                Error::DecodeMismatch("manifest content length is not an integer".to_owned())
            })?;
            if content_len < 0 {
                return Err(Error::DecodeMismatch(format!(
                    "manifest content length is negative: {content_len}"
                )));
            }
            let payload = items[3]
                .as_bytes()
                .ok_or_else(|| Error::DecodeMismatch("manifest payload is not bytes".to_owned()))?;
            Ok(Record::Manifest {
                content_len,
                urns: parse_urn_concat(payload)?,
            })
        }
        other => Err(Error::DecodeMismatch(format!(
            "unknown record tag {other:?}"
        ))),
    }
}

/// Splits a manifest payload into its URN list.
///
/// The payload is the plain concatenation of URN strings, partitioned on the
/// literal `urn:` boundary. The base64url alphabet cannot contain `:`, so the
/// boundary is unambiguous for well-formed manifests.
fn parse_urn_concat(payload: &[u8]) -> Result<Vec<Urn>> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| Error::MalformedAddress("manifest URN list is not UTF-8".to_owned()))?;
    let mut parts = text.split("urn:");
    if parts.next() != Some("") {
        return Err(Error::MalformedAddress(
            "manifest URN list does not start with 'urn:'".to_owned(),
        ));
    }
    parts.map(|rest| Urn::parse(&format!("urn:{rest}"))).collect()
}
