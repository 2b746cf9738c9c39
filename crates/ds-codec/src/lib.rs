//! ds-codec: canonical encoding of tagged composite records
//!
//! Every wire structure in datashards (shard frames, key-data envelopes,
//! history logs) is built from six value shapes: byte strings, text strings,
//! integers (64-bit or arbitrary precision), sequences, and mappings. This
//! crate encodes them with a fixed, deterministic grammar so that identical
//! values always produce identical bytes, a requirement for anything that is
//! addressed or signed by its encoding.
//!
//! Wire grammar:
//! ```text
//! bytes     <len>:<raw>          4:sig1
//! text      <len>"<utf-8>        7"history
//! integer   i<decimal>e          i0e  i-5e  i32768e
//! sequence  [ elements ]         [3"raw5:hello]
//! mapping   { k v k v ... }      {1"ni65537e1"ei3e}
//! ```
//!
//! Integers use one production regardless of width; decoding yields
//! [`Value::Int`] when the digits fit in an `i64` and [`Value::Big`]
//! otherwise. Mapping pairs are encoded in the order they are stored;
//! producers are expected to emit a fixed field order.

mod decode;
mod encode;
mod error;
mod value;

pub use decode::decode;
pub use encode::{encode, encode_into};
pub use error::{Error, Result};
pub use value::Value;

/// Maximum nesting depth accepted by the decoder.
pub const MAX_DEPTH: usize = 100;
