//! Shard tree builder and reader
//!
//! Writing frames the plaintext into raw shards, encrypts them, then
//! describes their URNs in a manifest and feeds the manifest back through the
//! same machinery until a single shard survives. That shard is the root and
//! is the only one encrypted under the `entry-point` IV role.
//!
//! Reading inverts this one fetch round at a time: [`decrypt`] opens the root
//! and yields either final content or a URN list to fetch;
//! [`decrypt_fetched`] opens a fetched level, reassembles its payload, and
//! classifies the result by attempting to decode it as a record again. A
//! successful decode means the level was an interior manifest (another fetch
//! round follows); a failed decode means the bytes are the caller's content.
//! That classification by decode attempt is how tree depth is discovered
//! without storing it anywhere.

use tracing::debug;

use crate::crypt::{decrypt_chunk, encrypt_chunk, IvRole};
use crate::error::{Error, Result};
use crate::framing::{decode_record, encode_record, frame, FramedChunk, Header, Record};
use crate::keys::SymmetricKey;
use crate::shard::PrivateShard;
use crate::suite::Suite;
use crate::urn::Urn;

/// Outcome of one decrypt round.
///
/// Exactly one of the two sides is populated: if [`ReadStep::is_complete`],
/// [`ReadStep::content`] is the decrypted content; otherwise
/// [`ReadStep::to_fetch`] lists the URNs to obtain (in order) and pass to
/// [`decrypt_fetched`]. The symmetric key for fetched shards is the same key
/// as the shard that produced this step.
#[derive(Debug)]
pub struct ReadStep {
    content: Vec<u8>,
    fetch: Vec<Urn>,
    content_len: i64,
}

impl ReadStep {
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    /// URNs still needed, in the order shards must be supplied to
    /// [`decrypt_fetched`]. Empty when decryption is complete.
    pub fn to_fetch(&self) -> &[Urn] {
        &self.fetch
    }

    pub fn is_complete(&self) -> bool {
        self.fetch.is_empty()
    }

    fn from_record(record: Record) -> Self {
        match record {
            Record::Raw(content) => Self {
                content,
                fetch: Vec::new(),
                content_len: 0,
            },
            Record::Manifest { content_len, urns } => Self {
                content: Vec::new(),
                fetch: urns,
                content_len,
            },
        }
    }
}

/// Applies the datashards encryption and sharding algorithm.
///
/// Returns the index of the tree's root within the returned shards. The root
/// is the shard a reader must start from; lower levels precede upper levels
/// in the output. Deterministic: the same `(plain, key, suite)` always yields
/// identical shards.
pub fn encrypt(
    plain: &[u8],
    key: &SymmetricKey,
    suite: Suite,
) -> Result<(usize, Vec<PrivateShard>)> {
    let frames = frame(&Header::Raw, plain)?;
    let (root_index, shards) = encrypt_level(frames, key, suite)?;
    debug!(shards = shards.len(), root_index, "encrypted shard tree");
    Ok((root_index, shards))
}

fn encrypt_level(
    frames: Vec<FramedChunk>,
    key: &SymmetricKey,
    suite: Suite,
) -> Result<(usize, Vec<PrivateShard>)> {
    let count = frames.len();
    // A level that fits in one shard is the tree root.
    let role = if count == 1 {
        IvRole::EntryPoint
    } else {
        IvRole::Content
    };

    let mut shards = Vec::with_capacity(count);
    let mut urn_concat = String::new();
    let mut content_len: i64 = 0;
    for (ctr, chunk) in frames.iter().enumerate() {
        let shard = encrypt_chunk(&chunk.bytes, key, suite, ctr as u64, role)?;
        urn_concat.push_str(&shard.address.urn().to_string());
        content_len += chunk.payload_len as i64;
        shards.push(shard);
    }
    if count == 1 {
        return Ok((0, shards));
    }

    let header = Header::Manifest { content_len };
    let manifest_frames = frame(&header, urn_concat.as_bytes())?;
    let upper = if manifest_frames.len() == 1 {
        manifest_frames
    } else {
        // The manifest record itself overflows one shard. Carry its complete
        // encoding as raw content so a reader reassembles it from the level's
        // concatenated payloads, and describe those raw shards one level up.
        frame(&Header::Raw, &encode_record(&header, urn_concat.as_bytes()))?
    };
    let (upper_root, upper_shards) = encrypt_level(upper, key, suite)?;
    let root_index = count + upper_root;
    shards.extend(upper_shards);
    Ok((root_index, shards))
}

/// Opens the root shard of a tree.
///
/// The root decrypts under the `entry-point` role with counter 0. The result
/// either carries the content (single-shard tree) or the first fetch list.
pub fn decrypt(root: &PrivateShard, suite: Suite) -> Result<ReadStep> {
    let plain = decrypt_chunk(&root.content, root.address.key(), suite, 0, IvRole::EntryPoint)?;
    let step = ReadStep::from_record(decode_record(&plain)?);
    debug!(fetch = step.fetch.len(), "decrypted root shard");
    Ok(step)
}

/// Opens the shards fetched for a previous step's URN list.
///
/// `shards` must be supplied in the same order as the step listed their URNs.
/// Each must decode as a raw record; the reassembled payload (truncated to
/// the manifest's declared content length, which removes the final shard's
/// zero padding) is then either an interior manifest yielding the next fetch
/// list, or the caller's content.
pub fn decrypt_fetched(
    prev: &ReadStep,
    shards: &[PrivateShard],
    suite: Suite,
) -> Result<ReadStep> {
    let mut content = Vec::new();
    for (ctr, shard) in shards.iter().enumerate() {
        let plain = decrypt_chunk(
            &shard.content,
            shard.address.key(),
            suite,
            ctr as u64,
            IvRole::Content,
        )?;
        match decode_record(&plain)? {
            Record::Raw(payload) => content.extend_from_slice(&payload),
            Record::Manifest { .. } => {
                return Err(Error::UnexpectedManifestAtLeaf { index: ctr })
            }
        }
    }

    let want = prev.content_len as usize;
    if content.len() < want {
        return Err(Error::Truncated {
            got: content.len(),
            want,
        });
    }
    content.truncate(want);

    // Interior manifest levels reassemble into a record; user content does
    // not decode. A decode failure here is the expected terminal case, not an
    // error to propagate.
    match decode_record(&content) {
        Ok(record) => Ok(ReadStep::from_record(record)),
        Err(_) => Ok(ReadStep {
            content,
            fetch: Vec::new(),
            content_len: 0,
        }),
    }
}
