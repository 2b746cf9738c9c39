//! Key-less content addresses
//!
//! Textual form: `urn:<algo>:<base64url-nopad digest>`. Handing out a URN
//! lets peers locate encrypted content without being able to decrypt it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::error::{Error, Result};
use crate::hash::HashAlgo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Urn {
    algo: HashAlgo,
    digest: Vec<u8>,
}

impl Urn {
    /// Addresses `content` under the given hash algorithm.
    pub fn new(algo: HashAlgo, content: &[u8]) -> Self {
        Self {
            algo,
            digest: algo.digest(content),
        }
    }

    /// Wraps an already-computed digest.
    pub fn from_digest(algo: HashAlgo, digest: Vec<u8>) -> Self {
        Self { algo, digest }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(Error::MalformedAddress(
                "urn: expecting 3 parts".to_owned(),
            ));
        }
        if parts[0] != "urn" {
            return Err(Error::MalformedAddress(
                "urn: not prefixed with 'urn'".to_owned(),
            ));
        }
        let algo = HashAlgo::parse(parts[1])?;
        let digest = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|e| Error::MalformedAddress(format!("urn digest: {e}")))?;
        Ok(Self { algo, digest })
    }

    pub fn algo(&self) -> HashAlgo {
        self.algo
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }
}

impl std::fmt::Display for Urn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "urn:{}:{}",
            self.algo.as_str(),
            URL_SAFE_NO_PAD.encode(&self.digest)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTRO_URN: &str = "urn:sha256d:X74UbU3NoLTA_Nupi8DhaJ_oQpQ95KFukMAkJJotKgo";

    const INTRO_DIGEST: [u8; 32] = [
        95, 190, 20, 109, 77, 205, 160, 180, 192, 252, 219, 169, 139, 192, 225, 104, 159, 232, 66,
        148, 61, 228, 161, 110, 144, 192, 36, 36, 154, 45, 42, 10,
    ];

    #[test]
    fn parse_intro_example() {
        let urn = Urn::parse(INTRO_URN).unwrap();
        assert_eq!(urn.algo(), HashAlgo::Sha256d);
        assert_eq!(urn.digest(), INTRO_DIGEST);
    }

    #[test]
    fn new_addresses_sample_content() {
        let content: [u8; 37] = [
            228, 193, 64, 108, 49, 53, 219, 108, 198, 21, 88, 134, 52, 118, 198, 214, 117, 85, 40,
            234, 45, 113, 128, 2, 99, 104, 77, 4, 225, 117, 218, 190, 14, 20, 231, 10, 60,
        ];
        let urn = Urn::new(HashAlgo::Sha256d, &content);
        assert_eq!(
            urn.to_string(),
            "urn:sha256d:JvaPnGGMmYdJGu8lEPy0JcMpfqQqC12hE42oOLjmx8k"
        );
    }

    #[test]
    fn display_renders_intro_example() {
        let urn = Urn::from_digest(HashAlgo::Sha256d, INTRO_DIGEST.to_vec());
        assert_eq!(urn.to_string(), INTRO_URN);
    }

    #[test]
    fn parse_rejects_malformed_strings() {
        for bad in [
            "urn:sha256d",
            "urn:sha256d:a:b",
            "nrn:sha256d:X74UbU3NoLTA_Nupi8DhaJ_oQpQ95KFukMAkJJotKgo",
            "urn:sha256d:!!!",
        ] {
            assert!(
                matches!(Urn::parse(bad), Err(Error::MalformedAddress(_))),
                "expected malformed: {bad}"
            );
        }
        assert!(matches!(
            Urn::parse("urn:md5:X74UbU3NoLTA"),
            Err(Error::UnknownHash(_))
        ));
    }

    #[test]
    fn parse_display_roundtrip() {
        let urn = Urn::parse(INTRO_URN).unwrap();
        assert_eq!(Urn::parse(&urn.to_string()).unwrap(), urn);
    }
}
