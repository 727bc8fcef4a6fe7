use std::fmt::Display;

use blake3::Hash;

/// Content address of a piece of cover art.
///
/// The same picture always maps to the same id, so uploading it twice
/// yields the same file name and the same URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtId(pub Hash);

impl ArtId {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    pub fn from_hex(hex: &str) -> Result<Self, blake3::HexError> {
        Ok(Self(Hash::from_hex(hex)?))
    }
}

impl Display for ArtId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
