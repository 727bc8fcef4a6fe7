use std::fmt::Display;

/// Four byte tag carried by every metadata item, e.g. `minm` or `PICT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// Cover art picture.
    pub const PICTURE: FourCc = FourCc(*b"PICT");
    pub const ARTIST: FourCc = FourCc(*b"asaa");
    pub const ARTIST_FALLBACK: FourCc = FourCc(*b"assa");
    pub const ALBUM: FourCc = FourCc(*b"assu");
    pub const TITLE: FourCc = FourCc(*b"minm");
    pub const TITLE_FALLBACK: FourCc = FourCc(*b"assn");
    pub const GENRE: FourCc = FourCc(*b"asgn");

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 4]>::try_from(bytes).ok().map(Self)
    }
}

impl Display for FourCc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}
