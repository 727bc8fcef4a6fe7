use thiserror::Error;

/// A framed item that could not be turned into a record at all
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed item: {0}")]
    Malformed(String),

    #[error("input ended inside an item ({0} bytes buffered)")]
    Truncated(usize),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for FrameError {
    fn from(err: quick_xml::Error) -> Self {
        FrameError::Malformed(err.to_string())
    }
}

/// A sub-field of an otherwise well-formed item that failed to decode
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("<{field}> is not valid hex: {source}")]
    Hex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("<{field}> must decode to 4 bytes, got {len}")]
    CodeLength { field: &'static str, len: usize },

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}
