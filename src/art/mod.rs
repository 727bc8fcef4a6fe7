//! Turns cover art bytes into a URL that the announcement can link to

use thiserror::Error;

use crate::{config::ArtConfig, domain::hash::ArtId};

pub mod local;
pub mod rsync;

pub use local::LocalArtStore;
pub use rsync::RsyncUpload;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("art upload is not configured")]
    Disabled,

    #[error("picture is empty")]
    Empty,

    #[error("filesystem error: {0}")]
    Fs(#[from] std::io::Error),

    #[error("{command} exited with {status}")]
    Command { command: String, status: String },
}

/// Stores a picture somewhere reachable and returns its URL
pub trait ArtResolver: Send {
    fn upload(&self, bytes: &[u8]) -> Result<String, UploadError>;
}

/// Used when no art destination is configured; every upload fails
#[derive(Debug, Default)]
pub struct DisabledArt;

impl ArtResolver for DisabledArt {
    fn upload(&self, _bytes: &[u8]) -> Result<String, UploadError> {
        Err(UploadError::Disabled)
    }
}

/// Guesses the image format from its magic number
pub fn sniff_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\xFF\xD8\xFF") {
        "jpg"
    } else if bytes.starts_with(b"GIF8") {
        "gif"
    } else {
        "png"
    }
}

/// File name for a picture: its content hash plus extension
pub fn art_file_name(bytes: &[u8]) -> String {
    format!("{}.{}", ArtId::from_bytes(bytes), sniff_extension(bytes))
}

/// Joins a base URL and a file name
pub fn join_url(base: &str, file: &str) -> String {
    let base = base.trim_end_matches('/');
    format!("{base}/{file}")
}

pub fn from_config(config: Option<&ArtConfig>) -> Box<dyn ArtResolver> {
    match config {
        None => Box::new(DisabledArt),
        Some(ArtConfig::Local { dir, base_url }) => {
            Box::new(LocalArtStore::new(dir.clone(), base_url.clone()))
        }
        Some(ArtConfig::Rsync {
            host,
            user,
            upload_path,
            download_path,
        }) => Box::new(RsyncUpload::new(
            host.clone(),
            user.clone(),
            upload_path.clone(),
            download_path.clone(),
        )),
    }
}
