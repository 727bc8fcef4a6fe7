use std::{fs, path::PathBuf};

use crate::art::{ArtResolver, UploadError, art_file_name, join_url};

/// Route prefix under which the art server exposes the store
pub const ART_ROUTE: &str = "art";

/// Keeps pictures in a local directory served by the art HTTP server
#[derive(Debug, Clone)]
pub struct LocalArtStore {
    pub dir: PathBuf,
    base_url: String,
}

impl LocalArtStore {
    pub fn new(dir: PathBuf, base_url: String) -> Self {
        Self { dir, base_url }
    }

    pub fn url_for(&self, file: &str) -> String {
        join_url(&self.base_url, &format!("{ART_ROUTE}/{file}"))
    }
}

impl ArtResolver for LocalArtStore {
    fn upload(&self, bytes: &[u8]) -> Result<String, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        let file = art_file_name(bytes);
        let path = self.dir.join(&file);

        if path.is_file() {
            log::debug!("art {file} already stored");
        } else {
            fs::create_dir_all(&self.dir)?;
            // write under a temporary name so the server never sees half a file
            let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
            std::io::Write::write_all(&mut tmp, bytes)?;
            tmp.persist(&path).map_err(|e| UploadError::Fs(e.error))?;
            log::info!("stored art {} ({} bytes)", path.to_string_lossy(), bytes.len());
        }

        Ok(self.url_for(&file))
    }
}
