use std::{io::Write, process::Command};

use crate::art::{ArtResolver, UploadError, art_file_name, join_url};

const UPLOAD_COMMAND: &str = "rsync";
const UPLOAD_OPTIONS: &str = "--chmod=u+rw,g+r,o+r";

/// Copies pictures to a remote web root with rsync over ssh
#[derive(Debug, Clone)]
pub struct RsyncUpload {
    host: String,
    user: String,
    upload_path: String,
    download_path: String,
}

impl RsyncUpload {
    pub fn new(host: String, user: String, upload_path: String, download_path: String) -> Self {
        Self {
            host,
            user,
            upload_path,
            download_path,
        }
    }

    /// `user@host:upload_path/file`
    pub fn remote_destination(&self, file: &str) -> String {
        format!("{}@{}:{}", self.user, self.host, join_url(&self.upload_path, file))
    }

    pub fn download_url(&self, file: &str) -> String {
        join_url(&self.download_path, file)
    }
}

impl ArtResolver for RsyncUpload {
    fn upload(&self, bytes: &[u8]) -> Result<String, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        let file = art_file_name(bytes);

        let mut art_file = tempfile::NamedTempFile::new()?;
        art_file.write_all(bytes)?;
        art_file.flush()?;

        let destination = self.remote_destination(&file);
        log::debug!("{UPLOAD_COMMAND} {} -> {destination}", art_file.path().to_string_lossy());
        let status = Command::new(UPLOAD_COMMAND)
            .arg(UPLOAD_OPTIONS)
            .arg(art_file.path())
            .arg(&destination)
            .status()?;

        if !status.success() {
            return Err(UploadError::Command {
                command: UPLOAD_COMMAND.to_string(),
                status: status.to_string(),
            });
        }

        Ok(self.download_url(&file))
    }
}

#[cfg(test)]
mod tests {
    use super::RsyncUpload;
    use crate::art::{ArtResolver, UploadError};

    fn upload() -> RsyncUpload {
        RsyncUpload::new(
            "static.example".into(),
            "www".into(),
            "/srv/www/art/".into(),
            "https://static.example/art".into(),
        )
    }

    #[test]
    fn test_builds_remote_and_download_locations() {
        let rsync = upload();
        assert_eq!(
            rsync.remote_destination("abc.png"),
            "www@static.example:/srv/www/art/abc.png"
        );
        assert_eq!(
            rsync.download_url("abc.png"),
            "https://static.example/art/abc.png"
        );
    }

    #[test]
    fn test_empty_picture_is_rejected_before_running_rsync() {
        assert!(matches!(upload().upload(b""), Err(UploadError::Empty)));
    }
}
