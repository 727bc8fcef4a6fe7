use log::info;
use rouille::{Request, Response};
use std::path::{Path, PathBuf};

use crate::{config::HttpConfig, domain::hash::ArtId, http::error::ApiError};

/// Serves the local art store so announced art URLs resolve
pub struct ArtServer {
    dir: PathBuf,
    pub config: HttpConfig,
}

impl ArtServer {
    pub fn new(dir: PathBuf, config: HttpConfig) -> Self {
        Self { dir, config }
    }

    /// Blocks forever serving requests
    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        info!("art server listening on http://{addr}");
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let response = rouille::router!(request,
            (GET) (/art/{name: String}) => {
                match self.get_art(&name) {
                    Ok(r) => r,
                    Err(e) => e.into_response(),
                }
            },
            _ => Response::empty_404()
        );

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    /// Only `<hash>.<known ext>` names are served, so requests cannot
    /// escape the art directory
    fn get_art(&self, name: &str) -> Result<Response, ApiError> {
        let (stem, ext) = name
            .rsplit_once('.')
            .ok_or_else(|| ApiError::BadRequest(format!("invalid art name {name}")))?;
        let id = ArtId::from_hex(stem)
            .map_err(|_| ApiError::BadRequest(format!("invalid art id {stem}")))?;
        let mime = Self::mime_from_ext(ext)
            .ok_or_else(|| ApiError::BadRequest(format!("unsupported art type {ext}")))?;

        let path = self.dir.join(format!("{id}.{ext}"));
        let file = std::fs::File::open(&path)?;
        log::debug!("ART {name} -> 200 OK, path: {}", path.to_string_lossy());

        Ok(Response::from_file(mime, file).with_public_cache(86_400))
    }

    /// Map file extension (without dot) to the MIME type of the picture
    pub fn mime_from_ext(ext: &str) -> Option<String> {
        match ext {
            "png" | "jpg" | "gif" => Some(
                mime_guess::from_path(Path::new("art").with_extension(ext))
                    .first_or_octet_stream()
                    .to_string(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use rouille::Request;
    use tempfile::TempDir;

    use super::ArtServer;
    use crate::{
        art::{ArtResolver, LocalArtStore},
        config::HttpConfig,
    };

    fn server(dir: &TempDir) -> ArtServer {
        ArtServer::new(
            dir.path().to_path_buf(),
            HttpConfig {
                bind_addr: "127.0.0.1".into(),
                port: 0,
            },
        )
    }

    fn get(server: &ArtServer, url: &str) -> rouille::Response {
        server.handle_request(&Request::fake_http("GET", url, vec![], vec![]))
    }

    #[test]
    fn test_serves_stored_art() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        let store = LocalArtStore::new(tmp.path().to_path_buf(), "http://deck".into());
        let png = b"\x89PNG\r\n\x1a\npixels";
        let url = store.upload(png)?;
        let path = url.trim_start_matches("http://deck");

        let response = get(&server(&tmp), path);

        assert_eq!(response.status_code, 200);
        let content_type = response
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Content-Type"))
            .map(|(_, v)| v.to_string());
        assert_eq!(content_type.as_deref(), Some("image/png"));

        let (mut body, _) = response.data.into_reader_and_size();
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)?;
        assert_eq!(bytes, png);
        Ok(())
    }

    #[test]
    fn test_rejects_names_that_are_not_hashes() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(get(&server(&tmp), "/art/..secret.png").status_code, 400);
        assert_eq!(get(&server(&tmp), "/art/cover.png").status_code, 400);
    }

    #[test]
    fn test_missing_art_is_404() {
        let tmp = TempDir::new().unwrap();
        let name = format!("{}.png", crate::domain::hash::ArtId::from_bytes(b"nothing"));
        assert_eq!(get(&server(&tmp), &format!("/art/{name}")).status_code, 404);
        assert_eq!(get(&server(&tmp), "/tracks/1").status_code, 404);
    }

    #[test]
    fn test_mime_types_for_known_extensions() {
        assert_eq!(ArtServer::mime_from_ext("jpg").as_deref(), Some("image/jpeg"));
        assert_eq!(ArtServer::mime_from_ext("gif").as_deref(), Some("image/gif"));
        assert_eq!(ArtServer::mime_from_ext("exe"), None);
    }
}
