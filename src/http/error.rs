use rouille::Response;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ApiError::NotFound("art not found".into()),
            _ => {
                log::error!("failed to read art: {err}");
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        Response::text(self.to_string()).with_status_code(status)
    }
}
