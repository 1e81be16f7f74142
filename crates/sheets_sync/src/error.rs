use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("credentials error: {0}")]
    Credentials(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token signing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("spreadsheet api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("worksheet not found: {0}")]
    WorksheetNotFound(String),
}
