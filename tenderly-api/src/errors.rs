use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum TenderlyError {
    #[error("Bad status code {status}: {body}")]
    BadStatusCode { status: StatusCode, body: String },
    #[error("Tenderly API error {status} ({slug}): {message}")]
    Api { status: StatusCode, slug: String, message: String },
    #[error("Access key rejected by the Tenderly API: {0}")]
    Unauthorized(String),
    #[error("Fork response did not contain `simulation_fork.id`")]
    MissingForkId,
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("Missing field: {0}")]
    Builder(String),
}

impl TenderlyError {
    /// Returns `true` if the request never produced an HTTP response, i.e. the API was
    /// unreachable or the connection was interrupted.
    pub fn is_transport(&self) -> bool {
        matches!(self, TenderlyError::Reqwest(err) if err.status().is_none() && !err.is_decode())
    }
}
