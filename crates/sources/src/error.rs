use thiserror::Error;

/// Failure of one collaborator call. Never reaches the feed consumer: the
/// aggregator turns it into an empty contribution for that source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Decode error at {endpoint}: {detail}")]
    Decode { endpoint: String, detail: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
