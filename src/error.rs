use thiserror::Error;

pub type Result<T> = std::result::Result<T, EstudioError>;

/// Failure taxonomy for one study request.
///
/// Transport-layer variants (`FetchTimeout`, `FetchUnavailable`,
/// `SelectionNotFound`) are retryable at the caller's discretion.
/// `SectionMalformed` and historical-lookup failures never surface here:
/// they degrade the affected slice and are recorded in the study metadata.
/// `StudyUnavailable` is fatal for the request; nothing is cached.
#[derive(Debug, Error)]
pub enum EstudioError {
    #[error("invalid match id: {0}")]
    InvalidMatchId(String),

    #[error("fetch timed out: {0}")]
    FetchTimeout(String),

    #[error("fetch unavailable: {url}: {reason}")]
    FetchUnavailable { url: String, reason: String },

    #[error("selection not found: {0}")]
    SelectionNotFound(String),

    #[error("section malformed: {0}")]
    SectionMalformed(String),

    #[error("study unavailable: {0}")]
    StudyUnavailable(String),

    #[error("{0}")]
    Other(String),
}

impl EstudioError {
    /// Transport-layer failures worth a backoff-and-retry at the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EstudioError::FetchTimeout(_)
                | EstudioError::FetchUnavailable { .. }
                | EstudioError::SelectionNotFound(_)
        )
    }
}

/* Conversions so `?` works smoothly */
impl From<std::io::Error> for EstudioError {
    fn from(e: std::io::Error) -> Self {
        EstudioError::Other(e.to_string())
    }
}
impl From<serde_json::Error> for EstudioError {
    fn from(e: serde_json::Error) -> Self {
        EstudioError::Other(e.to_string())
    }
}
impl From<reqwest::Error> for EstudioError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| u.to_string()).unwrap_or_default();
        if e.is_timeout() {
            EstudioError::FetchTimeout(url)
        } else {
            EstudioError::FetchUnavailable {
                url,
                reason: e.to_string(),
            }
        }
    }
}
