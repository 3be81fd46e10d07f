use thiserror::Error;

/// Hard failures of the outbound exchange: the endpoint could not be
/// reached, or replied outside the HTTP success range, or with a body that
/// is not JSON at all.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("endpoint base URL is not configured")]
    MissingBaseUrl,
    #[error("exchange request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("endpoint returned a non-JSON body")]
    NonJsonBody,
}

/// Failures surfaced to callers of the orchestrator.
///
/// A rejected input is a distinct outcome, not a transport failure: the
/// endpoint answered correctly and declared the query out of scope.
/// Malformed-but-successful payloads never appear here; they are parsed as
/// sentinel content and scored low instead.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("query rejected by endpoint: {message}")]
    Rejected { message: String },
}

impl QueryError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}
