use thiserror::Error;

/// Reasons an upstream response is rejected as a whole.
///
/// Any of these makes the current poll cycle abstain; the next tick is an
/// independent attempt.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Response body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response body is not a JSON object")]
    NotAnObject,

    #[error("Upstream reported success != 1 (got {got})")]
    UnsuccessfulResponse { got: String },

    #[error("Response has no `results` array")]
    MissingResults,

    #[error("Response `results` array is empty")]
    EmptyResults,

    #[error("Response `results[0]` is not an array of events")]
    MalformedEventList,
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
