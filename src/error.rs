use thiserror::Error;

/// Everything that can go wrong between receiving a request and finishing
/// its stream. Variants that fire before the response is committed map to a
/// synchronous JSON error; anything after commit just ends the connection.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("unsupported media type: {0}")]
    UnsupportedType(String),

    #[error("failed to parse uploaded content: {0}")]
    ParseFailure(String),

    #[error("no message or file provided")]
    EmptyInput,

    #[error("file size exceeds the {limit_bytes} byte limit")]
    SizeLimitExceeded { limit_bytes: u64 },

    #[error("upstream invocation failed: {0}")]
    UpstreamInvocationFailure(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),
}
