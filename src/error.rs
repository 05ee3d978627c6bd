use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{name}` is not a valid hook identifier: {reason}")]
    InvalidHookIdentifier { name: String, reason: &'static str },
    #[error("content type rule {index} has an empty match string")]
    EmptyMatch { index: usize },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures around the gate, while undoing or redoing the transport
/// encoding. The caller fulfills the response with the original body.
#[derive(Debug, Error)]
pub enum InterceptError {
    #[error("response body is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("response body is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
