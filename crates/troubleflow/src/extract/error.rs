/// Errors raised while pulling a JSON flow payload out of a generated response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse flow payload as JSON: {0}")]
    JsonParsingFailed(String),

    #[error("Failed to extract a flow payload from response: {0:?}")]
    AllStrategiesFailed(Vec<String>),

    #[error("Invalid format in response: {0}")]
    InvalidFormat(String),
}
