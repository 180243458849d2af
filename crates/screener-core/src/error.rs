use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreenerError {
    /// Transport or upstream failure: connect errors, auth rejections,
    /// non-success HTTP statuses.
    #[error("API error: {0}")]
    ApiError(String),

    /// The provider answered but the payload did not match the expected
    /// shape. Handled identically to [`ScreenerError::ApiError`] by callers.
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}
