use thiserror::Error;

/// Failures surfaced to views by the stores and flows.
///
/// Gateway and storage implementations work in `anyhow::Result`; the
/// conversion below keeps the full context chain as the message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HotelError {
    /// Rejected before any network call was made.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Gateway(String),

    #[error("Malformed data: {0}")]
    Malformed(String),
}

impl HotelError {
    pub fn validation(message: impl Into<String>) -> Self {
        HotelError::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, HotelError::Validation(_))
    }
}

impl From<anyhow::Error> for HotelError {
    fn from(err: anyhow::Error) -> Self {
        HotelError::Gateway(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for HotelError {
    fn from(err: serde_json::Error) -> Self {
        HotelError::Malformed(err.to_string())
    }
}

pub type HotelResult<T> = Result<T, HotelError>;
