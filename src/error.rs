//! Error taxonomy for the polling loop.
//!
//! Only [`BotError::Config`] is fatal, and only at startup. Everything else is logged by the
//! loop controller and the next cycle retries.

/// Structural problems with the API payload, raised before any record is read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("API response is not a JSON object")]
    NotAnObject,

    #[error("API response is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("API response field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Missing credentials or an unreadable config file.
    #[error("config error: {0}")]
    Config(String),

    /// Transport failure, non-2xx status, or an undecodable body.
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("unknown homework status `{0}`")]
    UnknownStatus(String),

    /// A homework record lacks a required field (or it is null).
    #[error("homework record is missing `{0}`")]
    MissingField(&'static str),

    #[error("delivery error: {0}")]
    Delivery(String),
}

impl BotError {
    /// Errors scoped to a single homework record rather than the whole payload.
    pub fn is_record_level(&self) -> bool {
        matches!(self, BotError::UnknownStatus(_) | BotError::MissingField(_))
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
