use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimelineError {
    /// A cursor cannot address an empty timeline.
    #[error("timeline is empty")]
    Empty,
    #[error("sample index {index} out of range for timeline of {len}")]
    OutOfRange { index: usize, len: usize },
    #[error("malformed upstream payload: {0}")]
    Schema(String),
}
