use beopjeon_core::Format;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unknown byte signature, or a signature that contradicts the declared format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// The parser library rejected the payload structure.
    #[error("corrupt {format} payload: {message}")]
    CorruptPayload { format: Format, message: String },
}

impl ParseError {
    pub(crate) fn corrupt(format: Format, err: impl std::fmt::Display) -> Self {
        Self::CorruptPayload {
            format,
            message: err.to_string(),
        }
    }
}
