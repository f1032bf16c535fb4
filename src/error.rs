use thiserror::Error;

pub type Result<T> = std::result::Result<T, DedupError>;

#[derive(Error, Debug)]
pub enum DedupError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Index out of bounds: {index} >= {capacity}")]
    IndexOutOfBounds { index: u64, capacity: u64 },

    #[error("Format error: {0}")]
    Format(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DedupError {
    pub(crate) fn unexpected_version(
        actual: impl std::fmt::Display,
        expected: u32,
    ) -> Self {
        DedupError::Format(format!(
            "Unexpected de-duplicator version number ({actual}), \
             expected {expected}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = DedupError::IndexOutOfBounds {
            index: 64,
            capacity: 64,
        };
        assert_eq!(err.to_string(), "Index out of bounds: 64 >= 64");

        let err = DedupError::unexpected_version(7, 2);
        assert_eq!(
            err.to_string(),
            "Format error: Unexpected de-duplicator version number (7), expected 2"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: DedupError = io.into();
        assert!(matches!(err, DedupError::Io(_)));
    }
}
