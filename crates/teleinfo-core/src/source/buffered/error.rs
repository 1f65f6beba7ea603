use thiserror::Error;

#[derive(Debug, Error)]
pub enum BufferedSourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record exceeds {limit} bytes without terminator")]
    RecordTooLong { limit: usize },
}
