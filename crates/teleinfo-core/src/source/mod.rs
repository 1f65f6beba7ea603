mod buffered;

pub use buffered::BufferedLineSource;

use thiserror::Error;

/// One physical record read from the link, not yet validated as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    bytes: Vec<u8>,
}

impl RawRecord {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for RawRecord {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for RawRecord {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl From<&str> for RawRecord {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes().to_vec())
    }
}

/// Yields one terminated record at a time.
///
/// `Ok(None)` means the stream ended; an `Err` is a failure of this read only
/// and the caller may keep reading.
pub trait LineSource {
    fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError>;
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        (**self).next_record()
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error ({context}): {message}")]
    Transport {
        context: &'static str,
        message: String,
    },
}

impl From<buffered::error::BufferedSourceError> for SourceError {
    fn from(value: buffered::error::BufferedSourceError) -> Self {
        match value {
            buffered::error::BufferedSourceError::Io(err) => SourceError::Io(err),
            buffered::error::BufferedSourceError::RecordTooLong { limit } => {
                SourceError::Transport {
                    context: "record read",
                    message: format!("record exceeds {limit} bytes without terminator"),
                }
            }
        }
    }
}
