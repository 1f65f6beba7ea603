use thiserror::Error;

/// Errors returned while decoding Teleinfo records.
///
/// # Examples
/// ```
/// use teleinfo_core::protocols::teleinfo::error::TeleinfoError;
///
/// let err = TeleinfoError::TooFewTokens { needed: 2, found: 1 };
/// assert!(err.to_string().contains("needs 2 tokens"));
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TeleinfoError {
    #[error("non-ASCII byte 0x{byte:02x} at offset {position}")]
    NotAscii { position: usize, byte: u8 },
    #[error("embedded record terminator at offset {position}")]
    EmbeddedTerminator { position: usize },
    #[error("field group needs {needed} tokens, got {found}")]
    TooFewTokens { needed: usize, found: usize },
}
