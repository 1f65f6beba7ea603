use super::error::TeleinfoError;
use super::layout;

/// Safe access to the bytes of one raw record.
pub struct TeleinfoReader<'a> {
    bytes: &'a [u8],
}

impl<'a> TeleinfoReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn require_ascii(&self) -> Result<(), TeleinfoError> {
        match self.bytes.iter().position(|b| !b.is_ascii()) {
            Some(position) => Err(TeleinfoError::NotAscii {
                position,
                byte: self.bytes[position],
            }),
            None => Ok(()),
        }
    }

    /// Return the record as text with surrounding whitespace removed.
    ///
    /// Marker bytes are not whitespace and survive trimming.
    pub fn read_trimmed(&self) -> Result<&'a str, TeleinfoError> {
        self.require_ascii()?;
        let text = std::str::from_utf8(self.bytes).map_err(|e| TeleinfoError::NotAscii {
            position: e.valid_up_to(),
            byte: self.bytes[e.valid_up_to()],
        })?;
        let trimmed = text.trim();
        if let Some(position) = trimmed
            .bytes()
            .position(|b| b == layout::RECORD_TERMINATOR)
        {
            return Err(TeleinfoError::EmbeddedTerminator { position });
        }
        Ok(trimmed)
    }
}

/// Split a field group into its whitespace-delimited tokens.
pub fn tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Historic-mode group checksum over `NAME VALUE`.
///
/// # Examples
/// ```
/// use teleinfo_core::protocols::teleinfo::reader::group_checksum;
///
/// assert_eq!(group_checksum("PTEC", "TH.."), b'$');
/// ```
pub fn group_checksum(name: &str, value: &str) -> u8 {
    let sum: u32 = name
        .bytes()
        .chain(std::iter::once(layout::FIELD_SEPARATOR))
        .chain(value.bytes())
        .map(u32::from)
        .sum();
    // Masked to six bits, so the result always fits below 0x60.
    (sum & layout::CHECKSUM_MASK) as u8 + layout::CHECKSUM_OFFSET
}

#[cfg(test)]
mod tests {
    use super::{TeleinfoReader, group_checksum, tokens};
    use crate::protocols::teleinfo::error::TeleinfoError;

    #[test]
    fn trims_whitespace_but_keeps_markers() {
        let reader = TeleinfoReader::new(b"\x03\x02\r\n");
        assert_eq!(reader.read_trimmed().unwrap(), "\x03\x02");
    }

    #[test]
    fn rejects_non_ascii() {
        let reader = TeleinfoReader::new(b"PAPP \xe900750\n");
        let err = reader.read_trimmed().unwrap_err();
        assert_eq!(
            err,
            TeleinfoError::NotAscii {
                position: 5,
                byte: 0xe9
            }
        );
    }

    #[test]
    fn rejects_embedded_terminator() {
        let reader = TeleinfoReader::new(b"ADCO 1\nPTEC HC..\n");
        let err = reader.read_trimmed().unwrap_err();
        assert!(matches!(err, TeleinfoError::EmbeddedTerminator { position: 6 }));
    }

    #[test]
    fn tokens_ignore_repeated_whitespace() {
        assert_eq!(tokens("IINST  002 \t Y"), vec!["IINST", "002", "Y"]);
        assert!(tokens("").is_empty());
    }

    #[test]
    fn checksum_matches_meter_samples() {
        // Groups captured from a single-phase meter.
        assert_eq!(group_checksum("PTEC", "TH.."), b'$');
        assert_eq!(group_checksum("IINST", "002"), b'Y');
        assert_eq!(group_checksum("PAPP", "00750"), b'-');
    }
}
