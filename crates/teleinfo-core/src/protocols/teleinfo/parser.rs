use std::fmt;

use crate::source::RawRecord;

use super::error::TeleinfoError;
use super::layout;
use super::reader::{TeleinfoReader, group_checksum, tokens};

/// Frame delimiter detected inside a decoded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMarker {
    StartOfFrame,
    EndOfFrame,
}

impl FrameMarker {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            layout::START_OF_FRAME => Some(Self::StartOfFrame),
            layout::END_OF_FRAME => Some(Self::EndOfFrame),
            _ => None,
        }
    }
}

/// One record decoded as trimmed ASCII text. Never holds a record terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    text: String,
}

impl DecodedLine {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Frame markers in order of appearance.
    pub fn markers(&self) -> impl Iterator<Item = FrameMarker> + '_ {
        self.text.bytes().filter_map(FrameMarker::from_byte)
    }

    pub fn has_marker(&self) -> bool {
        self.markers().next().is_some()
    }

    /// Whether `marker` appears anywhere in the line.
    pub fn contains(&self, marker: FrameMarker) -> bool {
        self.markers().any(|found| found == marker)
    }
}

impl fmt::Display for DecodedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Result of checking the optional third token of a field group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    Valid,
    Invalid,
    Missing,
}

/// A `name value` pair read from a field group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    pub name: String,
    pub value: String,
    /// Third token when present (the group checksum on real meters).
    pub trailer: Option<String>,
}

impl FieldRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            trailer: None,
        }
    }

    /// Compare the trailer against the historic-mode checksum.
    ///
    /// A checksum equal to the space character is indistinguishable from a
    /// missing one once whitespace is split away.
    pub fn checksum_status(&self) -> ChecksumStatus {
        match self.trailer.as_deref() {
            None => ChecksumStatus::Missing,
            Some(trailer) => {
                let expected = group_checksum(&self.name, &self.value);
                if trailer.as_bytes() == [expected] {
                    ChecksumStatus::Valid
                } else {
                    ChecksumStatus::Invalid
                }
            }
        }
    }
}

/// Decode a raw record into a trimmed ASCII line.
pub fn decode_line(record: &RawRecord) -> Result<DecodedLine, TeleinfoError> {
    let reader = TeleinfoReader::new(record.as_bytes());
    let text = reader.read_trimmed()?;
    Ok(DecodedLine {
        text: text.to_string(),
    })
}

/// Parse a field group; tokens past the checksum are ignored.
pub fn parse_field(line: &DecodedLine) -> Result<FieldRecord, TeleinfoError> {
    let parts = tokens(line.as_str());
    if parts.len() < layout::MIN_FIELD_TOKENS {
        return Err(TeleinfoError::TooFewTokens {
            needed: layout::MIN_FIELD_TOKENS,
            found: parts.len(),
        });
    }
    Ok(FieldRecord {
        name: parts[layout::NAME_TOKEN].to_string(),
        value: parts[layout::VALUE_TOKEN].to_string(),
        trailer: parts
            .get(layout::CHECKSUM_TOKEN)
            .map(|token| token.to_string()),
    })
}
