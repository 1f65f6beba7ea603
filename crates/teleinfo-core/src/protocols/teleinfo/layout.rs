//! Wire-level constants for the historic Teleinfo link.

use std::fmt;

/// STX: opens a frame.
pub const START_OF_FRAME: u8 = 0x02;
/// ETX: closes a frame.
pub const END_OF_FRAME: u8 = 0x03;
/// Terminator splitting the serial stream into records.
pub const RECORD_TERMINATOR: u8 = b'\n';

/// Field groups carry at least a name and a value token.
pub const MIN_FIELD_TOKENS: usize = 2;
pub const NAME_TOKEN: usize = 0;
pub const VALUE_TOKEN: usize = 1;
pub const CHECKSUM_TOKEN: usize = 2;

/// Separator between name and value, included in the checksummed bytes.
pub const FIELD_SEPARATOR: u8 = b' ';
pub const CHECKSUM_MASK: u32 = 0x3F;
pub const CHECKSUM_OFFSET: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Serial line parameters expected by the meter's output.
///
/// The decoder never applies these; opening the port with the right settings
/// is the transport's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    pub hardware_flow_control: bool,
}

pub const SERIAL_SETTINGS: SerialSettings = SerialSettings {
    baud_rate: 1200,
    data_bits: 7,
    parity: Parity::Even,
    stop_bits: 1,
    hardware_flow_control: true,
};

impl fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        write!(
            f,
            "{} baud {}{}{}",
            self.baud_rate, self.data_bits, parity, self.stop_bits
        )?;
        if self.hardware_flow_control {
            write!(f, " rtscts")?;
        }
        Ok(())
    }
}
