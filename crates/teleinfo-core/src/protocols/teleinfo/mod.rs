//! Teleinfo (historic mode) record decoding.
//!
//! A meter emits frames delimited by STX/ETX bytes. Each frame holds field
//! groups of the form `NAME VALUE CHECKSUM`, one per record. This module turns
//! one raw record into a trimmed ASCII line, detects frame markers inside it,
//! and splits field groups into name/value pairs. Frame state lives in
//! `crate::frame`; nothing here keeps state between records.
//!
//! Version française (résumé):
//! Décodage d'un enregistrement brut de la Télé-information client (mode
//! historique) : texte ASCII nettoyé, détection des marqueurs STX/ETX et
//! découpage des groupes `ÉTIQUETTE DONNÉE CHECKSUM`.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::TeleinfoError;
pub use layout::{Parity, SERIAL_SETTINGS, SerialSettings};
pub use parser::{ChecksumStatus, DecodedLine, FieldRecord, FrameMarker, decode_line, parse_field};
