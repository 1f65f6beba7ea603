//! Line source over any buffered byte reader.
//!
//! Capture files and serial device nodes are both read through this source.
//! It only splits on the record terminator; decoding and validation happen
//! downstream.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::BufferedLineSource;
