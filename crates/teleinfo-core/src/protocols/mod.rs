//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: wire constants (source of truth)
//! - `reader`: safe byte access and protocol conventions
//! - `parser`: domain-level decoding
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O; sources and the link supervisor
//! handle reading and state.

pub mod teleinfo;
