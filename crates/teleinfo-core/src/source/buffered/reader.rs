use std::io::BufRead;

use super::error::BufferedSourceError;

/// Read one record up to and including `terminator`.
///
/// Returns `Ok(None)` at end of stream. A trailing record without terminator
/// is still returned. Records longer than `limit` are drained up to their
/// terminator and reported as an error, so the next read starts clean.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use teleinfo_core::source::buffered::reader::read_record;
/// use std::io::Cursor;
///
/// let mut cursor = Cursor::new(b"ADCO 1\nPTEC HC..".to_vec());
/// assert_eq!(read_record(&mut cursor, b'\n', 64).unwrap(), Some(b"ADCO 1\n".to_vec()));
/// ```
///
/// # Errors
/// Returns `BufferedSourceError` when the reader fails or the limit is hit.
pub fn read_record<R: BufRead>(
    reader: &mut R,
    terminator: u8,
    limit: usize,
) -> Result<Option<Vec<u8>>, BufferedSourceError> {
    let mut record = Vec::new();
    let mut overflowed = false;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            break;
        }
        let (chunk, done) = match available.iter().position(|&b| b == terminator) {
            Some(index) => (&available[..=index], true),
            None => (available, false),
        };
        let consumed = chunk.len();
        if !overflowed {
            if record.len() + chunk.len() > limit {
                overflowed = true;
                record.clear();
            } else {
                record.extend_from_slice(chunk);
            }
        }
        reader.consume(consumed);
        if done {
            break;
        }
    }
    if overflowed {
        return Err(BufferedSourceError::RecordTooLong { limit });
    }
    if record.is_empty() {
        return Ok(None);
    }
    Ok(Some(record))
}
