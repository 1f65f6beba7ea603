use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::protocols::teleinfo::layout::RECORD_TERMINATOR;
use crate::source::{LineSource, RawRecord, SourceError};

use super::layout;
use super::reader::read_record;

/// `LineSource` splitting a byte reader on newlines.
pub struct BufferedLineSource<R> {
    reader: R,
    max_record_len: usize,
}

impl BufferedLineSource<BufReader<File>> {
    /// Open a capture file or device node.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::from)?;
        Ok(Self::new(BufReader::with_capacity(
            layout::READER_BUFFER_SIZE,
            file,
        )))
    }
}

impl<R: BufRead> BufferedLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_record_len: layout::MAX_RECORD_LEN,
        }
    }

    pub fn with_max_record_len(mut self, max_record_len: usize) -> Self {
        self.max_record_len = max_record_len;
        self
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> LineSource for BufferedLineSource<R> {
    fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        let record = read_record(&mut self.reader, RECORD_TERMINATOR, self.max_record_len)?;
        Ok(record.map(RawRecord::new))
    }
}

#[cfg(test)]
mod tests {
    use super::BufferedLineSource;
    use crate::source::{LineSource, SourceError};
    use std::io::Cursor;

    #[test]
    fn yields_records_then_end_of_stream() {
        let mut source = BufferedLineSource::new(Cursor::new(b"\x02\nADCO 1\n\x03".to_vec()));
        assert_eq!(source.next_record().unwrap().unwrap().as_bytes(), b"\x02\n");
        assert_eq!(
            source.next_record().unwrap().unwrap().as_bytes(),
            b"ADCO 1\n"
        );
        assert_eq!(source.next_record().unwrap().unwrap().as_bytes(), b"\x03");
        assert!(source.next_record().unwrap().is_none());
    }

    #[test]
    fn overlong_record_maps_to_transport_error() {
        let mut source =
            BufferedLineSource::new(Cursor::new(vec![b'x'; 32])).with_max_record_len(16);
        let err = source.next_record().unwrap_err();
        assert!(matches!(err, SourceError::Transport { .. }));
    }
}
