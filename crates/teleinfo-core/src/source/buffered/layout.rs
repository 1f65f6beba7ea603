/// Read buffer for files and device nodes.
pub const READER_BUFFER_SIZE: usize = 8 * 1024;

/// Longest record accepted before the source reports an error. A Teleinfo
/// group is under 40 bytes; anything far beyond means a missing terminator.
pub const MAX_RECORD_LEN: usize = 4 * 1024;
