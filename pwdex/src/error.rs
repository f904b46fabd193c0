use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input line {line}: {reason}")]
    InputFormat { line: u64, reason: &'static str },

    #[error("input line {line}: key {key} is not strictly greater than its predecessor")]
    UnsortedInput { line: u64, key: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("prefix length {len} is unsupported (must be 1, 2 or 3 bytes)")]
    InvalidPrefixLen { len: usize },

    #[error("index size of {len} bytes matches no supported prefix length")]
    IndexSize { len: u64 },

    #[error("index entries decrease at prefix {prefix:#x}")]
    IndexOrder { prefix: u32 },

    #[error("dataset is {len} bytes but the index describes {expected}")]
    DatasetSize { len: u64, expected: u64 },

    #[error("suffix is {actual} bytes, expected {expected}")]
    SuffixLength { expected: usize, actual: usize },
}
