//! Byte stores backing the packed dataset.
//!
//! Lookups only ever need positioned reads of a few bytes, and building only
//! ever appends, so the two sides are separate traits. The in-memory store
//! implements both and is what tests and benchmarks run against.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Read side: random access over an immutable byte range.
///
/// `read_at` takes `&self`, so one store handle can serve concurrent lookups
/// from any number of threads.
pub trait ByteStore {
    /// Total size in bytes.
    fn len(&self) -> u64;

    /// Returns true when the store holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `buf` from `offset`. Reading past the end is an error, never a
    /// short read.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

/// Write side, used only while building: sequential append.
pub trait AppendStore {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// A packed dataset on disk, read through positioned reads on one shared
/// handle. No seeking, so the handle needs no locking.
#[derive(Debug)]
pub struct FileStore {
    file: File,
    len: u64,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl ByteStore for FileStore {
    fn len(&self) -> u64 {
        self.len
    }

    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::unix::fs::FileExt;

        self.file.read_exact_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        let mut read = 0usize;
        while read < buf.len() {
            match self.file.seek_read(&mut buf[read..], offset + read as u64) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// In-memory store implementing both sides. The test seam: builder output
/// can be inspected byte for byte, and lookups run without touching disk.
#[derive(Debug, Default, Clone)]
pub struct MemStore {
    bytes: Vec<u8>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl ByteStore for MemStore {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(&self.bytes[start..end]);
        Ok(())
    }
}

impl AppendStore for MemStore {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }
}

/// Buffered file appender for the build side.
///
/// `finish` flushes and fsyncs; a sink dropped without `finish` leaves an
/// unsynced temporary that the builder never publishes.
#[derive(Debug)]
pub struct FileSink {
    inner: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::from_file(File::create(path)?))
    }

    pub fn from_file(file: File) -> Self {
        Self { inner: BufWriter::new(file) }
    }

    /// Flushes buffered records and syncs the file to stable storage.
    pub fn finish(self) -> io::Result<File> {
        let file = self.inner.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()?;
        Ok(file)
    }
}

impl AppendStore for FileSink {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }
}
