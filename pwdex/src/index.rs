//! The resident sparse index: fence-post record offsets per key-prefix bucket.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use crate::KEY_LEN;
use crate::error::{Error, Result};

/// Number of leading key bytes used to select a bucket.
///
/// This is the build-time memory/latency dial: one byte means 256 buckets
/// and a deep per-bucket search, three bytes mean 16,777,216 buckets (a
/// ~134 MB resident index) and a handful of probes per lookup. Four bytes
/// would need a ~34 GB index and is rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixLen(usize);

impl PrefixLen {
    /// Largest supported width in bytes.
    pub const MAX: usize = 3;

    pub fn new(len: usize) -> Result<Self> {
        if (1..=Self::MAX).contains(&len) {
            Ok(Self(len))
        } else {
            Err(Error::InvalidPrefixLen { len })
        }
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Number of buckets, `2^(8P)`.
    pub fn bucket_count(self) -> usize {
        1usize << (8 * self.0)
    }

    /// Bytes of a key stored per record, `20 - P`.
    pub fn suffix_len(self) -> usize {
        KEY_LEN - self.0
    }

    /// The bucket for `key`: its first `P` bytes as a big-endian integer.
    pub fn prefix_of(self, key: &[u8; KEY_LEN]) -> u32 {
        key[..self.0].iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
    }
}

/// Fence-post array bounding each bucket's record range in the packed
/// dataset.
///
/// `table[i]` is the index of the first record whose prefix is `>= i`, and
/// `table[bucket_count]` is the total record count. Entries never decrease,
/// which is exactly what makes `[table[i], table[i + 1])` a valid (possibly
/// empty) search range for bucket `i` — including buckets with no records,
/// whose entry was fill-forwarded at build time.
#[derive(Debug, Clone)]
pub struct SparseIndex {
    prefix_len: PrefixLen,
    table: Vec<u64>,
}

impl SparseIndex {
    /// Wraps a fence-post table, validating its shape and monotonicity.
    pub fn from_table(prefix_len: PrefixLen, table: Vec<u64>) -> Result<Self> {
        if table.len() != prefix_len.bucket_count() + 1 {
            return Err(Error::IndexSize { len: table.len() as u64 * 8 });
        }
        for (i, pair) in table.windows(2).enumerate() {
            if pair[0] > pair[1] {
                return Err(Error::IndexOrder { prefix: i as u32 });
            }
        }
        Ok(Self { prefix_len, table })
    }

    pub fn prefix_len(&self) -> PrefixLen {
        self.prefix_len
    }

    /// Total records in the packed dataset (the trailing fence post).
    pub fn record_count(&self) -> u64 {
        self.table[self.prefix_len.bucket_count()]
    }

    /// Half-open record range that may contain keys with `prefix`. Two array
    /// reads, no disk access.
    pub fn range_for(&self, prefix: u32) -> (u64, u64) {
        let i = prefix as usize;
        (self.table[i], self.table[i + 1])
    }

    /// Record count of the largest bucket. Bounds the binary-search depth of
    /// any lookup.
    pub fn max_bucket_len(&self) -> u64 {
        self.table.windows(2).map(|pair| pair[1] - pair[0]).max().unwrap_or(0)
    }

    /// Serialized size in bytes for a given prefix length:
    /// `8 * (2^(8P) + 1)`.
    pub fn encoded_len(prefix_len: PrefixLen) -> u64 {
        8 * (prefix_len.bucket_count() as u64 + 1)
    }

    /// Writes the table as little-endian u64s.
    ///
    /// The on-disk form is exactly the fence-post array, no header: the
    /// prefix length is implied by the file size, which is distinct for
    /// every supported width.
    pub fn write_to(&self, w: &mut impl Write) -> std::io::Result<()> {
        const CHUNK: usize = 8192;

        let mut buf = Vec::with_capacity(CHUNK);
        for &entry in &self.table {
            buf.extend_from_slice(&entry.to_le_bytes());
            if buf.len() == CHUNK {
                w.write_all(&buf)?;
                buf.clear();
            }
        }
        w.write_all(&buf)
    }

    /// Reads an index serialized by [`write_to`](Self::write_to).
    ///
    /// `len` must be the exact byte size of the input; the prefix length is
    /// recovered from it. A size matching no supported width or a decreasing
    /// entry pair is corruption, reported as such rather than misread.
    pub fn read_from(mut r: impl Read, len: u64) -> Result<Self> {
        let prefix_len = (1..=PrefixLen::MAX)
            .map(PrefixLen)
            .find(|&p| Self::encoded_len(p) == len)
            .ok_or(Error::IndexSize { len })?;

        let entries = prefix_len.bucket_count() + 1;
        let mut table = Vec::with_capacity(entries);
        let mut buf = [0u8; 8192];
        let mut remaining = entries;
        while remaining > 0 {
            let take = remaining.min(buf.len() / 8);
            let chunk = &mut buf[..take * 8];
            r.read_exact(chunk)?;
            for word in chunk.chunks_exact(8) {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(word);
                table.push(u64::from_le_bytes(raw));
            }
            remaining -= take;
        }

        Self::from_table(prefix_len, table)
    }

    /// Loads an index file into memory. Done once per session; every lookup
    /// afterwards is served from the resident table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Self::read_from(BufReader::new(file), len)
    }
}
