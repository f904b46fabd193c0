//! Two-level membership lookup: O(1) bucket range from the resident sparse
//! index, then binary search over fixed-width suffix records read straight
//! from the byte store.

use std::cmp::Ordering;
use std::path::Path;

use crate::KEY_LEN;
use crate::builder::{DATASET_FILE_NAME, INDEX_FILE_NAME};
use crate::error::{Error, Result};
use crate::index::SparseIndex;
use crate::store::{ByteStore, FileStore};

/// Outcome of a membership probe.
///
/// `NotFound` is an ordinary answer, not an error; failing to determine
/// membership (unreadable store, corrupt index) surfaces as [`Error`]
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found,
    NotFound,
}

impl Lookup {
    pub fn is_found(self) -> bool {
        matches!(self, Lookup::Found)
    }
}

/// Read-only membership engine over one immutable dataset/index snapshot.
///
/// `lookup` takes `&self` and the store reads by position, so a single
/// engine (typically behind an `Arc`) serves any number of threads without
/// locks. Switching to a newer corpus build means opening a new engine on
/// the new files; in-flight lookups keep seeing the old snapshot.
#[derive(Debug)]
pub struct LookupEngine<S> {
    index: SparseIndex,
    store: S,
}

impl LookupEngine<FileStore> {
    /// Opens the `pwdex.dat`/`pwdex.idx` snapshot pair in `dir`.
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let index = SparseIndex::load(dir.join(INDEX_FILE_NAME))?;
        let store = FileStore::open(dir.join(DATASET_FILE_NAME))?;
        Self::new(index, store)
    }
}

impl<S: ByteStore> LookupEngine<S> {
    /// Pairs an index with its packed dataset.
    ///
    /// The index was validated for shape and monotonicity when loaded; this
    /// adds the cross-check that the store's size matches the record count
    /// the index describes. All validation happens here, once — lookups
    /// assume a well-formed snapshot.
    pub fn new(index: SparseIndex, store: S) -> Result<Self> {
        let expected = index.record_count() * index.prefix_len().suffix_len() as u64;
        if store.len() != expected {
            return Err(Error::DatasetSize { len: store.len(), expected });
        }
        Ok(Self { index, store })
    }

    pub fn index(&self) -> &SparseIndex {
        &self.index
    }

    /// Membership of a full 20-byte key.
    pub fn lookup(&self, key: &[u8; KEY_LEN]) -> Result<Lookup> {
        let prefix_len = self.index.prefix_len();
        self.lookup_suffix(prefix_len.prefix_of(key), &key[prefix_len.get()..])
    }

    /// Membership of an already-split key: bucket `prefix` plus the stored
    /// `20 - P` suffix bytes.
    ///
    /// A suffix of the wrong width is a precondition error, not a mismatched
    /// comparison. An empty bucket answers without any store read; otherwise
    /// each binary-search probe reads one record and the search returns the
    /// moment it hits equality.
    pub fn lookup_suffix(&self, prefix: u32, target: &[u8]) -> Result<Lookup> {
        let suffix_len = self.index.prefix_len().suffix_len();
        if target.len() != suffix_len {
            return Err(Error::SuffixLength { expected: suffix_len, actual: target.len() });
        }

        let (mut low, mut high) = self.index.range_for(prefix);
        let mut buf = [0u8; KEY_LEN];
        let record = &mut buf[..suffix_len];

        while low < high {
            let mid = low + (high - low) / 2;
            self.store.read_at(mid * suffix_len as u64, record)?;

            match record[..].cmp(target) {
                Ordering::Equal => return Ok(Lookup::Found),
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
            }
        }

        Ok(Lookup::NotFound)
    }
}
