//! Disk-backed membership lookup for 20-byte digests.
//!
//! The offline builder consumes a sorted text corpus (one
//! `<40-hex digest>:<count>` per line, counts discarded) and packs it into
//! two artifacts:
//!
//! - a **packed dataset**: every key's trailing `20 - P` bytes as fixed-width
//!   records, concatenated in ascending full-key order;
//! - a **sparse index**: `2^(8P) + 1` little-endian u64 fence posts, where
//!   entries `i` and `i + 1` bound the record range of the bucket of keys
//!   whose first `P` bytes read `i`.
//!
//! A lookup fetches its bucket range from the resident index (two array
//! reads, no I/O) and binary-searches only that range against the dataset on
//! disk, for an expected `O(log(records / 2^(8P)))` probes of `20 - P` bytes
//! each. Storing suffixes only (the prefix is implied by bucket membership)
//! and discarding breach counts is the trade-off that keeps a multi-billion
//! record corpus in tens of gigabytes.
//!
//! # Example
//!
//! ```
//! use pwdex::{build_corpus, LookupEngine, MemStore, PrefixLen};
//!
//! let corpus = "\
//! 0000000000000000000000000000000000000001:10
//! 00000000000000000000000000000000000000FF:3
//! FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF:1
//! ";
//!
//! let mut dataset = MemStore::new();
//! let index = build_corpus(corpus.as_bytes(), PrefixLen::new(2)?, &mut dataset)?;
//! let engine = LookupEngine::new(index, dataset)?;
//!
//! let mut key = [0u8; 20];
//! key[19] = 0xFF;
//! assert!(engine.lookup(&key)?.is_found());
//!
//! key[19] = 0xFE;
//! assert!(!engine.lookup(&key)?.is_found());
//! # Ok::<(), pwdex::Error>(())
//! ```

pub mod builder;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod index;
pub mod store;

pub use builder::{DATASET_FILE_NAME, DatasetBuilder, INDEX_FILE_NAME, build_corpus, build_to_files};
pub use engine::{Lookup, LookupEngine};
pub use error::{Error, Result};
pub use index::{PrefixLen, SparseIndex};
pub use store::{AppendStore, ByteStore, FileSink, FileStore, MemStore};

/// Length in bytes of a full key (a 160-bit digest).
pub const KEY_LEN: usize = 20;
