//! Single-pass builder for the packed dataset and its sparse index.

use std::fs;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::KEY_LEN;
use crate::conversion::{key_to_hex, parse_corpus_line};
use crate::error::{Error, Result};
use crate::index::{PrefixLen, SparseIndex};
use crate::store::{AppendStore, FileSink};

/// File name of the packed dataset inside a snapshot directory.
pub const DATASET_FILE_NAME: &str = "pwdex.dat";

/// File name of the sparse index inside a snapshot directory.
pub const INDEX_FILE_NAME: &str = "pwdex.idx";

/// Streams strictly-ascending keys into an [`AppendStore`], accumulating the
/// sparse index as a side effect of the one pass.
///
/// Order enforcement is not optional: a key that is not strictly greater
/// than its predecessor (a duplicate included) aborts the build, because the
/// lookup's single binary-search pass relies on global order.
#[derive(Debug)]
pub struct DatasetBuilder {
    prefix_len: PrefixLen,
    table: Vec<u64>,
    cursor: u64,
    last_key: Option<[u8; KEY_LEN]>,
}

impl DatasetBuilder {
    pub fn new(prefix_len: PrefixLen) -> Self {
        Self {
            prefix_len,
            table: Vec::with_capacity(prefix_len.bucket_count() + 1),
            cursor: 0,
            last_key: None,
        }
    }

    /// Appends `key`'s suffix to `store` and advances the index. `line` is
    /// the key's position in the input, reported on order violations.
    pub fn push<S: AppendStore>(
        &mut self,
        key: &[u8; KEY_LEN],
        line: u64,
        store: &mut S,
    ) -> Result<()> {
        if let Some(last) = &self.last_key {
            if key <= last {
                return Err(Error::UnsortedInput { line, key: key_to_hex(key) });
            }
        }

        // Every bucket between the previous prefix and this one is empty and
        // gets the current cursor as its start, so its search range comes
        // out `[cursor, cursor)`. Skipping this fill-forward would leave
        // those entries stale and silently corrupt lookups.
        let prefix = self.prefix_len.prefix_of(key);
        while self.table.len() <= prefix as usize {
            self.table.push(self.cursor);
        }

        store.append(&key[self.prefix_len.get()..])?;
        self.cursor += 1;
        self.last_key = Some(*key);
        Ok(())
    }

    /// Records appended so far.
    pub fn record_count(&self) -> u64 {
        self.cursor
    }

    /// Seals the index: fill-forwards every remaining bucket and appends the
    /// trailing fence post equal to the total record count.
    pub fn finish(mut self) -> Result<SparseIndex> {
        while self.table.len() <= self.prefix_len.bucket_count() {
            self.table.push(self.cursor);
        }
        SparseIndex::from_table(self.prefix_len, self.table)
    }
}

/// Builds from the raw corpus format: ascending lines of
/// `<40-char hex key>:<decimal count>`, counts discarded.
///
/// Fails on the first malformed line, order violation, or store error; a
/// failed build leaves nothing behind in `dataset` worth keeping.
pub fn build_corpus<R: BufRead, S: AppendStore>(
    mut input: R,
    prefix_len: PrefixLen,
    dataset: &mut S,
) -> Result<SparseIndex> {
    let mut builder = DatasetBuilder::new(prefix_len);
    let mut buf = Vec::with_capacity(64);
    let mut line_no = 0u64;

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let mut line = buf.as_slice();
        if let [rest @ .., b'\n'] = line {
            line = rest;
        }
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }

        let key = parse_corpus_line(line)
            .map_err(|reason| Error::InputFormat { line: line_no, reason })?;
        builder.push(&key, line_no, dataset)?;
    }

    builder.finish()
}

/// Builds both artifacts into `output_dir` and publishes them atomically.
///
/// Dataset and index are written to temporary files in `output_dir` and
/// renamed into place only after the whole build has succeeded, so a reader
/// never observes a partial snapshot. The dataset is published before the
/// index; readers open the index last, so a visible index always has its
/// dataset in place.
pub fn build_to_files<R: BufRead>(
    input: R,
    prefix_len: PrefixLen,
    output_dir: impl AsRef<Path>,
) -> Result<SparseIndex> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let dataset_tmp = tempfile::NamedTempFile::new_in(output_dir)?;
    let mut sink = FileSink::from_file(dataset_tmp.reopen()?);
    let index = build_corpus(input, prefix_len, &mut sink)?;
    sink.finish()?;

    let mut index_tmp = tempfile::NamedTempFile::new_in(output_dir)?;
    let mut writer = BufWriter::new(index_tmp.as_file_mut());
    index.write_to(&mut writer)?;
    writer.flush()?;
    drop(writer);
    index_tmp.as_file().sync_all()?;

    dataset_tmp
        .persist(output_dir.join(DATASET_FILE_NAME))
        .map_err(|e| Error::Io(e.error))?;
    index_tmp
        .persist(output_dir.join(INDEX_FILE_NAME))
        .map_err(|e| Error::Io(e.error))?;

    info!(
        records = index.record_count(),
        buckets = index.prefix_len().bucket_count(),
        max_bucket = index.max_bucket_len(),
        dir = %output_dir.display(),
        "published dataset snapshot"
    );

    Ok(index)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::store::{ByteStore, MemStore};

    #[test]
    fn test_packs_suffixes_in_order() {
        let prefix_len = PrefixLen::new(2).unwrap();
        let mut store = MemStore::new();
        let mut builder = DatasetBuilder::new(prefix_len);

        let a = hex!("0000000000000000000000000000000000000001");
        let b = hex!("0000FF0000000000000000000000000000000000");
        builder.push(&a, 1, &mut store).unwrap();
        builder.push(&b, 2, &mut store).unwrap();
        let index = builder.finish().unwrap();

        // Two 18-byte suffixes, prefixes stripped.
        assert_eq!(store.len(), 36);
        assert_eq!(&store.as_bytes()[..18], &a[2..]);
        assert_eq!(&store.as_bytes()[18..], &b[2..]);
        assert_eq!(index.record_count(), 2);
    }

    #[test]
    fn test_fill_forward_for_skipped_prefixes() {
        // Prefixes 0x01 and 0x03 present, 0x02 skipped: bucket 0x02's entry
        // must equal bucket 0x03's start, not linger at bucket 0x01's.
        let prefix_len = PrefixLen::new(1).unwrap();
        let mut store = MemStore::new();
        let mut builder = DatasetBuilder::new(prefix_len);

        builder
            .push(&hex!("0100000000000000000000000000000000000000"), 1, &mut store)
            .unwrap();
        builder
            .push(&hex!("0300000000000000000000000000000000000000"), 2, &mut store)
            .unwrap();
        let index = builder.finish().unwrap();

        assert_eq!(index.range_for(0x00), (0, 0));
        assert_eq!(index.range_for(0x01), (0, 1));
        assert_eq!(index.range_for(0x02), (1, 1));
        assert_eq!(index.range_for(0x03), (1, 2));
        assert_eq!(index.range_for(0xFF), (2, 2));
    }

    #[test]
    fn test_rejects_descending_key() {
        let prefix_len = PrefixLen::new(1).unwrap();
        let mut store = MemStore::new();
        let mut builder = DatasetBuilder::new(prefix_len);

        builder
            .push(&hex!("0500000000000000000000000000000000000000"), 1, &mut store)
            .unwrap();
        let err = builder
            .push(&hex!("0400000000000000000000000000000000000000"), 2, &mut store)
            .unwrap_err();
        assert!(matches!(err, Error::UnsortedInput { line: 2, .. }));
    }

    #[test]
    fn test_rejects_duplicate_key() {
        let prefix_len = PrefixLen::new(1).unwrap();
        let mut store = MemStore::new();
        let mut builder = DatasetBuilder::new(prefix_len);

        let k = hex!("0500000000000000000000000000000000000000");
        builder.push(&k, 1, &mut store).unwrap();
        let err = builder.push(&k, 2, &mut store).unwrap_err();
        assert!(matches!(err, Error::UnsortedInput { line: 2, .. }));
    }

    #[test]
    fn test_empty_input_builds_empty_snapshot() {
        let prefix_len = PrefixLen::new(1).unwrap();
        let mut store = MemStore::new();
        let index = build_corpus(&b""[..], prefix_len, &mut store).unwrap();

        assert_eq!(index.record_count(), 0);
        assert!(store.is_empty());
        assert_eq!(index.range_for(0x42), (0, 0));
    }

    #[test]
    fn test_build_corpus_reports_malformed_line() {
        let corpus = b"0000000000000000000000000000000000000001:1\nnot-a-line\n";
        let mut store = MemStore::new();
        let err =
            build_corpus(&corpus[..], PrefixLen::new(1).unwrap(), &mut store).unwrap_err();
        assert!(matches!(err, Error::InputFormat { line: 2, .. }));
    }

    #[test]
    fn test_build_corpus_reports_unsorted_line() {
        let corpus = b"0000000000000000000000000000000000000002:1\n\
                       0000000000000000000000000000000000000001:1\n";
        let mut store = MemStore::new();
        let err =
            build_corpus(&corpus[..], PrefixLen::new(1).unwrap(), &mut store).unwrap_err();
        match err {
            Error::UnsortedInput { line, key } => {
                assert_eq!(line, 2);
                assert_eq!(key, "0000000000000000000000000000000000000001");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let corpus: &[u8] = b"0000000000000000000000000000000000000001:12\n\
                              0102030405060708090A0B0C0D0E0F1011121314:1\n\
                              FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF:9\n";
        let prefix_len = PrefixLen::new(2).unwrap();

        let mut first = MemStore::new();
        let first_index = build_corpus(corpus, prefix_len, &mut first).unwrap();
        let mut second = MemStore::new();
        let second_index = build_corpus(corpus, prefix_len, &mut second).unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes());

        let mut first_bytes = Vec::new();
        first_index.write_to(&mut first_bytes).unwrap();
        let mut second_bytes = Vec::new();
        second_index.write_to(&mut second_bytes).unwrap();
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn test_build_corpus_accepts_crlf_and_final_newline() {
        let corpus: &[u8] = b"0000000000000000000000000000000000000001:1\r\n\
                              0000000000000000000000000000000000000002:2\n";
        let mut store = MemStore::new();
        let index = build_corpus(corpus, PrefixLen::new(1).unwrap(), &mut store).unwrap();
        assert_eq!(index.record_count(), 2);
    }

    #[test]
    fn test_build_to_files_publishes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let corpus: &[u8] = b"0000000000000000000000000000000000000001:1\n\
                              8000000000000000000000000000000000000000:5\n";

        let index =
            build_to_files(corpus, PrefixLen::new(1).unwrap(), dir.path()).unwrap();
        assert_eq!(index.record_count(), 2);

        let dataset = fs::read(dir.path().join(DATASET_FILE_NAME)).unwrap();
        assert_eq!(dataset.len(), 2 * 19);

        let loaded = SparseIndex::load(dir.path().join(INDEX_FILE_NAME)).unwrap();
        assert_eq!(loaded.record_count(), 2);
        assert_eq!(loaded.range_for(0x80), (1, 2));
    }

    #[test]
    fn test_failed_build_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let corpus: &[u8] = b"0000000000000000000000000000000000000002:1\n\
                              0000000000000000000000000000000000000001:1\n";

        let err = build_to_files(corpus, PrefixLen::new(1).unwrap(), dir.path()).unwrap_err();
        assert!(matches!(err, Error::UnsortedInput { .. }));

        assert!(!dir.path().join(DATASET_FILE_NAME).exists());
        assert!(!dir.path().join(INDEX_FILE_NAME).exists());
    }
}
