//! RocksDB engine wrapper.

use crate::{ColumnFamily, OperationKind, Profile, StorageError, StorageResult, StoreConfig, WriteBatch};
use rocksdb::{
    BlockBasedIndexType, BlockBasedOptions, BoundColumnFamily, Cache, ColumnFamilyDescriptor,
    DBCompressionType, DBWithThreadMode, KeyEncodingType, MultiThreaded, Options,
    PlainTableFactoryOptions, ReadOptions, SliceTransform, SnapshotWithThreadMode, WriteOptions,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

type Db = DBWithThreadMode<MultiThreaded>;

/// The ordered-KV engine: two column families over one RocksDB handle.
pub struct Engine {
    db: Arc<Db>,
    path: PathBuf,
}

fn cf_options(profile: Profile, cf: ColumnFamily, block_cache: &Cache) -> Options {
    let mut opts = Options::default();
    opts.set_prefix_extractor(SliceTransform::create_fixed_prefix(cf.prefix_len()));

    match profile {
        Profile::Disk => {
            opts.set_compression_type(DBCompressionType::Lz4);
            opts.set_bottommost_compression_type(DBCompressionType::Zstd);

            let mut block_opts = BlockBasedOptions::default();
            block_opts.set_block_cache(block_cache);
            block_opts.set_bloom_filter(10.0, false);
            block_opts.set_index_type(BlockBasedIndexType::HashSearch);
            block_opts.set_cache_index_and_filter_blocks(true);
            opts.set_block_based_table_factory(&block_opts);
        }
        Profile::Memory => {
            opts.set_plain_table_factory(&PlainTableFactoryOptions {
                user_key_length: cf.key_len() as u32,
                bloom_bits_per_key: 10,
                hash_table_ratio: 0.75,
                index_sparseness: 16,
                huge_page_tlb_size: 0,
                encoding_type: KeyEncodingType::Plain,
                full_scan_mode: false,
                store_index_in_file: false,
            });
        }
    }
    opts
}

impl Engine {
    /// Open or create the engine at `config.db_path`.
    pub fn open(config: &StoreConfig) -> StorageResult<Self> {
        let path = config.db_path.as_path();
        info!(?path, profile = ?config.profile, "Opening engine");

        let block_cache = Cache::new_lru_cache(config.cache_size_mb * 1024 * 1024);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ColumnFamily::all()
            .iter()
            .map(|cf| {
                ColumnFamilyDescriptor::new(cf.name(), cf_options(config.profile, *cf, &block_cache))
            })
            .collect();

        let db = Db::open_cf_descriptors(&opts, path, cf_descriptors)?;
        debug!("Engine opened");

        Ok(Engine {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// The database directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cf_handle(&self, cf: ColumnFamily) -> StorageResult<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(cf.name())
            .ok_or(StorageError::ColumnFamilyNotFound(cf.name()))
    }

    /// Get a value.
    pub fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let handle = self.cf_handle(cf)?;
        Ok(self.db.get_cf(&handle, key)?)
    }

    /// Put a key-value pair through the non-sync write path.
    pub fn put(&self, cf: ColumnFamily, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let handle = self.cf_handle(cf)?;
        self.db.put_cf(&handle, key, value)?;
        Ok(())
    }

    /// Delete a key through the non-sync write path.
    pub fn delete(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<()> {
        let handle = self.cf_handle(cf)?;
        self.db.delete_cf(&handle, key)?;
        Ok(())
    }

    /// Whether a key exists.
    pub fn contains(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(cf, key)?.is_some())
    }

    /// Execute a batch atomically. `sync` forces an fsync before the
    /// write reports success; only the rollback path asks for it.
    pub fn write_batch(&self, batch: WriteBatch, sync: bool) -> StorageResult<()> {
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.operations {
            let handle = self.cf_handle(op.cf)?;
            match op.kind {
                OperationKind::Put { value } => rocks_batch.put_cf(&handle, &op.key, &value),
                OperationKind::Delete => rocks_batch.delete_cf(&handle, &op.key),
            }
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(sync);
        self.db.write_opt(rocks_batch, &write_opts)?;
        Ok(())
    }

    /// Take a point-in-time snapshot.
    pub fn snapshot(&self) -> EngineSnapshot {
        let db = Arc::clone(&self.db);
        // SAFETY: the snapshot borrows the DB it was taken from. The
        // handle below owns an `Arc` to that same DB and declares the
        // snapshot field first, so the snapshot is always released
        // before the DB handle can be dropped.
        let inner = unsafe {
            std::mem::transmute::<SnapshotWithThreadMode<'_, Db>, SnapshotWithThreadMode<'static, Db>>(
                self.db.snapshot(),
            )
        };
        EngineSnapshot { inner, db }
    }

    fn prefix_read_opts() -> ReadOptions {
        let mut read_opts = ReadOptions::default();
        read_opts.set_prefix_same_as_start(true);
        read_opts.set_total_order_seek(false);
        read_opts
    }

    /// Iterate all keys under `prefix`, ascending.
    pub fn iter_prefix(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
    ) -> StorageResult<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)>>> {
        let handle = self.cf_handle(cf)?;
        let mut iter = self.db.raw_iterator_cf_opt(&handle, Self::prefix_read_opts());
        iter.seek(prefix);

        let mut entries = Vec::new();
        while iter.valid() {
            match (iter.key(), iter.value()) {
                (Some(key), Some(value)) if key.starts_with(prefix) => {
                    entries.push((key.to_vec(), value.to_vec()));
                }
                _ => break,
            }
            iter.next();
        }
        iter.status()?;
        Ok(Box::new(entries.into_iter()))
    }

    /// Flush both column families.
    pub fn flush(&self) -> StorageResult<()> {
        for cf in ColumnFamily::all() {
            let handle = self.cf_handle(*cf)?;
            self.db.flush_cf(&handle)?;
        }
        Ok(())
    }
}

/// An owned point-in-time view of the engine.
///
/// The snapshot pins RocksDB resources until dropped; savepoints hold
/// exactly one of these for their whole lifetime.
pub struct EngineSnapshot {
    // Declared before `db`: the snapshot must be released while the DB
    // is still open.
    inner: SnapshotWithThreadMode<'static, Db>,
    db: Arc<Db>,
}

// SAFETY: a RocksDB snapshot is an immutable sequence-number pin; reads
// through it and its release are thread-safe, and the `Arc` keeps the
// DB alive for as long as the snapshot exists.
unsafe impl Send for EngineSnapshot {}
unsafe impl Sync for EngineSnapshot {}

impl EngineSnapshot {
    /// Get a value as of the snapshot.
    pub fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let handle = self
            .db
            .cf_handle(cf.name())
            .ok_or(StorageError::ColumnFamilyNotFound(cf.name()))?;
        Ok(self.inner.get_cf(&handle, key)?)
    }

    /// Iterate all keys under `prefix` as of the snapshot, ascending.
    pub fn iter_prefix(
        &self,
        cf: ColumnFamily,
        prefix: &[u8],
    ) -> StorageResult<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)>>> {
        let handle = self
            .db
            .cf_handle(cf.name())
            .ok_or(StorageError::ColumnFamilyNotFound(cf.name()))?;
        let mut iter = self
            .inner
            .raw_iterator_cf_opt(&handle, Engine::prefix_read_opts());
        iter.seek(prefix);

        let mut entries = Vec::new();
        while iter.valid() {
            match (iter.key(), iter.value()) {
                (Some(key), Some(value)) if key.starts_with(prefix) => {
                    entries.push((key.to_vec(), value.to_vec()));
                }
                _ => break,
            }
            iter.next();
        }
        iter.status()?;
        Ok(Box::new(entries.into_iter()))
    }
}
