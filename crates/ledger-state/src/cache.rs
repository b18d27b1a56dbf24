//! LRU read cache over deserialized records.

use crate::{StateError, StateResult, TokenStore};
use ledger_types::{ActionOp, Name128, TokenType};
use lru::LruCache;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::sync::{Arc, Weak};
use tracing::debug;

/// A typed record the cache can move between bytes and values.
///
/// Blanket-implemented for every serde type, so callers only derive
/// `Serialize`/`Deserialize` on their record structs.
pub trait Record: Any + Send + Sync {
    /// Encode to the stored byte form.
    fn encode(&self) -> StateResult<Vec<u8>>;
    /// Decode from the stored byte form.
    fn decode(bytes: &[u8]) -> StateResult<Self>
    where
        Self: Sized;
}

impl<T> Record for T
where
    T: Serialize + DeserializeOwned + Any + Send + Sync,
{
    fn encode(&self) -> StateResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| StateError::RecordCodec(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> StateResult<Self> {
        bincode::deserialize(bytes).map_err(|e| StateError::RecordCodec(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    ty: TokenType,
    domain: Option<Name128>,
    key: Name128,
}

struct CacheEntry {
    type_id: TypeId,
    stored_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    bytes: usize,
}

struct CacheInner {
    map: LruCache<CacheKey, CacheEntry>,
    used: usize,
    capacity: usize,
}

impl CacheInner {
    fn insert(&mut self, key: CacheKey, entry: CacheEntry) {
        self.used += entry.bytes;
        if let Some(old) = self.map.put(key, entry) {
            self.used -= old.bytes;
        }
        while self.used > self.capacity && self.map.len() > 1 {
            if let Some((_, evicted)) = self.map.pop_lru() {
                self.used -= evicted.bytes;
            } else {
                break;
            }
        }
    }

    fn remove(&mut self, key: &CacheKey) {
        if let Some(entry) = self.map.pop(key) {
            self.used -= entry.bytes;
        }
    }
}

/// Bounded LRU cache of deserialized token records, keyed by
/// `(type, domain?, key)`.
///
/// Reads return shared handles that pin the value independently of the
/// cache slot. Entries carry the concrete type's fingerprint; a handle
/// requested at a different type is schema corruption and fails hard.
/// The cache subscribes to the store's rollback and remove events, so a
/// read immediately after a rollback refetches the restored value.
pub struct TokenCache {
    store: Arc<TokenStore>,
    inner: Arc<Mutex<CacheInner>>,
}

impl TokenCache {
    /// Build a cache over `store` with a byte budget, wiring the
    /// invalidation hooks.
    ///
    /// The store only learns weak references, so dropping the cache
    /// fully releases it.
    pub fn new(store: Arc<TokenStore>, capacity_bytes: usize) -> Self {
        let inner = Arc::new(Mutex::new(CacheInner {
            map: LruCache::unbounded(),
            used: 0,
            capacity: capacity_bytes,
        }));

        let weak: Weak<Mutex<CacheInner>> = Arc::downgrade(&inner);
        store.subscribe_rollback(move |ty, domain, key| {
            if let Some(inner) = weak.upgrade() {
                inner.lock().remove(&CacheKey { ty, domain, key });
            }
        });
        let weak: Weak<Mutex<CacheInner>> = Arc::downgrade(&inner);
        store.subscribe_remove(move |ty, domain, key| {
            if let Some(inner) = weak.upgrade() {
                inner.lock().remove(&CacheKey { ty, domain, key });
            }
        });

        TokenCache { store, inner }
    }

    /// The store this cache fronts.
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    fn handle<T: Record>(entry: &CacheEntry) -> StateResult<Arc<T>> {
        if entry.type_id != TypeId::of::<T>() {
            return Err(StateError::TypeMismatch {
                stored: entry.stored_name,
                requested: std::any::type_name::<T>(),
            });
        }
        Arc::clone(&entry.value)
            .downcast::<T>()
            .map_err(|_| StateError::TypeMismatch {
                stored: entry.stored_name,
                requested: std::any::type_name::<T>(),
            })
    }

    /// Read a typed record through the cache, `None` when absent from
    /// the store.
    pub fn read_token<T: Record>(
        &self,
        ty: TokenType,
        domain: Option<Name128>,
        key: Name128,
    ) -> StateResult<Option<Arc<T>>> {
        let cache_key = CacheKey { ty, domain, key };
        {
            let mut inner = self.inner.lock();
            if let Some(entry) = inner.map.get(&cache_key) {
                return Self::handle::<T>(entry).map(Some);
            }
        }

        let Some(bytes) = self.store.read_token_opt(ty, domain, key)? else {
            return Ok(None);
        };
        let value = Arc::new(T::decode(&bytes)?);
        debug!(ty = ty.name(), key = %key, size = bytes.len(), "Cache fill");

        let mut inner = self.inner.lock();
        inner.insert(
            cache_key,
            CacheEntry {
                type_id: TypeId::of::<T>(),
                stored_name: std::any::type_name::<T>(),
                value: Arc::clone(&value) as Arc<dyn Any + Send + Sync>,
                bytes: bytes.len(),
            },
        );
        Ok(Some(value))
    }

    /// Encode and write a typed record through to the store, then cache
    /// it. Returns the shared handle.
    pub fn put_token<T: Record>(
        &self,
        ty: TokenType,
        op: ActionOp,
        domain: Option<Name128>,
        key: Name128,
        value: T,
    ) -> StateResult<Arc<T>> {
        let bytes = value.encode()?;
        self.store.put_token(ty, op, domain, key, &bytes)?;

        let handle = Arc::new(value);
        let mut inner = self.inner.lock();
        inner.insert(
            CacheKey { ty, domain, key },
            CacheEntry {
                type_id: TypeId::of::<T>(),
                stored_name: std::any::type_name::<T>(),
                value: Arc::clone(&handle) as Arc<dyn Any + Send + Sync>,
                bytes: bytes.len(),
            },
        );
        Ok(handle)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently accounted to cached entries.
    pub fn used_bytes(&self) -> usize {
        self.inner.lock().used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreConfig;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct DomainRecord {
        name: String,
        creator: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct GroupRecord {
        name: String,
    }

    fn open_cache() -> (TokenCache, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(TokenStore::open(&StoreConfig::new(tmp.path())).unwrap());
        (TokenCache::new(store, 1024 * 1024), tmp)
    }

    fn name(s: &str) -> Name128 {
        s.parse().unwrap()
    }

    fn sample(name: &str) -> DomainRecord {
        DomainRecord {
            name: name.to_string(),
            creator: "alice".to_string(),
        }
    }

    #[test]
    fn test_write_through_and_read_back() {
        let (cache, _tmp) = open_cache();
        let record = sample("d1");
        cache
            .put_token(TokenType::Domain, ActionOp::Add, None, name("d1"), record.clone())
            .unwrap();

        let handle = cache
            .read_token::<DomainRecord>(TokenType::Domain, None, name("d1"))
            .unwrap()
            .unwrap();
        assert_eq!(*handle, record);

        // Raw bytes in the store decode to the same record.
        let raw = cache
            .store()
            .read_token(TokenType::Domain, None, name("d1"))
            .unwrap();
        assert_eq!(DomainRecord::decode(&raw).unwrap(), record);
    }

    #[test]
    fn test_read_fills_from_store() {
        let (cache, _tmp) = open_cache();
        let record = sample("d1");
        cache
            .store()
            .put_token(
                TokenType::Domain,
                ActionOp::Add,
                None,
                name("d1"),
                &record.encode().unwrap(),
            )
            .unwrap();

        assert!(cache.is_empty());
        let handle = cache
            .read_token::<DomainRecord>(TokenType::Domain, None, name("d1"))
            .unwrap()
            .unwrap();
        assert_eq!(*handle, record);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_key_is_none() {
        let (cache, _tmp) = open_cache();
        assert!(cache
            .read_token::<DomainRecord>(TokenType::Domain, None, name("ghost"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_type_mismatch_is_fatal() {
        let (cache, _tmp) = open_cache();
        cache
            .put_token(TokenType::Domain, ActionOp::Add, None, name("d1"), sample("d1"))
            .unwrap();

        let err = cache
            .read_token::<GroupRecord>(TokenType::Domain, None, name("d1"))
            .unwrap_err();
        assert!(matches!(err, StateError::TypeMismatch { .. }));
    }

    #[test]
    fn test_rollback_evicts_cached_entry() {
        let (cache, _tmp) = open_cache();
        let store = Arc::clone(cache.store());

        cache
            .put_token(TokenType::Domain, ActionOp::Add, None, name("d1"), sample("old"))
            .unwrap();

        store.add_savepoint(1).unwrap();
        cache
            .put_token(TokenType::Domain, ActionOp::Update, None, name("d1"), sample("new"))
            .unwrap();
        assert_eq!(
            cache
                .read_token::<DomainRecord>(TokenType::Domain, None, name("d1"))
                .unwrap()
                .unwrap()
                .name,
            "new"
        );

        store.rollback_to_latest_savepoint().unwrap();
        let handle = cache
            .read_token::<DomainRecord>(TokenType::Domain, None, name("d1"))
            .unwrap()
            .unwrap();
        assert_eq!(handle.name, "old");
    }

    #[test]
    fn test_remove_evicts_cached_entry() {
        let (cache, _tmp) = open_cache();
        let store = Arc::clone(cache.store());

        cache
            .put_token(TokenType::Domain, ActionOp::Add, None, name("d1"), sample("d1"))
            .unwrap();
        assert_eq!(cache.len(), 1);

        store.delete_token(TokenType::Domain, None, name("d1")).unwrap();
        assert_eq!(cache.len(), 0);
        assert!(cache
            .read_token::<DomainRecord>(TokenType::Domain, None, name("d1"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_byte_budget_evicts_lru() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(TokenStore::open(&StoreConfig::new(tmp.path())).unwrap());
        let record_size = sample("d0").encode().unwrap().len();
        // Room for roughly three records.
        let cache = TokenCache::new(store, record_size * 3);

        for i in 0..6 {
            let key = format!("d{}", i);
            cache
                .put_token(TokenType::Domain, ActionOp::Add, None, name(&key), sample(&key))
                .unwrap();
        }
        assert!(cache.len() < 6);
        assert!(cache.used_bytes() <= record_size * 3);

        // Evicted entries refill from the store on demand.
        let handle = cache
            .read_token::<DomainRecord>(TokenType::Domain, None, name("d0"))
            .unwrap()
            .unwrap();
        assert_eq!(handle.name, "d0");
    }

    #[test]
    fn test_handles_outlive_eviction() {
        let (cache, _tmp) = open_cache();
        let handle = cache
            .put_token(TokenType::Domain, ActionOp::Add, None, name("d1"), sample("d1"))
            .unwrap();
        cache.store().delete_token(TokenType::Domain, None, name("d1")).unwrap();
        // The cache slot is gone; the handle still pins the value.
        assert_eq!(handle.name, "d1");
    }
}
