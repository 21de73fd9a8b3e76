//! Persistent storage of expensive derived values.
//!
//! Builders that take a while (routing matrices, wavelet bases) receive a
//! [`Cache`] and go through [`cached`], which returns the stored value when a
//! valid entry exists and builds and stores it otherwise.

use std::{
    collections::HashMap,
    fmt::Write as _,
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::{info, trace, warn};
use sha2::{Digest, Sha256};

use crate::{
    error::Error,
    stream::{Deserializable, DeserializeStream, Serializable, SerializeStream},
};

/// Identifies a cached value by its kind and a digest of everything it was
/// derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: &'static str,
    digest: [u8; 32],
}

impl CacheKey {
    /// Hashes the parts a value of `kind` is derived from.
    pub fn new(kind: &'static str, parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }

        let mut digest = [0; 32];
        digest.copy_from_slice(&hasher.finalize());
        Self { kind, digest }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Digest as a lowercase hexadecimal string.
    pub fn hex(&self) -> String {
        self.digest
            .iter()
            .fold(String::with_capacity(64), |mut hex, byte| {
                let _ = write!(hex, "{byte:02x}");
                hex
            })
    }

    /// File name of the entry in a [`DirectoryCache`].
    pub fn file_name(&self) -> String {
        format!("{}_{}.bin.zst", self.kind, self.hex())
    }
}

/// Storage of serialized values.
pub trait Cache: Send + Sync {
    /// Serialized value stored under `key`, if any.
    fn load(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, Error>;

    /// Stores a serialized value under `key`, replacing any previous entry.
    fn store(&self, key: &CacheKey, stream: &SerializeStream) -> Result<(), Error>;
}

/// Cache of zstd-compressed files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    root: PathBuf,
}

impl DirectoryCache {
    /// Opens the cache in `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry stored under `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }
}

impl Cache for DirectoryCache {
    fn load(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, Error> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&path)?);
        match DeserializeStream::decode(reader) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                warn!("Ignoring unreadable cache entry {path:?}: {e}");
                Ok(None)
            }
        }
    }

    fn store(&self, key: &CacheKey, stream: &SerializeStream) -> Result<(), Error> {
        let path = self.entry_path(key);
        let partial = path.with_extension("partial");
        {
            let writer = BufWriter::new(File::create(&partial)?);
            stream.write_encode(writer)?;
        }
        std::fs::rename(&partial, &path)?;
        trace!("Wrote cache entry {path:?}");
        Ok(())
    }
}

/// In-process cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn load(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, Error> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory cache poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn store(&self, key: &CacheKey, stream: &SerializeStream) -> Result<(), Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory cache poisoned".into()))?;
        entries.insert(key.clone(), stream.bytes().to_vec());
        Ok(())
    }
}

/// Returns the value stored under `key`, or builds and stores it.
///
/// Entries that fail to decode are rebuilt and overwritten.
pub fn cached<T, F>(cache: &dyn Cache, key: &CacheKey, build: F) -> Result<T, Error>
where
    T: Serializable + Deserializable,
    F: FnOnce() -> Result<T, Error>,
{
    if let Some(bytes) = cache.load(key)? {
        let mut stream = DeserializeStream::new(&bytes);
        match T::deserialize(&mut stream) {
            Ok(value) if stream.is_exhausted() => {
                trace!("Cache hit for {} {}", key.kind(), key.hex());
                return Ok(value);
            }
            Ok(_) => warn!("Trailing bytes in cache entry {} {}", key.kind(), key.hex()),
            Err(e) => warn!("Corrupt cache entry {} {}: {e}", key.kind(), key.hex()),
        }
    } else {
        trace!("Cache miss for {} {}", key.kind(), key.hex());
    }

    let value = build()?;
    let mut stream = SerializeStream::new();
    value.serialize(&mut stream);
    cache.store(key, &stream)?;
    info!("Stored {} {} in cache", key.kind(), key.hex());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::{cached, Cache, CacheKey, DirectoryCache, MemoryCache};
    use crate::error::Error;

    #[test]
    fn keys_depend_on_every_part() {
        let a = CacheKey::new("routing", &["healpix:nside=4".as_bytes(), "paths".as_bytes()]);
        let b = CacheKey::new("routing", &["healpix:nside=8".as_bytes(), "paths".as_bytes()]);
        let c = CacheKey::new("basis", &["healpix:nside=4".as_bytes(), "paths".as_bytes()]);
        // Part boundaries are part of the key.
        let d = CacheKey::new("routing", &["healpix:nside=4p".as_bytes(), "aths".as_bytes()]);

        assert_ne!(a, b);
        assert_ne!(a.hex(), c.hex());
        assert_ne!(a, d);
        assert_eq!(a, CacheKey::new("routing", &["healpix:nside=4".as_bytes(), "paths".as_bytes()]));
        assert_eq!(a.hex().len(), 64);
        assert!(a.file_name().starts_with("routing_"));
    }

    #[test]
    fn memory_cache_short_circuits() {
        let cache = MemoryCache::new();
        let key = CacheKey::new("test", &["values".as_bytes()]);
        let builds = Cell::new(0);
        let build = || {
            builds.set(builds.get() + 1);
            Ok::<_, Error>(vec![1.0f64, 2.0, 3.0])
        };

        let first = cached(&cache, &key, build).unwrap();
        let second = cached(&cache, &key, build).unwrap();
        assert_eq!(first, second);
        assert_eq!(builds.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn directory_cache_persists() {
        let dir = tempfile::tempdir().unwrap();
        let key = CacheKey::new("test", &["persisted".as_bytes()]);

        {
            let cache = DirectoryCache::new(dir.path()).unwrap();
            let value: Vec<u64> = cached(&cache, &key, || Ok(vec![7, 11, 13])).unwrap();
            assert_eq!(value, vec![7, 11, 13]);
            assert!(cache.entry_path(&key).exists());
        }

        let cache = DirectoryCache::new(dir.path()).unwrap();
        let value: Vec<u64> = cached(&cache, &key, || panic!("entry should be reused")).unwrap();
        assert_eq!(value, vec![7, 11, 13]);
    }

    #[test]
    fn corrupt_entries_are_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirectoryCache::new(dir.path()).unwrap();
        let key = CacheKey::new("test", &["corrupt".as_bytes()]);
        std::fs::write(cache.entry_path(&key), "not zstd".as_bytes()).unwrap();
        assert!(cache.load(&key).unwrap().is_none());

        let value: Vec<u64> = cached(&cache, &key, || Ok(vec![1, 2])).unwrap();
        assert_eq!(value, vec![1, 2]);
        let value: Vec<u64> = cached(&cache, &key, || panic!("entry should be valid")).unwrap();
        assert_eq!(value, vec![1, 2]);
    }
}
