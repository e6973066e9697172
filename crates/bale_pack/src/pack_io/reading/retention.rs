//! Policies deciding how shard files are opened and kept around between loads.
//!
//! Every [`RetentionPolicy::open`] call hands out a source with its own read position, so
//! concurrent loads never share a cursor. Shared state (cached memory maps) is immutable once
//! created and only the cache bookkeeping is behind a lock.

use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use memmap2::Mmap;
use parking_lot::Mutex;
use tracing::trace;

/// A marker trait automatically implemented for anything that implements [`Read`], [`Seek`] and
/// [`Send`].
pub trait SeekableRead: Seek + Read + Send {}

impl<T: Read + Seek + Send> SeekableRead for T {}

/// An independently positioned reader over one shard file.
pub type ShardSource = Box<dyn SeekableRead>;

/// Decides how shard files are opened by a [`PackReader`](super::PackReader).
pub trait RetentionPolicy: Send + Sync + Debug {
    /// Returns a reader positioned at the start of the file at `path`.
    ///
    /// # Errors
    /// Any IO error from opening or mapping the file.
    fn open(&self, path: &Path) -> io::Result<ShardSource>;
}

/// Opens a new buffered file handle on every call and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenPerCall;

impl RetentionPolicy for OpenPerCall {
    fn open(&self, path: &Path) -> io::Result<ShardSource> {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// A read-only map of a whole shard file.
#[derive(Debug)]
enum MappedShard {
    /// Zero length files cannot be mapped.
    Empty,
    Mapped(Mmap),
}

impl MappedShard {
    fn map(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(MappedShard::Empty);
        }

        // SAFETY: shard files are written once and never modified while a pack is being read.
        let map = unsafe { Mmap::map(&file)? };
        trace!("Mapped shard file {} ({} bytes)", path.display(), map.len());

        Ok(MappedShard::Mapped(map))
    }
}

/// Shared handle to a [`MappedShard`] that a [`Cursor`] can read from.
#[derive(Debug, Clone)]
struct SharedMap(Arc<MappedShard>);

impl AsRef<[u8]> for SharedMap {
    fn as_ref(&self) -> &[u8] {
        match &*self.0 {
            MappedShard::Empty => &[],
            MappedShard::Mapped(map) => map,
        }
    }
}

impl SharedMap {
    fn cursor(&self) -> ShardSource {
        Box::new(Cursor::new(self.clone()))
    }
}

/// Keeps the most recently requested shard memory mapped.
///
/// Requesting another shard replaces the cached map. Streams handed out earlier keep their own
/// reference, so replacing the map never invalidates them.
#[derive(Debug, Default)]
pub struct SingleMapped {
    current: Mutex<Option<(PathBuf, SharedMap)>>,
}

impl SingleMapped {
    /// Creates the policy with nothing mapped.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RetentionPolicy for SingleMapped {
    fn open(&self, path: &Path) -> io::Result<ShardSource> {
        if let Some((mapped_path, map)) = &*self.current.lock() {
            if mapped_path == path {
                return Ok(map.cursor());
            }
        }

        // Map outside the lock; a concurrent miss may map the same file twice, which is harmless.
        let map = SharedMap(Arc::new(MappedShard::map(path)?));
        *self.current.lock() = Some((path.to_path_buf(), map.clone()));

        Ok(map.cursor())
    }
}

/// Keeps up to `capacity` shards memory mapped, evicting the least recently used one.
#[derive(Debug)]
pub struct LruMapped {
    maps: Mutex<LruCache<PathBuf, SharedMap>>,
}

impl LruMapped {
    /// Creates the policy with room for `capacity` maps.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            maps: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of maps currently cached.
    pub fn cached(&self) -> usize {
        self.maps.lock().len()
    }
}

impl RetentionPolicy for LruMapped {
    fn open(&self, path: &Path) -> io::Result<ShardSource> {
        if let Some(map) = self.maps.lock().get(path) {
            return Ok(map.cursor());
        }

        let map = SharedMap(Arc::new(MappedShard::map(path)?));
        self.maps.lock().put(path.to_path_buf(), map.clone());

        Ok(map.cursor())
    }
}
