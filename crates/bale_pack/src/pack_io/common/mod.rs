//! Contains shared code between writing and reading

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::resource::id::ResourceId;
use crate::resource::ResourceType;

/// Name of the index file inside a pack directory.
pub const INDEX_FILE_NAME: &str = "index";

/// Path of the data file of shard `shard` inside `pack_dir`.
pub fn shard_path(pack_dir: &Path, shard: u8) -> PathBuf {
    pack_dir.join(shard.to_string())
}

/// Where a resource lives in a pack.
///
/// See also: [`PackIndex`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    /// Index of the shard file holding the resource.
    pub shard: u8,
    /// Offset in bytes from the **start of the shard file**.
    pub offset: u64,
    /// Size of the resource in bytes.
    pub length: u32,
    /// Type the resource was packed as.
    pub resource_type: ResourceType,
}

impl IndexEntry {
    /// Offset one past the last byte of the resource.
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.length)
    }
}

/// Immutable map from resource id to its location in the shard files.
///
/// Iteration follows insertion order, which for a planned index is group order. Within one shard
/// the entries sorted by offset are contiguous and start at 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackIndex {
    entries: IndexMap<ResourceId, IndexEntry>,
    shard_count: usize,
}

/// Reasons an entry list cannot form a [`PackIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexViolation {
    /// The id appears more than once.
    DuplicateId(ResourceId),
    /// The entry does not start where the previous entry of its shard ended.
    NotContiguous {
        /// The misplaced resource.
        id: ResourceId,
        /// The shard it belongs to.
        shard: u8,
        /// Where it should have started.
        expected_offset: u64,
        /// Where it starts.
        actual_offset: u64,
    },
    /// A shard below the highest used index has no entries.
    EmptyShard(u8),
}

impl std::fmt::Display for IndexViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexViolation::DuplicateId(id) => write!(f, "resource {id} is listed more than once"),
            IndexViolation::NotContiguous {
                id,
                shard,
                expected_offset,
                actual_offset,
            } => write!(
                f,
                "resource {id} in shard {shard} starts at offset {actual_offset}, expected {expected_offset}"
            ),
            IndexViolation::EmptyShard(shard) => write!(f, "shard {shard} has no resources"),
        }
    }
}

impl PackIndex {
    /// Builds an index from entries, checking that ids are unique and that every shard is laid out
    /// contiguously from offset 0 without gaps.
    ///
    /// # Errors
    /// Returns the first [`IndexViolation`] found.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (ResourceId, IndexEntry)>,
    ) -> Result<Self, IndexViolation> {
        let entries = entries.into_iter();
        let mut map = IndexMap::with_capacity(entries.size_hint().0);

        for (id, entry) in entries {
            if map.contains_key(&id) {
                return Err(IndexViolation::DuplicateId(id));
            }
            map.insert(id, entry);
        }

        let index = Self::new_unchecked(map);
        index.check_layout()?;

        Ok(index)
    }

    /// Builds an index without checking the layout. Used by the planner, which produces a valid
    /// layout by construction.
    pub(crate) fn new_unchecked(entries: IndexMap<ResourceId, IndexEntry>) -> Self {
        let shard_count = entries
            .values()
            .map(|entry| entry.shard as usize + 1)
            .max()
            .unwrap_or(0);

        Self {
            entries,
            shard_count,
        }
    }

    fn check_layout(&self) -> Result<(), IndexViolation> {
        for shard in 0..self.shard_count {
            let shard = shard as u8;
            let mut expected_offset = 0;
            let mut any = false;

            for (id, entry) in self.shard_entries(shard) {
                if entry.offset != expected_offset {
                    return Err(IndexViolation::NotContiguous {
                        id: id.clone(),
                        shard,
                        expected_offset,
                        actual_offset: entry.offset,
                    });
                }
                expected_offset = entry.end();
                any = true;
            }

            if !any {
                return Err(IndexViolation::EmptyShard(shard));
            }
        }

        Ok(())
    }

    /// Looks up the location of a resource.
    pub fn get(&self, id: &ResourceId) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    /// Whether the index has an entry for `id`.
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no resources.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `max(shard) + 1`, or 0 for an empty index.
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// All entries in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&ResourceId, &IndexEntry)> + '_ {
        self.entries.iter()
    }

    /// Entries of one shard sorted by ascending offset. Empty resources sort before a non-empty
    /// resource at the same offset.
    pub fn shard_entries(&self, shard: u8) -> Vec<(&ResourceId, &IndexEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.shard == shard)
            .collect();
        entries.sort_by_key(|(_, entry)| (entry.offset, entry.length));

        entries
    }

    /// Total number of bytes of every shard, indexed by shard.
    pub fn shard_sizes(&self) -> Vec<u64> {
        let mut sizes = vec![0u64; self.shard_count];
        for entry in self.entries.values() {
            sizes[entry.shard as usize] += u64::from(entry.length);
        }

        sizes
    }
}

impl<'a> IntoIterator for &'a PackIndex {
    type Item = (&'a ResourceId, &'a IndexEntry);
    type IntoIter = indexmap::map::Iter<'a, ResourceId, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
