//! Loading packs and reading resources from them.
//!
//! A [`PackReader`] only takes `&self` for loads, so it can be shared between threads behind an
//! [`Arc`](std::sync::Arc). Each load gets its own read position through the configured
//! [`RetentionPolicy`](retention::RetentionPolicy).

mod errors;
mod file_reader;
mod read_steps;
pub mod retention;
mod utils;

pub use errors::*;
pub use file_reader::*;

use std::fmt::Debug;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use snafu::{ensure, OptionExt, ResultExt};
use tracing::{debug, instrument, trace};

use crate::config::PackConfig;
use crate::pack_io::common::{shard_path, IndexEntry, PackIndex};
use crate::resource::id::ResourceId;
use crate::resource::ResourceType;
use read_steps::{read_index, validate_shards};
use retention::RetentionPolicy;
use utils::io;

/// Create an instance of this struct to read a pack.
///
/// Opening a pack decodes its index and checks that every shard file the index refers to
/// exists, so an incomplete pack fails here rather than on the first load.
///
/// # Examples
/// ```no_run
/// use bale_pack::{PackReader, ResourceId, ResourceType};
///
/// # fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// let reader = PackReader::open("./path/to/pack")?;
/// let id = ResourceId::parse("core:textures/stone.png")?;
/// let bytes = reader.load_resource(&id, ResourceType::Image)?.read_to_vec()?;
/// # Ok(()) }
/// ```
pub struct PackReader {
    pack_dir: PathBuf,
    index: PackIndex,
    policy: Box<dyn RetentionPolicy>,
}

impl Debug for PackReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackReader")
            .field("pack_dir", &self.pack_dir)
            .field("resources", &self.index.len())
            .field("shards", &self.index.shard_count())
            .field("policy", &self.policy)
            .finish()
    }
}

impl PackReader {
    /// Opens the pack in `pack_dir` with the default configuration.
    ///
    /// # Errors
    /// See [`ReadError`].
    pub fn open(pack_dir: impl AsRef<Path>) -> ReadResult<Self> {
        Self::open_with_config(pack_dir, &PackConfig::default())
    }

    /// Opens the pack in `pack_dir`, using the retention policy selected in `config`.
    ///
    /// # Errors
    /// See [`ReadError`].
    pub fn open_with_config(pack_dir: impl AsRef<Path>, config: &PackConfig) -> ReadResult<Self> {
        Self::open_with_policy(pack_dir, config.retention().build())
    }

    /// Opens the pack in `pack_dir` with a custom retention policy.
    ///
    /// # Errors
    /// - [`ReadError::NotADirectory`] if `pack_dir` is not a directory
    /// - [`ReadError::MissingShard`] if a referenced shard file does not exist
    /// - Any index decoding error
    #[instrument(skip_all, fields(pack = %pack_dir.as_ref().display()))]
    pub fn open_with_policy(
        pack_dir: impl AsRef<Path>,
        policy: Box<dyn RetentionPolicy>,
    ) -> ReadResult<Self> {
        let pack_dir = pack_dir.as_ref();

        ensure!(pack_dir.is_dir(), NotADirectoryCtx { path: pack_dir });

        let index = read_index(pack_dir)?;
        validate_shards(pack_dir, &index)?;

        debug!(
            "Loaded pack with {} resources in {} shards using {policy:?}",
            index.len(),
            index.shard_count()
        );

        Ok(Self {
            pack_dir: pack_dir.to_path_buf(),
            index,
            policy,
        })
    }

    /// Opens a bounded stream over the bytes of `id`.
    ///
    /// The stream is lazy: a shard file that is shorter than the index claims shows up as an early
    /// end of stream.
    ///
    /// # Errors
    /// - [`ReadError::UnknownResource`] if the pack has no resource `id`
    /// - [`ReadError::TypeMismatch`] if it was packed as another type than `expected`
    /// - [`ReadError::IoError`] if the shard cannot be opened or seeked
    pub fn load_resource(
        &self,
        id: &ResourceId,
        expected: ResourceType,
    ) -> ReadResult<ResourceStream> {
        let entry = *self
            .index
            .get(id)
            .with_context(|| UnknownResourceCtx { id: id.clone() })?;

        ensure!(
            entry.resource_type == expected,
            TypeMismatchCtx {
                id: id.clone(),
                expected,
                actual: entry.resource_type,
            }
        );

        trace!(
            "Loading {id} from shard {} at offset {}",
            entry.shard,
            entry.offset
        );

        self.stream(id, entry)
    }

    fn stream(&self, id: &ResourceId, entry: IndexEntry) -> ReadResult<ResourceStream> {
        let shard = io!(
            self.policy.open(&shard_path(&self.pack_dir, entry.shard)),
            ReadStep::OpenShard {
                id: id.clone(),
                shard: entry.shard,
            }
        )?;

        ResourceStream::new(shard, id.clone(), entry)
    }

    /// The decoded index.
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// The pack directory.
    pub fn pack_dir(&self) -> &Path {
        &self.pack_dir
    }

    /// Whether the pack has a resource `id`.
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.index.contains(id)
    }

    /// The type `id` was packed as.
    pub fn resource_type(&self, id: &ResourceId) -> Option<ResourceType> {
        self.index.get(id).map(|entry| entry.resource_type)
    }

    /// Reads every resource to its end, failing on the first one whose shard ends early.
    ///
    /// # Errors
    /// [`ReadError::IoError`] with [`ReadStep::VerifyResource`] for a short or unreadable
    /// resource.
    #[instrument(skip_all, fields(pack = %self.pack_dir.display()))]
    pub fn verify(&self) -> ReadResult<()> {
        for (id, entry) in &self.index {
            let mut stream = self.stream(id, *entry)?;

            let read = io!(
                io::copy(&mut stream, &mut io::sink()),
                ReadStep::VerifyResource(id.clone())
            )?;
            if read != stream.len() {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("read {read} of {} bytes", stream.len()),
                ))
                .context(IoCtx {
                    step: ReadStep::VerifyResource(id.clone()),
                });
            }
        }

        debug!("Verified {} resources", self.index.len());

        Ok(())
    }
}
