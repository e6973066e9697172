//! API for writing packs

mod errors;
mod utils;
mod write_steps;

pub use errors::*;
use utils::io;

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use snafu::{ensure, ResultExt};
use tracing::{debug, instrument};

use crate::config::PackConfig;
use crate::pack_io::common::{shard_path, PackIndex, INDEX_FILE_NAME};
use crate::planning::grouping::GroupingStrategy;
use crate::planning::PackingPlanner;
use crate::resource::{Resource, ResourceBag, ResourceResolver};
use write_steps::{write_index, write_shard};

/// Create an instance of this struct to write a planned pack into a directory.
///
/// # Example
/// ```no_run
/// use bale_pack::{PackConfig, PackWriter, PackingPlanner, ResourceBag, ResourceGroup};
///
/// # fn foo(groups: Vec<ResourceGroup>) -> Result<(), Box<dyn std::error::Error>> {
/// let bag = ResourceBag::from_groups(&groups);
/// let index = PackingPlanner::new(&PackConfig::default()).plan(groups)?;
///
/// PackWriter::new("./out/pack")?.write(&index, &bag)?;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct PackWriter {
    pack_dir: PathBuf,
}

impl PackWriter {
    /// Creates a writer for `pack_dir`, creating the directory if it does not exist.
    ///
    /// # Errors
    /// [`WriteError::NotADirectory`] if the path exists but is not a directory, or an IO error if
    /// it cannot be created.
    pub fn new(pack_dir: impl AsRef<Path>) -> WriteResult<Self> {
        let pack_dir = pack_dir.as_ref();

        if pack_dir.exists() {
            ensure!(pack_dir.is_dir(), NotADirectoryCtx { path: pack_dir });
        } else {
            io!(
                fs::create_dir_all(pack_dir),
                WriteStep::CreateOutputDir(pack_dir.to_path_buf())
            )?;
        }

        Ok(Self {
            pack_dir: pack_dir.to_path_buf(),
        })
    }

    /// The output directory.
    pub fn pack_dir(&self) -> &Path {
        &self.pack_dir
    }

    /// Writes the index file and every shard file of `index`.
    ///
    /// # Errors
    /// See [`WriteError`]. Files written before an error are left in place.
    #[instrument(skip_all, fields(pack = %self.pack_dir.display()))]
    pub fn write<R: ResourceResolver + ?Sized>(
        &self,
        index: &PackIndex,
        resolver: &R,
    ) -> WriteResult<()> {
        self.write_index(index)?;
        self.write_shards(index, resolver)?;

        debug!(
            "Wrote {} resources into {} shards",
            index.len(),
            index.shard_count()
        );

        Ok(())
    }

    /// Writes only the index file.
    ///
    /// # Errors
    /// See [`WriteError`].
    pub fn write_index(&self, index: &PackIndex) -> WriteResult<()> {
        let path = self.pack_dir.join(INDEX_FILE_NAME);
        let mut out = BufWriter::new(io!(
            Self::create(&path),
            WriteStep::CreateIndex(path.clone())
        )?);

        write_index(index, &mut out)?;
        io!(out.flush(), WriteStep::FlushIndex(path))?;

        Ok(())
    }

    /// Writes one data file per shard in `[0, shard_count)`.
    ///
    /// # Errors
    /// See [`WriteError`]. An offset mismatch stops writing immediately.
    pub fn write_shards<R: ResourceResolver + ?Sized>(
        &self,
        index: &PackIndex,
        resolver: &R,
    ) -> WriteResult<()> {
        for shard in 0..index.shard_count() {
            let shard = shard as u8;
            let entries = index.shard_entries(shard);

            let mut out = BufWriter::new(io!(
                Self::create(&shard_path(&self.pack_dir, shard)),
                WriteStep::CreateShard(shard)
            )?);

            let written = write_shard(shard, &entries, resolver, &mut out)?;
            io!(out.flush(), WriteStep::FlushShard(shard))?;

            debug!(
                "Wrote shard {shard}: {} resources, {written} bytes",
                entries.len()
            );
        }

        Ok(())
    }

    fn create(path: &Path) -> std::io::Result<File> {
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)
    }
}

/// Groups, plans and writes `resources` into `pack_dir` in one go, returning the written index.
///
/// Resources are read through their own [`ResourceSource`](crate::ResourceSource).
///
/// # Errors
/// [`WriteError::Planning`] if the resources cannot be planned, otherwise see [`WriteError`].
pub fn pack_resources(
    resources: impl IntoIterator<Item = Resource>,
    strategy: GroupingStrategy,
    config: &PackConfig,
    pack_dir: impl AsRef<Path>,
) -> WriteResult<PackIndex> {
    let groups = strategy.group(resources).context(PlanningCtx)?;
    let bag = ResourceBag::from_groups(&groups);
    let index = PackingPlanner::new(config)
        .plan(groups)
        .context(PlanningCtx)?;

    PackWriter::new(pack_dir)?.write(&index, &bag)?;

    Ok(index)
}
