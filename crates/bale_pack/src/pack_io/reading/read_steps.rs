use std::io::{self, Cursor, ErrorKind, Read};
use std::path::Path;

use snafu::{ensure, OptionExt, ResultExt};
use tracing::trace;

use crate::pack_io::common::{shard_path, IndexEntry, PackIndex, INDEX_FILE_NAME};
use crate::resource::id::ResourceId;
use crate::resource::ResourceType;

use super::utils::{io, read_bytes};
use super::{
    CorruptIndexCtx, MalformedIdCtx, MissingShardCtx, ReadResult, ReadStep,
    TrailingIndexBytesCtx, TruncatedIndexCtx, UnknownResourceTypeCtx, Utf8Ctx,
};

/// Reads and decodes the index file of the pack in `pack_dir`.
pub fn read_index(pack_dir: &Path) -> ReadResult<PackIndex> {
    let path = pack_dir.join(INDEX_FILE_NAME);
    let bytes = io!(std::fs::read(&path), ReadStep::OpenIndex(path.clone()))?;

    decode_index(&bytes, &path)
}

/// Maps a failed fixed-size read of the index into the matching error.
fn index_field<T>(
    result: io::Result<T>,
    path: &Path,
    what: impl FnOnce() -> String,
) -> ReadResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(error) if error.kind() == ErrorKind::UnexpectedEof => TruncatedIndexCtx {
            path,
            what: what(),
        }
        .fail(),
        Err(error) => Err(error).context(super::IoCtx {
            step: ReadStep::ReadIndex(path.to_path_buf()),
        }),
    }
}

/// Decodes index bytes written by the pack writer.
///
/// `path` is only used for error messages.
pub fn decode_index(bytes: &[u8], path: &Path) -> ReadResult<PackIndex> {
    let mut reader = Cursor::new(bytes);

    let count = u32::from_be_bytes(index_field(read_bytes!(reader, 4), path, || {
        "the entry count".to_string()
    })?);

    // Every entry takes at least 16 bytes, so a bogus count cannot allocate far more than the
    // file size.
    let mut entries = Vec::with_capacity((count as usize).min(bytes.len() / 16));

    for entry in 0..count {
        let id_length = u16::from_be_bytes(index_field(read_bytes!(reader, 2), path, || {
            format!("the id length of entry {entry}")
        })?);

        let mut id_bytes = vec![0u8; id_length as usize];
        index_field(reader.read_exact(&mut id_bytes), path, || {
            format!("the id of entry {entry}")
        })?;

        let id = std::str::from_utf8(&id_bytes).with_context(|_| Utf8Ctx {
            entry,
            bytes: id_bytes.clone().into_boxed_slice(),
        })?;
        let id = ResourceId::parse(id).context(MalformedIdCtx { entry })?;

        let location = index_field(read_entry_location(&mut reader), path, || {
            format!("the location of resource {id}")
        })?;
        let resource_type = ResourceType::from_discriminator(location.tag).with_context(|| {
            UnknownResourceTypeCtx {
                id: id.clone(),
                tag: location.tag,
            }
        })?;

        trace!(
            "Decoded index entry {id}: shard {}, offset {}, length {}, type {resource_type}",
            location.shard,
            location.offset,
            location.length
        );

        entries.push((
            id,
            IndexEntry {
                shard: location.shard,
                offset: location.offset,
                length: location.length,
                resource_type,
            },
        ));
    }

    let trailing = bytes.len() as u64 - reader.position();
    ensure!(trailing == 0, TrailingIndexBytesCtx { path, count: trailing });

    PackIndex::from_entries(entries)
        .map_err(|violation| CorruptIndexCtx { path, violation }.build())
}

/// The fixed-size tail of an index entry.
struct EntryLocation {
    shard: u8,
    offset: u64,
    length: u32,
    tag: u8,
}

fn read_entry_location<R: Read>(reader: &mut R) -> io::Result<EntryLocation> {
    let [shard] = read_bytes!(reader, 1)?;
    let offset = u64::from_be_bytes(read_bytes!(reader, 8)?);
    let length = u32::from_be_bytes(read_bytes!(reader, 4)?);
    let [tag] = read_bytes!(reader, 1)?;

    Ok(EntryLocation {
        shard,
        offset,
        length,
        tag,
    })
}

/// Fails if any shard file referenced by `index` does not exist.
pub fn validate_shards(pack_dir: &Path, index: &PackIndex) -> ReadResult<()> {
    for shard in 0..index.shard_count() {
        let shard = shard as u8;
        let path = shard_path(pack_dir, shard);

        let exists = io!(path.try_exists(), ReadStep::CheckShard(shard))?;
        ensure!(
            exists && path.is_file(),
            MissingShardCtx {
                pack: pack_dir,
                shard
            }
        );
    }

    Ok(())
}
