use std::io::{self, Read, Write};

use snafu::{ensure, OptionExt};
use tracing::trace;

use crate::pack_io::common::{IndexEntry, PackIndex};
use crate::resource::id::ResourceId;
use crate::resource::ResourceResolver;

use super::utils::io;
use super::{
    IdTooLongCtx, OffsetMismatchCtx, ResourceLengthMismatchCtx, TooManyEntriesCtx, WriteResult,
    WriteStep,
};

/// Serializes `index` in index iteration order.
///
/// Layout: entry count (u32 BE), then for every entry the id length (u16 BE), the UTF-8 id, the
/// shard (u8), offset (u64 BE), length (u32 BE) and type discriminator (u8).
///
/// Nothing is written if the entry count or an id does not fit its length field.
pub fn write_index<W: Write>(index: &PackIndex, out: &mut W) -> WriteResult<()> {
    let count = u32::try_from(index.len())
        .ok()
        .context(TooManyEntriesCtx { count: index.len() })?;
    let id_lengths = index
        .iter()
        .map(|(id, _)| {
            let length = id.as_str().len();
            u16::try_from(length)
                .ok()
                .with_context(|| IdTooLongCtx { id: id.clone(), length })
        })
        .collect::<WriteResult<Vec<_>>>()?;

    // # Entry count
    io!(out.write_all(&count.to_be_bytes()), WriteStep::WriteIndex)?;

    for ((id, entry), id_length) in index.iter().zip(id_lengths) {
        let step = || WriteStep::WriteIndexEntry(id.clone());

        // ## Id
        io!(out.write_all(&id_length.to_be_bytes()), step())?;
        io!(out.write_all(id.as_str().as_bytes()), step())?;
        // ## Location
        io!(out.write_all(&[entry.shard]), step())?;
        io!(out.write_all(&entry.offset.to_be_bytes()), step())?;
        io!(out.write_all(&entry.length.to_be_bytes()), step())?;
        // ## Type
        io!(out.write_all(&[entry.resource_type.discriminator()]), step())?;
    }

    Ok(())
}

/// Copies the resources of one shard into `out`, in the order they are given.
///
/// Before every copy the bytes written so far must equal the offset the index recorded for the
/// resource. Returns the number of bytes written.
pub fn write_shard<W: Write, R: ResourceResolver + ?Sized>(
    shard: u8,
    entries: &[(&ResourceId, &IndexEntry)],
    resolver: &R,
    out: &mut W,
) -> WriteResult<u64> {
    let mut written = 0u64;

    for &(id, entry) in entries {
        ensure!(
            written == entry.offset,
            OffsetMismatchCtx {
                id: id.clone(),
                shard,
                expected: entry.offset,
                actual: written,
            }
        );

        let copied = {
            let source = io!(resolver.open(id), WriteStep::OpenResource(id.clone()))?;
            io!(
                io::copy(&mut source.take(u64::from(entry.length)), out),
                WriteStep::CopyResource {
                    id: id.clone(),
                    shard,
                    offset: entry.offset,
                }
            )?
        };

        ensure!(
            copied == u64::from(entry.length),
            ResourceLengthMismatchCtx {
                id: id.clone(),
                expected: entry.length,
                actual: copied,
            }
        );

        trace!("Wrote {id} to shard {shard} at offset {written} ({copied} bytes)");
        written += copied;
    }

    Ok(written)
}
