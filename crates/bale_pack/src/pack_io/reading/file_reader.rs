use std::cmp::min;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};

use crate::pack_io::common::IndexEntry;
use crate::resource::id::ResourceId;

use super::retention::ShardSource;
use super::utils::io;
use super::{ReadResult, ReadStep};

/// A [`Read`] + [`Seek`] stream over the bytes of one resource inside a shard file.
///
/// Positions are relative to the start of the resource and reads stop at its end. The stream does
/// not check up front that the shard actually holds all of the bytes; a truncated shard shows up
/// as an early end of stream, which [`read_to_vec`](Self::read_to_vec) reports as
/// [`ErrorKind::UnexpectedEof`].
pub struct ResourceStream {
    shard: ShardSource,
    id: ResourceId,
    entry: IndexEntry,
    seek_pos: u64,
}

impl std::fmt::Debug for ResourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStream")
            .field("id", &self.id)
            .field("entry", &self.entry)
            .field("seek_pos", &self.seek_pos)
            .finish()
    }
}

impl ResourceStream {
    /// Creates a new [`ResourceStream`] and seeks the shard to the start of the resource.
    ///
    /// # Errors
    /// [`ReadError::IoError`](super::ReadError::IoError) if seeking fails.
    pub(crate) fn new(mut shard: ShardSource, id: ResourceId, entry: IndexEntry) -> ReadResult<Self> {
        io!(
            shard.seek(SeekFrom::Start(entry.offset)),
            ReadStep::SeekToResource {
                id: id.clone(),
                shard: entry.shard,
                offset: entry.offset,
            }
        )?;

        Ok(Self {
            shard,
            id,
            entry,
            seek_pos: 0,
        })
    }

    /// The id of the resource being read.
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// The index entry of the resource being read.
    pub fn entry(&self) -> &IndexEntry {
        &self.entry
    }

    /// Length of the resource in bytes.
    pub fn len(&self) -> u64 {
        u64::from(self.entry.length)
    }

    /// Whether the resource has no bytes.
    pub fn is_empty(&self) -> bool {
        self.entry.length == 0
    }

    /// Bytes left between the current position and the end of the resource.
    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.seek_pos)
    }

    /// Reads the rest of the resource into a vector.
    ///
    /// # Errors
    /// [`ErrorKind::UnexpectedEof`] if the shard ends before the resource does.
    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.remaining() as usize);
        self.read_to_end(&mut buf)?;

        if self.remaining() != 0 {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "shard {} ended {} bytes before the end of resource {}",
                    self.entry.shard,
                    self.remaining(),
                    self.id
                ),
            ));
        }

        Ok(buf)
    }

    /// Reads the rest of the resource as UTF-8 text.
    ///
    /// # Errors
    /// Same as [`read_to_vec`](Self::read_to_vec), plus [`ErrorKind::InvalidData`] for invalid
    /// UTF-8.
    pub fn read_to_utf8(self) -> io::Result<String> {
        String::from_utf8(self.read_to_vec()?)
            .map_err(|error| io::Error::new(ErrorKind::InvalidData, error))
    }
}

impl Read for ResourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.seek_pos >= self.len() {
            return Ok(0);
        }

        let max_read_length = min(self.remaining(), usize::MAX as u64) as usize;
        let read_length = min(buf.len(), max_read_length);

        let read_bytes = self.shard.read(&mut buf[..read_length])?;
        self.seek_pos += read_bytes as u64;

        Ok(read_bytes)
    }
}

impl Seek for ResourceStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_seek_pos = match pos {
            SeekFrom::Start(pos) => i128::from(pos),
            //                 equivalent to the end pos
            SeekFrom::End(pos) => i128::from(self.len()) + i128::from(pos),
            SeekFrom::Current(pos) => i128::from(self.seek_pos) + i128::from(pos),
        };

        if new_seek_pos < 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "Tried to seek beyond the start of the resource.",
            ));
        }

        let new_seek_pos = u64::try_from(new_seek_pos)
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "Seek position overflowed."))?;

        // Past the end only reads return 0, so the shard never moves beyond the resource
        let shard_pos = self.entry.offset.saturating_add(min(new_seek_pos, self.len()));
        self.shard.seek(SeekFrom::Start(shard_pos))?;
        self.seek_pos = new_seek_pos;

        Ok(self.seek_pos)
    }
}
