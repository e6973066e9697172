use std::{fmt::Display, path::PathBuf};

use snafu::{Location, Snafu};

use crate::pack_io::common::IndexViolation;
use crate::resource::id::{IdError, ResourceId};
use crate::resource::ResourceType;

/// Error raised from loading a pack or reading resources from it.
#[derive(Snafu, Debug)]
#[snafu(context(suffix(Ctx)), visibility(pub(crate)))]
pub enum ReadError {
    /// The pack path is not a directory.
    #[snafu(display("Pack at {} is not a directory!", path.display()))]
    NotADirectory {
        /// The passed in pack path.
        path: PathBuf,
    },
    /// IO error from file operations
    #[snafu(display("Encountered IO Error: {source} while {step}. Error occurred at {location}"))]
    IoError {
        /// The [`std::io::Error`].
        source: std::io::Error,
        /// The read step at which the error occurred.
        step: ReadStep,
        /// The source code location where the error occurred.
        #[snafu(implicit)]
        location: Location,
    },
    /// The index file ended in the middle of an entry.
    #[snafu(display("Index at {} is truncated! It ended while reading {what}.", path.display()))]
    TruncatedIndex {
        /// The index file.
        path: PathBuf,
        /// What was being read.
        what: String,
    },
    /// The index file has bytes after its last entry.
    #[snafu(display("Index at {} has {count} unexpected trailing bytes!", path.display()))]
    TrailingIndexBytes {
        /// The index file.
        path: PathBuf,
        /// Number of bytes past the last entry.
        count: u64,
    },
    /// A stored resource id is not valid UTF-8.
    #[snafu(display("Resource id {bytes:?} in entry {entry} could not be converted to UTF-8! {source}"))]
    Utf8Error {
        /// The origin error
        source: std::str::Utf8Error,
        /// Position of the entry in the index.
        entry: u32,
        /// The exact bytes stored in the index.
        bytes: Box<[u8]>,
    },
    /// A stored resource id is not a well formed id.
    #[snafu(display("Resource id in entry {entry} is malformed! {source}"))]
    MalformedId {
        /// The origin error.
        source: IdError,
        /// Position of the entry in the index.
        entry: u32,
    },
    /// A stored type discriminator is not known.
    #[snafu(display("Resource {id} has unknown type discriminator {tag}!"))]
    UnknownResourceType {
        /// The resource.
        id: ResourceId,
        /// The stored discriminator.
        tag: u8,
    },
    /// The entries do not describe a valid layout.
    #[snafu(display("Index at {} is corrupt: {violation}.", path.display()))]
    CorruptIndex {
        /// The index file.
        path: PathBuf,
        /// What is wrong with it.
        violation: IndexViolation,
    },
    /// The index refers to a shard whose data file does not exist.
    #[snafu(display("Incomplete pack at {}! Shard file {shard} referenced by the index is missing.", pack.display()))]
    MissingShard {
        /// The pack directory.
        pack: PathBuf,
        /// The missing shard.
        shard: u8,
    },
    /// The requested resource does not exist in the pack.
    #[snafu(display("Unknown resource id {id}! It does not exist in the pack."))]
    UnknownResource {
        /// The requested id.
        id: ResourceId,
    },
    /// The resource exists but was packed with a different type.
    #[snafu(display("Resource {id} was requested as {expected} but was packed as {actual}!"))]
    TypeMismatch {
        /// The requested id.
        id: ResourceId,
        /// The type the caller asked for.
        expected: ResourceType,
        /// The type stored in the index.
        actual: ResourceType,
    },
}

#[derive(Debug)]
/// A representation of the read steps.
pub enum ReadStep {
    /// Opening the index file. Stores its path.
    OpenIndex(PathBuf),
    /// Reading the index file. Stores its path.
    ReadIndex(PathBuf),
    /// Checking whether a shard file exists. Stores the shard.
    CheckShard(u8),
    /// Opening a shard file through the retention policy.
    OpenShard {
        /// The resource being loaded.
        id: ResourceId,
        /// The shard.
        shard: u8,
    },
    /// Seeking a shard to the start of a resource.
    SeekToResource {
        /// The resource being loaded.
        id: ResourceId,
        /// The shard.
        shard: u8,
        /// The offset of the resource in the shard.
        offset: u64,
    },
    /// Reading a resource in full while verifying a pack.
    VerifyResource(ResourceId),
}

impl Display for ReadStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadStep::OpenIndex(path) => write!(f, "opening pack index at {}", path.display()),
            ReadStep::ReadIndex(path) => write!(f, "reading pack index at {}", path.display()),
            ReadStep::CheckShard(shard) => write!(f, "checking that shard file {shard} exists"),
            ReadStep::OpenShard { id, shard } => {
                write!(f, "opening shard {shard} to load resource {id}")
            }
            ReadStep::SeekToResource { id, shard, offset } => write!(
                f,
                "seeking shard {shard} to offset {offset} to load resource {id}"
            ),
            ReadStep::VerifyResource(id) => write!(f, "verifying resource {id}"),
        }
    }
}

/// Shorthand type for [`Result<T, ReadError>`]
pub type ReadResult<T> = Result<T, ReadError>;
