use std::fmt::Display;
use std::path::PathBuf;

use snafu::{Location, Snafu};

use crate::planning::PlanError;
use crate::resource::id::ResourceId;

/// Errors raised from writing packs
#[derive(Snafu, Debug)]
#[snafu(context(suffix(Ctx)), visibility(pub(crate)))]
pub enum WriteError {
    /// The output path exists and is not a directory
    #[snafu(display("{} is not a directory!", path.display()))]
    NotADirectory {
        /// The output path.
        path: PathBuf,
    },
    /// IO error from file operations
    #[snafu(display("Encountered IO Error: {source} while {step}. Error occurred at {location}"))]
    IoError {
        /// The [`std::io::Error`].
        source: std::io::Error,
        /// The write step at which the error occurred.
        step: WriteStep,
        /// The source code location where the error occurred.
        #[snafu(implicit)]
        location: Location,
    },
    /// The index holds more entries than the entry count can express.
    #[snafu(display("Index has {count} entries, more than an index can hold!"))]
    TooManyEntries {
        /// Number of entries.
        count: usize,
    },
    /// A resource id does not fit the 2 byte length prefix.
    #[snafu(display("Resource id {id} is {length} bytes long, the limit is {} bytes!", u16::MAX))]
    IdTooLong {
        /// The id.
        id: ResourceId,
        /// Its length in bytes.
        length: usize,
    },
    /// The bytes already written to a shard do not match the offset recorded for the next
    /// resource. The index and the shard would disagree, so writing stops.
    #[snafu(display(
        "Offset mismatch in shard {shard} at resource {id}! The index expects offset {expected} but {actual} bytes were written."
    ))]
    OffsetMismatch {
        /// The resource about to be written.
        id: ResourceId,
        /// The shard being written.
        shard: u8,
        /// Offset stored in the index.
        expected: u64,
        /// Bytes written to the shard so far.
        actual: u64,
    },
    /// A resource source ran out before yielding the length recorded in the index.
    #[snafu(display(
        "Resource {id} yielded {actual} bytes but the index expects {expected}!"
    ))]
    ResourceLengthMismatch {
        /// The resource.
        id: ResourceId,
        /// Length stored in the index.
        expected: u32,
        /// Bytes the source yielded.
        actual: u64,
    },
    /// Planning the resources failed.
    #[snafu(display("Failed to plan the pack: {source}"))]
    Planning {
        /// The planner error.
        source: PlanError,
    },
}

/// Represents the steps of writing a pack.
#[derive(Debug)]
pub enum WriteStep {
    /// Creating the output directory. Stores its path.
    CreateOutputDir(PathBuf),
    /// Creating the index file. Stores its path.
    CreateIndex(PathBuf),
    /// Writing the entry count of the index.
    WriteIndex,
    /// Writing the index entry of a resource.
    WriteIndexEntry(ResourceId),
    /// Flushing the index file. Stores its path.
    FlushIndex(PathBuf),
    /// Creating the data file of a shard. Stores the shard.
    CreateShard(u8),
    /// Opening the source of a resource through the resolver.
    OpenResource(ResourceId),
    /// Copying a resource into its shard.
    CopyResource {
        /// The resource.
        id: ResourceId,
        /// The shard it is copied into.
        shard: u8,
        /// Its offset in the shard.
        offset: u64,
    },
    /// Flushing the data file of a shard. Stores the shard.
    FlushShard(u8),
}

impl Display for WriteStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteStep::CreateOutputDir(path) => {
                write!(f, "creating output directory {}", path.display())
            }
            WriteStep::CreateIndex(path) => write!(f, "creating index file {}", path.display()),
            WriteStep::WriteIndex => write!(f, "writing the index"),
            WriteStep::WriteIndexEntry(id) => write!(f, "writing the index entry of {id}"),
            WriteStep::FlushIndex(path) => write!(f, "flushing index file {}", path.display()),
            WriteStep::CreateShard(shard) => write!(f, "creating shard file {shard}"),
            WriteStep::OpenResource(id) => write!(f, "opening the source of resource {id}"),
            WriteStep::CopyResource { id, shard, offset } => write!(
                f,
                "copying resource {id} into shard {shard} at offset {offset}"
            ),
            WriteStep::FlushShard(shard) => write!(f, "flushing shard file {shard}"),
        }
    }
}

/// Shorthand type for [`Result<T, WriteError>`]
pub type WriteResult<T> = Result<T, WriteError>;
