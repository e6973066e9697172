use snafu::Snafu;

use crate::resource::group::GroupError;
use crate::resource::id::ResourceId;

/// Errors raised from planning a pack
#[derive(Snafu, Debug)]
#[snafu(context(suffix(Ctx)), visibility(pub(crate)))]
pub enum PlanError {
    /// The same id appears in more than one resource, in one group or across groups.
    #[snafu(display("Resource {id} appears more than once in the input!"))]
    DuplicateResource {
        /// The duplicated id.
        id: ResourceId,
    },
    /// A resource is too large for the 4 byte length of an index entry.
    #[snafu(display("Resource {id} is {size} bytes, the limit is {} bytes!", u32::MAX))]
    ResourceTooLarge {
        /// The resource.
        id: ResourceId,
        /// Its size.
        size: u64,
    },
    /// The input needs more shards than a 1 byte shard index can address.
    #[snafu(display(
        "Input needs more than {} shards! Increase the maximum shard size.",
        MAX_SHARDS
    ))]
    TooManyShards,
}

/// Number of shards a pack can address.
pub const MAX_SHARDS: usize = u8::MAX as usize + 1;

impl From<GroupError> for PlanError {
    fn from(error: GroupError) -> Self {
        match error {
            GroupError::DuplicateInGroup { id } => PlanError::DuplicateResource { id },
        }
    }
}

/// Shorthand type for [`Result<T, PlanError>`]
pub type PlanResult<T> = Result<T, PlanError>;
