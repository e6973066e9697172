//! Co-location units for the planner.

use indexmap::map::Entry;
use indexmap::IndexMap;
use snafu::Snafu;

use super::id::ResourceId;
use super::Resource;

/// Error raised when building a [`ResourceGroup`].
#[derive(Snafu, Debug)]
#[snafu(context(suffix(Ctx)), visibility(pub(crate)))]
pub enum GroupError {
    /// The same id was added to one group twice.
    #[snafu(display("Resource {id} was added to the same group twice!"))]
    DuplicateInGroup {
        /// The duplicated id.
        id: ResourceId,
    },
}

/// Shorthand type for [`Result<T, GroupError>`]
pub type GroupResult<T> = Result<T, GroupError>;

/// An immutable set of resources that always lands in one shard.
///
/// Resources keep the order they were added in, which is also the order they are laid out in
/// the shard.
#[derive(Debug, Clone, Default)]
pub struct ResourceGroup {
    resources: IndexMap<ResourceId, Resource>,
    total_size: u64,
}

impl ResourceGroup {
    /// Starts building a group.
    pub fn builder() -> ResourceGroupBuilder {
        ResourceGroupBuilder::default()
    }

    /// A group holding a single resource.
    pub fn single(resource: Resource) -> Self {
        let total_size = resource.size();
        let mut resources = IndexMap::with_capacity(1);
        resources.insert(resource.id().clone(), resource);

        Self {
            resources,
            total_size,
        }
    }

    /// Sum of the sizes of every resource, computed when the group was built.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Resources in group order.
    pub fn resources(&self) -> impl ExactSizeIterator<Item = &Resource> + '_ {
        self.resources.values()
    }

    /// Looks up a member by id.
    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the group has no resources.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Builder for [`ResourceGroup`].
#[derive(Debug, Default)]
pub struct ResourceGroupBuilder {
    resources: IndexMap<ResourceId, Resource>,
}

impl ResourceGroupBuilder {
    /// Appends a resource.
    ///
    /// # Errors
    /// [`GroupError::DuplicateInGroup`] if a resource with the same id was already added.
    pub fn add_resource(&mut self, resource: Resource) -> GroupResult<&mut Self> {
        match self.resources.entry(resource.id().clone()) {
            Entry::Occupied(occupied) => DuplicateInGroupCtx {
                id: occupied.key().clone(),
            }
            .fail(),
            Entry::Vacant(vacant) => {
                vacant.insert(resource);
                Ok(self)
            }
        }
    }

    /// Number of resources added so far.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether nothing has been added yet.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Freezes the group and computes its total size.
    pub fn build(self) -> ResourceGroup {
        let total_size = self.resources.values().map(Resource::size).sum();

        ResourceGroup {
            resources: self.resources,
            total_size,
        }
    }
}
