//! Ways of splitting a flat list of resources into [`ResourceGroup`]s.

use std::fmt::Display;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::resource::group::{ResourceGroup, ResourceGroupBuilder};
use crate::resource::Resource;

use super::PlanResult;

/// How resources are bundled into co-location groups before planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupingStrategy {
    /// One group per `domain:category`, so a category always lands in a single shard.
    ///
    /// Groups are ordered by the first appearance of their category and keep the input order
    /// inside.
    #[default]
    Category,
    /// Every resource is a group of its own.
    Individual,
}

impl GroupingStrategy {
    /// Groups `resources`.
    ///
    /// # Errors
    /// [`PlanError::DuplicateResource`](super::PlanError::DuplicateResource) if two resources in
    /// one category share an id. Duplicates across groups are caught by the planner.
    pub fn group(
        self,
        resources: impl IntoIterator<Item = Resource>,
    ) -> PlanResult<Vec<ResourceGroup>> {
        match self {
            GroupingStrategy::Individual => {
                Ok(resources.into_iter().map(ResourceGroup::single).collect())
            }
            GroupingStrategy::Category => {
                let mut builders: IndexMap<String, ResourceGroupBuilder> = IndexMap::new();

                for resource in resources {
                    builders
                        .entry(resource.id().group_key().to_string())
                        .or_default()
                        .add_resource(resource)?;
                }

                Ok(builders
                    .into_values()
                    .map(ResourceGroupBuilder::build)
                    .collect())
            }
        }
    }
}

impl Display for GroupingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupingStrategy::Category => write!(f, "category"),
            GroupingStrategy::Individual => write!(f, "individual"),
        }
    }
}

impl FromStr for GroupingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(GroupingStrategy::Category),
            "individual" => Ok(GroupingStrategy::Individual),
            other => Err(format!(
                "unknown grouping strategy {other:?}, expected \"category\" or \"individual\""
            )),
        }
    }
}
