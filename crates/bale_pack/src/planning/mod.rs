//! Assigning resources to shards.
//!
//! The planner is a single greedy pass over the groups in input order. A group is appended to the
//! current shard unless doing so would push the shard past the maximum size, in which case the
//! shard is closed first. A group is never split, so a group larger than the maximum gets an
//! oversized shard to itself. Nothing is reordered, which makes the result a pure function of
//! the input order and the configuration.

mod errors;
pub mod grouping;

pub use errors::*;

use std::borrow::Borrow;

use indexmap::map::Entry;
use indexmap::IndexMap;
use snafu::ensure;
use tracing::{debug, instrument, warn};

use crate::config::PackConfig;
use crate::pack_io::common::{IndexEntry, PackIndex};
use crate::resource::group::ResourceGroup;
use crate::resource::id::ResourceId;

/// Turns a sequence of [`ResourceGroup`]s into a [`PackIndex`]. No IO happens here.
#[derive(Debug, Clone, Copy)]
pub struct PackingPlanner {
    max_shard_size: u64,
}

/// The shard currently being filled.
#[derive(Debug, Default)]
struct OpenShard {
    index: usize,
    size: u64,
    groups: usize,
    resources: usize,
}

impl PackingPlanner {
    /// Creates a planner using the shard size bound of `config`.
    pub fn new(config: &PackConfig) -> Self {
        Self {
            max_shard_size: config.max_shard_size(),
        }
    }

    /// The soft shard size bound in bytes.
    pub fn max_shard_size(&self) -> u64 {
        self.max_shard_size
    }

    /// Plans `groups`, consuming them once in order.
    ///
    /// Empty groups are skipped. An empty input gives an empty index with no shards.
    ///
    /// # Errors
    /// - [`PlanError::DuplicateResource`] if an id appears in more than one group
    /// - [`PlanError::ResourceTooLarge`] if a resource does not fit an index entry
    /// - [`PlanError::TooManyShards`] if more than 256 shards would be needed
    #[instrument(skip_all, fields(max_shard_size = self.max_shard_size))]
    pub fn plan<G: Borrow<ResourceGroup>>(
        &self,
        groups: impl IntoIterator<Item = G>,
    ) -> PlanResult<PackIndex> {
        let mut entries: IndexMap<ResourceId, IndexEntry> = IndexMap::new();
        let mut shard = OpenShard::default();

        for group in groups {
            let group = group.borrow();
            if group.is_empty() {
                warn!("Skipping empty resource group");
                continue;
            }

            if shard.size.saturating_add(group.total_size()) > self.max_shard_size
                && shard.groups > 0
            {
                Self::close(&shard);
                ensure!(shard.index + 1 < MAX_SHARDS, TooManyShardsCtx);
                shard = OpenShard {
                    index: shard.index + 1,
                    ..OpenShard::default()
                };
            }

            Self::append(&mut shard, group, &mut entries)?;
        }

        if shard.groups > 0 {
            Self::close(&shard);
        }

        Ok(PackIndex::new_unchecked(entries))
    }

    /// Lays the resources of `group` out after the current end of `shard`.
    fn append(
        shard: &mut OpenShard,
        group: &ResourceGroup,
        entries: &mut IndexMap<ResourceId, IndexEntry>,
    ) -> PlanResult<()> {
        for resource in group.resources() {
            let length = u32::try_from(resource.size()).ok();
            let length = match length {
                Some(length) => length,
                None => {
                    return ResourceTooLargeCtx {
                        id: resource.id().clone(),
                        size: resource.size(),
                    }
                    .fail()
                }
            };

            match entries.entry(resource.id().clone()) {
                Entry::Occupied(occupied) => {
                    return DuplicateResourceCtx {
                        id: occupied.key().clone(),
                    }
                    .fail()
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(IndexEntry {
                        shard: shard.index as u8,
                        offset: shard.size,
                        length,
                        resource_type: resource.resource_type(),
                    });
                }
            }

            shard.size += u64::from(length);
            shard.resources += 1;
        }

        shard.groups += 1;

        Ok(())
    }

    fn close(shard: &OpenShard) {
        debug!(
            "Planned shard {}: {} groups, {} resources, {} bytes",
            shard.index, shard.groups, shard.resources, shard.size
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use assert2::{assert, let_assert};
    use tracing_test::traced_test;

    use super::{PackingPlanner, PlanError};
    use crate::config::PackConfig;
    use crate::pack_io::common::PackIndex;
    use crate::resource::group::ResourceGroup;
    use crate::resource::id::ResourceId;
    use crate::resource::{Resource, ResourceSource, ResourceType};

    const MB: u64 = 1024 * 1024;

    fn sized(id: &str, size: u64) -> Resource {
        Resource::with_size(
            ResourceId::parse(id).unwrap(),
            ResourceType::Raw,
            size,
            ResourceSource::Bytes(Vec::new().into()),
        )
    }

    fn group(resources: &[(&str, u64)]) -> ResourceGroup {
        let mut builder = ResourceGroup::builder();
        for (id, size) in resources {
            builder.add_resource(sized(id, *size)).unwrap();
        }
        builder.build()
    }

    fn plan(max_shard_size: u64, groups: Vec<ResourceGroup>) -> Result<PackIndex, PlanError> {
        let mut config = PackConfig::default();
        config.set_max_shard_size(max_shard_size).unwrap();
        PackingPlanner::new(&config).plan(groups)
    }

    fn location(index: &PackIndex, id: &str) -> (u8, u64, u32) {
        let entry = index.get(&ResourceId::parse(id).unwrap()).unwrap();
        (entry.shard, entry.offset, entry.length)
    }

    #[test]
    fn groups_fill_shards_up_to_the_cap() {
        let index = plan(
            1024 * MB,
            vec![
                group(&[("r:s/1", 400 * MB)]),
                group(&[("r:s/2", 400 * MB)]),
                group(&[("r:s/3", 400 * MB)]),
            ],
        )
        .unwrap();

        assert!(index.shard_count() == 2);
        assert!(location(&index, "r:s/1") == (0, 0, (400 * MB) as u32));
        assert!(location(&index, "r:s/2") == (0, 400 * MB, (400 * MB) as u32));
        assert!(location(&index, "r:s/3") == (1, 0, (400 * MB) as u32));
    }

    #[test]
    fn oversized_group_gets_its_own_shard() {
        let index = plan(1024 * MB, vec![group(&[("r:s/big", 2048 * MB)])]).unwrap();

        assert!(index.shard_count() == 1);
        assert!(index.shard_sizes() == [2048 * MB]);

        let index = plan(
            10,
            vec![
                group(&[("r:s/a", 4)]),
                group(&[("r:s/big", 30)]),
                group(&[("r:s/b", 4)]),
            ],
        )
        .unwrap();
        assert!(index.shard_sizes() == [4, 30, 4]);
    }

    #[test]
    fn group_members_are_contiguous_in_one_shard() {
        let index = plan(25, vec![group(&[("r:s/a", 10), ("r:s/b", 20)])]).unwrap();

        assert!(location(&index, "r:s/a") == (0, 0, 10));
        assert!(location(&index, "r:s/b") == (0, 10, 20));
    }

    #[test]
    fn exact_fit_stays_in_the_shard() {
        let index = plan(10, vec![group(&[("r:s/a", 6)]), group(&[("r:s/b", 4)])]).unwrap();
        assert!(index.shard_count() == 1);
    }

    #[test]
    fn empty_input_plans_no_shards() {
        let index = plan(10, vec![]).unwrap();

        assert!(index.is_empty());
        assert!(index.shard_count() == 0);
    }

    #[test]
    #[traced_test]
    fn empty_groups_are_skipped() {
        let index = plan(
            10,
            vec![
                ResourceGroup::builder().build(),
                group(&[("r:s/a", 8)]),
                ResourceGroup::builder().build(),
                group(&[("r:s/b", 8)]),
            ],
        )
        .unwrap();

        assert!(index.shard_count() == 2);
        assert!(index.shard_sizes() == [8, 8]);
        assert!(logs_contain("Skipping empty resource group"));
    }

    #[test]
    fn zero_sized_resources_are_planned() {
        let index = plan(10, vec![group(&[("r:s/a", 0), ("r:s/b", 3), ("r:s/c", 0)])]).unwrap();

        assert!(location(&index, "r:s/a") == (0, 0, 0));
        assert!(location(&index, "r:s/b") == (0, 0, 3));
        assert!(location(&index, "r:s/c") == (0, 3, 0));
        // the planned layout passes the same checks a decoded index does
        let entries: Vec<_> = index.iter().map(|(id, entry)| (id.clone(), *entry)).collect();
        assert!(PackIndex::from_entries(entries).unwrap() == index);
    }

    #[test]
    fn duplicates_across_groups_are_rejected() {
        let_assert!(
            Err(PlanError::DuplicateResource { id }) = plan(
                100,
                vec![group(&[("r:s/a", 1)]), group(&[("r:t/b", 1), ("r:s/a", 1)])]
            )
        );
        assert!(id.as_str() == "r:s/a");
    }

    #[test]
    fn resources_must_fit_an_entry() {
        let_assert!(
            Err(PlanError::ResourceTooLarge { size, .. }) =
                plan(u64::MAX, vec![group(&[("r:s/a", u64::from(u32::MAX) + 1)])])
        );
        assert!(size == u64::from(u32::MAX) + 1);
    }

    #[test]
    fn shard_count_is_bounded() {
        let groups = |count: usize| {
            (0..count)
                .map(|i| group(&[(format!("r:s/{i}").as_str(), 1)]))
                .collect::<Vec<_>>()
        };

        let index = plan(1, groups(256)).unwrap();
        assert!(index.shard_count() == 256);

        let_assert!(Err(PlanError::TooManyShards) = plan(1, groups(257)));
    }

    #[test]
    fn planning_is_deterministic() {
        let groups = || {
            (0..50u64)
                .map(|i| {
                    let (a, b) = (format!("r:g{i}/a"), format!("r:g{i}/b"));
                    group(&[(a.as_str(), i * 7 % 13 + 1), (b.as_str(), i * 3 % 5)])
                })
                .collect::<Vec<_>>()
        };

        let first = plan(40, groups()).unwrap();
        let second = plan(40, groups()).unwrap();
        assert!(first == second);

        let order_a: Vec<_> = first.iter().map(|(id, _)| id.clone()).collect();
        let order_b: Vec<_> = second.iter().map(|(id, _)| id.clone()).collect();
        assert!(order_a == order_b);

        // groups never straddle shards
        for i in 0..50 {
            let a = location(&first, &format!("r:g{i}/a")).0;
            let b = location(&first, &format!("r:g{i}/b")).0;
            assert!(a == b);
        }
        let shards: HashSet<_> = first.iter().map(|(_, entry)| entry.shard).collect();
        assert!(shards.len() == first.shard_count());
    }
}
