#![allow(dead_code)]

use bale_pack::{
    PackConfig, PackIndex, PackWriter, PackingPlanner, Resource, ResourceBag, ResourceGroup,
    ResourceId, ResourceType, RetentionKind,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::io::Read;
use std::path::Path;

/// Every retention policy, with a small LRU so eviction happens.
pub const RETENTION_KINDS: [RetentionKind; 3] = [
    RetentionKind::OpenPerCall,
    RetentionKind::SingleMapped,
    RetentionKind::LruMapped { capacity: 2 },
];

pub fn id(s: &str) -> ResourceId {
    ResourceId::parse(s).unwrap()
}

/// A resource holding `size` seeded random bytes.
pub fn random_resource(rng: &mut StdRng, id: &str, size: usize) -> Resource {
    let mut bytes = vec![0u8; size];
    rng.fill(&mut bytes[..]);

    Resource::from_bytes(self::id(id), ResourceType::Raw, bytes)
}

/// `group_count` groups of 1 to 4 random resources each, between 0 and `max_size` bytes.
pub fn random_groups(seed: u64, group_count: usize, max_size: usize) -> Vec<ResourceGroup> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..group_count)
        .map(|g| {
            let mut builder = ResourceGroup::builder();
            for r in 0..rng.random_range(1..=4) {
                let size = rng.random_range(0..=max_size);
                builder
                    .add_resource(random_resource(&mut rng, &format!("test:g{g}/r{r}"), size))
                    .unwrap();
            }
            builder.build()
        })
        .collect()
}

pub fn config(max_shard_size: u64, retention: RetentionKind) -> PackConfig {
    let mut config = PackConfig::default();
    config
        .set_max_shard_size(max_shard_size)
        .unwrap()
        .set_retention(retention)
        .unwrap();
    config
}

/// Plans and writes `groups` into `dir`.
pub fn pack(
    dir: &Path,
    groups: &[ResourceGroup],
    config: &PackConfig,
) -> Result<PackIndex, Box<dyn Error>> {
    let bag = ResourceBag::from_groups(groups);
    let index = PackingPlanner::new(config).plan(groups)?;
    PackWriter::new(dir)?.write(&index, &bag)?;

    Ok(index)
}

/// The bytes every resource of `groups` was created with.
pub fn contents(groups: &[ResourceGroup]) -> Vec<(ResourceId, Vec<u8>)> {
    groups
        .iter()
        .flat_map(|group| group.resources())
        .map(|resource| {
            let mut bytes = vec![];
            resource.open().unwrap().read_to_end(&mut bytes).unwrap();
            (resource.id().clone(), bytes)
        })
        .collect()
}
