//! Packing of named binary resources into size-bounded shard files.
//!
//! A pack is a directory holding an `index` file plus numbered shard files (`0`, `1`, ...).
//! Resources are planned into shards group by group ([`planning`]), written with
//! [`PackWriter`](pack_io::writing::PackWriter) and served back through
//! [`PackReader`](pack_io::reading::PackReader).

pub mod config;
pub mod pack_io;
pub mod planning;
pub mod resource;

pub use config::{PackConfig, RetentionKind};
pub use pack_io::common::{IndexEntry, PackIndex};
pub use pack_io::gathering::gather_resources;
pub use pack_io::reading::retention::RetentionPolicy;
pub use pack_io::reading::{PackReader, ResourceStream};
pub use pack_io::writing::{pack_resources, PackWriter};
pub use planning::grouping::GroupingStrategy;
pub use planning::{PackingPlanner, PlanError};
pub use resource::group::{ResourceGroup, ResourceGroupBuilder};
pub use resource::id::ResourceId;
pub use resource::{Resource, ResourceBag, ResourceResolver, ResourceSource, ResourceType};
