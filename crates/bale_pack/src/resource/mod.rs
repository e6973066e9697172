//! Resources to be packed and the ways to get at their bytes.

pub mod group;
pub mod id;

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::fs::File;
use std::io::{self, BufReader, Cursor, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use group::ResourceGroup;
use id::ResourceId;

/// The kind of content a resource holds.
///
/// Stored as a one byte discriminator in the pack index. Readers must ask for the same type the
/// resource was packed with.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ResourceType {
    /// Arbitrary bytes.
    #[default]
    Raw = 0,
    /// A language file with `key=value` lines.
    Lang = 1,
    /// An encoded image.
    Image = 2,
    /// A font file.
    Font = 3,
}

impl ResourceType {
    /// All known types, in discriminator order.
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Raw,
        ResourceType::Lang,
        ResourceType::Image,
        ResourceType::Font,
    ];

    /// The discriminator written to the index.
    pub fn discriminator(self) -> u8 {
        self as u8
    }

    /// Looks up a type from its discriminator.
    pub fn from_discriminator(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Guesses a type from a file extension (without the leading `.`), case-insensitively.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "lang" => ResourceType::Lang,
            "png" | "jpg" | "jpeg" | "bmp" | "gif" => ResourceType::Image,
            "ttf" | "otf" => ResourceType::Font,
            _ => ResourceType::Raw,
        }
    }

    /// Lower case name, as accepted by [`FromStr`](std::str::FromStr).
    pub fn name(self) -> &'static str {
        match self {
            ResourceType::Raw => "raw",
            ResourceType::Lang => "lang",
            ResourceType::Image => "image",
            ResourceType::Font => "font",
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown resource type {s:?}"))
    }
}

/// Where the bytes of a [`Resource`] come from.
#[derive(Clone)]
pub enum ResourceSource {
    /// A file on disk.
    Path(PathBuf),
    /// Bytes already in memory.
    Bytes(Arc<[u8]>),
}

impl Debug for ResourceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ResourceSource::Bytes(bytes) => write!(f, "Bytes(<{} bytes>)", bytes.len()),
        }
    }
}

impl ResourceSource {
    /// Opens a fresh stream over the source.
    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        match self {
            ResourceSource::Path(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            ResourceSource::Bytes(bytes) => Ok(Box::new(Cursor::new(ArcBytes(bytes.clone())))),
        }
    }
}

/// `AsRef<[u8]>` wrapper so a shared buffer can back a [`Cursor`].
struct ArcBytes(Arc<[u8]>);

impl AsRef<[u8]> for ArcBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A single named unit of content with a size known up front.
#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    resource_type: ResourceType,
    size: u64,
    source: ResourceSource,
}

impl Resource {
    /// Creates a resource backed by a file, taking its size from the file metadata.
    ///
    /// # Errors
    /// Fails if the metadata of `path` cannot be read.
    pub fn from_path(
        id: ResourceId,
        resource_type: ResourceType,
        path: impl AsRef<Path>,
    ) -> io::Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();

        Ok(Self::with_size(
            id,
            resource_type,
            size,
            ResourceSource::Path(path.to_path_buf()),
        ))
    }

    /// Creates a resource holding `bytes`.
    pub fn from_bytes(
        id: ResourceId,
        resource_type: ResourceType,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;

        Self::with_size(id, resource_type, size, ResourceSource::Bytes(bytes))
    }

    /// Creates a resource with an explicitly declared size.
    ///
    /// The source must yield exactly `size` bytes when the pack is written, otherwise the writer
    /// fails.
    pub fn with_size(
        id: ResourceId,
        resource_type: ResourceType,
        size: u64,
        source: ResourceSource,
    ) -> Self {
        Self {
            id,
            resource_type,
            size,
            source,
        }
    }

    /// The identifier.
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// The content type.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Where the bytes come from.
    pub fn source(&self) -> &ResourceSource {
        &self.source
    }

    /// Opens a stream over the resource bytes.
    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        self.source.open()
    }
}

/// Maps a resource id to a stream of its bytes while a pack is written.
pub trait ResourceResolver {
    /// Opens the bytes of `id`.
    fn open(&self, id: &ResourceId) -> io::Result<Box<dyn Read + '_>>;
}

impl<F, R> ResourceResolver for F
where
    F: Fn(&ResourceId) -> io::Result<R>,
    R: Read + 'static,
{
    fn open(&self, id: &ResourceId) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(self(id)?))
    }
}

/// Immutable id to source lookup, usually collected from the groups being packed.
#[derive(Debug, Default, Clone)]
pub struct ResourceBag {
    sources: HashMap<ResourceId, ResourceSource>,
}

impl ResourceBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the sources of every resource in `groups`.
    pub fn from_groups<'g>(groups: impl IntoIterator<Item = &'g ResourceGroup>) -> Self {
        groups
            .into_iter()
            .flat_map(|group| group.resources())
            .collect()
    }

    /// Adds or replaces the source of `id`.
    pub fn insert(&mut self, id: ResourceId, source: ResourceSource) {
        self.sources.insert(id, source);
    }

    /// Number of sources in the bag.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<'r> FromIterator<&'r Resource> for ResourceBag {
    fn from_iter<T: IntoIterator<Item = &'r Resource>>(iter: T) -> Self {
        Self {
            sources: iter
                .into_iter()
                .map(|resource| (resource.id.clone(), resource.source.clone()))
                .collect(),
        }
    }
}

impl ResourceResolver for ResourceBag {
    fn open(&self, id: &ResourceId) -> io::Result<Box<dyn Read + '_>> {
        match self.sources.get(id) {
            Some(source) => Ok(source.open()?),
            None => Err(io::Error::new(
                ErrorKind::NotFound,
                format!("no source registered for resource {id}"),
            )),
        }
    }
}
