//! Tunables for planning and reading packs.
//!
//! Every option has a default, so lookups never fail. Values are validated when they are set,
//! either through the setters or while deserializing a TOML file:
//!
//! ```toml
//! max_shard_size = 1073741824
//!
//! [retention]
//! kind = "lru_mapped"
//! capacity = 8
//! ```

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use snafu::{ensure, ResultExt, Snafu};

use crate::pack_io::reading::retention::{
    LruMapped, OpenPerCall, RetentionPolicy, SingleMapped,
};

/// Default for [`PackConfig::max_shard_size`]: 1 GiB.
pub const DEFAULT_MAX_SHARD_SIZE: u64 = 1 << 30;

/// Default number of maps kept by [`RetentionKind::LruMapped`].
pub const DEFAULT_LRU_CAPACITY: usize = 4;

/// Errors raised from setting or loading configuration values.
#[derive(Snafu, Debug)]
#[snafu(context(suffix(Ctx)), visibility(pub(crate)))]
pub enum ConfigError {
    /// The shard size bound must be positive.
    #[snafu(display("Maximum shard size must be greater than zero!"))]
    ZeroMaxShardSize,
    /// An LRU retention policy needs room for at least one map.
    #[snafu(display("LRU retention capacity must be greater than zero!"))]
    ZeroLruCapacity,
    /// The config file could not be read.
    #[snafu(display("Failed to read config file at {}: {source}", path.display()))]
    ReadConfig {
        /// The IO error.
        source: std::io::Error,
        /// The config file.
        path: PathBuf,
    },
    /// The config file is not valid TOML or has values of the wrong type.
    #[snafu(display("Failed to parse config file at {}. {source}", path.display()))]
    TomlDeserialize {
        /// The toml deserialize error.
        source: toml::de::Error,
        /// The config file.
        path: PathBuf,
    },
}

/// Shorthand type for [`Result<T, ConfigError>`]
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which [`RetentionPolicy`] a [`PackReader`](crate::PackReader) uses for shard files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetentionKind {
    /// Open a new file handle for every load.
    OpenPerCall,
    /// Keep one shard memory mapped, replacing it when another shard is requested.
    #[default]
    SingleMapped,
    /// Keep up to `capacity` shards memory mapped, evicting the least recently used.
    LruMapped {
        /// Number of maps kept.
        #[serde(default = "default_lru_capacity")]
        capacity: usize,
    },
}

fn default_lru_capacity() -> usize {
    DEFAULT_LRU_CAPACITY
}

impl RetentionKind {
    /// Checks the values carried by the variant.
    ///
    /// # Errors
    /// [`ConfigError::ZeroLruCapacity`] for an LRU policy without room.
    pub fn validate(self) -> ConfigResult<Self> {
        if let RetentionKind::LruMapped { capacity } = self {
            ensure!(capacity > 0, ZeroLruCapacityCtx);
        }

        Ok(self)
    }

    /// Creates the policy described by this value.
    pub fn build(self) -> Box<dyn RetentionPolicy> {
        match self {
            RetentionKind::OpenPerCall => Box::new(OpenPerCall),
            RetentionKind::SingleMapped => Box::new(SingleMapped::new()),
            RetentionKind::LruMapped { capacity } => Box::new(LruMapped::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }
}

/// Configuration of the planner and the reader.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawPackConfig")]
pub struct PackConfig {
    max_shard_size: u64,
    retention: RetentionKind,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            max_shard_size: DEFAULT_MAX_SHARD_SIZE,
            retention: RetentionKind::default(),
        }
    }
}

impl PackConfig {
    /// The default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Soft upper bound in bytes for the size of a shard.
    ///
    /// A single group larger than this still gets a shard of its own.
    pub fn max_shard_size(&self) -> u64 {
        self.max_shard_size
    }

    /// The reader's file retention policy.
    pub fn retention(&self) -> RetentionKind {
        self.retention
    }

    /// Sets [`max_shard_size`](Self::max_shard_size).
    ///
    /// # Errors
    /// [`ConfigError::ZeroMaxShardSize`] if `bytes` is zero.
    pub fn set_max_shard_size(&mut self, bytes: u64) -> ConfigResult<&mut Self> {
        ensure!(bytes > 0, ZeroMaxShardSizeCtx);
        self.max_shard_size = bytes;

        Ok(self)
    }

    /// Sets [`retention`](Self::retention).
    ///
    /// # Errors
    /// See [`RetentionKind::validate`].
    pub fn set_retention(&mut self, retention: RetentionKind) -> ConfigResult<&mut Self> {
        self.retention = retention.validate()?;

        Ok(self)
    }

    /// Parses a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    /// Fails if the text is not valid TOML or holds invalid values. `origin` is only used in the
    /// error message.
    pub fn from_toml_str(text: &str, origin: impl AsRef<Path>) -> ConfigResult<Self> {
        toml::from_str(text).with_context(|_| TomlDeserializeCtx {
            path: origin.as_ref().to_path_buf(),
        })
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    /// See [`ConfigError`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).context(ReadConfigCtx { path })?;

        Self::from_toml_str(&text, path)
    }
}

/// Serialized shape of [`PackConfig`], validated on conversion.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawPackConfig {
    max_shard_size: u64,
    retention: RetentionKind,
}

impl Default for RawPackConfig {
    fn default() -> Self {
        let defaults = PackConfig::default();
        Self {
            max_shard_size: defaults.max_shard_size,
            retention: defaults.retention,
        }
    }
}

impl TryFrom<RawPackConfig> for PackConfig {
    type Error = ConfigError;

    fn try_from(raw: RawPackConfig) -> Result<Self, Self::Error> {
        let mut config = PackConfig::default();
        config
            .set_max_shard_size(raw.max_shard_size)?
            .set_retention(raw.retention)?;

        Ok(config)
    }
}
