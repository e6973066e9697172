//! The subcommands of the binary.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use bale_pack::config::ConfigError;
use bale_pack::pack_io::gathering::GatherError;
use bale_pack::pack_io::reading::ReadError;
use bale_pack::pack_io::writing::WriteError;
use bale_pack::resource::id::IdError;
use bale_pack::{
    gather_resources, pack_resources, GroupingStrategy, PackConfig, PackReader, ResourceId,
    ResourceStream, ResourceType,
};
use clap::{Args, Subcommand};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::info;

/// Errors raised from running a command.
#[derive(Snafu, Debug)]
#[snafu(context(suffix(Ctx)))]
pub enum CliError {
    /// The config file could not be loaded or holds invalid values.
    #[snafu(display("Invalid configuration: {source}"))]
    Config {
        /// The config error.
        source: ConfigError,
    },
    /// The resource directory could not be gathered.
    #[snafu(display("Failed to gather resources: {source}"))]
    Gather {
        /// The gather error.
        source: GatherError,
    },
    /// Planning or writing the pack failed.
    #[snafu(display("Failed to write pack: {source}"))]
    Write {
        /// The write error.
        source: WriteError,
    },
    /// Opening or reading the pack failed.
    #[snafu(display("Failed to read pack: {source}"))]
    Read {
        /// The read error.
        source: ReadError,
    },
    /// A resource id given on the command line is malformed.
    #[snafu(display("Invalid resource id: {source}"))]
    Id {
        /// The id error.
        source: IdError,
    },
    /// The requested resource is not in the pack.
    #[snafu(display("{id} is not in the pack!"))]
    NotFound {
        /// The requested id.
        id: ResourceId,
    },
    /// Writing command output failed.
    #[snafu(display("Failed to write output: {source}"))]
    Output {
        /// The IO error.
        source: io::Error,
    },
}

/// Shorthand type for [`Result<T, CliError>`]
pub type CliResult<T> = Result<T, CliError>;

/// Every subcommand.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Packs every file of a directory tree.
    Pack(PackArgs),
    /// Lists the resources of a pack.
    List(ListArgs),
    /// Writes the bytes of one resource to a file or stdout.
    Extract(ExtractArgs),
    /// Reads every resource of a pack, checking that no shard is truncated.
    Verify(VerifyArgs),
}

/// Arguments of `pack`.
#[derive(Args, Debug)]
pub struct PackArgs {
    /// Path to the folder containing the resources.
    #[arg(short, long)]
    resources: PathBuf,
    /// Path to the output pack directory.
    #[arg(short, long)]
    out: PathBuf,
    /// Domain of every gathered resource id.
    #[arg(short, long)]
    domain: String,
    /// How resources are grouped: `category` or `individual`.
    #[arg(short, long, default_value_t = GroupingStrategy::Category)]
    grouping: GroupingStrategy,
    /// Soft bound on shard size in bytes. Overrides the config file.
    #[arg(short, long)]
    max_shard_size: Option<u64>,
    /// TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Arguments of `list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Path to the pack directory.
    pack: PathBuf,
}

/// Arguments of `extract`.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Path to the pack directory.
    pack: PathBuf,
    /// Id of the resource, as `domain:category/name`.
    id: String,
    /// Type the resource must have been packed as. Any type is accepted when omitted.
    #[arg(short = 't', long = "type")]
    resource_type: Option<ResourceType>,
    /// File to write to. Writes to stdout when omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// Arguments of `verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Path to the pack directory.
    pack: PathBuf,
    /// TOML config file, used for its retention policy.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Command {
    /// Runs the command, writing any listing to stdout.
    pub fn run(&self) -> CliResult<()> {
        match self {
            Command::Pack(args) => pack(args),
            Command::List(args) => list(args, &mut io::stdout().lock()),
            Command::Extract(args) => extract(args),
            Command::Verify(args) => verify(args),
        }
    }
}

/// Loads the config file at `path`, or the defaults.
fn load_config(path: Option<&Path>) -> CliResult<PackConfig> {
    match path {
        Some(path) => PackConfig::from_toml_file(path).context(ConfigCtx),
        None => Ok(PackConfig::default()),
    }
}

/// Gathers, plans and writes a pack.
fn pack(args: &PackArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(max_shard_size) = args.max_shard_size {
        config
            .set_max_shard_size(max_shard_size)
            .context(ConfigCtx)?;
    }

    let resources = gather_resources(&args.resources, &args.domain).context(GatherCtx)?;
    let index =
        pack_resources(resources, args.grouping, &config, &args.out).context(WriteCtx)?;

    info!(
        "Packed {} resources into {} shards at {}",
        index.len(),
        index.shard_count(),
        args.out.display()
    );

    Ok(())
}

/// Prints one line per resource: id, type, shard, offset and length.
fn list(args: &ListArgs, out: &mut impl Write) -> CliResult<()> {
    let reader = PackReader::open(&args.pack).context(ReadCtx)?;

    for (id, entry) in reader.index() {
        writeln!(
            out,
            "{id}\t{}\t{}\t{}\t{}",
            entry.resource_type, entry.shard, entry.offset, entry.length
        )
        .context(OutputCtx)?;
    }

    out.flush().context(OutputCtx)
}

/// Copies one resource out of a pack.
///
/// The output file is only created once the resource has been found.
fn extract(args: &ExtractArgs) -> CliResult<()> {
    let mut stream = open_resource(args)?;

    match &args.out {
        Some(path) => {
            let mut file = BufWriter::new(File::create(path).context(OutputCtx)?);
            copy_out(&mut stream, &mut file)
        }
        None => copy_out(&mut stream, &mut io::stdout().lock()),
    }
}

/// Opens the pack and the stream of the requested resource.
fn open_resource(args: &ExtractArgs) -> CliResult<ResourceStream> {
    let reader = PackReader::open(&args.pack).context(ReadCtx)?;
    let id = ResourceId::parse(&args.id).context(IdCtx)?;

    let resource_type = match args.resource_type {
        Some(resource_type) => resource_type,
        None => reader
            .resource_type(&id)
            .with_context(|| NotFoundCtx { id: id.clone() })?,
    };

    reader.load_resource(&id, resource_type).context(ReadCtx)
}

/// Copies the rest of `stream` into `out`.
fn copy_out(stream: &mut ResourceStream, out: &mut impl Write) -> CliResult<()> {
    io::copy(stream, out).context(OutputCtx)?;

    out.flush().context(OutputCtx)
}

/// Checks every resource of a pack.
fn verify(args: &VerifyArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let reader = PackReader::open_with_config(&args.pack, &config).context(ReadCtx)?;

    reader.verify().context(ReadCtx)?;

    info!(
        "Verified {} resources in {} shards",
        reader.index().len(),
        reader.index().shard_count()
    );

    Ok(())
}
