//! Contains [`init`], which sets up logging for the binary.
//!
//! Which outputs exist depends on cargo features:
//! - `log-to-console`: logs to stderr.
//! - `log-to-file`: logs to a new file under `logs/`. Older log files are gzip compressed first.
//! - `trace`: writes a Chrome trace under `tracing/`.
//!
//! Console and file logs are filtered with the directives in [`LOG_ENV_VAR`], `info` by default.

use cfg_if::cfg_if;
use tracing_panic::panic_hook;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{registry, Layer, Registry};

cfg_if! {
    if #[cfg(feature = "log-to-file")] {
        use std::fs::{File, OpenOptions};
        use std::path::Path;
        use std::sync::Mutex;
        use std::time::SystemTime;
        use tracing::{Event, Subscriber};
        use tracing_log::NormalizeEvent;
        use tracing_subscriber::fmt::format::Writer;
        use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
        use tracing_subscriber::registry::LookupSpan;
    }
}

cfg_if! {
    if #[cfg(any(feature = "log-to-console", feature = "log-to-file"))] {
        use tracing::metadata::LevelFilter;
        use tracing_subscriber::EnvFilter;
    }
}

/// Environment variable holding the log filter directives.
pub const LOG_ENV_VAR: &str = "BALE_LOG";

/// A layer on top of the [`Registry`], type erased so every output can be collected in one list.
type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps trace outputs alive. The Chrome trace is flushed when this is dropped.
#[must_use = "dropping the guard stops trace output"]
#[derive(Default)]
pub struct TraceGuard {
    /// Flushes the Chrome trace file on drop.
    #[cfg(feature = "trace")]
    _chrome: Option<tracing_chrome::FlushGuard>,
}

/// Installs the global subscriber with every enabled output and routes panics through it.
///
/// Outputs that fail to initialize are reported on stderr and skipped.
pub fn init() -> TraceGuard {
    #[cfg_attr(
        not(any(feature = "log-to-console", feature = "log-to-file", feature = "trace")),
        allow(unused_mut)
    )]
    let mut layers: Vec<BoxedLayer> = Vec::new();
    #[cfg_attr(not(feature = "trace"), allow(unused_mut))]
    let mut guard = TraceGuard::default();

    cfg_if! {
        if #[cfg(feature = "log-to-console")] {
            layers.push(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(env_filter())
                    .boxed(),
            );
        }
    }

    cfg_if! {
        if #[cfg(feature = "log-to-file")] {
            match log_file() {
                Ok(file) => layers.push(
                    tracing_subscriber::fmt::layer()
                        .event_format(FileFormatter)
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_filter(env_filter())
                        .boxed(),
                ),
                Err(error) => eprintln!("Failed to open log file: {error}"),
            }
        }
    }

    cfg_if! {
        if #[cfg(feature = "trace")] {
            match chrome_layer() {
                Ok((layer, flush_guard)) => {
                    layers.push(layer);
                    guard._chrome = Some(flush_guard);
                }
                Err(error) => eprintln!("Failed to initialize tracing directory: {error}"),
            }
        }
    }

    registry().with(layers).init();

    // Feed panics through tracing
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        panic_hook(info);
        previous_hook(info);
    }));

    guard
}

/// Filter for console and file logs.
#[cfg(any(feature = "log-to-console", feature = "log-to-file"))]
fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy()
}

/// Creates the Chrome trace layer, writing to a timestamped file under `tracing/`.
#[cfg(feature = "trace")]
fn chrome_layer() -> std::io::Result<(BoxedLayer, tracing_chrome::FlushGuard)> {
    std::fs::create_dir_all("tracing")?;

    let trace_path = chrono::Utc::now()
        .format("tracing/bale_trace_%Y-%m-%d_%H-%M-%S-%f.json")
        .to_string();
    let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
        .file(trace_path)
        .include_args(true)
        .name_fn(Box::new(|event_or_span| match event_or_span {
            tracing_chrome::EventOrSpan::Event(event) => event.metadata().name().into(),
            tracing_chrome::EventOrSpan::Span(span) => span.metadata().name().into(),
        }))
        .build();

    Ok((layer.boxed(), guard))
}

/// Compresses old logs, then creates a new log file and returns it.
#[cfg(feature = "log-to-file")]
fn log_file() -> std::io::Result<File> {
    let log_dir = Path::new("logs");
    std::fs::create_dir_all(log_dir)?;
    compress_old_logs(log_dir)?;

    let log_path = chrono::Utc::now()
        .format("logs/bale_log_%Y-%m-%d_%H-%M-%S-%f.log")
        .to_string();

    OpenOptions::new().create(true).append(true).open(log_path)
}

/// Replaces every `*.log` file in `log_dir` with a gzip compressed `*.log.gz`.
#[cfg(feature = "log-to-file")]
fn compress_old_logs(log_dir: &Path) -> std::io::Result<()> {
    for log in std::fs::read_dir(log_dir)? {
        let log = log?;
        let path = log.path();

        if !log.metadata()?.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !file_name.ends_with(".log") {
            continue;
        }

        let compressed_path = path.with_file_name(format!("{file_name}.gz"));
        let mut reader = std::io::BufReader::new(File::open(&path)?);
        let mut encoder = flate2::write::GzEncoder::new(
            File::create(&compressed_path)?,
            flate2::Compression::default(),
        );

        std::io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?;
        std::fs::remove_file(&path)?;
    }

    Ok(())
}

/// Formatting for logging to files
///
/// Will format events in the following format:
/// \[\<timestamp>] \[\<level>] \[\<target>]: \<spans>: \<message>
///
/// Example:
/// \[2024-05-05T05:15:02.623Z] \[DEBUG] \[bale_pack::planning]: plan{max_shard_size=1024}: Planned shard 0: 2 groups, 5 resources, 812 bytes
#[cfg(feature = "log-to-file")]
struct FileFormatter;

#[cfg(feature = "log-to-file")]
impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        // Events forwarded from `log` carry their real metadata in fields
        let metadata = event.normalized_metadata();
        let metadata = metadata.as_ref().unwrap_or(event.metadata());

        write!(
            &mut writer,
            "[{}] [{}] [{}]: ",
            humantime::format_rfc3339_millis(SystemTime::now()),
            metadata.level(),
            metadata.target()
        )?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
