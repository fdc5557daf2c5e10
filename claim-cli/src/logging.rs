//! Tracing setup for the command line tool.
//!
//! Records go to stderr so that reports and JSON on stdout stay clean.
//! A log file can be attached after startup, and the level can be changed
//! once the config file has been read.

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use anyhow::{Result, anyhow, bail};
use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::{FmtContext, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, reload};

const DEFAULT_FILTER: &str = "warn,claim_core=info,claim_db_sqlite=info,claim_cli=info";

/// One line per event: local timestamp, level, source location, fields.
struct ClaimLogFormat;

impl<S, N> FormatEvent<S, N> for ClaimLogFormat
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
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");

        if ansi {
            let colour = match *meta.level() {
                Level::ERROR => "1;31",
                Level::WARN => "1;33",
                Level::INFO => "1;32",
                Level::DEBUG => "1;34",
                Level::TRACE => "1;35",
            };
            write!(writer, "\x1b[2m{timestamp}\x1b[0m \x1b[{colour}m{:>5}\x1b[0m ", meta.level())?;
        } else {
            write!(writer, "{timestamp} {:>5} ", meta.level())?;
        }

        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            let file = file.rsplit_once("src/").map_or(file, |(_, rest)| rest);
            if ansi {
                write!(writer, "\x1b[36m{file}:{line}\x1b[0m ")?;
            } else {
                write!(writer, "{file}:{line} ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Log file that can be attached after initialization. Writes are dropped
/// while it is empty.
#[derive(Clone, Default)]
struct LogFileSlot(Arc<Mutex<Option<File>>>);

impl LogFileSlot {
    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct LogFileWriter<'a>(MutexGuard<'a, Option<File>>);

impl Write for LogFileWriter<'_> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        match self.0.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogFileSlot {
    type Writer = LogFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter(self.lock())
    }
}

type SetLevelFn = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;

static SET_LOG_LEVEL: OnceLock<SetLevelFn> = OnceLock::new();
static LOG_FILE: OnceLock<LogFileSlot> = OnceLock::new();

/// Parses a level or directive into a filter.
///
/// A bare level such as `debug` applies to this tool's crates only, so
/// dependency chatter stays at `warn`. Anything else is passed to
/// [`EnvFilter`] as a full directive.
pub fn parse_filter(level: &str) -> Result<EnvFilter> {
    let level = level.trim();
    let directive = match level.to_ascii_lowercase().as_str() {
        bare @ ("error" | "warn" | "info" | "debug" | "trace") => format!(
            "warn,claim_core={bare},claim_db_sqlite={bare},claim_cli={bare}"
        ),
        _ => level.to_string(),
    };
    EnvFilter::try_new(&directive).map_err(|e| anyhow!("invalid log level '{level}': {e}"))
}

/// Installs the global subscriber. Later calls are ignored.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (level_filter, level_handle) = reload::Layer::new(filter);

    let file_slot = LOG_FILE.get_or_init(LogFileSlot::default).clone();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .event_format(ClaimLogFormat)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(ClaimLogFormat)
        .with_ansi(false)
        .with_writer(file_slot);

    if tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
    {
        let _ = SET_LOG_LEVEL.set(Box::new(move |level: &str| {
            level_handle
                .reload(parse_filter(level)?)
                .map_err(|e| anyhow!("filter reload failed: {e}"))
        }));
    }
}

/// Replaces the active filter. Ignored when `RUST_LOG` is set.
pub fn set_log_level(level: &str) -> Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        return Ok(());
    }
    match SET_LOG_LEVEL.get() {
        Some(set) => set(level),
        None => bail!("logging not yet initialized"),
    }
}

/// Appends log records to `path` as well as stderr. The parent directory
/// must already exist.
pub fn enable_file_logging(path: &Path) -> Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow!("cannot open log file '{}': {e}", path.display()))?;

    match LOG_FILE.get() {
        Some(slot) => {
            *slot.lock() = Some(file);
            Ok(())
        }
        None => bail!("logging not yet initialized"),
    }
}
