use std::{cell::Cell, fmt, fs::File, io::Write, thread};

use env_logger::{Builder, Target, fmt::Formatter};
use log::Level;

use crate::Result;
use crate::options::{GaOptions, LogFormat};

thread_local! {
    static CONTEXT: Cell<Option<LogContext>> = const { Cell::new(None) };
}

/// Which part of the cluster a log line came from.
///
/// Rayon threads are shared by every node; the context is set around each
/// unit of work instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LogContext {
    pub node: usize,
    pub worker: Option<usize>,
}

impl LogContext {
    pub fn node(node: usize) -> Self {
        Self { node, worker: None }
    }

    pub fn worker(node: usize, worker: usize) -> Self {
        Self {
            node,
            worker: Some(worker),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.worker {
            Some(worker) => write!(f, "node={} worker={worker}", self.node),
            None => write!(f, "node={}", self.node),
        }
    }
}

/// Restores the previous context of the thread on drop.
#[must_use = "the context is cleared as soon as the guard is dropped"]
pub struct ContextGuard {
    previous: Option<LogContext>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT.with(|cell| cell.set(self.previous));
    }
}

/// Tags every log line of the current thread with `context` until the guard drops.
pub fn enter(context: LogContext) -> ContextGuard {
    let previous = CONTEXT.with(|cell| cell.replace(Some(context)));
    ContextGuard { previous }
}

pub fn current_context() -> Option<LogContext> {
    CONTEXT.with(Cell::get)
}

/// Cluster context when one is set, otherwise the thread name.
fn origin() -> String {
    match current_context() {
        Some(context) => context.to_string(),
        None => thread::current().name().unwrap_or("-").to_string(),
    }
}

pub fn init_logger(options: &GaOptions) -> Result<()> {
    let log_format = options.log_format;
    let log_timestamp = options.log_timestamp;

    let mut builder = Builder::new();
    builder
        .filter_level(options.log_level.to_filter())
        .write_style(env_logger::WriteStyle::Never)
        .format(move |buf: &mut Formatter, record| {
            if log_timestamp {
                write!(buf, "{} ", buf.timestamp_millis())?;
            }

            match log_format {
                LogFormat::Compact => {
                    writeln!(buf, "{} {}", level_tag(record.level()), record.args())
                }
                LogFormat::Pretty => writeln!(
                    buf,
                    "{} [{}] ({}) {}",
                    level_tag(record.level()),
                    record.target(),
                    origin(),
                    record.args()
                ),
            }
        });

    if let Some(log_path) = options.log_output_path() {
        let log_file = File::create(log_path).map_err(|e| {
            crate::Error::other(format!(
                "failed to create log output file {}: {e}",
                log_path.display()
            ))
        })?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| crate::Error::other(format!("logger init failed: {e}")))
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}
