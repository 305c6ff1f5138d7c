use std::io;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install a global subscriber writing to an hourly rolling file in `log_dir`
///
/// With `stdout` set, events are also printed to the terminal. Keep the
/// returned guard alive for the lifetime of the process or buffered lines
/// are lost.
pub fn init(app_name: &str, log_dir: &str, default_level: Level, stdout: bool) -> WorkerGuard {
    let _ = std::fs::create_dir_all(log_dir);

    // Writes happen on the appender's background thread
    let file_appender = tracing_appender::rolling::hourly(log_dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG wins over default_level, e.g. RUST_LOG=cg_cache=debug to see evictions
    let env_filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

    // Thread ids tell concurrent waiters and cache leaders apart
    let file_layer = fmt::layer().with_writer(non_blocking).with_target(true).with_thread_ids(true).with_ansi(false).compact();

    let stdout_layer = stdout.then(|| fmt::layer().with_writer(io::stdout).with_target(true).with_ansi(true).compact());

    tracing_subscriber::registry().with(env_filter).with(file_layer).with(stdout_layer).init();

    guard
}
