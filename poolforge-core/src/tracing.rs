//! Provide tracing, tailored to this program.
//!
//! Host binaries should call [`init_journald_or_stdout`] once at startup to
//! install a tracing subscriber. The rest of the crate uses the `trace!()`,
//! `debug!()`, `info!()`, `warn!()`, and `error!()` macros via
//! `crate::tracing::prelude::*`.

use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

/// Check whether stderr was handed to us by the systemd journal.
///
/// systemd sets JOURNAL_STREAM to "device:inode" of the stream it connected;
/// a non-empty well-formed value is taken as journal ownership. See
/// systemd.exec(5).
#[cfg(target_os = "linux")]
fn stderr_is_journal_stream() -> bool {
    match std::env::var("JOURNAL_STREAM") {
        Ok(val) => {
            let mut parts = val.split(':');
            matches!(
                (
                    parts.next().map(|s| s.parse::<u64>()),
                    parts.next().map(|s| s.parse::<u64>()),
                    parts.next(),
                ),
                (Some(Ok(_)), Some(Ok(_)), None)
            )
        }
        Err(_) => false,
    }
}

/// Initialize logging.
///
/// If running under systemd, use journald; otherwise fall back to stdout
/// filtered by RUST_LOG (default level INFO).
pub fn init_journald_or_stdout() {
    #[cfg(target_os = "linux")]
    {
        use tracing::error;

        if stderr_is_journal_stream() {
            if let Ok(layer) = tracing_journald::layer() {
                tracing_subscriber::registry().with(layer).init();
                return;
            } else {
                error!("Failed to initialize journald logging, using stdout.");
            }
        }
    }

    use_stdout();
}

fn use_stdout() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().compact().with_target(true))
        .init();
}
