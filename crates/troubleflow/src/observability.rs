//! # Observability
//!
//! One-call setup of a `tracing` subscriber for applications embedding the
//! engine. The library itself only emits events; nothing is printed until a
//! subscriber is installed.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Configuration for initializing the observability system.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// The maximum level captured for `troubleflow` events.
    pub level: Level,
    pub target: LogTarget,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::default(),
        }
    }
}

impl ObservabilityConfig {
    /// The filter directive applied on top of `RUST_LOG`.
    pub fn directive(&self) -> String {
        format!("troubleflow={}", self.level)
    }
}

/// Where log lines go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard output.
    #[default]
    Console,
    /// A file at the given path, truncated on init.
    File(String),
}

/// Installs the global subscriber.
///
/// Call once, early in `main`. Fails when the directive does not parse, the
/// log file cannot be created, or a global subscriber is already set.
pub fn init(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env().add_directive(config.directive().parse()?);
    let subscriber = tracing_subscriber::registry().with(filter);

    match config.target {
        LogTarget::Console => {
            let layer = fmt::layer().with_writer(std::io::stdout);
            subscriber.with(layer).try_init()?;
        }
        LogTarget::File(path) => {
            let file = std::fs::File::create(path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file));
            subscriber.with(layer).try_init()?;
        }
    };

    Ok(())
}
