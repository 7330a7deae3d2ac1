//! Logging setup
//!
//! The container emits `tracing` events under the [`TARGET`] target: service
//! registration and discovery at `DEBUG`, individual lookup steps at `TRACE`.
//! This module installs a `tracing-subscriber` for applications that do not
//! configure one themselves.
//!
//! # Features
//!
//! - `logging` - emit events (default)
//! - `logging-json` - JSON output
//! - `logging-pretty` - human-readable output
//!
//! Without either subscriber feature the `init*` functions do nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! use autowire_di::logging;
//!
//! // Only container events, with discovery steps
//! logging::builder().trace().container_only().pretty().init();
//! ```

use tracing::Level;

/// Target of every event emitted by the container
pub const TARGET: &str = "autowire_di";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON, one object per line
    #[default]
    Json,
    /// Multi-line, colored
    Pretty,
    /// Single line
    Compact,
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    from_env: bool,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            from_env: false,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Include every discovery step
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    /// Only show events from `target`
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show container events
    pub fn container_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Let `RUST_LOG` override the level and target filter when it is set
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Filter directive built from the level and target
    fn directive(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string(),
        }
    }

    /// Install the subscriber. Returns false if one was already installed.
    ///
    /// JSON falls back to the default text format unless `logging-json` is
    /// enabled.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> bool {
        use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

        let filter = if self.from_env {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
        } else {
            EnvFilter::new(self.directive())
        };

        let (with_file, with_line_number, with_thread_ids) =
            (self.with_file, self.with_line_number, self.with_thread_ids);
        macro_rules! configure {
            ($layer:expr) => {
                $layer
                    .with_file(with_file)
                    .with_line_number(with_line_number)
                    .with_thread_ids(with_thread_ids)
                    .with_target(true)
                    .boxed()
            };
        }

        let layer = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => configure!(fmt::layer().json()),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => configure!(fmt::layer()),
            LogFormat::Pretty => configure!(fmt::layer().pretty()),
            LogFormat::Compact => configure!(fmt::layer().compact()),
        };

        tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_ok()
    }

    /// Subscriber features disabled: nothing to install
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn try_init(self) -> bool {
        false
    }

    /// Install the subscriber, ignoring an already installed one
    pub fn init(self) {
        let _ = self.try_init();
    }
}

pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// JSON when `logging-json` is enabled, pretty otherwise
pub fn init() {
    if cfg!(feature = "logging-json") {
        init_json();
    } else {
        init_pretty();
    }
}

/// JSON output at `DEBUG`
///
/// ```json
/// {"timestamp":"...","level":"DEBUG","fields":{"message":"Registering service","service":"mailer","kind":"shared"},"target":"autowire_di"}
/// ```
pub fn init_json() {
    builder().json().debug().init();
}

/// Pretty output at `DEBUG`
pub fn init_pretty() {
    builder().pretty().debug().init();
}

/// Container events only, at `TRACE`
pub fn init_container_only() {
    builder().container_only().trace().init();
}
