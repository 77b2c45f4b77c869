//! Tracing configuration for the command-line binaries
//!
//! The library only emits events; the binaries install the subscriber.
//! Diagnostics go to stderr so stdout carries nothing but confirmations and
//! usage text.

use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors
    Console,
    /// Plain output for CI logs and pipes
    Compact,
}

impl TracingFormat {
    /// Colors only when the output is an interactive terminal
    #[must_use]
    pub fn for_terminal(is_terminal: bool) -> Self {
        if is_terminal {
            Self::Console
        } else {
            Self::Compact
        }
    }
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    pub format: TracingFormat,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Session ID for correlating the events of one run
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",  // content-type warnings and errors only
            1 => "info",  // -v: stage milestones
            2 => "debug", // -vv: internal state
            _ => "trace",
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// - Invalid filter directive
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<()> {
        let filter = match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives)?,
            None => EnvFilter::try_new(self.verbosity_to_filter())?,
        };

        let registry = Registry::default().with(filter);
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .compact();

        match self.format {
            TracingFormat::Console => registry.with(layer.with_ansi(true)).try_init()?,
            TracingFormat::Compact => registry.with(layer.with_ansi(false)).try_init()?,
        }

        if let Some(session_id) = &self.session_id {
            tracing::debug!(session_id = %session_id, "session started");
        }

        Ok(())
    }
}

/// Initialize tracing with CLI-friendly defaults; `RUST_LOG` wins over `-v` flags
///
/// # Errors
/// - See [`TracingConfig::init`]
pub fn init_cli_tracing(verbosity: u8) -> anyhow::Result<()> {
    let mut config = TracingConfig::new()
        .with_verbosity(verbosity)
        .with_format(TracingFormat::for_terminal(std::io::stderr().is_terminal()))
        .with_session_id(uuid::Uuid::new_v4().to_string());

    if let Ok(directives) = std::env::var("RUST_LOG") {
        if !directives.trim().is_empty() {
            config = config.with_env_filter(directives);
        }
    }

    config.init()
}
