use std::env;

use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

pub const SVC_LABEL_ENVVAR: &str = "KAS_SVC_LABEL";

#[derive(Debug)]
pub struct LoggerConfig {
    whoami: String,
}

impl LoggerConfig {
    /// Creates a new instance with whoami set.
    pub fn new(whoami: String) -> Self {
        Self { whoami }
    }

    pub fn with_base_name(s: &str) -> Self {
        Self::new(get_whoami_string(s))
    }

    pub fn whoami(&self) -> &str {
        &self.whoami
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(kas-wallet)")
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// Filtering follows `RUST_LOG`. Panics if a global subscriber is already set, see [`try_init`].
pub fn init(config: LoggerConfig) {
    subscriber().init();
    info!(whoami = %config.whoami, "logging started");
}

/// Like [`init`], but returns `false` instead of panicking if logging was already initialized.
pub fn try_init(config: LoggerConfig) -> bool {
    let started = subscriber().try_init().is_ok();
    if started {
        info!(whoami = %config.whoami, "logging started");
    }
    started
}

fn subscriber() -> impl SubscriberInitExt {
    let filt = tracing_subscriber::EnvFilter::from_default_env();

    // Stdout logging.
    let stdout_sub = tracing_subscriber::fmt::layer().compact().with_filter(filt);

    tracing_subscriber::registry().with(stdout_sub)
}

/// Gets the service label from the standard envvar, which should be included
/// in the whoami string.
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Computes a standard whoami string.
pub fn get_whoami_string(base: &str) -> String {
    match get_service_label_from_env() {
        Some(label) => format!("{base}%{label}"),
        None => base.to_string(),
    }
}
