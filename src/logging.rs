// Copyright (c) 2026 rezky_nightky

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Builds the file-backed subscriber. `RUST_LOG` overrides the `info` default.
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}

/// Installs the global subscriber when a log file is given. The alternate
/// screen owns stdout, so without a file nothing is installed.
pub fn init(path: Option<&Path>) -> io::Result<bool> {
    let Some(path) = path else {
        return Ok(false);
    };
    let file = File::create(path)?;
    Ok(build_subscriber(file).try_init().is_ok())
}
