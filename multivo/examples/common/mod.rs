// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! Common utilities shared across examples.

/// Initializes the tracing subscriber for examples.
///
/// Logs go to stderr so that stdout stays usable as a Y4M sink. The INFO
/// level is the default; `RUST_LOG` overrides it.
pub fn setup_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}
