// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for dispatch operations.
//!
//! Every failure surfaces synchronously from [`crate::broadcast`] or
//! [`crate::interleave`]. Absent sink slots and padding rounds are normal
//! control flow and never produce an error.

use crate::clip::RenderError;

/// Convenience result type using [`Error`] as the error variant.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur while delivering frames to sinks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A Y4M header was requested for a format that has no Y4M colorspace tag.
    ///
    /// Raised before any frame is requested from the engine.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The number of clips passed to [`crate::interleave`] differs from the
    /// number of output slots.
    #[error("Arity mismatch: {clips} clip(s) but {outputs} output slot(s)")]
    ArityMismatch { clips: usize, outputs: usize },

    /// The engine failed to render a frame.
    ///
    /// `clip` is the position of the failing clip among the inputs (always 0
    /// for [`crate::broadcast`]) and `index` the frame number within that clip.
    #[error("Render failure at frame {index} of clip {clip}: {source}")]
    RenderFailure {
        clip: usize,
        index: usize,
        #[source]
        source: RenderError,
    },

    /// Writing or flushing a sink failed.
    #[error("Sink write failure on \"{sink}\": {source}")]
    SinkWriteFailure {
        sink: String,
        #[source]
        source: std::io::Error,
    },

    /// An explicit backlog of zero was requested.
    #[error("Invalid backlog: at least one frame must be allowed in flight")]
    InvalidBacklog,

    /// [`crate::interleave`] was called without any clip.
    #[error("No input clips")]
    NoInputs,

    /// [`crate::broadcast`] was called without any output slot.
    #[error("No output slots")]
    NoOutputs,

    /// The consumer is holding every frame the backlog allows and asked for
    /// another one.
    #[error("Backlog exhausted: all {backlog} frame(s) are held by the consumer")]
    BacklogExhausted { backlog: usize },

    /// A generic error for failures not covered by the variants above
    /// (e.g., a render worker that could not be spawned).
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Wraps an I/O error raised by the sink labelled `sink`.
    pub(crate) fn sink(sink: &str, source: std::io::Error) -> Self {
        Error::SinkWriteFailure {
            sink: sink.to_string(),
            source,
        }
    }
}
