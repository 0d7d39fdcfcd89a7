// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! Dispatch options.
//!
//! [`Options`] deserializes from JSON with every field optional, so a caller
//! can keep its output configuration next to the rest of its settings.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Frames in flight allowed per distinct destination when no backlog is given.
pub const DEFAULT_BACKLOG_PER_DESTINATION: usize = 3;

/// Settings shared by [`crate::broadcast_with`] and [`crate::interleave_with`].
///
/// # Examples
///
/// ```
/// use multivo::Options;
///
/// let options: Options = serde_json::from_str(r#"{"backlog": 8}"#).unwrap();
/// assert!(options.y4m);
/// assert_eq!(options.backlog, Some(8));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Options {
    /// Prefix every destination with a Y4M header and every frame with a
    /// `FRAME` marker.
    pub y4m: bool,
    /// Maximum number of frames in flight. Defaults to three per distinct
    /// destination.
    pub backlog: Option<usize>,
    /// Number of render worker threads. Defaults to the available
    /// parallelism, capped by the backlog.
    pub threads: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            y4m: true,
            backlog: None,
            threads: None,
        }
    }
}

impl Options {
    /// Resolves the backlog for `destinations` distinct sinks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBacklog`] for an explicit backlog of zero.
    pub fn backlog_for(&self, destinations: usize) -> Result<usize> {
        match self.backlog {
            Some(0) => Err(Error::InvalidBacklog),
            Some(backlog) => Ok(backlog),
            None => Ok((DEFAULT_BACKLOG_PER_DESTINATION * destinations).max(1)),
        }
    }

    /// Resolves the worker count for a given backlog. Always in `1..=backlog`.
    pub fn threads_for(&self, backlog: usize) -> usize {
        let threads = self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        threads.clamp(1, backlog.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backlog_scales_with_destinations() {
        let options = Options::default();
        assert_eq!(options.backlog_for(2).unwrap(), 6);
        assert_eq!(options.backlog_for(0).unwrap(), 1);
    }

    #[test]
    fn explicit_backlog_wins() {
        let options = Options {
            backlog: Some(4),
            ..Default::default()
        };
        assert_eq!(options.backlog_for(10).unwrap(), 4);

        let options = Options {
            backlog: Some(0),
            ..Default::default()
        };
        assert!(matches!(options.backlog_for(1), Err(Error::InvalidBacklog)));
    }

    #[test]
    fn threads_never_exceed_backlog() {
        let options = Options {
            threads: Some(16),
            ..Default::default()
        };
        assert_eq!(options.threads_for(3), 3);

        let options = Options {
            threads: Some(0),
            ..Default::default()
        };
        assert_eq!(options.threads_for(3), 1);
        assert!((1..=5).contains(&Options::default().threads_for(5)));
    }

    #[test]
    fn deserializes_partial_json() {
        let options: Options = serde_json::from_str(r#"{"y4m": false, "threads": 2}"#).unwrap();
        assert_eq!(
            options,
            Options {
                y4m: false,
                backlog: None,
                threads: Some(2),
            }
        );
        let options: Options = serde_json::from_str("{}").unwrap();
        assert_eq!(options, Options::default());
    }
}
