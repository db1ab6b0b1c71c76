//! Error types surfaced by the frame registry, scene state, tool controller
//! and file codecs.
//!
//! None of these are fatal: every variant describes either a rejected
//! operation (state untouched) or data that is unavailable for one frame.

use std::path::PathBuf;

use thiserror::Error;

use crate::scene::FrameId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("frame {id} is out of range (have {count} frames)")]
    InvalidFrame { id: FrameId, count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("a tool is already running")]
    AlreadyRunning,
    #[error("tool '{0}' declined to start")]
    Declined(String),
    #[error("no tool is running")]
    NotRunning,
    #[error("tool '{0}' cannot be cancelled")]
    NotCancelable(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {kind} file {path:?}: {reason}")]
    Malformed {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },
    #[error("malformed CSV in {path:?}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to read image header {path:?}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("malformed project manifest {path:?}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(
        kind: &'static str,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Malformed {
            kind,
            path: path.into(),
            reason: reason.into(),
        }
    }
}
