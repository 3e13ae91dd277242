//! TransformSample - Transform Store input

use serde::{Deserialize, Serialize};

use crate::Pose;

/// One rigid-pose sample between two named frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSample {
    pub parent_frame: String,
    pub child_frame: String,
    /// Sample time (nanoseconds); ignored for static samples
    pub time: u64,
    /// Pose of `child_frame` in `parent_frame`
    pub pose: Pose,
    /// Static samples never expire and apply at every query time
    pub is_static: bool,
}

impl TransformSample {
    pub fn new(
        parent_frame: impl Into<String>,
        child_frame: impl Into<String>,
        time: u64,
        pose: Pose,
        is_static: bool,
    ) -> Self {
        Self {
            parent_frame: parent_frame.into(),
            child_frame: child_frame.into(),
            time,
            pose,
            is_static,
        }
    }

    pub fn dynamic(
        parent_frame: impl Into<String>,
        child_frame: impl Into<String>,
        time: u64,
        pose: Pose,
    ) -> Self {
        Self::new(parent_frame, child_frame, time, pose, false)
    }

    pub fn fixed(parent_frame: impl Into<String>, child_frame: impl Into<String>, pose: Pose) -> Self {
        Self::new(parent_frame, child_frame, 0, pose, true)
    }
}
