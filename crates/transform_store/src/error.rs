use thiserror::Error;

/// Why a lookup did not resolve
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailability {
    #[error("frame '{0}' is unknown")]
    UnknownFrame(String),

    #[error("frames are not connected")]
    Disconnected,

    /// Connected, but some dynamic edge has no samples bracketing the time
    #[error("time is outside the stored history")]
    OutOfRange,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Sample dropped at insert time
    #[error("rejected transform '{parent}' -> '{child}': {reason}")]
    Rejected {
        parent: String,
        child: String,
        reason: String,
    },

    #[error("transform '{parent}' -> '{child}' unavailable at t={time}: {reason}")]
    Unavailable {
        parent: String,
        child: String,
        time: u64,
        reason: Unavailability,
    },
}

impl TransformError {
    pub(crate) fn rejected(parent: &str, child: &str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            parent: parent.to_string(),
            child: child.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(parent: &str, child: &str, time: u64, reason: Unavailability) -> Self {
        Self::Unavailable {
            parent: parent.to_string(),
            child: child.to_string(),
            time,
            reason,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
