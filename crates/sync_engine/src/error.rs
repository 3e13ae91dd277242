use thiserror::Error;

/// Synchronizer construction errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("synchronizer '{label}' needs at least one channel")]
    NoChannels { label: String },

    #[error("synchronizer '{label}' lists channel '{channel}' twice")]
    DuplicateChannel { label: String, channel: String },

    #[error("synchronizer '{label}': anchor slot {index} out of range ({channels} channels)")]
    AnchorOutOfRange {
        label: String,
        index: usize,
        channels: usize,
    },

    #[error("synchronizer '{label}' is missing its {what}")]
    Missing { label: String, what: &'static str },
}
