//! SourceLog trait - source log boundary
//!
//! A finite, ordered iterator of raw messages plus channel metadata.

use crate::{ChannelInfo, ContractError, RawMessage};

/// Sequentially stored multi-channel log.
///
/// Iteration yields messages in stored order. An `Err` item means the storage
/// itself is corrupt; the Driver aborts on it.
pub trait SourceLog: Iterator<Item = Result<RawMessage, ContractError>> {
    /// Channels declared by the log
    fn channels(&self) -> &[ChannelInfo];

    /// Total message count, used for progress reporting
    fn message_count(&self) -> u64;

    /// Declared type of a channel, if known
    fn type_of(&self, channel: &str) -> Option<&str> {
        self.channels()
            .iter()
            .find(|c| c.id.as_str() == channel)
            .map(|c| c.type_tag.as_str())
    }
}
