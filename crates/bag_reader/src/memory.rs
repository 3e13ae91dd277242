//! In-memory source log

use std::collections::HashSet;

use contracts::{ChannelInfo, ContractError, RawMessage, SourceLog};

/// Source log over a message vector; channels are declared in first-seen order
#[derive(Debug, Clone, Default)]
pub struct MemoryBag {
    channels: Vec<ChannelInfo>,
    messages: std::collections::VecDeque<RawMessage>,
    count: u64,
}

impl MemoryBag {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        let mut seen = HashSet::new();
        let channels = messages
            .iter()
            .filter(|m| seen.insert(m.channel_id.clone()))
            .map(|m| ChannelInfo::new(m.channel_id.clone(), m.type_tag.clone()))
            .collect();
        Self {
            channels,
            count: messages.len() as u64,
            messages: messages.into(),
        }
    }

    /// Declare an extra channel (e.g. one with no messages)
    pub fn with_channel(mut self, channel: ChannelInfo) -> Self {
        if !self.channels.iter().any(|c| c.id == channel.id) {
            self.channels.push(channel);
        }
        self
    }
}

impl FromIterator<RawMessage> for MemoryBag {
    fn from_iter<I: IntoIterator<Item = RawMessage>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Iterator for MemoryBag {
    type Item = Result<RawMessage, ContractError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.messages.pop_front().map(Ok)
    }
}

impl SourceLog for MemoryBag {
    fn channels(&self) -> &[ChannelInfo] {
        &self.channels
    }

    fn message_count(&self) -> u64 {
        self.count
    }
}
