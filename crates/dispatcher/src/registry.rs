//! Channel registry - channel id to ordered handler list.

use std::collections::{HashMap, HashSet};
use std::fmt;

use contracts::{ChannelId, ContractError, NormalizedRecord, RawMessage};
use tracing::{instrument, warn};
use transform_store::TransformStore;

/// Conversion handler bound to one channel.
///
/// Handlers may update the transform store (the `/tf` handlers do) and may
/// keep state of their own (warn-once flags, synchronizer slots).
pub type Handler =
    Box<dyn FnMut(&RawMessage, &mut TransformStore) -> Result<Vec<NormalizedRecord>, ContractError>>;

/// Per-run mutable state threaded through every dispatch call
#[derive(Debug)]
pub struct RunContext {
    pub transforms: TransformStore,
    warned: HashSet<ChannelId>,
    unhandled_messages: u64,
    dropped_messages: u64,
}

impl RunContext {
    pub fn new(transforms: TransformStore) -> Self {
        Self {
            transforms,
            warned: HashSet::new(),
            unhandled_messages: 0,
            dropped_messages: 0,
        }
    }

    /// Channels seen without handlers, sorted
    pub fn unhandled_channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<_> = self.warned.iter().cloned().collect();
        channels.sort();
        channels
    }

    /// Messages skipped because their channel had no handler
    pub fn unhandled_messages(&self) -> u64 {
        self.unhandled_messages
    }

    /// Messages a handler dropped as malformed
    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages
    }

    /// Returns `true` the first time a channel is reported.
    fn note_unhandled(&mut self, channel: &ChannelId) -> bool {
        self.unhandled_messages += 1;
        if self.warned.contains(channel) {
            return false;
        }
        self.warned.insert(channel.clone());
        true
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(TransformStore::default())
    }
}

/// Collects registrations; the registry topology is fixed once built.
#[derive(Default)]
pub struct ChannelRegistryBuilder {
    handlers: HashMap<ChannelId, Vec<Handler>>,
}

impl ChannelRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the channel's list
    pub fn register<F>(&mut self, channel: impl Into<ChannelId>, handler: F) -> &mut Self
    where
        F: FnMut(&RawMessage, &mut TransformStore) -> Result<Vec<NormalizedRecord>, ContractError>
            + 'static,
    {
        self.handlers
            .entry(channel.into())
            .or_default()
            .push(Box::new(handler));
        self
    }

    pub fn build(self) -> ChannelRegistry {
        ChannelRegistry {
            handlers: self.handlers,
        }
    }
}

pub struct ChannelRegistry {
    handlers: HashMap<ChannelId, Vec<Handler>>,
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for channel in self.channels() {
            map.entry(&channel, &self.handler_count(&channel));
        }
        map.finish()
    }
}

impl ChannelRegistry {
    pub fn builder() -> ChannelRegistryBuilder {
        ChannelRegistryBuilder::new()
    }

    /// Registered channels, sorted
    pub fn channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<_> = self.handlers.keys().cloned().collect();
        channels.sort();
        channels
    }

    pub fn handler_count(&self, channel: &str) -> usize {
        self.handlers.get(channel).map_or(0, Vec::len)
    }

    pub fn is_handled(&self, channel: &str) -> bool {
        self.handlers.contains_key(channel)
    }

    /// Run every handler of the message's channel, in registration order.
    ///
    /// Unknown channels yield nothing and are warned about once per run.
    /// Recoverable handler errors drop the message for that handler only.
    ///
    /// # Errors
    /// The first non-recoverable handler error; later handlers are not run.
    #[instrument(
        level = "trace",
        name = "registry_dispatch",
        skip(self, msg, ctx),
        fields(channel = %msg.channel_id, timestamp = msg.timestamp)
    )]
    pub fn dispatch(
        &mut self,
        msg: &RawMessage,
        ctx: &mut RunContext,
    ) -> Result<Vec<NormalizedRecord>, ContractError> {
        let Some(handlers) = self.handlers.get_mut(msg.channel_id.as_str()) else {
            if ctx.note_unhandled(&msg.channel_id) {
                warn!(
                    channel = %msg.channel_id,
                    type_tag = %msg.type_tag,
                    "No handler for channel, its messages will be skipped"
                );
                observability::record_unhandled_channel(&msg.channel_id);
            }
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for handler in handlers.iter_mut() {
            match handler(msg, &mut ctx.transforms) {
                Ok(records) => out.extend(records),
                Err(e) if e.is_recoverable() => {
                    ctx.dropped_messages += 1;
                    warn!(channel = %msg.channel_id, error = %e, "Message dropped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Odometry;
    use proptest::prelude::*;

    fn odom(label: &str, timestamp: u64) -> NormalizedRecord {
        Odometry {
            sensor_label: label.into(),
            timestamp,
            x: 0.0,
            y: 0.0,
            yaw: 0.0,
            vx: 0.0,
            vy: 0.0,
            omega: 0.0,
        }
        .into()
    }

    fn msg(channel: &str, t: u64) -> RawMessage {
        RawMessage::new(channel, t, "nav_msgs/msg/Odometry", Vec::<u8>::new())
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let mut builder = ChannelRegistry::builder();
        builder
            .register("/odom", |m: &RawMessage, _: &mut TransformStore| {
                Ok(vec![odom("first", m.timestamp)])
            })
            .register("/odom", |m: &RawMessage, _: &mut TransformStore| {
                Ok(vec![odom("second", m.timestamp), odom("third", m.timestamp)])
            });
        let mut registry = builder.build();
        let mut ctx = RunContext::default();

        let out = registry.dispatch(&msg("/odom", 5), &mut ctx).unwrap();
        let labels: Vec<_> = out.iter().map(|r| r.sensor_label().to_string()).collect();
        assert_eq!(labels, ["first", "second", "third"]);
        assert_eq!(registry.handler_count("/odom"), 2);
    }

    #[test]
    fn handler_state_persists_between_calls() {
        let mut calls = 0u64;
        let mut builder = ChannelRegistry::builder();
        builder.register("/odom", move |_: &RawMessage, _: &mut TransformStore| {
            calls += 1;
            Ok(vec![odom("counter", calls)])
        });
        let mut registry = builder.build();
        let mut ctx = RunContext::default();

        registry.dispatch(&msg("/odom", 0), &mut ctx).unwrap();
        let out = registry.dispatch(&msg("/odom", 0), &mut ctx).unwrap();
        assert_eq!(out[0].timestamp(), 2);
    }

    #[test]
    fn recoverable_error_skips_only_that_handler() {
        let mut builder = ChannelRegistry::builder();
        builder
            .register("/odom", |_: &RawMessage, _: &mut TransformStore| {
                Err(ContractError::payload_decode("/odom", "truncated"))
            })
            .register("/odom", |m: &RawMessage, _: &mut TransformStore| {
                Ok(vec![odom("ok", m.timestamp)])
            });
        let mut registry = builder.build();
        let mut ctx = RunContext::default();

        let out = registry.dispatch(&msg("/odom", 1), &mut ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(ctx.dropped_messages(), 1);
    }

    #[test]
    fn fatal_error_propagates() {
        let mut builder = ChannelRegistry::builder();
        builder.register("/cloud", |_: &RawMessage, _: &mut TransformStore| {
            Err(ContractError::normalize("lidar", "buffer too short"))
        });
        let mut registry = builder.build();
        let mut ctx = RunContext::default();

        let err = registry.dispatch(&msg("/cloud", 1), &mut ctx).unwrap_err();
        assert!(matches!(err, ContractError::Normalize { .. }));
    }

    proptest! {
        /// Each distinct unknown channel is reported exactly once.
        #[test]
        fn unknown_channels_warn_once(picks in proptest::collection::vec(0usize..5, 0..200)) {
            let mut registry = ChannelRegistry::builder().build();
            let mut ctx = RunContext::default();
            let mut first_reports = 0usize;
            let names = ["/a", "/b", "/c", "/d", "/e"];

            for i in &picks {
                let before = ctx.unhandled_channels().len();
                let out = registry.dispatch(&msg(names[*i], 0), &mut ctx).unwrap();
                prop_assert!(out.is_empty());
                if ctx.unhandled_channels().len() > before {
                    first_reports += 1;
                }
            }

            let distinct: HashSet<_> = picks.iter().collect();
            prop_assert_eq!(first_reports, distinct.len());
            prop_assert_eq!(ctx.unhandled_messages(), picks.len() as u64);
        }
    }
}
