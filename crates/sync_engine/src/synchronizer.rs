//! Slot-array synchronizer.
//!
//! Slot `i` caches at most one message of `channels[i]`. When every slot is
//! filled the anchor slot's frame is resolved against the root frame; on
//! success the group fires and all slots are cleared together.

use std::fmt;

use contracts::{
    ChannelId, ContractError, MotionIncrement, NormalizedRecord, RawMessage,
    UnresolvedAnchorPolicy,
};
use nalgebra::Isometry3;
use tracing::{debug, instrument, trace, warn};
use transform_store::{from_isometry, TransformStore};

use crate::SyncError;

/// Frame and stamp used for the anchor pose lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub frame_id: String,
    pub stamp: u64,
}

impl Anchor {
    pub fn new(frame_id: impl Into<String>, stamp: u64) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp,
        }
    }
}

/// Reads the anchor out of the anchor slot's message; `None` if unreadable
pub type AnchorFn = Box<dyn Fn(&RawMessage) -> Option<Anchor>>;

/// Combines a complete slot tuple, in channel order, into records
pub type FusionFn = Box<dyn FnMut(&[RawMessage]) -> Result<Vec<NormalizedRecord>, ContractError>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Messages stored into an empty slot
    pub accepted: u64,
    /// Messages dropped because their slot was occupied
    pub dropped_occupied: u64,
    pub fired: u64,
    /// Complete groups whose anchor transform did not resolve
    pub skipped_unresolved: u64,
    /// Complete groups discarded because the anchor could not be read
    pub discarded_unreadable: u64,
}

pub struct Synchronizer {
    label: String,
    root_frame: String,
    channels: Vec<ChannelId>,
    slots: Vec<Option<RawMessage>>,
    anchor_index: usize,
    anchor_of: AnchorFn,
    fusion: FusionFn,
    last_pose: Option<Isometry3<f64>>,
    policy: UnresolvedAnchorPolicy,
    stats: SyncStats,
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("label", &self.label)
            .field("root_frame", &self.root_frame)
            .field("channels", &self.channels)
            .field("filled", &self.filled())
            .field("anchor_index", &self.anchor_index)
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    pub fn builder(label: impl Into<String>) -> SynchronizerBuilder {
        SynchronizerBuilder::new(label)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn slot(&self, index: usize) -> Option<&RawMessage> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Number of occupied slots
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Slot index of a channel
    pub fn index_of(&self, channel: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.as_str() == channel)
    }

    /// Store `msg` in slot `index` if that slot is empty, then check and fire.
    ///
    /// # Errors
    /// Only a fusion failure is returned; it is fatal for the pass.
    ///
    /// # Panics
    /// Panics if `index` is not a slot of this synchronizer.
    pub fn offer(
        &mut self,
        index: usize,
        msg: &RawMessage,
        transforms: &TransformStore,
    ) -> Result<Vec<NormalizedRecord>, ContractError> {
        let slot = &mut self.slots[index];
        if slot.is_none() {
            *slot = Some(msg.clone());
            self.stats.accepted += 1;
        } else {
            self.stats.dropped_occupied += 1;
            trace!(
                sensor = %self.label,
                channel = %self.channels[index],
                "slot occupied, message dropped"
            );
        }
        self.check_and_fire(transforms)
    }

    /// Fire if every slot is filled and the anchor pose resolves.
    ///
    /// Returns the `MotionIncrement` followed by the fused records, or nothing.
    #[instrument(
        level = "trace",
        name = "sync_check_and_fire",
        skip(self, transforms),
        fields(sensor = %self.label, filled = self.filled())
    )]
    pub fn check_and_fire(
        &mut self,
        transforms: &TransformStore,
    ) -> Result<Vec<NormalizedRecord>, ContractError> {
        if !self.is_complete() {
            return Ok(Vec::new());
        }

        let anchor = self.slots[self.anchor_index]
            .as_ref()
            .and_then(|msg| (self.anchor_of)(msg));
        let Some(anchor) = anchor else {
            warn!(sensor = %self.label, "anchor message unreadable, discarding group");
            self.stats.discarded_unreadable += 1;
            self.clear();
            return Ok(Vec::new());
        };

        let current = match transforms.lookup_isometry(&self.root_frame, &anchor.frame_id, anchor.stamp) {
            Ok(pose) => pose,
            Err(e) => {
                self.report_unresolved(&anchor, &e);
                return Ok(Vec::new());
            }
        };

        let increment = match &self.last_pose {
            Some(last) => last.inverse() * current,
            None => Isometry3::identity(),
        };
        self.last_pose = Some(current);

        let group: Vec<RawMessage> = self.slots.iter_mut().filter_map(Option::take).collect();
        self.stats.fired += 1;
        observability::record_sync_fire(&self.label);

        let fused = (self.fusion)(&group)?;
        debug!(
            sensor = %self.label,
            stamp = anchor.stamp,
            fused = fused.len(),
            "synchronizer fired"
        );

        let mut out = Vec::with_capacity(fused.len() + 1);
        out.push(NormalizedRecord::MotionIncrement(MotionIncrement {
            sensor_label: self.label.clone(),
            timestamp: anchor.stamp,
            increment: from_isometry(&increment),
        }));
        out.extend(fused);
        Ok(out)
    }

    /// Empty every slot without firing
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    fn report_unresolved(&mut self, anchor: &Anchor, err: &transform_store::TransformError) {
        match self.policy {
            UnresolvedAnchorPolicy::Silent => {}
            UnresolvedAnchorPolicy::Count => {
                self.stats.skipped_unresolved += 1;
                observability::record_sync_unresolved(&self.label);
                debug!(sensor = %self.label, frame = %anchor.frame_id, error = %err, "anchor unresolved, fire skipped");
            }
            UnresolvedAnchorPolicy::Warn => {
                self.stats.skipped_unresolved += 1;
                observability::record_sync_unresolved(&self.label);
                warn!(sensor = %self.label, frame = %anchor.frame_id, error = %err, "anchor unresolved, fire skipped");
            }
        }
    }
}

/// Builder for [`Synchronizer`]
pub struct SynchronizerBuilder {
    label: String,
    root_frame: String,
    channels: Vec<ChannelId>,
    anchor_index: usize,
    anchor_of: Option<AnchorFn>,
    fusion: Option<FusionFn>,
    policy: UnresolvedAnchorPolicy,
}

impl SynchronizerBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            root_frame: "map".to_string(),
            channels: Vec::new(),
            anchor_index: 0,
            anchor_of: None,
            fusion: None,
            policy: UnresolvedAnchorPolicy::default(),
        }
    }

    pub fn root_frame(mut self, frame: impl Into<String>) -> Self {
        self.root_frame = frame.into();
        self
    }

    /// Append a required channel; its slot index is the call order
    pub fn channel(mut self, channel: impl Into<ChannelId>) -> Self {
        self.channels.push(channel.into());
        self
    }

    /// Slot whose message provides the anchor (default 0)
    pub fn anchor_slot(mut self, index: usize) -> Self {
        self.anchor_index = index;
        self
    }

    pub fn anchor_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RawMessage) -> Option<Anchor> + 'static,
    {
        self.anchor_of = Some(Box::new(f));
        self
    }

    pub fn fusion<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[RawMessage]) -> Result<Vec<NormalizedRecord>, ContractError> + 'static,
    {
        self.fusion = Some(Box::new(f));
        self
    }

    pub fn policy(mut self, policy: UnresolvedAnchorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<Synchronizer, SyncError> {
        let label = self.label;
        if self.channels.is_empty() {
            return Err(SyncError::NoChannels { label });
        }
        for (i, channel) in self.channels.iter().enumerate() {
            if self.channels[..i].contains(channel) {
                return Err(SyncError::DuplicateChannel {
                    label,
                    channel: channel.to_string(),
                });
            }
        }
        if self.anchor_index >= self.channels.len() {
            return Err(SyncError::AnchorOutOfRange {
                label,
                index: self.anchor_index,
                channels: self.channels.len(),
            });
        }
        let Some(anchor_of) = self.anchor_of else {
            return Err(SyncError::Missing {
                label,
                what: "anchor function",
            });
        };
        let Some(fusion) = self.fusion else {
            return Err(SyncError::Missing {
                label,
                what: "fusion function",
            });
        };

        Ok(Synchronizer {
            slots: vec![None; self.channels.len()],
            label,
            root_frame: self.root_frame,
            channels: self.channels,
            anchor_index: self.anchor_index,
            anchor_of,
            fusion,
            last_pose: None,
            policy: self.policy,
            stats: SyncStats::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Odometry, Pose, TransformSample};
    use proptest::prelude::*;

    /// Anchor frame "base", stamp = message timestamp
    fn sync_over(channels: &[&str]) -> Synchronizer {
        let mut b = Synchronizer::builder("fused").root_frame("map");
        for c in channels {
            b = b.channel(*c);
        }
        b.anchor_fn(|msg| Some(Anchor::new("base", msg.timestamp)))
            .fusion(|group| {
                Ok(group
                    .iter()
                    .map(|m| {
                        Odometry {
                            sensor_label: m.channel_id.to_string(),
                            timestamp: m.timestamp,
                            x: 0.0,
                            y: 0.0,
                            yaw: 0.0,
                            vx: 0.0,
                            vy: 0.0,
                            omega: 0.0,
                        }
                        .into()
                    })
                    .collect())
            })
            .build()
            .unwrap()
    }

    fn msg(channel: &str, t: u64) -> RawMessage {
        RawMessage::new(channel, t, "test/Msg", vec![t as u8])
    }

    fn static_store() -> TransformStore {
        let mut store = TransformStore::default();
        store
            .insert(TransformSample::fixed("map", "base", Pose::IDENTITY))
            .unwrap();
        store
    }

    #[test]
    fn two_channels_fire_once_and_clear() {
        let store = static_store();
        let mut sync = sync_over(&["/image", "/info"]);

        assert!(sync.offer(0, &msg("/image", 1), &store).unwrap().is_empty());
        let out = sync.offer(1, &msg("/info", 2), &store).unwrap();

        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], NormalizedRecord::MotionIncrement(_)));
        assert_eq!(out[1].sensor_label(), "/image");
        assert_eq!(out[2].sensor_label(), "/info");
        assert_eq!(sync.filled(), 0);
        assert_eq!(sync.stats().fired, 1);
    }

    #[test]
    fn occupied_slot_keeps_first_arrival() {
        let store = static_store();
        let mut sync = sync_over(&["/image", "/info"]);

        sync.offer(0, &msg("/image", 1), &store).unwrap();
        let out = sync.offer(0, &msg("/image", 2), &store).unwrap();

        assert!(out.is_empty());
        assert_eq!(sync.filled(), 1);
        assert_eq!(sync.slot(0).unwrap().timestamp, 1);
        assert_eq!(sync.stats().dropped_occupied, 1);
    }

    #[test]
    fn unresolved_anchor_keeps_slots_until_trigger() {
        let mut store = TransformStore::default();
        let mut sync = sync_over(&["/scan"]);

        assert!(sync.offer(0, &msg("/scan", 100), &store).unwrap().is_empty());
        assert_eq!(sync.filled(), 1);
        assert_eq!(sync.stats().skipped_unresolved, 1);

        store
            .insert(TransformSample::fixed("map", "base", Pose::IDENTITY))
            .unwrap();
        let out = sync.check_and_fire(&store).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(sync.filled(), 0);
    }

    #[test]
    fn silent_policy_does_not_count() {
        let store = TransformStore::default();
        let mut sync = Synchronizer::builder("quiet")
            .channel("/a")
            .policy(UnresolvedAnchorPolicy::Silent)
            .anchor_fn(|m| Some(Anchor::new("base", m.timestamp)))
            .fusion(|_| Ok(vec![]))
            .build()
            .unwrap();

        sync.offer(0, &msg("/a", 1), &store).unwrap();
        assert_eq!(sync.stats().skipped_unresolved, 0);
        assert_eq!(sync.filled(), 1);
    }

    #[test]
    fn increment_is_relative_to_previous_fire() {
        let mut store = TransformStore::default();
        store
            .insert(TransformSample::dynamic("map", "base", 0, Pose::from_translation(0.0, 0.0, 0.0)))
            .unwrap();
        store
            .insert(TransformSample::dynamic("map", "base", 100, Pose::from_translation(10.0, 0.0, 0.0)))
            .unwrap();
        let mut sync = sync_over(&["/scan"]);

        let first = sync.offer(0, &msg("/scan", 20), &store).unwrap();
        let second = sync.offer(0, &msg("/scan", 50), &store).unwrap();

        let increment = |records: &[NormalizedRecord]| match &records[0] {
            NormalizedRecord::MotionIncrement(m) => m.increment,
            other => panic!("expected increment, got {other:?}"),
        };
        assert_eq!(increment(&first), Pose::IDENTITY);
        assert!((increment(&second).translation.x - 3.0).abs() < 1e-9);
    }

    #[test]
    fn unreadable_anchor_discards_group() {
        let store = static_store();
        let mut sync = Synchronizer::builder("broken")
            .channel("/a")
            .anchor_fn(|_| None)
            .fusion(|_| Ok(vec![]))
            .build()
            .unwrap();

        assert!(sync.offer(0, &msg("/a", 1), &store).unwrap().is_empty());
        assert_eq!(sync.filled(), 0);
        assert_eq!(sync.stats().discarded_unreadable, 1);
    }

    #[test]
    fn fusion_error_propagates() {
        let store = static_store();
        let mut sync = Synchronizer::builder("hard")
            .channel("/a")
            .anchor_fn(|m| Some(Anchor::new("base", m.timestamp)))
            .fusion(|_| Err(ContractError::normalize("hard", "bad geometry")))
            .build()
            .unwrap();

        let err = sync.offer(0, &msg("/a", 1), &store).unwrap_err();
        assert!(matches!(err, ContractError::Normalize { .. }));
    }

    #[test]
    fn builder_rejects_bad_topology() {
        let no_channels = Synchronizer::builder("x")
            .anchor_fn(|_| None)
            .fusion(|_| Ok(vec![]))
            .build();
        assert!(matches!(no_channels, Err(SyncError::NoChannels { .. })));

        let dup = Synchronizer::builder("x")
            .channel("/a")
            .channel("/a")
            .anchor_fn(|_| None)
            .fusion(|_| Ok(vec![]))
            .build();
        assert!(matches!(dup, Err(SyncError::DuplicateChannel { .. })));

        let anchor = Synchronizer::builder("x")
            .channel("/a")
            .anchor_slot(1)
            .anchor_fn(|_| None)
            .fusion(|_| Ok(vec![]))
            .build();
        assert!(matches!(anchor, Err(SyncError::AnchorOutOfRange { .. })));

        let no_fusion = Synchronizer::builder("x")
            .channel("/a")
            .anchor_fn(|_| None)
            .build();
        assert!(matches!(no_fusion, Err(SyncError::Missing { .. })));
    }

    proptest! {
        /// Fires exactly when the last empty slot is filled; empties after.
        #[test]
        fn fires_iff_all_slots_filled(arrivals in proptest::collection::vec(0usize..3, 1..60)) {
            let store = static_store();
            let mut sync = sync_over(&["/a", "/b", "/c"]);
            let mut occupied = [false; 3];

            for (t, slot) in arrivals.into_iter().enumerate() {
                occupied[slot] = true;
                let out = sync.offer(slot, &msg("/x", t as u64), &store).unwrap();
                if occupied.iter().all(|o| *o) {
                    prop_assert_eq!(out.len(), 4);
                    prop_assert_eq!(sync.filled(), 0);
                    occupied = [false; 3];
                } else {
                    prop_assert!(out.is_empty());
                    prop_assert_eq!(sync.filled(), occupied.iter().filter(|o| **o).count());
                }
            }
        }
    }
}
