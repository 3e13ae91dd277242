//! Time-ordered dynamic history of one frame pair.

use std::collections::VecDeque;

use nalgebra::{Isometry3, Translation3};

const SLERP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
pub(crate) struct EdgeHistory {
    /// Sorted by time, no duplicate times
    samples: VecDeque<(u64, Isometry3<f64>)>,
}

impl EdgeHistory {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn newest(&self) -> Option<u64> {
        self.samples.back().map(|(t, _)| *t)
    }

    pub fn oldest(&self) -> Option<u64> {
        self.samples.front().map(|(t, _)| *t)
    }

    /// Insert keeping time order; a sample at an existing time replaces it.
    pub fn insert(&mut self, time: u64, iso: Isometry3<f64>) {
        let idx = self.samples.partition_point(|(t, _)| *t < time);
        match self.samples.get_mut(idx) {
            Some(slot) if slot.0 == time => slot.1 = iso,
            _ => self.samples.insert(idx, (time, iso)),
        }
    }

    /// Drop samples older than `newest - window`, returns how many were dropped.
    pub fn evict(&mut self, window_ns: u64) -> usize {
        let Some(newest) = self.newest() else {
            return 0;
        };
        let cutoff = newest.saturating_sub(window_ns);
        let mut evicted = 0;
        while self.samples.front().is_some_and(|(t, _)| *t < cutoff) {
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Interpolate at `time`; `None` when `time` is outside `[oldest, newest]`.
    pub fn at(&self, time: u64) -> Option<Isometry3<f64>> {
        let idx = self.samples.partition_point(|(t, _)| *t < time);
        let (t1, after) = self.samples.get(idx)?;
        if *t1 == time {
            return Some(*after);
        }
        let (t0, before) = self.samples.get(idx.checked_sub(1)?)?;

        let ratio = (time - t0) as f64 / (t1 - t0) as f64;
        let translation = before
            .translation
            .vector
            .lerp(&after.translation.vector, ratio);
        let rotation = before
            .rotation
            .try_slerp(&after.rotation, ratio, SLERP_EPSILON)
            .unwrap_or_else(|| before.rotation.nlerp(&after.rotation, ratio));

        Some(Isometry3::from_parts(Translation3::from(translation), rotation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};

    fn at_x(x: f64) -> Isometry3<f64> {
        Isometry3::translation(x, 0.0, 0.0)
    }

    #[test]
    fn out_of_order_inserts_stay_sorted() {
        let mut h = EdgeHistory::default();
        h.insert(30, at_x(3.0));
        h.insert(10, at_x(1.0));
        h.insert(20, at_x(2.0));
        h.insert(20, at_x(2.5));

        assert_eq!(h.len(), 3);
        assert_eq!(h.oldest(), Some(10));
        assert_eq!(h.newest(), Some(30));
        assert!((h.at(20).unwrap().translation.x - 2.5).abs() < 1e-12);
    }

    #[test]
    fn interpolates_inside_bracket_only() {
        let mut h = EdgeHistory::default();
        h.insert(100, at_x(0.0));
        h.insert(200, at_x(10.0));

        assert!((h.at(150).unwrap().translation.x - 5.0).abs() < 1e-12);
        assert!(h.at(99).is_none());
        assert!(h.at(201).is_none());
        assert!(h.at(100).is_some());
        assert!(h.at(200).is_some());
    }

    #[test]
    fn slerps_rotation() {
        let mut h = EdgeHistory::default();
        h.insert(0, Isometry3::identity());
        h.insert(
            10,
            Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.0),
            ),
        );
        let mid = h.at(5).unwrap();
        assert!((mid.rotation.angle() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn eviction_is_relative_to_newest() {
        let mut h = EdgeHistory::default();
        for t in [0, 5, 10, 15, 20] {
            h.insert(t, at_x(t as f64));
        }
        assert_eq!(h.evict(10), 2);
        assert_eq!(h.oldest(), Some(10));
    }
}
