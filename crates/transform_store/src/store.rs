//! TransformStore - frame graph with static and dynamic edges.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use contracts::{Pose, TransformSample};
use nalgebra::Isometry3;
use tracing::{instrument, trace};

use crate::convert::{from_isometry, to_isometry};
use crate::history::EdgeHistory;
use crate::{TransformError, Unavailability};

/// Default dynamic history window: 10 s
pub const DEFAULT_CACHE_DURATION_NS: u64 = 10_000_000_000;

const MIN_QUATERNION_NORM: f64 = 1e-9;

/// `(parent, child)` as stored
type FramePair = (String, String);

/// Counters over the lifetime of the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub static_inserted: u64,
    pub dynamic_inserted: u64,
    pub rejected: u64,
    pub evicted: u64,
}

/// Frame graph answering `lookup(parent, child, time)`.
///
/// Edges are stored in the direction they were inserted and walked in both
/// directions, inverting when traversed child to parent.
#[derive(Debug)]
pub struct TransformStore {
    cache_duration_ns: u64,
    static_edges: HashMap<FramePair, Isometry3<f64>>,
    dynamic_edges: HashMap<FramePair, EdgeHistory>,
    /// Undirected neighbours; ordered so traversal is deterministic
    adjacency: HashMap<String, BTreeSet<String>>,
    stats: StoreStats,
}

impl Default for TransformStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DURATION_NS)
    }
}

impl TransformStore {
    pub fn new(cache_duration_ns: u64) -> Self {
        Self {
            cache_duration_ns,
            static_edges: HashMap::new(),
            dynamic_edges: HashMap::new(),
            adjacency: HashMap::new(),
            stats: StoreStats::default(),
        }
    }

    pub fn cache_duration_ns(&self) -> u64 {
        self.cache_duration_ns
    }

    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    /// Known frame names, sorted
    pub fn frames(&self) -> Vec<&str> {
        let mut frames: Vec<&str> = self.adjacency.keys().map(String::as_str).collect();
        frames.sort_unstable();
        frames
    }

    pub fn has_frame(&self, frame: &str) -> bool {
        self.adjacency.contains_key(frame)
    }

    /// Add a sample.
    ///
    /// # Errors
    /// `TransformError::Rejected` for empty or identical frame names, a
    /// non-finite pose, a degenerate rotation, or a dynamic sample older than
    /// the history window. The store is unchanged in that case.
    #[instrument(
        level = "trace",
        name = "transform_store_insert",
        skip(self, sample),
        fields(parent = %sample.parent_frame, child = %sample.child_frame, time = sample.time)
    )]
    pub fn insert(&mut self, sample: TransformSample) -> Result<(), TransformError> {
        if let Err(e) = self.check(&sample) {
            self.stats.rejected += 1;
            return Err(e);
        }

        let iso = to_isometry(&sample.pose);
        let TransformSample {
            parent_frame,
            child_frame,
            time,
            is_static,
            ..
        } = sample;

        self.link(&parent_frame, &child_frame);
        let key = (parent_frame, child_frame);

        if is_static {
            self.static_edges.insert(key, iso);
            self.stats.static_inserted += 1;
        } else {
            let history = self.dynamic_edges.entry(key).or_default();
            history.insert(time, iso);
            let evicted = history.evict(self.cache_duration_ns);
            self.stats.dynamic_inserted += 1;
            self.stats.evicted += evicted as u64;
            if evicted > 0 {
                trace!(evicted, "evicted stale transform samples");
            }
        }
        Ok(())
    }

    /// Whether `lookup(parent, child, time)` would succeed
    pub fn can_resolve(&self, parent: &str, child: &str, time: u64) -> bool {
        self.lookup(parent, child, time).is_ok()
    }

    /// Pose of `child` expressed in `parent` at `time`.
    ///
    /// # Errors
    /// `TransformError::Unavailable` when a frame is unknown, the frames are not
    /// connected, or every connecting path has a dynamic edge with no samples
    /// bracketing `time`.
    pub fn lookup(&self, parent: &str, child: &str, time: u64) -> Result<Pose, TransformError> {
        self.lookup_isometry(parent, child, time)
            .map(|iso| from_isometry(&iso))
    }

    pub fn lookup_isometry(
        &self,
        parent: &str,
        child: &str,
        time: u64,
    ) -> Result<Isometry3<f64>, TransformError> {
        if parent == child {
            return Ok(Isometry3::identity());
        }
        for frame in [parent, child] {
            if !self.has_frame(frame) {
                return Err(TransformError::unavailable(
                    parent,
                    child,
                    time,
                    Unavailability::UnknownFrame(frame.to_string()),
                ));
            }
        }

        if let Some(iso) = self.search(parent, child, |a, b| self.edge_at(a, b, time)) {
            return Ok(iso);
        }

        // Distinguish a missing path from a path that exists at other times.
        let reason = if self
            .search(parent, child, |_, _| Some(Isometry3::identity()))
            .is_some()
        {
            Unavailability::OutOfRange
        } else {
            Unavailability::Disconnected
        };
        Err(TransformError::unavailable(parent, child, time, reason))
    }

    /// BFS from `from`, composing the accumulated pose with each usable edge.
    fn search<F>(&self, from: &str, to: &str, edge: F) -> Option<Isometry3<f64>>
    where
        F: Fn(&str, &str) -> Option<Isometry3<f64>>,
    {
        let mut queue: VecDeque<(&str, Isometry3<f64>)> = VecDeque::new();
        let mut visited: HashSet<&str> = HashSet::new();

        queue.push_back((from, Isometry3::identity()));
        visited.insert(from);

        while let Some((current, accumulated)) = queue.pop_front() {
            let Some(neighbours) = self.adjacency.get(current) else {
                continue;
            };
            for next in neighbours {
                if visited.contains(next.as_str()) {
                    continue;
                }
                let Some(step) = edge(current, next) else {
                    continue;
                };
                let composed = accumulated * step;
                if next == to {
                    return Some(composed);
                }
                visited.insert(next.as_str());
                queue.push_back((next.as_str(), composed));
            }
        }
        None
    }

    /// Pose of `b` in `a` at `time`, from whichever stored direction exists.
    fn edge_at(&self, a: &str, b: &str, time: u64) -> Option<Isometry3<f64>> {
        let forward = (a.to_string(), b.to_string());
        if let Some(iso) = self.static_edges.get(&forward) {
            return Some(*iso);
        }
        let backward = (b.to_string(), a.to_string());
        if let Some(iso) = self.static_edges.get(&backward) {
            return Some(iso.inverse());
        }
        if let Some(history) = self.dynamic_edges.get(&forward) {
            return history.at(time);
        }
        self.dynamic_edges
            .get(&backward)
            .and_then(|history| history.at(time))
            .map(|iso| iso.inverse())
    }

    fn link(&mut self, a: &str, b: &str) {
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    fn check(&self, sample: &TransformSample) -> Result<(), TransformError> {
        let (parent, child) = (&sample.parent_frame, &sample.child_frame);
        let reject = |reason: &str| -> Result<(), TransformError> {
            Err(TransformError::rejected(parent, child, reason))
        };

        if parent.is_empty() || child.is_empty() {
            return reject("empty frame name");
        }
        if parent == child {
            return reject("parent and child are the same frame");
        }
        if !sample.pose.is_finite() {
            return reject("non-finite pose");
        }
        if sample.pose.rotation.norm() < MIN_QUATERNION_NORM {
            return reject("degenerate rotation");
        }
        if !sample.is_static {
            let newest = self
                .dynamic_edges
                .get(&(parent.clone(), child.clone()))
                .and_then(|h| h.newest());
            if let Some(newest) = newest {
                if sample.time < newest.saturating_sub(self.cache_duration_ns) {
                    return reject("older than the history window");
                }
            }
        }
        Ok(())
    }

    /// Number of stored dynamic samples for a pair, in stored direction
    pub fn history_len(&self, parent: &str, child: &str) -> usize {
        self.dynamic_edges
            .get(&(parent.to_string(), child.to_string()))
            .map_or(0, |h| h.len())
    }
}
