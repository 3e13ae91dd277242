//! # Transform Store
//!
//! Static and time-varying rigid poses between named frames, with interpolated
//! relative-pose queries.
//!
//! - Static samples are permanent and resolve at every query time
//! - Dynamic samples form a time-ordered history per frame pair, bounded by a
//!   duration window measured back from the newest sample of that pair
//! - A query walks the frame graph in either edge direction and interpolates
//!   every dynamic edge between the samples bracketing the query time; a time
//!   outside a bracket is unavailable, never extrapolated
//!
//! ```
//! use contracts::{Pose, TransformSample};
//! use transform_store::TransformStore;
//!
//! let mut store = TransformStore::default();
//! store.insert(TransformSample::fixed("map", "base", Pose::from_translation(1.0, 0.0, 0.0))).unwrap();
//! store.insert(TransformSample::fixed("base", "lidar", Pose::from_translation(0.5, 0.0, 0.0))).unwrap();
//!
//! let pose = store.lookup("map", "lidar", 123).unwrap();
//! assert!((pose.translation.x - 1.5).abs() < 1e-9);
//! ```

mod convert;
mod error;
mod history;
mod store;

pub use convert::{from_isometry, to_isometry};
pub use error::{TransformError, Unavailability};
pub use store::{StoreStats, TransformStore, DEFAULT_CACHE_DURATION_NS};
