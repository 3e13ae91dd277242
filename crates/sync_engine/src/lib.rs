//! # Sync Engine
//!
//! N-ary synchronizer joining K channels into one fused event.
//!
//! Responsibilities:
//! - One pending slot per required channel, first arrival wins
//! - Fire only when every slot is filled and the anchor pose resolves
//! - Prepend a `MotionIncrement` relative to the previous fire
//! - Clear the whole slot set on fire
//!
//! ## Example
//!
//! ```ignore
//! use sync_engine::{Anchor, Synchronizer};
//!
//! let sync = Synchronizer::builder("depth")
//!     .root_frame("map")
//!     .channel("/camera/depth")
//!     .channel("/camera/info")
//!     .anchor_fn(|msg| Some(Anchor::new("camera", msg.timestamp)))
//!     .fusion(|group| Ok(vec![]))
//!     .build()?;
//! let shared = sync.into_shared();
//!
//! registry.register("/camera/depth", bind_slot(shared.clone(), 0));
//! registry.register("/camera/info", bind_slot(shared.clone(), 1));
//! registry.register("/tf", bind_trigger(shared));
//! ```

mod binding;
mod error;
mod synchronizer;

pub use binding::{bind_slot, bind_trigger, SharedSynchronizer};
pub use error::SyncError;
pub use synchronizer::{Anchor, AnchorFn, FusionFn, SyncStats, Synchronizer, SynchronizerBuilder};
