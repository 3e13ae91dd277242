//! Registry bindings for a shared synchronizer.
//!
//! One synchronizer is reachable from several channels, so it lives behind
//! `Rc<RefCell<_>>`. Dispatch is single-threaded and never re-entrant, so the
//! borrow is always free when a handler runs.

use std::cell::RefCell;
use std::rc::Rc;

use contracts::{ContractError, NormalizedRecord, RawMessage};
use transform_store::TransformStore;

use crate::Synchronizer;

pub type SharedSynchronizer = Rc<RefCell<Synchronizer>>;

impl Synchronizer {
    pub fn into_shared(self) -> SharedSynchronizer {
        Rc::new(RefCell::new(self))
    }
}

/// Handler storing each message into slot `index`, then checking the group.
///
/// # Panics
/// Panics if `index` is not a slot of the synchronizer.
pub fn bind_slot(
    sync: SharedSynchronizer,
    index: usize,
) -> impl FnMut(&RawMessage, &mut TransformStore) -> Result<Vec<NormalizedRecord>, ContractError> {
    assert!(
        index < sync.borrow().channels().len(),
        "slot {index} out of range"
    );
    move |msg, transforms| sync.borrow_mut().offer(index, msg, transforms)
}

/// Handler that only runs check-and-fire, without occupying a slot.
pub fn bind_trigger(
    sync: SharedSynchronizer,
) -> impl FnMut(&RawMessage, &mut TransformStore) -> Result<Vec<NormalizedRecord>, ContractError> {
    move |_msg, transforms| sync.borrow_mut().check_and_fire(transforms)
}
