//! Normalizer trait

use contracts::{ContractError, NormalizedRecord, RawMessage, RecordKind};

/// Converts raw messages of one sensor into normalized records.
///
/// Implement this for every single-channel sensor kind. Normalizers never
/// touch the transform store or the registry; the only state they keep is
/// their own warn-once flags.
///
/// Failure policy:
/// - a payload that does not decode returns `ContractError::PayloadDecode`
///   (the registry drops the message)
/// - a missing optional feature returns `Ok` with fewer or no records
/// - a broken structural invariant returns `ContractError::Normalize`,
///   which aborts the pass
pub trait Normalizer {
    /// Sensor label stamped on every record
    fn label(&self) -> &str;

    /// Kind of record this normalizer produces
    fn kind(&self) -> RecordKind;

    /// Convert one message
    fn normalize(&mut self, msg: &RawMessage) -> Result<Vec<NormalizedRecord>, ContractError>;
}
