//! RecordSink trait - Driver output interface
//!
//! Defines the abstract interface for Sinks.

use crate::{ContractError, NormalizedRecord};

/// Record output trait
///
/// The sink receives records in exactly the order the Driver produced them.
#[trait_variant::make(RecordSink: Send)]
pub trait LocalRecordSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Append one record
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, record: &NormalizedRecord) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
