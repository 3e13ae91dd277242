//! MemorySink - keeps records in memory

use contracts::{ContractError, NormalizedRecord, RecordSink};

/// Sink collecting every record, for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySink {
    name: String,
    records: Vec<NormalizedRecord>,
    flushes: u64,
    closed: bool,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<NormalizedRecord> {
        self.records
    }

    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RecordSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, record: &NormalizedRecord) -> Result<(), ContractError> {
        if self.closed {
            return Err(ContractError::sink_write(&self.name, "sink is closed"));
        }
        self.records.push(record.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        self.flushes += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.closed = true;
        Ok(())
    }
}
