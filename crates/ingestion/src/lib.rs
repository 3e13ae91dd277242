//! # Ingestion
//!
//! Sensor normalizers and registry assembly.
//!
//! Responsibilities:
//! - Convert raw messages of each configured sensor into `NormalizedRecord`s
//! - Feed transform topics into the transform store
//! - Build the channel registry (and its synchronizers) from a blueprint
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::TranscriptionPipeline;
//! use contracts::SerializationFormat;
//!
//! let pipeline = TranscriptionPipeline::from_blueprint(&blueprint, SerializationFormat::Bincode)?;
//! let (mut driver, probe) = pipeline.into_driver();
//! let report = driver.run(source, &mut sink).await?;
//! for (sensor, stats) in probe.stats() {
//!     println!("{sensor}: fired {}", stats.fired);
//! }
//! ```

mod error;
mod normalizer;
pub mod normalizers;
mod pipeline;

pub use error::{IngestionError, Result};
pub use normalizer::Normalizer;
pub use normalizers::{
    ImageNormalizer, ImuNormalizer, LidarScanNormalizer, OdometryNormalizer, PointCloudNormalizer,
    RangeImageNormalizer, RotatingScanNormalizer, TransformIngestor,
};
pub use pipeline::{transcribe_messages, SensorSummary, SyncProbe, TranscriptionPipeline};
