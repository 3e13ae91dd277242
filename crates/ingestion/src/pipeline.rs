//! Registry assembly from a transcription blueprint.
//!
//! Registration order fixes handler order on shared channels:
//! 1. transform topics (dynamic, then static)
//! 2. sensors in lexical label order; synchronized sensors add a trigger on
//!    the dynamic transform topic, after the transform handler

use contracts::msgs::Stamped;
use contracts::{
    ContractError, NormalizedRecord, RawMessage, SensorConfig, SerializationFormat,
    TopicSensorConfig, TranscriptionBlueprint,
};
use dispatcher::{ChannelRegistry, ChannelRegistryBuilder, RunContext, TranscriptionDriver};
use sync_engine::{bind_slot, bind_trigger, Anchor, SharedSynchronizer, SyncStats, Synchronizer};
use tracing::{debug, info, instrument};
use transform_store::TransformStore;

use crate::error::{IngestionError, Result};
use crate::normalizer::Normalizer;
use crate::normalizers::{
    ImageNormalizer, ImuNormalizer, LidarScanNormalizer, OdometryNormalizer, PointCloudNormalizer,
    RangeImageNormalizer, RotatingScanNormalizer, TransformIngestor,
};

/// What was registered for one sensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorSummary {
    pub label: String,
    pub kind: &'static str,
    pub topics: Vec<String>,
    pub synchronized: bool,
}

/// Read-only view of the synchronizers after a run
#[derive(Debug, Clone, Default)]
pub struct SyncProbe {
    synchronizers: Vec<SharedSynchronizer>,
}

impl SyncProbe {
    /// `(sensor label, stats)` per synchronizer, in registration order
    pub fn stats(&self) -> Vec<(String, SyncStats)> {
        self.synchronizers
            .iter()
            .map(|s| {
                let sync = s.borrow();
                (sync.label().to_string(), sync.stats())
            })
            .collect()
    }
}

/// Populated registry and run context for one transcription pass
#[derive(Debug)]
pub struct TranscriptionPipeline {
    registry: ChannelRegistry,
    context: RunContext,
    sensors: Vec<SensorSummary>,
    probe: SyncProbe,
}

impl TranscriptionPipeline {
    /// Build the registry described by `blueprint`.
    ///
    /// # Errors
    /// A sensor reads a transform topic, or a synchronizer cannot be built.
    #[instrument(name = "pipeline_build", skip(blueprint), fields(sensors = blueprint.sensors.len()))]
    pub fn from_blueprint(
        blueprint: &TranscriptionBlueprint,
        format: SerializationFormat,
    ) -> Result<Self> {
        let transforms = &blueprint.transforms;
        let mut builder = ChannelRegistry::builder();

        let mut dynamic_tf = TransformIngestor::new(format, false);
        builder.register(transforms.dynamic_topic.as_str(), move |msg: &RawMessage, store: &mut TransformStore| {
            dynamic_tf.ingest(msg, store)
        });
        let mut static_tf = TransformIngestor::new(format, true);
        builder.register(transforms.static_topic.as_str(), move |msg: &RawMessage, store: &mut TransformStore| {
            static_tf.ingest(msg, store)
        });

        let mut assembler = Assembler {
            builder,
            blueprint,
            format,
            probe: SyncProbe::default(),
        };
        let mut sensors = Vec::with_capacity(blueprint.sensors.len());

        // BTreeMap: lexical label order
        for (label, sensor) in &blueprint.sensors {
            for topic in sensor.topics() {
                if topic == transforms.dynamic_topic || topic == transforms.static_topic {
                    return Err(IngestionError::invalid_sensor(
                        label,
                        format!("topic '{topic}' is a transform topic"),
                    ));
                }
            }
            assembler.register_sensor(label, sensor)?;
            debug!(
                sensor = %label,
                kind = sensor.kind_name(),
                topics = ?sensor.topics(),
                synchronized = sensor.is_synchronized(),
                "Sensor registered"
            );
            sensors.push(SensorSummary {
                label: label.clone(),
                kind: sensor.kind_name(),
                topics: sensor.topics().into_iter().map(String::from).collect(),
                synchronized: sensor.is_synchronized(),
            });
        }

        let registry = assembler.builder.build();
        info!(
            sensors = sensors.len(),
            channels = registry.channels().len(),
            root_frame = %blueprint.root_frame,
            format = %format,
            "Registry built"
        );

        Ok(Self {
            registry,
            context: RunContext::new(TransformStore::new(transforms.cache_duration_ns())),
            sensors,
            probe: assembler.probe,
        })
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn sensors(&self) -> &[SensorSummary] {
        &self.sensors
    }

    pub fn probe(&self) -> SyncProbe {
        self.probe.clone()
    }

    pub fn into_parts(self) -> (ChannelRegistry, RunContext) {
        (self.registry, self.context)
    }

    /// Driver over this registry, plus a probe for synchronizer stats
    pub fn into_driver(self) -> (TranscriptionDriver, SyncProbe) {
        let probe = self.probe;
        (TranscriptionDriver::new(self.registry, self.context), probe)
    }
}

struct Assembler<'a> {
    builder: ChannelRegistryBuilder,
    blueprint: &'a TranscriptionBlueprint,
    format: SerializationFormat,
    probe: SyncProbe,
}

impl Assembler<'_> {
    fn register_sensor(&mut self, label: &str, sensor: &SensorConfig) -> Result<()> {
        let format = self.format;
        let (cfg, mut normalizer): (&TopicSensorConfig, Box<dyn Normalizer>) = match sensor {
            SensorConfig::RangeImage(cfg) => {
                let mut normalizer = RangeImageNormalizer::new(label, format, cfg.range_is_depth);
                let sync = self
                    .synchronizer(label)
                    .channel(cfg.depth.as_str())
                    .channel(cfg.camera_info.as_str())
                    .anchor_slot(0)
                    .fusion(move |slots| normalizer.fuse(slots))
                    .build()?
                    .into_shared();
                self.bind(sync);
                return Ok(());
            }
            SensorConfig::LidarScan(cfg) => (
                cfg,
                boxed(LidarScanNormalizer::new(label, format, cfg.sensor_pose.to_pose())),
            ),
            SensorConfig::RotatingScan(cfg) => (
                cfg,
                boxed(RotatingScanNormalizer::new(label, format, cfg.sensor_pose.to_pose())),
            ),
            SensorConfig::PointCloud(cfg) => (
                cfg,
                boxed(PointCloudNormalizer::new(label, format, cfg.sensor_pose.to_pose())),
            ),
            SensorConfig::Imu(cfg) => (
                cfg,
                boxed(ImuNormalizer::new(label, format, cfg.sensor_pose.to_pose())),
            ),
            SensorConfig::Odometry(cfg) => (
                cfg,
                boxed(OdometryNormalizer::new(label, format, cfg.sensor_pose.to_pose())),
            ),
            SensorConfig::Image(cfg) => (
                cfg,
                boxed(ImageNormalizer::new(label, format, cfg.sensor_pose.to_pose())),
            ),
        };

        if cfg.pose_gated {
            let sensor_label = label.to_string();
            let sync = self
                .synchronizer(label)
                .channel(cfg.topic.as_str())
                .fusion(move |slots| match slots {
                    [msg] => normalizer.normalize(msg),
                    _ => Err(ContractError::normalize(
                        &sensor_label,
                        format!("expected one message, got {}", slots.len()),
                    )),
                })
                .build()?
                .into_shared();
            self.bind(sync);
        } else {
            self.builder.register(
                cfg.topic.as_str(),
                move |msg: &RawMessage, _: &mut TransformStore| normalizer.normalize(msg),
            );
        }
        Ok(())
    }

    fn synchronizer(&self, label: &str) -> sync_engine::SynchronizerBuilder {
        let format = self.format;
        Synchronizer::builder(label)
            .root_frame(self.blueprint.root_frame.as_str())
            .policy(self.blueprint.transforms.unresolved_anchor)
            .anchor_fn(move |msg| header_anchor(format, msg))
    }

    /// One slot handler per channel, then a trigger on the dynamic tf topic
    fn bind(&mut self, sync: SharedSynchronizer) {
        let channels = sync.borrow().channels().to_vec();
        for (index, channel) in channels.into_iter().enumerate() {
            self.builder.register(channel, bind_slot(sync.clone(), index));
        }
        self.builder.register(
            self.blueprint.transforms.dynamic_topic.as_str(),
            bind_trigger(sync.clone()),
        );
        self.probe.synchronizers.push(sync);
    }
}

fn boxed<N: Normalizer + 'static>(normalizer: N) -> Box<dyn Normalizer> {
    Box::new(normalizer)
}

/// Anchor from the message header; `None` if the header cannot be read
fn header_anchor(format: SerializationFormat, msg: &RawMessage) -> Option<Anchor> {
    let probe: Stamped = format.decode(&msg.channel_id, &msg.payload).ok()?;
    if probe.header.frame_id.is_empty() {
        return None;
    }
    Some(Anchor::new(probe.header.frame_id, probe.header.stamp_ns))
}

/// Records produced by a pipeline for a message list, for embedding and tests
pub fn transcribe_messages(
    pipeline: TranscriptionPipeline,
    messages: &[RawMessage],
) -> std::result::Result<Vec<NormalizedRecord>, ContractError> {
    let (mut registry, mut context) = pipeline.into_parts();
    let mut out = Vec::new();
    for msg in messages {
        out.extend(registry.dispatch(msg, &mut context)?);
    }
    Ok(out)
}
