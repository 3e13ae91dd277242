//! Transform topic ingestion
//!
//! Feeds `/tf` and `/tf_static` into the transform store. Produces no records.

use contracts::{
    msgs, ContractError, NormalizedRecord, Pose, Quaternion, RawMessage, SerializationFormat,
    TransformSample, Vector3,
};
use tracing::{trace, warn};
use transform_store::TransformStore;

#[derive(Debug)]
pub struct TransformIngestor {
    format: SerializationFormat,
    is_static: bool,
    inserted: u64,
    rejected: u64,
}

impl TransformIngestor {
    pub fn new(format: SerializationFormat, is_static: bool) -> Self {
        Self {
            format,
            is_static,
            inserted: 0,
            rejected: 0,
        }
    }

    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Insert every transform of the message. Rejected samples are logged
    /// and counted; the rest of the message is still applied.
    ///
    /// # Errors
    /// Only an undecodable payload, which the registry treats as recoverable.
    pub fn ingest(
        &mut self,
        msg: &RawMessage,
        store: &mut TransformStore,
    ) -> Result<Vec<NormalizedRecord>, ContractError> {
        let tf: msgs::TfMessage = self.format.decode(&msg.channel_id, &msg.payload)?;

        for stamped in tf.transforms {
            let sample = self.sample(stamped);
            match store.insert(sample) {
                Ok(()) => self.inserted += 1,
                Err(e) => {
                    self.rejected += 1;
                    observability::record_transform_rejected();
                    warn!(channel = %msg.channel_id, error = %e, "Transform dropped");
                }
            }
        }

        trace!(
            channel = %msg.channel_id,
            inserted = self.inserted,
            rejected = self.rejected,
            "transforms ingested"
        );
        Ok(Vec::new())
    }

    fn sample(&self, stamped: msgs::TransformStamped) -> TransformSample {
        let t = stamped.transform.translation;
        let r = stamped.transform.rotation;
        let pose = Pose::new(Vector3::new(t.x, t.y, t.z), Quaternion::new(r.w, r.x, r.y, r.z));
        if self.is_static {
            TransformSample::fixed(stamped.header.frame_id, stamped.child_frame_id, pose)
        } else {
            TransformSample::dynamic(
                stamped.header.frame_id,
                stamped.child_frame_id,
                stamped.header.stamp_ns,
                pose,
            )
        }
    }
}

/// Encode a single transform as a tf message payload
pub fn tf_payload(
    format: SerializationFormat,
    parent: &str,
    child: &str,
    stamp_ns: u64,
    pose: &Pose,
) -> Result<Vec<u8>, ContractError> {
    let msg = msgs::TfMessage {
        transforms: vec![msgs::TransformStamped {
            header: msgs::Header {
                stamp_ns,
                frame_id: parent.to_string(),
            },
            child_frame_id: child.to_string(),
            transform: msgs::TransformMsg {
                translation: msgs::Vector3Msg {
                    x: pose.translation.x,
                    y: pose.translation.y,
                    z: pose.translation.z,
                },
                rotation: msgs::QuaternionMsg {
                    x: pose.rotation.x,
                    y: pose.rotation.y,
                    z: pose.rotation.z,
                    w: pose.rotation.w,
                },
            },
        }],
    };
    format.encode(&msg)
}
