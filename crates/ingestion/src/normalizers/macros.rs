//! Normalizer macros
//!
//! Declarative macro for the boilerplate shared by single-channel normalizers

/// Define a single-channel normalizer
///
/// Generates the struct holding a [`NormalizerContext`](crate::normalizers::common::NormalizerContext),
/// its `new` constructor, and the `Normalizer` impl that decodes the payload
/// into the wire type before calling the conversion function.
///
/// # Usage
/// ```ignore
/// define_normalizer!(
///     ImuNormalizer,        // Normalizer name
///     RecordKind::Imu,      // Record kind produced
///     msgs::Imu,            // Wire message type
///     imu_to_records        // fn(&mut NormalizerContext, msgs::Imu) -> Result<Vec<NormalizedRecord>, ContractError>
/// );
/// ```
macro_rules! define_normalizer {
    (
        $normalizer_name:ident,
        $kind:expr,
        $wire_type:ty,
        $convert_fn:ident
    ) => {
        #[derive(Debug)]
        pub struct $normalizer_name {
            ctx: $crate::normalizers::common::NormalizerContext,
        }

        impl $normalizer_name {
            pub fn new(
                label: impl Into<String>,
                format: contracts::SerializationFormat,
                sensor_pose: contracts::Pose,
            ) -> Self {
                Self {
                    ctx: $crate::normalizers::common::NormalizerContext::new(
                        label,
                        format,
                        sensor_pose,
                    ),
                }
            }
        }

        impl $crate::normalizer::Normalizer for $normalizer_name {
            fn label(&self) -> &str {
                &self.ctx.label
            }

            fn kind(&self) -> contracts::RecordKind {
                $kind
            }

            fn normalize(
                &mut self,
                msg: &contracts::RawMessage,
            ) -> Result<Vec<contracts::NormalizedRecord>, contracts::ContractError> {
                let wire: $wire_type = self.ctx.format.decode(&msg.channel_id, &msg.payload)?;
                tracing::trace!(
                    sensor = %self.ctx.label,
                    channel = %msg.channel_id,
                    "normalizing message"
                );
                $convert_fn(&mut self.ctx, wire)
            }
        }
    };
}
