//! Camera image normalizer

use contracts::{msgs, ContractError, Image, NormalizedRecord, RecordKind};

use crate::normalizers::common::NormalizerContext;

/// Pixels are copied as-is; a buffer shorter than `step * height` is fatal
fn image_to_records(
    ctx: &mut NormalizerContext,
    image: msgs::Image,
) -> Result<Vec<NormalizedRecord>, ContractError> {
    let needed = image.step as usize * image.height as usize;
    if image.data.len() < needed {
        return Err(ctx.hard_fail(format!(
            "image buffer holds {} bytes, {} rows of {} bytes need {}",
            image.data.len(),
            image.height,
            image.step,
            needed
        )));
    }

    let record = Image {
        sensor_label: ctx.label.clone(),
        timestamp: image.header.stamp_ns,
        sensor_pose: ctx.sensor_pose,
        width: image.width,
        height: image.height,
        encoding: image.encoding,
        step: image.step,
        data: image.data,
    };
    Ok(vec![record.into()])
}

define_normalizer!(ImageNormalizer, RecordKind::Image, msgs::Image, image_to_records);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use contracts::{Pose, RawMessage, SerializationFormat};

    fn image(data: Vec<u8>) -> RawMessage {
        let img = msgs::Image {
            height: 2,
            width: 2,
            encoding: "mono8".into(),
            step: 2,
            data,
            ..Default::default()
        };
        RawMessage::new(
            "/camera/image",
            0,
            "sensor_msgs/msg/Image",
            SerializationFormat::Bincode.encode(&img).unwrap(),
        )
    }

    #[test]
    fn test_pixels_copied() {
        let mut n = ImageNormalizer::new("cam", SerializationFormat::Bincode, Pose::IDENTITY);
        let out = n.normalize(&image(vec![1, 2, 3, 4])).unwrap();
        let NormalizedRecord::Image(r) = &out[0] else {
            panic!("expected image");
        };
        assert_eq!(r.data, vec![1, 2, 3, 4]);
        assert_eq!(r.encoding, "mono8");
    }

    #[test]
    fn test_short_buffer_is_fatal() {
        let mut n = ImageNormalizer::new("cam", SerializationFormat::Bincode, Pose::IDENTITY);
        let err = n.normalize(&image(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, ContractError::Normalize { .. }));
    }
}
