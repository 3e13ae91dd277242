//! Depth camera normalizer
//!
//! Fuses a `32FC1` depth image with its `CameraInfo` into a range image.
//! Used as the fusion step of a two-channel synchronizer.

use contracts::{
    msgs, CameraIntrinsics, ContractError, NormalizedRecord, Pose, Quaternion, RangeImage,
    RawMessage, SerializationFormat, Vector3,
};

use crate::normalizers::common::NormalizerContext;

/// Only float depth images are converted
pub const DEPTH_ENCODING: &str = "32FC1";

/// Metres per stored range unit
pub const RANGE_UNITS: f32 = 1e-3;

/// Rotates the optical frame (z forward, x right) into the x-forward body frame
pub const OPTICAL_TO_BODY: Quaternion = Quaternion::new(0.5, 0.5, -0.5, 0.5);

#[derive(Debug)]
pub struct RangeImageNormalizer {
    ctx: NormalizerContext,
    range_is_depth: bool,
}

impl RangeImageNormalizer {
    pub fn new(label: impl Into<String>, format: SerializationFormat, range_is_depth: bool) -> Self {
        let sensor_pose = Pose::new(Vector3::new(0.0, 0.0, 0.0), OPTICAL_TO_BODY);
        Self {
            ctx: NormalizerContext::new(label, format, sensor_pose),
            range_is_depth,
        }
    }

    pub fn label(&self) -> &str {
        &self.ctx.label
    }

    /// Fusion entry point: `slots` is `[depth, camera_info]`
    pub fn fuse(&mut self, slots: &[RawMessage]) -> Result<Vec<NormalizedRecord>, ContractError> {
        match slots {
            [depth, info] => self.normalize_pair(depth, info),
            _ => Err(self.ctx.hard_fail(format!(
                "expected depth and camera_info messages, got {}",
                slots.len()
            ))),
        }
    }

    pub fn normalize_pair(
        &mut self,
        depth: &RawMessage,
        info: &RawMessage,
    ) -> Result<Vec<NormalizedRecord>, ContractError> {
        let image: msgs::Image = self.ctx.format.decode(&depth.channel_id, &depth.payload)?;
        let camera: msgs::CameraInfo = self.ctx.format.decode(&info.channel_id, &info.payload)?;

        if image.encoding != DEPTH_ENCODING {
            self.ctx.warn_once(
                "encoding",
                &format!(
                    "depth encoding '{}' is not {DEPTH_ENCODING}, skipping range images",
                    image.encoding
                ),
            );
            return Ok(Vec::new());
        }

        let ranges = self.ranges(&image)?;
        let record = RangeImage {
            sensor_label: self.ctx.label.clone(),
            timestamp: image.header.stamp_ns,
            sensor_pose: self.ctx.sensor_pose,
            rows: image.height,
            columns: image.width,
            ranges,
            range_units: RANGE_UNITS,
            range_is_depth: self.range_is_depth,
            intrinsics: intrinsics(&image, &camera),
        };
        Ok(vec![record.into()])
    }

    /// Row-major millimetre ranges; non-finite or negative depths become 0
    fn ranges(&self, image: &msgs::Image) -> Result<Vec<u16>, ContractError> {
        let (rows, cols, step) = (image.height as usize, image.width as usize, image.step as usize);
        if rows == 0 || cols == 0 {
            return Ok(Vec::new());
        }
        if step < cols * 4 {
            return Err(self.ctx.hard_fail(format!(
                "row step {step} too small for {cols} float pixels"
            )));
        }
        if image.data.len() < rows * step {
            return Err(self.ctx.hard_fail(format!(
                "depth buffer holds {} bytes, {rows} rows of {step} bytes need {}",
                image.data.len(),
                rows * step
            )));
        }

        let mut ranges = Vec::with_capacity(rows * cols);
        for row in image.data.chunks_exact(step).take(rows) {
            for px in row[..cols * 4].chunks_exact(4) {
                let raw: u32 = bytemuck::pod_read_unaligned(px);
                let bits = if image.is_bigendian {
                    u32::from_be(raw)
                } else {
                    u32::from_le(raw)
                };
                let metres = f32::from_bits(bits);
                let value = if metres.is_finite() {
                    (metres / RANGE_UNITS).round() as u16
                } else {
                    0
                };
                ranges.push(value);
            }
        }
        Ok(ranges)
    }
}

fn intrinsics(image: &msgs::Image, camera: &msgs::CameraInfo) -> CameraIntrinsics {
    let mut distortion = [0.0; 5];
    for (dst, src) in distortion.iter_mut().zip(&camera.d) {
        *dst = *src;
    }
    CameraIntrinsics {
        width: image.width,
        height: image.height,
        fx: camera.k[0],
        fy: camera.k[4],
        cx: camera.k[2],
        cy: camera.k[5],
        distortion,
    }
}
