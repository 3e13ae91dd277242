//! Normalizer common utility functions

use std::collections::HashSet;

use contracts::msgs::{point_field, PointCloud2, PointField};
use contracts::{ContractError, Pose, SerializationFormat};
use tracing::warn;

/// Remembers which notices were already logged.
///
/// Scoped to one normalizer instance, so one notice per sensor per run.
#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: HashSet<&'static str>,
}

impl WarnOnce {
    /// `true` the first time `key` is seen
    pub fn first(&mut self, key: &'static str) -> bool {
        self.seen.insert(key)
    }
}

/// Per-sensor state shared by all normalizer kinds
#[derive(Debug)]
pub struct NormalizerContext {
    pub label: String,
    pub format: SerializationFormat,
    pub sensor_pose: Pose,
    pub warned: WarnOnce,
}

impl NormalizerContext {
    pub fn new(label: impl Into<String>, format: SerializationFormat, sensor_pose: Pose) -> Self {
        Self {
            label: label.into(),
            format,
            sensor_pose,
            warned: WarnOnce::default(),
        }
    }

    /// Log a downgrade notice, at most once per `key`
    pub fn warn_once(&mut self, key: &'static str, message: &str) {
        if self.warned.first(key) {
            warn!(sensor = %self.label, "{}", message);
        }
    }

    /// Fatal error for this sensor
    pub fn hard_fail(&self, message: impl Into<String>) -> ContractError {
        ContractError::normalize(&self.label, message)
    }
}

/// Byte size of a `PointField` datatype
pub fn datatype_size(datatype: u8) -> Option<usize> {
    match datatype {
        point_field::INT8 | point_field::UINT8 => Some(1),
        point_field::INT16 | point_field::UINT16 => Some(2),
        point_field::INT32 | point_field::UINT32 | point_field::FLOAT32 => Some(4),
        point_field::FLOAT64 => Some(8),
        _ => None,
    }
}

/// Reads one scalar field out of a point record
#[derive(Debug, Clone, Copy)]
pub struct FieldReader {
    offset: usize,
    datatype: u8,
    big_endian: bool,
}

impl FieldReader {
    /// `None` if the datatype is unknown or the field does not fit in the stride
    pub fn new(field: &PointField, point_step: usize, big_endian: bool) -> Option<Self> {
        let size = datatype_size(field.datatype)?;
        let offset = field.offset as usize;
        if offset.checked_add(size)? > point_step {
            return None;
        }
        Some(Self {
            offset,
            datatype: field.datatype,
            big_endian,
        })
    }

    /// `point` must be at least one stride long
    pub fn read(&self, point: &[u8]) -> f64 {
        let o = self.offset;
        match self.datatype {
            point_field::INT8 => point[o] as i8 as f64,
            point_field::UINT8 => point[o] as f64,
            point_field::INT16 => self.u16_at(point) as i16 as f64,
            point_field::UINT16 => self.u16_at(point) as f64,
            point_field::INT32 => self.u32_at(point) as i32 as f64,
            point_field::UINT32 => self.u32_at(point) as f64,
            point_field::FLOAT32 => f32::from_bits(self.u32_at(point)) as f64,
            _ => f64::from_bits(self.u64_at(point)),
        }
    }

    fn u16_at(&self, point: &[u8]) -> u16 {
        let raw: u16 = bytemuck::pod_read_unaligned(&point[self.offset..self.offset + 2]);
        if self.big_endian {
            u16::from_be(raw)
        } else {
            u16::from_le(raw)
        }
    }

    fn u32_at(&self, point: &[u8]) -> u32 {
        let raw: u32 = bytemuck::pod_read_unaligned(&point[self.offset..self.offset + 4]);
        if self.big_endian {
            u32::from_be(raw)
        } else {
            u32::from_le(raw)
        }
    }

    fn u64_at(&self, point: &[u8]) -> u64 {
        let raw: u64 = bytemuck::pod_read_unaligned(&point[self.offset..self.offset + 8]);
        if self.big_endian {
            u64::from_be(raw)
        } else {
            u64::from_le(raw)
        }
    }
}

/// Checked geometry of a `PointCloud2` buffer
#[derive(Debug, Clone, Copy)]
pub struct CloudLayout {
    pub width: usize,
    pub height: usize,
    pub point_step: usize,
    pub row_step: usize,
}

impl CloudLayout {
    /// Validate that `data` holds `width * height` points of `point_step` bytes.
    ///
    /// # Errors
    /// Hard failure when the buffer cannot be interpreted.
    pub fn of(ctx: &NormalizerContext, cloud: &PointCloud2) -> Result<Self, ContractError> {
        let width = cloud.width as usize;
        let height = cloud.height as usize;
        let point_step = cloud.point_step as usize;

        if width == 0 || height == 0 {
            return Ok(Self {
                width: 0,
                height: 0,
                point_step,
                row_step: 0,
            });
        }
        if point_step == 0 {
            return Err(ctx.hard_fail("point_step is zero for a non-empty cloud"));
        }

        let packed_row = width
            .checked_mul(point_step)
            .ok_or_else(|| ctx.hard_fail("cloud row size overflows"))?;
        let row_step = (cloud.row_step as usize).max(packed_row);
        let needed = row_step
            .checked_mul(height - 1)
            .and_then(|n| n.checked_add(packed_row))
            .ok_or_else(|| ctx.hard_fail("cloud size overflows"))?;

        if cloud.data.len() < needed {
            return Err(ctx.hard_fail(format!(
                "cloud buffer holds {} bytes, {}x{} points of {} bytes need {}",
                cloud.data.len(),
                width,
                height,
                point_step,
                needed
            )));
        }

        Ok(Self {
            width,
            height,
            point_step,
            row_step,
        })
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point records in row-major order
    pub fn points<'a>(&self, data: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
        let Self {
            width,
            height,
            point_step,
            row_step,
        } = *self;
        (0..height).flat_map(move |row| {
            (0..width).map(move |col| {
                let start = row * row_step + col * point_step;
                &data[start..start + point_step]
            })
        })
    }
}

/// Readers for the mandatory x/y/z fields.
///
/// `Ok(None)` when a field is absent; a present but unreadable field is a
/// hard failure.
pub fn xyz_readers(
    ctx: &NormalizerContext,
    cloud: &PointCloud2,
) -> Result<Option<[FieldReader; 3]>, ContractError> {
    let (Some(x), Some(y), Some(z)) = (cloud.field("x"), cloud.field("y"), cloud.field("z")) else {
        return Ok(None);
    };

    let reader = |field: &PointField| {
        FieldReader::new(field, cloud.point_step as usize, cloud.is_bigendian).ok_or_else(|| {
            ctx.hard_fail(format!(
                "field '{}' (datatype {}, offset {}) does not fit point_step {}",
                field.name, field.datatype, field.offset, cloud.point_step
            ))
        })
    };

    Ok(Some([reader(x)?, reader(y)?, reader(z)?]))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> NormalizerContext {
        NormalizerContext::new("test", SerializationFormat::Bincode, Pose::IDENTITY)
    }

    #[test]
    fn test_warn_once() {
        let mut once = WarnOnce::default();
        assert!(once.first("a"));
        assert!(!once.first("a"));
        assert!(once.first("b"));
    }

    proptest::proptest! {
        #[test]
        fn prop_warn_once_fires_once_per_key(keys in proptest::collection::vec(0usize..4, 0..64)) {
            const NAMES: [&str; 4] = ["a", "b", "c", "d"];
            let mut once = WarnOnce::default();
            let fired = keys.iter().filter(|&&k| once.first(NAMES[k])).count();
            let distinct = keys.iter().collect::<HashSet<_>>().len();
            proptest::prop_assert_eq!(fired, distinct);
        }
    }

    #[test]
    fn test_field_reader_endianness() {
        let le = FieldReader::new(&testing::field("v", 2, point_field::UINT16), 4, false).unwrap();
        let be = FieldReader::new(&testing::field("v", 2, point_field::UINT16), 4, true).unwrap();
        let point = [0u8, 0, 0x01, 0x02];
        assert_eq!(le.read(&point), 0x0201 as f64);
        assert_eq!(be.read(&point), 0x0102 as f64);
    }

    #[test]
    fn test_field_reader_types() {
        let mut point = Vec::new();
        point.extend_from_slice(&(-2.5f32).to_le_bytes());
        point.extend_from_slice(&7.25f64.to_le_bytes());
        point.push(0xff);

        let f32_reader = FieldReader::new(&testing::field("a", 0, point_field::FLOAT32), 13, false).unwrap();
        let f64_reader = FieldReader::new(&testing::field("b", 4, point_field::FLOAT64), 13, false).unwrap();
        let i8_reader = FieldReader::new(&testing::field("c", 12, point_field::INT8), 13, false).unwrap();
        assert_eq!(f32_reader.read(&point), -2.5);
        assert_eq!(f64_reader.read(&point), 7.25);
        assert_eq!(i8_reader.read(&point), -1.0);
    }

    #[test]
    fn test_field_outside_stride_rejected() {
        assert!(FieldReader::new(&testing::field("x", 14, point_field::FLOAT32), 16, false).is_none());
        assert!(FieldReader::new(&testing::field("x", 0, 42), 16, false).is_none());
    }

    #[test]
    fn test_layout_short_buffer_is_fatal() {
        let mut cloud = testing::f32_cloud(&["x", "y", "z"], &[vec![1.0, 2.0, 3.0]]);
        cloud.width = 2;
        let err = CloudLayout::of(&ctx(), &cloud).unwrap_err();
        assert!(matches!(err, ContractError::Normalize { .. }));
    }

    #[test]
    fn test_layout_honours_row_padding() {
        let mut cloud = testing::f32_cloud(&["x"], &[vec![1.0], vec![2.0]]);
        // two rows of one point, each row padded to 8 bytes
        cloud.width = 1;
        cloud.height = 2;
        cloud.row_step = 8;
        cloud.data = [1.0f32.to_le_bytes(), [0; 4], 2.0f32.to_le_bytes()].concat();

        let layout = CloudLayout::of(&ctx(), &cloud).unwrap();
        let reader = FieldReader::new(&cloud.fields[0], 4, false).unwrap();
        let xs: Vec<_> = layout.points(&cloud.data).map(|p| reader.read(p)).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }
}
