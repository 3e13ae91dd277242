//! Multi-ring lidar normalizer
//!
//! Organises the cloud as a range image: one row per ring, one column per
//! azimuth bin. The number of columns is the largest per-ring point count.
//! Returns that fall into an occupied cell are dropped and reported once.

use std::f64::consts::PI;

use contracts::{msgs, ContractError, NormalizedRecord, RecordKind, RotatingScan};

use crate::normalizers::common::{xyz_readers, CloudLayout, FieldReader, NormalizerContext};

/// Highest supported ring count
pub const MAX_RINGS: usize = 1024;

fn rotating_scan_to_records(
    ctx: &mut NormalizerContext,
    cloud: msgs::PointCloud2,
) -> Result<Vec<NormalizedRecord>, ContractError> {
    let xyz = xyz_readers(ctx, &cloud)?;
    let (Some([x, y, z]), Some(ring_field)) = (xyz, cloud.field("ring")) else {
        ctx.warn_once(
            "missing_ring",
            "cloud lacks x/y/z/ring fields, cannot build a rotating scan",
        );
        return Ok(Vec::new());
    };
    let ring = FieldReader::new(ring_field, cloud.point_step as usize, cloud.is_bigendian)
        .ok_or_else(|| ctx.hard_fail("ring field does not fit the point stride"))?;
    let intensity = cloud
        .field("intensity")
        .and_then(|f| FieldReader::new(f, cloud.point_step as usize, cloud.is_bigendian));
    let layout = CloudLayout::of(ctx, &cloud)?;

    // (ring, azimuth, range, intensity) of every finite return
    let mut returns = Vec::with_capacity(layout.len());
    let mut per_ring = vec![0usize; MAX_RINGS];
    let mut rows = 0usize;
    for point in layout.points(&cloud.data) {
        let r = ring.read(point);
        if !(r >= 0.0 && (r as usize) < MAX_RINGS) {
            return Err(ctx.hard_fail(format!("ring index {r} outside 0..{MAX_RINGS}")));
        }
        let r = r as usize;
        let (px, py, pz) = (x.read(point), y.read(point), z.read(point));
        if !(px.is_finite() && py.is_finite() && pz.is_finite()) {
            continue;
        }
        rows = rows.max(r + 1);
        per_ring[r] += 1;
        let range = (px * px + py * py + pz * pz).sqrt();
        let azimuth = py.atan2(px);
        let value = intensity.map_or(0.0, |i| i.read(point) as f32);
        returns.push((r, azimuth, range as f32, value));
    }

    let columns = per_ring.iter().copied().max().unwrap_or(0);
    let mut ranges = vec![0.0f32; rows * columns];
    let mut intensities = if intensity.is_some() {
        vec![0.0f32; rows * columns]
    } else {
        Vec::new()
    };

    let mut occupied = vec![false; rows * columns];
    let mut collisions = 0usize;
    for (r, azimuth, range, value) in returns {
        let cell = r * columns + azimuth_bin(azimuth, columns);
        // first return wins a shared cell
        if occupied[cell] {
            collisions += 1;
            continue;
        }
        occupied[cell] = true;
        ranges[cell] = range;
        if let Some(slot) = intensities.get_mut(cell) {
            *slot = value;
        }
    }
    if collisions > 0 {
        ctx.warn_once(
            "azimuth_collision",
            &format!("{collisions} returns shared an azimuth cell and were dropped"),
        );
    }

    let record = RotatingScan {
        sensor_label: ctx.label.clone(),
        timestamp: cloud.header.stamp_ns,
        sensor_pose: ctx.sensor_pose,
        rows,
        columns,
        ranges,
        intensities,
    };
    Ok(vec![record.into()])
}

/// Column of an azimuth in `[-pi, pi]`
fn azimuth_bin(azimuth: f64, columns: usize) -> usize {
    let t = (azimuth + PI) / (2.0 * PI);
    ((t * columns as f64) as usize).min(columns.saturating_sub(1))
}

define_normalizer!(
    RotatingScanNormalizer,
    RecordKind::RotatingScan,
    msgs::PointCloud2,
    rotating_scan_to_records
);
