//! Short-horizon trajectory prediction.
//!
//! Constant-velocity extrapolation in equirectangular form. Anything
//! richer is deliberately out of scope; the predictor is stateless.

use serde::{Deserialize, Serialize};

use crate::models::TrajectoryPoint;

/// Knots to degrees-per-second at the equator (60 NM per degree,
/// 3600 seconds per hour).
const KNOTS_PER_DEG_SEC: f64 = 216_000.0;

/// Denominator floor for the longitude correction near the poles.
const MIN_COS_LAT: f64 = 1e-6;

/// Prediction horizon and sampling stride.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    pub horizon_s: u32,
    pub stride_s: u32,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            horizon_s: 180,
            stride_s: 30,
        }
    }
}

/// Extrapolate the future path from current kinematics.
///
/// Samples at t = 0, stride, ... below the horizon (6 samples at the
/// defaults). Never fails; a track at the pole clamps the longitude
/// denominator instead.
pub fn predict(
    latitude: f64,
    longitude: f64,
    groundspeed_kt: f64,
    track_deg: f64,
    config: &TrajectoryConfig,
) -> Vec<TrajectoryPoint> {
    let stride = config.stride_s.max(1);
    let speed_deg_per_sec = groundspeed_kt / KNOTS_PER_DEG_SEC;
    let track_rad = track_deg.to_radians();
    let cos_lat = latitude.to_radians().cos().max(MIN_COS_LAT);

    (0..config.horizon_s)
        .step_by(stride as usize)
        .map(|offset| {
            let t = offset as f64;
            let dlat = speed_deg_per_sec * track_rad.cos() * t;
            let dlon = speed_deg_per_sec * track_rad.sin() * t / cos_lat;
            TrajectoryPoint(latitude + dlat, longitude + dlon, t)
        })
        .collect()
}
