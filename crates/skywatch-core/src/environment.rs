//! Environmental conditions and detection simulation.
//!
//! Models what a ground radar would report for a track: weather, signal
//! strength after interference, and detection confidence. These values
//! decorate the track record; the threat score never reads them.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Radar site parameters for the detection model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub radar_latitude: f64,
    pub radar_longitude: f64,
    pub max_range_km: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            radar_latitude: 11.65,
            radar_longitude: 78.15,
            max_range_km: 250.0,
        }
    }
}

/// Sampled weather affecting detection quality.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSample {
    pub condition: &'static str,
    pub visibility_km: f64,
}

const CONDITIONS: [(&str, f64, f64); 6] = [
    ("Clear", 10.0, 20.0),
    ("Partly Cloudy", 8.0, 12.0),
    ("Cloudy", 5.0, 10.0),
    ("Rain", 2.0, 6.0),
    ("Storm", 0.5, 3.0),
    ("Fog", 0.2, 2.0),
];

/// Draw current weather conditions.
pub fn sample_weather<R: Rng>(rng: &mut R) -> WeatherSample {
    let (condition, lo, hi) = CONDITIONS[rng.gen_range(0..CONDITIONS.len())];
    WeatherSample {
        condition,
        visibility_km: rng.gen_range(lo..hi),
    }
}

/// Detection quality for one track, both on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionReport {
    pub signal_strength: f64,
    pub detection_confidence: f64,
}

/// Simulate radar detection of a track and degrade it by weather.
pub fn simulate_detection<R: Rng>(
    latitude: f64,
    longitude: f64,
    altitude_ft: f64,
    weather: &WeatherSample,
    config: &DetectionConfig,
    rng: &mut R,
) -> DetectionReport {
    // Distance from the radar site in km, small-angle approximation.
    let dlat_km = (latitude - config.radar_latitude) * 111.0;
    let dlon_km = (longitude - config.radar_longitude) * 111.0 * latitude.to_radians().cos();
    let distance_km = dlat_km.hypot(dlon_km);

    // Returns fall off with range; very low tracks sit in ground clutter.
    let base_strength = (1.0 - distance_km / config.max_range_km).max(0.0);
    let altitude_factor = if altitude_ft > 1000.0 {
        1.0
    } else {
        0.5 + altitude_ft / 2000.0
    };
    let strength = base_strength * altitude_factor * rng.gen_range(0.85..1.0);

    let mut interference: f64 = match weather.condition {
        "Storm" => 0.3,
        "Fog" => 0.25,
        "Rain" => 0.15,
        _ => 0.0,
    };
    if weather.visibility_km < 5.0 {
        interference += 0.1;
    }
    if altitude_ft > 50_000.0 {
        interference += 0.1;
    } else if altitude_ft < 500.0 {
        interference += 0.15;
    }

    let signal_strength = (strength * (1.0 - interference)).max(0.0) * 100.0;
    let detection_confidence = (signal_strength * 1.2).min(100.0);

    DetectionReport {
        signal_strength,
        detection_confidence,
    }
}
