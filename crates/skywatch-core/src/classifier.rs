//! Coarse aircraft classification from speed and altitude.
//!
//! Thresholds (knots):
//! - < 120 kt: small propeller aircraft
//! - 120-350 kt: commercial/private jet
//! - 350-600 kt: high-performance (possibly military)
//! - >= 600 kt: fighter/attack aircraft

use serde::{Deserialize, Serialize};

const SMALL_PROP_MAX_KT: f64 = 120.0;
const AIRLINER_MAX_KT: f64 = 350.0;
const HIGH_PERFORMANCE_MAX_KT: f64 = 600.0;

/// Below this altitude a slow track no longer reads as an en-route
/// small aircraft.
const VERY_LOW_ALTITUDE_FT: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    SmallProp,
    Airliner,
    HighPerformance,
    Fighter,
    Helicopter,
    Unknown,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::SmallProp => "small-prop",
            Classification::Airliner => "airliner",
            Classification::HighPerformance => "high-performance",
            Classification::Fighter => "fighter",
            Classification::Helicopter => "helicopter",
            Classification::Unknown => "unknown",
        }
    }

    /// Inverse of `as_str`; unrecognized labels map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "small-prop" => Classification::SmallProp,
            "airliner" => Classification::Airliner,
            "high-performance" => Classification::HighPerformance,
            "fighter" => Classification::Fighter,
            "helicopter" => Classification::Helicopter,
            _ => Classification::Unknown,
        }
    }
}

/// Assign a coarse category to a telemetry record.
///
/// Inputs are pre-validated at the ingest boundary; negative or NaN
/// values never reach this function. Speed bands are inclusive of their
/// lower bound.
pub fn classify(altitude_ft: f64, groundspeed_kt: f64, identified: bool) -> Classification {
    // A slow track hugging the ground does not fit the speed ladder: a
    // cooperative one reads as a helicopter, an unidentified one is
    // unclassifiable.
    if groundspeed_kt < SMALL_PROP_MAX_KT && altitude_ft < VERY_LOW_ALTITUDE_FT {
        return if identified {
            Classification::Helicopter
        } else {
            Classification::Unknown
        };
    }

    if groundspeed_kt < SMALL_PROP_MAX_KT {
        Classification::SmallProp
    } else if groundspeed_kt < AIRLINER_MAX_KT {
        Classification::Airliner
    } else if groundspeed_kt < HIGH_PERFORMANCE_MAX_KT {
        Classification::HighPerformance
    } else {
        Classification::Fighter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_ladder_bands() {
        assert_eq!(classify(3529.0, 60.0, true), Classification::SmallProp);
        assert_eq!(classify(35000.0, 119.9, true), Classification::SmallProp);
        assert_eq!(classify(35000.0, 120.0, true), Classification::Airliner);
        assert_eq!(classify(35000.0, 349.9, true), Classification::Airliner);
        assert_eq!(classify(35000.0, 350.0, true), Classification::HighPerformance);
        assert_eq!(classify(35000.0, 599.9, true), Classification::HighPerformance);
        assert_eq!(classify(35000.0, 600.0, true), Classification::Fighter);
        assert_eq!(classify(25000.0, 780.0, false), Classification::Fighter);
    }

    #[test]
    fn lower_bounds_are_inclusive() {
        assert_eq!(classify(10000.0, 120.0, false), Classification::Airliner);
        assert_eq!(classify(10000.0, 350.0, false), Classification::HighPerformance);
        assert_eq!(classify(10000.0, 600.0, false), Classification::Fighter);
    }

    #[test]
    fn very_low_slow_track_without_identity_is_unknown() {
        assert_eq!(classify(300.0, 40.0, false), Classification::Unknown);
    }

    #[test]
    fn very_low_slow_track_with_identity_is_helicopter() {
        assert_eq!(classify(300.0, 40.0, true), Classification::Helicopter);
    }

    #[test]
    fn serializes_kebab_case() {
        let json = serde_json::to_string(&Classification::SmallProp).unwrap();
        assert_eq!(json, "\"small-prop\"");
        let json = serde_json::to_string(&Classification::HighPerformance).unwrap();
        assert_eq!(json, "\"high-performance\"");
    }
}
