//! Weighted threat scoring with human-readable reasons.
//!
//! The score is a deterministic function of its inputs; the deduper
//! relies on that.

use serde::{Deserialize, Serialize};

use crate::classifier::Classification;
use crate::models::ThreatLevel;

/// Signal weights and thresholds for the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatWeights {
    pub zone_intrusion: u8,
    pub no_transponder: u8,
    pub high_speed: u8,
    pub military_class: u8,
    pub low_altitude_intrusion: u8,
    /// Speed above which the high-speed signal fires, in knots.
    pub high_speed_threshold_kt: f64,
    /// Altitude below which a zone intrusion counts as low, in feet.
    pub low_altitude_ft: f64,
}

impl Default for ThreatWeights {
    fn default() -> Self {
        Self {
            zone_intrusion: 40,
            no_transponder: 25,
            high_speed: 15,
            military_class: 10,
            low_altitude_intrusion: 10,
            high_speed_threshold_kt: 400.0,
            low_altitude_ft: 5000.0,
        }
    }
}

/// Result of a threat evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreatAssessment {
    pub score: u8,
    pub level: ThreatLevel,
    pub reasons: Vec<String>,
    pub recommended_action: &'static str,
}

/// Compute the weighted threat score and its explanation.
pub fn assess(
    in_restricted_area: bool,
    identified: bool,
    classification: Classification,
    groundspeed_kt: f64,
    altitude_ft: f64,
    weights: &ThreatWeights,
) -> ThreatAssessment {
    let mut score: u32 = 0;
    let mut reasons = Vec::new();

    if in_restricted_area {
        score += weights.zone_intrusion as u32;
        reasons.push("Inside restricted zone".to_string());
    }
    if !identified {
        score += weights.no_transponder as u32;
        reasons.push("No transponder signal".to_string());
    }
    if groundspeed_kt > weights.high_speed_threshold_kt {
        score += weights.high_speed as u32;
        reasons.push(format!("High speed ({:.0} kt)", groundspeed_kt));
    }
    // Fighters read as military outright; a high-performance profile only
    // does when no cooperative identity vouches for it.
    let military = match classification {
        Classification::Fighter => true,
        Classification::HighPerformance => !identified,
        _ => false,
    };
    if military {
        score += weights.military_class as u32;
        reasons.push("Military aircraft type".to_string());
    }
    if in_restricted_area && altitude_ft < weights.low_altitude_ft {
        score += weights.low_altitude_intrusion as u32;
        reasons.push("Low altitude in zone".to_string());
    }

    let score = score.min(100) as u8;
    let level = level_for(score);

    ThreatAssessment {
        score,
        level,
        reasons,
        recommended_action: recommended_action(level),
    }
}

/// Category mapping for a clamped score.
pub fn level_for(score: u8) -> ThreatLevel {
    if score >= 70 {
        ThreatLevel::Critical
    } else if score >= 50 {
        ThreatLevel::High
    } else if score >= 25 {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

/// Fixed action table per category.
pub fn recommended_action(level: ThreatLevel) -> &'static str {
    match level {
        ThreatLevel::Low => "No action required",
        ThreatLevel::Medium => "Continue monitoring",
        ThreatLevel::High => "Monitor and contact via radio",
        ThreatLevel::Critical => "Activate response protocol",
    }
}
