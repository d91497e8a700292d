//! Core data models for the airspace monitoring system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::Classification;

/// A raw position report as posted by a telemetry source.
///
/// Field names follow the wire format; internal names carry units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReport {
    #[serde(default)]
    pub transponder_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude in feet
    #[serde(rename = "altitude")]
    pub altitude_ft: f64,
    /// Ground speed in knots
    #[serde(rename = "groundspeed")]
    pub groundspeed_kt: f64,
    /// Heading/track in degrees [0, 360)
    #[serde(rename = "track")]
    pub track_deg: f64,
}

impl TelemetryReport {
    /// Validate the report against the accepted ranges.
    /// Returns a list of violations (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            errors.push(format!("latitude {} out of range [-90, 90]", self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            errors.push(format!("longitude {} out of range [-180, 180]", self.longitude));
        }
        if !self.altitude_ft.is_finite() || self.altitude_ft < 0.0 {
            errors.push(format!("altitude {} must be a non-negative number", self.altitude_ft));
        }
        if !self.groundspeed_kt.is_finite() || self.groundspeed_kt < 0.0 {
            errors.push(format!("groundspeed {} must be a non-negative number", self.groundspeed_kt));
        }
        if !self.track_deg.is_finite() || !(0.0..360.0).contains(&self.track_deg) {
            errors.push(format!("track {} out of range [0, 360)", self.track_deg));
        }

        errors
    }

    /// The cooperative identity of the report, if any.
    ///
    /// A missing id, an empty string, or the literal "UNKNOWN" all mean
    /// the track is unidentified.
    pub fn identity(&self) -> Option<&str> {
        match self.transponder_id.as_deref() {
            None | Some("") | Some("UNKNOWN") => None,
            Some(id) => Some(id),
        }
    }
}

/// One predicted position sample, serialized as `[lat, lon, offset_seconds]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint(pub f64, pub f64, pub f64);

impl TrajectoryPoint {
    pub fn latitude(&self) -> f64 {
        self.0
    }

    pub fn longitude(&self) -> f64 {
        self.1
    }

    pub fn offset_s(&self) -> f64 {
        self.2
    }
}

/// Threat category for a track or alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Alert-worthy categories per the dedup rule.
    pub fn is_alerting(&self) -> bool {
        matches!(self, ThreatLevel::High | ThreatLevel::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "Low",
            ThreatLevel::Medium => "Medium",
            ThreatLevel::High => "High",
            ThreatLevel::Critical => "Critical",
        }
    }

    /// Inverse of `as_str`; unrecognized labels map to `Low`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Critical" => ThreatLevel::Critical,
            "High" => ThreatLevel::High,
            "Medium" => ThreatLevel::Medium,
            _ => ThreatLevel::Low,
        }
    }
}

/// A single telemetry observation with derived fields attached.
///
/// Created by the ingest pipeline, never mutated afterwards; expires by
/// rolling retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: i64,
    pub transponder_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "altitude")]
    pub altitude_ft: f64,
    #[serde(rename = "groundspeed")]
    pub groundspeed_kt: f64,
    #[serde(rename = "track")]
    pub track_deg: f64,
    pub classification: Classification,
    pub threat_level: ThreatLevel,
    /// Weighted threat score on [0, 100]
    pub threat_score: u8,
    pub detection_confidence: f64,
    pub signal_strength: f64,
    pub weather_condition: String,
    pub in_restricted_area: bool,
    pub predicted_trajectory: Vec<TrajectoryPoint>,
}

impl Flight {
    /// Key under which this record appears in the latest-per-identity
    /// snapshot. Unidentified tracks cannot be correlated with each other,
    /// so each keeps its own slot.
    pub fn snapshot_key(&self) -> String {
        match self.transponder_id.as_deref() {
            Some(id) => id.to_string(),
            None => format!("unidentified-{}", self.id),
        }
    }
}

/// An operator-defined restricted airspace polygon.
///
/// The geometry travels as serialized GeoJSON; the parsed form is cached
/// by the server and never rebuilt on the hot path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictedRegion {
    pub id: i64,
    pub name: String,
    pub polygon_json: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to create a new restricted region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRegionRequest {
    pub name: String,
    pub polygon_json: String,
}

/// A persisted record that an elevated threat has been observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub flight_id: i64,
    pub transponder_id: Option<String>,
    pub severity: ThreatLevel,
    pub message: String,
    pub threat_reasons: Vec<String>,
    pub recommended_action: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// Operator role for access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Analyst,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Analyst => "analyst",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// An operator account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Envelope pushed to live subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    Alert(Alert),
    AlertResolved(Alert),
    TrackUpdate(Flight),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> TelemetryReport {
        TelemetryReport {
            transponder_id: Some("AI301".to_string()),
            latitude: 11.45,
            longitude: 77.85,
            altitude_ft: 35000.0,
            groundspeed_kt: 450.0,
            track_deg: 45.0,
        }
    }

    #[test]
    fn valid_report_passes() {
        assert!(report().validate().is_empty());
    }

    #[test]
    fn out_of_range_fields_are_reported() {
        let mut t = report();
        t.latitude = 123.456;
        t.track_deg = 360.0;
        let errors = t.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn non_finite_fields_are_rejected() {
        let mut t = report();
        t.groundspeed_kt = f64::NAN;
        assert_eq!(t.validate().len(), 1);
        t.altitude_ft = f64::INFINITY;
        assert_eq!(t.validate().len(), 2);
    }

    #[test]
    fn unknown_literal_means_unidentified() {
        let mut t = report();
        assert_eq!(t.identity(), Some("AI301"));
        t.transponder_id = Some("UNKNOWN".to_string());
        assert_eq!(t.identity(), None);
        t.transponder_id = None;
        assert_eq!(t.identity(), None);
    }

    #[test]
    fn trajectory_point_serializes_as_triple() {
        let json = serde_json::to_string(&TrajectoryPoint(11.5, 78.1, 30.0)).unwrap();
        assert_eq!(json, "[11.5,78.1,30.0]");
    }

    #[test]
    fn push_event_envelope_shape() {
        let flight = Flight {
            id: 1,
            transponder_id: None,
            timestamp: Utc::now(),
            latitude: 0.0,
            longitude: 0.0,
            altitude_ft: 0.0,
            groundspeed_kt: 0.0,
            track_deg: 0.0,
            classification: Classification::Unknown,
            threat_level: ThreatLevel::Low,
            threat_score: 0,
            detection_confidence: 100.0,
            signal_strength: 100.0,
            weather_condition: "Clear".to_string(),
            in_restricted_area: false,
            predicted_trajectory: vec![],
        };
        let value = serde_json::to_value(PushEvent::TrackUpdate(flight)).unwrap();
        assert_eq!(value["type"], "track_update");
        assert!(value["data"]["id"].is_i64());
    }
}
