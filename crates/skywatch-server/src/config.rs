//! Server configuration from environment.

use std::env;
use std::str::FromStr;

use skywatch_core::environment::DetectionConfig;
use skywatch_core::threat::ThreatWeights;
use skywatch_core::trajectory::TrajectoryConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bootstrap_email: String,
    pub bootstrap_password: String,
    /// High-speed scoring threshold in knots.
    pub high_speed_kt: f64,
    pub trajectory_horizon_s: u32,
    pub trajectory_stride_s: u32,
    pub flight_retention_hours: i64,
    pub alert_retention_days: i64,
    pub retention_sweep_secs: u64,
    /// Seconds without telemetry before an open alert auto-closes.
    pub alert_idle_secs: u64,
    pub ingest_deadline_ms: u64,
    /// Per-subscriber push buffer capacity.
    pub ws_buffer: usize,
    /// Seconds a subscriber may stay full before it is disconnected.
    pub ws_grace_secs: u64,
    pub radar_latitude: f64,
    pub radar_longitude: f64,
    pub radar_range_km: f64,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env_parse("SKYWATCH_PORT", 3000),
            database_path: env_string("SKYWATCH_DB_PATH", "data/skywatch.db"),
            database_max_connections: env_parse("SKYWATCH_DB_MAX_CONNECTIONS", 5),
            jwt_secret: env_string("SKYWATCH_JWT_SECRET", "dev-secret-change-me"),
            jwt_expiry_hours: env_parse("SKYWATCH_JWT_EXPIRY_HOURS", 12),
            bootstrap_email: env_string("SKYWATCH_BOOTSTRAP_EMAIL", "admin@example.com"),
            bootstrap_password: env_string("SKYWATCH_BOOTSTRAP_PASSWORD", "strongpassword"),
            high_speed_kt: env_parse("SKYWATCH_HIGH_SPEED_KT", 400.0),
            trajectory_horizon_s: env_parse("SKYWATCH_TRAJECTORY_HORIZON_S", 180),
            trajectory_stride_s: env_parse("SKYWATCH_TRAJECTORY_STRIDE_S", 30),
            flight_retention_hours: env_parse("SKYWATCH_FLIGHT_RETENTION_HOURS", 24),
            alert_retention_days: env_parse("SKYWATCH_ALERT_RETENTION_DAYS", 30),
            retention_sweep_secs: env_parse("SKYWATCH_RETENTION_SWEEP_SECS", 60),
            alert_idle_secs: env_parse("SKYWATCH_ALERT_IDLE_SECS", 120),
            ingest_deadline_ms: env_parse("SKYWATCH_INGEST_DEADLINE_MS", 2000),
            ws_buffer: env_parse("SKYWATCH_WS_BUFFER", 64),
            ws_grace_secs: env_parse("SKYWATCH_WS_GRACE_SECS", 30),
            radar_latitude: env_parse("SKYWATCH_RADAR_LAT", 11.65),
            radar_longitude: env_parse("SKYWATCH_RADAR_LON", 78.15),
            radar_range_km: env_parse("SKYWATCH_RADAR_RANGE_KM", 250.0),
        }
    }

    pub fn threat_weights(&self) -> ThreatWeights {
        ThreatWeights {
            high_speed_threshold_kt: self.high_speed_kt,
            ..ThreatWeights::default()
        }
    }

    pub fn trajectory_config(&self) -> TrajectoryConfig {
        TrajectoryConfig {
            horizon_s: self.trajectory_horizon_s,
            stride_s: self.trajectory_stride_s,
        }
    }

    pub fn detection_config(&self) -> DetectionConfig {
        DetectionConfig {
            radar_latitude: self.radar_latitude,
            radar_longitude: self.radar_longitude,
            max_range_km: self.radar_range_km,
        }
    }
}
