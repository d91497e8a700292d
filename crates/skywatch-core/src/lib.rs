//! Skywatch Core - Pure logic for airspace monitoring
//!
//! This crate contains the domain models and assessment pipeline stages
//! with NO networking or storage dependencies.

pub mod classifier;
pub mod environment;
pub mod geometry;
pub mod models;
pub mod threat;
pub mod trajectory;

pub use classifier::{classify, Classification};
pub use geometry::{GeometryError, RegionGeometry};
pub use models::{Alert, Flight, PushEvent, RestrictedRegion, TelemetryReport, ThreatLevel, TrajectoryPoint};
pub use threat::{ThreatAssessment, ThreatWeights};
pub use trajectory::TrajectoryConfig;
