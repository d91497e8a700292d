//! Telemetry ingest: the assessment pipeline behind POST /v1/telemetry.
//!
//! Per-request synchronous: the client gets its response once the track
//! record is persisted and any resulting alert has been handed to the
//! bus. The whole pipeline runs under a wall-clock deadline.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use skywatch_core::models::{Flight, PushEvent, TelemetryReport};
use skywatch_core::{classifier, environment, threat, trajectory};

use crate::dedup::DedupOutcome;
use crate::error::{ApiError, ApiResult};
use crate::persistence::alerts::NewAlert;
use crate::persistence::{alerts, flights, with_retry};
use crate::state::AppState;

pub async fn ingest_telemetry(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<(StatusCode, Json<Flight>)> {
    // Deserialize by hand so a missing field or wrong type surfaces as
    // the documented 400, not a generic rejection.
    let report: TelemetryReport = serde_json::from_value(payload)
        .map_err(|e| ApiError::InvalidTelemetry(e.to_string()))?;

    let deadline = Duration::from_millis(state.config.ingest_deadline_ms);

    match tokio::time::timeout(deadline, process_report(&state, report)).await {
        Ok(result) => result.map(|flight| (StatusCode::CREATED, Json(flight))),
        Err(_) => Err(ApiError::DeadlineExceeded),
    }
}

async fn process_report(state: &AppState, report: TelemetryReport) -> ApiResult<Flight> {
    let violations = report.validate();
    if !violations.is_empty() {
        return Err(ApiError::InvalidTelemetry(violations.join("; ")));
    }

    let transponder = report.identity().map(str::to_string);
    let identified = transponder.is_some();

    let classification = classifier::classify(report.altitude_ft, report.groundspeed_kt, identified);

    // Containment over the cached region list; first hit wins, its id
    // feeds the dedup key.
    let region = state.containing_region(report.latitude, report.longitude);
    let region_id = region.as_ref().map(|(id, _)| *id);
    let in_restricted_area = region.is_some();

    let predicted_trajectory = trajectory::predict(
        report.latitude,
        report.longitude,
        report.groundspeed_kt,
        report.track_deg,
        &state.config.trajectory_config(),
    );

    let (weather, detection) = {
        let mut rng = rand::thread_rng();
        let weather = environment::sample_weather(&mut rng);
        let detection = environment::simulate_detection(
            report.latitude,
            report.longitude,
            report.altitude_ft,
            &weather,
            &state.config.detection_config(),
            &mut rng,
        );
        (weather, detection)
    };

    let assessment = threat::assess(
        in_restricted_area,
        identified,
        classification,
        report.groundspeed_kt,
        report.altitude_ft,
        &state.config.threat_weights(),
    );

    let mut flight = Flight {
        id: 0,
        transponder_id: transponder.clone(),
        timestamp: Utc::now(),
        latitude: report.latitude,
        longitude: report.longitude,
        altitude_ft: report.altitude_ft,
        groundspeed_kt: report.groundspeed_kt,
        track_deg: report.track_deg,
        classification,
        threat_level: assessment.level,
        threat_score: assessment.score,
        detection_confidence: detection.detection_confidence,
        signal_strength: detection.signal_strength,
        weather_condition: weather.condition.to_string(),
        in_restricted_area,
        predicted_trajectory,
    };

    // The store insert is the atomic commit point.
    let assigned_id = with_retry(|| async { flights::insert_flight(state.db.pool(), &flight).await })
        .await
        .map_err(|_| ApiError::StoreUnavailable)?;
    flight.id = assigned_id;

    state.record_flight(flight.clone());

    let outcome = state.dedup.evaluate(
        transponder.as_deref(),
        region_id,
        assessment.level,
        in_restricted_area,
    );

    match outcome {
        DedupOutcome::Open { key, resolve_first } => {
            if let Some(superseded) = resolve_first {
                resolve_and_publish(state, superseded).await;
            }

            let new_alert = NewAlert {
                flight_id: flight.id,
                transponder_id: transponder.clone(),
                region_id,
                severity: assessment.level,
                message: alert_message(&flight),
                threat_reasons: assessment.reasons.clone(),
                recommended_action: assessment.recommended_action.to_string(),
            };
            match with_retry(|| async { alerts::insert_alert(state.db.pool(), &new_alert).await })
                .await
            {
                Ok(alert) => {
                    state.dedup.confirm(&key, alert.id);
                    tracing::warn!(
                        "ALERT {}: {} (score {})",
                        alert.id,
                        alert.message,
                        flight.threat_score
                    );
                    state.bus.publish(&PushEvent::Alert(alert));
                }
                Err(err) => {
                    state.dedup.abort(&key);
                    tracing::error!("Failed to persist alert for flight {}: {}", flight.id, err);
                    return Err(ApiError::StoreUnavailable);
                }
            }
        }
        DedupOutcome::Closed(alert_ids) => {
            for id in alert_ids {
                resolve_and_publish(state, id).await;
            }
        }
        DedupOutcome::Continuing | DedupOutcome::Idle => {}
    }

    // Publish failures never reach the caller; the record is durable
    // either way.
    state.bus.publish(&PushEvent::TrackUpdate(flight.clone()));

    Ok(flight)
}

/// Resolve a persisted alert and tell subscribers. Failures are logged;
/// the sweep loop picks stragglers up later.
async fn resolve_and_publish(state: &AppState, alert_id: i64) {
    match alerts::resolve(state.db.pool(), alert_id).await {
        Ok(Some((alert, transitioned))) => {
            if transitioned {
                tracing::info!("Alert {} auto-resolved", alert.id);
                state.bus.publish(&PushEvent::AlertResolved(alert));
            }
        }
        Ok(None) => tracing::warn!("Open alert {} missing from store", alert_id),
        Err(err) => tracing::warn!("Failed to resolve alert {}: {}", alert_id, err),
    }
}

/// Human-readable alert headline, in the shape operators see on the feed.
fn alert_message(flight: &Flight) -> String {
    use skywatch_core::classifier::Classification;

    let id = flight.transponder_id.as_deref().unwrap_or("UNKNOWN");
    let headline = match flight.classification {
        Classification::Fighter => format!("Fighter/attack aircraft detected (ID: {})", id),
        Classification::HighPerformance => {
            format!("High-performance aircraft detected (ID: {})", id)
        }
        Classification::Airliner => format!("Commercial aircraft detected (ID: {})", id),
        Classification::SmallProp => format!("Small aircraft detected (ID: {})", id),
        Classification::Helicopter => format!("Helicopter detected (ID: {})", id),
        Classification::Unknown => format!("Unknown aircraft detected (ID: {})", id),
    };

    format!(
        "{}\nThreat level: {} ({}/100)\nLocation: lat {:.4}, lon {:.4}\nAltitude: {:.0} ft | Speed: {:.0} kt",
        headline,
        flight.threat_level.as_str(),
        flight.threat_score,
        flight.latitude,
        flight.longitude,
        flight.altitude_ft,
        flight.groundspeed_kt
    )
}
