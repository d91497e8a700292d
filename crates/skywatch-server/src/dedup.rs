//! Alert deduplication: one open alert per (identity, region), auto-close
//! on exit or idle.
//!
//! The map is keyed; each request touches a single key, so the critical
//! section is the DashMap shard lock for that key. The decision and the
//! reservation of a new entry happen atomically; the store write that
//! follows fills the reserved entry in via `confirm`.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use skywatch_core::models::ThreatLevel;

use crate::persistence::alerts::OpenAlertRow;

/// Dedup key: the tuple that distinguishes a new event from the same
/// event continuing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpenKey {
    pub identity: String,
    pub region_id: Option<i64>,
}

#[derive(Debug)]
struct OpenEntry {
    /// 0 while the alert row is still being written.
    alert_id: i64,
    severity: ThreatLevel,
    last_seen: Instant,
}

/// What the pipeline should do after a telemetry evaluation.
#[derive(Debug, PartialEq, Eq)]
pub enum DedupOutcome {
    /// A new alert must be persisted and published. The entry is already
    /// reserved under `key`; a superseded alert (severity change) is
    /// returned for resolution.
    Open {
        key: OpenKey,
        resolve_first: Option<i64>,
    },
    /// The same open alert continues; no event.
    Continuing,
    /// The track left all regions; these alerts auto-closed.
    Closed(Vec<i64>),
    /// Nothing to do.
    Idle,
}

pub struct AlertDeduper {
    open: DashMap<OpenKey, OpenEntry>,
    /// Consecutive out-of-region, below-High samples per transponder id.
    clear_counts: DashMap<String, u8>,
    idle_window: Duration,
}

impl AlertDeduper {
    pub fn new(idle_window: Duration) -> Self {
        Self {
            open: DashMap::new(),
            clear_counts: DashMap::new(),
            idle_window,
        }
    }

    /// The identity component of the dedup key. Unidentified tracks fold
    /// into one synthetic identity per region.
    pub fn identity_for(transponder: Option<&str>, region_id: Option<i64>) -> String {
        match (transponder, region_id) {
            (Some(id), _) => id.to_string(),
            (None, Some(region)) => format!("UNKNOWN-{}", region),
            (None, None) => "UNKNOWN".to_string(),
        }
    }

    /// Evaluate one telemetry sample against the open-alert set.
    pub fn evaluate(
        &self,
        transponder: Option<&str>,
        region_id: Option<i64>,
        level: ThreatLevel,
        in_region: bool,
    ) -> DedupOutcome {
        // Any telemetry from a known track refreshes its open alerts, so
        // the idle window measures silence, not threat level.
        if let Some(id) = transponder {
            self.touch_identity(id);
        }

        if level.is_alerting() {
            if let Some(id) = transponder {
                self.clear_counts.remove(id);
            }
            let key = OpenKey {
                identity: Self::identity_for(transponder, region_id),
                region_id,
            };
            return match self.open.entry(key.clone()) {
                Entry::Occupied(mut entry) => {
                    if entry.get().severity == level {
                        entry.get_mut().last_seen = Instant::now();
                        DedupOutcome::Continuing
                    } else {
                        // Severity changed: the previous alert is
                        // superseded and a fresh one opens in its place.
                        let superseded = entry.get().alert_id;
                        entry.insert(OpenEntry {
                            alert_id: 0,
                            severity: level,
                            last_seen: Instant::now(),
                        });
                        DedupOutcome::Open {
                            key,
                            resolve_first: (superseded != 0).then_some(superseded),
                        }
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(OpenEntry {
                        alert_id: 0,
                        severity: level,
                        last_seen: Instant::now(),
                    });
                    DedupOutcome::Open {
                        key,
                        resolve_first: None,
                    }
                }
            };
        }

        if in_region {
            // Inside a zone the track is not "clear", even below High.
            if let Some(id) = transponder {
                self.clear_counts.remove(id);
            }
            return DedupOutcome::Idle;
        }

        // Outside all regions and below High. Unidentified tracks cannot
        // be correlated across samples; their alerts close via the idle
        // window instead.
        let Some(id) = transponder else {
            return DedupOutcome::Idle;
        };

        let clear = {
            let mut count = self.clear_counts.entry(id.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if clear < 2 {
            return DedupOutcome::Idle;
        }
        self.clear_counts.remove(id);

        let closed = self.close_identity(id);
        if closed.is_empty() {
            DedupOutcome::Idle
        } else {
            DedupOutcome::Closed(closed)
        }
    }

    /// Record the store-assigned id for a reserved entry.
    pub fn confirm(&self, key: &OpenKey, alert_id: i64) {
        if let Some(mut entry) = self.open.get_mut(key) {
            if entry.alert_id == 0 {
                entry.alert_id = alert_id;
            }
        }
    }

    /// Drop a reservation whose alert row could not be written.
    pub fn abort(&self, key: &OpenKey) {
        self.open.remove_if(key, |_, entry| entry.alert_id == 0);
    }

    /// Remove the entry for an alert resolved by an operator.
    pub fn evict_alert(&self, alert_id: i64) {
        self.open.retain(|_, entry| entry.alert_id != alert_id);
    }

    /// Entries silent past the idle window; removed and returned for
    /// resolution.
    pub fn sweep_idle(&self) -> Vec<i64> {
        let mut expired = Vec::new();
        self.open.retain(|_, entry| {
            let idle = entry.alert_id != 0 && entry.last_seen.elapsed() > self.idle_window;
            if idle {
                expired.push(entry.alert_id);
            }
            !idle
        });
        expired
    }

    /// Rebuild the map from unresolved alerts on cold start.
    pub fn rebuild(&self, rows: &[OpenAlertRow]) {
        self.open.clear();
        self.clear_counts.clear();
        for row in rows {
            let key = OpenKey {
                identity: Self::identity_for(row.transponder_id.as_deref(), row.region_id),
                region_id: row.region_id,
            };
            self.open.insert(
                key,
                OpenEntry {
                    alert_id: row.id,
                    severity: row.severity,
                    last_seen: Instant::now(),
                },
            );
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    fn touch_identity(&self, transponder: &str) {
        for mut entry in self.open.iter_mut() {
            if entry.key().identity == transponder {
                entry.last_seen = Instant::now();
            }
        }
    }

    fn close_identity(&self, transponder: &str) -> Vec<i64> {
        let mut closed = Vec::new();
        self.open.retain(|key, entry| {
            let matches = key.identity == transponder && entry.alert_id != 0;
            if matches {
                closed.push(entry.alert_id);
            }
            !matches
        });
        closed
    }
}
