//! Shared application state: store handle, derived caches, dedup, bus.
//!
//! Persistent rows live in the store; everything here is rebuildable
//! from it.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use dashmap::DashMap;

use skywatch_core::geometry::RegionGeometry;
use skywatch_core::models::Flight;

use crate::bus::EventBus;
use crate::config::Config;
use crate::dedup::AlertDeduper;
use crate::persistence::{alerts, flights, regions, Database};

/// An active region with its geometry parsed once.
#[derive(Debug, Clone)]
pub struct ActiveRegion {
    pub id: i64,
    pub name: String,
    pub geometry: RegionGeometry,
}

/// How many recent records to fold into the snapshot on cold start.
const SNAPSHOT_REBUILD_ROWS: i64 = 500;

pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub dedup: AlertDeduper,
    pub bus: EventBus,
    /// Latest record per identity, serving the fast dashboard query.
    snapshot: DashMap<String, Flight>,
    /// Copy-on-write active-region list; swapped whole on region CRUD.
    active_regions: RwLock<Arc<Vec<ActiveRegion>>>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let dedup = AlertDeduper::new(Duration::from_secs(config.alert_idle_secs));
        let bus = EventBus::new(config.ws_buffer, Duration::from_secs(config.ws_grace_secs));
        Self {
            config,
            db,
            dedup,
            bus,
            snapshot: DashMap::new(),
            active_regions: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Rebuild the derived in-memory state from the store.
    pub async fn load_from_database(&self) -> Result<()> {
        self.reload_regions().await?;

        let recent = flights::list_recent(self.db.pool(), SNAPSHOT_REBUILD_ROWS).await?;
        // Newest first: the first record seen per key wins.
        for flight in recent {
            self.snapshot.entry(flight.snapshot_key()).or_insert(flight);
        }

        let open = alerts::load_unresolved(self.db.pool()).await?;
        if !open.is_empty() {
            tracing::info!("Rebuilt {} open alert(s) from the store", open.len());
        }
        self.dedup.rebuild(&open);

        Ok(())
    }

    /// The cached active-region list. Cheap to call per telemetry.
    pub fn active_regions(&self) -> Arc<Vec<ActiveRegion>> {
        self.active_regions
            .read()
            .expect("region cache lock poisoned")
            .clone()
    }

    /// Re-parse active regions from the store and swap the cache.
    /// Called after every region CRUD.
    pub async fn reload_regions(&self) -> Result<()> {
        let rows = regions::list_active(self.db.pool()).await?;
        let mut parsed = Vec::with_capacity(rows.len());
        for row in rows {
            match RegionGeometry::parse(&row.polygon_json) {
                Ok(geometry) => parsed.push(ActiveRegion {
                    id: row.id,
                    name: row.name,
                    geometry,
                }),
                // Rows are validated on the way in, so this only fires on
                // hand-edited data.
                Err(err) => {
                    tracing::error!("Skipping region {} with bad geometry: {}", row.id, err)
                }
            }
        }

        *self
            .active_regions
            .write()
            .expect("region cache lock poisoned") = Arc::new(parsed);
        Ok(())
    }

    /// First active region containing the point, if any.
    pub fn containing_region(&self, lat: f64, lon: f64) -> Option<(i64, String)> {
        self.active_regions()
            .iter()
            .find(|r| r.geometry.contains(lat, lon))
            .map(|r| (r.id, r.name.clone()))
    }

    /// Record a persisted flight in the latest-per-identity snapshot.
    pub fn record_flight(&self, flight: Flight) {
        self.snapshot.insert(flight.snapshot_key(), flight);
    }

    /// Latest record per identity, newest first.
    pub fn snapshot(&self, limit: usize) -> Vec<Flight> {
        let mut records: Vec<Flight> = self.snapshot.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        records.truncate(limit);
        records
    }
}
