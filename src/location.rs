//! # Location Resolver
//! Best-effort acquisition of a geographic fix for the alert email:
//! live sensor read raced against a hard timeout, falling back to the
//! last cached point in the user store. Staleness of the cache is accepted;
//! during a crisis an old fix beats no fix.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::geo::GeoPoint;
use crate::store::{UserRecord, UserStore};

/// Default bound on the live read; matches the client-side geolocation
/// timeout of the original system.
pub const DEFAULT_SENSOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Single-shot positioning collaborator. May fail with permission-denied or
/// platform-unsupported; may also simply never answer, which is why the
/// resolver wraps every call in a timeout race.
#[async_trait]
pub trait PositionSensor: Send + Sync {
    async fn current_position(&self) -> Result<GeoPoint>;
}

/// Deployment without a server-side sensor: positioning happens in the
/// client, which forwards its fix as a hint on the alert route. This
/// sensor fails immediately so the resolver drops straight to the cache.
pub struct NoPositionSensor;

#[async_trait]
impl PositionSensor for NoPositionSensor {
    async fn current_position(&self) -> Result<GeoPoint> {
        anyhow::bail!("no server-side positioning sensor")
    }
}

pub struct LocationResolver {
    sensor: Arc<dyn PositionSensor>,
    store: Arc<dyn UserStore>,
    sensor_timeout: Duration,
}

impl LocationResolver {
    pub fn new(sensor: Arc<dyn PositionSensor>, store: Arc<dyn UserStore>) -> Self {
        Self {
            sensor,
            store,
            sensor_timeout: DEFAULT_SENSOR_TIMEOUT,
        }
    }

    pub fn with_sensor_timeout(mut self, timeout: Duration) -> Self {
        self.set_sensor_timeout(timeout);
        self
    }

    pub fn set_sensor_timeout(&mut self, timeout: Duration) {
        self.sensor_timeout = timeout;
    }

    /// Resolves a usable point for `user`, or `None` when every source is
    /// dry. Never returns the `(0,0)` sentinel as a location.
    pub async fn resolve(&self, user: &UserRecord) -> Option<GeoPoint> {
        self.resolve_with_hint(user, None).await
    }

    /// Like [`resolve`](Self::resolve), but a usable client-supplied fix
    /// (the alert HTTP route forwards the browser's reading) short-circuits
    /// the sensor race. The hint is cached exactly like a live read.
    pub async fn resolve_with_hint(
        &self,
        user: &UserRecord,
        hint: Option<GeoPoint>,
    ) -> Option<GeoPoint> {
        if let Some(point) = hint.and_then(GeoPoint::usable) {
            debug!(user = %user.id, "using client-supplied location");
            self.cache_point(&user.id, point).await;
            return Some(point);
        }

        // Live read, hard-bounded. tokio's timeout drops the sensor future
        // when the timer wins, so a sensor that never answers cannot wedge
        // the escalation task.
        match tokio::time::timeout(self.sensor_timeout, self.sensor.current_position()).await {
            Ok(Ok(point)) => {
                if let Some(point) = point.usable() {
                    self.cache_point(&user.id, point).await;
                    return Some(point);
                }
                warn!(user = %user.id, "sensor returned sentinel coordinates, ignoring");
            }
            Ok(Err(e)) => {
                warn!(user = %user.id, error = %e, "live position read failed");
            }
            Err(_) => {
                warn!(
                    user = %user.id,
                    timeout_ms = self.sensor_timeout.as_millis() as u64,
                    "live position read timed out"
                );
            }
        }

        match user.usable_cached_location() {
            Some(point) => {
                info!(user = %user.id, "falling back to cached location");
                Some(point)
            }
            None => {
                info!(user = %user.id, "no location available (live or cached)");
                None
            }
        }
    }

    /// Write-through of a fresh fix; failure is logged and swallowed, the
    /// point is still handed to the composer.
    async fn cache_point(&self, user_id: &str, point: GeoPoint) {
        if let Err(e) = self
            .store
            .set_cached_location(user_id, point, Utc::now())
            .await
        {
            warn!(user = %user_id, error = %e, "failed to cache location");
        }
    }
}
