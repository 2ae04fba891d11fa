//! User-account store contract.
//!
//! The account system itself (auth, onboarding CRUD) lives outside this
//! crate; the pipeline only needs the handful of fields below. The store is
//! a trait seam so the web app can back it with its relational database
//! while tests and local runs use [`InMemoryUserStore`].

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::geo::GeoPoint;

/// Slice of the user aggregate the crisis pipeline reads.
/// All contact and location fields are nullable and best-effort.
#[derive(Debug, Clone, Default)]
pub struct UserRecord {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub guardian_email: Option<String>,
    pub helpline_email: Option<String>,
    pub cached_location: Option<GeoPoint>,
    pub last_location_update: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Name shown in the alert: display name, else email, else a fixed
    /// placeholder so the subject line is never blank.
    pub fn alert_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Unknown User")
    }

    /// Cached location, filtered through the usability invariant. The
    /// original schema stored `(0,0)` for "never located", which must read
    /// back as absent.
    pub fn usable_cached_location(&self) -> Option<GeoPoint> {
        self.cached_location.and_then(GeoPoint::usable)
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `None` means the record does not exist; that is a data-integrity
    /// problem for the incident, not a transport error.
    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>>;

    /// Opportunistic write-through of a fresh fix. Last-write-wins across
    /// concurrent incidents is acceptable; the cache is a hint, not a
    /// source of truth.
    async fn set_cached_location(
        &self,
        id: &str,
        point: GeoPoint,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

/// RwLock-backed store for tests and local runs.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserRecord) {
        let mut guard = self.users.write().expect("user store lock poisoned");
        guard.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        let guard = self
            .users
            .read()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        Ok(guard.get(id).cloned())
    }

    async fn set_cached_location(
        &self,
        id: &str,
        point: GeoPoint,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut guard = self
            .users
            .write()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        let user = guard
            .get_mut(id)
            .ok_or_else(|| anyhow!("no such user: {id}"))?;
        user.cached_location = Some(point);
        user.last_location_update = Some(at);
        Ok(())
    }
}
