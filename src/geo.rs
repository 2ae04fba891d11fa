//! Geographic point plus the "usable location" invariant shared by the
//! location resolver and the alert composer.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair. `(0.0, 0.0)` is reserved as the "unknown"
/// sentinel (the original data model stored it for users without a fix),
/// so it is never treated as a real position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True only for a real fix: both coordinates present and not the
    /// `(0,0)` sentinel.
    pub fn is_usable(&self) -> bool {
        (self.lat != 0.0 || self.lng != 0.0) && self.lat.is_finite() && self.lng.is_finite()
    }

    /// Normalizes a possibly-sentinel point into the option the rest of the
    /// pipeline works with.
    pub fn usable(self) -> Option<GeoPoint> {
        self.is_usable().then_some(self)
    }

    /// Google Maps deep link for the alert email.
    pub fn maps_link(&self) -> String {
        format!("https://www.google.com/maps?q={},{}", self.lat, self.lng)
    }
}
