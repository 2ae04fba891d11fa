// src/lib.rs
// Public library surface for integration tests (and reuse by the host app).

pub mod api;
pub mod classifier;
pub mod compose;
pub mod config;
pub mod delivery;
pub mod geo;
pub mod location;
pub mod metrics;
pub mod orchestrator;
pub mod recipients;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::classifier::{classify, empathetic_reply, RiskVerdict, Severity};
pub use crate::compose::{AlertComposer, AlertPayload};
pub use crate::config::Config;
pub use crate::delivery::{DeliveryOutcome, DeliveryPipeline, Mailer};
pub use crate::geo::GeoPoint;
pub use crate::location::{LocationResolver, NoPositionSensor, PositionSensor};
pub use crate::orchestrator::{AlertAck, CrisisOrchestrator, MessageOutcome};
pub use crate::recipients::{RecipientResolver, RecipientSet, DEFAULT_HELPLINE};
pub use crate::store::{InMemoryUserStore, UserRecord, UserStore};
