//! # Crisis Orchestrator
//! Sequences the pipeline: classify in the request path, then, for a
//! crisis verdict, resolve location and recipients, compose, and dispatch,
//! all inside a detached task the chat handler never awaits.
//!
//! The one invariant everything here serves: nothing on the escalation path
//! may block or fail the user-visible conversation. A user reporting a
//! crisis must never see a broken UI because a database or mail server is
//! down; every downstream failure degrades or is swallowed with a log.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::classifier::{self, RiskVerdict};
use crate::compose::AlertComposer;
use crate::delivery::DeliveryPipeline;
use crate::geo::GeoPoint;
use crate::location::{LocationResolver, PositionSensor};
use crate::recipients::RecipientResolver;
use crate::store::UserStore;

/// What the chat handler gets back, synchronously.
pub struct MessageOutcome {
    pub verdict: RiskVerdict,
    /// Canned in-character line for flagged messages (all tiers).
    pub reply: Option<&'static str>,
    /// Handle of the detached escalation task, present only when the
    /// message escalated. Dropping it is the normal fire-and-forget path;
    /// tests await it.
    pub escalation: Option<JoinHandle<()>>,
}

/// Immediate acknowledgment for an explicit alert trigger.
pub struct AlertAck {
    pub no_guardian: bool,
    pub escalation: JoinHandle<()>,
}

struct Inner {
    store: Arc<dyn UserStore>,
    location: LocationResolver,
    recipients: RecipientResolver,
    delivery: DeliveryPipeline,
}

#[derive(Clone)]
pub struct CrisisOrchestrator {
    inner: Arc<Inner>,
}

impl CrisisOrchestrator {
    pub fn new(
        store: Arc<dyn UserStore>,
        sensor: Arc<dyn PositionSensor>,
        delivery: DeliveryPipeline,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                location: LocationResolver::new(sensor, store.clone()),
                recipients: RecipientResolver::default(),
                store,
                delivery,
            }),
        }
    }

    pub fn with_default_helpline(mut self, helpline: impl Into<String>) -> Self {
        let inner = Arc::get_mut(&mut self.inner)
            .expect("configure the orchestrator before cloning it");
        inner.recipients = RecipientResolver::new(helpline);
        self
    }

    pub fn with_sensor_timeout(mut self, timeout: Duration) -> Self {
        let inner = Arc::get_mut(&mut self.inner)
            .expect("configure the orchestrator before cloning it");
        inner.location.set_sensor_timeout(timeout);
        self
    }

    /// Chat request path. Classification is synchronous and cheap; the
    /// escalation branch, when taken, is spawned and left behind.
    pub fn handle_message(&self, user_id: &str, text: &str) -> MessageOutcome {
        let verdict = classifier::classify(text);
        counter!("messages_classified_total").increment(1);

        let reply = classifier::empathetic_reply(verdict.severity);

        let escalation = if verdict.is_crisis {
            info!(
                user = user_id,
                severity = ?verdict.severity,
                signals = ?verdict.matched_signals,
                "crisis detected, escalating"
            );
            counter!("crisis_escalations_total").increment(1);
            Some(self.spawn_escalation(
                user_id.to_string(),
                text.to_string(),
                verdict.clone(),
                None,
            ))
        } else {
            None
        };

        MessageOutcome {
            verdict,
            reply,
            escalation,
        }
    }

    /// Explicit alert trigger (the `/safety-alert` route): the caller has
    /// already decided this is a crisis, optionally carrying the client's
    /// own location fix. Escalates unconditionally; the ack only reports
    /// whether a guardian exists so the UI can show its help button.
    pub async fn trigger_alert(
        &self,
        user_id: &str,
        crisis_snippet: &str,
        live_location: Option<GeoPoint>,
    ) -> AlertAck {
        let no_guardian = match self.inner.store.get_user(user_id).await {
            Ok(Some(user)) => user
                .guardian_email
                .as_deref()
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .is_none(),
            Ok(None) | Err(_) => true,
        };

        counter!("crisis_escalations_total").increment(1);
        let escalation = self.spawn_escalation(
            user_id.to_string(),
            crisis_snippet.to_string(),
            classifier::classify(crisis_snippet),
            live_location,
        );

        AlertAck {
            no_guardian,
            escalation,
        }
    }

    fn spawn_escalation(
        &self,
        user_id: String,
        snippet: String,
        verdict: RiskVerdict,
        live_location: Option<GeoPoint>,
    ) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            escalate(inner, user_id, snippet, verdict, live_location).await;
        })
    }
}

/// The detached escalation body. Infallible by construction: every failure
/// is logged and degraded, none propagates.
async fn escalate(
    inner: Arc<Inner>,
    user_id: String,
    snippet: String,
    verdict: RiskVerdict,
    live_location: Option<GeoPoint>,
) {
    let user = match inner.store.get_user(&user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            // Data-integrity problem; abort this incident silently from the
            // user's perspective.
            error!(user = %user_id, "user record missing, aborting crisis incident");
            counter!("crisis_incidents_aborted_total").increment(1);
            return;
        }
        Err(e) => {
            error!(user = %user_id, error = %e, "user store unavailable, aborting crisis incident");
            counter!("crisis_incidents_aborted_total").increment(1);
            return;
        }
    };

    // Location and recipients are independent; both must settle before
    // composing.
    let (location, recipients) = tokio::join!(
        inner.location.resolve_with_hint(&user, live_location),
        async { inner.recipients.resolve(&user) },
    );

    if recipients.is_empty() {
        warn!(user = %user_id, "no recipients after self-filtering, alert will not be sent");
    }
    if recipients.no_guardian_configured() {
        warn!(user = %user_id, "no guardian configured, using helpline fallback");
    }

    let payload = AlertComposer::compose(
        &user,
        &verdict,
        &snippet,
        location,
        recipients,
        chrono::Utc::now(),
    );

    // Fire-and-forget from here; delivery outcomes are logged by the
    // pipeline itself.
    let _ = inner.delivery.dispatch(payload);
}
