//! # Delivery Pipeline
//! Fire-and-forget dispatch of a composed alert to every recipient through
//! the transactional-email collaborator. Each recipient is an independent
//! spawned task; a permanent failure for one never touches the others and
//! never surfaces to the orchestrator, let alone the chat request.
//!
//! Retry policy is fixed: exactly one retry per recipient after a delay,
//! then the recipient is abandoned with an error log. No dead-letter queue,
//! no alternate channel.

pub mod smtp;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::compose::AlertPayload;

/// Delay before the single retry; matches the original system's 30 s
/// `setTimeout` reschedule.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Transactional-email collaborator. Injected explicitly (no lazily
/// initialized process-global client) so tests can substitute a recording
/// fake.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// Terminal per-recipient result, after retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u8 },
    Abandoned { attempts: u8 },
}

/// One send attempt; logged and discarded, never persisted.
#[derive(Debug, Clone)]
pub struct DeliveryAttempt {
    pub recipient: String,
    pub attempt_number: u8,
    pub error_detail: Option<String>,
}

#[derive(Clone)]
pub struct DeliveryPipeline {
    mailer: Arc<dyn Mailer>,
    retry_delay: Duration,
}

impl DeliveryPipeline {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self {
            mailer,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Hands the payload off to background delivery and returns immediately.
    /// The supervising handle is returned for callers that want to observe
    /// completion (tests, shutdown hooks); dropping it is the normal case
    /// and detaches the work.
    pub fn dispatch(&self, payload: AlertPayload) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            let recipients = payload.recipients.addresses().to_vec();
            info!(
                user = %payload.triggering_user_id,
                recipients = recipients.len(),
                "dispatching crisis alert"
            );

            // All recipients in flight at once; completion order is
            // irrelevant.
            let mut tasks = Vec::with_capacity(recipients.len());
            for recipient in recipients {
                let pipeline = pipeline.clone();
                let subject = payload.subject.clone();
                let body = payload.html_body.clone();
                tasks.push(tokio::spawn(async move {
                    pipeline.deliver(&recipient, &subject, &body).await;
                }));
            }
            for task in tasks {
                if let Err(e) = task.await {
                    error!(error = %e, "delivery task panicked");
                }
            }
        })
    }

    /// Full per-recipient lifecycle: first attempt, one delayed retry,
    /// terminal log. The delay is a scheduled sleep inside this detached
    /// task; it holds no connection or request resource open.
    pub async fn deliver(&self, recipient: &str, subject: &str, html_body: &str) -> DeliveryOutcome {
        match self.attempt(recipient, 1, subject, html_body).await {
            None => DeliveryOutcome::Delivered { attempts: 1 },
            Some(first_error) => {
                warn!(
                    recipient,
                    error = %first_error,
                    delay_secs = self.retry_delay.as_secs(),
                    "first send failed, scheduling retry"
                );
                tokio::time::sleep(self.retry_delay).await;

                match self.attempt(recipient, 2, subject, html_body).await {
                    None => DeliveryOutcome::Delivered { attempts: 2 },
                    Some(second_error) => {
                        error!(
                            recipient,
                            error = %second_error,
                            "send failed after retry, giving up on this recipient"
                        );
                        counter!("crisis_alert_recipients_abandoned_total").increment(1);
                        DeliveryOutcome::Abandoned { attempts: 2 }
                    }
                }
            }
        }
    }

    /// Single attempt; returns the error detail on failure.
    async fn attempt(
        &self,
        recipient: &str,
        attempt_number: u8,
        subject: &str,
        html_body: &str,
    ) -> Option<String> {
        counter!("crisis_alert_send_attempts_total").increment(1);
        let attempt = match self.mailer.send(recipient, subject, html_body).await {
            Ok(()) => DeliveryAttempt {
                recipient: recipient.to_string(),
                attempt_number,
                error_detail: None,
            },
            Err(e) => DeliveryAttempt {
                recipient: recipient.to_string(),
                attempt_number,
                error_detail: Some(format!("{e:#}")),
            },
        };

        match &attempt.error_detail {
            None => {
                counter!("crisis_alert_emails_sent_total").increment(1);
                info!(
                    recipient = %attempt.recipient,
                    attempt = attempt.attempt_number,
                    "alert email sent"
                );
                None
            }
            Some(detail) => Some(detail.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::AlertComposer;
    use crate::recipients::RecipientResolver;
    use crate::store::UserRecord;
    use anyhow::anyhow;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fails the first `fail_first` attempts per recipient, then succeeds.
    /// Records every attempt.
    struct FlakyMailer {
        fail_first: u8,
        attempts: Mutex<HashMap<String, u8>>,
    }

    impl FlakyMailer {
        fn new(fail_first: u8) -> Self {
            Self {
                fail_first,
                attempts: Mutex::new(HashMap::new()),
            }
        }

        fn attempts_for(&self, recipient: &str) -> u8 {
            *self.attempts.lock().unwrap().get(recipient).unwrap_or(&0)
        }
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, to: &str, _subject: &str, _html_body: &str) -> Result<()> {
            let mut guard = self.attempts.lock().unwrap();
            let n = guard.entry(to.to_string()).or_insert(0);
            *n += 1;
            if *n <= self.fail_first {
                Err(anyhow!("smtp 451 temporary failure"))
            } else {
                Ok(())
            }
        }
    }

    fn fast_pipeline(mailer: Arc<FlakyMailer>) -> DeliveryPipeline {
        DeliveryPipeline::new(mailer).with_retry_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn clean_send_is_one_attempt() {
        let mailer = Arc::new(FlakyMailer::new(0));
        let outcome = fast_pipeline(mailer.clone())
            .deliver("mom@example.com", "s", "b")
            .await;
        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 1 });
        assert_eq!(mailer.attempts_for("mom@example.com"), 1);
    }

    #[tokio::test]
    async fn first_failure_retries_once_then_delivers() {
        let mailer = Arc::new(FlakyMailer::new(1));
        let outcome = fast_pipeline(mailer.clone())
            .deliver("mom@example.com", "s", "b")
            .await;
        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 2 });
        assert_eq!(mailer.attempts_for("mom@example.com"), 2);
    }

    #[tokio::test]
    async fn double_failure_abandons_after_exactly_two_attempts() {
        let mailer = Arc::new(FlakyMailer::new(2));
        let outcome = fast_pipeline(mailer.clone())
            .deliver("mom@example.com", "s", "b")
            .await;
        assert_eq!(outcome, DeliveryOutcome::Abandoned { attempts: 2 });
        // No third attempt, ever.
        assert_eq!(mailer.attempts_for("mom@example.com"), 2);
    }

    #[tokio::test]
    async fn dispatch_covers_all_recipients_independently() {
        let mailer = Arc::new(FlakyMailer::new(0));
        let user = UserRecord {
            id: "u1".into(),
            email: Some("kid@example.com".into()),
            guardian_email: Some("mom@example.com".into()),
            helpline_email: Some("ngo@example.org".into()),
            ..Default::default()
        };
        let recipients = RecipientResolver::default().resolve(&user);
        let verdict = crate::classifier::classify("I want to die");
        let payload = AlertComposer::compose(
            &user,
            &verdict,
            "I want to die",
            None,
            recipients,
            Utc::now(),
        );

        fast_pipeline(mailer.clone())
            .dispatch(payload)
            .await
            .unwrap();

        assert_eq!(mailer.attempts_for("mom@example.com"), 1);
        assert_eq!(mailer.attempts_for("ngo@example.org"), 1);
    }

    #[tokio::test]
    async fn one_recipient_failing_does_not_affect_siblings() {
        struct SelectiveMailer {
            attempts: Mutex<HashMap<String, u8>>,
        }

        #[async_trait]
        impl Mailer for SelectiveMailer {
            async fn send(&self, to: &str, _subject: &str, _html_body: &str) -> Result<()> {
                *self
                    .attempts
                    .lock()
                    .unwrap()
                    .entry(to.to_string())
                    .or_insert(0) += 1;
                if to == "mom@example.com" {
                    Err(anyhow!("mailbox unavailable"))
                } else {
                    Ok(())
                }
            }
        }

        let mailer = Arc::new(SelectiveMailer {
            attempts: Mutex::new(HashMap::new()),
        });
        let user = UserRecord {
            id: "u1".into(),
            guardian_email: Some("mom@example.com".into()),
            helpline_email: Some("ngo@example.org".into()),
            ..Default::default()
        };
        let recipients = RecipientResolver::default().resolve(&user);
        let verdict = crate::classifier::classify("no point");
        let payload =
            AlertComposer::compose(&user, &verdict, "no point", None, recipients, Utc::now());

        DeliveryPipeline::new(mailer.clone())
            .with_retry_delay(Duration::from_millis(10))
            .dispatch(payload)
            .await
            .unwrap();

        let attempts = mailer.attempts.lock().unwrap();
        assert_eq!(attempts.get("mom@example.com"), Some(&2), "failed + retried");
        assert_eq!(attempts.get("ngo@example.org"), Some(&1), "sibling unaffected");
    }
}
