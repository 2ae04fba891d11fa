//! # Recipient Resolver
//! Decides who gets the alert: guardian if configured, fixed helpline
//! otherwise, optional per-user helpline override on top. The triggering
//! user's own address is always filtered out; an alert that only reaches
//! the person in crisis reaches nobody who can help.

use crate::store::UserRecord;

/// Fallback contact when no guardian is configured.
pub const DEFAULT_HELPLINE: &str = "support@1life.org.in";

/// Ordered, de-duplicated set of alert targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientSet {
    recipients: Vec<String>,
    no_guardian_configured: bool,
}

impl RecipientSet {
    pub fn empty() -> Self {
        Self {
            recipients: Vec::new(),
            no_guardian_configured: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn addresses(&self) -> &[String] {
        &self.recipients
    }

    pub fn no_guardian_configured(&self) -> bool {
        self.no_guardian_configured
    }
}

pub struct RecipientResolver {
    default_helpline: String,
}

impl Default for RecipientResolver {
    fn default() -> Self {
        Self::new(DEFAULT_HELPLINE)
    }
}

impl RecipientResolver {
    pub fn new(default_helpline: impl Into<String>) -> Self {
        Self {
            default_helpline: default_helpline.into(),
        }
    }

    /// Computes the target set for `user`. Guardian is primary; the fixed
    /// helpline substitutes when no guardian exists (and flags it, so the
    /// UI can surface its help button); a per-user helpline override is
    /// appended regardless. Self-addresses are dropped case-insensitively.
    pub fn resolve(&self, user: &UserRecord) -> RecipientSet {
        let mut recipients: Vec<String> = Vec::new();
        let mut no_guardian_configured = false;

        match non_empty(user.guardian_email.as_deref()) {
            Some(guardian) => recipients.push(guardian.to_string()),
            None => {
                recipients.push(self.default_helpline.clone());
                no_guardian_configured = true;
            }
        }

        if let Some(helpline) = non_empty(user.helpline_email.as_deref()) {
            recipients.push(helpline.to_string());
        }

        let own = user.email.as_deref().map(str::to_lowercase);
        recipients.retain(|r| Some(r.to_lowercase()) != own);

        // De-dup while preserving order (guardian stays primary).
        let mut seen: Vec<String> = Vec::new();
        recipients.retain(|r| {
            let key = r.to_lowercase();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });

        RecipientSet {
            recipients,
            no_guardian_configured,
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
