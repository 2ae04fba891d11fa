//! # Alert Composer
//! Deterministic formatting of the crisis email. Pure function over
//! already-validated inputs; presence/absence of a location and of a
//! guardian are the only branches. The crisis message is always quoted
//! verbatim; the recipient needs the exact wording, never a summary.

use chrono::{DateTime, Utc};

use crate::classifier::{RiskVerdict, Severity};
use crate::geo::GeoPoint;
use crate::recipients::RecipientSet;
use crate::store::UserRecord;

/// National suicide prevention helpline (India), quoted in every alert.
pub const NATIONAL_HELPLINE_NUMBER: &str = "14416";

const SUBJECT_MARKER: &str = "[URGENT] Mental Health Crisis Alert";

/// One fully composed incident, handed to the delivery pipeline and not
/// mutated afterwards. Not persisted.
#[derive(Debug, Clone)]
pub struct AlertPayload {
    pub subject: String,
    pub html_body: String,
    pub recipients: RecipientSet,
    pub crisis_snippet: String,
    pub location: Option<GeoPoint>,
    pub triggered_at: DateTime<Utc>,
    pub triggering_user_id: String,
}

pub struct AlertComposer;

impl AlertComposer {
    /// Renders the full alert. No failure modes; every input has already
    /// been validated or degraded to a safe default upstream.
    pub fn compose(
        user: &UserRecord,
        verdict: &RiskVerdict,
        crisis_snippet: &str,
        location: Option<GeoPoint>,
        recipients: RecipientSet,
        now: DateTime<Utc>,
    ) -> AlertPayload {
        let name = user.alert_name();
        // User-controlled fields are escaped before interpolation so a
        // crafted message cannot inject markup (e.g. a spoofed location
        // link) into the email the guardian has to trust. Escaping keeps
        // the snippet verbatim as rendered text.
        let name_html = html_escape::encode_text(name);
        let email_raw = user.email.as_deref().unwrap_or("unknown");
        let email_html = html_escape::encode_text(email_raw);
        let snippet_html = html_escape::encode_text(crisis_snippet);

        let severity_label = match verdict.severity {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::None => "NONE",
        };

        let location_section = match location {
            Some(point) => format!(
                concat!(
                    "<h2>Current Location</h2>\n",
                    "<p><a href=\"{link}\">View location on Google Maps</a></p>\n",
                    "<p>Coordinates: {lat}, {lng}</p>"
                ),
                link = point.maps_link(),
                lat = point.lat,
                lng = point.lng,
            ),
            None => {
                "<p><em>Location unavailable (timeout or permission denied)</em></p>".to_string()
            }
        };

        let location_action = if location.is_some() {
            "<li>Use the location link above to provide exact coordinates</li>\n"
        } else {
            ""
        };

        let html_body = format!(
            concat!(
                "<html><body>\n",
                "<h1>CRITICAL MENTAL HEALTH CRISIS</h1>\n",
                "<p><strong>Immediate attention required.</strong> ",
                "{email} is currently suffering from mental trauma and needs help right now.</p>\n",
                "<h2>User Information</h2>\n",
                "<ul>\n",
                "<li><strong>Name:</strong> {name}</li>\n",
                "<li><strong>Email:</strong> {email}</li>\n",
                "<li><strong>Severity:</strong> {severity}</li>\n",
                "<li><strong>Time:</strong> {time}</li>\n",
                "</ul>\n",
                "<h2>Crisis Message Detected</h2>\n",
                "<blockquote>\"{snippet}\"</blockquote>\n",
                "{location_section}\n",
                "<h2>Recommended Actions</h2>\n",
                "<ol>\n",
                "<li>Contact {name} immediately at {email}</li>\n",
                "<li>If unable to reach them, consider contacting local emergency services</li>\n",
                "{location_action}",
                "<li>National Suicide Prevention Helpline (India): <strong>{helpline}</strong></li>\n",
                "</ol>\n",
                "<p><small>Automated crisis alert. This person needs immediate support ",
                "and intervention.</small></p>\n",
                "</body></html>"
            ),
            name = name_html,
            email = email_html,
            severity = severity_label,
            time = now.to_rfc3339(),
            snippet = snippet_html,
            location_section = location_section,
            location_action = location_action,
            helpline = NATIONAL_HELPLINE_NUMBER,
        );

        AlertPayload {
            subject: format!("{SUBJECT_MARKER} - {name}"),
            html_body,
            recipients,
            crisis_snippet: crisis_snippet.to_string(),
            location,
            triggered_at: now,
            triggering_user_id: user.id.clone(),
        }
    }
}
