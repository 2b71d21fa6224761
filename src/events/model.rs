//! Event names, attribution context, and the outbound envelope.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version of the qualification schema attached to every event.
pub const QUALIFICATION_VERSION: &str = "1.0";

/// Default experiment variant tag.
pub const DEFAULT_EXPERIMENT_VARIANT: &str = "v1";

/// Catalogue of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    PageView,
    CtaClick,
    ViewContent,
    FormStep,
    FormValidationError,
    FormStart,
    FormSubmit,
    QualifiedLead,
    WhatsappRedirect,
    FormAbandon,
}

impl EventName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::CtaClick => "cta_click",
            Self::ViewContent => "view_content",
            Self::FormStep => "form_step",
            Self::FormValidationError => "form_validation_error",
            Self::FormStart => "form_start",
            Self::FormSubmit => "form_submit",
            Self::QualifiedLead => "qualified_lead",
            Self::WhatsappRedirect => "whatsapp_redirect",
            Self::FormAbandon => "form_abandon",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign attribution captured once at load. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionContext {
    #[serde(default)]
    pub utm_source: String,
    #[serde(default)]
    pub utm_medium: String,
    #[serde(default)]
    pub utm_campaign: String,
    #[serde(default)]
    pub utm_content: String,
    #[serde(default)]
    pub utm_term: String,
    pub qualification_version: String,
    pub experiment_variant: String,
}

impl Default for AttributionContext {
    fn default() -> Self {
        Self {
            utm_source: String::new(),
            utm_medium: String::new(),
            utm_campaign: String::new(),
            utm_content: String::new(),
            utm_term: String::new(),
            qualification_version: QUALIFICATION_VERSION.to_string(),
            experiment_variant: DEFAULT_EXPERIMENT_VARIANT.to_string(),
        }
    }
}

impl AttributionContext {
    /// Build from a URL query string (leading `?` optional). Absent UTM
    /// fields stay empty; the first occurrence of a repeated key wins, even
    /// when its value is empty.
    pub fn from_query(query: &str, experiment_variant: &str) -> Self {
        let mut ctx = Self {
            experiment_variant: experiment_variant.to_string(),
            ..Self::default()
        };
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut seen = HashSet::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "utm_source" => &mut ctx.utm_source,
                "utm_medium" => &mut ctx.utm_medium,
                "utm_campaign" => &mut ctx.utm_campaign,
                "utm_content" => &mut ctx.utm_content,
                "utm_term" => &mut ctx.utm_term,
                _ => continue,
            };
            if seen.insert(key) {
                *slot = value.into_owned();
            }
        }
        ctx
    }

    /// Whether any campaign parameter was present.
    pub fn has_campaign(&self) -> bool {
        [
            &self.utm_source,
            &self.utm_medium,
            &self.utm_campaign,
            &self.utm_content,
            &self.utm_term,
        ]
        .iter()
        .any(|v| !v.is_empty())
    }
}

/// One analytics event as appended to the outbound queue.
///
/// Serializes flat: envelope fields, then attribution, then payload keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub event: EventName,
    pub session_id: String,
    pub lead_id: String,
    #[serde(flatten)]
    pub attribution: AttributionContext,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl EventRecord {
    /// Look up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_serde() {
        let names = [
            EventName::PageView,
            EventName::CtaClick,
            EventName::ViewContent,
            EventName::FormStep,
            EventName::FormValidationError,
            EventName::FormStart,
            EventName::FormSubmit,
            EventName::QualifiedLead,
            EventName::WhatsappRedirect,
            EventName::FormAbandon,
        ];
        for name in names {
            assert_eq!(
                serde_json::to_string(&name).unwrap(),
                format!("\"{name}\""),
            );
        }
    }

    #[test]
    fn query_parsing_defaults_to_empty() {
        let ctx = AttributionContext::from_query(
            "?utm_source=google&utm_campaign=verano%202025&gclid=x&utm_source=bing",
            "v2",
        );
        assert_eq!(ctx.utm_source, "google");
        assert_eq!(ctx.utm_campaign, "verano 2025");
        assert_eq!(ctx.utm_medium, "");
        assert_eq!(ctx.utm_term, "");
        assert_eq!(ctx.experiment_variant, "v2");
        assert_eq!(ctx.qualification_version, "1.0");
        assert!(ctx.has_campaign());
        assert!(!AttributionContext::from_query("", "v1").has_campaign());
    }

    #[test]
    fn empty_first_occurrence_wins() {
        let ctx = AttributionContext::from_query("utm_source=&utm_source=x&utm_medium=cpc", "v1");
        assert_eq!(ctx.utm_source, "");
        assert_eq!(ctx.utm_medium, "cpc");
    }

    #[test]
    fn record_serializes_flat() {
        let mut payload = Map::new();
        payload.insert("step_index".into(), Value::from(2));
        let record = EventRecord {
            event: EventName::FormStep,
            session_id: "s".into(),
            lead_id: "l".into(),
            attribution: AttributionContext::from_query("utm_medium=cpc", "v1"),
            payload,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "form_step");
        assert_eq!(json["session_id"], "s");
        assert_eq!(json["lead_id"], "l");
        assert_eq!(json["qualification_version"], "1.0");
        assert_eq!(json["experiment_variant"], "v1");
        assert_eq!(json["utm_medium"], "cpc");
        assert_eq!(json["utm_source"], "");
        assert_eq!(json["step_index"], 2);
        assert_eq!(record.get("step_index"), Some(&Value::from(2)));
    }
}
