use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Canonical key for the correlation store. Both the intake endpoint and the
/// OAuth callback must key records through this function.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Missing or invalid fields: {}", fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<&'static str>,
}

/// Raw lead-capture form as posted by the browser before sign-in.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakePayload {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub business: Option<String>,
    pub bottlenecks: Option<String>,
    #[serde(rename = "currentAIUsage", alias = "currentAiUsage")]
    pub current_ai_usage: Option<String>,
    pub priority_outcome: Option<String>,
    pub plan: Option<String>,
    pub billing_cycle: Option<String>,
}

/// A validated submission ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPendingSignup {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub business: Option<String>,
    pub bottlenecks: String,
    pub current_ai_usage: String,
    pub priority_outcome: String,
    pub plan: Option<String>,
    pub billing_cycle: Option<String>,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl IntakePayload {
    /// Reports every missing or malformed field at once rather than the first.
    pub fn validate(&self) -> Result<NewPendingSignup, ValidationError> {
        let mut fields = Vec::new();

        let email = match present(&self.email) {
            Some(email) if is_valid_email(&email) => Some(normalize_email(&email)),
            _ => {
                fields.push("email");
                None
            }
        };

        let mut require = |value: &Option<String>, name: &'static str| {
            let v = present(value);
            if v.is_none() {
                fields.push(name);
            }
            v
        };

        let name = require(&self.name, "name");
        let bottlenecks = require(&self.bottlenecks, "bottlenecks");
        let current_ai_usage = require(&self.current_ai_usage, "currentAIUsage");
        let priority_outcome = require(&self.priority_outcome, "priorityOutcome");

        match (email, name, bottlenecks, current_ai_usage, priority_outcome) {
            (
                Some(email),
                Some(name),
                Some(bottlenecks),
                Some(current_ai_usage),
                Some(priority_outcome),
            ) => Ok(NewPendingSignup {
                email,
                name,
                phone: present(&self.phone),
                business: present(&self.business),
                bottlenecks,
                current_ai_usage,
                priority_outcome,
                plan: present(&self.plan),
                billing_cycle: present(&self.billing_cycle),
            }),
            _ => Err(ValidationError { fields }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSignup {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub business: Option<String>,
    pub bottlenecks: String,
    #[serde(rename = "currentAIUsage")]
    pub current_ai_usage: String,
    pub priority_outcome: String,
    pub plan: Option<String>,
    pub billing_cycle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl PendingSignup {
    pub fn from_new(new: &NewPendingSignup, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        PendingSignup {
            id: Uuid::new_v4(),
            email: normalize_email(&new.email),
            name: new.name.clone(),
            phone: new.phone.clone(),
            business: new.business.clone(),
            bottlenecks: new.bottlenecks.clone(),
            current_ai_usage: new.current_ai_usage.clone(),
            priority_outcome: new.priority_outcome.clone(),
            plan: new.plan.clone(),
            billing_cycle: new.billing_cycle.clone(),
            created_at: now,
            expires_at: now + ttl,
            consumed_at: None,
        }
    }

    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}

/// Plan selection made before sign-in and carried through the OAuth round trip.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupIntent {
    pub plan: Option<String>,
    pub billing_cycle: Option<String>,
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_payload() -> IntakePayload {
        IntakePayload {
            email: Some("  User@Example.com ".into()),
            name: Some("Ada Lovelace".into()),
            phone: Some("555-0100".into()),
            business: Some("Analytical Engines".into()),
            bottlenecks: Some("Manual reporting".into()),
            current_ai_usage: Some("None yet".into()),
            priority_outcome: Some("Reduced operational costs".into()),
            plan: None,
            billing_cycle: None,
        }
    }

    #[test]
    fn normalization_trims_and_lowercases() {
        assert_eq!(normalize_email("  User@Example.COM\n"), "user@example.com");
        assert_eq!(
            normalize_email("User@Example.com"),
            normalize_email("user@example.com")
        );
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email(" padded@example.com "));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@example..com"));
        assert!(!is_valid_email("us er@example.com"));
    }

    #[test]
    fn validate_normalizes_email_and_keeps_optional_fields() {
        let record = complete_payload().validate().unwrap();
        assert_eq!(record.email, "user@example.com");
        assert_eq!(record.phone.as_deref(), Some("555-0100"));
        assert_eq!(record.plan, None);
    }

    #[test]
    fn validate_reports_every_missing_field() {
        let payload = IntakePayload {
            email: Some("not-an-email".into()),
            name: Some("   ".into()),
            bottlenecks: Some("x".into()),
            ..Default::default()
        };
        let err = payload.validate().unwrap_err();
        assert_eq!(
            err.fields,
            vec!["email", "name", "currentAIUsage", "priorityOutcome"]
        );
        assert!(err.to_string().contains("currentAIUsage"));
    }

    #[test]
    fn intake_payload_accepts_form_field_names() {
        let payload: IntakePayload = serde_json::from_str(
            r#"{"email":"a@b.co","name":"A","bottlenecks":"b","currentAIUsage":"c","priorityOutcome":"d","billingCycle":"yearly"}"#,
        )
        .unwrap();
        assert_eq!(payload.current_ai_usage.as_deref(), Some("c"));
        assert_eq!(payload.priority_outcome.as_deref(), Some("d"));
        assert_eq!(payload.billing_cycle.as_deref(), Some("yearly"));
    }

    #[test]
    fn liveness_respects_expiry_and_consumption() {
        let now = Utc::now();
        let new = complete_payload().validate().unwrap();
        let mut record = PendingSignup::from_new(&new, now, chrono::Duration::minutes(30));
        assert!(record.is_live_at(now));
        assert!(!record.is_live_at(now + chrono::Duration::minutes(31)));
        record.consumed_at = Some(now);
        assert!(!record.is_live_at(now));
    }
}
