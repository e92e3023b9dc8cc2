use serde::{Deserialize, Serialize};

use super::signup::{normalize_email, PendingSignup, SignupIntent};

/// Identity as confirmed by the OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub email: String,
    pub name: String,
}

impl ResolvedIdentity {
    pub fn new(email: &str, name: &str) -> Self {
        ResolvedIdentity {
            email: normalize_email(email),
            name: name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAnswers {
    pub bottlenecks: Option<String>,
    #[serde(rename = "currentAIUsage")]
    pub current_ai_usage: Option<String>,
    pub priority_outcome: Option<String>,
}

/// Record handed to the CRM. `None` answers are sent as unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub business: Option<String>,
    pub answers: BusinessAnswers,
    pub plan: Option<String>,
    pub billing_cycle: Option<String>,
    pub source: Option<String>,
}

impl ContactRecord {
    /// The provider-confirmed email always wins over whatever the form carried.
    /// The form's name is preferred when present since the lead typed it.
    pub fn merge(
        identity: &ResolvedIdentity,
        pending: &PendingSignup,
        intent: &SignupIntent,
    ) -> Self {
        ContactRecord {
            email: identity.email.clone(),
            name: if pending.name.trim().is_empty() {
                identity.name.clone()
            } else {
                pending.name.clone()
            },
            phone: pending.phone.clone(),
            business: pending.business.clone(),
            answers: BusinessAnswers {
                bottlenecks: Some(pending.bottlenecks.clone()),
                current_ai_usage: Some(pending.current_ai_usage.clone()),
                priority_outcome: Some(pending.priority_outcome.clone()),
            },
            plan: intent.plan.clone().or_else(|| pending.plan.clone()),
            billing_cycle: intent
                .billing_cycle
                .clone()
                .or_else(|| pending.billing_cycle.clone()),
            source: intent.source.clone(),
        }
    }
}
