use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use super::{CrmConnector, CrmError};
use crate::config::CrmSettings;
use crate::models::contact::ContactRecord;

const UNKNOWN: &str = "Unknown";
const API_VERSION: &str = "2021-07-28";

#[derive(Debug, Serialize, PartialEq)]
struct CustomField {
    key: &'static str,
    field_value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactBody {
    email: String,
    first_name: String,
    last_name: String,
    name: String,
    phone: String,
    company_name: String,
    source: String,
    tags: Vec<String>,
    custom_fields: Vec<CustomField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_id: Option<String>,
}

fn or_unknown(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| UNKNOWN.to_string())
}

fn build_body(contact: &ContactRecord, location_id: Option<&str>) -> ContactBody {
    let mut parts = contact.name.split_whitespace();
    let first_name = parts.next().unwrap_or_default().to_string();
    let last_name = parts.collect::<Vec<_>>().join(" ");
    let plan = contact.plan.as_deref().unwrap_or("free");
    let source = contact.source.as_deref().unwrap_or("Website Registration");

    let tags = vec![
        "New User Registration".to_string(),
        format!("plan-{plan}"),
        contact
            .billing_cycle
            .as_ref()
            .map(|c| format!("billing-{c}"))
            .unwrap_or_else(|| "billing-none".to_string()),
        format!("source-{source}"),
        "lead-form-completed".to_string(),
    ];

    ContactBody {
        email: contact.email.clone(),
        first_name,
        last_name,
        name: if contact.name.is_empty() {
            contact.email.clone()
        } else {
            contact.name.clone()
        },
        phone: contact.phone.clone().unwrap_or_default(),
        company_name: contact.business.clone().unwrap_or_default(),
        source: source.to_string(),
        tags,
        custom_fields: vec![
            CustomField {
                key: "subscription_plan",
                field_value: plan.to_string(),
            },
            CustomField {
                key: "billing_cycle",
                field_value: contact.billing_cycle.clone().unwrap_or_default(),
            },
            CustomField {
                key: "business_bottlenecks",
                field_value: or_unknown(&contact.answers.bottlenecks),
            },
            CustomField {
                key: "current_ai_usage",
                field_value: or_unknown(&contact.answers.current_ai_usage),
            },
            CustomField {
                key: "priority_outcome",
                field_value: or_unknown(&contact.answers.priority_outcome),
            },
        ],
        location_id: location_id.map(str::to_string),
    }
}

/// HighLevel contacts API.
pub struct HighLevelCrm {
    client: Client,
    settings: CrmSettings,
}

impl HighLevelCrm {
    pub fn new(client: Client, settings: CrmSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl CrmConnector for HighLevelCrm {
    async fn push_contact(&self, contact: &ContactRecord) -> Result<(), CrmError> {
        let url = format!("{}/contacts/", self.settings.api_base.trim_end_matches('/'));
        let body = build_body(contact, self.settings.location_id.as_deref());

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .header("Version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            warn!(%status, email = %contact.email, "crm rejected contact");
            return Err(CrmError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!(email = %contact.email, "crm accepted contact");
        Ok(())
    }
}
