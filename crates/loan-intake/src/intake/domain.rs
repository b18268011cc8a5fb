use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids;

/// Identifier wrapper for submitted applications (`app_<millis>_<suffix>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for saved drafts (`draft_<millis>_<suffix>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(pub String);

impl ApplicationId {
    pub const PREFIX: &'static str = "app";

    pub fn generate(at: DateTime<Utc>) -> Self {
        Self(ids::timestamped(Self::PREFIX, at))
    }

    /// Accept only identifiers this service could have generated.
    pub fn parse(raw: &str) -> Option<Self> {
        is_generated_id(Self::PREFIX, raw).then(|| Self(raw.to_string()))
    }
}

impl DraftId {
    pub const PREFIX: &'static str = "draft";

    pub fn generate(at: DateTime<Utc>) -> Self {
        Self(ids::timestamped(Self::PREFIX, at))
    }

    pub fn parse(raw: &str) -> Option<Self> {
        is_generated_id(Self::PREFIX, raw).then(|| Self(raw.to_string()))
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_generated_id(prefix: &str, raw: &str) -> bool {
    let Some(rest) = raw
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };
    let Some((millis, suffix)) = rest.split_once('_') else {
        return false;
    };
    !millis.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && !suffix.is_empty()
        && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Loan application as captured by the multi-step form.
///
/// Every field defaults so that drafts (any subset of the form) deserialize; completeness
/// is enforced by the validation layer, not by serde.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoanApplication {
    pub personal_info: PersonalInfo,
    pub loan_details: LoanDetails,
    pub business_info: BusinessInfo,
    pub documents: Vec<DocumentReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl LoanApplication {
    pub fn applicant_name(&self) -> String {
        format!(
            "{} {}",
            self.personal_info.first_name.trim(),
            self.personal_info.last_name.trim()
        )
        .trim()
        .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoanDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub purpose: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessInfo {
    pub business_name: String,
    pub business_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_in_operation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Reference to a file previously stored through the upload endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentReference {
    pub document_type: String,
    pub file_url: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

/// Lifecycle status. Only `pending` is reachable; expiry is inferred from `expires_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
}

impl RecordStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
        }
    }
}

/// Encrypted envelope written to the temporary store for applications and drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    pub encrypted_data: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: RecordStatus,
}

impl StoredRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: ApplicationId(self.id.clone()),
            status: self.status.label(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub application_id: ApplicationId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReceipt {
    pub draft_id: DraftId,
    pub expires_at: DateTime<Utc>,
}

/// How long each kind of record lives in the temporary store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub application: Duration,
    pub draft: Duration,
    pub audit: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            application: Duration::from_secs(48 * 3600),
            draft: Duration::from_secs(168 * 3600),
            audit: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

/// `at + ttl`, saturating at the latest representable instant.
pub(crate) fn expiry_after(at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_round_trip_through_parse() {
        let now = Utc::now();
        let app = ApplicationId::generate(now);
        assert!(app.0.starts_with("app_"));
        assert_eq!(ApplicationId::parse(&app.0), Some(app.clone()));
        assert_eq!(DraftId::parse(&app.0), None);

        let draft = DraftId::generate(now);
        assert!(draft.0.starts_with("draft_"));
        assert!(DraftId::parse(&draft.0).is_some());
    }

    #[test]
    fn parse_rejects_foreign_identifiers() {
        for raw in [
            "",
            "app_",
            "app_123",
            "app__abc",
            "app_12x_abc",
            "app_123_",
            "app_123_ab/../c",
            "application:app_1_a",
        ] {
            assert!(ApplicationId::parse(raw).is_none(), "{raw} should be rejected");
        }
    }

    #[test]
    fn expiry_is_after_creation() {
        let now = Utc::now();
        let policy = RetentionPolicy::default();
        let expires = expiry_after(now, policy.application);
        assert_eq!(expires - now, chrono::Duration::hours(48));
        assert_eq!(
            expiry_after(now, policy.draft) - now,
            chrono::Duration::hours(168)
        );
    }

    #[test]
    fn record_status_serializes_lowercase() {
        let record = StoredRecord {
            id: "app_1_abc".to_string(),
            encrypted_data: "blob".to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now(),
            status: RecordStatus::Pending,
        };
        let json = serde_json::to_value(&record).expect("serializes");
        assert_eq!(json["status"], "pending");
        assert!(json.get("encryptedData").is_some());
        assert!(json.get("expiresAt").is_some());
    }

    #[test]
    fn drafts_deserialize_from_partial_payloads() {
        let draft: LoanApplication = serde_json::from_value(serde_json::json!({
            "personalInfo": { "firstName": "Amina" }
        }))
        .expect("partial payload deserializes");
        assert_eq!(draft.personal_info.first_name, "Amina");
        assert!(draft.loan_details.amount.is_none());
        assert!(draft.documents.is_empty());
    }
}
