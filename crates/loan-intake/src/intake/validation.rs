//! Schema checks run before any side effect of a submission or draft save.

use chrono::{NaiveDate, Utc};
use email_address::EmailAddress;
use serde::Serialize;
use serde_json::Value;

use super::domain::{DocumentReference, LoanApplication};

const MAX_TERM_MONTHS: u32 = 120;
const MIN_PHONE_DIGITS: usize = 7;

/// A single rejected field, addressed by its dotted JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("submission must be a JSON object")]
    NotAnObject,
    #[error("submission is malformed: {0}")]
    Malformed(String),
    #[error("submission has invalid fields: {}", describe(.0))]
    Fields(Vec<FieldIssue>),
}

impl ValidationError {
    pub fn issues(&self) -> &[FieldIssue] {
        match self {
            ValidationError::Fields(issues) => issues,
            ValidationError::NotAnObject | ValidationError::Malformed(_) => &[],
        }
    }
}

fn describe(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{} ({})", issue.field, issue.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether absent fields are errors (final submission) or tolerated (draft).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    Complete,
    Partial,
}

/// Validate a final submission: every required field must be present and well-formed.
pub fn validate_application(raw: Value) -> Result<LoanApplication, ValidationError> {
    validate(raw, Strictness::Complete)
}

/// Validate a draft: any subset of fields, but present fields must be well-formed.
pub fn validate_draft(raw: Value) -> Result<LoanApplication, ValidationError> {
    validate(raw, Strictness::Partial)
}

pub fn validate(raw: Value, strictness: Strictness) -> Result<LoanApplication, ValidationError> {
    if !raw.is_object() {
        return Err(ValidationError::NotAnObject);
    }

    let application: LoanApplication =
        serde_json::from_value(raw).map_err(|err| ValidationError::Malformed(err.to_string()))?;

    let mut checker = Checker::new(strictness);
    checker.personal_info(&application);
    checker.loan_details(&application);
    checker.business_info(&application);
    checker.documents(&application.documents);
    if let Some(locale) = &application.locale {
        if locale.trim().is_empty() {
            checker.issue("locale", "must not be blank");
        }
    }

    checker.finish(application)
}

struct Checker {
    strictness: Strictness,
    issues: Vec<FieldIssue>,
}

impl Checker {
    fn new(strictness: Strictness) -> Self {
        Self {
            strictness,
            issues: Vec::new(),
        }
    }

    fn issue(&mut self, field: &str, message: &str) {
        self.issues.push(FieldIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Returns the trimmed value when present; records a `required` issue otherwise.
    fn text<'a>(&mut self, field: &str, value: &'a str) -> Option<&'a str> {
        let value = value.trim();
        if value.is_empty() {
            if self.strictness == Strictness::Complete {
                self.issue(field, "is required");
            }
            None
        } else {
            Some(value)
        }
    }

    fn present<T: Copy>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() && self.strictness == Strictness::Complete {
            self.issue(field, "is required");
        }
        value
    }

    fn personal_info(&mut self, application: &LoanApplication) {
        let info = &application.personal_info;
        self.text("personalInfo.firstName", &info.first_name);
        self.text("personalInfo.lastName", &info.last_name);

        if let Some(email) = self.text("personalInfo.email", &info.email) {
            if !EmailAddress::is_valid(email) {
                self.issue("personalInfo.email", "must be a valid email address");
            }
        }

        if let Some(phone) = self.text("personalInfo.phone", &info.phone) {
            let allowed = phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ' | '.'));
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            if !allowed || digits < MIN_PHONE_DIGITS {
                self.issue("personalInfo.phone", "must be a valid phone number");
            }
        }

        if let Some(raw) = info.date_of_birth.as_deref().map(str::trim) {
            match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) if date < Utc::now().date_naive() => {}
                Ok(_) => self.issue("personalInfo.dateOfBirth", "must be in the past"),
                Err(_) => self.issue("personalInfo.dateOfBirth", "must be formatted YYYY-MM-DD"),
            }
        }

        if let Some(address) = &info.address {
            self.text("personalInfo.address.city", &address.city);
        }
    }

    fn loan_details(&mut self, application: &LoanApplication) {
        let details = &application.loan_details;

        if let Some(amount) = self.present("loanDetails.amount", details.amount) {
            if !amount.is_finite() || amount <= 0.0 {
                self.issue("loanDetails.amount", "must be greater than zero");
            }
        }

        self.text("loanDetails.purpose", &details.purpose);

        if let Some(term) = self.present("loanDetails.termMonths", details.term_months) {
            if term == 0 || term > MAX_TERM_MONTHS {
                self.issue("loanDetails.termMonths", "must be between 1 and 120 months");
            }
        }

        if let Some(currency) = details.currency.as_deref() {
            let valid = currency.len() == 3 && currency.bytes().all(|b| b.is_ascii_uppercase());
            if !valid {
                self.issue("loanDetails.currency", "must be a three-letter ISO 4217 code");
            }
        }
    }

    fn business_info(&mut self, application: &LoanApplication) {
        let business = &application.business_info;
        self.text("businessInfo.businessName", &business.business_name);
        self.text("businessInfo.businessType", &business.business_type);

        if let Some(years) = business.years_in_operation {
            if !years.is_finite() || years < 0.0 {
                self.issue("businessInfo.yearsInOperation", "must not be negative");
            }
        }
        if let Some(revenue) = business.monthly_revenue {
            if !revenue.is_finite() || revenue < 0.0 {
                self.issue("businessInfo.monthlyRevenue", "must not be negative");
            }
        }
    }

    fn documents(&mut self, documents: &[DocumentReference]) {
        if documents.is_empty() && self.strictness == Strictness::Complete {
            self.issue("documents", "at least one document is required");
        }

        // Uploaded documents are always complete references, drafts included.
        for (index, document) in documents.iter().enumerate() {
            for (name, value) in [
                ("documentType", &document.document_type),
                ("fileUrl", &document.file_url),
                ("fileName", &document.file_name),
            ] {
                if value.trim().is_empty() {
                    self.issue(&format!("documents[{index}].{name}"), "is required");
                }
            }
        }
    }

    fn finish(self, application: LoanApplication) -> Result<LoanApplication, ValidationError> {
        if self.issues.is_empty() {
            Ok(application)
        } else {
            Err(ValidationError::Fields(self.issues))
        }
    }
}
