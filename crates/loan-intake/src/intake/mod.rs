//! Loan application intake: validation, encryption, time-boxed storage, notification and audit.

pub mod audit;
pub mod domain;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use audit::{AuditAction, AuditEntry, AuditError, AuditTrail};
pub use domain::{
    Address, ApplicationId, ApplicationStatusView, BusinessInfo, DocumentReference, DraftId,
    DraftReceipt, LoanApplication, LoanDetails, PersonalInfo, RecordStatus, RetentionPolicy,
    StoredRecord, SubmissionReceipt,
};
pub use router::intake_router;
pub use service::{ApplicationIntakeService, IntakeError, SUBMISSION_FAILED_MESSAGE};
pub use validation::{validate_application, validate_draft, FieldIssue, ValidationError};
