//! Server side of a microfinance website: translation bundles, document uploads and the
//! encrypted, time-boxed loan application intake pipeline.

pub mod config;
pub mod crypto;
pub mod error;
pub mod i18n;
pub(crate) mod ids;
pub mod intake;
pub mod notify;
pub mod storage;
pub mod telemetry;
pub mod upload;
