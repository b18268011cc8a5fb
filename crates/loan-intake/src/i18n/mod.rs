//! Locale-keyed translation bundles with dotted-key lookup and `{{param}}` interpolation.

pub mod router;
pub mod store;

pub use router::i18n_router;
pub use store::{interpolate, TranslationLoadError, TranslationStore};
