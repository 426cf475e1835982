//! Category and domain configuration
//!
//! `categories` holds the raw YAML shape; `registry` is the validated,
//! immutable view the rest of the system reads from.

mod categories;
mod registry;

pub use categories::{CategoriesConfig, CategoryEntry, ConfidenceThresholds, DomainEntry};
pub use registry::{CategoryInfo, CategoryRegistry, UNKNOWN_CODE};
