//! Domain models for disaster response coordination.
//!
//! This module contains the canonical entity types (disasters, resources,
//! reports, official updates, users), the validated drafts used to create and
//! update them, and configuration.
//!
//! Records arriving from the backend are normalised at ingestion: both
//! `snake_case` and `camelCase` field spellings are accepted and enumerations
//! are parsed case-insensitively into one canonical form.

use std::collections::BTreeSet;

mod config;
pub use config::{Config, DEFAULT_BASE_URL};

/// Disaster records and severities.
pub mod disaster;
pub use disaster::{Disaster, DisasterDraft, Severity};

/// Resources attached to disasters.
pub mod resource;
pub use resource::{Resource, ResourceDraft, ResourceStatus, ResourceType};

/// Field reports and their verification lifecycle.
pub mod report;
pub use report::{InvalidTransition, Report, ReportDraft, ReportPatch, VerificationStatus};

/// Official updates published by agencies.
pub mod update;
pub use update::{OfficialUpdate, UpdateCategory};

/// Users and authentication payloads.
pub mod user;
pub use user::{Credentials, Registration, User};

mod wire;

/// An entity with a server-assigned identifier.
pub trait Entity {
    /// The opaque identifier of the entity.
    fn id(&self) -> &str;
}

/// Remove the entity with the given id from a local collection.
///
/// Intended as the post-success step of a delete call, so that a list held
/// locally reflects the deletion without refetching.
///
/// Returns `true` if an entity was removed.
pub fn remove_by_id<E: Entity>(items: &mut Vec<E>, id: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.id() != id);
    items.len() != before
}

/// Error returned when a string does not name a member of a closed
/// enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}': expected one of {expected}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

/// A client-side validation failure.
///
/// These are detected before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was empty or missing.
    #[error("{0} is required")]
    Missing(&'static str),

    /// A field was present but its value is not acceptable.
    #[error("{field} {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Returns the trimmed value, or a [`ValidationError::Missing`] if it is
/// blank.
pub(crate) fn required<'a>(
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(trimmed)
    }
}

/// Normalise a tag set: trimmed, lowercase, blanks dropped.
pub(crate) fn normalise_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}
