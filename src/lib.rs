//! Disaster Response Coordination
//!
//! A client for a disaster-response backend: disasters, resources, field
//! reports, official updates, and the session that gates changes to them.

pub mod domain;
pub use domain::{
    Config, Disaster, DisasterDraft, OfficialUpdate, Report, ReportDraft, Resource, ResourceDraft,
    Severity, User, ValidationError, VerificationStatus,
};

/// Client-side filtering of entity collections.
pub mod filter;
pub use filter::{Criteria, Filterable};

/// Keyword-based urgency classification.
pub mod priority;
pub use priority::{Classification, Classifier, KeywordClassifier, PriorityAlert, Tier};

/// HTTP client for the remote backend.
pub mod api;
pub use api::ApiClient;

pub mod session;
pub use session::{AuthApi, Session, SessionState, SessionStore};

pub mod route;
pub use route::{Access, Redirect, Route};

pub mod action;
pub use action::{ActionExecutor, ActionState, Outcome};
