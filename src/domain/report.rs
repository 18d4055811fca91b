use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParseEnumError, ValidationError, required, wire};

/// Where a report is in its review lifecycle.
///
/// Reports start out [`Pending`](Self::Pending) and move, once, to either
/// [`Verified`](Self::Verified) or [`Unverified`](Self::Unverified).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum VerificationStatus {
    /// Awaiting review.
    #[default]
    Pending,
    /// Confirmed authentic.
    Verified,
    /// Rejected as inauthentic or unconfirmable.
    Unverified,
}

impl VerificationStatus {
    /// All statuses.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Verified, Self::Unverified];

    /// The canonical (lowercase) name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Unverified => "unverified",
        }
    }

    /// Whether a review outcome has been recorded.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Move to `next`, if the lifecycle allows it.
    ///
    /// # Errors
    ///
    /// Only `pending → verified` and `pending → unverified` are permitted.
    pub fn transition(self, next: Self) -> Result<Self, InvalidTransition> {
        match (self, next) {
            (Self::Pending, Self::Verified | Self::Unverified) => Ok(next),
            _ => Err(InvalidTransition {
                from: self,
                to: next,
            }),
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ParseEnumError::new("verification status", s, "pending, verified, unverified")
            })
    }
}

impl TryFrom<String> for VerificationStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VerificationStatus> for &'static str {
    fn from(status: VerificationStatus) -> Self {
        status.as_str()
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verification status change that the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot change verification status from {from} to {to}")]
pub struct InvalidTransition {
    /// The current status.
    pub from: VerificationStatus,
    /// The requested status.
    pub to: VerificationStatus,
}

impl From<InvalidTransition> for ValidationError {
    fn from(error: InvalidTransition) -> Self {
        Self::Invalid {
            field: "verification status",
            reason: error.to_string(),
        }
    }
}

/// A field report submitted against a disaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ReportRecord")]
pub struct Report {
    /// Server-assigned identifier.
    pub id: String,
    /// The disaster being reported on.
    pub disaster_id: Option<String>,
    /// The submitting user's id.
    pub user_id: Option<String>,
    /// The submitting user's name, when the backend includes it.
    pub username: Option<String>,
    /// Free-text content.
    pub content: Option<String>,
    /// Supporting image.
    pub image_url: Option<String>,
    /// Classification tags.
    pub tags: BTreeSet<String>,
    /// Review status.
    pub verification_status: VerificationStatus,
    /// When the report was submitted.
    pub created_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Record a review outcome.
    ///
    /// # Errors
    ///
    /// Fails if the report has already been reviewed or `status` is
    /// [`VerificationStatus::Pending`].
    pub fn set_verification(
        &mut self,
        status: VerificationStatus,
    ) -> Result<(), InvalidTransition> {
        self.verification_status = self.verification_status.transition(status)?;
        Ok(())
    }
}

impl super::Entity for Report {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Deserialize)]
struct Author {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Deserialize)]
struct ReportRecord {
    #[serde(deserialize_with = "wire::id")]
    id: String,
    #[serde(default, alias = "disasterId", deserialize_with = "wire::optional_id")]
    disaster_id: Option<String>,
    #[serde(default, alias = "userId", deserialize_with = "wire::optional_id")]
    user_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    user: Option<Author>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, alias = "imageUrl")]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "wire::tags")]
    tags: BTreeSet<String>,
    #[serde(default, alias = "verificationStatus")]
    verification_status: Option<String>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<DateTime<Utc>>,
}

impl From<ReportRecord> for Report {
    fn from(record: ReportRecord) -> Self {
        let username = record
            .username
            .or_else(|| record.user.and_then(|author| author.username));

        Self {
            id: record.id,
            disaster_id: record.disaster_id,
            user_id: record.user_id,
            username,
            content: record.content,
            image_url: record.image_url,
            tags: record.tags,
            verification_status: wire::lenient("verification status", record.verification_status)
                .unwrap_or_default(),
            created_at: record.created_at,
        }
    }
}

/// The payload used to submit a new report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReportDraft {
    /// The disaster being reported on.
    pub disaster_id: String,
    /// Free-text content.
    pub content: String,
    /// Supporting image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Classification tags.
    pub tags: BTreeSet<String>,
}

impl ReportDraft {
    /// Check the draft and return a normalised copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the disaster id or content is blank, or the image
    /// URL is not an http(s) URL.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            disaster_id: required("disaster", &self.disaster_id)?.to_string(),
            content: required("content", &self.content)?.to_string(),
            image_url: validated_image_url(self.image_url.as_deref())?,
            tags: super::normalise_tags(&self.tags),
        })
    }
}

/// A partial update to a report.
///
/// Only the fields that are set are sent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReportPatch {
    /// Replacement content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Replacement image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Replacement tag set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    /// New review status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<VerificationStatus>,
}

impl ReportPatch {
    /// A patch recording a review outcome for `report`.
    ///
    /// # Errors
    ///
    /// Fails if the transition is not allowed from the report's current
    /// status.
    pub fn verification(
        report: &Report,
        status: VerificationStatus,
    ) -> Result<Self, InvalidTransition> {
        let status = report.verification_status.transition(status)?;
        Ok(Self {
            verification_status: Some(status),
            ..Self::default()
        })
    }

    /// Whether the patch would change anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.image_url.is_none()
            && self.tags.is_none()
            && self.verification_status.is_none()
    }

    /// Check the patch and return a normalised copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is empty, sets blank content or an
    /// invalid image URL.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::Invalid {
                field: "update",
                reason: "must change at least one field".to_string(),
            });
        }
        let content = match &self.content {
            Some(content) => Some(required("content", content)?.to_string()),
            None => None,
        };
        Ok(Self {
            content,
            image_url: validated_image_url(self.image_url.as_deref())?,
            tags: self.tags.as_ref().map(super::normalise_tags),
            verification_status: self.verification_status,
        })
    }
}

fn validated_image_url(url: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) else {
        return Ok(None);
    };
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(Some(url.to_string()))
    } else {
        Err(ValidationError::Invalid {
            field: "image URL",
            reason: format!("must be an http(s) URL, got '{url}'"),
        })
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(VerificationStatus::Pending, VerificationStatus::Verified, true; "pending to verified")]
    #[test_case(VerificationStatus::Pending, VerificationStatus::Unverified, true; "pending to unverified")]
    #[test_case(VerificationStatus::Pending, VerificationStatus::Pending, false; "pending to pending")]
    #[test_case(VerificationStatus::Verified, VerificationStatus::Unverified, false; "verified is final")]
    #[test_case(VerificationStatus::Unverified, VerificationStatus::Verified, false; "unverified is final")]
    #[test_case(VerificationStatus::Verified, VerificationStatus::Pending, false; "no reopening")]
    fn transitions(from: VerificationStatus, to: VerificationStatus, allowed: bool) {
        assert_eq!(from.transition(to).is_ok(), allowed);
    }

    fn report(json: &str) -> Report {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn reads_nested_username() {
        let report = report(
            r#"{"id": "1", "disaster_id": "2", "content": "Water rising", "user": {"username": "citizen1"}, "verification_status": "PENDING"}"#,
        );
        assert_eq!(report.username.as_deref(), Some("citizen1"));
        assert_eq!(report.verification_status, VerificationStatus::Pending);
        assert_eq!(report.disaster_id.as_deref(), Some("2"));
    }

    #[test]
    fn reads_camel_case_fields() {
        let report = report(
            r#"{"id": "1", "disasterId": "2", "userId": "u1", "imageUrl": "https://x/y.png", "verificationStatus": "Verified"}"#,
        );
        assert_eq!(report.user_id.as_deref(), Some("u1"));
        assert_eq!(report.image_url.as_deref(), Some("https://x/y.png"));
        assert_eq!(report.verification_status, VerificationStatus::Verified);
    }

    #[test]
    fn missing_status_defaults_to_pending() {
        assert_eq!(
            report(r#"{"id": "1"}"#).verification_status,
            VerificationStatus::Pending
        );
    }

    #[test]
    fn verification_is_one_way() {
        let mut report = report(r#"{"id": "1"}"#);
        report.set_verification(VerificationStatus::Verified).unwrap();
        let error = report
            .set_verification(VerificationStatus::Unverified)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot change verification status from verified to unverified"
        );
        assert_eq!(report.verification_status, VerificationStatus::Verified);
    }

    #[test]
    fn verification_patch_only_sets_status() {
        let report = report(r#"{"id": "1", "content": "x"}"#);
        let patch = ReportPatch::verification(&report, VerificationStatus::Unverified).unwrap();
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({"verification_status": "unverified"}));
    }

    #[test]
    fn draft_rejects_non_http_image() {
        let draft = ReportDraft {
            disaster_id: "1".to_string(),
            content: "Road blocked".to_string(),
            image_url: Some("file:///tmp/x.png".to_string()),
            tags: BTreeSet::new(),
        };
        assert!(matches!(
            draft.validated(),
            Err(ValidationError::Invalid {
                field: "image URL",
                ..
            })
        ));
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(ReportPatch::default().validated().is_err());
    }
}
