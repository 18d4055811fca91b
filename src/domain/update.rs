use std::{convert::Infallible, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire;

/// The nature of an official update.
///
/// Agencies publish categories beyond the well-known ones; those are kept
/// (lowercased) as [`UpdateCategory::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UpdateCategory {
    /// Immediate action required.
    Emergency,
    /// Heightened risk.
    Warning,
    /// Guidance for the public.
    Advisory,
    /// Situation report.
    #[default]
    Update,
    /// Any other category.
    Other(String),
}

impl UpdateCategory {
    /// The well-known categories.
    pub const KNOWN: [Self; 4] = [
        Self::Emergency,
        Self::Warning,
        Self::Advisory,
        Self::Update,
    ];

    /// The canonical (lowercase) name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Emergency => "emergency",
            Self::Warning => "warning",
            Self::Advisory => "advisory",
            Self::Update => "update",
            Self::Other(other) => other,
        }
    }
}

impl FromStr for UpdateCategory {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Ok(Self::KNOWN
            .into_iter()
            .find(|category| category.as_str() == s)
            .unwrap_or(Self::Other(s)))
    }
}

impl From<String> for UpdateCategory {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(category) => category,
            Err(never) => match never {},
        }
    }
}

impl From<UpdateCategory> for String {
    fn from(category: UpdateCategory) -> Self {
        match category {
            UpdateCategory::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for UpdateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An update published by an official agency about a disaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "UpdateRecord")]
pub struct OfficialUpdate {
    /// Identifier, when the source provides one.
    pub id: Option<String>,
    /// Headline.
    pub title: Option<String>,
    /// Body text.
    pub content: Option<String>,
    /// Publishing agency.
    pub source: Option<String>,
    /// Nature of the update, when given.
    pub category: Option<UpdateCategory>,
    /// Link to the original publication.
    pub url: Option<String>,
    /// Publication time.
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct UpdateRecord {
    #[serde(default, deserialize_with = "wire::optional_id")]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "summary")]
    content: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, alias = "link")]
    url: Option<String>,
    #[serde(default, alias = "publishedAt", alias = "timestamp", alias = "date")]
    published_at: Option<DateTime<Utc>>,
}

impl From<UpdateRecord> for OfficialUpdate {
    fn from(record: UpdateRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            source: record.source,
            category: record
                .category
                .filter(|category| !category.trim().is_empty())
                .map(UpdateCategory::from),
            url: record.url,
            published_at: record.published_at,
        }
    }
}
