use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParseEnumError, ValidationError, required, wire};

/// How serious a disaster is.
///
/// Parsing is case-insensitive; the canonical form is uppercase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Severity {
    /// Localised disruption.
    Low,
    /// Significant disruption (the default for new records).
    #[default]
    Medium,
    /// Widespread damage or risk to life.
    High,
    /// Ongoing threat to life at scale.
    Critical,
}

impl Severity {
    /// All severities, least severe first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// The canonical (uppercase) name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError::new("severity", s, "low, medium, high, critical"))
    }
}

impl TryFrom<String> for Severity {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Severity> for &'static str {
    fn from(severity: Severity) -> Self {
        severity.as_str()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A disaster event being coordinated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "DisasterRecord")]
pub struct Disaster {
    /// Server-assigned identifier.
    pub id: String,
    /// Short headline, e.g. "Manhattan Flood".
    pub title: Option<String>,
    /// Human-readable place name.
    pub location_name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Severity, if the record carried a recognised value.
    pub severity: Option<Severity>,
    /// Classification tags.
    pub tags: BTreeSet<String>,
    /// Latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    pub longitude: Option<f64>,
    /// When the record was created.
    pub created_at: Option<DateTime<Utc>>,
}

impl super::Entity for Disaster {
    fn id(&self) -> &str {
        &self.id
    }
}

/// The shape of a disaster as it arrives from the backend.
#[derive(Deserialize)]
struct DisasterRecord {
    #[serde(deserialize_with = "wire::id")]
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "locationName")]
    location_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default, deserialize_with = "wire::tags")]
    tags: BTreeSet<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<DateTime<Utc>>,
}

impl From<DisasterRecord> for Disaster {
    fn from(record: DisasterRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            location_name: record.location_name,
            description: record.description,
            severity: wire::lenient("severity", record.severity),
            tags: record.tags,
            latitude: record.latitude,
            longitude: record.longitude,
            created_at: record.created_at,
        }
    }
}

/// The payload used to create or update a disaster.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DisasterDraft {
    /// Short headline.
    pub title: String,
    /// Human-readable place name.
    pub location_name: String,
    /// Free-text description.
    pub description: String,
    /// Severity.
    pub severity: Severity,
    /// Classification tags.
    pub tags: BTreeSet<String>,
    /// Latitude in decimal degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl DisasterDraft {
    /// Check the draft and return a normalised copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the title, location or description is blank, or
    /// if only one of the coordinates is given or either is out of range.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        let title = required("title", &self.title)?.to_string();
        let location_name = required("location name", &self.location_name)?.to_string();
        let description = required("description", &self.description)?.to_string();

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    return Err(ValidationError::Invalid {
                        field: "latitude",
                        reason: format!("must be between -90 and 90, got {lat}"),
                    });
                }
                if !(-180.0..=180.0).contains(&lon) {
                    return Err(ValidationError::Invalid {
                        field: "longitude",
                        reason: format!("must be between -180 and 180, got {lon}"),
                    });
                }
            }
            (None, None) => {}
            _ => {
                return Err(ValidationError::Invalid {
                    field: "coordinates",
                    reason: "must include both latitude and longitude".to_string(),
                });
            }
        }

        Ok(Self {
            title,
            location_name,
            description,
            severity: self.severity,
            tags: super::normalise_tags(&self.tags),
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

impl From<&Disaster> for DisasterDraft {
    /// Start an edit from an existing record.
    fn from(disaster: &Disaster) -> Self {
        Self {
            title: disaster.title.clone().unwrap_or_default(),
            location_name: disaster.location_name.clone().unwrap_or_default(),
            description: disaster.description.clone().unwrap_or_default(),
            severity: disaster.severity.unwrap_or_default(),
            tags: disaster.tags.clone(),
            latitude: disaster.latitude,
            longitude: disaster.longitude,
        }
    }
}
