use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{ParseEnumError, ValidationError, required, wire};

/// What kind of thing a resource is.
///
/// The set of kinds is open: unrecognised values are kept verbatim
/// (lowercased) as [`ResourceType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    /// Consumables such as food, water and blankets.
    #[default]
    Supplies,
    /// People: responders, volunteers, specialists.
    Personnel,
    /// Transport.
    Vehicle,
    /// Buildings and fixed infrastructure.
    Facility,
    /// Medical equipment and teams.
    Medical,
    /// Emergency accommodation.
    Shelter,
    /// Any other kind.
    Other(String),
}

impl ResourceType {
    /// The well-known kinds.
    pub const KNOWN: [Self; 6] = [
        Self::Supplies,
        Self::Personnel,
        Self::Vehicle,
        Self::Facility,
        Self::Medical,
        Self::Shelter,
    ];

    /// The canonical (lowercase) name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Supplies => "supplies",
            Self::Personnel => "personnel",
            Self::Vehicle => "vehicle",
            Self::Facility => "facility",
            Self::Medical => "medical",
            Self::Shelter => "shelter",
            Self::Other(other) => other,
        }
    }
}

impl FromStr for ResourceType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Ok(Self::KNOWN
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .unwrap_or(Self::Other(s)))
    }
}

impl From<String> for ResourceType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<ResourceType> for String {
    fn from(kind: ResourceType) -> Self {
        match kind {
            ResourceType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Availability of a resource.
///
/// Parsing is case-insensitive; the canonical form is lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ResourceStatus {
    /// Ready to be deployed.
    #[default]
    Available,
    /// Sent to a disaster.
    Deployed,
    /// In use.
    Active,
    /// On call.
    Standby,
    /// Used up.
    Depleted,
}

impl ResourceStatus {
    /// All statuses.
    pub const ALL: [Self; 5] = [
        Self::Available,
        Self::Deployed,
        Self::Active,
        Self::Standby,
        Self::Depleted,
    ];

    /// The canonical (lowercase) name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Deployed => "deployed",
            Self::Active => "active",
            Self::Standby => "standby",
            Self::Depleted => "depleted",
        }
    }
}

impl FromStr for ResourceStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ParseEnumError::new(
                    "resource status",
                    s,
                    "available, deployed, active, standby, depleted",
                )
            })
    }
}

impl TryFrom<String> for ResourceStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceStatus> for &'static str {
    fn from(status: ResourceStatus) -> Self {
        status.as_str()
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can be deployed in response to a disaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ResourceRecord")]
pub struct Resource {
    /// Server-assigned identifier.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Kind of resource.
    #[serde(rename = "type")]
    pub kind: Option<ResourceType>,
    /// How many units are held.
    pub quantity: u32,
    /// Where the resource is.
    pub location: Option<String>,
    /// Availability.
    pub status: Option<ResourceStatus>,
    /// Free-text description.
    pub description: Option<String>,
    /// The disaster this resource is attached to, if any.
    pub disaster_id: Option<String>,
}

impl super::Entity for Resource {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Deserialize)]
struct ResourceRecord {
    #[serde(deserialize_with = "wire::id")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type", alias = "resource_type", alias = "resourceType")]
    kind: Option<String>,
    #[serde(default)]
    quantity: Option<i64>,
    #[serde(default, alias = "location_name", alias = "locationName")]
    location: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "disasterId", deserialize_with = "wire::optional_id")]
    disaster_id: Option<String>,
}

impl From<ResourceRecord> for Resource {
    fn from(record: ResourceRecord) -> Self {
        let quantity = record.quantity.map_or(0, |quantity| {
            u32::try_from(quantity).unwrap_or_else(|_| {
                tracing::warn!(
                    "resource {}: quantity {quantity} out of range, using 0",
                    record.id
                );
                0
            })
        });

        Self {
            id: record.id,
            name: record.name,
            kind: record.kind.map(ResourceType::from),
            quantity,
            location: record.location,
            status: wire::lenient("status", record.status),
            description: record.description,
            disaster_id: record.disaster_id,
        }
    }
}

/// The payload used to create or update a resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResourceDraft {
    /// Display name.
    pub name: String,
    /// Kind of resource.
    #[serde(rename = "type")]
    pub kind: ResourceType,
    /// How many units are held.
    pub quantity: u32,
    /// Where the resource is.
    pub location: String,
    /// Availability.
    pub status: ResourceStatus,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The disaster this resource is attached to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disaster_id: Option<String>,
}

impl ResourceDraft {
    /// Check the draft and return a normalised copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or location is blank, or the kind is an
    /// empty custom value.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        let name = required("name", &self.name)?.to_string();
        let location = required("location", &self.location)?.to_string();
        if let ResourceType::Other(other) = &self.kind {
            required("type", other)?;
        }

        Ok(Self {
            name,
            location,
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            disaster_id: self
                .disaster_id
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            ..self.clone()
        })
    }
}

impl From<&Resource> for ResourceDraft {
    fn from(resource: &Resource) -> Self {
        Self {
            name: resource.name.clone().unwrap_or_default(),
            kind: resource.kind.clone().unwrap_or_default(),
            quantity: resource.quantity,
            location: resource.location.clone().unwrap_or_default(),
            status: resource.status.unwrap_or_default(),
            description: resource.description.clone(),
            disaster_id: resource.disaster_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_types_are_preserved() {
        assert_eq!("Boat".parse::<ResourceType>().unwrap(), ResourceType::Other("boat".into()));
        assert_eq!("VEHICLE".parse::<ResourceType>().unwrap(), ResourceType::Vehicle);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Deployed".parse::<ResourceStatus>(), Ok(ResourceStatus::Deployed));
        assert!("lost".parse::<ResourceStatus>().is_err());
    }

    #[test]
    fn normalises_records() {
        let resource: Resource = serde_json::from_str(
            r#"{"id": 3, "name": "Water Bottles", "type": "Supplies", "quantity": 500, "location": "Red Cross Center", "status": "AVAILABLE", "disasterId": 1}"#,
        )
        .unwrap();

        assert_eq!(resource.id, "3");
        assert_eq!(resource.kind, Some(ResourceType::Supplies));
        assert_eq!(resource.status, Some(ResourceStatus::Available));
        assert_eq!(resource.quantity, 500);
        assert_eq!(resource.disaster_id.as_deref(), Some("1"));
    }

    #[test]
    fn negative_quantity_is_clamped() {
        let resource: Resource =
            serde_json::from_str(r#"{"id": "x", "quantity": -4}"#).unwrap();
        assert_eq!(resource.quantity, 0);
        assert!(resource.kind.is_none());
    }

    #[test]
    fn serialises_type_field() {
        let resource: Resource =
            serde_json::from_str(r#"{"id": "x", "type": "shelter", "status": "standby"}"#).unwrap();
        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value["type"], "shelter");
        assert_eq!(value["status"], "standby");
    }

    #[test]
    fn draft_requires_location() {
        let draft = ResourceDraft {
            name: "Ambulance".to_string(),
            kind: ResourceType::Vehicle,
            quantity: 2,
            ..ResourceDraft::default()
        };
        assert_eq!(draft.validated(), Err(ValidationError::Missing("location")));
    }

    #[test]
    fn draft_drops_blank_description() {
        let draft = ResourceDraft {
            name: "Ambulance".to_string(),
            location: "Station 4".to_string(),
            description: Some("  ".to_string()),
            ..ResourceDraft::default()
        };
        assert_eq!(draft.validated().unwrap().description, None);
    }
}
