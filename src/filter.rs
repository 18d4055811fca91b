//! Filtering of in-memory entity collections.
//!
//! Every list view applies the same three filters, composed with logical AND:
//!
//! - a case-insensitive substring query over a fixed set of fields per entity,
//! - a tag selection with OR semantics (any shared tag retains the entity),
//! - a single status (or severity) value.
//!
//! A filter whose criterion is empty passes everything through, so empty
//! [`Criteria`] return the input unchanged. Filtering never reorders.

use std::{cmp::Reverse, collections::BTreeSet};

use chrono::{DateTime, Utc};

use crate::domain::{Disaster, OfficialUpdate, Report, Resource, UpdateCategory};

/// An entity that can be narrowed by [`Criteria`].
pub trait Filterable {
    /// The fields searched by a text query.
    ///
    /// Absent fields are simply omitted and never match.
    fn search_fields(&self) -> Vec<&str>;

    /// Tags, if the entity carries any.
    fn tags(&self) -> Option<&BTreeSet<String>> {
        None
    }

    /// The canonical value matched by a status selection.
    fn status(&self) -> Option<&str> {
        None
    }

    /// The canonical value matched by a kind selection.
    fn kind(&self) -> Option<&str> {
        None
    }

    /// Creation (or publication) time, used for newest-first ordering.
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// The selection applied to a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    query: Option<String>,
    tags: BTreeSet<String>,
    status: Option<String>,
    kinds: BTreeSet<String>,
}

impl Criteria {
    /// Criteria that match everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain entities whose searchable fields contain `query`, ignoring
    /// case.
    ///
    /// A blank query disables the text filter.
    #[must_use]
    pub fn query(mut self, query: impl AsRef<str>) -> Self {
        let query = query.as_ref();
        self.query = if query.trim().is_empty() {
            None
        } else {
            Some(query.to_lowercase())
        };
        self
    }

    /// Retain entities sharing at least one of `tags`, ignoring case.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = crate::domain::normalise_tags(tags);
        self
    }

    /// Retain entities whose status equals `status`, ignoring case.
    ///
    /// A blank value disables the status filter.
    #[must_use]
    pub fn status(mut self, status: impl AsRef<str>) -> Self {
        let status = status.as_ref().trim();
        self.status = (!status.is_empty()).then(|| status.to_string());
        self
    }

    /// Retain entities of any of the given kinds, ignoring case.
    #[must_use]
    pub fn kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.kinds = crate::domain::normalise_tags(kinds);
        self
    }

    /// Whether these criteria would pass every entity through.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query.is_none()
            && self.tags.is_empty()
            && self.status.is_none()
            && self.kinds.is_empty()
    }

    /// Whether a single entity satisfies every active filter.
    pub fn matches<E: Filterable + ?Sized>(&self, entity: &E) -> bool {
        if let Some(query) = &self.query {
            let found = entity
                .search_fields()
                .into_iter()
                .any(|field| field.to_lowercase().contains(query.as_str()));
            if !found {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let shared = entity.tags().is_some_and(|tags| {
                tags.iter()
                    .any(|tag| self.tags.contains(tag.to_lowercase().as_str()))
            });
            if !shared {
                return false;
            }
        }

        if let Some(status) = &self.status {
            if !entity
                .status()
                .is_some_and(|value| value.eq_ignore_ascii_case(status))
            {
                return false;
            }
        }

        if !self.kinds.is_empty() {
            let kind = entity.kind().map(str::to_lowercase);
            if !kind.is_some_and(|kind| self.kinds.contains(&kind)) {
                return false;
            }
        }

        true
    }
}

/// Borrow the entities that satisfy `criteria`, in input order.
pub fn filter<'a, E: Filterable>(entities: &'a [E], criteria: &Criteria) -> Vec<&'a E> {
    if criteria.is_empty() {
        return entities.iter().collect();
    }
    entities
        .iter()
        .filter(|entity| criteria.matches(*entity))
        .collect()
}

/// Keep only the entities that satisfy `criteria`, in input order.
pub fn retain<E: Filterable>(entities: &mut Vec<E>, criteria: &Criteria) {
    if !criteria.is_empty() {
        entities.retain(|entity| criteria.matches(entity));
    }
}

/// Order entities newest first.
///
/// The sort is stable; entities without a timestamp sort last.
pub fn newest_first<E: Filterable>(entities: &mut [E]) {
    entities.sort_by_key(|entity| Reverse(entity.timestamp()));
}

impl Filterable for Disaster {
    fn search_fields(&self) -> Vec<&str> {
        [&self.title, &self.location_name, &self.description]
            .into_iter()
            .filter_map(Option::as_deref)
            .collect()
    }

    fn tags(&self) -> Option<&BTreeSet<String>> {
        Some(&self.tags)
    }

    fn status(&self) -> Option<&str> {
        self.severity.map(|severity| severity.as_str())
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Filterable for Resource {
    fn search_fields(&self) -> Vec<&str> {
        [
            self.name.as_deref(),
            self.kind.as_ref().map(|kind| kind.as_str()),
            self.location.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn status(&self) -> Option<&str> {
        self.status.map(|status| status.as_str())
    }

    fn kind(&self) -> Option<&str> {
        self.kind.as_ref().map(|kind| kind.as_str())
    }
}

impl Filterable for Report {
    fn search_fields(&self) -> Vec<&str> {
        [self.content.as_deref(), self.username.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }

    fn tags(&self) -> Option<&BTreeSet<String>> {
        Some(&self.tags)
    }

    fn status(&self) -> Option<&str> {
        Some(self.verification_status.as_str())
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Filterable for OfficialUpdate {
    fn search_fields(&self) -> Vec<&str> {
        [
            self.title.as_deref(),
            self.content.as_deref(),
            self.source.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn status(&self) -> Option<&str> {
        self.category.as_ref().map(UpdateCategory::as_str)
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

impl<E: Filterable + ?Sized> Filterable for &E {
    fn search_fields(&self) -> Vec<&str> {
        (**self).search_fields()
    }

    fn tags(&self) -> Option<&BTreeSet<String>> {
        (**self).tags()
    }

    fn status(&self) -> Option<&str> {
        (**self).status()
    }

    fn kind(&self) -> Option<&str> {
        (**self).kind()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        (**self).timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ResourceStatus, ResourceType, Severity, VerificationStatus};

    fn disaster(id: &str, title: &str, tags: &[&str], severity: Severity) -> Disaster {
        Disaster {
            id: id.to_string(),
            title: Some(title.to_string()),
            location_name: None,
            description: None,
            severity: Some(severity),
            tags: tags.iter().map(|tag| (*tag).to_string()).collect(),
            latitude: None,
            longitude: None,
            created_at: None,
        }
    }

    fn disasters() -> Vec<Disaster> {
        vec![
            disaster("1", "Manhattan Flood", &["flood", "urgent"], Severity::High),
            disaster("2", "Houston Hurricane", &["hurricane"], Severity::Critical),
            disaster("3", "California Wildfire", &["wildfire"], Severity::High),
        ]
    }

    fn ids<E: crate::domain::Entity>(entities: &[&E]) -> Vec<String> {
        entities.iter().map(|e| e.id().to_string()).collect()
    }

    #[test]
    fn empty_criteria_is_identity() {
        let disasters = disasters();
        let filtered = filter(&disasters, &Criteria::new());
        assert_eq!(filtered.len(), disasters.len());
        assert!(filtered.iter().zip(&disasters).all(|(a, b)| std::ptr::eq(*a, b)));
    }

    #[test]
    fn query_matches_title() {
        let disasters = disasters();
        let filtered = filter(&disasters, &Criteria::new().query("flood"));
        assert_eq!(ids(&filtered), ["1"]);
    }

    #[test]
    fn query_is_case_insensitive() {
        let disasters = disasters();
        let filtered = filter(&disasters, &Criteria::new().query("HOUSTON"));
        assert_eq!(ids(&filtered), ["2"]);
    }

    #[test]
    fn blank_query_is_ignored() {
        let disasters = disasters();
        assert_eq!(filter(&disasters, &Criteria::new().query("   ")).len(), 3);
    }

    #[test]
    fn query_searches_location_and_description() {
        let mut disasters = disasters();
        disasters[2].location_name = Some("Sonoma County".to_string());
        disasters[1].description = Some("Storm surge expected".to_string());

        assert_eq!(ids(&filter(&disasters, &Criteria::new().query("sonoma"))), ["3"]);
        assert_eq!(ids(&filter(&disasters, &Criteria::new().query("surge"))), ["2"]);
    }

    #[test]
    fn tags_use_or_semantics() {
        let disasters = disasters();
        let filtered = filter(&disasters, &Criteria::new().tags(["flood", "wildfire"]));
        assert_eq!(ids(&filtered), ["1", "3"]);
    }

    #[test]
    fn severity_is_exact() {
        let disasters = disasters();
        let filtered = filter(&disasters, &Criteria::new().status("high"));
        assert_eq!(ids(&filtered), ["1", "3"]);
    }

    #[test]
    fn filters_compose_with_and() {
        let disasters = disasters();
        let criteria = Criteria::new()
            .query("o")
            .tags(["flood", "hurricane"])
            .status("CRITICAL");
        assert_eq!(ids(&filter(&disasters, &criteria)), ["2"]);
    }

    #[test]
    fn missing_fields_do_not_match() {
        let mut bare = disaster("9", "", &[], Severity::Low);
        bare.title = None;
        bare.severity = None;
        let disasters = vec![bare];

        assert!(filter(&disasters, &Criteria::new().query("x")).is_empty());
        assert!(filter(&disasters, &Criteria::new().tags(["flood"])).is_empty());
        assert!(filter(&disasters, &Criteria::new().status("LOW")).is_empty());
    }

    fn resource(id: &str, name: &str, kind: ResourceType, status: ResourceStatus) -> Resource {
        Resource {
            id: id.to_string(),
            name: Some(name.to_string()),
            kind: Some(kind),
            quantity: 1,
            location: Some("Red Cross Center".to_string()),
            status: Some(status),
            description: None,
            disaster_id: None,
        }
    }

    #[test]
    fn resources_filter_by_type_and_status() {
        let resources = vec![
            resource("1", "Water", ResourceType::Supplies, ResourceStatus::Available),
            resource("2", "Ambulance", ResourceType::Vehicle, ResourceStatus::Deployed),
            resource("3", "Blankets", ResourceType::Supplies, ResourceStatus::Depleted),
        ];

        let by_kind = filter(&resources, &Criteria::new().kinds(["supplies"]));
        assert_eq!(ids(&by_kind), ["1", "3"]);

        let by_status = filter(&resources, &Criteria::new().status("deployed"));
        assert_eq!(ids(&by_status), ["2"]);

        let by_type_text = filter(&resources, &Criteria::new().query("vehic"));
        assert_eq!(ids(&by_type_text), ["2"]);
    }

    #[test]
    fn reports_search_username_and_status() {
        let mut reports: Vec<Report> = serde_json::from_str(
            r#"[
                {"id": "1", "content": "Water rising", "user": {"username": "citizen1"}, "verification_status": "verified"},
                {"id": "2", "content": "Road blocked", "username": "firstResponder42"}
            ]"#,
        )
        .unwrap();

        let by_user = filter(&reports, &Criteria::new().query("responder"));
        assert_eq!(ids(&by_user), ["2"]);

        retain(&mut reports, &Criteria::new().status(VerificationStatus::Pending.as_str()));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, "2");
    }

    #[test]
    fn newest_first_keeps_undated_last() {
        let mut reports: Vec<Report> = serde_json::from_str(
            r#"[
                {"id": "a"},
                {"id": "b", "created_at": "2025-06-14T08:00:00Z"},
                {"id": "c", "created_at": "2025-06-17T10:00:00Z"}
            ]"#,
        )
        .unwrap();

        newest_first(&mut reports);

        let order: Vec<_> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, ["c", "b", "a"]);
    }

    #[test]
    fn advisory_updates_match_their_category() {
        let updates: Vec<OfficialUpdate> = serde_json::from_str(
            r#"[
                {"title": "Boil water notice", "category": "advisory"},
                {"title": "Evacuate zone A", "category": "emergency"}
            ]"#,
        )
        .unwrap();

        let advisories = filter(&updates, &Criteria::new().status("Advisory"));
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].title.as_deref(), Some("Boil water notice"));
    }
}
