//! Urgency triage for free text.
//!
//! A [`Classifier`] assigns a [`Tier`] to a piece of text. The default
//! [`KeywordClassifier`] looks for urgency-signalling terms; it is a scoring
//! heuristic, and callers depend only on the trait so it can be replaced.

use std::{cmp::Reverse, fmt};

use serde::Serialize;

/// The default urgency lexicon.
pub const URGENT_KEYWORDS: [&str; 18] = [
    "urgent",
    "emergency",
    "immediate",
    "critical",
    "life-threatening",
    "sos",
    "help",
    "danger",
    "severe",
    "trapped",
    "evacuate",
    "evacuation",
    "stranded",
    "medical",
    "casualty",
    "casualties",
    "wounded",
    "injured",
];

/// Discrete urgency of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// No urgency signals.
    #[default]
    Normal,
    /// One or two urgency signals.
    High,
    /// Three or more urgency signals.
    Critical,
}

impl Tier {
    /// The tier for a number of distinct keyword matches.
    #[must_use]
    pub const fn from_match_count(count: usize) -> Self {
        match count {
            0 => Self::Normal,
            1 | 2 => Self::High,
            _ => Self::Critical,
        }
    }

    /// The canonical (lowercase) name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of classifying a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// The lexicon entries found, in lexicon order, each at most once.
    pub matched_keywords: Vec<String>,
    /// The resulting tier.
    pub tier: Tier,
}

/// A strategy for assigning urgency to text.
pub trait Classifier {
    /// Classify `text`.
    ///
    /// Implementations must be deterministic: the same text always yields
    /// the same classification.
    fn classify(&self, text: &str) -> Classification;
}

/// Classifies text by substring containment of lexicon entries.
///
/// Matching ignores case. Repeated occurrences of an entry count once, and
/// the tier follows [`Tier::from_match_count`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordClassifier {
    lexicon: Vec<String>,
}

impl KeywordClassifier {
    /// A classifier using a custom lexicon.
    ///
    /// Entries are lowercased; blanks and duplicates are dropped, keeping
    /// the first occurrence.
    #[must_use]
    pub fn new<I, S>(lexicon: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: Vec<String> = Vec::new();
        for entry in lexicon {
            let entry = entry.as_ref().trim().to_lowercase();
            if !entry.is_empty() && !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        Self { lexicon: entries }
    }

    /// The lexicon in matching order.
    #[must_use]
    pub fn lexicon(&self) -> &[String] {
        &self.lexicon
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(URGENT_KEYWORDS)
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Classification {
        let haystack = text.to_lowercase();
        let matched_keywords: Vec<String> = self
            .lexicon
            .iter()
            .filter(|keyword| haystack.contains(keyword.as_str()))
            .cloned()
            .collect();
        let tier = Tier::from_match_count(matched_keywords.len());

        Classification {
            matched_keywords,
            tier,
        }
    }
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn classify(&self, text: &str) -> Classification {
        (**self).classify(text)
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&self, text: &str) -> Classification {
        (**self).classify(text)
    }
}

/// A classified piece of text.
///
/// Derived on demand; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityAlert {
    /// The text that was classified.
    pub source_text: String,
    /// The lexicon entries found, in lexicon order.
    pub matched_keywords: Vec<String>,
    /// The resulting tier.
    pub tier: Tier,
}

impl PriorityAlert {
    /// Classify `text` into an alert.
    pub fn from_text(classifier: &impl Classifier, text: &str) -> Self {
        let Classification {
            matched_keywords,
            tier,
        } = classifier.classify(text);
        Self {
            source_text: text.to_string(),
            matched_keywords,
            tier,
        }
    }
}

/// An item paired with the alert raised for its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triaged<'a, T> {
    /// The classified item.
    pub item: &'a T,
    /// The alert raised for it.
    pub alert: PriorityAlert,
}

/// Classify a collection, keeping only items above [`Tier::Normal`].
///
/// Results are ordered most urgent first; items of equal tier keep their
/// input order. Items for which `text` returns `None` are skipped.
pub fn triage<'a, T, C, F>(classifier: &C, items: &'a [T], text: F) -> Vec<Triaged<'a, T>>
where
    C: Classifier + ?Sized,
    F: Fn(&T) -> Option<&str>,
{
    let mut alerts: Vec<Triaged<'a, T>> = items
        .iter()
        .filter_map(|item| {
            let text = text(item)?;
            let alert = PriorityAlert::from_text(&classifier, text);
            (alert.tier > Tier::Normal).then_some(Triaged { item, alert })
        })
        .collect();
    alerts.sort_by_key(|triaged| Reverse(triaged.alert.tier));
    alerts
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn classify(text: &str) -> Classification {
        KeywordClassifier::default().classify(text)
    }

    #[test]
    fn evacuation_scenario_is_critical() {
        let result = classify("URGENT: people trapped, need immediate evacuation");

        for keyword in ["urgent", "trapped", "immediate", "evacuation"] {
            assert!(
                result.matched_keywords.iter().any(|k| k == keyword),
                "missing {keyword}"
            );
        }
        assert_eq!(result.tier, Tier::Critical);
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let result = classify("help! help! HELP!");
        assert_eq!(result.matched_keywords, ["help"]);
        assert_eq!(result.tier, Tier::High);
    }

    #[test]
    fn matches_follow_lexicon_order() {
        let result = classify("injured and trapped, urgent");
        assert_eq!(result.matched_keywords, ["urgent", "trapped", "injured"]);
    }

    #[test_case("Road closed for repairs", Tier::Normal; "no matches")]
    #[test_case("Severe flooding", Tier::High; "one match")]
    #[test_case("Severe danger on the bridge", Tier::High; "two matches")]
    #[test_case("Severe danger, people trapped", Tier::Critical; "three matches")]
    fn tier_boundaries(text: &str, expected: Tier) {
        assert_eq!(classify(text).tier, expected);
    }

    #[test]
    fn classification_is_deterministic() {
        let text = "Medical emergency at the evacuation center";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn custom_lexicon_is_normalised() {
        let classifier = KeywordClassifier::new(["Flood", "flood", " ", "FIRE"]);
        assert_eq!(classifier.lexicon(), ["flood", "fire"]);
        assert_eq!(classifier.classify("wildfire").matched_keywords, ["fire"]);
    }

    #[test]
    fn alert_keeps_source_text() {
        let alert = PriorityAlert::from_text(&KeywordClassifier::default(), "SOS");
        assert_eq!(alert.source_text, "SOS");
        assert_eq!(alert.matched_keywords, ["sos"]);
        assert_eq!(alert.tier, Tier::High);
    }

    #[test]
    fn triage_orders_by_tier_and_drops_normal() {
        let items = [
            ("a", Some("all quiet")),
            ("b", Some("severe storm")),
            ("c", None),
            ("d", Some("urgent: injured and trapped")),
            ("e", Some("help needed")),
        ];

        let triaged = triage(&KeywordClassifier::default(), &items, |(_, text)| *text);

        let order: Vec<_> = triaged.iter().map(|t| t.item.0).collect();
        assert_eq!(order, ["d", "b", "e"]);
        assert_eq!(triaged[0].alert.tier, Tier::Critical);
    }
}
