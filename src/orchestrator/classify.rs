//! Intent classification
//!
//! Classification maps message text onto routing-table intents. The
//! algorithm is a replaceable strategy behind [`IntentClassifier`]; the one
//! requirement on implementations is determinism — the same input and
//! configuration must always yield the same intents, in routing-table
//! order. The shipped strategy matches configured keywords.

use crate::config::RoutingEntryConfig;

/// Deterministic text-to-intent mapping strategy
pub trait IntentClassifier: Send + Sync {
    /// Intents matching `input`, in routing-table order; may be empty
    fn classify(&self, input: &str) -> Vec<String>;
}

/// Case-insensitive keyword matcher
///
/// An intent matches when any of its keywords occurs in the lowercased
/// input. Intents with no keywords never match.
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
}

struct KeywordRule {
    intent: String,
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(rules: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        let rules = rules
            .into_iter()
            .map(|(intent, keywords)| KeywordRule {
                intent,
                keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();
        Self { rules }
    }

    /// Build rules from routing entries, preserving table order
    pub fn from_entries(entries: &[RoutingEntryConfig]) -> Self {
        Self::new(
            entries
                .iter()
                .map(|e| (e.intent.clone(), e.keywords.clone())),
        )
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, input: &str) -> Vec<String> {
        let haystack = input.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.keywords.iter().any(|k| haystack.contains(k.as_str())))
            .map(|rule| rule.intent.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::new(vec![
            (
                "dispatch".to_string(),
                vec!["vehicle".to_string(), "truck".to_string(), "driver".to_string()],
            ),
            (
                "delivery".to_string(),
                vec!["shipment".to_string(), "delivery".to_string(), "track".to_string()],
            ),
            (
                "inbound".to_string(),
                vec!["inventory".to_string(), "intake".to_string(), "pallet".to_string()],
            ),
        ])
    }

    #[test]
    fn test_no_match() {
        assert!(classifier().classify("hello there").is_empty());
    }

    #[test]
    fn test_single_match_case_insensitive() {
        assert_eq!(classifier().classify("Assign a TRUCK please"), vec!["dispatch"]);
    }

    #[test]
    fn test_multiple_matches_in_table_order() {
        let intents = classifier().classify("track the shipment of the new truck");
        assert_eq!(intents, vec!["dispatch", "delivery"]);
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let input = "pallet intake for vehicle 4";
        assert_eq!(c.classify(input), c.classify(input));
        assert_eq!(c.classify(input), vec!["dispatch", "inbound"]);
    }

    #[test]
    fn test_intent_without_keywords_never_matches() {
        let c = KeywordClassifier::new(vec![("mystery".to_string(), vec![])]);
        assert!(c.classify("anything at all").is_empty());
    }
}
