//! Pattern registry: named regex patterns grouped into named sets.
//!
//! The registry is built once per run from the pattern table and is read-only afterwards;
//! it is passed by reference to the aggregator and extractor.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Upper bound on a single compiled pattern, so runaway alternations fail at load time.
const COMPILED_SIZE_LIMIT: usize = 32 * 1024 * 1024;

/// One row of the pattern table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PatternDefinition {
    pub set: String,
    pub topic: String,
    pub pattern: String,
}

impl PatternDefinition {
    pub fn new(set: impl Into<String>, topic: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self { set: set.into(), topic: topic.into(), pattern: pattern.into() }
    }
}

/// A named, ordered mapping from topic name to compiled pattern.
#[derive(Debug, Clone)]
pub struct PatternSet {
    name: String,
    topics: Vec<(String, Regex)>,
}

impl PatternSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), topics: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Topics in definition order.
    pub fn topics(&self) -> impl Iterator<Item = (&str, &Regex)> {
        self.topics.iter().map(|(topic, re)| (topic.as_str(), re))
    }

    pub fn get(&self, topic: &str) -> Option<&Regex> {
        self.topics.iter().find(|(t, _)| t == topic).map(|(_, re)| re)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Insert a topic; a repeated topic replaces the earlier pattern in place.
    ///
    /// Returns `true` when an existing topic was replaced.
    fn insert(&mut self, topic: &str, regex: Regex) -> bool {
        if let Some(slot) = self.topics.iter_mut().find(|(t, _)| t == topic) {
            slot.1 = regex;
            true
        } else {
            self.topics.push((topic.to_string(), regex));
            false
        }
    }
}

/// Ordered collection of pattern sets; set order is first appearance in the definitions.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    sets: Vec<PatternSet>,
}

impl PatternRegistry {
    pub fn sets(&self) -> &[PatternSet] {
        &self.sets
    }

    pub fn get(&self, name: &str) -> Option<&PatternSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    pub fn set_names(&self) -> Vec<&str> {
        self.sets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Total number of topics across all sets.
    pub fn topic_count(&self) -> usize {
        self.sets.iter().map(PatternSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// True when any topic of any set matches somewhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.sets.iter().flat_map(PatternSet::topics).any(|(_, regex)| regex.is_match(text))
    }
}

/// Compile one pattern string.
pub fn compile_pattern(set: &str, topic: &str, pattern: &str) -> Result<Regex, Error> {
    if pattern.is_empty() {
        return Err(Error::PatternCompilation {
            set: set.to_string(),
            topic: topic.to_string(),
            reason: "pattern is empty".to_string(),
        });
    }

    RegexBuilder::new(pattern)
        .size_limit(COMPILED_SIZE_LIMIT)
        .build()
        .map_err(|e| Error::PatternCompilation { set: set.to_string(), topic: topic.to_string(), reason: e.to_string() })
}

/// Build a registry from pattern definitions.
///
/// Fails atomically: any invalid pattern aborts the build and no registry is returned.
pub fn build_registry(definitions: &[PatternDefinition]) -> Result<PatternRegistry, Error> {
    let mut registry = PatternRegistry::default();

    for def in definitions {
        let regex = compile_pattern(&def.set, &def.topic, &def.pattern)?;

        let idx = match registry.sets.iter().position(|s| s.name == def.set) {
            Some(idx) => idx,
            None => {
                registry.sets.push(PatternSet::new(def.set.clone()));
                registry.sets.len() - 1
            }
        };

        if registry.sets[idx].insert(&def.topic, regex) {
            tracing::warn!(set = %def.set, topic = %def.topic, "duplicate topic in pattern set; last definition wins");
        }
    }

    tracing::debug!(sets = registry.sets.len(), topics = registry.topic_count(), "built pattern registry");

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_is_stable_across_interleaved_input() {
        let defs = vec![
            PatternDefinition::new("rates", "apr", r"\d+%"),
            PatternDefinition::new("fees", "annual", r"annual fee"),
            PatternDefinition::new("rates", "monthly", r"per month"),
        ];

        let registry = build_registry(&defs).unwrap();
        assert_eq!(registry.set_names(), vec!["rates", "fees"]);

        let rates = registry.get("rates").unwrap();
        let topics: Vec<&str> = rates.topics().map(|(t, _)| t).collect();
        assert_eq!(topics, vec!["apr", "monthly"]);
        assert_eq!(registry.topic_count(), 3);
    }

    #[test]
    fn test_duplicate_topic_last_write_wins_in_place() {
        let defs = vec![
            PatternDefinition::new("rates", "apr", r"old"),
            PatternDefinition::new("rates", "fee", r"fee"),
            PatternDefinition::new("rates", "apr", r"new"),
        ];

        let registry = build_registry(&defs).unwrap();
        let rates = registry.get("rates").unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates.get("apr").unwrap().as_str(), "new");

        let topics: Vec<&str> = rates.topics().map(|(t, _)| t).collect();
        assert_eq!(topics, vec!["apr", "fee"]);
    }

    #[test]
    fn test_invalid_pattern_fails_whole_build() {
        let defs = vec![
            PatternDefinition::new("rates", "apr", r"\d+%"),
            PatternDefinition::new("fees", "broken", r"(unclosed"),
        ];

        let err = build_registry(&defs).unwrap_err();
        match err {
            Error::PatternCompilation { set, topic, .. } => {
                assert_eq!(set, "fees");
                assert_eq!(topic, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        let defs = vec![PatternDefinition::new("rates", "apr", "")];
        assert!(matches!(build_registry(&defs), Err(Error::PatternCompilation { .. })));
    }

    #[test]
    fn test_unsupported_lookaround_is_rejected() {
        let defs = vec![PatternDefinition::new("rates", "apr", r"(?<=rate )\d+")];
        assert!(matches!(build_registry(&defs), Err(Error::PatternCompilation { .. })));
    }

    #[test]
    fn test_empty_definitions() {
        let registry = build_registry(&[]).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.topic_count(), 0);
    }
}
