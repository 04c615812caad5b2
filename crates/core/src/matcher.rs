//! Match extraction: apply one pattern set to one text blob.

use crate::clean::clean_text;
use crate::patterns::{PatternRegistry, PatternSet};

/// Matches longer than this many characters are treated as runaway captures and dropped.
pub const MAX_MATCH_CHARS: usize = 900;

/// Matched spans per topic, in the pattern set's topic order.
///
/// Every topic of the set is present, possibly with an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicMatches {
    entries: Vec<(String, Vec<String>)>,
}

impl TopicMatches {
    pub fn get(&self, topic: &str) -> Option<&[String]> {
        self.entries.iter().find(|(t, _)| t == topic).map(|(_, m)| m.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(t, m)| (t.as_str(), m.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find every non-overlapping match of each topic's pattern in `text`.
///
/// Overlong matches are skipped without stopping the scan.
pub fn extract(text: &str, set: &PatternSet) -> TopicMatches {
    let entries = set
        .topics()
        .map(|(topic, re)| {
            let matches = re
                .find_iter(text)
                .map(|m| m.as_str())
                .filter(|s| s.chars().count() <= MAX_MATCH_CHARS)
                .map(str::to_string)
                .collect();
            (topic.to_string(), matches)
        })
        .collect();

    TopicMatches { entries }
}

/// Cleaned text of every line of `raw` that any registry pattern matches, joined by a space.
///
/// `raw` is page text before cleaning; each line is one block of the page.
pub fn relevant_text(raw: &str, registry: &PatternRegistry) -> String {
    raw.lines()
        .map(clean_text)
        .filter(|block| !block.is_empty() && registry.is_match(block))
        .collect::<Vec<_>>()
        .join(" ")
}
