//! Scraped text cleanup before pattern matching.

/// Punctuation stripped from scraped text. `.` is kept so sentence boundaries and decimal
/// rates such as "16.5%" survive.
pub const STRIPPED_PUNCTUATION: &[char] =
    &['!', '#', '*', '/', ';', '@', '[', '\\', ']', '^', '_', '`', '{', '|', '}', '~'];

/// Strip noise punctuation and collapse every whitespace run to a single space.
pub fn clean_text(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !STRIPPED_PUNCTUATION.contains(c)).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
