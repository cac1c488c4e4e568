//! Proof extraction: pull a chat handle out of message text

use regex::Regex;

/// Extracts the first `name#NNNN` handle from a message.
///
/// The scan runs over the subject followed by the body, so a handle
/// that only appears in the subject line is honored. The four digits
/// are matched syntactically; no discriminator validation happens
/// here.
pub struct HandleExtractor {
    pattern: Regex,
}

impl Default for HandleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleExtractor {
    pub fn new() -> Self {
        Self {
            // Non-whitespace token ending in '#' plus exactly four digits.
            pattern: Regex::new(r"\S+#[0-9]{4}").expect("handle pattern is valid"),
        }
    }

    /// First handle-shaped token in `subject` then `body`, if any.
    pub fn extract(&self, subject: &str, body: &str) -> Option<String> {
        let haystack = format!("{subject}\n{body}");
        self.pattern
            .find(&haystack)
            .map(|m| m.as_str().to_string())
    }
}
