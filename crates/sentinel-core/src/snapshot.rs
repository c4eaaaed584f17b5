//! Immutable screen captures with change-detection hashes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;

/// Regex matching ANSI CSI and OSC escape sequences.
static ANSI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:\[[0-9;?]*[ -/]*[@-~]|\][^\x07\x1B]*(?:\x07|\x1B\\))")
        .expect("Invalid ANSI regex")
});

/// Strip ANSI escape codes from a string.
///
/// ```
/// use sentinel_core::snapshot::strip_ansi;
///
/// assert_eq!(strip_ansi("text \x1B[90mgrayed\x1B[0m normal"), "text grayed normal");
/// ```
pub fn strip_ansi(s: &str) -> String {
    ANSI_REGEX.replace_all(s, "").to_string()
}

/// Compute the change-detection hash of a piece of text.
pub fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Text captured from one session at one poll tick.
///
/// Construction normalizes the raw capture: escape codes are stripped,
/// trailing whitespace is removed from every line and blank padding at the
/// bottom of the pane is dropped. The hash is computed over the normalized
/// text so cursor blinks and pane padding do not count as changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSnapshot {
    text: String,
    hash: u64,
}

impl ScreenSnapshot {
    /// Build a snapshot from raw captured pane output.
    pub fn new(raw: &str) -> Self {
        let clean = strip_ansi(raw);
        let mut lines: Vec<&str> = clean.lines().map(str::trim_end).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        let text = lines.join("\n");
        let hash = hash_text(&text);
        Self { text, hash }
    }

    /// Normalized text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Change-detection hash of the normalized text.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// True when the capture contained no visible text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// All lines, top to bottom.
    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.text.lines()
    }

    /// The last `n` non-blank lines, in screen order.
    pub fn tail(&self, n: usize) -> Vec<&str> {
        let mut tail: Vec<&str> = self
            .text
            .lines()
            .rev()
            .filter(|l| !l.trim().is_empty())
            .take(n)
            .collect();
        tail.reverse();
        tail
    }

    /// The last non-blank line, if any.
    pub fn last_line(&self) -> Option<&str> {
        self.text.lines().rev().find(|l| !l.trim().is_empty())
    }
}
