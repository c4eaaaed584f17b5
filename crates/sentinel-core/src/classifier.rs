//! Screen text to activity state classification.
//!
//! Classification is procedural, not a max-priority vote. A working
//! indicator anywhere in the recent window wins outright, even when a prompt
//! is also visible: the agent draws its input box while a tool is still
//! running, and checking the prompt shape first reports the session idle
//! while it is busy.

use crate::patterns::PatternSet;
use crate::snapshot::ScreenSnapshot;
use crate::state::SessionState;

/// Window sizes used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Meaningful lines scanned for working indicators (K).
    pub working_window: usize,
    /// Meaningful lines scanned for error and confirmation prompts.
    pub signal_window: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            working_window: 10,
            signal_window: 6,
        }
    }
}

/// Infers a [`SessionState`] from captured screen text.
#[derive(Debug, Clone, Default)]
pub struct StateClassifier {
    patterns: PatternSet,
    config: ClassifierConfig,
}

impl StateClassifier {
    /// Creates a classifier from compiled patterns and window sizes.
    pub fn new(patterns: PatternSet, config: ClassifierConfig) -> Self {
        Self { patterns, config }
    }

    /// Creates a classifier with default window sizes.
    pub fn with_patterns(patterns: PatternSet) -> Self {
        Self::new(patterns, ClassifierConfig::default())
    }

    /// The compiled pattern groups.
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// The window configuration.
    pub fn config(&self) -> ClassifierConfig {
        self.config
    }

    /// Classify from the most recent lines and the full visible text.
    ///
    /// Only the last `working_window` meaningful lines of `recent_lines` are
    /// inspected. Blank lines and UI chrome never count as meaningful.
    pub fn classify(&self, recent_lines: &[&str], full_text: &str) -> SessionState {
        let window = self.meaningful_window(recent_lines);
        if window.is_empty() {
            return if full_text.trim().is_empty() {
                SessionState::Idle
            } else {
                SessionState::Unknown
            };
        }

        // 1. Working indicators short-circuit everything else.
        if window.iter().any(|l| self.patterns.is_working(l)) {
            return SessionState::Working;
        }

        let signal_start = window.len().saturating_sub(self.config.signal_window);
        let signal = &window[signal_start..];

        // 2. Error text.
        if signal.iter().any(|l| self.patterns.is_error(l)) {
            return SessionState::Error;
        }

        // 3. Confirmation / choice prompts.
        if signal.iter().any(|l| self.patterns.is_waiting(l)) {
            return SessionState::WaitingInput;
        }

        // 4. Bare prompt on the last meaningful line.
        if window.last().is_some_and(|l| self.patterns.is_prompt(l)) {
            return SessionState::Idle;
        }

        SessionState::Unknown
    }

    /// Classify a captured snapshot.
    pub fn classify_snapshot(&self, snapshot: &ScreenSnapshot) -> SessionState {
        if snapshot.is_empty() {
            return SessionState::Idle;
        }
        let lines: Vec<&str> = snapshot.lines().collect();
        self.classify(&lines, snapshot.text())
    }

    /// Classify the result of a capture attempt. A failed fetch is
    /// `Unknown`, never `Error`.
    pub fn classify_capture(&self, capture: Option<&ScreenSnapshot>) -> SessionState {
        match capture {
            Some(snapshot) => self.classify_snapshot(snapshot),
            None => SessionState::Unknown,
        }
    }

    /// True when a working indicator appears anywhere in `text`.
    pub fn has_working_indicator(&self, text: &str) -> bool {
        text.lines().any(|l| self.patterns.is_working(l))
    }

    /// The last line that is neither blank nor UI chrome.
    pub fn last_meaningful_line<'a, I>(&self, lines: I) -> Option<&'a str>
    where
        I: DoubleEndedIterator<Item = &'a str>,
    {
        lines
            .rev()
            .find(|l| !l.trim().is_empty() && !self.patterns.is_chrome(l))
    }

    /// Detect a task that finished without printing anything explicit.
    ///
    /// True only when the screen is byte-identical to the previous poll, the
    /// last meaningful line is a bare prompt, and no working indicator is
    /// visible anywhere in the buffer.
    pub fn detect_quiet_completion(
        &self,
        snapshot: &ScreenSnapshot,
        previous_hash: Option<u64>,
    ) -> bool {
        if previous_hash != Some(snapshot.hash()) {
            return false;
        }
        if self.has_working_indicator(snapshot.text()) {
            return false;
        }
        self.last_meaningful_line(snapshot.lines())
            .is_some_and(|l| self.patterns.is_prompt(l))
    }

    fn meaningful_window<'a>(&self, lines: &[&'a str]) -> Vec<&'a str> {
        let mut window: Vec<&'a str> = lines
            .iter()
            .rev()
            .filter(|l| !l.trim().is_empty() && !self.patterns.is_chrome(l))
            .take(self.config.working_window)
            .copied()
            .collect();
        window.reverse();
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> SessionState {
        StateClassifier::default().classify_snapshot(&ScreenSnapshot::new(text))
    }

    #[test]
    fn test_working_beats_prompt() {
        let text = "Read 3 files\nEdited src/lib.rs\n✻ Thinking… (esc to interrupt)\n\n>";
        assert_eq!(classify(text), SessionState::Working);
    }

    #[test]
    fn test_working_beats_waiting_prompt() {
        let text = "Do you want to proceed? [y/n]\n✶ Running… (8s · ↑ 200 tokens · esc to interrupt)\n>";
        assert_eq!(classify(text), SessionState::Working);
    }

    #[test]
    fn test_working_indicator_outside_window_is_ignored() {
        let mut text = String::from("✻ Thinking… (esc to interrupt)\n");
        for i in 0..12 {
            text.push_str(&format!("output line {}\n", i));
        }
        text.push('$');
        assert_eq!(classify(&text), SessionState::Idle);
    }

    #[test]
    fn test_error_detected() {
        assert_eq!(
            classify("cargo build\nerror[E0308]: mismatched types\n  --> src/main.rs:3:5"),
            SessionState::Error
        );
    }

    #[test]
    fn test_error_beats_waiting() {
        assert_eq!(
            classify("Error: connection refused\nRetry? [y/n]"),
            SessionState::Error
        );
    }

    #[test]
    fn test_waiting_input() {
        let text = "Do you want to make this edit to lib.rs?\n❯ 1. Yes\n  2. No, and tell Claude what to do differently";
        assert_eq!(classify(text), SessionState::WaitingInput);
    }

    #[test]
    fn test_idle_prompt() {
        assert_eq!(classify("All done.\n$ "), SessionState::Idle);
        assert_eq!(classify("Summary of changes\n❯"), SessionState::Idle);
    }

    #[test]
    fn test_idle_prompt_inside_box_with_chrome() {
        let text = "● Updated the parser.\n╭──────────────────╮\n│ >                │\n╰──────────────────╯\n  ? for shortcuts";
        assert_eq!(classify(text), SessionState::Idle);
    }

    #[test]
    fn test_unknown_when_nothing_matches() {
        assert_eq!(classify("just some text\nwithout a prompt"), SessionState::Unknown);
    }

    #[test]
    fn test_empty_snapshot_is_idle() {
        assert_eq!(classify(""), SessionState::Idle);
        assert_eq!(classify("\n\n   \n"), SessionState::Idle);
    }

    #[test]
    fn test_failed_fetch_is_unknown() {
        let classifier = StateClassifier::default();
        assert_eq!(classifier.classify_capture(None), SessionState::Unknown);
    }

    #[test]
    fn test_classify_uses_only_recent_lines() {
        let classifier = StateClassifier::default();
        let recent = ["finished", "$"];
        let full = "✻ Thinking… (esc to interrupt)\nfinished\n$";
        assert_eq!(classifier.classify(&recent, full), SessionState::Idle);
    }

    #[test]
    fn test_quiet_completion_requires_same_hash() {
        let classifier = StateClassifier::default();
        let snap = ScreenSnapshot::new("built\n$ ");
        assert!(!classifier.detect_quiet_completion(&snap, None));
        assert!(!classifier.detect_quiet_completion(&snap, Some(snap.hash() ^ 1)));
        assert!(classifier.detect_quiet_completion(&snap, Some(snap.hash())));
    }

    #[test]
    fn test_quiet_completion_requires_prompt() {
        let classifier = StateClassifier::default();
        let snap = ScreenSnapshot::new("still printing output");
        assert!(!classifier.detect_quiet_completion(&snap, Some(snap.hash())));
    }

    #[test]
    fn test_quiet_completion_blocked_by_indicator_anywhere() {
        let classifier = StateClassifier::default();
        let mut text = String::from("✻ Thinking… (esc to interrupt)\n");
        for i in 0..30 {
            text.push_str(&format!("line {}\n", i));
        }
        text.push('>');
        let snap = ScreenSnapshot::new(&text);

        // Outside the classification window, but still visible.
        assert_eq!(classifier.classify_snapshot(&snap), SessionState::Idle);
        assert!(!classifier.detect_quiet_completion(&snap, Some(snap.hash())));
    }

    #[test]
    fn test_custom_window_sizes() {
        let classifier = StateClassifier::new(
            PatternSet::default(),
            ClassifierConfig {
                working_window: 2,
                signal_window: 1,
            },
        );
        let snap = ScreenSnapshot::new("esc to interrupt\nline a\n$");
        assert_eq!(classifier.classify_snapshot(&snap), SessionState::Idle);
    }
}
