//! Pattern configuration for screen classification.
//!
//! The literal sets mirror the monitored agent's terminal UI and drift
//! whenever that UI changes, so they are plain data: a serde-deserializable
//! [`PatternConfig`] compiled into a [`PatternSet`] at startup. A
//! `patterns.json` file may override any group; groups it omits keep their
//! defaults.

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, Result};

/// A compiled pattern for matching a single screen line.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The pattern source text.
    pub source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a pattern belonging to `group`.
    pub fn new(group: &'static str, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| CoreError::InvalidPattern {
            group,
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Checks if the pattern matches the given text.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Raw pattern lists, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Emitted only while a long-running operation is active.
    pub working: Vec<String>,
    /// Error output near the bottom of the screen.
    pub error: Vec<String>,
    /// Explicit confirmation or choice prompts.
    pub waiting: Vec<String>,
    /// Bare prompt shapes for the last meaningful line.
    pub prompt: Vec<String>,
    /// Status bars and borders skipped when locating the last meaningful line.
    pub chrome: Vec<String>,
    /// Text suggesting a task just finished (wait-time fallback).
    pub completion_hint: Vec<String>,
    /// Text suggesting the session has been waiting a while (wait-time fallback).
    pub waiting_hint: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            working: strings(&[
                r"(?i)esc to interrupt",
                r"(?i)ctrl\+c to (interrupt|cancel)",
                r"^\s*[✳✶✻✽✢]\s*\S.*…",
                r"^\s*[⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏]",
                r"(?i)\(\s*\d+s\s*·\s*[↑↓]",
            ]),
            error: strings(&[
                r"(?i)^\s*(error|fatal)(\[\w+\])?:",
                r"(?i)\bAPI Error\b",
                r"(?i)traceback \(most recent call last\)",
                r"(?i)\bpanicked at\b",
                r"(?i)command not found",
                r"(?i)permission denied",
            ]),
            waiting: strings(&[
                r"(?i)\[y/n\]",
                r"(?i)\(y/n\)",
                r"(?i)\(yes/no\)",
                r"(?i)do you want to (proceed|continue|make this edit|create|run|allow)",
                r"^\s*[❯>]\s*\d+\.\s+\S",
                r"(?i)press enter to continue",
                r"(?i)waiting for (your )?(input|confirmation|approval)",
            ]),
            prompt: strings(&[
                r"^\s*[>❯$%#]$",
                r"^[│|]\s*[>❯]\s*[│|]?$",
                r"^[\w.-]+@[\w.-]+(:[^$#%]*)?[$#%]$",
                r"^bash-\d+\.\d+[$#]$",
                r"^\S+\s+[❯➜]$",
            ]),
            chrome: strings(&[
                r"^\s*[╭╰┌└]",
                r"^\s*[─━═]{3,}",
                r"(?i)\?\s*for shortcuts",
                r"(?i)shift\+tab to cycle",
                r"(?i)bypass permissions",
                r"(?i)auto-accept edits",
                r"(?i)context left until auto-compact",
            ]),
            completion_hint: strings(&[
                r"(?i)\b(completed?|finished|done)\b",
                r"[✓✔]",
                r"(?i)all tests passed",
            ]),
            waiting_hint: strings(&[
                r"(?i)waiting for",
                r"(?i)\[y/n\]",
                r"(?i)do you want to",
                r"(?i)\bapprove\b",
            ]),
        }
    }
}

impl PatternConfig {
    /// Loads pattern configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| CoreError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| CoreError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads pattern configuration, falling back to defaults if the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no pattern file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "failed to load pattern file, using defaults");
                Self::default()
            }
        }
    }

    /// Compiles every group.
    pub fn compile(&self) -> Result<PatternSet> {
        Ok(PatternSet {
            working: compile_group("working", &self.working)?,
            error: compile_group("error", &self.error)?,
            waiting: compile_group("waiting", &self.waiting)?,
            prompt: compile_group("prompt", &self.prompt)?,
            chrome: compile_group("chrome", &self.chrome)?,
            completion_hint: compile_group("completion_hint", &self.completion_hint)?,
            waiting_hint: compile_group("waiting_hint", &self.waiting_hint)?,
        })
    }
}

fn compile_group(group: &'static str, sources: &[String]) -> Result<Vec<Pattern>> {
    sources.iter().map(|s| Pattern::new(group, s)).collect()
}

fn any_match(patterns: &[Pattern], line: &str) -> bool {
    patterns.iter().any(|p| p.matches(line))
}

/// Compiled pattern groups used by the classifier and the wait-time estimator.
#[derive(Debug, Clone)]
pub struct PatternSet {
    working: Vec<Pattern>,
    error: Vec<Pattern>,
    waiting: Vec<Pattern>,
    prompt: Vec<Pattern>,
    chrome: Vec<Pattern>,
    completion_hint: Vec<Pattern>,
    waiting_hint: Vec<Pattern>,
}

impl Default for PatternSet {
    fn default() -> Self {
        PatternConfig::default()
            .compile()
            .expect("default patterns are valid")
    }
}

impl PatternSet {
    /// Line carries a working indicator.
    pub fn is_working(&self, line: &str) -> bool {
        any_match(&self.working, line)
    }

    /// Line carries error text.
    pub fn is_error(&self, line: &str) -> bool {
        any_match(&self.error, line)
    }

    /// Line is a confirmation or choice prompt.
    pub fn is_waiting(&self, line: &str) -> bool {
        any_match(&self.waiting, line)
    }

    /// Line is a bare prompt.
    pub fn is_prompt(&self, line: &str) -> bool {
        any_match(&self.prompt, line)
    }

    /// Line is UI chrome rather than content.
    pub fn is_chrome(&self, line: &str) -> bool {
        any_match(&self.chrome, line)
    }

    /// Line hints that work recently completed.
    pub fn is_completion_hint(&self, line: &str) -> bool {
        any_match(&self.completion_hint, line)
    }

    /// Line hints that the session is waiting on the user.
    pub fn is_waiting_hint(&self, line: &str) -> bool {
        any_match(&self.waiting_hint, line)
    }
}
