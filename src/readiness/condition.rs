//! Readiness conditions
//!
//! A [`ReadinessCondition`] is a timed predicate over live page state,
//! declared in scenario files and polled by the detector. The scenario-file
//! shape is flat (`selector` + `predicate` + the fields that predicate
//! needs); [`ReadinessCondition::compile`] checks field consistency and
//! compiles text patterns once, so an invalid condition fails at validation
//! time rather than mid-poll.

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the condition asserts about the selector's matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    /// Some match is visible
    Visible,
    /// Some match is visible and its text matches the condition's pattern
    VisibleWithText,
    /// The index-th match is visible
    NthChildVisible,
}

impl PredicateKind {
    /// Stable label for logs and errors
    pub fn label(&self) -> &'static str {
        match self {
            PredicateKind::Visible => "visible",
            PredicateKind::VisibleWithText => "visible_with_text",
            PredicateKind::NthChildVisible => "nth_child_visible",
        }
    }
}

/// Expected text shape for `visible_with_text` conditions
///
/// In scenario files: `pattern = "non_empty"`,
/// `pattern = { contains = "No Data" }`, or
/// `pattern = { regex = '.+@.+\..+' }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPattern {
    /// Any non-whitespace text
    NonEmpty,
    /// Text containing the given substring
    Contains(String),
    /// Text matching the given regular expression
    Regex(String),
}

impl TextPattern {
    /// Compile the pattern; an invalid regex is a scenario error
    pub fn compile(&self) -> Result<CompiledPattern> {
        match self {
            TextPattern::NonEmpty => Ok(CompiledPattern::NonEmpty),
            TextPattern::Contains(needle) => Ok(CompiledPattern::Contains(needle.clone())),
            TextPattern::Regex(source) => {
                let regex = Regex::new(source).map_err(|e| {
                    Error::scenario(format!("invalid regex {:?}: {}", source, e))
                })?;
                Ok(CompiledPattern::Regex(regex))
            }
        }
    }
}

/// A pattern ready for matching
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    NonEmpty,
    Contains(String),
    Regex(Regex),
}

impl CompiledPattern {
    /// Does `text` satisfy the pattern?
    pub fn matches(&self, text: &str) -> bool {
        match self {
            CompiledPattern::NonEmpty => !text.trim().is_empty(),
            CompiledPattern::Contains(needle) => text.contains(needle.as_str()),
            CompiledPattern::Regex(regex) => regex.is_match(text),
        }
    }

    /// Short rendering for error messages
    pub fn describe(&self) -> String {
        match self {
            CompiledPattern::NonEmpty => "non_empty".to_string(),
            CompiledPattern::Contains(needle) => format!("contains {:?}", needle),
            CompiledPattern::Regex(regex) => format!("regex {:?}", regex.as_str()),
        }
    }
}

/// One readiness condition as declared in a scenario file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessCondition {
    /// CSS selector the predicate applies to
    pub selector: String,
    /// Predicate kind
    pub predicate: PredicateKind,
    /// Expected text, for `visible_with_text`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<TextPattern>,
    /// Match index, for `nth_child_visible`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Per-condition timeout; the configured default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ReadinessCondition {
    /// Condition: some match of `selector` is visible
    pub fn visible(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            predicate: PredicateKind::Visible,
            pattern: None,
            index: None,
            timeout_ms: None,
        }
    }

    /// Condition: some visible match of `selector` has text matching `pattern`
    pub fn visible_with_text(selector: impl Into<String>, pattern: TextPattern) -> Self {
        Self {
            selector: selector.into(),
            predicate: PredicateKind::VisibleWithText,
            pattern: Some(pattern),
            index: None,
            timeout_ms: None,
        }
    }

    /// Condition: the `index`-th match of `selector` is visible
    pub fn nth_child_visible(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            predicate: PredicateKind::NthChildVisible,
            pattern: None,
            index: Some(index),
            timeout_ms: None,
        }
    }

    /// Override the condition's timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Check field consistency and pattern validity without polling
    pub fn validate(&self) -> Result<()> {
        self.compile(Duration::ZERO).map(|_| ())
    }

    /// Resolve the condition against defaults and compile its pattern
    pub(crate) fn compile(&self, default_timeout: Duration) -> Result<CompiledCondition> {
        if self.selector.trim().is_empty() {
            return Err(Error::scenario("condition selector must not be empty"));
        }

        let check = match self.predicate {
            PredicateKind::Visible => {
                self.reject_field(self.pattern.is_some(), "pattern")?;
                self.reject_field(self.index.is_some(), "index")?;
                CompiledCheck::Visible
            }
            PredicateKind::VisibleWithText => {
                self.reject_field(self.index.is_some(), "index")?;
                let pattern = self.pattern.as_ref().ok_or_else(|| {
                    Error::scenario(format!(
                        "visible_with_text on {} requires a pattern",
                        self.selector
                    ))
                })?;
                CompiledCheck::VisibleWithText(pattern.compile()?)
            }
            PredicateKind::NthChildVisible => {
                self.reject_field(self.pattern.is_some(), "pattern")?;
                let index = self.index.ok_or_else(|| {
                    Error::scenario(format!(
                        "nth_child_visible on {} requires an index",
                        self.selector
                    ))
                })?;
                CompiledCheck::NthChildVisible(index)
            }
        };

        Ok(CompiledCondition {
            selector: self.selector.clone(),
            check,
            timeout: self
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default_timeout),
        })
    }

    fn reject_field(&self, present: bool, field: &str) -> Result<()> {
        if present {
            return Err(Error::scenario(format!(
                "{} on {} does not take {}",
                self.predicate.label(),
                self.selector,
                field
            )));
        }
        Ok(())
    }
}

/// A condition resolved against defaults, ready for polling
#[derive(Debug, Clone)]
pub(crate) struct CompiledCondition {
    pub(crate) selector: String,
    pub(crate) check: CompiledCheck,
    pub(crate) timeout: Duration,
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledCheck {
    Visible,
    VisibleWithText(CompiledPattern),
    NthChildVisible(usize),
}

impl CompiledCondition {
    /// Predicate label including pattern/index detail, for errors
    pub(crate) fn describe(&self) -> String {
        match &self.check {
            CompiledCheck::Visible => "visible".to_string(),
            CompiledCheck::VisibleWithText(pattern) => {
                format!("visible_with_text({})", pattern.describe())
            }
            CompiledCheck::NthChildVisible(index) => format!("nth_child_visible({})", index),
        }
    }
}
