//! Natural-language prompt interpretation.
//!
//! The [`Interpreter`] trait is the single seam between free text and the
//! typed [`TestIntent`] the runner executes. [`KeywordInterpreter`] is the
//! heuristic implementation: fixed keyword tables and ordered regular
//! expressions (see [`patterns`]), so identical prompts always produce
//! identical plans.
//!
//! # Example
//!
//! ```rust
//! use testpilot::interpreter::{Interpretation, Interpreter, KeywordInterpreter};
//! use testpilot::intent::Action;
//!
//! let interpreter = KeywordInterpreter::new();
//! match interpreter.interpret("go to https://example.com and take a screenshot") {
//!     Interpretation::Test(intent) => {
//!         assert_eq!(intent.actions.last(), Some(&Action::Screenshot));
//!     }
//!     Interpretation::Conversation(_) => unreachable!(),
//! }
//! ```

pub mod patterns;

use serde::{Deserialize, Serialize};

use crate::intent::{Action, TestIntent, TestOptions, TestType, VerifyCondition};
use patterns::*;

/// Outcome of interpreting a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Interpretation {
    /// The prompt asked for a test
    Test(TestIntent),
    /// The prompt was conversational; no job should be created
    Conversation(String),
}

impl Interpretation {
    pub fn is_test(&self) -> bool {
        matches!(self, Interpretation::Test(_))
    }
}

/// Converts prompts into test intents
pub trait Interpreter: Send + Sync {
    /// Classify the prompt and, for test requests, build the full intent
    fn interpret(&self, prompt: &str) -> Interpretation;

    /// Build the action plan for a prompt whose test type and target were
    /// decided elsewhere (explicit requests)
    fn plan_actions(&self, prompt: &str, target_url: Option<&str>) -> Vec<Action>;

    /// Extract the first target URL mentioned in the prompt
    fn target_url(&self, prompt: &str) -> Option<String>;
}

/// Keyword/regex heuristics over fixed tables
#[derive(Debug, Clone, Default)]
pub struct KeywordInterpreter;

impl KeywordInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// True if the prompt mentions any test keyword
    pub fn is_test_request(&self, prompt: &str) -> bool {
        contains_any(&prompt.to_lowercase(), TEST_KEYWORDS)
    }

    /// First matching pattern group wins; UI if nothing matches
    pub fn classify(&self, prompt: &str) -> TestType {
        let lower = prompt.to_lowercase();
        TEST_TYPE_PATTERNS
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(&lower)))
            .map(|(test_type, _)| *test_type)
            .unwrap_or_default()
    }

    /// Absolute URL first, then a bare domain after on/at/from
    pub fn extract_url(&self, prompt: &str) -> Option<String> {
        if let Some(m) = URL_PATTERN.find(prompt) {
            return Some(m.as_str().to_string());
        }
        DOMAIN_PATTERN
            .captures(prompt)
            .and_then(|caps| caps.get(1))
            .map(|domain| format!("https://{}", domain.as_str()))
    }

    /// Per-kind action extraction in fixed priority order
    /// (navigate, click, type, verify, screenshot)
    pub fn extract_actions(&self, prompt: &str) -> Vec<Action> {
        let lower = prompt.to_lowercase();
        let mut actions = Vec::new();

        if contains_any(&lower, NAVIGATE_TRIGGERS) {
            if let Some(url) = self.extract_url(prompt) {
                actions.push(Action::Navigate { url });
            }
        }

        if contains_any(&lower, CLICK_TRIGGERS) {
            actions.extend(
                click_targets(&lower)
                    .into_iter()
                    .map(|target| Action::Click { target }),
            );
        }

        if contains_any(&lower, TYPE_TRIGGERS) {
            actions.push(Action::Type {
                text: text_to_type(prompt, &lower),
            });
        }

        if contains_any(&lower, VERIFY_TRIGGERS) {
            actions.push(Action::Verify {
                condition: verify_condition(&lower),
            });
        }

        if contains_any(&lower, SCREENSHOT_TRIGGERS) {
            actions.push(Action::Screenshot);
        }

        actions
    }

    /// Canned reply for prompts that are not test requests
    pub fn conversational_reply(&self, prompt: &str) -> String {
        let lower = prompt.to_lowercase();
        if contains_any(&lower, GREETINGS) {
            GREETING_REPLY.to_string()
        } else if contains_any(&lower, HELP_KEYWORDS) {
            HELP_REPLY.to_string()
        } else {
            FALLBACK_REPLY.to_string()
        }
    }
}

impl Interpreter for KeywordInterpreter {
    fn interpret(&self, prompt: &str) -> Interpretation {
        if !self.is_test_request(prompt) {
            return Interpretation::Conversation(self.conversational_reply(prompt));
        }

        let target_url = self.extract_url(prompt);
        let actions = self.plan_actions(prompt, target_url.as_deref());

        Interpretation::Test(TestIntent {
            test_type: self.classify(prompt),
            target_url,
            actions,
            options: TestOptions::default(),
        })
    }

    fn plan_actions(&self, prompt: &str, target_url: Option<&str>) -> Vec<Action> {
        finalize_plan(self.extract_actions(prompt), target_url)
    }

    fn target_url(&self, prompt: &str) -> Option<String> {
        self.extract_url(prompt)
    }
}

/// Resolve ambiguity with defaults: a plan with a target starts by
/// navigating there, and a plan with nothing else to do takes a screenshot.
pub fn finalize_plan(mut actions: Vec<Action>, target_url: Option<&str>) -> Vec<Action> {
    let Some(url) = target_url else {
        return actions;
    };

    if !actions.iter().any(|a| matches!(a, Action::Navigate { .. })) {
        actions.insert(
            0,
            Action::Navigate {
                url: url.to_string(),
            },
        );
    }
    if actions.len() == 1 {
        actions.push(Action::Screenshot);
    }
    actions
}

fn click_targets(lower: &str) -> Vec<String> {
    let targets: Vec<String> = CLICK_TARGETS
        .iter()
        .filter(|noun| lower.contains(*noun))
        .map(|noun| noun.to_string())
        .collect();

    if targets.is_empty() {
        vec![DEFAULT_CLICK_TARGET.to_string()]
    } else {
        targets
    }
}

fn text_to_type(prompt: &str, lower: &str) -> String {
    if let Some(caps) = QUOTED_PATTERN.captures(prompt) {
        return caps[1].to_string();
    }
    if lower.contains("username") || lower.contains("email") {
        return CANNED_EMAIL.to_string();
    }
    if lower.contains("password") {
        return CANNED_PASSWORD.to_string();
    }
    PLACEHOLDER_TEXT.to_string()
}

fn verify_condition(lower: &str) -> VerifyCondition {
    if lower.contains("success") {
        VerifyCondition::SuccessMessage
    } else if lower.contains("error") {
        VerifyCondition::ErrorMessage
    } else if lower.contains("redirect") {
        VerifyCondition::PageRedirect
    } else if lower.contains("element") {
        VerifyCondition::ElementPresent
    } else {
        VerifyCondition::PageLoaded
    }
}
