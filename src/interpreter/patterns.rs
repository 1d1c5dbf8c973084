//! Keyword and pattern tables driving prompt interpretation.
//!
//! Callers depend on these tables being stable: the order of the test-type
//! groups and of the action kinds decides the interpretation of ambiguous
//! prompts.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::intent::TestType;

/// Any of these in the lower-cased prompt marks it as a test request
pub const TEST_KEYWORDS: &[&str] = &[
    "test",
    "check",
    "verify",
    "validate",
    "ensure",
    "screenshot",
    "click",
    "navigate",
    "api",
    "endpoint",
];

pub const NAVIGATE_TRIGGERS: &[&str] = &["go to", "navigate to", "visit", "open"];
pub const CLICK_TRIGGERS: &[&str] = &["click", "press", "tap"];
pub const TYPE_TRIGGERS: &[&str] = &["type", "enter", "input", "fill"];
pub const VERIFY_TRIGGERS: &[&str] = &["verify", "check", "validate", "ensure"];
pub const SCREENSHOT_TRIGGERS: &[&str] = &["screenshot", "capture", "image"];

/// UI element nouns that become click targets, in emission order
pub const CLICK_TARGETS: &[&str] = &[
    "button", "link", "menu", "tab", "checkbox", "radio", "submit", "login", "signup", "search",
    "close", "cancel",
];

pub const DEFAULT_CLICK_TARGET: &str = "button";

pub const CANNED_EMAIL: &str = "test@example.com";
pub const CANNED_PASSWORD: &str = "testpassword123";
pub const PLACEHOLDER_TEXT: &str = "test input";

pub const GREETINGS: &[&str] = &["hello", "hi", "hey"];
pub const HELP_KEYWORDS: &[&str] = &["help", "what can you do", "how"];

pub const GREETING_REPLY: &str = "Hello! I'm here to help you with UI and API testing. You can ask me to test websites, check forms, verify APIs, or take screenshots. What would you like to test?";

pub const HELP_REPLY: &str = "I can help you with various types of testing:

- UI Testing: test login forms, buttons, navigation, take screenshots
- API Testing: check endpoints, verify responses, validate JSON
- Mixed Testing: end-to-end workflows combining UI and API tests

Just describe what you want to test in natural language! For example:
- \"Test the login form on example.com\"
- \"Check if the API endpoint /users returns valid JSON\"
- \"Take a screenshot of the homepage\"
";

pub const FALLBACK_REPLY: &str =
    "I understand. I'm here to help you with testing. What would you like me to test for you?";

/// Test-type pattern groups; the first group with a matching pattern wins
pub static TEST_TYPE_PATTERNS: Lazy<Vec<(TestType, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (
            TestType::Ui,
            compile(&[
                r"test.*login",
                r"check.*form",
                r"verify.*button",
                r"click.*element",
                r"navigate.*to",
                r"screenshot",
                r"test.*ui",
                r"check.*page",
                r"verify.*element",
            ]),
        ),
        (
            TestType::Api,
            compile(&[
                r"test.*api",
                r"check.*endpoint",
                r"verify.*response",
                r"test.*request",
                r"api.*call",
                r"http.*request",
                r"rest.*api",
                r"json.*response",
            ]),
        ),
        (
            TestType::Mixed,
            compile(&[
                r"test.*workflow",
                r"end.*to.*end",
                r"integration.*test",
                r"full.*test",
            ]),
        ),
    ]
});

/// Absolute URL literal
pub static URL_PATTERN: Lazy<Regex> = Lazy::new(|| regex(r"https?://[^\s]+"));

/// Bare domain after one of the prepositions on/at/from
pub static DOMAIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| regex(r"\b(?:on|at|from)\s+([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})"));

/// Double-quoted substring
pub static QUOTED_PATTERN: Lazy<Regex> = Lazy::new(|| regex(r#""([^"]*)""#));

/// First path-like token in an API prompt
pub static ENDPOINT_PATTERN: Lazy<Regex> = Lazy::new(|| regex(r"/[a-zA-Z0-9/_-]+"));

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| regex(p)).collect()
}

// The tables are compile-time literals; a failure here is a typo caught by the tests below.
#[allow(clippy::expect_used)]
fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern must compile")
}

/// True if any of `needles` occurs in `haystack`
pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
