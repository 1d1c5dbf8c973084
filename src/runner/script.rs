//! Playwright Test source generated alongside execution.
//!
//! Every executed action appends the equivalent `@playwright/test` statements,
//! so the finished script replays what the runner did.

use crate::intent::TestType;

const IMPORT_LINE: &str = "import { test, expect } from '@playwright/test';";
const CLOSING_LINE: &str = "});";

/// Accumulates script lines for one test
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    lines: Vec<String>,
}

impl ScriptBuilder {
    /// Header for a browser test driven through `page`
    pub fn ui() -> Self {
        Self::with_header("test('Generated UI Test', async ({ page }) => {")
    }

    /// Header for an HTTP test driven through `request`
    pub fn api() -> Self {
        Self::with_header("test('Generated API Test', async ({ request }) => {")
    }

    fn with_header(opening: &str) -> Self {
        Self {
            lines: vec![IMPORT_LINE.to_string(), String::new(), opening.to_string()],
        }
    }

    /// Append one indented statement
    pub fn statement(&mut self, line: impl AsRef<str>) -> &mut Self {
        self.lines.push(format!("  {}", line.as_ref()));
        self
    }

    /// Append one indented `//` comment
    pub fn comment(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.lines.push(format!("  // {}", single_line(text.as_ref())));
        self
    }

    pub fn navigate(&mut self, url: &str) {
        self.comment(format!("Navigate to {}", url))
            .statement(format!("await page.goto({});", js_string(url)))
            .statement("await page.waitForLoadState('networkidle');");
    }

    pub fn click(&mut self, target: &str, selector: &str) {
        self.comment(format!("Click {}", target))
            .statement(format!("await page.click({});", js_string(selector)));
    }

    pub fn fill(&mut self, selector: &str, text: &str) {
        self.comment("Type into input field").statement(format!(
            "await page.fill({}, {});",
            js_string(selector),
            js_string(text)
        ));
    }

    pub fn verify_title(&mut self) {
        self.comment("Verify page loaded")
            .statement("const title = await page.title();")
            .statement("expect(title).toBeDefined();");
    }

    pub fn verify_visible(&mut self, selector: &str) {
        self.comment("Verify success element is visible").statement(format!(
            "await expect(page.locator({})).toBeVisible();",
            js_string(selector)
        ));
    }

    pub fn screenshot(&mut self, path: &str) {
        self.comment("Take screenshot").statement(format!(
            "await page.screenshot({{ path: {}, fullPage: true }});",
            js_string(path)
        ));
    }

    pub fn final_screenshot(&mut self) {
        self.comment("Take final screenshot")
            .statement("await page.screenshot({ path: 'final-screenshot.png', fullPage: true });");
    }

    pub fn api_request(&mut self, method: &str, url: &str) {
        self.comment(format!("Make {} request to {}", method, url))
            .statement(format!(
                "const response = await request.{}({});",
                method.to_ascii_lowercase(),
                js_string(url)
            ))
            .statement("expect(response.status()).toBeLessThan(400);");
    }

    pub fn api_json_body(&mut self) {
        self.statement("const jsonData = await response.json();")
            .statement("expect(jsonData).toBeDefined();");
    }

    pub fn api_text_body(&mut self) {
        self.statement("const textData = await response.text();")
            .statement("expect(textData).toBeDefined();");
    }

    /// Close the test body and join the lines
    pub fn finish(mut self) -> String {
        self.lines.push(CLOSING_LINE.to_string());
        self.lines.join("\n")
    }
}

/// Placeholder script for a test that failed before producing steps
pub fn failure_script(test_type: TestType, error: &str, prompt: &str) -> String {
    let (name, fixture) = match test_type {
        TestType::Api => ("Failed API Test", "request"),
        TestType::Ui | TestType::Mixed => ("Failed UI Test", "page"),
    };
    [
        IMPORT_LINE.to_string(),
        String::new(),
        format!("test('{}', async ({{ {} }}) => {{", name, fixture),
        format!("  // This test failed with error: {}", single_line(error)),
        format!("  // Original prompt: {}", single_line(prompt)),
        String::new(),
        "  // Fix the error and retry".to_string(),
        CLOSING_LINE.to_string(),
    ]
    .join("\n")
}

/// Quote `value` as a single-quoted JavaScript string literal
fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// Comments must not break across lines
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
