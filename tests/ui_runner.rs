//! Integration tests for UI test execution against the mock browser

use std::sync::Arc;

use pretty_assertions::assert_eq;
use testpilot::browser::{MockBrowser, MockSite};
use testpilot::intent::{Action, TestIntent, TestOptions, TestRequest, TestType, VerifyCondition};
use testpilot::runner::{JobStatus, StepStatus, TestRunner};

fn request(test_type: TestType, actions: Vec<Action>) -> TestRequest {
    TestRequest::new(
        "integration test prompt",
        TestIntent {
            test_type,
            target_url: Some("https://example.com".to_string()),
            actions,
            options: TestOptions::default(),
        },
    )
}

fn navigate(url: &str) -> Action {
    Action::Navigate {
        url: url.to_string(),
    }
}

#[tokio::test]
async fn test_successful_ui_run() {
    let browser = MockBrowser::new(MockSite::default().title("Sign in"));
    let runner = TestRunner::new(Arc::new(browser.clone()));
    let request = request(
        TestType::Ui,
        vec![
            navigate("https://example.com"),
            Action::Click {
                target: "login".to_string(),
            },
            Action::Type {
                text: "test@example.com".to_string(),
            },
            Action::Verify {
                condition: VerifyCondition::PageLoaded,
            },
            Action::Screenshot,
        ],
    );

    let result = runner.run(&request).await;

    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.test_id, request.test_id);
    assert!(result.error.is_none());
    let actions: Vec<&str> = result.steps.iter().map(|s| s.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            "navigate to https://example.com",
            "click login",
            "type 'test@example.com'",
            "verify page_loaded",
            "screenshot",
            "final_screenshot",
        ]
    );
    assert_eq!(result.steps[3].logs, vec!["Page loaded with title: Sign in".to_string()]);
    assert_eq!(result.steps[5].logs, vec!["Final screenshot captured".to_string()]);
    assert!(result.steps[5].screenshot.is_some());

    let script = &result.generated_script;
    assert!(script.starts_with("import { test, expect } from '@playwright/test';"));
    assert!(script.contains("await page.goto('https://example.com');"));
    assert!(script.contains(r#"await page.click('button[type="submit"]');"#));
    assert!(script.contains("fullPage: true"));
    assert!(script.ends_with("});"));
}

#[tokio::test]
async fn test_stops_at_first_failed_step() {
    let browser = MockBrowser::new(MockSite::default());
    let runner = TestRunner::new(Arc::new(browser.clone()));
    let request = request(
        TestType::Ui,
        vec![
            navigate("https://example.com"),
            Action::Click {
                target: "search".to_string(),
            },
            Action::Type {
                text: "never typed".to_string(),
            },
            Action::Screenshot,
        ],
    );

    let result = runner.run(&request).await;

    assert_eq!(result.status, JobStatus::Failed);
    assert_eq!(result.steps.len(), 3);
    assert_eq!(result.steps[1].action, "click search");
    assert_eq!(result.steps[1].status, StepStatus::Failed);
    assert_eq!(result.steps[2].action, "final_screenshot");
    assert!(!browser.journal().iter().any(|e| e.starts_with("fill ")));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_executed_steps_are_a_prefix_of_the_plan() {
    let plans = vec![
        vec![navigate("https://example.com"), Action::Screenshot],
        vec![
            navigate("https://example.com"),
            Action::Click {
                target: "menu".to_string(),
            },
            Action::Screenshot,
        ],
        vec![
            Action::Type {
                text: "x".to_string(),
            },
            Action::Verify {
                condition: VerifyCondition::ElementPresent,
            },
        ],
        vec![navigate("https://down.test"), Action::Screenshot],
    ];
    let site = MockSite::empty().unreachable("https://down.test");

    for plan in plans {
        let runner = TestRunner::new(Arc::new(MockBrowser::new(site.clone())));
        let result = runner.run(&request(TestType::Ui, plan.clone())).await;

        let executed = &result.steps[..result.steps.len() - 1];
        assert!(executed.len() <= plan.len());
        for (step, action) in executed.iter().zip(&plan) {
            assert_eq!(step.action, action.describe());
        }
        let first_failure = executed.iter().position(|s| s.status == StepStatus::Failed);
        if let Some(index) = first_failure {
            assert_eq!(index, executed.len() - 1);
        }
    }
}

#[tokio::test]
async fn test_browser_released_on_every_path() {
    let sites = vec![
        MockSite::default(),
        MockSite::empty(),
        MockSite::default().fail_screenshots(true),
        MockSite::default().unreachable("https://example.com"),
    ];

    for site in sites {
        let browser = MockBrowser::new(site);
        let runner = TestRunner::new(Arc::new(browser.clone()));
        runner
            .run(&request(
                TestType::Ui,
                vec![
                    navigate("https://example.com"),
                    Action::Click {
                        target: "button".to_string(),
                    },
                ],
            ))
            .await;

        assert_eq!(browser.open_browsers(), 0);
        let journal = browser.journal();
        let tail: Vec<&str> = journal.iter().rev().take(2).rev().map(String::as_str).collect();
        assert_eq!(tail, vec!["close context", "close browser"]);
    }
}

#[tokio::test]
async fn test_final_screenshot_failure_does_not_fail_the_test() {
    let browser = MockBrowser::new(MockSite::default().fail_screenshots(true));
    let runner = TestRunner::new(Arc::new(browser));
    let result = runner
        .run(&request(
            TestType::Ui,
            vec![
                navigate("https://example.com"),
                Action::Verify {
                    condition: VerifyCondition::PageLoaded,
                },
            ],
        ))
        .await;

    assert_eq!(result.status, JobStatus::Completed);
    let last = result.steps.last().unwrap();
    assert_eq!(last.action, "final_screenshot");
    assert_eq!(last.status, StepStatus::Failed);
    assert!(last.logs[0].starts_with("Failed to capture final screenshot:"));
    assert!(!result.generated_script.contains("final-screenshot.png"));
}

#[tokio::test]
async fn test_launch_failure_becomes_failed_result() {
    let browser = MockBrowser::new(MockSite::default().launch_error("Executable doesn't exist"));
    let runner = TestRunner::new(Arc::new(browser.clone()));
    let request = request(TestType::Ui, vec![navigate("https://example.com")]);

    let result = runner.run(&request).await;

    assert_eq!(result.status, JobStatus::Failed);
    assert!(result.steps.is_empty());
    let error = result.error.as_deref().unwrap();
    assert!(error.contains("Executable doesn't exist"));
    assert!(result.generated_script.contains("test('Failed UI Test'"));
    assert!(result
        .generated_script
        .contains("// Original prompt: integration test prompt"));
    assert_eq!(browser.open_browsers(), 0);
}

#[tokio::test]
async fn test_mixed_runs_the_ui_path() {
    let browser = MockBrowser::new(MockSite::default());
    let runner = TestRunner::new(Arc::new(browser.clone()));
    let result = runner
        .run(&request(
            TestType::Mixed,
            vec![navigate("https://example.com"), Action::Screenshot],
        ))
        .await;

    assert_eq!(result.status, JobStatus::Completed);
    assert!(result.generated_script.contains("test('Generated UI Test'"));
    assert!(browser.journal()[0].starts_with("launch chromium"));
}

#[tokio::test]
async fn test_requested_engine_and_context_settings() {
    let browser = MockBrowser::new(MockSite::default());
    let runner = TestRunner::new(Arc::new(browser.clone()));
    let mut request = request(TestType::Ui, vec![navigate("https://example.com")]);
    request.intent.options.browser = testpilot::BrowserKind::Webkit;
    request.intent.options.headless = false;

    runner.run(&request).await;

    let journal = browser.journal();
    assert_eq!(journal[0], "launch webkit headless=false");
    assert_eq!(journal[1], "new_context 1280x720 ua=true");
}
