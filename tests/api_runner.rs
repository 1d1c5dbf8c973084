//! Integration tests for API test execution against a local mock server

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use testpilot::browser::{MockBrowser, MockSite};
use testpilot::config::ApiSettings;
use testpilot::intent::{TestIntent, TestOptions, TestRequest, TestType};
use testpilot::runner::{JobStatus, StepStatus, TestRunner};

fn api_runner(base_url: &str) -> (MockBrowser, TestRunner) {
    let browser = MockBrowser::new(MockSite::default());
    let runner = TestRunner::new(Arc::new(browser.clone())).with_api_settings(
        ApiSettings::defaults()
            .base_url(base_url)
            .timeout(Duration::from_secs(5)),
    );
    (browser, runner)
}

fn api_request(prompt: &str) -> TestRequest {
    TestRequest::new(
        prompt,
        TestIntent {
            test_type: TestType::Api,
            target_url: None,
            actions: Vec::new(),
            options: TestOptions::default(),
        },
    )
}

#[tokio::test]
async fn test_get_endpoint_returning_json() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"ok":true}"#);
        })
        .await;

    let (browser, runner) = api_runner(&server.base_url());
    let result = runner
        .run(&api_request("test the GET /users endpoint returning JSON"))
        .await;

    mock.assert_async().await;
    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.steps.len(), 1);

    let step = &result.steps[0];
    assert_eq!(step.status, StepStatus::Success);
    assert_eq!(step.action, format!("GET {}/users", server.base_url()));
    assert!(step.logs.contains(&"Status Code: 200".to_string()));
    assert!(step.logs[1].starts_with("Response Time: "));
    assert_eq!(step.logs[2], "Content Type: application/json");
    assert!(step.logs[3].starts_with("JSON Response: {"));
    assert!(step.logs[3].contains("\"ok\": true"));

    assert!(result
        .generated_script
        .contains("test('Generated API Test', async ({ request }) => {"));
    assert!(result
        .generated_script
        .contains("expect(response.status()).toBeLessThan(400);"));
    assert!(result
        .generated_script
        .contains("const jsonData = await response.json();"));

    assert!(browser.journal().is_empty());
}

#[tokio::test]
async fn test_error_status_fails_the_step() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/items/7");
            then.status(404).body("no such item");
        })
        .await;

    let (_browser, runner) = api_runner(&server.base_url());
    let result = runner
        .run(&api_request("verify the api can delete /items/7"))
        .await;

    assert_eq!(result.status, JobStatus::Failed);
    let step = &result.steps[0];
    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.logs.contains(&"Status Code: 404".to_string()));
    assert!(step.logs.contains(&"Text Response: no such item...".to_string()));
    assert!(result.generated_script.contains("request.delete("));
    assert!(result.generated_script.contains("const textData = await response.text();"));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_long_bodies_are_truncated() {
    let server = MockServer::start_async().await;
    let body = "x".repeat(2_000);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/test");
            then.status(200).body(body.as_str());
        })
        .await;

    let (_browser, runner) = api_runner(&server.base_url());
    let result = runner.run(&api_request("check the api endpoint")).await;

    let preview = result.steps[0].logs.last().unwrap();
    assert_eq!(preview, &format!("Text Response: {}...", "x".repeat(500)));
}

#[tokio::test]
async fn test_unreachable_host_is_a_failed_step() {
    let (_browser, runner) = api_runner("http://127.0.0.1:1");
    let result = runner.run(&api_request("test the GET /health endpoint")).await;

    assert_eq!(result.status, JobStatus::Failed);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].action, "api_request");
    assert!(result.steps[0].logs[0].starts_with("Error: "));
    assert!(result.generated_script.contains("// Error occurred: "));
    assert!(result.generated_script.ends_with("});"));
}

#[tokio::test]
async fn test_prompt_path_joins_target_origin() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/orders");
            then.status(201).json_body(serde_json::json!({ "id": 1 }));
        })
        .await;

    let (_browser, runner) = api_runner("https://api.example.com");
    let mut request = api_request("test that we can post to /orders");
    request.intent.target_url = Some(format!("{}/v1/health", server.base_url()));
    let result = runner.run(&request).await;

    mock.assert_async().await;
    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.steps[0].action, format!("POST {}/orders", server.base_url()));
}

#[tokio::test]
async fn test_target_url_with_path_is_requested_as_given() {
    let server = MockServer::start_async().await;
    let health = server
        .mock_async(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(serde_json::json!({ "status": "up" }));
        })
        .await;

    let (_browser, runner) = api_runner("https://api.example.com");
    let mut request = api_request("check the api");
    request.intent.target_url = Some(format!("{}/health", server.base_url()));
    let result = runner.run(&request).await;

    health.assert_async().await;
    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.steps[0].action, format!("GET {}/health", server.base_url()));
    assert!(result.steps[0].logs.contains(&"Status Code: 200".to_string()));
}
