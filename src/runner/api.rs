//! HTTP test path: one request derived from the prompt.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Instant;
use tracing::{debug, warn};

use super::script::ScriptBuilder;
use super::types::{RunnerResult, StepResult};
use crate::config::ApiSettings;
use crate::interpreter::patterns::{ENDPOINT_PATTERN, URL_PATTERN};

/// Characters of response body kept in the log preview
pub const BODY_PREVIEW_CHARS: usize = 500;

/// Path used when the prompt names neither a URL nor an endpoint
pub const FALLBACK_PATH: &str = "/test";

// Checked in order; the first whole-word match wins.
static METHOD_KEYWORDS: Lazy<Vec<(Regex, Method)>> = Lazy::new(|| {
    [("post", Method::POST), ("put", Method::PUT), ("delete", Method::DELETE)]
        .into_iter()
        .filter_map(|(word, method)| {
            Regex::new(&format!(r"\b{}\b", word))
                .ok()
                .map(|re| (re, method))
        })
        .collect()
});

/// An HTTP request described by a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
}

impl ApiRequest {
    /// Derive method and URL from `prompt`.
    ///
    /// An explicit URL wins over a path-like token, which is joined to
    /// `base_url`. With neither, `<base_url>/test` is used.
    pub fn parse(prompt: &str, base_url: &str) -> Self {
        let url = if let Some(m) = URL_PATTERN.find(prompt) {
            m.as_str().to_string()
        } else if let Some(m) = ENDPOINT_PATTERN.find(prompt) {
            format!("{}{}", base_url, m.as_str())
        } else {
            format!("{}{}", base_url, FALLBACK_PATH)
        };

        Self {
            method: method_of(prompt),
            url,
        }
    }

    /// Derive the request for a caller-supplied endpoint.
    ///
    /// `target_url` is requested as given unless the prompt names its own URL
    /// or a path, in which case the path replaces the target's path.
    pub fn for_target(prompt: &str, target_url: &str) -> Self {
        let url = if let Some(m) = URL_PATTERN.find(prompt) {
            m.as_str().to_string()
        } else if let Some(m) = ENDPOINT_PATTERN.find(prompt) {
            format!("{}{}", origin_of(target_url), m.as_str())
        } else {
            target_url.to_string()
        };

        Self {
            method: method_of(prompt),
            url,
        }
    }

    /// Step label, e.g. `GET https://api.example.com/users`
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

fn method_of(prompt: &str) -> Method {
    let lowered = prompt.to_lowercase();
    METHOD_KEYWORDS
        .iter()
        .find(|(re, _)| re.is_match(&lowered))
        .map(|(_, method)| method.clone())
        .unwrap_or(Method::GET)
}

/// Scheme, host and port of `url`; the trimmed input if it does not parse
fn origin_of(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) if parsed.has_host() => parsed.origin().ascii_serialization(),
        _ => url.trim_end_matches('/').to_string(),
    }
}

/// Build the client used for API tests
pub fn client(settings: &ApiSettings) -> RunnerResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(reqwest::Client::builder()
        .timeout(settings.timeout)
        .default_headers(headers)
        .build()?)
}

/// Issue `request` and record the response as a single step
pub async fn execute(
    client: &reqwest::Client,
    request: &ApiRequest,
    script: &mut ScriptBuilder,
) -> StepResult {
    script.api_request(request.method.as_str(), &request.url);
    debug!(method = %request.method, url = %request.url, "sending api request");

    let started = Instant::now();
    let response = match client.request(request.method.clone(), &request.url).send().await {
        Ok(response) => response,
        Err(e) => return request_failed(e, script),
    };
    let elapsed = started.elapsed();

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let mut logs = vec![
        format!("Status Code: {}", status.as_u16()),
        format!("Response Time: {:.2}s", elapsed.as_secs_f64()),
        format!("Content Type: {}", content_type),
    ];

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return request_failed(e, script),
    };
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => {
            let pretty = serde_json::to_string_pretty(&json).unwrap_or(body);
            logs.push(format!("JSON Response: {}...", preview(&pretty)));
            script.api_json_body();
        }
        Err(_) => {
            logs.push(format!("Text Response: {}...", preview(&body)));
            script.api_text_body();
        }
    }

    if status.as_u16() < 400 {
        StepResult::success(request.describe(), logs)
    } else {
        StepResult::failed(request.describe(), logs)
    }
}

fn request_failed(error: reqwest::Error, script: &mut ScriptBuilder) -> StepResult {
    warn!(error = %error, "api request failed");
    script.comment(format!("Error occurred: {}", error));
    StepResult::failed("api_request", vec![format!("Error: {}", error)])
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.example.com";

    #[test]
    fn test_parse_endpoint_against_base() {
        let request = ApiRequest::parse("test the GET /users endpoint returning JSON", BASE);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "https://api.example.com/users");
        assert_eq!(request.describe(), "GET https://api.example.com/users");
    }

    #[test]
    fn test_parse_explicit_url_and_method() {
        let request = ApiRequest::parse("check that POST https://svc.test/v1/items works", BASE);
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://svc.test/v1/items");

        let request = ApiRequest::parse("verify the api can DELETE records", BASE);
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.url, "https://api.example.com/test");
    }

    #[test]
    fn test_target_url_is_requested_verbatim() {
        let request = ApiRequest::for_target("check the api", "http://127.0.0.1:8080/health");
        assert_eq!(request.url, "http://127.0.0.1:8080/health");
        assert_eq!(request.method, Method::GET);

        let request =
            ApiRequest::for_target("test that we can post to /orders", "https://svc.test/v1/health");
        assert_eq!(request.url, "https://svc.test/orders");
        assert_eq!(request.method, Method::POST);

        let request = ApiRequest::for_target(
            "check https://other.test/ping",
            "https://svc.test/v1/health",
        );
        assert_eq!(request.url, "https://other.test/ping");
    }

    #[test]
    fn test_origin_keeps_port_and_drops_path() {
        assert_eq!(origin_of("http://127.0.0.1:8080/a/b?q=1"), "http://127.0.0.1:8080");
        assert_eq!(origin_of("https://svc.test/"), "https://svc.test");
        assert_eq!(origin_of("not a url/"), "not a url");
    }

    #[test]
    fn test_method_keywords_are_whole_words() {
        let request = ApiRequest::parse("test the api input and output", BASE);
        assert_eq!(request.method, Method::GET);
        let request = ApiRequest::parse("test the api with a postcard", BASE);
        assert_eq!(request.method, Method::GET);
    }

    #[test]
    fn test_preview_counts_characters() {
        let long = "é".repeat(600);
        assert_eq!(preview(&long).chars().count(), BODY_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
