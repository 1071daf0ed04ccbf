//! End-to-end tests over a real HTTP listener, mirroring how a deployed
//! host would front the console.

mod common;

use std::time::Duration;

use common::{boot_full, boot_full_with, publish_app_event, wait_until};
use devdeck::console::ConsoleConfig;
use serde_json::{Value, json};

#[tokio::test(flavor = "multi_thread")]
async fn fetch_events() {
    let stack = boot_full().await;
    publish_app_event(&stack.host, "orders", json!({"id": 7}));

    let resp = reqwest::get(format!("{}/dev-console/events", stack.base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body = resp.text().await.unwrap();
    assert!(body.contains("channel"));
    assert!(body.contains("payload"));
    assert!(body.contains("response"));
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_system_info() {
    let stack = boot_full().await;
    let resp = reqwest::get(format!("{}/dev-console/system-info", stack.base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("pid"));
    assert!(body.contains("totalEvents"));
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_logs() {
    let stack = boot_full().await;
    let line = "Test log output";
    publish_app_event(
        &stack.host,
        devdeck::bus::LOGGING,
        json!({
            "timestamp": "2025-06-01T10:15:30Z",
            "level": "INFO",
            "target": "tests",
            "message": line,
        }),
    );

    let resp = reqwest::get(format!("{}/dev-console/logs", stack.base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains(line));
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_config() {
    let stack = boot_full().await;
    let resp = reqwest::get(format!("{}/dev-console/config", stack.base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("maxEvents"));
    assert!(body.contains("maxLogs"));
    assert!(body.contains("baseUrl"));
}

#[tokio::test(flavor = "multi_thread")]
async fn update_config() {
    let stack = boot_full().await;
    assert_eq!(stack.console.config().ui_path(), "/ui");
    assert_eq!(stack.console.config().max_logs(), 1000);

    let client = reqwest::Client::new();
    let resp = client
        .patch(format!("{}/dev-console/config", stack.base))
        .body(json!({"baseUrl": "/tests", "maxLogs": 1}).to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("/tests"));
    assert!(body.contains('1'));

    let console = std::sync::Arc::clone(&stack.console);
    assert!(
        tokio::task::spawn_blocking(move || {
            wait_until(Duration::from_secs(5), move || {
                console.config().max_logs() == 1
            })
        })
        .await
        .unwrap()
    );
    assert_eq!(stack.console.config().ui_path(), "/tests");
    assert_eq!(stack.console.config().max_events(), 1000);

    let view: Value = reqwest::get(format!("{}/dev-console/config", stack.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["maxLogs"], 1);
    assert_eq!(view["maxEvents"], 1000);
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_html_using_default_url() {
    let stack = boot_full().await;
    let resp = reqwest::get(format!("{}/dev-console/ui", stack.base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    assert_eq!(stack.console.assets().len(), 4);
    assert!(resp.text().await.unwrap().contains("<!DOCTYPE html>"));
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_html_using_custom_url() {
    let stack = boot_full_with(ConsoleConfig::new("/ab", 1000, 1000)).await;
    let resp = reqwest::get(format!("{}/dev-console/ab", stack.base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("<!DOCTYPE html>"));
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_js() {
    let stack = boot_full().await;
    let resp = reqwest::get(format!("{}/dev-console/script.js", stack.base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/javascript"
    );
    assert!(
        resp.text()
            .await
            .unwrap()
            .contains("document.addEventListener(\"DOMContentLoaded\"")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_css() {
    let stack = boot_full().await;
    let resp = reqwest::get(format!("{}/dev-console/style.css", stack.base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "text/css");
    assert!(resp.text().await.unwrap().contains("linear-gradient(135deg"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unmatched_paths_yield_404() {
    let stack = boot_full().await;
    let miss = reqwest::get(format!("{}/dev-console/unbundled.js", stack.base))
        .await
        .unwrap();
    assert_eq!(miss.status(), 404);

    let foreign = reqwest::get(format!("{}/somewhere/else", stack.base))
        .await
        .unwrap();
    assert_eq!(foreign.status(), 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn cors_headers_are_present() {
    let stack = boot_full().await;
    let resp = reqwest::get(format!("{}/dev-console/config", stack.base))
        .await
        .unwrap();
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
