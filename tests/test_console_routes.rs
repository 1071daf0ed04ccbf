//! Route behavior driven through the bus, the way the host's front-end
//! delivers requests.

mod common;

use common::{boot, boot_with, drive, get, publish_app_event};
use devdeck::console::ConsoleConfig;
use devdeck::http::{HttpMethod, HttpRequest};
use serde_json::{Value, json};

#[test]
fn events_endpoint_returns_newest_first_json() {
    let stack = boot();
    publish_app_event(&stack.host, "orders", json!({"id": 1}));
    publish_app_event(&stack.host, "orders", json!({"id": 2}));

    let response = drive(&stack.host, &get("/dev-console/events")).expect("matched");
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "application/json");

    let entries: Vec<Value> = serde_json::from_str(&response.body).unwrap();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert!(entry.get("channel").is_some());
        assert!(entry.get("payload").is_some());
        assert!(entry.get("response").is_some());
        assert!(entry.get("isAck").is_some());
        assert!(entry.get("isBroadcast").is_some());
    }
    assert_eq!(entries[0]["payload"], json!(r#"{"id":2}"#));
    assert_eq!(entries[1]["payload"], json!(r#"{"id":1}"#));
}

#[test]
fn events_endpoint_truncates_long_payloads() {
    let stack = boot();
    publish_app_event(&stack.host, "orders", json!("z".repeat(400)));

    let response = drive(&stack.host, &get("/dev-console/events")).expect("matched");
    let entries: Vec<Value> = serde_json::from_str(&response.body).unwrap();
    let payload = entries[0]["payload"].as_str().unwrap();
    assert_eq!(payload.chars().count(), 257);
    assert!(payload.ends_with('…'));
}

#[test]
fn logs_endpoint_returns_formatted_lines() {
    let stack = boot();
    let record = json!({
        "timestamp": "2025-06-01T10:15:30Z",
        "level": "INFO",
        "target": "app::orders",
        "message": "order accepted",
    });
    publish_app_event(&stack.host, devdeck::bus::LOGGING, record);

    let response = drive(&stack.host, &get("/dev-console/logs")).expect("matched");
    assert_eq!(response.status, 200);
    let lines: Vec<String> = serde_json::from_str(&response.body).unwrap();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("order accepted"));
    assert!(lines[0].contains("app::orders"));

    // Log deliveries never land in event history.
    let events = drive(&stack.host, &get("/dev-console/events")).expect("matched");
    let entries: Vec<Value> = serde_json::from_str(&events.body).unwrap();
    assert!(entries.iter().all(|e| e["channel"] != "logging"));
}

#[test]
fn config_endpoint_returns_current_values() {
    let stack = boot_with(ConsoleConfig::new("/panel", 42, 7));
    let response = drive(&stack.host, &get("/dev-console/config")).expect("matched");
    let config: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(config["baseUrl"], "/panel");
    assert_eq!(config["maxEvents"], 42);
    assert_eq!(config["maxLogs"], 7);
}

#[test]
fn system_info_reports_runtime_snapshot() {
    let stack = boot();
    publish_app_event(&stack.host, "orders", json!(1));

    let response = drive(&stack.host, &get("/dev-console/system-info")).expect("matched");
    let info: Value = serde_json::from_str(&response.body).unwrap();

    assert_eq!(info["pid"], u64::from(std::process::id()));
    assert!(info["totalEvents"].as_u64().unwrap() >= 2);
    assert_eq!(info["lastEventsRetained"], 1);
    // The log-forwarder is excluded from the visible count.
    assert_eq!(info["services"], 1);
    assert_eq!(info["serviceNames"], json!(["dev-console"]));
    assert!(info["listeners"].as_u64().unwrap() > 0);
    assert!(info.get("usedMemory").is_some());
    assert!(info.get("cpuUsage").is_some());
    assert!(info.get("lastUpdated").is_some());
}

#[test]
fn dashboard_root_serves_html() {
    let stack = boot();
    let response = drive(&stack.host, &get("/dev-console/ui")).expect("matched");
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "text/html; charset=utf-8");
    assert!(response.body.contains("<!DOCTYPE html>"));
}

#[test]
fn dashboard_root_honors_custom_ui_path() {
    let stack = boot_with(ConsoleConfig::new("/ab", 1000, 1000));
    let response = drive(&stack.host, &get("/dev-console/ab")).expect("matched");
    assert!(response.body.contains("<!DOCTYPE html>"));
    assert!(drive(&stack.host, &get("/dev-console/ui")).is_none());
}

#[test]
fn static_assets_carry_their_content_type() {
    let stack = boot();

    let js = drive(&stack.host, &get("/dev-console/script.js")).expect("matched");
    assert_eq!(js.content_type, "application/javascript");
    assert!(js.body.contains("document.addEventListener(\"DOMContentLoaded\""));

    let css = drive(&stack.host, &get("/dev-console/style.css")).expect("matched");
    assert_eq!(css.content_type, "text/css");
    assert!(css.body.contains("linear-gradient(135deg"));
}

#[test]
fn responses_carry_cors_headers() {
    let stack = boot();
    let response = drive(&stack.host, &get("/dev-console/config")).expect("matched");
    assert!(
        response
            .headers
            .iter()
            .any(|(k, v)| k == "Access-Control-Allow-Origin" && v == "*")
    );
}

#[test]
fn unmatched_paths_are_left_for_other_handlers() {
    let stack = boot();
    assert!(drive(&stack.host, &get("/api/orders")).is_none());
    assert!(drive(&stack.host, &get("/dev-console/unbundled.js")).is_none());
    assert!(drive(&stack.host, &get("/dev-console/service/ghost")).is_none());
}

#[test]
fn unsupported_verbs_on_matched_routes_are_ignored() {
    let stack = boot();
    let post = HttpRequest::new(HttpMethod::Post, "/dev-console/events");
    assert!(drive(&stack.host, &post).is_none());

    let options = HttpRequest::new(HttpMethod::from("OPTIONS"), "/dev-console/config");
    assert!(drive(&stack.host, &options).is_none());
}

#[test]
fn foreign_http_traffic_is_recorded_not_answered() {
    let stack = boot();
    let foreign = HttpRequest::new(HttpMethod::Get, "/app/health");
    assert!(drive(&stack.host, &foreign).is_none());

    // The unmatched request lands in event history like any other event.
    let response = drive(&stack.host, &get("/dev-console/events")).expect("matched");
    let entries: Vec<Value> = serde_json::from_str(&response.body).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["channel"], "http-request");
    // The console's own (matched) requests never appear.
    assert!(!entries[0]["payload"].as_str().unwrap().contains("dev-console"));
}
