//! Serde serialization/deserialization tests for core types.
//!
//! Fetch options are loaded from preset files written by hand, so these
//! tests pin down the JSON shape as well as the round-trip.

use serde_json::json;

use crate::{FetchOptions, FetchStatus, HttpMethod, LogVerbosity, Paging, RequestSettings, RunState};

// ============================================================================
// FetchStatus Serde Tests
// ============================================================================

#[test]
fn test_fetch_status_serializes_as_text() {
    let json = serde_json::to_string(&FetchStatus::Fetched(200)).unwrap();
    assert_eq!(json, r#""fetched (200)""#);

    let parsed: FetchStatus = serde_json::from_str(r#""error (503)""#).unwrap();
    assert_eq!(parsed, FetchStatus::Error(Some(503)));
}

#[test]
fn test_fetch_status_invalid_deserialize() {
    let result: Result<FetchStatus, _> = serde_json::from_str(r#""finished""#);
    assert!(result.is_err());
}

// ============================================================================
// FetchOptions Serde Tests
// ============================================================================

#[test]
fn test_fetch_options_partial_preset_uses_defaults() {
    let preset = json!({
        "module": "facebook",
        "threads": 4,
        "request": {
            "resource": "<Object ID>/posts",
            "paging": {"type": "url", "key": "paging.next"}
        }
    });

    let options: FetchOptions = serde_json::from_value(preset).unwrap();
    assert_eq!(options.module, "facebook");
    assert_eq!(options.threads, 4);
    assert_eq!(options.requests_per_minute, FetchOptions::default().requests_per_minute);
    assert_eq!(
        options.request.paging,
        Paging::Url {
            key: "paging.next".to_string()
        }
    );
    assert!(options.is_excluded("offcut"));
}

#[test]
fn test_fetch_options_roundtrip() {
    let mut options = FetchOptions::for_module(
        "generic",
        RequestSettings::new("https://api.example.com", "/items")
            .with_param("q", "<name>")
            .with_nodes_key("items")
            .with_paging(Paging::Count {
                param: "offset".to_string(),
                start: 0,
                step: 50,
            }),
    );
    options.request.method = HttpMethod::Post;
    options.verbosity = LogVerbosity::Verbose;
    options.resume = true;

    let json = serde_json::to_string(&options).unwrap();
    let parsed: FetchOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, options);
}

#[test]
fn test_http_method_uppercase() {
    let json = serde_json::to_string(&HttpMethod::Patch).unwrap();
    assert_eq!(json, r#""PATCH""#);
}

// ============================================================================
// RunState Serde Tests
// ============================================================================

#[test]
fn test_run_state_tagged() {
    let value = serde_json::to_value(RunState::Aborted {
        consecutive_errors: 5,
    })
    .unwrap();
    assert_eq!(value, json!({"state": "aborted", "consecutive_errors": 5}));

    let parsed: RunState = serde_json::from_value(json!({"state": "completed"})).unwrap();
    assert_eq!(parsed, RunState::Completed);
}
