//! Tests for utility functions

use fanout_executor::util::{
    init_tracing, init_tracing_with, normalize_tenant_key, summarize_args, summarize_result,
    TenantContext, DEFAULT_TENANT, MAX_SUMMARY_STR,
};
use serde_json::json;

#[test]
fn test_normalize_tenant_key() {
    assert_eq!(normalize_tenant_key(Some("  ACME ")), "acme");
    assert_eq!(normalize_tenant_key(Some("   ")), DEFAULT_TENANT);
    assert_eq!(normalize_tenant_key(None), DEFAULT_TENANT);
}

#[test]
fn test_tenant_context_scopes_keys() {
    let ctx = TenantContext::new("Acme");
    assert_eq!(ctx.tenant_id, "acme");
    assert_eq!(ctx.scoped_key("budgets"), "acme:budgets");
    assert_eq!(TenantContext::default().scoped_key("x"), "default:x");
}

#[test]
fn test_summarize_args_keeps_scalars() {
    let summary = summarize_args(&("123-456-7890", 42, true));
    assert_eq!(summary, json!(["123-456-7890", 42, true]));
}

#[test]
fn test_summarize_args_bounds_objects() {
    let payload: serde_json::Map<String, serde_json::Value> =
        (0..15).map(|i| (format!("k{i:02}"), json!(i))).collect();
    let summary = summarize_args(&serde_json::Value::Object(payload));
    assert_eq!(summary["type"], "dict");
    assert_eq!(summary["keys"].as_array().unwrap().len(), 10);
}

#[test]
fn test_summarize_result_truncates_long_strings() {
    let long = "x".repeat(MAX_SUMMARY_STR + 10);
    let summary = summarize_result(&long);
    let text = summary.as_str().unwrap();
    assert!(text.ends_with("...(truncated)"));
    assert_eq!(text.len(), MAX_SUMMARY_STR + "...(truncated)".len());

    let short = summarize_result(&"done");
    assert_eq!(short, json!("done"));
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing_with("fanout_executor=debug");
    init_tracing();
    tracing::info!(component = "util_test", "tracing initialised");
}
