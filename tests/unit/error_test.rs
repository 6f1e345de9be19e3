//! Tests for the page error types.
//!
//! These tests verify Display output, categorization and conversions.

use oauth_token_page::error::{failure_message, PageError, PageResult, UNKNOWN_ERROR};

// ============== Display Tests ==============

#[test]
fn test_token_fetch_rejected_message() {
    let err = PageError::token_fetch_rejected(403, "Forbidden");
    assert_eq!(err.to_string(), "Failed to fetch token: 403 Forbidden");
}

#[test]
fn test_storage_rejected_message() {
    let err = PageError::storage_rejected(500, "db down");
    assert_eq!(err.to_string(), "Failed to store token: 500 db down");
}

#[test]
fn test_network_message_is_raw() {
    assert_eq!(PageError::token_fetch_network("Failed to fetch").to_string(), "Failed to fetch");
    assert_eq!(PageError::storage_network("").to_string(), UNKNOWN_ERROR);
}

#[test]
fn test_normalization_message() {
    assert_eq!(PageError::Normalization.to_string(), "Invalid token format");
}

#[test]
fn test_invalid_instance_url_message() {
    let err = PageError::invalid_instance_url("foo", "relative URL without a base");
    assert!(err.to_string().contains("'foo'"));
    assert!(err.to_string().contains("relative URL without a base"));
}

// ============== Category Tests ==============

#[test]
fn test_unauthorized_is_not_terminal() {
    let err = PageError::TokenFetchUnauthorized;
    assert!(err.is_recoverable());
    assert!(!err.is_terminal());
    assert!(!err.forces_fallback_page());
}

#[test]
fn test_terminal_errors() {
    let terminal = [
        PageError::token_fetch_network("x"),
        PageError::token_fetch_rejected(500, "x"),
        PageError::token_fetch_invalid_response("x"),
        PageError::storage_network("x"),
        PageError::storage_rejected(500, "x"),
        PageError::storage_invalid_response("x"),
    ];
    for err in terminal {
        assert!(err.is_terminal(), "{err:?} should be terminal");
        assert!(!err.is_recoverable());
    }
}

#[test]
fn test_fallback_errors() {
    assert!(PageError::asset_load("oauth-callback.html", "x").forces_fallback_page());
    assert!(PageError::invalid_request_info("x").forces_fallback_page());
    assert!(!PageError::config("x").forces_fallback_page());
}

// ============== Conversion Tests ==============

#[test]
fn test_from_normalize_error() {
    let err: PageError = oauth_token_page::client::NormalizeError::Empty.into();
    assert!(matches!(err, PageError::Normalization));
}

#[test]
fn test_question_mark_with_anyhow() {
    fn inner() -> anyhow::Result<()> {
        anyhow::bail!("disk on fire")
    }
    fn outer() -> PageResult<()> {
        inner()?;
        Ok(())
    }
    let err = outer().unwrap_err();
    assert_eq!(err.module(), "unknown");
    assert!(err.to_string().contains("disk on fire"));
}

#[test]
fn test_failure_message_passthrough() {
    assert_eq!(failure_message(Some("  kept  ")), "kept");
}
