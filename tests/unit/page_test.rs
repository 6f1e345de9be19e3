//! Tests for page composition and the fallback error page.

use oauth_token_page::assets::{AssetKind, BundledAssets};
use oauth_token_page::page::fallback::{ERROR_HEADING, ERROR_TITLE};
use oauth_token_page::page::{
    compose, extract_embedded_request_info, render_page, Fragments, OAuthRequestInfo,
    PageComposer, PageKind,
};
use proptest::prelude::*;
use serde_json::{json, Value};

use crate::common::{marker, Failure, ScriptedSource};

fn bundled_fragments() -> Fragments {
    Fragments {
        markup: BundledAssets::get(AssetKind::Markup).to_string(),
        stylesheet: BundledAssets::get(AssetKind::Stylesheet).to_string(),
        script: BundledAssets::get(AssetKind::Script).to_string(),
    }
}

fn descriptor() -> OAuthRequestInfo {
    OAuthRequestInfo::new(json!({
        "clientId": "c1",
        "redirectUri": "https://app.example/cb",
        "state": "s-123",
        "scope": ["read", "write"],
        "codeChallenge": "abc"
    }))
}

// ============================================================================
// Composed page
// ============================================================================

#[tokio::test]
async fn test_composed_page_contains_all_fragments() {
    let source = ScriptedSource::healthy();
    let page = render_page(
        "https://foo.thoughtspot.cloud",
        &descriptor(),
        &source,
        "https://assets.example",
    )
    .await;

    assert_eq!(page.kind(), PageKind::Composed);
    for kind in AssetKind::ALL {
        assert!(page.as_str().contains(marker(kind)), "missing {kind:?}");
    }
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn test_composed_page_exposes_binding_seams() {
    let page = PageComposer::new(BundledAssets, "https://assets.example")
        .render("https://foo.thoughtspot.cloud", &descriptor())
        .await;
    let html = page.as_str();

    for id in [
        r#"id="status""#,
        r#"id="progress""#,
        r#"id="manual-entry""#,
        r#"id="token-input""#,
        r#"id="submit-token""#,
        r#"id="oauth-req-info""#,
    ] {
        assert!(html.contains(id), "missing {id}");
    }
    assert!(html.contains(r#"window.INSTANCE_URL = "https://foo.thoughtspot.cloud";"#));
    assert!(!html.contains(r#"href="oauth-callback.css""#));
    assert!(!html.contains(r#"src="oauth-callback.js""#));
}

#[tokio::test]
async fn test_instance_url_global_precedes_script() {
    let page = PageComposer::new(BundledAssets, "https://assets.example")
        .render("https://foo.thoughtspot.cloud", &descriptor())
        .await;
    let html = page.as_str();

    let global = html.find("window.INSTANCE_URL =").unwrap();
    let script = html.find(marker(AssetKind::Script)).unwrap();
    assert!(global < script);
}

#[tokio::test]
async fn test_descriptor_round_trips_through_page() {
    let page = PageComposer::new(BundledAssets, "https://assets.example")
        .render("https://x", &descriptor())
        .await;
    assert_eq!(
        extract_embedded_request_info(page.as_str()),
        Some(descriptor().to_value())
    );
}

#[tokio::test]
async fn test_descriptor_json_string_is_parsed() {
    let page = PageComposer::new(BundledAssets, "https://assets.example")
        .render_json("https://x", r#"{"clientId":"c1"}"#)
        .await;
    assert!(!page.is_fallback());
    assert_eq!(
        extract_embedded_request_info(page.as_str()),
        Some(json!({ "clientId": "c1" }))
    );
}

#[tokio::test]
async fn test_invalid_descriptor_json_yields_fallback() {
    let source = ScriptedSource::healthy();
    let page = PageComposer::new(&source, "https://assets.example")
        .render_json("https://x", "{clientId: c1")
        .await;
    assert!(page.is_fallback());
    assert!(page.as_str().contains("Invalid OAuth request info"));
    assert_eq!(source.calls(), 0);
}

#[test]
fn test_descriptor_text_is_embedded_verbatim() {
    let raw = r#"{"state":"s1","clientId":"c1","redirectUri":"https://a/cb","ratio":1.0,"n":1e2}"#;
    let info = OAuthRequestInfo::parse(raw).unwrap();
    let html = compose(&bundled_fragments(), "https://x", &info);

    let embedded = format!(r#"<script type="application/json" id="oauth-req-info">{raw}</script>"#);
    assert!(html.contains(&embedded));
}

#[tokio::test]
async fn test_render_json_keeps_key_order() {
    let raw = r#"{"z":{"b":1,"a":2},"a":[3,2,1]}"#;
    let page = PageComposer::new(BundledAssets, "https://assets.example")
        .render_json("https://x", raw)
        .await;
    assert_eq!(OAuthRequestInfo::parse(raw).unwrap().to_embedded_json(), raw);
    assert!(page.as_str().contains(raw));
}

#[test]
fn test_compose_is_deterministic() {
    let a = compose(&bundled_fragments(), "https://x", &descriptor());
    let b = compose(&bundled_fragments(), "https://x", &descriptor());
    assert_eq!(a, b);
}

// ============================================================================
// Fallback page
// ============================================================================

async fn render_with_failure(kind: AssetKind, failure: Failure) -> (String, usize) {
    let source = ScriptedSource::failing(kind, failure);
    let page = render_page("https://x", &descriptor(), &source, "https://assets.example").await;
    assert!(page.is_fallback());
    (page.into_string(), source.calls())
}

#[tokio::test]
async fn test_each_fragment_error_yields_fallback() {
    for kind in AssetKind::ALL {
        let (html, _) = render_with_failure(kind, Failure::Error("socket hang up".into())).await;

        assert!(html.contains(ERROR_TITLE));
        assert!(html.contains(ERROR_HEADING));
        assert!(html.contains(kind.file_name()), "{kind:?} not named");
        assert!(html.contains("socket hang up"));
        for other in AssetKind::ALL {
            assert!(!html.contains(marker(other)), "{other:?} leaked into fallback");
        }
    }
}

#[tokio::test]
async fn test_each_fragment_not_found_yields_fallback() {
    for kind in AssetKind::ALL {
        let (html, _) = render_with_failure(kind, Failure::Status(404)).await;
        assert!(html.contains(kind.file_name()));
        assert!(html.contains("404 Not Found"));
    }
}

#[tokio::test]
async fn test_first_failure_stops_fetching() {
    let (_, calls) = render_with_failure(AssetKind::Markup, Failure::Status(500)).await;
    assert_eq!(calls, 1);

    let (_, calls) = render_with_failure(AssetKind::Stylesheet, Failure::Status(500)).await;
    assert_eq!(calls, 2);

    let (_, calls) = render_with_failure(AssetKind::Script, Failure::Status(500)).await;
    assert_eq!(calls, 3);
}

#[tokio::test]
async fn test_rejected_fetch_message_is_shown() {
    let (html, _) = render_with_failure(AssetKind::Markup, Failure::Error("timeout".into())).await;
    assert!(html.contains("<title>Error - ThoughtSpot Authorization</title>"));
    assert!(html.contains("timeout"));
}

#[tokio::test]
async fn test_blank_failure_message_is_unknown_error() {
    let (html, _) = render_with_failure(AssetKind::Script, Failure::Error(String::new())).await;
    assert!(html.contains("Unknown error"));
}

// ============================================================================
// Properties
// ============================================================================

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "\\PC{0,16}".prop_map(Value::String),
        "[<>&/\u{2028}\u{2029}a-z]{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("\\PC{0,8}", inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn prop_descriptor_round_trips(value in arb_json()) {
        let html = compose(
            &bundled_fragments(),
            "https://foo.thoughtspot.cloud",
            &OAuthRequestInfo::new(value.clone()),
        );
        prop_assert_eq!(extract_embedded_request_info(&html), Some(value));
    }

    #[test]
    fn prop_descriptor_never_closes_script(value in arb_json()) {
        let embedded = OAuthRequestInfo::new(value).to_embedded_json();
        prop_assert!(!embedded.contains('<'));
        prop_assert!(!embedded.contains('>'));
    }
}
