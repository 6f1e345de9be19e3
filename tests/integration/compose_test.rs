//! Integration tests for page composition against real sources.
//!
//! These tests verify:
//! - Fragments fetched over HTTP from a mock origin
//! - Fragments read from a directory on disk
//! - The caching wrapper only remembers successes
//! - Settings select the right source

use std::time::Duration;

use oauth_token_page::assets::{
    AssetKind, AssetSource, BundledAssets, CachedAssetSource, DirAssetSource, HttpAssetSource,
};
use oauth_token_page::page::extract_embedded_request_info;
use oauth_token_page::{render_page, OAuthRequestInfo, PageComposer, PageConfig};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{marker, AssetDir};

fn descriptor() -> OAuthRequestInfo {
    OAuthRequestInfo::new(json!({ "clientId": "c1", "state": "s-1" }))
}

async fn serve_fragment(server: &MockServer, kind: AssetKind, status: u16) {
    let body = if status == 200 {
        BundledAssets::get(kind).to_string()
    } else {
        String::from("nope")
    };
    Mock::given(method("GET"))
        .and(path(format!("/{}", kind.file_name())))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn http_source() -> HttpAssetSource {
    HttpAssetSource::new(Duration::from_secs(5)).unwrap()
}

// ============================================================================
// HTTP origin
// ============================================================================

#[tokio::test]
async fn test_http_origin_composes_page() {
    let server = MockServer::start().await;
    for kind in AssetKind::ALL {
        serve_fragment(&server, kind, 200).await;
    }

    let page = render_page(
        "https://foo.thoughtspot.cloud",
        &descriptor(),
        http_source(),
        &server.uri(),
    )
    .await;

    assert!(!page.is_fallback());
    for kind in AssetKind::ALL {
        assert!(page.as_str().contains(marker(kind)));
    }
    assert_eq!(
        extract_embedded_request_info(page.as_str()),
        Some(descriptor().to_value())
    );
}

#[tokio::test]
async fn test_http_origin_trailing_slash() {
    let server = MockServer::start().await;
    for kind in AssetKind::ALL {
        serve_fragment(&server, kind, 200).await;
    }

    let origin = format!("{}/", server.uri());
    let page = PageComposer::new(http_source(), origin)
        .render("https://x", &descriptor())
        .await;
    assert!(!page.is_fallback());
}

#[tokio::test]
async fn test_http_missing_stylesheet_yields_fallback() {
    let server = MockServer::start().await;
    serve_fragment(&server, AssetKind::Markup, 200).await;
    serve_fragment(&server, AssetKind::Stylesheet, 404).await;
    serve_fragment(&server, AssetKind::Script, 200).await;

    let page = render_page("https://x", &descriptor(), http_source(), &server.uri()).await;

    assert!(page.is_fallback());
    assert!(page.as_str().contains("oauth-callback.css"));
    assert!(page.as_str().contains("404 Not Found"));
    assert!(!page.as_str().contains(marker(AssetKind::Markup)));
}

#[tokio::test]
async fn test_unreachable_origin_yields_fallback() {
    // Nothing listens on port 9 locally.
    let page = render_page(
        "https://x",
        &descriptor(),
        http_source(),
        "http://127.0.0.1:9",
    )
    .await;

    assert!(page.is_fallback());
    assert!(page.as_str().contains("oauth-callback.html"));
    assert!(page.as_str().contains(r#"id="error-message""#));
}

// ============================================================================
// Directory source
// ============================================================================

#[tokio::test]
async fn test_directory_source_composes_page() {
    let dir = AssetDir::with_bundled();
    let page = render_page(
        "https://x",
        &descriptor(),
        DirAssetSource::new(dir.path()),
        "https://ignored.example",
    )
    .await;
    assert!(!page.is_fallback());
}

#[tokio::test]
async fn test_directory_source_picks_up_edits() {
    let dir = AssetDir::with_bundled();
    dir.write(AssetKind::Stylesheet, "body { color: rebeccapurple; }");

    let page = render_page(
        "https://x",
        &descriptor(),
        DirAssetSource::new(dir.path()),
        "https://ignored.example",
    )
    .await;
    assert!(page.as_str().contains("rebeccapurple"));
    assert!(!page.as_str().contains(marker(AssetKind::Stylesheet)));
}

#[tokio::test]
async fn test_directory_missing_script_yields_fallback() {
    let dir = AssetDir::with_bundled();
    dir.remove(AssetKind::Script);

    let page = render_page(
        "https://x",
        &descriptor(),
        DirAssetSource::new(dir.path()),
        "https://ignored.example",
    )
    .await;
    assert!(page.is_fallback());
    assert!(page.as_str().contains("oauth-callback.js"));
}

// ============================================================================
// Caching
// ============================================================================

#[tokio::test]
async fn test_cache_serves_repeat_renders() {
    let server = MockServer::start().await;
    for kind in AssetKind::ALL {
        Mock::given(method("GET"))
            .and(path(format!("/{}", kind.file_name())))
            .respond_with(ResponseTemplate::new(200).set_body_string(BundledAssets::get(kind)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let source = CachedAssetSource::new(http_source());
    let composer = PageComposer::new(&source, server.uri());
    let first = composer.render("https://x", &descriptor()).await;
    let second = composer.render("https://x", &descriptor()).await;

    assert_eq!(first, second);
    assert_eq!(source.len().await, 3);
}

#[tokio::test]
async fn test_cache_skips_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth-callback.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let source = CachedAssetSource::new(http_source());
    let url = AssetKind::Markup.url(&server.uri());
    assert_eq!(source.fetch(&url).await.unwrap().status, 503);
    assert_eq!(source.fetch(&url).await.unwrap().status, 503);
    assert!(source.is_empty().await);
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
async fn test_config_bundled_composer() {
    let config = PageConfig::from_toml_str("bundled_assets = true").unwrap();
    let page = config
        .composer()
        .unwrap()
        .render_json("https://x", r#"{"clientId":"c1"}"#)
        .await;
    assert!(!page.is_fallback());
}

#[tokio::test]
async fn test_config_directory_composer() {
    let dir = AssetDir::with_bundled();
    let config = PageConfig {
        asset_dir: Some(dir.path().to_path_buf()),
        ..PageConfig::default()
    };
    let page = config
        .composer()
        .unwrap()
        .render("https://x", &descriptor())
        .await;
    assert!(!page.is_fallback());
}
