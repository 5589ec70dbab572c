//! End-to-end tests against a running server.

#![allow(clippy::unwrap_used)]

mod common;

use pretty_assertions::assert_eq;
use slpk_server::{AppState, ArchiveCatalog, Layout};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use common::{city_members, gzip, write_archive};

async fn start_server(root: &Path, layout: Layout) -> SocketAddr {
    let catalog = Arc::new(ArchiveCatalog::new(root, layout));
    catalog.refresh().unwrap();
    let app = slpk_server::http::create_router(Arc::new(AppState::new(catalog)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn flat_server() -> (TempDir, SocketAddr) {
    let dir = tempfile::tempdir().unwrap();
    write_archive(&dir.path().join("city.slpk"), &city_members());
    let addr = start_server(dir.path(), Layout::Flat).await;
    (dir, addr)
}

async fn get(addr: SocketAddr, path: &str) -> reqwest::Response {
    reqwest::get(format!("http://{addr}{path}")).await.unwrap()
}

#[tokio::test]
async fn test_layer_endpoint() {
    let (_dir, addr) = flat_server().await;
    let response = get(addr, "/city.slpk/SceneServer/layers/0/").await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    assert_eq!(response.text().await.unwrap(), r#"{"id":0}"#);
}

#[tokio::test]
async fn test_service_info_endpoint() {
    let (_dir, addr) = flat_server().await;
    let body: serde_json::Value = get(addr, "/city.slpk/SceneServer")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["name"], "city.slpk");
    assert_eq!(body["currentVersion"], 10.6);
    assert_eq!(body["layers"][0]["id"], 0);
}

#[tokio::test]
async fn test_geometry_is_sent_gzip_encoded() {
    let (_dir, addr) = flat_server().await;
    let response = get(addr, "/city.slpk/SceneServer/layers/0/nodes/0/geometries/0").await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()["content-encoding"].to_str().unwrap(),
        "gzip"
    );
    assert_eq!(
        response.bytes().await.unwrap().to_vec(),
        gzip(b"\x01\x02\x03geometry")
    );
}

#[tokio::test]
async fn test_texture_endpoint() {
    let (_dir, addr) = flat_server().await;
    let response = get(addr, "/city.slpk/SceneServer/layers/0/nodes/1/textures/0_0").await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"].to_str().unwrap(),
        "attachment; filename=\"0_0.jpg\""
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"BIN-node-1");

    let missing = get(addr, "/city.slpk/SceneServer/layers/0/nodes/2/textures/0_0").await;
    assert_eq!(missing.status(), reqwest::StatusCode::OK);
    assert!(missing.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_not_found_responses() {
    let (_dir, addr) = flat_server().await;

    let cases = [
        "/other.slpk/SceneServer/layers/0",
        "/city.slpk/SceneServer/layers/0/nodes/9",
        "/city.slpk/SceneServer/layers/0/bogus",
        "/other.slpk/FeatureServer",
    ];
    for path in cases {
        assert_eq!(
            get(addr, path).await.status(),
            reqwest::StatusCode::NOT_FOUND,
            "{path}"
        );
    }
}

#[tokio::test]
async fn test_feature_server_is_empty() {
    let (_dir, addr) = flat_server().await;
    let response = get(addr, "/city.slpk/FeatureServer/").await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "[]");
}

#[tokio::test]
async fn test_listing_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(&dir.path().join("north/slpk/city.slpk"), &city_members());
    let addr = start_server(dir.path(), Layout::Collections).await;

    let listing: serde_json::Value = get(addr, "/").await.json().await.unwrap();
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["collection"], "north");
    assert_eq!(listing[0]["archive"], "city.slpk");
    assert_eq!(listing[0]["layer"], "/north/city.slpk/SceneServer/layers/0");

    write_archive(&dir.path().join("south/slpk/harbor.slpk"), &city_members());
    assert_eq!(
        get(addr, "/south/harbor.slpk/SceneServer/layers/0")
            .await
            .status(),
        reqwest::StatusCode::NOT_FOUND
    );

    let report: serde_json::Value = get(addr, "/reload").await.json().await.unwrap();
    assert_eq!(report["archives"], 2);
    assert_eq!(report["failed"].as_array().unwrap().len(), 0);

    let response = get(addr, "/south/harbor.slpk/SceneServer/layers/0").await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), r#"{"id":0}"#);
}
