use std::fs;

use axum::http::StatusCode;

use super::harness::{
    DATASET_FEED, TestHarness, decode_json, delete_request, get_request, multipart_request,
};

#[tokio::test]
async fn upload_stores_a_timestamped_copy() {
    let harness = TestHarness::setup();
    let cookie = harness.login_admin().await;

    let response = harness
        .send(multipart_request(
            "/api/admin/upload",
            &cookie,
            "july_feed.json",
            DATASET_FEED,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = decode_json(response).await;
    let stored_as = body["stored_as"].as_str().expect("stored name");
    assert!(stored_as.ends_with("_july_feed.json"), "got: {stored_as}");
    assert_eq!(stored_as.len(), 14 + "_july_feed.json".len());
    assert!(stored_as[..14].chars().all(|ch| ch.is_ascii_digit()));
    assert_eq!(body["routes"], 2);

    let listing = harness
        .send(get_request("/api/admin/files", Some(&cookie)))
        .await;
    let files: Vec<serde_json::Value> = decode_json(listing).await;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], stored_as);
    assert!(files[0]["size_bytes"].as_u64().expect("size") > 0);
}

#[tokio::test]
async fn upload_rejects_wrong_extension_and_broken_json() {
    let harness = TestHarness::setup();
    let cookie = harness.login_admin().await;

    let response = harness
        .send(multipart_request(
            "/api/admin/upload",
            &cookie,
            "feed.txt",
            "[]",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload: serde_json::Value = decode_json(response).await;
    assert_eq!(payload["code"], "VALIDATION_FAILED");

    let response = harness
        .send(multipart_request(
            "/api/admin/upload",
            &cookie,
            "broken.json",
            "{not json",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload: serde_json::Value = decode_json(response).await;
    assert_eq!(payload["code"], "INVALID_DATASET");

    // Nothing was written for either rejected upload.
    assert!(!harness.update_dir().exists());
}

#[tokio::test]
async fn upload_ignores_directory_components_in_the_name() {
    let harness = TestHarness::setup();
    let cookie = harness.login_admin().await;

    let response = harness
        .send(multipart_request(
            "/api/admin/upload",
            &cookie,
            "../../evil.json",
            "[]",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = decode_json(response).await;
    let stored_as = body["stored_as"].as_str().expect("stored name");
    assert!(stored_as.ends_with("_evil.json"));
    assert!(!stored_as.contains(".."));

    let entries: Vec<_> = fs::read_dir(harness.update_dir())
        .expect("updates dir")
        .collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn delete_refuses_traversal_and_reports_missing_files() {
    let harness = TestHarness::setup();
    let cookie = harness.login_admin().await;
    harness.seed_update_file("keep.json", "[]");

    let response = harness
        .send(delete_request("/api/admin/files/feed..json", &cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload: serde_json::Value = decode_json(response).await;
    assert_eq!(payload["code"], "PATH_TRAVERSAL");

    let response = harness
        .send(delete_request("/api/admin/files/ghost.json", &cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = harness
        .send(delete_request("/api/admin/files/keep.json", &cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!harness.update_dir().join("keep.json").exists());

    let listing = harness
        .send(get_request("/api/admin/files", Some(&cookie)))
        .await;
    let files: Vec<serde_json::Value> = decode_json(listing).await;
    assert!(files.is_empty());
}

#[tokio::test]
async fn listing_shows_only_json_files_newest_first() {
    let harness = TestHarness::setup();
    let cookie = harness.login_admin().await;
    harness.seed_update_file("first.json", "[]");
    harness.seed_update_file("second.json", "[]");
    harness.seed_update_file("notes.txt", "not a feed");

    let listing = harness
        .send(get_request("/api/admin/files", Some(&cookie)))
        .await;
    assert_eq!(listing.status(), StatusCode::OK);
    let files: Vec<serde_json::Value> = decode_json(listing).await;
    let names: Vec<&str> = files
        .iter()
        .filter_map(|file| file["name"].as_str())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(!names.contains(&"notes.txt"));

    let anonymous = harness.send(get_request("/api/admin/files", None)).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}
