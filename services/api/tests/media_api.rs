mod support;

use axum::http::{StatusCode, header};
use serde_json::Value;

use support::{TestApp, body_bytes, body_json, build_test_app};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

async fn upload(app: &TestApp, token: &str, caption: &str) -> Value {
    let response = app
        .post_multipart(
            "/media",
            token,
            &[
                ("caption", None, caption.as_bytes()),
                ("file", Some("image/png"), PNG),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn test_listing_requires_authentication() {
    let app = build_test_app().await;

    let response = app.get("/media", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_empty_listing_is_an_empty_array() {
    let app = build_test_app().await;
    let token = app.signup("test", "test@example.com").await;

    let response = app.get("/media", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_upload_then_list_newest_first() {
    let app = build_test_app().await;
    let token = app.signup("test", "test@example.com").await;

    let first = upload(&app, &token, "first").await;
    let second = upload(&app, &token, "second").await;
    assert_eq!(first["caption"], "first");
    assert_eq!(first["user"]["username"], "test");
    assert_eq!(first["size"], PNG.len());
    assert_eq!(
        first["url"],
        format!("/media/{}/file", first["id"].as_str().unwrap())
    );

    let listing = body_json(app.get("/media", Some(&token)).await).await;
    let items = listing.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], second["id"]);
    assert_eq!(items[1]["id"], first["id"]);

    let page = body_json(app.get("/media?limit=1&offset=1", Some(&token)).await).await;
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["id"], first["id"]);
}

#[tokio::test]
async fn test_my_media_only_lists_own_uploads() {
    let app = build_test_app().await;
    let alice = app.signup("alice", "alice@example.com").await;
    let bob = app.signup("bob", "bob@example.com").await;

    upload(&app, &alice, "from alice").await;
    upload(&app, &bob, "from bob").await;

    let mine = body_json(app.get("/me/media", Some(&alice)).await).await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["caption"], "from alice");

    let everyone = body_json(app.get("/media", Some(&alice)).await).await;
    assert_eq!(everyone.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_file_endpoint_serves_stored_bytes() {
    let app = build_test_app().await;
    let token = app.signup("test", "test@example.com").await;
    let media = upload(&app, &token, "").await;
    assert!(media["caption"].is_null());

    let url = media["url"].as_str().unwrap();
    let response = app.get(url, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(body_bytes(response).await, PNG);
}

#[tokio::test]
async fn test_unknown_media_is_not_found() {
    let app = build_test_app().await;
    let token = app.signup("test", "test@example.com").await;
    let id = uuid::Uuid::new_v4();

    let response = app.get(&format!("/media/{}", id), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get(&format!("/media/{}/file", id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejects_non_images_and_missing_files() {
    let app = build_test_app().await;
    let token = app.signup("test", "test@example.com").await;

    let response = app
        .post_multipart(
            "/media",
            &token,
            &[("file", Some("application/pdf"), b"%PDF-1.4".as_slice())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["errors"]["file"],
        "only image uploads are supported"
    );

    let response = app
        .post_multipart("/media", &token, &[("caption", None, b"no file".as_slice())])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["errors"]["file"], "file is required");
}

#[tokio::test]
async fn test_only_the_owner_can_delete() {
    let app = build_test_app().await;
    let alice = app.signup("alice", "alice@example.com").await;
    let bob = app.signup("bob", "bob@example.com").await;

    let media = upload(&app, &alice, "mine").await;
    let uri = format!("/media/{}", media["id"].as_str().unwrap());

    let response = app.delete(&uri, &bob).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.delete(&uri, &alice).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get(&uri, Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let files = std::fs::read_dir(&app.upload_dir).unwrap().count();
    assert_eq!(files, 0);
}

#[tokio::test]
async fn test_svg_upload_is_rejected() {
    let app = build_test_app().await;
    let token = app.signup("test", "test@example.com").await;
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(document.cookie)</script></svg>"#;

    let response = app
        .post_multipart("/media", &token, &[("file", Some("image/svg+xml"), svg.as_slice())])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["errors"]["file"],
        "only image uploads are supported"
    );

    let listing = body_json(app.get("/media", Some(&token)).await).await;
    assert_eq!(listing, serde_json::json!([]));
}

#[tokio::test]
async fn test_declared_type_is_replaced_by_detected_type() {
    let app = build_test_app().await;
    let token = app.signup("test", "test@example.com").await;

    let response = app
        .post_multipart("/media", &token, &[("file", Some("text/html"), PNG)])
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["content_type"], "image/png");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let app = build_test_app().await;
    let token = app.signup("test", "test@example.com").await;

    // The test config caps bodies at 64 KiB
    let mut large = PNG.to_vec();
    large.resize(96 * 1024, 0);

    let response = app
        .post_multipart("/media", &token, &[("file", Some("image/png"), large.as_slice())])
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_bad_query_string_is_a_json_error() {
    let app = build_test_app().await;
    let token = app.signup("test", "test@example.com").await;

    let response = app.get("/media?limit=abc", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = app.get("/me/media?offset=-x", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}
