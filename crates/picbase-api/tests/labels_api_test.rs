//! Label listing, renaming, removal and statistics over HTTP.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::spawn;

#[tokio::test]
async fn test_list_labels_with_counts() {
    let app = spawn().await;
    let token = app.user_token("ada").await;
    let other = app.user_token("bob").await;

    app.create_entry(&token, &[("categories", "Nature"), ("tags", "sunset,sky")])
        .await;
    app.create_entry(&token, &[("categories", "nature,travel"), ("tags", "sky")])
        .await;
    app.create_entry(&other, &[("tags", "private")]).await;

    let categories = app.get("/api/v1/categories", Some(&token)).await.json();
    assert_eq!(
        categories,
        json!([{"name": "nature", "count": 2}, {"name": "travel", "count": 1}])
    );

    let tags = app.get("/api/v1/tags", Some(&token)).await.json();
    assert_eq!(
        tags,
        json!([{"name": "sky", "count": 2}, {"name": "sunset", "count": 1}])
    );
}

#[tokio::test]
async fn test_rename_and_remove_tag() {
    let app = spawn().await;
    let token = app.user_token("ada").await;

    app.create_entry(&token, &[("tags", "sunset")]).await;
    app.create_entry(&token, &[("tags", "dusk,sunset")]).await;

    let res = app
        .patch_json("/api/v1/tags/dusk", &token, json!({"name": "Sunset"}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["affected"], 1);

    let tags = app.get("/api/v1/tags", Some(&token)).await.json();
    assert_eq!(tags, json!([{"name": "sunset", "count": 2}]));

    let missing = app
        .patch_json("/api/v1/tags/ocean", &token, json!({"name": "sea"}))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let blank = app
        .patch_json("/api/v1/tags/sunset", &token, json!({"name": "  "}))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let removed = app.delete("/api/v1/tags/sunset", &token).await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.json()["affected"], 2);
    assert_eq!(app.get("/api/v1/tags", Some(&token)).await.json(), json!([]));
}

#[tokio::test]
async fn test_rename_category_is_owner_scoped() {
    let app = spawn().await;
    let ada = app.user_token("ada").await;
    let bob = app.user_token("bob").await;

    app.create_entry(&ada, &[("categories", "pets")]).await;
    app.create_entry(&bob, &[("categories", "pets")]).await;

    let res = app
        .patch_json("/api/v1/categories/pets", &ada, json!({"name": "animals"}))
        .await;
    assert_eq!(res.json()["affected"], 1);

    let bobs = app.get("/api/v1/categories", Some(&bob)).await.json();
    assert_eq!(bobs, json!([{"name": "pets", "count": 1}]));
}

#[tokio::test]
async fn test_stats() {
    let app = spawn().await;
    let token = app.user_token("ada").await;

    let empty = app.get("/api/v1/stats", Some(&token)).await.json();
    assert_eq!(empty["total_entries"], 0);
    assert_eq!(empty["total_bytes"], 0);
    assert_eq!(empty["last_upload"], json!(null));

    let first = app.create_entry(&token, &[("favorite", "true")]).await;
    let second = app.create_entry(&token, &[("archived", "true")]).await;

    let stats = app.get("/api/v1/stats", Some(&token)).await.json();
    assert_eq!(stats["total_entries"], 2);
    assert_eq!(stats["favorites"], 1);
    assert_eq!(stats["archived"], 1);
    assert_eq!(
        stats["total_bytes"].as_i64().unwrap(),
        first["size_bytes"].as_i64().unwrap() + second["size_bytes"].as_i64().unwrap()
    );
    assert_eq!(stats["last_upload"], second["created_at"]);
}
