use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{TestApp, names};

#[tokio::test]
async fn test_soft_deleted_rows_are_hidden_but_kept() {
    let app = TestApp::new().await;
    let ada = app.create_contact("Ada Lovelace").await;
    app.create_contact("Alan Turing").await;

    let response = app.delete(&format!("/api/v1/contacts/{ada}")).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let visible = app.get("/api/v1/contacts").await;
    assert_eq!(names(visible.items(), "name"), vec!["Alan Turing"]);
    assert_eq!(visible.content_range(), "contacts 0-0/1");

    let all = app.get("/api/v1/contacts?include_deleted=true").await;
    assert_eq!(all.items().len(), 2);
    let deleted = all
        .items()
        .iter()
        .find(|c| c["id"] == ada.as_str())
        .unwrap();
    assert!(deleted["deleted_at"].is_string());
    // Deleting bumps the version
    assert_eq!(deleted["version"], 2);

    let direct = app
        .get(&format!("/api/v1/contacts/{ada}?include_deleted=true"))
        .await;
    assert_eq!(direct.status, StatusCode::OK);
}

#[tokio::test]
async fn test_soft_deleted_rows_cannot_be_updated() {
    let app = TestApp::new().await;
    let ada = app.create_contact("Ada Lovelace").await;
    app.delete(&format!("/api/v1/contacts/{ada}")).await;

    let response = app
        .put(
            &format!("/api/v1/contacts/{ada}"),
            json!({"name": "Ada King", "version": 2}),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_restore() {
    let app = TestApp::new().await;
    let ada = app.create_contact("Ada Lovelace").await;
    app.delete(&format!("/api/v1/contacts/{ada}")).await;

    let restored = app
        .send(
            axum::http::Method::POST,
            &format!("/api/v1/contacts/{ada}/restore"),
            None,
        )
        .await;
    assert_eq!(restored.status, StatusCode::OK, "{}", restored.body);
    assert!(restored.body["deleted_at"].is_null());
    assert_eq!(restored.version(), 3);

    let visible = app.get("/api/v1/contacts").await;
    assert_eq!(visible.items().len(), 1);

    // Restoring a live record is a 404
    let again = app
        .send(
            axum::http::Method::POST,
            &format!("/api/v1/contacts/{ada}/restore"),
            None,
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hard_deleted_resources_cannot_be_restored() {
    let app = TestApp::new().await;
    let supplier = app.create_supplier("Glass Ltd").await;
    let order = app
        .create(
            "purchase_orders",
            json!({"reference": "PO-9", "supplier_id": supplier}),
        )
        .await
        .id();
    let line = app
        .create(
            "order_lines",
            json!({"purchase_order_id": order, "description": "Panes"}),
        )
        .await
        .id();

    let response = app.delete(&format!("/api/v1/order_lines/{line}")).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let gone = app
        .get(&format!("/api/v1/order_lines/{line}?include_deleted=true"))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let restore = app
        .send(
            axum::http::Method::POST,
            &format!("/api/v1/order_lines/{line}/restore"),
            None,
        )
        .await;
    assert_eq!(restore.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_soft_deleted_related_rows_are_not_matched_by_filters() {
    let app = TestApp::new().await;
    let ada = app.create_contact("Ada Lovelace").await;
    let property = app
        .create(
            "properties",
            json!({
                "name": "Harbour View", "address": "Quai 1", "city": "Basel",
                "units": [{"label": "1A", "tenant_contact_id": ada}]
            }),
        )
        .await
        .id();

    let filter = json!({"units.tenant_contact.name": "Ada Lovelace"});
    assert_eq!(app.list("properties", &filter).await.items().len(), 1);

    app.delete(&format!("/api/v1/contacts/{ada}")).await;
    assert!(app.list("properties", &filter).await.items().is_empty());

    // The property itself is still there
    let response = app.get(&format!("/api/v1/properties/{property}")).await;
    assert_eq!(response.status, StatusCode::OK);
}
