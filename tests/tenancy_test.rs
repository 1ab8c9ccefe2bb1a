use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

mod common;
use common::{TestApp, names};

#[tokio::test]
async fn test_rows_of_other_tenants_are_invisible() {
    let acme = TestApp::new().await;
    let globex = acme.as_tenant(Uuid::new_v4());

    let ada = acme.create_contact("Ada Lovelace").await;
    globex.create_contact("Hank Scorpio").await;

    let listed = acme.get("/api/v1/contacts").await;
    assert_eq!(names(listed.items(), "name"), vec!["Ada Lovelace"]);
    assert_eq!(listed.content_range(), "contacts 0-0/1");

    let listed = globex.get("/api/v1/contacts").await;
    assert_eq!(names(listed.items(), "name"), vec!["Hank Scorpio"]);

    let uri = format!("/api/v1/contacts/{ada}");
    assert_eq!(globex.get(&uri).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        globex.get(&format!("{uri}?include_deleted=true")).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        globex
            .put(&uri, json!({"name": "Stolen", "version": 1}))
            .await
            .status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(globex.delete(&uri).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        globex
            .send(Method::POST, &format!("{uri}/restore"), None)
            .await
            .status,
        StatusCode::NOT_FOUND
    );

    // Bulk delete silently skips foreign ids
    let response = globex
        .send(Method::DELETE, "/api/v1/contacts", Some(json!([ada])))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.items().is_empty());

    let untouched = acme.get(&uri).await;
    assert_eq!(untouched.body["name"], "Ada Lovelace");
    assert_eq!(untouched.version(), 1);
}

#[tokio::test]
async fn test_client_cannot_choose_its_tenant() {
    let acme = TestApp::new().await;
    let globex = Uuid::new_v4();

    let created = acme
        .create(
            "contacts",
            json!({"name": "Ada Lovelace", "kind": "person", "tenant_id": globex}),
        )
        .await;
    assert!(created.body.get("tenant_id").is_none());

    assert!(acme.as_tenant(globex).get("/api/v1/contacts").await.items().is_empty());
    assert_eq!(acme.get("/api/v1/contacts").await.items().len(), 1);
}

#[tokio::test]
async fn test_relation_filters_stay_inside_the_tenant() {
    let acme = TestApp::new().await;
    let globex = acme.as_tenant(Uuid::new_v4());

    // The same tenant contact name exists in both tenants
    let acme_ada = acme.create_contact("Ada Lovelace").await;
    globex.create_contact("Ada Lovelace").await;
    acme.create(
        "properties",
        json!({
            "name": "Harbour View", "address": "Quai 1", "city": "Basel",
            "units": [{"label": "1A", "tenant_contact_id": acme_ada}]
        }),
    )
    .await;
    globex
        .create(
            "properties",
            json!({"name": "Cypress Creek", "address": "Main St 1", "city": "Springfield"}),
        )
        .await;

    let filter = json!({"units.tenant_contact.name": "Ada Lovelace"});
    let acme_hits = acme.list("properties", &filter).await;
    assert_eq!(names(acme_hits.items(), "name"), vec!["Harbour View"]);
    assert!(globex.list("properties", &filter).await.items().is_empty());

    // Expansion does not leak either
    let expanded = globex.get("/api/v1/properties?expand=units").await;
    assert!(expanded.items()[0]["units"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_children_of_another_tenant_cannot_be_adopted() {
    let acme = TestApp::new().await;
    let globex = acme.as_tenant(Uuid::new_v4());

    let foreign = globex
        .create(
            "properties",
            json!({"name": "Cypress Creek", "address": "Main St 1", "city": "Springfield", "units": [{"label": "C1"}]}),
        )
        .await;
    let foreign_unit = foreign.body["units"][0]["id"].as_str().unwrap().to_string();

    let own = acme
        .create(
            "properties",
            json!({"name": "Harbour View", "address": "Quai 1", "city": "Basel"}),
        )
        .await
        .id();
    let response = acme
        .put(
            &format!("/api/v1/properties/{own}"),
            json!({"version": 1, "units": [{"id": foreign_unit, "label": "mine now"}]}),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let still_theirs = globex.get(&format!("/api/v1/units/{foreign_unit}")).await;
    assert_eq!(still_theirs.status, StatusCode::OK);
    assert_eq!(still_theirs.body["label"], "C1");
    assert_eq!(still_theirs.body["property_id"], foreign.id().as_str());
}

#[tokio::test]
async fn test_nested_children_inherit_the_parent_tenant() {
    let acme = TestApp::new().await;
    let globex = acme.as_tenant(Uuid::new_v4());
    acme.create(
        "properties",
        json!({
            "name": "Harbour View", "address": "Quai 1", "city": "Basel",
            "units": [{"label": "1A", "tenant_id": globex.tenant}]
        }),
    )
    .await;

    assert_eq!(acme.get("/api/v1/units").await.items().len(), 1);
    assert!(globex.get("/api/v1/units").await.items().is_empty());
}

#[tokio::test]
async fn test_references_must_point_inside_the_tenant() {
    let acme = TestApp::new().await;
    let globex = acme.as_tenant(Uuid::new_v4());

    let foreign_property = globex
        .create(
            "properties",
            json!({"name": "Cypress Creek", "address": "Main St 1", "city": "Springfield"}),
        )
        .await
        .id();
    let foreign_supplier = globex.create_supplier("Globex Steel").await;
    let foreign_contact = globex.create_contact("Hank Scorpio").await;

    let response = acme
        .post(
            "/api/v1/units",
            json!({"property_id": foreign_property, "label": "1A"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = acme
        .post(
            "/api/v1/purchase_orders",
            json!({"reference": "PO-1", "supplier_id": foreign_supplier}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // A bad child reference rolls back the whole aggregate
    let response = acme
        .post(
            "/api/v1/properties",
            json!({
                "name": "Harbour View", "address": "Quai 1", "city": "Basel",
                "units": [{"label": "1A", "tenant_contact_id": foreign_contact}]
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(acme.get("/api/v1/properties").await.items().is_empty());

    let own = acme
        .create(
            "properties",
            json!({"name": "Harbour View", "address": "Quai 1", "city": "Basel", "units": [{"label": "1A"}]}),
        )
        .await;
    let unit = format!("/api/v1/units/{}", own.body["units"][0]["id"].as_str().unwrap());
    for change in [
        json!({"version": 1, "tenant_contact_id": foreign_contact}),
        json!({"version": 1, "property_id": foreign_property}),
    ] {
        let response = acme.put(&unit, change.clone()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{change}");
    }

    let unchanged = acme.get(&unit).await;
    assert_eq!(unchanged.version(), 1);
    assert_eq!(unchanged.body["property_id"], own.id().as_str());
    assert!(unchanged.body["tenant_contact_id"].is_null());

    let theirs = globex
        .get(&format!("/api/v1/properties/{foreign_property}?expand=units"))
        .await;
    assert!(theirs.body["units"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_references_to_deleted_rows_are_rejected() {
    let app = TestApp::new().await;
    let ada = app.create_contact("Ada Lovelace").await;
    let alan = app.create_contact("Alan Turing").await;
    let property = app
        .create(
            "properties",
            json!({
                "name": "Harbour View", "address": "Quai 1", "city": "Basel",
                "units": [{"label": "1A", "tenant_contact_id": alan}]
            }),
        )
        .await;
    let unit = format!(
        "/api/v1/units/{}",
        property.body["units"][0]["id"].as_str().unwrap()
    );

    for contact in [&ada, &alan] {
        let response = app.delete(&format!("/api/v1/contacts/{contact}")).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
    }

    let response = app
        .put(&unit, json!({"version": 1, "tenant_contact_id": ada}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Keeping an existing reference is not a new reference
    let response = app
        .put(
            &unit,
            json!({"version": 1, "label": "1A east", "tenant_contact_id": alan}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.version(), 2);

    let response = app
        .send(Method::POST, &format!("/api/v1/contacts/{ada}/restore"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let response = app
        .put(&unit, json!({"version": 2, "tenant_contact_id": ada}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["tenant_contact_id"], ada.as_str());
}
