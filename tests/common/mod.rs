#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use backoffice::app::build_router;
use backoffice::migration::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn id(&self) -> String {
        self.body["id"].as_str().expect("response has an id").to_string()
    }

    pub fn version(&self) -> i64 {
        self.body["version"].as_i64().expect("response has a version")
    }

    pub fn content_range(&self) -> &str {
        self.headers
            .get("content-range")
            .expect("Content-Range header")
            .to_str()
            .unwrap()
    }

    pub fn items(&self) -> &Vec<Value> {
        self.body.as_array().expect("response is an array")
    }
}

/// The application plus the tenant its requests run as.
#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub tenant: Uuid,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = setup_test_db()
            .await
            .expect("Failed to setup test database");
        Self {
            router: build_router(db.clone()),
            db,
            tenant: Uuid::new_v4(),
        }
    }

    /// Same database, different tenant.
    pub fn as_tenant(&self, tenant: Uuid) -> Self {
        Self {
            tenant,
            ..self.clone()
        }
    }

    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        tenant: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(tenant) = tenant {
            request = request.header("X-Tenant-ID", tenant);
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let tenant = self.tenant.to_string();
        self.send_raw(method, uri, Some(&tenant), body).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    pub async fn create(&self, collection: &str, body: Value) -> TestResponse {
        let response = self.post(&format!("/api/v1/{collection}"), body).await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "creating {collection} failed: {}",
            response.body
        );
        response
    }

    pub async fn create_contact(&self, name: &str) -> String {
        self.create(
            "contacts",
            json!({"name": name, "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")), "kind": "tenant"}),
        )
        .await
        .id()
    }

    pub async fn create_supplier(&self, name: &str) -> String {
        self.create("contacts", json!({"name": name, "kind": "supplier", "company": name}))
            .await
            .id()
    }

    pub async fn list(&self, collection: &str, filter: &Value) -> TestResponse {
        self.get(&filter_uri(&format!("/api/v1/{collection}"), filter))
            .await
    }
}

/// `base?filter=<url-encoded JSON>`
pub fn filter_uri(base: &str, filter: &Value) -> String {
    let encoded = url_escape::encode_component(&filter.to_string()).to_string();
    format!("{base}?filter={encoded}")
}

pub fn names(items: &[Value], field: &str) -> Vec<String> {
    let mut names: Vec<String> = items
        .iter()
        .map(|item| item[field].as_str().unwrap_or_default().to_string())
        .collect();
    names.sort();
    names
}
