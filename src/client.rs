//! REST backend client.
//!
//! `Backend` is the seam the facade and the batch entry points are written
//! against; `HttpBackend` is the reqwest implementation speaking the
//! department API's conventional REST surface.

use async_trait::async_trait;
use reqwest::{redirect, Client, Method, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

use crate::error::{DeptError, Result};
use crate::normalize;
use crate::types::{ClassRoom, EntityKind, Professor, Student};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const REDIRECT_LIMIT: usize = 10;
const POOL_IDLE_TIMEOUT_SEC: u64 = 90;
const POOL_MAX_IDLE_PER_HOST: usize = 20;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Authenticate the HOD; returns the bearer token.
    async fn login(&self, email: &str, password: &str) -> Result<String>;

    async fn students(&self) -> Result<Vec<Student>>;
    async fn student(&self, id: &str) -> Result<Option<Student>>;
    async fn create_student(&self, fields: &Map<String, Value>) -> Result<Student>;
    async fn update_student(&self, id: &str, fields: &Map<String, Value>) -> Result<Student>;
    async fn delete_student(&self, id: &str) -> Result<String>;

    async fn professors(&self) -> Result<Vec<Professor>>;
    async fn professor(&self, id: &str) -> Result<Option<Professor>>;
    async fn create_professor(&self, fields: &Map<String, Value>) -> Result<Professor>;
    async fn update_professor(&self, id: &str, fields: &Map<String, Value>) -> Result<Professor>;
    async fn delete_professor(&self, id: &str) -> Result<String>;

    async fn classes(&self) -> Result<Vec<ClassRoom>>;
    async fn class(&self, id: &str) -> Result<Option<ClassRoom>>;
    async fn create_class(&self, fields: &Map<String, Value>) -> Result<ClassRoom>;
    async fn update_class(&self, id: &str, fields: &Map<String, Value>) -> Result<ClassRoom>;
    async fn delete_class(&self, id: &str) -> Result<String>;

    /// True bulk endpoints: one request for the whole id set.
    async fn delete_students_bulk(&self, ids: &[String]) -> Result<()>;
    async fn remove_students_from_class(&self, class_id: &str, ids: &[String]) -> Result<()>;

    async fn assign_professor(&self, class_id: &str, professor_id: &str) -> Result<ClassRoom>;
    async fn add_students_to_class(&self, class_id: &str, ids: &[String]) -> Result<ClassRoom>;
}

pub struct HttpBackend {
    base: Url,
    token: Option<String>,
    http: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let mut base =
            Url::parse(base_url).map_err(|_| DeptError::InvalidUrl(base_url.into()))?;
        // Url::join drops the last path segment without this.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .gzip(true)
            .redirect(redirect::Policy::limited(REDIRECT_LIMIT))
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SEC))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build()?;
        Ok(Self { base, token, http })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|_| DeptError::InvalidUrl(format!("{}{}", self.base, path)))
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.endpoint(path)?;
        let mut req = self.http.request(method, url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| DeptError::http_error(path, &e.to_string()))?;
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(DeptError::backend(extract_error(&body, status)));
        }
        Ok(body)
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        kind: EntityKind,
    ) -> Result<Vec<T>> {
        let body = self.request(Method::GET, path, None).await?;
        Ok(parse_list(&body, kind))
    }

    async fn get_item<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        kind: EntityKind,
    ) -> Result<Option<T>> {
        let body = self.request(Method::GET, path, None).await?;
        Ok(parse_item(&body, kind))
    }

    async fn write_item<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Value,
        kind: EntityKind,
    ) -> Result<T> {
        let resp = self.request(method, path, Some(body)).await?;
        parse_item(&resp, kind).ok_or_else(|| {
            DeptError::backend(format!("response missing {} payload", kind.item_key()))
        })
    }

    async fn delete_item(&self, path: &str) -> Result<String> {
        let body = self.request(Method::DELETE, path, None).await?;
        Ok(normalize::extract_string(&body, "message").unwrap_or_else(|| "deleted".to_string()))
    }
}

/// Best-effort error text from a non-2xx response: structured body field
/// first, status line as fallback.
fn extract_error(body: &Value, status: StatusCode) -> String {
    normalize::extract_string(body, "error")
        .or_else(|| normalize::extract_string(body, "message"))
        .unwrap_or_else(|| format!("HTTP status {status}"))
}

/// Records that fail to deserialize are skipped rather than failing the
/// whole list; the backend's envelopes are not trustworthy enough for
/// all-or-nothing parsing.
fn parse_list<T: serde::de::DeserializeOwned>(body: &Value, kind: EntityKind) -> Vec<T> {
    normalize::extract_list(body, kind.list_key())
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

fn parse_item<T: serde::de::DeserializeOwned>(body: &Value, kind: EntityKind) -> Option<T> {
    normalize::extract_object(body, kind.item_key())
        .and_then(|v| serde_json::from_value(v).ok())
}

#[async_trait]
impl Backend for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> Result<String> {
        let body = self
            .request(
                Method::POST,
                "api/auth/login",
                Some(json!({ "email": email, "password": password })),
            )
            .await?;
        normalize::extract_string(&body, "token")
            .ok_or_else(|| DeptError::backend("login response missing token"))
    }

    async fn students(&self) -> Result<Vec<Student>> {
        self.get_list("api/students", EntityKind::Student).await
    }

    async fn student(&self, id: &str) -> Result<Option<Student>> {
        self.get_item(&format!("api/students/{id}"), EntityKind::Student)
            .await
    }

    async fn create_student(&self, fields: &Map<String, Value>) -> Result<Student> {
        self.write_item(
            Method::POST,
            "api/students",
            Value::Object(fields.clone()),
            EntityKind::Student,
        )
        .await
    }

    async fn update_student(&self, id: &str, fields: &Map<String, Value>) -> Result<Student> {
        self.write_item(
            Method::PUT,
            &format!("api/students/{id}"),
            Value::Object(fields.clone()),
            EntityKind::Student,
        )
        .await
    }

    async fn delete_student(&self, id: &str) -> Result<String> {
        self.delete_item(&format!("api/students/{id}")).await
    }

    async fn professors(&self) -> Result<Vec<Professor>> {
        self.get_list("api/professors", EntityKind::Professor).await
    }

    async fn professor(&self, id: &str) -> Result<Option<Professor>> {
        self.get_item(&format!("api/professors/{id}"), EntityKind::Professor)
            .await
    }

    async fn create_professor(&self, fields: &Map<String, Value>) -> Result<Professor> {
        self.write_item(
            Method::POST,
            "api/professors",
            Value::Object(fields.clone()),
            EntityKind::Professor,
        )
        .await
    }

    async fn update_professor(&self, id: &str, fields: &Map<String, Value>) -> Result<Professor> {
        self.write_item(
            Method::PUT,
            &format!("api/professors/{id}"),
            Value::Object(fields.clone()),
            EntityKind::Professor,
        )
        .await
    }

    async fn delete_professor(&self, id: &str) -> Result<String> {
        self.delete_item(&format!("api/professors/{id}")).await
    }

    async fn classes(&self) -> Result<Vec<ClassRoom>> {
        self.get_list("api/classes", EntityKind::ClassRoom).await
    }

    async fn class(&self, id: &str) -> Result<Option<ClassRoom>> {
        self.get_item(&format!("api/classes/{id}"), EntityKind::ClassRoom)
            .await
    }

    async fn create_class(&self, fields: &Map<String, Value>) -> Result<ClassRoom> {
        self.write_item(
            Method::POST,
            "api/classes",
            Value::Object(fields.clone()),
            EntityKind::ClassRoom,
        )
        .await
    }

    async fn update_class(&self, id: &str, fields: &Map<String, Value>) -> Result<ClassRoom> {
        self.write_item(
            Method::PUT,
            &format!("api/classes/{id}"),
            Value::Object(fields.clone()),
            EntityKind::ClassRoom,
        )
        .await
    }

    async fn delete_class(&self, id: &str) -> Result<String> {
        self.delete_item(&format!("api/classes/{id}")).await
    }

    async fn delete_students_bulk(&self, ids: &[String]) -> Result<()> {
        self.request(
            Method::POST,
            "api/students/bulk-delete",
            Some(json!({ "ids": ids })),
        )
        .await?;
        Ok(())
    }

    async fn remove_students_from_class(&self, class_id: &str, ids: &[String]) -> Result<()> {
        self.request(
            Method::POST,
            &format!("api/classes/{class_id}/students/remove"),
            Some(json!({ "ids": ids })),
        )
        .await?;
        Ok(())
    }

    async fn assign_professor(&self, class_id: &str, professor_id: &str) -> Result<ClassRoom> {
        self.write_item(
            Method::POST,
            &format!("api/classes/{class_id}/professor"),
            json!({ "professorId": professor_id }),
            EntityKind::ClassRoom,
        )
        .await
    }

    async fn add_students_to_class(&self, class_id: &str, ids: &[String]) -> Result<ClassRoom> {
        self.write_item(
            Method::POST,
            &format!("api/classes/{class_id}/students/add"),
            json!({ "ids": ids }),
            EntityKind::ClassRoom,
        )
        .await
    }
}
