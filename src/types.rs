use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three record kinds the console manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Student,
    Professor,
    ClassRoom,
}

impl EntityKind {
    /// Key some endpoints nest a list payload under instead of `data`.
    pub fn list_key(&self) -> &'static str {
        match self {
            EntityKind::Student => "students",
            EntityKind::Professor => "professors",
            EntityKind::ClassRoom => "classes",
        }
    }

    /// Key some endpoints nest a single record under instead of `data`.
    pub fn item_key(&self) -> &'static str {
        match self {
            EntityKind::Student => "student",
            EntityKind::Professor => "professor",
            EntityKind::ClassRoom => "class",
        }
    }
}

/* ------------ backend records ------------
The backend serializes records in camelCase and ids as `_id`; fields missing
from a given endpoint's payload default rather than failing the whole list. */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Student {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub registration_no: Option<String>,
    pub semester: Option<u32>,
    pub division: Option<String>,
    pub class_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Professor {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassRoom {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub semester: Option<u32>,
    pub division: Option<String>,
    pub professor_id: Option<String>,
    pub student_ids: Vec<String>,
}

/// Stored login state for the HOD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub email: String,
    pub logged_in_at: DateTime<Utc>,
}

/* ------------ batch reporting ------------ */

/// One id that could not be processed, with the best error text we could
/// extract for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of a batch: every requested id lands in exactly one of the two
/// lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BatchReport {
    pub success: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.success.len() + self.failed.len()
    }

    pub fn is_full_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Progress tick emitted once per settled item. `done` only ever counts up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/* ------------ CLI envelope ------------ */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}
impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
