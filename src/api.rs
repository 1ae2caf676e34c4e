use chrono::Utc;
use serde_json::{Map, Value};
use std::time::Instant;

use crate::batch::{self, ProgressFn, DEFAULT_CONCURRENCY};
use crate::client::Backend;
use crate::error::{DeptError, Result};
use crate::log::ActivityLogger;
use crate::session::SessionStore;
use crate::types::*;

// A logger that cannot be constructed degrades to a no-op, and every call
// site discards the write Result: operations never fail because the audit
// log did.
fn log_info(entity: Option<&str>, event: &str, details: Option<&str>) -> Result<()> {
    match ActivityLogger::new() {
        Ok(logger) => logger.info(entity, event, details),
        Err(_) => Ok(()),
    }
}

fn log_error(entity: Option<&str>, event: &str, details: Option<&str>) -> Result<()> {
    match ActivityLogger::new() {
        Ok(logger) => logger.error(entity, event, details),
        Err(_) => Ok(()),
    }
}

fn finish_logged<T>(entity: &str, event: &str, start: Instant, result: Result<T>) -> Result<T> {
    let ms = start.elapsed().as_millis();
    match &result {
        Ok(_) => {
            let _ = log_info(Some(entity), event, Some(&format!("succeeded in {ms}ms")));
        }
        Err(e) => {
            let _ = log_error(Some(entity), event, Some(&format!("failed in {ms}ms: {e}")));
        }
    }
    result
}

fn finish_batch_logged(
    entity: &str,
    event: &str,
    start: Instant,
    result: Result<BatchReport>,
) -> Result<BatchReport> {
    let ms = start.elapsed().as_millis();
    match &result {
        Ok(report) => {
            let details = format!(
                "{} ok, {} failed in {ms}ms",
                report.success.len(),
                report.failed.len()
            );
            if report.is_full_success() {
                let _ = log_info(Some(entity), event, Some(&details));
            } else {
                let _ = log_error(Some(entity), event, Some(&details));
            }
        }
        Err(e) => {
            let _ = log_error(Some(entity), event, Some(&format!("failed in {ms}ms: {e}")));
        }
    }
    result
}

/* ------------ batch entry points ------------ */

/// Options shared by the batch entry points.
pub struct BatchOptions<'a> {
    pub concurrency: usize,
    pub on_progress: Option<&'a ProgressFn>,
}

impl Default for BatchOptions<'_> {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            on_progress: None,
        }
    }
}

/// Update many students with at most `opts.concurrency` requests in flight.
///
/// `updates` is sanitized against the allow-list first; a batch whose
/// sanitized update is empty is rejected before any network call.
pub async fn student_update_many<B: Backend>(
    backend: &B,
    ids: &[String],
    updates: &Map<String, Value>,
    opts: BatchOptions<'_>,
) -> Result<BatchReport> {
    let start = Instant::now();
    let fields = batch::sanitize_update(updates);
    if fields.is_empty() {
        let _ = log_error(
            Some("student"),
            "update_many",
            Some("rejected: no valid fields to update"),
        );
        return Err(DeptError::validation("no valid fields to update"));
    }
    let result = batch::run_bounded(ids, opts.concurrency, opts.on_progress, |id| {
        let fields = fields.clone();
        async move { backend.update_student(&id, &fields).await.map(|_| ()) }
    })
    .await;
    finish_batch_logged("student", "update_many", start, result)
}

/// Delete many students through the backend's bulk endpoint (one call).
pub async fn student_delete_many<B: Backend>(
    backend: &B,
    ids: &[String],
    opts: BatchOptions<'_>,
) -> Result<BatchReport> {
    let start = Instant::now();
    let result = batch::run_bulk(ids, opts.on_progress, |batch_ids| async move {
        backend.delete_students_bulk(&batch_ids).await
    })
    .await;
    finish_batch_logged("student", "delete_many", start, result)
}

/// Remove many students from a class through the bulk endpoint (one call).
pub async fn class_remove_students<B: Backend>(
    backend: &B,
    class_id: &str,
    ids: &[String],
    opts: BatchOptions<'_>,
) -> Result<BatchReport> {
    let start = Instant::now();
    let result = batch::run_bulk(ids, opts.on_progress, |batch_ids| async move {
        backend
            .remove_students_from_class(class_id, &batch_ids)
            .await
    })
    .await;
    finish_batch_logged("class", "remove_students", start, result)
}

/* ------------ auth ------------ */

pub async fn login<B: Backend, S: SessionStore>(
    backend: &B,
    store: &S,
    email: &str,
    password: &str,
) -> Result<AuthSession> {
    let start = Instant::now();
    let result = async {
        let token = backend.login(email, password).await?;
        let session = AuthSession {
            token,
            email: email.to_string(),
            logged_in_at: Utc::now(),
        };
        store.set_session(&session)?;
        Ok(session)
    }
    .await;
    finish_logged("hod", "login", start, result)
}

pub fn logout<S: SessionStore>(store: &S) -> Result<()> {
    let start = Instant::now();
    let result = store.clear_session();
    finish_logged("hod", "logout", start, result)
}

pub fn whoami<S: SessionStore>(store: &S) -> Result<AuthSession> {
    store.session()?.ok_or(DeptError::NotLoggedIn)
}

/* ------------ students ------------ */

pub async fn students<B: Backend>(backend: &B, filter: &StudentFilter) -> Result<Vec<Student>> {
    Ok(filter_students(backend.students().await?, filter))
}

pub async fn student<B: Backend>(backend: &B, id: &str) -> Result<Option<Student>> {
    backend.student(id).await
}

pub async fn student_create<B: Backend>(
    backend: &B,
    fields: &Map<String, Value>,
) -> Result<Student> {
    let start = Instant::now();
    let result = backend.create_student(fields).await;
    finish_logged("student", "create", start, result)
}

pub async fn student_update<B: Backend>(
    backend: &B,
    id: &str,
    fields: &Map<String, Value>,
) -> Result<Student> {
    let start = Instant::now();
    if fields.is_empty() {
        return Err(DeptError::validation("no fields to update"));
    }
    let result = backend.update_student(id, fields).await;
    finish_logged("student", "update", start, result)
}

pub async fn student_delete<B: Backend>(backend: &B, id: &str) -> Result<String> {
    let start = Instant::now();
    let result = backend.delete_student(id).await;
    finish_logged("student", "delete", start, result)
}

/* ------------ professors ------------ */

pub async fn professors<B: Backend>(backend: &B) -> Result<Vec<Professor>> {
    backend.professors().await
}

pub async fn professor<B: Backend>(backend: &B, id: &str) -> Result<Option<Professor>> {
    backend.professor(id).await
}

pub async fn professor_create<B: Backend>(
    backend: &B,
    fields: &Map<String, Value>,
) -> Result<Professor> {
    let start = Instant::now();
    let result = backend.create_professor(fields).await;
    finish_logged("professor", "create", start, result)
}

pub async fn professor_update<B: Backend>(
    backend: &B,
    id: &str,
    fields: &Map<String, Value>,
) -> Result<Professor> {
    let start = Instant::now();
    if fields.is_empty() {
        return Err(DeptError::validation("no fields to update"));
    }
    let result = backend.update_professor(id, fields).await;
    finish_logged("professor", "update", start, result)
}

pub async fn professor_delete<B: Backend>(backend: &B, id: &str) -> Result<String> {
    let start = Instant::now();
    let result = backend.delete_professor(id).await;
    finish_logged("professor", "delete", start, result)
}

/* ------------ classes ------------ */

pub async fn classes<B: Backend>(backend: &B) -> Result<Vec<ClassRoom>> {
    backend.classes().await
}

pub async fn class<B: Backend>(backend: &B, id: &str) -> Result<Option<ClassRoom>> {
    backend.class(id).await
}

pub async fn class_create<B: Backend>(
    backend: &B,
    fields: &Map<String, Value>,
) -> Result<ClassRoom> {
    let start = Instant::now();
    let result = backend.create_class(fields).await;
    finish_logged("class", "create", start, result)
}

pub async fn class_update<B: Backend>(
    backend: &B,
    id: &str,
    fields: &Map<String, Value>,
) -> Result<ClassRoom> {
    let start = Instant::now();
    if fields.is_empty() {
        return Err(DeptError::validation("no fields to update"));
    }
    let result = backend.update_class(id, fields).await;
    finish_logged("class", "update", start, result)
}

pub async fn class_delete<B: Backend>(backend: &B, id: &str) -> Result<String> {
    let start = Instant::now();
    let result = backend.delete_class(id).await;
    finish_logged("class", "delete", start, result)
}

pub async fn class_assign_professor<B: Backend>(
    backend: &B,
    class_id: &str,
    professor_id: &str,
) -> Result<ClassRoom> {
    let start = Instant::now();
    let result = backend.assign_professor(class_id, professor_id).await;
    finish_logged("class", "assign_professor", start, result)
}

pub async fn class_add_students<B: Backend>(
    backend: &B,
    class_id: &str,
    ids: &[String],
) -> Result<ClassRoom> {
    let start = Instant::now();
    let deduped = batch::dedupe(ids);
    if deduped.is_empty() {
        return Err(DeptError::validation("no ids to process"));
    }
    let result = backend.add_students_to_class(class_id, &deduped).await;
    finish_logged("class", "add_students", start, result)
}

/* ------------ client-side list plumbing ------------ */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentSort {
    Name,
    Semester,
}

/// Filter/sort applied to an already-fetched student list.
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub semester: Option<u32>,
    pub division: Option<String>,
    pub name: Option<String>,
    pub sort: Option<StudentSort>,
}

pub fn filter_students(mut students: Vec<Student>, filter: &StudentFilter) -> Vec<Student> {
    students.retain(|s| {
        filter.semester.map_or(true, |sem| s.semester == Some(sem))
            && filter.division.as_deref().map_or(true, |d| {
                s.division
                    .as_deref()
                    .map_or(false, |sd| sd.eq_ignore_ascii_case(d))
            })
            && filter.name.as_deref().map_or(true, |n| {
                s.name.to_lowercase().contains(&n.to_lowercase())
            })
    });
    match filter.sort {
        Some(StudentSort::Name) => {
            students.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        }
        Some(StudentSort::Semester) => students.sort_by_key(|s| s.semester.unwrap_or(0)),
        None => {}
    }
    students
}
