//! Tests

#[cfg(test)]
mod tests {
    use crate::api::{self, BatchOptions, StudentFilter, StudentSort};
    use crate::client::Backend;
    use crate::error::{DeptError, Result};
    use crate::session::SessionStore;
    use crate::types::*;
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory backend: records calls, fails the ids listed in `fail_ids`,
    /// and fails bulk calls when `bulk_error` is set.
    #[derive(Default)]
    struct FakeBackend {
        fail_ids: HashSet<String>,
        bulk_error: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn failing(ids: &[&str]) -> Self {
            Self {
                fail_ids: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn login(&self, email: &str, _password: &str) -> Result<String> {
            self.record(format!("login {email}"));
            Ok("tok-1".to_string())
        }

        async fn students(&self) -> Result<Vec<Student>> {
            unimplemented!()
        }
        async fn student(&self, _id: &str) -> Result<Option<Student>> {
            unimplemented!()
        }
        async fn create_student(&self, _fields: &Map<String, Value>) -> Result<Student> {
            unimplemented!()
        }

        async fn update_student(&self, id: &str, fields: &Map<String, Value>) -> Result<Student> {
            self.record(format!("update_student {id} {}", Value::Object(fields.clone())));
            if self.fail_ids.contains(id) {
                return Err(DeptError::backend(format!("student {id} not found")));
            }
            Ok(Student {
                id: id.to_string(),
                ..Default::default()
            })
        }

        async fn delete_student(&self, _id: &str) -> Result<String> {
            unimplemented!()
        }

        async fn professors(&self) -> Result<Vec<Professor>> {
            unimplemented!()
        }
        async fn professor(&self, _id: &str) -> Result<Option<Professor>> {
            unimplemented!()
        }
        async fn create_professor(&self, _fields: &Map<String, Value>) -> Result<Professor> {
            unimplemented!()
        }
        async fn update_professor(
            &self,
            _id: &str,
            _fields: &Map<String, Value>,
        ) -> Result<Professor> {
            unimplemented!()
        }
        async fn delete_professor(&self, _id: &str) -> Result<String> {
            unimplemented!()
        }

        async fn classes(&self) -> Result<Vec<ClassRoom>> {
            unimplemented!()
        }
        async fn class(&self, _id: &str) -> Result<Option<ClassRoom>> {
            unimplemented!()
        }
        async fn create_class(&self, _fields: &Map<String, Value>) -> Result<ClassRoom> {
            unimplemented!()
        }
        async fn update_class(&self, _id: &str, _fields: &Map<String, Value>) -> Result<ClassRoom> {
            unimplemented!()
        }
        async fn delete_class(&self, _id: &str) -> Result<String> {
            unimplemented!()
        }

        async fn delete_students_bulk(&self, ids: &[String]) -> Result<()> {
            self.record(format!("delete_students_bulk {}", ids.join(",")));
            match &self.bulk_error {
                Some(msg) => Err(DeptError::backend(msg.clone())),
                None => Ok(()),
            }
        }

        async fn remove_students_from_class(&self, class_id: &str, ids: &[String]) -> Result<()> {
            self.record(format!("remove_from_class {class_id} {}", ids.join(",")));
            match &self.bulk_error {
                Some(msg) => Err(DeptError::backend(msg.clone())),
                None => Ok(()),
            }
        }

        async fn assign_professor(&self, _class_id: &str, _professor_id: &str) -> Result<ClassRoom> {
            unimplemented!()
        }
        async fn add_students_to_class(
            &self,
            _class_id: &str,
            _ids: &[String],
        ) -> Result<ClassRoom> {
            unimplemented!()
        }
    }

    #[derive(Default)]
    struct MemStore {
        session: Mutex<Option<AuthSession>>,
        base_url: Mutex<Option<String>>,
    }

    impl SessionStore for MemStore {
        fn session(&self) -> Result<Option<AuthSession>> {
            Ok(self.session.lock().unwrap().clone())
        }
        fn set_session(&self, session: &AuthSession) -> Result<()> {
            *self.session.lock().unwrap() = Some(session.clone());
            Ok(())
        }
        fn clear_session(&self) -> Result<()> {
            *self.session.lock().unwrap() = None;
            Ok(())
        }
        fn base_url(&self) -> Result<Option<String>> {
            Ok(self.base_url.lock().unwrap().clone())
        }
        fn set_base_url(&self, url: &str) -> Result<()> {
            *self.base_url.lock().unwrap() = Some(url.to_string());
            Ok(())
        }
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn update_many_sends_only_sanitized_fields() {
        let backend = FakeBackend::default();
        let updates = json!({ "semester": "6", "division": "B", "extra": "x" })
            .as_object()
            .unwrap()
            .clone();

        let report = api::student_update_many(
            &backend,
            &ids(&["s1", "s2"]),
            &updates,
            BatchOptions::default(),
        )
        .await
        .unwrap();

        assert!(report.is_full_success());
        assert_eq!(report.success.len(), 2);
        for call in backend.calls() {
            assert!(call.contains(r#""semester":6"#), "call: {call}");
            assert!(call.contains(r#""division":"B""#), "call: {call}");
            assert!(!call.contains("extra"), "call: {call}");
        }
    }

    #[tokio::test]
    async fn update_many_reports_partial_failure() {
        let backend = FakeBackend::failing(&["s2"]);
        let updates = json!({ "semester": 6 }).as_object().unwrap().clone();

        let report = api::student_update_many(
            &backend,
            &ids(&["s1", "s2", "s3"]),
            &updates,
            BatchOptions {
                concurrency: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(report.success.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "s2");
        assert!(report.failed[0].error.contains("not found"));
    }

    #[tokio::test]
    async fn update_many_rejects_invalid_updates_before_any_call() {
        let backend = FakeBackend::default();
        let updates = json!({ "semester": "abc", "division": "  " })
            .as_object()
            .unwrap()
            .clone();

        let result = api::student_update_many(
            &backend,
            &ids(&["s1"]),
            &updates,
            BatchOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(DeptError::Validation(_))));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_many_bulk_error_fans_out_to_every_id() {
        let backend = FakeBackend {
            bulk_error: Some("db unavailable".to_string()),
            ..Default::default()
        };

        let report =
            api::student_delete_many(&backend, &ids(&["a", "b", "c"]), BatchOptions::default())
                .await
                .unwrap();

        assert!(report.success.is_empty());
        assert_eq!(report.failed.len(), 3);
        assert!(report.failed.iter().all(|f| f.error.contains("db unavailable")));
        // One network call, not one per id.
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn remove_students_issues_one_deduplicated_call() {
        let backend = FakeBackend::default();

        let report = api::class_remove_students(
            &backend,
            "c1",
            &ids(&["a", "b", "a"]),
            BatchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.success, vec!["a", "b"]);
        assert_eq!(backend.calls(), vec!["remove_from_class c1 a,b"]);
    }

    #[tokio::test]
    async fn login_stores_session_and_logout_clears_it() {
        let backend = FakeBackend::default();
        let store = MemStore::default();

        let session = api::login(&backend, &store, "hod@example.edu", "pw")
            .await
            .unwrap();
        assert_eq!(session.token, "tok-1");
        assert_eq!(api::whoami(&store).unwrap().email, "hod@example.edu");

        api::logout(&store).unwrap();
        assert!(matches!(api::whoami(&store), Err(DeptError::NotLoggedIn)));
    }

    #[test]
    fn filter_students_filters_and_sorts() {
        let students = vec![
            Student {
                id: "s1".into(),
                name: "Zara".into(),
                semester: Some(5),
                division: Some("A".into()),
                ..Default::default()
            },
            Student {
                id: "s2".into(),
                name: "amit".into(),
                semester: Some(5),
                division: Some("a".into()),
                ..Default::default()
            },
            Student {
                id: "s3".into(),
                name: "Maya".into(),
                semester: Some(3),
                division: Some("B".into()),
                ..Default::default()
            },
        ];

        let filter = StudentFilter {
            semester: Some(5),
            division: Some("A".into()),
            name: None,
            sort: Some(StudentSort::Name),
        };
        let got = api::filter_students(students.clone(), &filter);
        assert_eq!(
            got.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["s2", "s1"]
        );

        let filter = StudentFilter {
            name: Some("may".into()),
            ..Default::default()
        };
        let got = api::filter_students(students, &filter);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "s3");
    }
}
