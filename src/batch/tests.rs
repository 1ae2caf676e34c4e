#[cfg(test)]
mod tests {
    use crate::batch::{dedupe, run_bounded, run_bulk, sanitize_update};
    use crate::error::DeptError;
    use crate::types::Progress;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn updates(raw: Value) -> Map<String, Value> {
        raw.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn bounded_puts_every_id_in_exactly_one_list() {
        let input = ids(&["s1", "s2", "s3", "s4", "s5"]);
        let report = run_bounded(&input, 2, None, |id| async move {
            if id == "s2" || id == "s4" {
                Err(DeptError::backend(format!("{id} not found")))
            } else {
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(report.total(), 5);
        assert_eq!(report.success.len(), 3);
        assert_eq!(report.failed.len(), 2);
        for id in &input {
            let in_success = report.success.contains(id);
            let in_failed = report.failed.iter().any(|f| &f.id == id);
            assert!(in_success != in_failed, "{id} must land in exactly one list");
        }
        assert!(report
            .failed
            .iter()
            .all(|f| f.error.contains("not found")));
    }

    #[tokio::test]
    async fn bounded_progress_counts_one_to_total() {
        let input = ids(&["a", "b", "c", "d"]);
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ticks);
        let on_progress = move |p: Progress| sink.lock().unwrap().push(p);

        run_bounded(&input, 3, Some(&on_progress), |_id| async { Ok(()) })
            .await
            .unwrap();

        let seen = ticks.lock().unwrap().clone();
        let expected: Vec<Progress> = (1..=4).map(|done| Progress { done, total: 4 }).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn bounded_dedup_is_idempotent() {
        let op = |id: String| async move {
            if id == "b" {
                Err(DeptError::backend("b rejected"))
            } else {
                Ok(())
            }
        };

        let once = run_bounded(&ids(&["a", "b"]), 1, None, op).await.unwrap();
        let twice = run_bounded(&ids(&["a", "b", "a", "b", "a"]), 1, None, op)
            .await
            .unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.total(), 2);
    }

    #[tokio::test]
    async fn bounded_total_is_the_deduplicated_count() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ticks);
        let on_progress = move |p: Progress| sink.lock().unwrap().push(p);

        run_bounded(&ids(&["x", "x", "y"]), 5, Some(&on_progress), |_id| async {
            Ok(())
        })
        .await
        .unwrap();

        let seen = ticks.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|p| p.total == 2));
    }

    #[tokio::test]
    async fn bounded_rejects_empty_batch_before_any_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let result = run_bounded(&[], 3, None, move |_id: String| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(matches!(result, Err(DeptError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bounded_respects_concurrency_limit() {
        use tokio::sync::Mutex as AsyncMutex;

        let max_seen = Arc::new(AsyncMutex::new(0usize));
        let current = Arc::new(AsyncMutex::new(0usize));
        let input: Vec<String> = (0..10).map(|i| format!("s{i}")).collect();

        let max_handle = Arc::clone(&max_seen);
        let current_handle = Arc::clone(&current);

        let report = run_bounded(&input, 3, None, move |_id| {
            let max_seen = Arc::clone(&max_handle);
            let current = Arc::clone(&current_handle);
            async move {
                {
                    let mut curr = current.lock().await;
                    *curr += 1;
                    let mut max = max_seen.lock().await;
                    *max = (*max).max(*curr);
                }
                tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                {
                    let mut curr = current.lock().await;
                    *curr -= 1;
                }
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(report.total(), 10);
        let max = *max_seen.lock().await;
        assert!(max <= 3, "max in flight was {max}, expected <= 3");
    }

    #[tokio::test]
    async fn bulk_success_marks_every_id_succeeded() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ticks);
        let on_progress = move |p: Progress| sink.lock().unwrap().push(p);

        let report = run_bulk(&ids(&["a", "b", "a"]), Some(&on_progress), |batch| async move {
            assert_eq!(batch, vec!["a", "b"]);
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(report.success, vec!["a", "b"]);
        assert!(report.failed.is_empty());
        assert_eq!(
            ticks.lock().unwrap().clone(),
            vec![Progress { done: 2, total: 2 }]
        );
    }

    #[tokio::test]
    async fn bulk_failure_marks_every_id_failed() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ticks);
        let on_progress = move |p: Progress| sink.lock().unwrap().push(p);

        let report = run_bulk(&ids(&["a", "b", "c"]), Some(&on_progress), |_batch| async {
            Err(DeptError::http_error(
                "api/students/bulk-delete",
                "connection refused",
            ))
        })
        .await
        .unwrap();

        assert!(report.success.is_empty());
        assert_eq!(report.failed.len(), 3);
        assert!(report
            .failed
            .iter()
            .all(|f| f.error.contains("connection refused")));
        assert_eq!(
            ticks.lock().unwrap().clone(),
            vec![Progress { done: 3, total: 3 }]
        );
    }

    #[tokio::test]
    async fn bulk_rejects_empty_batch() {
        let result = run_bulk(&[], None, |_batch| async { Ok(()) }).await;
        assert!(matches!(result, Err(DeptError::Validation(_))));
    }

    #[test]
    fn dedupe_keeps_first_seen_order() {
        assert_eq!(
            dedupe(&ids(&["b", "a", "b", "c", "a"])),
            ids(&["b", "a", "c"])
        );
        assert!(dedupe(&[]).is_empty());
    }

    #[test]
    fn sanitize_drops_uncoercible_fields() {
        let out = sanitize_update(&updates(json!({
            "semester": "abc",
            "division": "  "
        })));
        assert!(out.is_empty());
    }

    #[test]
    fn sanitize_coerces_and_enforces_allow_list() {
        let out = sanitize_update(&updates(json!({
            "semester": "5",
            "division": "A",
            "extra": "x"
        })));
        assert_eq!(out.len(), 2);
        assert_eq!(out.get("semester"), Some(&json!(5)));
        assert_eq!(out.get("division"), Some(&json!("A")));
        assert!(out.get("extra").is_none());
    }

    #[test]
    fn sanitize_trims_division_and_accepts_numbers() {
        let out = sanitize_update(&updates(json!({
            "semester": 7,
            "division": "  B "
        })));
        assert_eq!(out.get("semester"), Some(&json!(7)));
        assert_eq!(out.get("division"), Some(&json!("B")));
    }
}
