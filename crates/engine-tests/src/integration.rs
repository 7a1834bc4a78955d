#[cfg(test)]
mod tests {
    use crate::utils::{FakeTrack, Plan, csv_with_rows, run_import};
    use connectors::error::{DeliveryError, SourceError};
    use engine_runtime::budget::RunBudget;
    use engine_runtime::error::ImportError;
    use std::time::Duration;
    use tracing_test::traced_test;

    // Scenario: a three-row file where one row has an empty attribute cell
    // and one carries an explicit null.
    // Expected outcome: one upstream call; the attribute-less row is skipped,
    // the null survives, and the whole file is committed.
    #[traced_test]
    #[tokio::test]
    async fn normalizes_and_delivers_a_small_file() {
        let data = b"external_id,a\n1,x\n2,\n3,null\n";
        let api = FakeTrack::reliable();

        let (controller, result) =
            run_import(data, api.clone(), 0, None, 20, RunBudget::unbounded()).await;
        let report = result.unwrap();

        assert_eq!(api.call_count(), 1);
        assert_eq!(api.delivered_ids(), vec!["1", "3"]);
        assert_eq!(
            api.delivered_records(),
            vec![
                serde_json::json!({"external_id": "1", "a": "x"}),
                serde_json::json!({"external_id": "3", "a": null}),
            ]
        );
        assert_eq!(report.users_processed, 2);
        assert_eq!(report.bytes_read, data.len() as u64);
        assert!(report.is_finished);
        assert_eq!(controller.state().total_offset, data.len() as u64);
    }

    // Scenario: the header row does not lead with the identifier column.
    // Expected outcome: the run aborts before any record is read or sent.
    #[tokio::test]
    async fn wrong_header_aborts_before_any_delivery() {
        let api = FakeTrack::reliable();
        let (_, result) =
            run_import(b"id,a\n1,x\n", api.clone(), 0, None, 20, RunBudget::unbounded()).await;

        assert!(matches!(
            result,
            Err(ImportError::Source(SourceError::MalformedHeader { .. }))
        ));
        assert_eq!(api.call_count(), 0);
    }

    // Scenario: the object holds a header row and nothing else.
    // Expected outcome: the run finishes with zero users, the header bytes
    // committed, and no upstream traffic.
    #[tokio::test]
    async fn header_only_object_finishes_immediately() {
        let api = FakeTrack::reliable();
        let (controller, result) =
            run_import(b"external_id,a\n", api.clone(), 0, None, 20, RunBudget::unbounded())
                .await;
        let report = result.unwrap();

        assert_eq!(api.call_count(), 0);
        assert_eq!(report.users_processed, 0);
        assert_eq!(report.bytes_read, 14);
        assert!(report.is_finished);
        assert_eq!(controller.continuation().offset, 14);
    }

    // Scenario: the object is completely empty.
    // Expected outcome: finished, nothing read, nothing sent.
    #[tokio::test]
    async fn empty_object_finishes_immediately() {
        let api = FakeTrack::reliable();
        let (_, result) =
            run_import(b"", api.clone(), 0, None, 20, RunBudget::unbounded()).await;
        let report = result.unwrap();

        assert_eq!(api.call_count(), 0);
        assert_eq!(report.users_processed, 0);
        assert_eq!(report.bytes_read, 0);
        assert!(report.is_finished);
    }

    // Scenario: the endpoint rate-limits three times, then accepts.
    // Expected outcome: the delivery succeeds on the fourth attempt and no
    // error ever reaches the controller.
    #[traced_test]
    #[tokio::test]
    async fn rate_limits_are_absorbed_by_the_delivery_retry() {
        let data = b"external_id,a\n1,x\n2,y\n3,z\n";
        let api = FakeTrack::scripted(vec![
            Plan::Retryable("429"),
            Plan::Retryable("429"),
            Plan::Retryable("429"),
        ]);

        let (_, result) =
            run_import(data, api.clone(), 0, None, 20, RunBudget::unbounded()).await;
        let report = result.unwrap();

        assert_eq!(api.call_count(), 4);
        assert_eq!(report.users_processed, 3);
        assert!(report.is_finished);
        assert_eq!(api.delivered_ids(), vec!["1", "2", "3"]);
    }

    // Scenario: the endpoint responds with an unexpected client error.
    // Expected outcome: immediate fatal failure, a single call, and nothing
    // committed; the continuation points at the start of the file.
    #[tokio::test]
    async fn unexpected_client_error_fails_fast_and_commits_nothing() {
        let data = b"external_id,a\n1,x\n";
        let api = FakeTrack::scripted(vec![Plan::Fatal("no such endpoint")]);

        let (controller, result) =
            run_import(data, api.clone(), 0, None, 20, RunBudget::unbounded()).await;

        assert!(matches!(
            result,
            Err(ImportError::Delivery(DeliveryError::Fatal(_)))
        ));
        assert_eq!(api.call_count(), 1);
        assert_eq!(controller.state().total_offset, 0);

        let continuation = controller.continuation();
        assert_eq!(continuation.offset, 0);
        assert_eq!(
            continuation.headers,
            Some(vec!["external_id".to_string(), "a".to_string()])
        );
    }

    // Scenario: two waves; the first lands cleanly, the second fails
    // fatally.
    // Expected outcome: the committed offset covers exactly the header plus
    // the first wave's lines; the failed wave's bytes are left for a resume.
    #[tokio::test]
    async fn a_fatal_wave_commits_nothing_while_prior_waves_stay_committed() {
        let (data, line_lengths) = csv_with_rows(100);
        let api = FakeTrack::scripted(vec![Plan::Success, Plan::Fatal("boom")]);

        let (controller, result) =
            run_import(&data, api.clone(), 0, None, 1, RunBudget::unbounded()).await;

        assert!(matches!(result, Err(ImportError::Delivery(_))));
        assert_eq!(api.call_count(), 2);

        // header + the 75 lines of the first wave
        let expected: u64 = line_lengths.iter().take(76).sum();
        assert_eq!(controller.state().total_offset, expected);
        assert_eq!(controller.state().processed_count, 75);
        assert_eq!(api.delivered_ids().len(), 75);
    }

    // Scenario: the time budget runs out after the first wave; a second run
    // resumes from the continuation.
    // Expected outcome: between the two runs every record is delivered
    // exactly once, and the resumed run picks up at the committed byte.
    #[traced_test]
    #[tokio::test]
    async fn suspended_run_resumes_without_skipping_or_duplicating() {
        let (data, line_lengths) = csv_with_rows(100);

        let first_api = FakeTrack::reliable();
        let (first_controller, first_result) = run_import(
            &data,
            first_api.clone(),
            0,
            None,
            1,
            RunBudget::bounded(Duration::ZERO, Duration::from_secs(60)),
        )
        .await;
        let first_report = first_result.unwrap();

        assert_eq!(first_report.users_processed, 75);
        assert!(!first_report.is_finished);

        let continuation = first_controller.continuation();
        let expected: u64 = line_lengths.iter().take(76).sum();
        assert_eq!(continuation.offset, expected);

        let second_api = FakeTrack::reliable();
        let (_, second_result) = run_import(
            &data,
            second_api.clone(),
            continuation.offset,
            continuation.headers.clone(),
            1,
            RunBudget::unbounded(),
        )
        .await;
        let second_report = second_result.unwrap();

        assert_eq!(second_report.users_processed, 25);
        assert!(second_report.is_finished);

        let mut all_ids = first_api.delivered_ids();
        all_ids.extend(second_api.delivered_ids());
        let expected_ids: Vec<String> = (0..100).map(|n| format!("u{n}")).collect();
        assert_eq!(all_ids, expected_ids);
    }

    // Scenario: the endpoint reports per-record errors on an otherwise
    // successful call.
    // Expected outcome: the wave still commits in full; only the applied
    // count shrinks.
    #[tokio::test]
    async fn per_record_errors_do_not_block_the_commit() {
        let data = b"external_id,a\n1,x\n2,y\n3,z\n";
        let api = FakeTrack::scripted(vec![Plan::Partial(2)]);

        let (controller, result) =
            run_import(data, api.clone(), 0, None, 20, RunBudget::unbounded()).await;
        let report = result.unwrap();

        assert_eq!(report.users_processed, 1);
        assert_eq!(report.bytes_read, data.len() as u64);
        assert!(report.is_finished);
        assert_eq!(controller.state().total_offset, data.len() as u64);
    }

    // Scenario: a resumed run is handed headers that do not lead with the
    // identifier column.
    // Expected outcome: the run aborts before reading the body.
    #[tokio::test]
    async fn resumed_headers_are_validated_too() {
        let api = FakeTrack::reliable();
        let (_, result) = run_import(
            b"external_id,a\n1,x\n",
            api.clone(),
            14,
            Some(vec!["id".to_string(), "a".to_string()]),
            20,
            RunBudget::unbounded(),
        )
        .await;

        assert!(matches!(
            result,
            Err(ImportError::Source(SourceError::MalformedHeader { .. }))
        ));
        assert_eq!(api.call_count(), 0);
    }
}
