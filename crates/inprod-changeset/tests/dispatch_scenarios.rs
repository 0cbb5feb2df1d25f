//! End-to-end runs of the submit / poll / interpret chain against the
//! scripted API fake.

use std::io::Write;
use std::time::Duration;

use inprod_api::fakes::{
    accepted, task_failure, task_state, task_success, ApiCall, ScriptedChangeSetApi,
};
use inprod_api::{FileVariant, PayloadFormat, SubmitAction, WireId};
use inprod_changeset::{run_action, ChangesetError, ChangesetOutcome, OperationParams, PollSettings};
use serde_json::json;
use tokio::time::Instant;

fn by_id(id: &str) -> OperationParams {
    OperationParams {
        changeset_id: Some(id.to_string()),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn execute_by_id_reports_run_id() {
    let api = ScriptedChangeSetApi::new()
        .with_submit_response(accepted("t1"))
        .with_status(task_state("t1", "PENDING"))
        .with_status(task_state("t1", "STARTED"))
        .with_status(task_success(
            "t1",
            json!({"run_id": 24, "successful": true, "changeset_name": "Nightly sync"}),
        ));
    let start = Instant::now();

    let outcome = run_action(&api, "execute", &by_id("124"), PollSettings::default())
        .await
        .unwrap();

    match outcome {
        ChangesetOutcome::Executed { task, result } => {
            assert_eq!(task.as_str(), "t1");
            assert_eq!(result.run_id, Some(WireId::Number(24)));
            assert_eq!(result.changeset_name.as_deref(), Some("Nightly sync"));
        }
        other => panic!("expected Executed, got {:?}", other),
    }
    assert_eq!(api.status_calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

#[tokio::test]
async fn validate_with_empty_results_fails_with_unknown_errors() {
    let api = ScriptedChangeSetApi::new()
        .with_submit_response(accepted("v1"))
        .with_status(task_success(
            "v1",
            json!({"is_valid": false, "validation_results": []}),
        ));

    let err = run_action(&api, "validate", &by_id("125"), PollSettings::default())
        .await
        .unwrap_err();

    match err {
        ChangesetError::ValidationFailed { report } => {
            assert_eq!(report, "Validation failed with unknown errors");
        }
        other => panic!("expected ValidationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn validate_yaml_file_reports_each_error_line() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "changeset:\n  - action: create").unwrap();

    let api = ScriptedChangeSetApi::new()
        .with_submit_response(accepted("v2"))
        .with_status(task_success(
            "v2",
            json!({
                "is_valid": false,
                "validation_results": [
                    {"action_id": 534, "errors": {"folderDbid": [{"msg": ["No object found with query"]}]}},
                    {"action_id": 535, "errors": {"name": [{"msg": ["This field is required."]}]}}
                ]
            }),
        ));
    let params = OperationParams {
        path: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    let err = run_action(&api, "validateyaml", &params, PollSettings::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "change set validation failed:\n\
         Action 534 - folderDbid: No object found with query\n\
         Action 535 - name: This field is required."
    );
    assert!(err.is_task_outcome());
    assert_eq!(
        api.calls()[0],
        ApiCall::SubmitFile {
            path: file.path().to_path_buf(),
            environment: None,
            variant: FileVariant::new(SubmitAction::Validate, PayloadFormat::Yaml),
        }
    );
}

#[tokio::test]
async fn execute_json_passes_environment() {
    let api = ScriptedChangeSetApi::new()
        .with_submit_response(accepted("t9"))
        .with_status(task_success("t9", json!({"run_id": "r-9", "successful": true})));
    let params = OperationParams {
        path: Some("changeset.json".into()),
        environment: Some("Production".to_string()),
        ..Default::default()
    };

    let outcome = run_action(&api, "executejson", &params, PollSettings::default())
        .await
        .unwrap();

    assert_eq!(outcome.summary(), "change set executed (run_id: r-9), task t9");
    match &api.calls()[0] {
        ApiCall::SubmitFile {
            environment,
            variant,
            ..
        } => {
            assert_eq!(environment.as_deref(), Some("Production"));
            assert_eq!(variant.endpoint(), "execute_json");
        }
        other => panic!("expected SubmitFile, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_task_id_never_polls() {
    let api = ScriptedChangeSetApi::new()
        .with_submit_response(json!({"data": {"attributes": {}}}))
        .with_repeating_status(task_state("t1", "PENDING"));

    let err = run_action(&api, "execute", &by_id("124"), PollSettings::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains(r#"{"data":{"attributes":{}}}"#));
    assert_eq!(api.status_calls(), 0);
}

#[tokio::test]
async fn invalid_action_makes_no_calls() {
    let api = ScriptedChangeSetApi::new();

    let err = run_action(&api, "deploy", &by_id("124"), PollSettings::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ChangesetError::InvalidAction(ref a) if a == "deploy"));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn failed_execution_keeps_payload() {
    let api = ScriptedChangeSetApi::new()
        .with_submit_response(accepted("t2"))
        .with_status(task_success("t2", json!({"run_id": 77, "successful": false})));

    let err = run_action(&api, "execute", &by_id("9"), PollSettings::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        r#"change set execution failed (run_id: 77): {"run_id":77,"successful":false}"#
    );
}

#[tokio::test]
async fn task_failure_surfaces_server_error() {
    let api = ScriptedChangeSetApi::new()
        .with_submit_response(accepted("t3"))
        .with_status(task_failure("t3", "Connection timeout"));

    let err = run_action(&api, "execute", &by_id("9"), PollSettings::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "task t3 failed: Connection timeout");
}

#[tokio::test(start_paused = true)]
async fn pending_forever_times_out() {
    let api = ScriptedChangeSetApi::new()
        .with_submit_response(accepted("t4"))
        .with_repeating_status(task_state("t4", "PENDING"));
    let settings = PollSettings {
        timeout_secs: 10,
        poll_interval_secs: 5,
    };

    let err = run_action(&api, "validate", &by_id("9"), settings)
        .await
        .unwrap_err();

    assert!(matches!(err, ChangesetError::TaskTimeout { .. }));
    assert!(err.to_string().contains("10s"));
    assert_eq!(api.status_calls(), 3);
}
