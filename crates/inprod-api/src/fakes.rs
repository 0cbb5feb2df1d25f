//! In-memory fake for the `ChangeSetApi` trait (testing only)
//!
//! `ScriptedChangeSetApi` replays queued submit and task-status bodies and
//! records every call, so tests can assert on what reached the "server".

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::ChangeSetApi;
use crate::error::{ApiError, ApiResult};
use crate::types::{ChangesetId, FileVariant, SubmitAction, TaskHandle};

/// A call observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Submit {
        id: String,
        action: SubmitAction,
    },
    SubmitFile {
        path: PathBuf,
        environment: Option<String>,
        variant: FileVariant,
    },
    TaskStatus {
        task_id: String,
    },
}

/// Scripted change-set API.
///
/// Submit calls pop from the submit queue; status calls pop from the status
/// queue and fall back to the repeating status once it is drained.
#[derive(Debug, Default)]
pub struct ScriptedChangeSetApi {
    submits: Mutex<VecDeque<ApiResult<Value>>>,
    statuses: Mutex<VecDeque<ApiResult<Value>>>,
    repeating_status: Mutex<Option<Value>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl ScriptedChangeSetApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_submit_response(self, body: Value) -> Self {
        self.submits.lock().unwrap().push_back(Ok(body));
        self
    }

    pub fn with_submit_error(self, err: ApiError) -> Self {
        self.submits.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_status(self, body: Value) -> Self {
        self.statuses.lock().unwrap().push_back(Ok(body));
        self
    }

    pub fn with_status_error(self, err: ApiError) -> Self {
        self.statuses.lock().unwrap().push_back(Err(err));
        self
    }

    /// Body returned for every status call after the queue is drained.
    pub fn with_repeating_status(self, body: Value) -> Self {
        *self.repeating_status.lock().unwrap() = Some(body);
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, ApiCall::TaskStatus { .. }))
            .count()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_submit(&self) -> ApiResult<Value> {
        self.submits.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(ApiError::InvalidConfig(
                "scripted fake has no submit response".to_string(),
            ))
        })
    }
}

#[async_trait]
impl ChangeSetApi for ScriptedChangeSetApi {
    async fn submit_changeset(&self, id: &ChangesetId, action: SubmitAction) -> ApiResult<Value> {
        self.record(ApiCall::Submit {
            id: id.to_string(),
            action,
        });
        self.next_submit()
    }

    async fn submit_changeset_file(
        &self,
        path: &Path,
        environment: Option<&str>,
        variant: FileVariant,
    ) -> ApiResult<Value> {
        self.record(ApiCall::SubmitFile {
            path: path.to_path_buf(),
            environment: environment.map(str::to_owned),
            variant,
        });
        self.next_submit()
    }

    async fn task_status(&self, task: &TaskHandle) -> ApiResult<Value> {
        self.record(ApiCall::TaskStatus {
            task_id: task.to_string(),
        });
        if let Some(next) = self.statuses.lock().unwrap().pop_front() {
            return next;
        }
        self.repeating_status
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| {
                ApiError::InvalidConfig("scripted fake has no task-status response".to_string())
            })
    }
}

// ---------------------------------------------------------------------------
// Canned bodies
// ---------------------------------------------------------------------------

/// Submit response announcing a background task.
pub fn accepted(task_id: &str) -> Value {
    json!({
        "data": {
            "type": "change-set-confirmation",
            "attributes": {
                "title": "Processing...",
                "description": "Your change set is being run in the background.",
                "task_id": task_id,
            }
        }
    })
}

/// Non-terminal (or arbitrary) status body.
pub fn task_state(task_id: &str, status: &str) -> Value {
    json!({"task_id": task_id, "status": status})
}

pub fn task_success(task_id: &str, result: Value) -> Value {
    json!({"task_id": task_id, "status": "SUCCESS", "result": result})
}

pub fn task_failure(task_id: &str, error: &str) -> Value {
    json!({"task_id": task_id, "status": "FAILURE", "error": error})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_queue_then_repeating_status() {
        let api = ScriptedChangeSetApi::new()
            .with_status(task_state("t1", "STARTED"))
            .with_repeating_status(task_state("t1", "PENDING"));
        let task = TaskHandle::new("t1");

        assert_eq!(api.task_status(&task).await.unwrap()["status"], "STARTED");
        assert_eq!(api.task_status(&task).await.unwrap()["status"], "PENDING");
        assert_eq!(api.task_status(&task).await.unwrap()["status"], "PENDING");
        assert_eq!(api.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_script_is_an_error() {
        let api = ScriptedChangeSetApi::new();
        let id = ChangesetId::try_from("1").unwrap();

        assert!(api.submit_changeset(&id, SubmitAction::Execute).await.is_err());
        assert!(api.task_status(&TaskHandle::new("t")).await.is_err());
        assert_eq!(
            api.calls()[0],
            ApiCall::Submit {
                id: "1".to_string(),
                action: SubmitAction::Execute
            }
        );
    }
}
