//! Task-status polling.
//!
//! The loop checks elapsed time before sleeping, never after, so a status
//! read exactly at the timeout boundary still counts.

use std::time::Duration;

use inprod_api::{
    task_status_path, ApiError, ChangeSetApi, TaskHandle, TaskStatus, TaskStatusResponse,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ChangesetError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// How long to wait for a task, and how often to ask.
///
/// Both values are used exactly as given; see `ChangesetConfig` for the
/// checks applied to user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

/// Poll `task` until it reaches a terminal status.
///
/// Returns the `result` field of a SUCCESS response unchanged (JSON null
/// when absent). FAILURE, REVOKED and timeout each map to their own error.
/// Unrecognized statuses are treated like PENDING.
pub async fn poll_task<A>(api: &A, task: &TaskHandle, settings: PollSettings) -> Result<Value>
where
    A: ChangeSetApi + ?Sized,
{
    let mut elapsed: u64 = 0;

    loop {
        let body = api.task_status(task).await?;
        let response = match TaskStatusResponse::deserialize(&body) {
            Ok(response) => response,
            Err(e) => {
                return Err(ApiError::MalformedResponse {
                    url: task_status_path(task)?,
                    reason: e.to_string(),
                    body: body.to_string(),
                }
                .into())
            }
        };
        let status = response.status();

        debug!(
            event = "task.polled",
            task_id = %task,
            status = %status,
            elapsed_secs = elapsed,
            "Task status"
        );

        match status {
            TaskStatus::Success => return Ok(response.result.unwrap_or(Value::Null)),
            TaskStatus::Failure => {
                return Err(ChangesetError::TaskFailed {
                    task_id: task.to_string(),
                    message: response.error_message(),
                })
            }
            TaskStatus::Revoked => {
                return Err(ChangesetError::TaskCancelled {
                    task_id: task.to_string(),
                })
            }
            TaskStatus::Unknown(ref raw) => {
                warn!(task_id = %task, status = %raw, "Unrecognized task status, still waiting");
            }
            TaskStatus::Pending | TaskStatus::Started => {}
        }

        if elapsed >= settings.timeout_secs {
            return Err(ChangesetError::TaskTimeout {
                timeout_secs: settings.timeout_secs,
                task_id: task.to_string(),
                last_status: status.to_string(),
            });
        }

        tokio::time::sleep(Duration::from_secs(settings.poll_interval_secs)).await;
        elapsed = elapsed.saturating_add(settings.poll_interval_secs);
    }
}
