//! Error taxonomy for change-set runs.

use inprod_api::ApiError;

/// Errors produced while running a change-set operation.
///
/// Every variant is terminal for the current invocation; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ChangesetError {
    #[error("invalid changeset action: {0:?}")]
    InvalidAction(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no task_id in API response: {response}")]
    MissingTaskId { response: String },

    #[error("task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    #[error("task {task_id} was cancelled")]
    TaskCancelled { task_id: String },

    #[error("timed out after {timeout_secs}s waiting for task {task_id} (last status: {last_status})")]
    TaskTimeout {
        timeout_secs: u64,
        task_id: String,
        last_status: String,
    },

    #[error("change set execution failed{}: {payload}", run_label(.run_id))]
    ExecutionFailed {
        run_id: Option<String>,
        /// Full result payload as JSON
        payload: String,
    },

    #[error("change set validation failed:\n{report}")]
    ValidationFailed { report: String },

    #[error("interrupted before the change set finished")]
    Interrupted,
}

fn run_label(run_id: &Option<String>) -> String {
    match run_id {
        Some(id) => format!(" (run_id: {id})"),
        None => String::new(),
    }
}

impl ChangesetError {
    /// True when the remote task ran and reported a result or state we reject,
    /// as opposed to configuration, transport, or protocol problems.
    pub fn is_task_outcome(&self) -> bool {
        matches!(
            self,
            ChangesetError::TaskFailed { .. }
                | ChangesetError::TaskCancelled { .. }
                | ChangesetError::TaskTimeout { .. }
                | ChangesetError::ExecutionFailed { .. }
                | ChangesetError::ValidationFailed { .. }
        )
    }
}

/// Result type for change-set operations.
pub type Result<T> = std::result::Result<T, ChangesetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_task_and_status() {
        let err = ChangesetError::TaskTimeout {
            timeout_secs: 10,
            task_id: "t1".to_string(),
            last_status: "PENDING".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 10s waiting for task t1 (last status: PENDING)"
        );
        assert!(err.is_task_outcome());
    }

    #[test]
    fn test_execution_failed_tags_run_id() {
        let err = ChangesetError::ExecutionFailed {
            run_id: Some("24".to_string()),
            payload: r#"{"run_id":24,"successful":false}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"change set execution failed (run_id: 24): {"run_id":24,"successful":false}"#
        );

        let err = ChangesetError::ExecutionFailed {
            run_id: None,
            payload: "null".to_string(),
        };
        assert_eq!(err.to_string(), "change set execution failed: null");
    }

    #[test]
    fn test_api_errors_are_not_task_outcomes() {
        let err = ChangesetError::from(ApiError::Transport {
            status: 503,
            reason: "Service Unavailable".to_string(),
            body: String::new(),
        });
        assert_eq!(err.to_string(), "InProd API returned HTTP 503: Service Unavailable");
        assert!(!err.is_task_outcome());
        assert!(!ChangesetError::InvalidAction("deploy".to_string()).is_task_outcome());
    }
}
