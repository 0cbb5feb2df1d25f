//! Submit, poll, interpret.
//!
//! [`run_changeset`] drives one resolved [`Operation`] through the whole
//! task protocol against any [`ChangeSetApi`] implementation.

use inprod_api::{ChangeSetApi, ExecuteResult, SubmitAction, TaskHandle, ValidateResult};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::{ChangesetError, Result};
use crate::interpreter::{interpret_execute, interpret_validate};
use crate::operation::{Operation, OperationParams};
use crate::poller::{poll_task, PollSettings};

/// What a successful run produced.
#[derive(Debug, Clone)]
pub enum ChangesetOutcome {
    Executed {
        task: TaskHandle,
        result: ExecuteResult,
    },
    Validated {
        task: TaskHandle,
        result: ValidateResult,
    },
}

impl ChangesetOutcome {
    pub fn task(&self) -> &TaskHandle {
        match self {
            ChangesetOutcome::Executed { task, .. } | ChangesetOutcome::Validated { task, .. } => {
                task
            }
        }
    }

    /// One-line human summary, printed by the CLI.
    pub fn summary(&self) -> String {
        match self {
            ChangesetOutcome::Executed { task, result } => {
                let mut line = match &result.run_id {
                    Some(run_id) => format!("change set executed (run_id: {run_id})"),
                    None => "change set executed".to_string(),
                };
                if let Some(name) = &result.changeset_name {
                    line.push_str(&format!(" [{name}]"));
                }
                line.push_str(&format!(", task {task}"));
                line
            }
            ChangesetOutcome::Validated { task, result } => match &result.changeset_name {
                Some(name) => format!("change set validated [{name}], task {task}"),
                None => format!("change set validated, task {task}"),
            },
        }
    }
}

/// Pull the task handle out of a submit response.
pub fn extract_task_id(response: &Value) -> Result<TaskHandle> {
    TaskHandle::from_submit_response(response).ok_or_else(|| ChangesetError::MissingTaskId {
        response: response.to_string(),
    })
}

/// Run a resolved operation to completion.
#[instrument(skip_all, fields(operation = %operation.label()))]
pub async fn run_changeset<A>(
    api: &A,
    operation: &Operation,
    settings: PollSettings,
) -> Result<ChangesetOutcome>
where
    A: ChangeSetApi + ?Sized,
{
    let response = match operation {
        Operation::ById { action, id } => api.submit_changeset(id, *action).await?,
        Operation::FromFile {
            variant,
            path,
            environment,
        } => {
            api.submit_changeset_file(path, environment.as_deref(), *variant)
                .await?
        }
    };

    let task = extract_task_id(&response)?;
    info!(event = "changeset.submitted", task_id = %task, "Change set accepted");

    let result = poll_task(api, &task, settings).await?;

    let outcome = match operation.class() {
        SubmitAction::Execute => ChangesetOutcome::Executed {
            result: interpret_execute(&result)?,
            task,
        },
        SubmitAction::Validate => ChangesetOutcome::Validated {
            result: interpret_validate(&result)?,
            task,
        },
    };

    match &outcome {
        ChangesetOutcome::Executed { task, result } => info!(
            event = "changeset.finished",
            task_id = %task,
            run_id = %result
                .run_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            "Change set executed"
        ),
        ChangesetOutcome::Validated { task, .. } => info!(
            event = "changeset.finished",
            task_id = %task,
            "Change set is valid"
        ),
    }
    Ok(outcome)
}

/// Parse `action`, resolve its parameters, then run it.
///
/// Invalid actions and missing parameters fail before any API call.
pub async fn run_action<A>(
    api: &A,
    action: &str,
    params: &OperationParams,
    settings: PollSettings,
) -> Result<ChangesetOutcome>
where
    A: ChangeSetApi + ?Sized,
{
    let operation = Operation::resolve(action, params)?;
    run_changeset(api, &operation, settings).await
}
