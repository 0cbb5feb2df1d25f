//! Interpretation of terminal task results.
//!
//! An execute-class task succeeds only when its result carries
//! `successful: true`; a validate-class task only with `is_valid: true`.
//! Anything else becomes a typed failure with enough detail to act on.

use inprod_api::{ActionValidation, ExecuteResult, FieldMessages, ValidateResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ChangesetError, Result};

pub const NO_DETAILS: &str = "No details available";
pub const UNKNOWN_ERRORS: &str = "Validation failed with unknown errors";

/// Decide the outcome of an execute-class task.
pub fn interpret_execute(result: &Value) -> Result<ExecuteResult> {
    let decoded: ExecuteResult = decode(result);
    if !decoded.successful {
        return Err(ChangesetError::ExecutionFailed {
            run_id: decoded.run_id.as_ref().map(ToString::to_string),
            payload: result.to_string(),
        });
    }
    Ok(decoded)
}

/// Decide the outcome of a validate-class task.
///
/// Warnings on a valid change set are logged, not returned as errors.
pub fn interpret_validate(result: &Value) -> Result<ValidateResult> {
    let decoded: ValidateResult = decode(result);
    if !decoded.is_valid {
        return Err(ChangesetError::ValidationFailed {
            report: format_validation_errors(&decoded),
        });
    }

    for action in decoded.validation_results.iter().flatten() {
        for line in message_lines(action, &action.warnings) {
            warn!(event = "changeset.validation_warning", "{line}");
        }
    }
    Ok(decoded)
}

/// Flatten per-action errors into one `Action {id} - {field}: {msg}` line
/// per message, in server order.
pub fn format_validation_errors(result: &ValidateResult) -> String {
    let Some(actions) = &result.validation_results else {
        return NO_DETAILS.to_string();
    };

    let lines: Vec<String> = actions
        .iter()
        .flat_map(|action| message_lines(action, &action.errors))
        .collect();

    if lines.is_empty() {
        UNKNOWN_ERRORS.to_string()
    } else {
        lines.join("\n")
    }
}

fn message_lines(action: &ActionValidation, messages: &FieldMessages) -> Vec<String> {
    let action_id = action
        .action_id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();

    let mut lines = Vec::new();
    for (field, entries) in messages.iter() {
        for entry in entries {
            for msg in &entry.msg {
                lines.push(format!("Action {action_id} - {field}: {msg}"));
            }
        }
    }
    lines
}

/// Lenient decode: a result that is not an object reads as all defaults,
/// which callers then treat as a failed task.
fn decode<T: DeserializeOwned + Default>(result: &Value) -> T {
    if !result.is_object() {
        return T::default();
    }
    T::deserialize(result).unwrap_or_else(|e| {
        debug!(error = %e, "Result payload did not decode; using defaults");
        T::default()
    })
}
