//! Requested change-set operations and their parameters.

use std::path::PathBuf;
use std::str::FromStr;

use inprod_api::{ChangesetId, FileVariant, PayloadFormat, SubmitAction};

use crate::error::{ChangesetError, Result};

/// The action strings accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangesetAction {
    Execute,
    Validate,
    ExecuteJson,
    ExecuteYaml,
    ValidateJson,
    ValidateYaml,
}

impl ChangesetAction {
    pub const ALL: [ChangesetAction; 6] = [
        ChangesetAction::Execute,
        ChangesetAction::Validate,
        ChangesetAction::ExecuteJson,
        ChangesetAction::ExecuteYaml,
        ChangesetAction::ValidateJson,
        ChangesetAction::ValidateYaml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangesetAction::Execute => "execute",
            ChangesetAction::Validate => "validate",
            ChangesetAction::ExecuteJson => "executejson",
            ChangesetAction::ExecuteYaml => "executeyaml",
            ChangesetAction::ValidateJson => "validatejson",
            ChangesetAction::ValidateYaml => "validateyaml",
        }
    }

    /// Execute-class or validate-class.
    pub fn class(&self) -> SubmitAction {
        match self {
            ChangesetAction::Execute | ChangesetAction::ExecuteJson | ChangesetAction::ExecuteYaml => {
                SubmitAction::Execute
            }
            ChangesetAction::Validate
            | ChangesetAction::ValidateJson
            | ChangesetAction::ValidateYaml => SubmitAction::Validate,
        }
    }

    fn is_spelled(&self, raw: &str) -> bool {
        if raw == self.as_str() {
            return true;
        }
        match self.payload_format() {
            Some(format) => {
                let endpoint = FileVariant::new(self.class(), format).endpoint();
                raw == endpoint || raw == endpoint.replace('_', "-")
            }
            None => false,
        }
    }

    /// Payload format for file-based actions, `None` for id-based ones.
    pub fn payload_format(&self) -> Option<PayloadFormat> {
        match self {
            ChangesetAction::Execute | ChangesetAction::Validate => None,
            ChangesetAction::ExecuteJson | ChangesetAction::ValidateJson => {
                Some(PayloadFormat::Json)
            }
            ChangesetAction::ExecuteYaml | ChangesetAction::ValidateYaml => {
                Some(PayloadFormat::Yaml)
            }
        }
    }
}

impl FromStr for ChangesetAction {
    type Err = ChangesetError;

    /// Accepts `executejson` as well as `execute-json` / `execute_json`.
    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        ChangesetAction::ALL
            .into_iter()
            .find(|action| action.is_spelled(raw))
            .ok_or_else(|| ChangesetError::InvalidAction(s.to_string()))
    }
}

impl std::fmt::Display for ChangesetAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw parameters supplied alongside an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationParams {
    pub changeset_id: Option<String>,
    pub path: Option<PathBuf>,
    pub environment: Option<String>,
}

/// A fully-resolved operation, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ById {
        action: SubmitAction,
        id: ChangesetId,
    },
    FromFile {
        variant: FileVariant,
        path: PathBuf,
        environment: Option<String>,
    },
}

impl Operation {
    /// Parse `action` and pick the parameters it needs.
    ///
    /// The action is checked first, so an unknown action is reported even
    /// when the other parameters are also wrong.
    pub fn resolve(action: &str, params: &OperationParams) -> Result<Self> {
        let action: ChangesetAction = action.parse()?;

        match action.payload_format() {
            None => {
                let raw = params.changeset_id.as_deref().ok_or_else(|| {
                    ChangesetError::InvalidConfig(format!("action {action} requires a change set id"))
                })?;
                let id = ChangesetId::try_from(raw.trim())
                    .map_err(|e| ChangesetError::InvalidConfig(e.to_string()))?;
                if params.environment.is_some() {
                    tracing::warn!(
                        action = %action,
                        "environment override only applies to file-based change sets; ignoring it"
                    );
                }
                Ok(Operation::ById {
                    action: action.class(),
                    id,
                })
            }
            Some(format) => {
                let path = params.path.clone().ok_or_else(|| {
                    ChangesetError::InvalidConfig(format!("action {action} requires a file path"))
                })?;
                let environment = params
                    .environment
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_owned);
                Ok(Operation::FromFile {
                    variant: FileVariant::new(action.class(), format),
                    path,
                    environment,
                })
            }
        }
    }

    pub fn class(&self) -> SubmitAction {
        match self {
            Operation::ById { action, .. } => *action,
            Operation::FromFile { variant, .. } => variant.action,
        }
    }

    /// Short label for logs, e.g. `execute 124` or `validate_yaml`.
    pub fn label(&self) -> String {
        match self {
            Operation::ById { action, id } => format!("{action} {id}"),
            Operation::FromFile { variant, .. } => variant.endpoint(),
        }
    }
}
