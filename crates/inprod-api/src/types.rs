//! Wire types for the InProd change-set and task-status endpoints.
//!
//! Result payloads are decoded leniently: the server's result documents are
//! loosely shaped, so unknown fields are ignored, malformed sub-shapes are
//! dropped, and flags count only when they are literally `true`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

// ---------------------------------------------------------------------------
// Submission parameters
// ---------------------------------------------------------------------------

/// Numeric change-set identifier, kept as the decimal string the API expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangesetId(String);

impl ChangesetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChangesetId {
    type Error = ApiError;

    fn try_from(s: String) -> ApiResult<Self> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::InvalidConfig(format!(
                "change set id must be numeric, got {s:?}"
            )));
        }
        Ok(ChangesetId(s))
    }
}

impl TryFrom<&str> for ChangesetId {
    type Error = ApiError;

    fn try_from(s: &str) -> ApiResult<Self> {
        ChangesetId::try_from(s.to_string())
    }
}

impl std::fmt::Display for ChangesetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the server should do with a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitAction {
    Execute,
    Validate,
}

impl SubmitAction {
    /// Path segment used by the submit-by-id endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitAction::Execute => "execute",
            SubmitAction::Validate => "validate",
        }
    }
}

impl std::fmt::Display for SubmitAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding of an inline change-set payload file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Json,
    Yaml,
}

impl PayloadFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            PayloadFormat::Json => "application/json",
            PayloadFormat::Yaml => "application/x-yaml",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            PayloadFormat::Json => "json",
            PayloadFormat::Yaml => "yaml",
        }
    }
}

/// One of the four file-submission endpoints
/// (`execute_json`, `execute_yaml`, `validate_json`, `validate_yaml`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileVariant {
    pub action: SubmitAction,
    pub format: PayloadFormat,
}

impl FileVariant {
    pub fn new(action: SubmitAction, format: PayloadFormat) -> Self {
        Self { action, format }
    }

    /// Endpoint path segment, e.g. `validate_yaml`.
    pub fn endpoint(&self) -> String {
        format!("{}_{}", self.action.as_str(), self.format.suffix())
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

// ---------------------------------------------------------------------------
// Task handle and status
// ---------------------------------------------------------------------------

/// Opaque identifier of a background task returned by a submit call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        TaskHandle(id.into())
    }

    /// Read `data.attributes.task_id` from a submit response.
    ///
    /// A missing, empty, or non-string id yields `None`.
    pub fn from_submit_response(response: &Value) -> Option<Self> {
        response
            .pointer("/data/attributes/task_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(TaskHandle::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task state as reported by the task-status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Started,
    Success,
    Failure,
    Revoked,
    /// Any other value, including a missing status (empty string)
    Unknown(String),
}

impl TaskStatus {
    /// SUCCESS, FAILURE and REVOKED end the poll loop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failure | TaskStatus::Revoked
        )
    }
}

impl From<Option<&str>> for TaskStatus {
    fn from(raw: Option<&str>) -> Self {
        match raw {
            Some("PENDING") => TaskStatus::Pending,
            Some("STARTED") => TaskStatus::Started,
            Some("SUCCESS") => TaskStatus::Success,
            Some("FAILURE") => TaskStatus::Failure,
            Some("REVOKED") => TaskStatus::Revoked,
            Some(other) => TaskStatus::Unknown(other.to_string()),
            None => TaskStatus::Unknown(String::new()),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => f.write_str("PENDING"),
            TaskStatus::Started => f.write_str("STARTED"),
            TaskStatus::Success => f.write_str("SUCCESS"),
            TaskStatus::Failure => f.write_str("FAILURE"),
            TaskStatus::Revoked => f.write_str("REVOKED"),
            TaskStatus::Unknown(raw) if raw.is_empty() => f.write_str("<missing>"),
            TaskStatus::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Body of `GET /api/v1/task-status/{task_id}/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl TaskStatusResponse {
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from(self.status.as_deref())
    }

    /// Message from the `error` field of a FAILURE response.
    pub fn error_message(&self) -> String {
        match &self.error {
            None | Some(Value::Null) => "no error details reported".to_string(),
            Some(value) => render_scalar(value),
        }
    }
}

// ---------------------------------------------------------------------------
// Terminal result payloads
// ---------------------------------------------------------------------------

/// A numeric or string identifier (`run_id`, `action_id`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(
                n.as_i64()
                    .map(WireId::Number)
                    .unwrap_or_else(|| WireId::Text(n.to_string())),
            ),
            Value::String(s) => Some(WireId::Text(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for WireId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireId::Number(n) => write!(f, "{n}"),
            WireId::Text(s) => f.write_str(s),
        }
    }
}

/// Result of an execute-class task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteResult {
    #[serde(default, deserialize_with = "lenient::id")]
    pub run_id: Option<WireId>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub successful: bool,
    #[serde(default, deserialize_with = "lenient::text")]
    pub changeset_name: Option<String>,
    #[serde(default)]
    pub environment: Option<Value>,
}

/// Result of a validate-class task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidateResult {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_valid: bool,
    /// `None` when the server sent no sequence at all
    #[serde(default, deserialize_with = "lenient::actions")]
    pub validation_results: Option<Vec<ActionValidation>>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub changeset_name: Option<String>,
    #[serde(default)]
    pub environment: Option<Value>,
}

/// Per-action validation findings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionValidation {
    #[serde(default, deserialize_with = "lenient::id")]
    pub action_id: Option<WireId>,
    #[serde(default)]
    pub errors: FieldMessages,
    #[serde(default)]
    pub warnings: FieldMessages,
}

/// Ordered mapping of field name to the entries reported for it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct FieldMessages(pub Vec<(String, Vec<ErrorEntry>)>);

impl FieldMessages {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ErrorEntry])> {
        self.0
            .iter()
            .map(|(field, entries)| (field.as_str(), entries.as_slice()))
    }
}

impl From<Value> for FieldMessages {
    fn from(value: Value) -> Self {
        let Value::Object(fields) = value else {
            return FieldMessages::default();
        };
        let fields = fields
            .into_iter()
            .filter_map(|(field, entries)| match entries {
                Value::Array(entries) => Some((
                    field,
                    entries.iter().filter_map(ErrorEntry::from_value).collect(),
                )),
                _ => None,
            })
            .collect();
        FieldMessages(fields)
    }
}

/// A single reported problem with one or more messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorEntry {
    pub iteration: Option<Value>,
    pub msg: Vec<String>,
}

impl ErrorEntry {
    /// Entries must be objects carrying a `msg` sequence.
    fn from_value(value: &Value) -> Option<Self> {
        let entry = value.as_object()?;
        let msg = entry.get("msg")?.as_array()?;
        Some(ErrorEntry {
            iteration: entry.get("iteration").filter(|v| !v.is_null()).cloned(),
            msg: msg.iter().map(render_scalar).collect(),
        })
    }
}

/// Strings render bare; anything else as compact JSON.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

mod lenient {
    use super::*;

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(matches!(Value::deserialize(d)?, Value::Bool(true)))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<WireId>, D::Error> {
        Ok(WireId::from_value(&Value::deserialize(d)?))
    }

    pub fn actions<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Vec<ActionValidation>>, D::Error> {
        match Value::deserialize(d)? {
            Value::Array(items) => Ok(Some(
                items
                    .into_iter()
                    .filter(Value::is_object)
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            )),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changeset_id_accepts_digits_only() {
        assert_eq!(ChangesetId::try_from("124").unwrap().as_str(), "124");
        assert!(ChangesetId::try_from("").is_err());
        assert!(ChangesetId::try_from("12a").is_err());
        assert!(ChangesetId::try_from("-3").is_err());
        assert!(ChangesetId::try_from("1 2").is_err());
    }

    #[test]
    fn test_file_variant_endpoints_and_content_types() {
        let cases = [
            (SubmitAction::Execute, PayloadFormat::Json, "execute_json", "application/json"),
            (SubmitAction::Execute, PayloadFormat::Yaml, "execute_yaml", "application/x-yaml"),
            (SubmitAction::Validate, PayloadFormat::Json, "validate_json", "application/json"),
            (SubmitAction::Validate, PayloadFormat::Yaml, "validate_yaml", "application/x-yaml"),
        ];
        for (action, format, endpoint, content_type) in cases {
            let variant = FileVariant::new(action, format);
            assert_eq!(variant.endpoint(), endpoint);
            assert_eq!(variant.content_type(), content_type);
        }
    }

    #[test]
    fn test_task_handle_from_submit_response() {
        let response = json!({"data": {"attributes": {"task_id": "t1", "run_id": 24}}});
        assert_eq!(
            TaskHandle::from_submit_response(&response),
            Some(TaskHandle::new("t1"))
        );

        assert!(TaskHandle::from_submit_response(&json!({"data": {"attributes": {}}})).is_none());
        assert!(TaskHandle::from_submit_response(&json!({"data": {}})).is_none());
        assert!(
            TaskHandle::from_submit_response(&json!({"data": {"attributes": {"task_id": 7}}}))
                .is_none()
        );
        assert!(
            TaskHandle::from_submit_response(&json!({"data": {"attributes": {"task_id": ""}}}))
                .is_none()
        );
    }

    #[test]
    fn test_task_status_terminal_set() {
        for raw in ["SUCCESS", "FAILURE", "REVOKED"] {
            assert!(TaskStatus::from(Some(raw)).is_terminal(), "{raw}");
        }
        for raw in ["PENDING", "STARTED", "RETRY", "success"] {
            assert!(!TaskStatus::from(Some(raw)).is_terminal(), "{raw}");
        }
        assert_eq!(
            TaskStatus::from(Some("RETRY")),
            TaskStatus::Unknown("RETRY".to_string())
        );
        assert_eq!(TaskStatus::from(None).to_string(), "<missing>");
    }

    #[test]
    fn test_task_status_response_error_message() {
        let response: TaskStatusResponse = serde_json::from_value(json!({
            "task_id": "t1",
            "status": "FAILURE",
            "error": "Connection timeout"
        }))
        .unwrap();
        assert_eq!(response.status(), TaskStatus::Failure);
        assert_eq!(response.error_message(), "Connection timeout");

        let response: TaskStatusResponse =
            serde_json::from_value(json!({"status": "FAILURE", "error": {"code": 3}})).unwrap();
        assert_eq!(response.error_message(), r#"{"code":3}"#);
    }

    #[test]
    fn test_execute_result_flag_must_be_literal_true() {
        let ok: ExecuteResult =
            serde_json::from_value(json!({"run_id": 24, "successful": true})).unwrap();
        assert!(ok.successful);
        assert_eq!(ok.run_id, Some(WireId::Number(24)));

        let null: ExecuteResult =
            serde_json::from_value(json!({"run_id": "r-9", "successful": null})).unwrap();
        assert!(!null.successful);
        assert_eq!(null.run_id.unwrap().to_string(), "r-9");

        let truthy: ExecuteResult =
            serde_json::from_value(json!({"successful": "yes"})).unwrap();
        assert!(!truthy.successful);
    }

    #[test]
    fn test_validate_result_keeps_server_field_order() {
        let result: ValidateResult = serde_json::from_value(json!({
            "is_valid": false,
            "validation_results": [{
                "action_id": 7,
                "errors": {
                    "zeta": [{"msg": ["z"]}],
                    "alpha": [{"iteration": 2, "msg": ["a"]}]
                },
                "warnings": {}
            }]
        }))
        .unwrap();

        let actions = result.validation_results.unwrap();
        let fields: Vec<&str> = actions[0].errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["zeta", "alpha"]);
        assert_eq!(actions[0].errors.0[1].1[0].iteration, Some(json!(2)));
        assert!(actions[0].warnings.is_empty());
    }

    #[test]
    fn test_validate_result_drops_malformed_shapes() {
        let result: ValidateResult = serde_json::from_value(json!({
            "is_valid": false,
            "validation_results": [
                "not an object",
                {"action_id": 1, "errors": "not a mapping"},
                {"action_id": 2, "errors": {"f": "not a list", "g": [3, {"msg": "no list"}, {"msg": [1]}]}}
            ]
        }))
        .unwrap();

        let actions = result.validation_results.unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions[0].errors.is_empty());
        assert_eq!(
            actions[1].errors.0,
            vec![(
                "g".to_string(),
                vec![ErrorEntry {
                    iteration: None,
                    msg: vec!["1".to_string()]
                }]
            )]
        );

        let absent: ValidateResult =
            serde_json::from_value(json!({"validation_results": {"x": 1}})).unwrap();
        assert!(absent.validation_results.is_none());
    }
}
