//! The `ChangeSetApi` seam between the task runner and the HTTP transport.
//!
//! `InProdClient` is the production implementation; `fakes::ScriptedChangeSetApi`
//! replays canned responses for tests.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;
use crate::types::{ChangesetId, FileVariant, SubmitAction, TaskHandle};

/// Change-set submission and task-status endpoints.
///
/// Every method returns the decoded JSON body of a 2xx response. Non-2xx
/// responses, unparseable bodies and transport failures are errors. Nothing
/// is retried.
#[async_trait]
pub trait ChangeSetApi: Send + Sync {
    /// `PUT /api/v1/change-set/change-set/{id}/{action}/`
    async fn submit_changeset(&self, id: &ChangesetId, action: SubmitAction) -> ApiResult<Value>;

    /// `POST /api/v1/change-set/change-set/{variant}/[?environment=...]`
    /// with the file content as the body.
    async fn submit_changeset_file(
        &self,
        path: &Path,
        environment: Option<&str>,
        variant: FileVariant,
    ) -> ApiResult<Value>;

    /// `GET /api/v1/task-status/{task_id}/`
    async fn task_status(&self, task: &TaskHandle) -> ApiResult<Value>;
}
