//! InProd API: HTTP client and wire types for InProd change sets
//!
//! This crate is the transport layer of the change-set runner. It issues the
//! submit and task-status requests, authenticates them, and turns responses
//! into JSON or a typed [`ApiError`].
//!
//! ## Endpoints
//!
//! - `PUT  /api/v1/change-set/change-set/{id}/{execute|validate}/`
//! - `POST /api/v1/change-set/change-set/{execute|validate}_{json|yaml}/`
//! - `GET  /api/v1/task-status/{task_id}/`
//! - `POST /api/admin/obtain-auth-token/` (username/password auth only)

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod fakes;
pub mod types;

pub use api::ChangeSetApi;
pub use auth::Auth;
pub use client::{
    normalize_host, read_json_response, task_status_path, ClientConfig, InProdClient,
};
pub use error::{ApiError, ApiResult};
pub use types::{
    ActionValidation, ChangesetId, ErrorEntry, ExecuteResult, FieldMessages, FileVariant,
    PayloadFormat, SubmitAction, TaskHandle, TaskStatus, TaskStatusResponse, ValidateResult,
    WireId,
};
