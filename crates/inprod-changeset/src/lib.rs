//! InProd change-set runner
//!
//! Submits a change set (by id or as an inline JSON/YAML file), polls the
//! resulting background task, and interprets the terminal result.
//!
//! ```no_run
//! use inprod_changeset::ChangesetConfig;
//!
//! # async fn example() -> inprod_changeset::Result<()> {
//! let config = ChangesetConfig::from_env()?.with_action("validate");
//! let outcome = inprod_changeset::run(&config).await?;
//! println!("{}", outcome.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod interpreter;
pub mod operation;
pub mod poller;
pub mod telemetry;

pub use config::{ChangesetConfig, RunPlan};
pub use dispatcher::{extract_task_id, run_action, run_changeset, ChangesetOutcome};
pub use error::{ChangesetError, Result};
pub use interpreter::{format_validation_errors, interpret_execute, interpret_validate};
pub use operation::{ChangesetAction, Operation, OperationParams};
pub use poller::{poll_task, PollSettings};

use inprod_api::InProdClient;
use tracing::info;

/// Validate `config`, connect, and run the configured operation.
pub async fn run(config: &ChangesetConfig) -> Result<ChangesetOutcome> {
    let plan = config.resolve()?;
    info!(
        host = %plan.client.host,
        auth = plan.client.auth.method(),
        operation = %plan.operation.label(),
        timeout_secs = plan.poll.timeout_secs,
        poll_interval_secs = plan.poll.poll_interval_secs,
        "Starting change set run"
    );

    let client = InProdClient::connect(plan.client).await?;
    run_changeset(&client, &plan.operation, plan.poll).await
}
