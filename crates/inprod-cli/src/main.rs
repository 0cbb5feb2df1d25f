//! InProd change-set runner CLI
//!
//! The `inprod` command submits a change set to an InProd server, waits for
//! the background task and reports the outcome.
//!
//! ## Actions
//!
//! - `execute`, `validate`: run a stored change set by `--changeset-id`
//! - `executejson`, `executeyaml`, `validatejson`, `validateyaml`: submit the
//!   file at `--path`, optionally against `--environment`
//!
//! Every option can also be set through its `INPROD_*` environment variable.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use inprod_changeset::{ChangesetConfig, ChangesetError, OperationParams};
use tracing::Level;

#[derive(Parser)]
#[command(name = "inprod")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run and validate InProd change sets", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// execute, validate, executejson, executeyaml, validatejson or validateyaml
    action: String,

    /// InProd server, e.g. https://inprod.example.com
    #[arg(long, env = "INPROD_API_HOST")]
    host: Option<String>,

    /// API key
    #[arg(long, env = "INPROD_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Username for token auth (ignored when an API key is set)
    #[arg(long, env = "INPROD_API_USERNAME")]
    username: Option<String>,

    /// Password for token auth
    #[arg(long, env = "INPROD_API_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Numeric change set id (execute / validate)
    #[arg(long, env = "INPROD_CHANGESET_ID")]
    changeset_id: Option<String>,

    /// Change set file (JSON or YAML actions)
    #[arg(long, env = "INPROD_CHANGESET_PATH")]
    path: Option<PathBuf>,

    /// Target environment override for file submissions
    #[arg(long, env = "INPROD_ENVIRONMENT")]
    environment: Option<String>,

    /// Seconds to wait for the task before giving up
    #[arg(long, env = "INPROD_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Seconds between task-status polls
    #[arg(long, env = "INPROD_POLL_INTERVAL", default_value_t = 5)]
    poll_interval: u64,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "INPROD_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout: u64,

    /// Skip TLS certificate verification
    #[arg(long, env = "INPROD_INSECURE")]
    insecure: bool,
}

impl Cli {
    fn config(&self) -> ChangesetConfig {
        ChangesetConfig {
            host: self.host.clone(),
            api_key: self.api_key.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            action: Some(self.action.clone()),
            params: OperationParams {
                changeset_id: self.changeset_id.clone(),
                path: self.path.clone(),
                environment: self.environment.clone(),
            },
            timeout_secs: self.timeout,
            poll_interval_secs: self.poll_interval,
            request_timeout_secs: self.request_timeout,
            insecure_skip_tls_verify: self.insecure,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    inprod_changeset::telemetry::init_tracing(cli.json, level);

    let config = cli.config();
    let result = tokio::select! {
        result = inprod_changeset::run(&config) => result,
        _ = tokio::signal::ctrl_c() => Err(ChangesetError::Interrupted),
    };

    let outcome = result.with_context(|| format!("inprod {} failed", cli.action))?;
    println!("{}", outcome.summary());
    Ok(())
}
