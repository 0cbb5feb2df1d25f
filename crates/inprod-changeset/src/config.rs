//! Runner configuration.
//!
//! Settings come from `INPROD_*` environment variables or from the CLI, and
//! are validated once by [`ChangesetConfig::resolve`] before any request.

use std::path::PathBuf;

use inprod_api::{normalize_host, Auth, ClientConfig};
use tracing::debug;

use crate::error::{ChangesetError, Result};
use crate::operation::{Operation, OperationParams};
use crate::poller::{PollSettings, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};

pub const ENV_HOST: &str = "INPROD_API_HOST";
pub const ENV_API_KEY: &str = "INPROD_API_KEY";
pub const ENV_USERNAME: &str = "INPROD_API_USERNAME";
pub const ENV_PASSWORD: &str = "INPROD_API_PASSWORD";
pub const ENV_CHANGESET_ID: &str = "INPROD_CHANGESET_ID";
pub const ENV_CHANGESET_PATH: &str = "INPROD_CHANGESET_PATH";
pub const ENV_ENVIRONMENT: &str = "INPROD_ENVIRONMENT";
pub const ENV_TIMEOUT: &str = "INPROD_TIMEOUT";
pub const ENV_POLL_INTERVAL: &str = "INPROD_POLL_INTERVAL";
pub const ENV_INSECURE: &str = "INPROD_INSECURE";
pub const ENV_REQUEST_TIMEOUT: &str = "INPROD_REQUEST_TIMEOUT";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Everything needed for one run, not yet validated.
#[derive(Clone, PartialEq, Eq)]
pub struct ChangesetConfig {
    pub host: Option<String>,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// One of `execute`, `validate`, `executejson`, ...
    pub action: Option<String>,
    pub params: OperationParams,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub insecure_skip_tls_verify: bool,
}

impl Default for ChangesetConfig {
    fn default() -> Self {
        ChangesetConfig {
            host: None,
            api_key: None,
            username: None,
            password: None,
            action: None,
            params: OperationParams::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            insecure_skip_tls_verify: false,
        }
    }
}

impl std::fmt::Debug for ChangesetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangesetConfig")
            .field("host", &self.host)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("action", &self.action)
            .field("params", &self.params)
            .field("timeout_secs", &self.timeout_secs)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .finish()
    }
}

/// A validated run: client settings, the operation, and poll timing.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub client: ClientConfig,
    pub operation: Operation,
    pub poll: PollSettings,
}

impl ChangesetConfig {
    /// Read `INPROD_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = ChangesetConfig::default();

        Ok(ChangesetConfig {
            host: get(ENV_HOST),
            api_key: get(ENV_API_KEY),
            username: get(ENV_USERNAME),
            password: get(ENV_PASSWORD),
            action: None,
            params: OperationParams {
                changeset_id: get(ENV_CHANGESET_ID),
                path: get(ENV_CHANGESET_PATH).map(PathBuf::from),
                environment: get(ENV_ENVIRONMENT),
            },
            timeout_secs: parse_secs(ENV_TIMEOUT, get(ENV_TIMEOUT), defaults.timeout_secs)?,
            poll_interval_secs: parse_secs(
                ENV_POLL_INTERVAL,
                get(ENV_POLL_INTERVAL),
                defaults.poll_interval_secs,
            )?,
            request_timeout_secs: parse_secs(
                ENV_REQUEST_TIMEOUT,
                get(ENV_REQUEST_TIMEOUT),
                defaults.request_timeout_secs,
            )?,
            insecure_skip_tls_verify: match get(ENV_INSECURE) {
                Some(raw) => parse_flag(ENV_INSECURE, &raw)?,
                None => false,
            },
        })
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn with_changeset_id(mut self, id: &str) -> Self {
        self.params.changeset_id = Some(id.to_string());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.params.path = Some(path.into());
        self
    }

    pub fn with_environment(mut self, environment: &str) -> Self {
        self.params.environment = Some(environment.to_string());
        self
    }

    pub fn with_poll(mut self, timeout_secs: u64, poll_interval_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self.poll_interval_secs = poll_interval_secs;
        self
    }

    /// Validate into a [`RunPlan`].
    ///
    /// Checks run in this order: action and its parameters, host, auth,
    /// then timings. Nothing here touches the network.
    pub fn resolve(&self) -> Result<RunPlan> {
        let action = self
            .action
            .as_deref()
            .ok_or_else(|| ChangesetError::InvalidConfig("no changeset action given".to_string()))?;
        let operation = Operation::resolve(action, &self.params)?;

        let host = self.host.as_deref().ok_or_else(|| {
            ChangesetError::InvalidConfig(format!("API host is not set ({ENV_HOST})"))
        })?;
        let host = normalize_host(host)?;

        let auth = self.auth()?;

        for (name, value) in [
            ("timeout", self.timeout_secs),
            ("poll interval", self.poll_interval_secs),
            ("request timeout", self.request_timeout_secs),
        ] {
            if value == 0 {
                return Err(ChangesetError::InvalidConfig(format!(
                    "{name} must be a positive number of seconds"
                )));
            }
        }

        Ok(RunPlan {
            client: ClientConfig::new(&host, auth)
                .with_request_timeout(self.request_timeout_secs)
                .with_insecure_skip_tls_verify(self.insecure_skip_tls_verify),
            operation,
            poll: PollSettings {
                timeout_secs: self.timeout_secs,
                poll_interval_secs: self.poll_interval_secs,
            },
        })
    }

    fn auth(&self) -> Result<Auth> {
        let non_blank = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());

        let credentials = match (non_blank(&self.username), non_blank(&self.password)) {
            (Some(username), Some(password)) => Some(Auth::credentials(username, password)),
            (Some(_), None) | (None, Some(_)) => {
                return Err(ChangesetError::InvalidConfig(format!(
                    "token auth needs both {ENV_USERNAME} and {ENV_PASSWORD}"
                )))
            }
            (None, None) => None,
        };

        match (non_blank(&self.api_key), credentials) {
            (Some(key), credentials) => {
                if credentials.is_some() {
                    debug!("Both API key and credentials set; using the API key");
                }
                Ok(Auth::api_key(key))
            }
            (None, Some(credentials)) => Ok(credentials),
            (None, None) => Err(ChangesetError::InvalidConfig(format!(
                "no API credentials: set {ENV_API_KEY} or {ENV_USERNAME}/{ENV_PASSWORD}"
            ))),
        }
    }
}

fn parse_secs(key: &str, raw: Option<String>, default: u64) -> Result<u64> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            ChangesetError::InvalidConfig(format!(
                "{key} must be a whole number of seconds, got {raw:?}"
            ))
        }),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ChangesetError::InvalidConfig(format!(
            "{key} must be true or false, got {raw:?}"
        ))),
    }
}
