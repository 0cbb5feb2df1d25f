//! Production `ChangeSetApi` implementation over `reqwest`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Request, Response, Url};
use serde_json::Value;
use tracing::{debug, info};

use crate::api::ChangeSetApi;
use crate::auth::{self, Auth, TokenRequest, OBTAIN_TOKEN_SEGMENTS};
use crate::error::{ApiError, ApiResult};
use crate::types::{ChangesetId, FileVariant, SubmitAction, TaskHandle};

const CHANGESET_SEGMENTS: [&str; 4] = ["api", "v1", "change-set", "change-set"];
const TASK_STATUS_SEGMENTS: [&str; 3] = ["api", "v1", "task-status"];

/// Connection settings for [`InProdClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API host, e.g. `https://inprod.example.com` (a trailing slash is ignored)
    pub host: String,
    pub auth: Auth,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Accept any server certificate. Off unless explicitly requested.
    pub insecure_skip_tls_verify: bool,
}

impl ClientConfig {
    pub fn new(host: &str, auth: Auth) -> Self {
        ClientConfig {
            host: host.to_string(),
            auth,
            request_timeout_secs: 30,
            insecure_skip_tls_verify: false,
        }
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_insecure_skip_tls_verify(mut self, insecure: bool) -> Self {
        self.insecure_skip_tls_verify = insecure;
        self
    }
}

/// Strip trailing slashes and check the host is an absolute http(s) URL.
pub fn normalize_host(host: &str) -> ApiResult<String> {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::InvalidConfig("API host is empty".to_string()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| ApiError::InvalidConfig(format!("invalid API host {trimmed:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidConfig(format!(
            "API host must use http or https, got {:?}",
            url.scheme()
        )));
    }
    Ok(trimmed.to_string())
}

/// Path of the task-status endpoint for `task`, as sent on the wire.
pub fn task_status_path(task: &TaskHandle) -> ApiResult<String> {
    let base = Url::parse("http://localhost")
        .map_err(|e| ApiError::InvalidConfig(format!("invalid base URL: {e}")))?;
    Ok(task_status_url(&base, task)?.path().to_string())
}

/// Append percent-encoded `segments` and a trailing slash to `base`.
fn endpoint_url(base: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidConfig(format!("API host {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments)
        .push("");
    Ok(url)
}

fn task_status_url(base: &Url, task: &TaskHandle) -> ApiResult<Url> {
    let mut segments = TASK_STATUS_SEGMENTS.to_vec();
    segments.push(task.as_str());
    endpoint_url(base, &segments)
}

/// HTTP client for the InProd change-set API.
///
/// Built once per invocation; holds no state besides the resolved
/// `Authorization` header.
#[derive(Clone)]
pub struct InProdClient {
    http: reqwest::Client,
    base: Url,
    authorization: HeaderValue,
    auth_method: &'static str,
}

impl std::fmt::Debug for InProdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProdClient")
            .field("host", &self.base.as_str())
            .field("auth_method", &self.auth_method)
            .finish()
    }
}

impl InProdClient {
    /// Build the client and resolve credentials.
    ///
    /// An API key is used as-is. Username/password credentials are exchanged
    /// for a token here, before any change-set call is made.
    pub async fn connect(config: ClientConfig) -> ApiResult<Self> {
        let host = normalize_host(&config.host)?;
        let base = Url::parse(&host)
            .map_err(|e| ApiError::InvalidConfig(format!("invalid API host {host:?}: {e}")))?;

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(format!("inprod-changeset/{}", env!("CARGO_PKG_VERSION")));
        if config.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let header = match &config.auth {
            Auth::ApiKey(key) => auth::api_key_header(key),
            Auth::Credentials { username, password } => {
                let token = obtain_token(&http, &base, username, password).await?;
                info!(username = %username, "Obtained InProd API token");
                auth::token_header(&token)
            }
        };
        let mut authorization = HeaderValue::from_str(&header)
            .map_err(|_| ApiError::InvalidConfig("credential is not a valid header value".into()))?;
        authorization.set_sensitive(true);

        debug!(host = %host, auth = config.auth.method(), "Configured InProd client");
        Ok(InProdClient {
            http,
            base,
            authorization,
            auth_method: config.auth.method(),
        })
    }

    fn changeset_url(&self, tail: &[&str]) -> ApiResult<Url> {
        let mut segments = CHANGESET_SEGMENTS.to_vec();
        segments.extend_from_slice(tail);
        endpoint_url(&self.base, &segments)
    }

    /// Build the submit-by-id request.
    pub fn submit_request(&self, id: &ChangesetId, action: SubmitAction) -> ApiResult<Request> {
        let url = self.changeset_url(&[id.as_str(), action.as_str()])?;
        Ok(self
            .http
            .put(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .build()?)
    }

    /// Build the submit-by-file request around an already-read body.
    pub fn file_submit_request(
        &self,
        body: Vec<u8>,
        environment: Option<&str>,
        variant: FileVariant,
    ) -> ApiResult<Request> {
        let endpoint = variant.endpoint();
        let url = self.changeset_url(&[endpoint.as_str()])?;
        let mut builder = self
            .http
            .post(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(CONTENT_TYPE, variant.content_type())
            .header(ACCEPT, "application/json")
            .body(body);
        if let Some(environment) = environment {
            builder = builder.query(&[("environment", environment)]);
        }
        Ok(builder.build()?)
    }

    /// Build the task-status request.
    pub fn status_request(&self, task: &TaskHandle) -> ApiResult<Request> {
        let url = task_status_url(&self.base, task)?;
        Ok(self
            .http
            .get(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .build()?)
    }

    async fn send(&self, request: Request) -> ApiResult<Value> {
        debug!(method = %request.method(), url = %request.url(), "InProd API request");
        let response = self.http.execute(request).await?;
        read_json_response(response).await
    }
}

#[async_trait]
impl ChangeSetApi for InProdClient {
    async fn submit_changeset(&self, id: &ChangesetId, action: SubmitAction) -> ApiResult<Value> {
        let request = self.submit_request(id, action)?;
        self.send(request).await
    }

    async fn submit_changeset_file(
        &self,
        path: &Path,
        environment: Option<&str>,
        variant: FileVariant,
    ) -> ApiResult<Value> {
        let body = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = body.len(), "Read change set file");
        let request = self.file_submit_request(body, environment, variant)?;
        self.send(request).await
    }

    async fn task_status(&self, task: &TaskHandle) -> ApiResult<Value> {
        let request = self.status_request(task)?;
        self.send(request).await
    }
}

/// Turn an HTTP response into JSON.
///
/// A non-2xx status becomes [`ApiError::Transport`] with the body kept for
/// diagnostics. A 2xx body that is not valid UTF-8 JSON becomes
/// [`ApiError::MalformedResponse`].
pub async fn read_json_response(response: Response) -> ApiResult<Value> {
    let status = response.status();
    let url = response.url().to_string();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let body = String::from_utf8_lossy(&bytes).into_owned();
        debug!(status = status.as_u16(), body = %body, "InProd API returned an error status");
        return Err(ApiError::Transport {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            body,
        });
    }

    serde_json::from_slice(&bytes).map_err(|e| ApiError::MalformedResponse {
        url,
        reason: e.to_string(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

async fn obtain_token(
    http: &reqwest::Client,
    base: &Url,
    username: &str,
    password: &str,
) -> ApiResult<String> {
    let response = http
        .post(endpoint_url(base, &OBTAIN_TOKEN_SEGMENTS)?)
        .header(ACCEPT, "application/json")
        .json(&TokenRequest { username, password })
        .send()
        .await?;

    match read_json_response(response).await {
        Ok(body) => auth::token_from_response(&body),
        // Rejected logins come back as 4xx with an `errors.base` message
        Err(ApiError::Transport {
            status,
            reason,
            body,
        }) => match serde_json::from_str::<Value>(&body) {
            Ok(parsed) if parsed.pointer("/errors/base").is_some() => {
                auth::token_from_response(&parsed)
            }
            _ => Err(ApiError::Transport {
                status,
                reason,
                body,
            }),
        },
        Err(other) => Err(other),
    }
}
